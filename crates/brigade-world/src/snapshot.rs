use brigade_codec::{delta_struct, ByteSink, Decode, Delta, Encode, InputStream, OutputStream};
use brigade_types::{
    AmmopackId, Direction, ExplosionId, FlagId, GenericEntityId, Hat, MedkitId, PayloadCartId,
    PlayerClass, PlayerId, ProjectileId, ProjectileType, SentryGunId, Team, Vec2,
};

/// Declares a plain field-concatenation `Encode`/`Decode` pair for a
/// snapshot view struct, the same flat wire shape every other struct in this
/// codebase uses, then leaves `delta_struct!` to add the diffing half.
macro_rules! wire_struct {
    ($t:ident { $($(#[$meta:meta])* $field:ident : $ty:ty),+ $(,)? }) => {
        #[derive(Debug, Clone, PartialEq)]
        pub struct $t {
            $($(#[$meta])* pub $field: $ty,)+
        }

        impl Encode for $t {
            fn encode<S: ByteSink>(&self, out: &mut S) {
                $(self.$field.encode(out);)+
            }
        }

        impl Decode for $t {
            fn decode(input: &mut InputStream) -> Option<Self> {
                Some(Self { $($field: Decode::decode(input)?,)+ })
            }
        }
    };
}

wire_struct!(SelfPlayerView {
    player_id: PlayerId,
    position: Vec2,
    team: Team,
    class: PlayerClass,
    alive: bool,
    health: i32,
    primary_ammo: i32,
    secondary_ammo: i32,
    noclip: bool,
    score: i32,
});
delta_struct!(SelfPlayerView {
    player_id,
    position,
    team,
    class,
    alive,
    health,
    primary_ammo,
    secondary_ammo,
    noclip,
    score,
});

wire_struct!(PlayerView {
    player_id: PlayerId,
    name: String,
    position: Vec2,
    /// The team other clients should render this player as; equal to the
    /// real team unless the player is a disguised spy the viewer can't see
    /// through, in which case it is the viewer's own team.
    skin_team: Team,
    class: PlayerClass,
    alive: bool,
    aim_direction: Direction,
    hat: Hat,
    score: i32,
});
delta_struct!(PlayerView { player_id, name, position, skin_team, class, alive, aim_direction, hat, score });

wire_struct!(ProjectileView {
    projectile_id: ProjectileId,
    position: Vec2,
    kind: ProjectileType,
    team: Team,
    move_direction: Direction,
});
delta_struct!(ProjectileView { projectile_id, position, kind, team, move_direction });

wire_struct!(ExplosionView { explosion_id: ExplosionId, position: Vec2, team: Team });
delta_struct!(ExplosionView { explosion_id, position, team });

wire_struct!(SentryGunView {
    sentry_gun_id: SentryGunId,
    position: Vec2,
    aim_direction: Direction,
    team: Team,
    alive: bool,
});
delta_struct!(SentryGunView { sentry_gun_id, position, aim_direction, team, alive });

wire_struct!(MedkitView { medkit_id: MedkitId, position: Vec2, alive: bool });
delta_struct!(MedkitView { medkit_id, position, alive });

wire_struct!(AmmopackView { ammopack_id: AmmopackId, position: Vec2, alive: bool });
delta_struct!(AmmopackView { ammopack_id, position, alive });

wire_struct!(FlagView {
    flag_id: FlagId,
    name: String,
    position: Vec2,
    team: Team,
    carrier: PlayerId,
});
delta_struct!(FlagView { flag_id, name, position, team, carrier });

wire_struct!(PayloadCartView { cart_id: PayloadCartId, position: Vec2, team: Team });
delta_struct!(PayloadCartView { cart_id, position, team });

wire_struct!(GenericEntityView {
    generic_entity_id: GenericEntityId,
    position: Vec2,
    color: u8,
    visible: bool,
});
delta_struct!(GenericEntityView { generic_entity_id, position, color, visible });

/// Everything one connected client needs to render a single tick, scoped to
/// that client's viewpoint (its own private fields in `self_player`,
/// disguise-aware `skin_team` substitution already applied to `players`).
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    pub tick: u32,
    pub round_seconds_left: u32,
    pub self_player: SelfPlayerView,
    pub players: Vec<PlayerView>,
    pub corpses: Vec<PlayerView>,
    pub sentry_guns: Vec<SentryGunView>,
    pub projectiles: Vec<ProjectileView>,
    pub explosions: Vec<ExplosionView>,
    pub medkits: Vec<MedkitView>,
    pub ammopacks: Vec<AmmopackView>,
    pub generic_entities: Vec<GenericEntityView>,
    pub flags: Vec<FlagView>,
    pub carts: Vec<PayloadCartView>,
}

impl Encode for Snapshot {
    fn encode<S: ByteSink>(&self, out: &mut S) {
        self.tick.encode(out);
        self.round_seconds_left.encode(out);
        self.self_player.encode(out);
        self.players.encode(out);
        self.corpses.encode(out);
        self.sentry_guns.encode(out);
        self.projectiles.encode(out);
        self.explosions.encode(out);
        self.medkits.encode(out);
        self.ammopacks.encode(out);
        self.generic_entities.encode(out);
        self.flags.encode(out);
        self.carts.encode(out);
    }
}

impl Decode for Snapshot {
    fn decode(input: &mut InputStream) -> Option<Self> {
        Some(Self {
            tick: Decode::decode(input)?,
            round_seconds_left: Decode::decode(input)?,
            self_player: Decode::decode(input)?,
            players: Decode::decode(input)?,
            corpses: Decode::decode(input)?,
            sentry_guns: Decode::decode(input)?,
            projectiles: Decode::decode(input)?,
            explosions: Decode::decode(input)?,
            medkits: Decode::decode(input)?,
            ammopacks: Decode::decode(input)?,
            generic_entities: Decode::decode(input)?,
            flags: Decode::decode(input)?,
            carts: Decode::decode(input)?,
        })
    }
}

delta_struct!(Snapshot {
    tick,
    round_seconds_left,
    self_player,
    players,
    corpses,
    sentry_guns,
    projectiles,
    explosions,
    medkits,
    ammopacks,
    generic_entities,
    flags,
    carts,
});

/// Encodes a snapshot as a standalone full value, for a client the server
/// has no cached baseline for.
pub fn encode_full(snapshot: &Snapshot) -> Vec<u8> {
    let mut out = OutputStream::new();
    snapshot.encode(&mut out);
    out.into_vec()
}

/// Encodes `snapshot` as a diff against `base`, for a client whose last
/// acknowledged tick is still in the server's ring.
pub fn encode_delta(snapshot: &Snapshot, base: &Snapshot) -> Vec<u8> {
    let mut out = OutputStream::new();
    snapshot.delta_encode(base, &mut out);
    out.into_vec()
}

pub fn decode_full(bytes: &[u8]) -> Option<Snapshot> {
    let mut input = InputStream::new(bytes);
    Snapshot::decode(&mut input).filter(|_| input.eof())
}

pub fn decode_delta(bytes: &[u8], base: &Snapshot) -> Option<Snapshot> {
    let mut input = InputStream::new(bytes);
    Snapshot::delta_decode(&mut input, base).filter(|_| input.eof())
}

/// Fixed-capacity circular buffer of recent snapshots, indexed by
/// `tick & (K - 1)` with `K` a power of two, so looking a client's
/// acknowledged tick back up never needs to scan. A slot holds at most one
/// tick's snapshot; a stale lookup (tick evicted by wraparound) is reported
/// as a miss rather than returning the wrong tick's data.
pub const SNAPSHOT_RING_CAPACITY: usize = 32;

#[derive(Debug)]
pub struct SnapshotRing {
    slots: [Option<Snapshot>; SNAPSHOT_RING_CAPACITY],
}

impl Default for SnapshotRing {
    fn default() -> Self {
        Self { slots: std::array::from_fn(|_| None) }
    }
}

impl SnapshotRing {
    pub fn new() -> Self {
        Self::default()
    }

    fn slot(tick: u32) -> usize {
        (tick as usize) & (SNAPSHOT_RING_CAPACITY - 1)
    }

    pub fn push(&mut self, snapshot: Snapshot) {
        let slot = Self::slot(snapshot.tick);
        self.slots[slot] = Some(snapshot);
    }

    pub fn get(&self, tick: u32) -> Option<&Snapshot> {
        self.slots[Self::slot(tick)].as_ref().filter(|s| s.tick == tick)
    }
}

/// Picks full vs. delta encoding for one client's next update, given the
/// tick it last acknowledged (if any) and the server's snapshot ring.
pub fn build_update(ring: &SnapshotRing, current: &Snapshot, acked_tick: Option<u32>) -> (Vec<u8>, Option<u32>) {
    match acked_tick.and_then(|t| ring.get(t)) {
        Some(base) => (encode_delta(current, base), Some(base.tick)),
        None => (encode_full(current), None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(tick: u32) -> Snapshot {
        Snapshot {
            tick,
            round_seconds_left: 300,
            self_player: SelfPlayerView {
                player_id: PlayerId(1),
                position: Vec2::new(10, 10),
                team: Team::Red,
                class: PlayerClass::Soldier,
                alive: true,
                health: 200,
                primary_ammo: 4,
                secondary_ammo: 20,
                noclip: false,
                score: 0,
            },
            players: vec![PlayerView {
                player_id: PlayerId(2),
                name: "bob".into(),
                position: Vec2::new(11, 10),
                skin_team: Team::Blue,
                class: PlayerClass::Sniper,
                alive: true,
                aim_direction: Direction::RIGHT,
                hat: Hat::None,
                score: 3,
            }],
            corpses: Vec::new(),
            sentry_guns: Vec::new(),
            projectiles: Vec::new(),
            explosions: Vec::new(),
            medkits: Vec::new(),
            ammopacks: Vec::new(),
            generic_entities: Vec::new(),
            flags: Vec::new(),
            carts: Vec::new(),
        }
    }

    #[test]
    fn full_snapshot_round_trips() {
        let snap = sample(7);
        let bytes = encode_full(&snap);
        assert_eq!(decode_full(&bytes), Some(snap));
    }

    #[test]
    fn delta_round_trips_a_moving_projectile() {
        let mut base = sample(10);
        base.projectiles.push(ProjectileView {
            projectile_id: ProjectileId(7),
            position: Vec2::new(10, 10),
            kind: ProjectileType::Rocket,
            team: Team::Red,
            move_direction: Direction::RIGHT,
        });
        let mut next = base.clone();
        next.tick = 11;
        next.projectiles[0].position = Vec2::new(11, 10);

        let bytes = encode_delta(&next, &base);
        let decoded = decode_delta(&bytes, &base).expect("delta decode");
        assert_eq!(decoded, next);
    }

    #[test]
    fn delta_is_cheaper_than_full_when_little_changed() {
        let mut base = sample(20);
        for i in 0..20 {
            base.players.push(PlayerView {
                player_id: PlayerId(100 + i),
                name: format!("p{i}"),
                position: Vec2::new(i as i16, 0),
                skin_team: Team::Blue,
                class: PlayerClass::Scout,
                alive: true,
                aim_direction: Direction::NONE,
                hat: Hat::None,
                score: 0,
            });
        }
        let mut next = base.clone();
        next.tick = 21;
        next.self_player.position = Vec2::new(12, 10);

        assert!(encode_delta(&next, &base).len() < encode_full(&next).len());
    }

    #[test]
    fn ring_eviction_forces_a_full_snapshot() {
        let mut ring = SnapshotRing::new();
        ring.push(sample(1));
        for t in 2..=(SNAPSHOT_RING_CAPACITY as u32 + 1) {
            ring.push(sample(t));
        }
        // tick 1 has been evicted by wraparound; its slot now holds a later tick.
        assert!(ring.get(1).is_none());
        let current = sample(SNAPSHOT_RING_CAPACITY as u32 + 1);
        let (_, base_tick) = build_update(&ring, &current, Some(1));
        assert_eq!(base_tick, None);
    }

    #[test]
    fn cached_ack_produces_a_delta() {
        let mut ring = SnapshotRing::new();
        ring.push(sample(5));
        let current = sample(6);
        let (_, base_tick) = build_update(&ring, &current, Some(5));
        assert_eq!(base_tick, Some(5));
    }
}
