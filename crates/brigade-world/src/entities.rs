use brigade_codec::delta_struct;
use brigade_types::{
    Direction, Hat, PlayerClass, PlayerId, SentryGunId, SolidFlags, SoundId, Team, Vec2, Weapon,
};

/// Self-inflicted, non-lethal blast applied to a soldier or demoman that
/// just fired a rocket/sticky at its own feet, per the class's blast-jump
/// rule. `chain_count` tracks consecutive jumps so a refreshed jump can
/// apply the chain coefficient instead of the base one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BlastJumpState {
    pub direction: Direction,
    pub ticks_remaining: u32,
    pub chain_count: u32,
}

impl BlastJumpState {
    pub fn is_active(self) -> bool {
        self.ticks_remaining > 0
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Player {
    pub name: String,
    pub position: Vec2,
    pub team: Team,
    /// Differs from `team` only while `disguised` as an enemy spy.
    pub skin_team: Team,
    pub class: PlayerClass,
    pub alive: bool,
    pub health: i32,
    pub aim_direction: Direction,
    pub move_direction: Direction,
    pub attack1: bool,
    pub attack2: bool,
    pub active_weapon: Weapon,
    pub primary_ammo: i32,
    pub secondary_ammo: i32,
    pub hat: Hat,
    pub disguised: bool,
    pub noclip: bool,
    pub score: i32,
    pub blast_jump: BlastJumpState,
    pub latest_rtt_ms: u32,

    pub move_timer: i32,
    pub shoot_timer: i32,
    pub reload_timer: i32,
    pub reloading: bool,
    pub respawn_timer: i32,
}

impl Player {
    pub fn new(name: String, team: Team) -> Self {
        Self {
            name,
            position: Vec2::ZERO,
            team,
            skin_team: team,
            class: PlayerClass::None,
            alive: false,
            health: 0,
            aim_direction: Direction::NONE,
            move_direction: Direction::NONE,
            attack1: false,
            attack2: false,
            active_weapon: Weapon::None,
            primary_ammo: 0,
            secondary_ammo: 0,
            hat: Hat::None,
            disguised: false,
            noclip: false,
            score: 0,
            blast_jump: BlastJumpState::default(),
            latest_rtt_ms: 0,
            move_timer: 0,
            shoot_timer: 0,
            reload_timer: 0,
            reloading: false,
            respawn_timer: 0,
        }
    }

    /// Spectators are never alive and never carry a combat class, per the
    /// registry invariant linking the two.
    pub fn enforce_spectator_invariant(&mut self) {
        if self.team == Team::Spectators {
            self.class = PlayerClass::Spectator;
            self.alive = false;
        }
    }
}

delta_struct!(Player {
    name,
    position,
    team,
    skin_team,
    class,
    alive,
    health,
    aim_direction,
    move_direction,
    attack1,
    attack2,
    active_weapon,
    primary_ammo,
    secondary_ammo,
    hat,
    disguised,
    noclip,
    score,
    latest_rtt_ms,
});

#[derive(Debug, Clone, PartialEq)]
pub struct Projectile {
    pub position: Vec2,
    pub kind: brigade_types::ProjectileType,
    pub team: Team,
    pub move_direction: Direction,
    pub owner: PlayerId,
    pub weapon: Weapon,
    pub damage: i32,
    pub hurt_sound: SoundId,
    pub disappear_ticks: i32,
    pub move_interval: i32,
    pub move_timer: i32,
    pub sticky_attached: bool,
}

delta_struct!(Projectile {
    position,
    kind,
    team,
    move_direction,
    owner,
    weapon,
    damage,
    hurt_sound,
    disappear_ticks,
    sticky_attached,
});

#[derive(Debug, Clone, PartialEq)]
pub struct Explosion {
    pub position: Vec2,
    pub team: Team,
    pub owner: PlayerId,
    pub weapon: Weapon,
    pub damage: i32,
    pub hurt_sound: SoundId,
    pub disappear_ticks: i32,
    pub damaged_players: Vec<PlayerId>,
    pub damaged_sentries: Vec<SentryGunId>,
}

delta_struct!(Explosion { position, team, owner, weapon, damage, hurt_sound, disappear_ticks });

#[derive(Debug, Clone, PartialEq)]
pub struct SentryGun {
    pub position: Vec2,
    pub aim_direction: Direction,
    pub team: Team,
    pub health: i32,
    pub owner: PlayerId,
    pub shoot_timer: i32,
    pub despawn_timer: i32,
    pub alive: bool,
}

delta_struct!(SentryGun { position, aim_direction, team, health, owner, alive });

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Medkit {
    pub position: Vec2,
    pub respawn_timer: i32,
    pub alive: bool,
}

delta_struct!(Medkit { position, respawn_timer, alive });

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ammopack {
    pub position: Vec2,
    pub respawn_timer: i32,
    pub alive: bool,
}

delta_struct!(Ammopack { position, respawn_timer, alive });

#[derive(Debug, Clone, PartialEq)]
pub struct Flag {
    pub name: String,
    pub position: Vec2,
    pub spawn_position: Vec2,
    pub team: Team,
    pub score: i32,
    pub carrier: PlayerId,
    pub return_timer: i32,
    pub returning: bool,
}

delta_struct!(Flag { name, position, spawn_position, team, score, carrier, return_timer, returning });

#[derive(Debug, Clone, PartialEq)]
pub struct PayloadCart {
    pub team: Team,
    pub track: Vec<Vec2>,
    pub track_index: usize,
    pub push_timer: i32,
}

impl PayloadCart {
    pub fn position(&self) -> Vec2 {
        self.track.get(self.track_index).copied().unwrap_or(Vec2::ZERO)
    }

    pub fn at_end(&self) -> bool {
        self.track_index + 1 >= self.track.len()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct GenericEntity {
    pub position: Vec2,
    pub velocity: Vec2,
    pub tiles: Vec<Vec<char>>,
    pub color: u8,
    pub solid_flags: SolidFlags,
    pub move_interval: i32,
    pub move_timer: i32,
    pub visible: bool,
}

impl GenericEntity {
    pub fn width(&self) -> usize {
        self.tiles.first().map_or(0, |row| row.len())
    }

    pub fn height(&self) -> usize {
        self.tiles.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn enforce_spectator_invariant_clears_class_and_alive() {
        let mut p = Player::new("alice".into(), Team::Red);
        p.class = PlayerClass::Soldier;
        p.alive = true;
        p.team = Team::Spectators;
        p.enforce_spectator_invariant();
        assert_eq!(p.class, PlayerClass::Spectator);
        assert!(!p.alive);
    }

    #[test]
    fn cart_position_tracks_index() {
        let cart = PayloadCart {
            team: Team::Red,
            track: vec![Vec2::new(0, 0), Vec2::new(1, 0), Vec2::new(2, 0)],
            track_index: 1,
            push_timer: 0,
        };
        assert_eq!(cart.position(), Vec2::new(1, 0));
        assert!(!cart.at_end());
    }
}
