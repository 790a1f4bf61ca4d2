use brigade_data::{player_class_stats, weapon_stats};
use brigade_types::{
    AmmopackId, Direction, ExplosionId, FlagId, GenericEntityId, MedkitId, PayloadCartId,
    PlayerClass, PlayerId, ProjectileId, ProjectileType, SentryGunId, SolidFlags, SoundId, Team,
    Vec2, Weapon,
};

use crate::collision::{CollisionMap, EntityRef, Map};
use crate::entities::{
    Ammopack, BlastJumpState, Explosion, Flag, GenericEntity, Medkit, PayloadCart, Player,
    Projectile, SentryGun,
};
use crate::registry::EntityRegistry;
use crate::snapshot::{
    AmmopackView, ExplosionView, FlagView, GenericEntityView, MedkitView, PayloadCartView,
    PlayerView, ProjectileView, SelfPlayerView, SentryGunView, Snapshot,
};

const RESPAWN_TICKS: i32 = 5 * 64;
const FLAG_RETURN_TICKS: i32 = 60 * 64;
const SENTRY_DESPAWN_TICKS: i32 = 3 * 64;
const BACKSTAB_RANGE: u32 = 2;
const BLAST_JUMP_TICKS: u32 = 12;
const BLAST_JUMP_MOVE_INTERVAL: i32 = 1;
const SELF_DAMAGE_COEFFICIENT: f32 = 0.5;
/// Each consecutive blast jump without touching the ground multiplies the
/// push's effective duration by this factor, rewarding chained jumps with a
/// bit more air time rather than an identical repeat.
const BLAST_JUMP_CHAIN_COEFFICIENT: f32 = 1.15;
const STICKIES_PER_OWNER_LIMIT: usize = 8;

/// Who a chat line or score/control-surface broadcast reaches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageScope {
    All,
    Team(Team),
    Player(PlayerId),
}

/// Where a sound plays out and who hears it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SoundScope {
    /// Audible to anyone near `Vec2` regardless of team.
    Positional(Vec2),
    /// Audible to `Team` only, still anchored to a world position.
    Team(Team, Vec2),
    /// Heard by every connected client with no positional falloff.
    Global,
}

/// Gameplay notifications the tick loop raises for the server to relay
/// outward (chat lines, positional/team-scoped/global sounds, round
/// transitions). `World` never touches the network directly; it only
/// appends to this queue, which the server drains once per tick.
#[derive(Debug, Clone, PartialEq)]
pub enum WorldEvent {
    Sound { sound_id: SoundId, scope: SoundScope },
    Chat { text: String, scope: MessageScope },
    FlagCaptured { team: Team, flag_name: String },
    RoundEnded { winner: Option<Team> },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoundState {
    Playing,
    RoundEnd { winner: Option<Team> },
    MapChangeCountdown { ticks_left: u32 },
}

fn collides_with_for(team: Team) -> SolidFlags {
    let enemy = match team.opposite() {
        Team::Red => SolidFlags::RED_ALL,
        Team::Blue => SolidFlags::BLUE_ALL,
        _ => SolidFlags::NONE,
    };
    SolidFlags::WORLD | enemy | SolidFlags::GENERIC
}

/// Tick-driven, single-threaded world simulation: one call to [`World::tick`]
/// advances every entity kind by exactly one tick, in the fixed phase order
/// the rest of this module's functions are laid out in. Nothing here blocks
/// or suspends; a full multiplayer match is just this function called in a
/// loop by the server.
pub struct World {
    pub tick: u32,
    pub round_seconds_left: u32,
    pub map: Map,
    pub round_state: RoundState,

    pub players: EntityRegistry<PlayerId, Player>,
    pub projectiles: EntityRegistry<ProjectileId, Projectile>,
    pub explosions: EntityRegistry<ExplosionId, Explosion>,
    pub sentry_guns: EntityRegistry<SentryGunId, SentryGun>,
    pub medkits: EntityRegistry<MedkitId, Medkit>,
    pub ammopacks: EntityRegistry<AmmopackId, Ammopack>,
    pub generic_entities: EntityRegistry<GenericEntityId, GenericEntity>,
    pub flags: EntityRegistry<FlagId, Flag>,
    pub carts: EntityRegistry<PayloadCartId, PayloadCart>,

    collision_map: CollisionMap,
    events: Vec<WorldEvent>,
}

impl World {
    pub fn new(map: Map, round_seconds: u32) -> Self {
        Self {
            tick: 0,
            round_seconds_left: round_seconds,
            map,
            round_state: RoundState::Playing,
            players: EntityRegistry::new(),
            projectiles: EntityRegistry::new(),
            explosions: EntityRegistry::new(),
            sentry_guns: EntityRegistry::new(),
            medkits: EntityRegistry::new(),
            ammopacks: EntityRegistry::new(),
            generic_entities: EntityRegistry::new(),
            flags: EntityRegistry::new(),
            carts: EntityRegistry::new(),
            collision_map: CollisionMap::new(),
            events: Vec::new(),
        }
    }

    pub fn drain_events(&mut self) -> Vec<WorldEvent> {
        std::mem::take(&mut self.events)
    }

    fn emit_sound(&mut self, sound_id: SoundId, scope: SoundScope) {
        self.events.push(WorldEvent::Sound { sound_id, scope });
    }

    /// Script/control-surface entry point for playing a sound outside the
    /// normal combat/movement rules (e.g. an ambient cue a map script
    /// triggers).
    pub fn broadcast_sound(&mut self, sound_id: SoundId, scope: SoundScope) {
        self.emit_sound(sound_id, scope);
    }

    /// Script/control-surface entry point for a chat line with no
    /// originating player (server announcements, map script messages).
    pub fn broadcast_chat(&mut self, text: String, scope: MessageScope) {
        self.events.push(WorldEvent::Chat { text, scope });
    }

    pub fn connect_player(&mut self, name: String) -> PlayerId {
        self.players.create(Player::new(name, Team::Spectators))
    }

    pub fn disconnect_player(&mut self, id: PlayerId) {
        self.players.remove(id);
        for flag in self.flags.iter_mut().map(|(_, f)| f) {
            if flag.carrier == id {
                flag.carrier = PlayerId::NONE;
                flag.returning = true;
                flag.return_timer = FLAG_RETURN_TICKS;
            }
        }
    }

    /// Applies a team/class selection: spectator clears the combat class and
    /// alive flag (the registry invariant linking the two), anything else
    /// respawns the player into the new class immediately.
    pub fn select_team_and_class(&mut self, id: PlayerId, team: Team, class: PlayerClass, spawn: Vec2) {
        let Some(player) = self.players.find_mut(id) else { return };
        player.team = team;
        player.skin_team = team;
        if team == Team::Spectators {
            player.enforce_spectator_invariant();
            return;
        }
        player.class = class;
        self.respawn_player(id, spawn);
    }

    fn respawn_player(&mut self, id: PlayerId, spawn: Vec2) {
        let Some(player) = self.players.find_mut(id) else { return };
        let Some(stats) = player_class_stats(player.class) else { return };
        player.alive = true;
        player.health = stats.max_health;
        player.position = spawn;
        player.active_weapon = stats.primary;
        player.primary_ammo = weapon_stats(stats.primary).map_or(0, |w| w.clip_size);
        player.secondary_ammo = weapon_stats(stats.secondary).map_or(0, |w| w.clip_size);
        player.respawn_timer = 0;
        player.reloading = false;
        player.blast_jump = BlastJumpState::default();
        player.disguised = false;
        player.skin_team = player.team;
    }

    pub fn tick(&mut self) {
        self.rebuild_collision_map();
        self.advance_players();
        self.advance_sentry_guns();
        self.advance_projectiles();
        self.advance_explosions();
        self.advance_pickups();
        self.advance_generic_entities();
        self.advance_flags();
        self.advance_carts();
        self.advance_round_state();
        self.cleanup();
        self.tick = self.tick.wrapping_add(1);
    }

    // Phase 1 -----------------------------------------------------------

    fn rebuild_collision_map(&mut self) {
        self.collision_map = CollisionMap::new();
        for (id, player) in self.players.iter() {
            if player.alive && !player.noclip {
                let flags = match player.team {
                    Team::Red => SolidFlags::RED_PLAYERS,
                    Team::Blue => SolidFlags::BLUE_PLAYERS,
                    _ => SolidFlags::NONE,
                };
                self.collision_map.insert(player.position, EntityRef::Player(id), flags);
            }
        }
        for (id, p) in self.projectiles.iter() {
            let flags = match p.team {
                Team::Red => SolidFlags::RED_PROJECTILES,
                Team::Blue => SolidFlags::BLUE_PROJECTILES,
                _ => SolidFlags::NONE,
            };
            self.collision_map.insert(p.position, EntityRef::Projectile(id), flags);
        }
        for (id, e) in self.explosions.iter() {
            let flags = match e.team {
                Team::Red => SolidFlags::RED_EXPLOSIONS,
                Team::Blue => SolidFlags::BLUE_EXPLOSIONS,
                _ => SolidFlags::NONE,
            };
            self.collision_map.insert(e.position, EntityRef::Explosion(id), flags);
        }
        for (id, s) in self.sentry_guns.iter() {
            if s.alive {
                let flags = match s.team {
                    Team::Red => SolidFlags::RED_SENTRIES,
                    Team::Blue => SolidFlags::BLUE_SENTRIES,
                    _ => SolidFlags::NONE,
                };
                self.collision_map.insert(s.position, EntityRef::SentryGun(id), flags);
            }
        }
        for (id, m) in self.medkits.iter() {
            if m.alive {
                self.collision_map.insert(m.position, EntityRef::Medkit(id), SolidFlags::MEDKITS);
            }
        }
        for (id, a) in self.ammopacks.iter() {
            if a.alive {
                self.collision_map.insert(a.position, EntityRef::Ammopack(id), SolidFlags::AMMOPACKS);
            }
        }
        for (id, g) in self.generic_entities.iter() {
            if g.visible {
                self.collision_map.insert(g.position, EntityRef::GenericEntity(id), SolidFlags::GENERIC);
            }
        }
        for (id, f) in self.flags.iter() {
            let flags = match f.team {
                Team::Red => SolidFlags::RED_FLAGS,
                Team::Blue => SolidFlags::BLUE_FLAGS,
                _ => SolidFlags::NONE,
            };
            self.collision_map.insert(f.position, EntityRef::Flag(id), flags);
        }
        for (id, c) in self.carts.iter() {
            let flags = match c.team {
                Team::Red => SolidFlags::RED_CARTS,
                Team::Blue => SolidFlags::BLUE_CARTS,
                _ => SolidFlags::NONE,
            };
            self.collision_map.insert(c.position(), EntityRef::PayloadCart(id), flags);
        }
    }

    // Phase 2 -----------------------------------------------------------

    fn advance_players(&mut self) {
        let ids: Vec<PlayerId> = self.players.ids().collect();
        for id in ids {
            self.advance_one_player(id);
        }
    }

    fn advance_one_player(&mut self, id: PlayerId) {
        let spawn_point = Vec2::ZERO;
        let (should_respawn, noclip, team) = {
            let Some(player) = self.players.find_mut(id) else { return };
            if !player.alive {
                if player.team != Team::Spectators {
                    player.respawn_timer -= 1;
                }
                (player.respawn_timer <= 0 && player.team != Team::Spectators, player.noclip, player.team)
            } else {
                (false, player.noclip, player.team)
            }
        };
        if should_respawn {
            self.respawn_player(id, spawn_point);
            return;
        }

        let Some(player) = self.players.find_mut(id) else { return };
        if !player.alive {
            return;
        }

        if player.blast_jump.is_active() {
            player.blast_jump.ticks_remaining -= 1;
        }

        let move_interval = if player.blast_jump.is_active() {
            BLAST_JUMP_MOVE_INTERVAL
        } else {
            player_class_stats(player.class).map_or(i32::MAX, |s| s.move_interval)
        };
        let move_direction =
            if player.blast_jump.is_active() { player.blast_jump.direction } else { player.move_direction };

        player.move_timer -= 1;
        if player.move_timer <= 0 {
            let collides_with = collides_with_for(team);
            let position = player.position;
            if noclip || self.map.can_move(&self.collision_map, position, collides_with, noclip, move_direction) {
                let Some(player) = self.players.find_mut(id) else { return };
                player.position = player.position.add(move_direction.to_step());
            }
            if let Some(player) = self.players.find_mut(id) {
                player.move_timer = move_interval.max(1);
            }
        }

        self.tick_weapon(id);
    }

    fn tick_weapon(&mut self, id: PlayerId) {
        let Some(player) = self.players.find_mut(id) else { return };
        if player.shoot_timer > 0 {
            player.shoot_timer -= 1;
        }
        if player.reloading {
            player.reload_timer -= 1;
            if player.reload_timer <= 0 {
                player.reloading = false;
                let weapon = player.active_weapon;
                if let Some(stats) = weapon_stats(weapon) {
                    player.primary_ammo = stats.clip_size;
                }
            }
            return;
        }
        if !(player.attack1 || player.attack2) || player.shoot_timer > 0 {
            return;
        }
        let weapon = player.active_weapon;
        let Some(stats) = weapon_stats(weapon) else { return };
        if player.primary_ammo < stats.ammo_per_shot {
            player.reloading = true;
            player.reload_timer = stats.reload_delay;
            return;
        }
        player.primary_ammo -= stats.ammo_per_shot;
        player.shoot_timer = stats.shoot_interval;
        self.fire_weapon(id, weapon);
    }

    fn fire_weapon(&mut self, id: PlayerId, weapon: Weapon) {
        let Some(player) = self.players.find(id) else { return };
        let (position, team, aim, owner_class) = (player.position, player.team, player.aim_direction, player.class);
        let Some(stats) = weapon_stats(weapon) else { return };

        match weapon {
            Weapon::Knife => self.attempt_backstab(id, position, team, aim),
            Weapon::RocketLauncher | Weapon::StickybombLauncher => {
                if owner_class.can_blast_jump() && aim == Direction::NONE {
                    self.blast_jump(id);
                } else {
                    self.spawn_projectile(id, team, position, aim, weapon, stats.damage, stats.projectile, stats.hurt_sound);
                }
            }
            Weapon::Shotgun | Weapon::Scattergun => {
                for _ in 0..5 {
                    self.spawn_projectile(id, team, position, aim, weapon, stats.damage, stats.projectile, stats.hurt_sound);
                }
            }
            Weapon::SniperRifle => {
                let collides_with = collides_with_for(team);
                let end = self.map.clipped_line(&self.collision_map, position, aim, 255, collides_with);
                let target_id = self.collision_map.occupants_intersecting(end, collides_with).next();
                if let Some(target_id) = target_id {
                    if let EntityRef::Player(target) = target_id {
                        self.apply_damage_to_player(target, stats.damage, stats.hurt_sound, false, id, weapon);
                    }
                }
            }
            Weapon::BuildTool => {
                let spawn = position.add(aim.to_step());
                self.sentry_guns.create(SentryGun {
                    position: spawn,
                    aim_direction: aim,
                    team,
                    health: 100,
                    owner: id,
                    shoot_timer: 0,
                    despawn_timer: 0,
                    alive: true,
                });
            }
            _ => {
                self.spawn_projectile(id, team, position, aim, weapon, stats.damage, stats.projectile, stats.hurt_sound);
            }
        }
        self.emit_sound(stats.shoot_sound, SoundScope::Positional(position));
    }

    fn spawn_projectile(
        &mut self,
        owner: PlayerId,
        team: Team,
        position: Vec2,
        direction: Direction,
        weapon: Weapon,
        damage: i32,
        kind: ProjectileType,
        hurt_sound: SoundId,
    ) {
        if kind == ProjectileType::Sticky {
            let live: Vec<ProjectileId> = self
                .projectiles
                .iter()
                .filter(|(_, p)| p.owner == owner && p.kind == ProjectileType::Sticky)
                .map(|(id, _)| id)
                .collect();
            if live.len() >= STICKIES_PER_OWNER_LIMIT {
                if let Some(&oldest) = live.first() {
                    self.detonate_projectile(oldest);
                }
            }
        }
        let stats = brigade_data::projectile_stats(kind);
        self.projectiles.create(Projectile {
            position,
            kind,
            team,
            move_direction: direction,
            owner,
            weapon,
            damage,
            hurt_sound,
            disappear_ticks: stats.map_or(0, |s| s.disappear_time),
            move_interval: stats.map_or(1, |s| s.move_interval).max(1),
            move_timer: 0,
            sticky_attached: false,
        });
    }

    fn attempt_backstab(&mut self, attacker: PlayerId, position: Vec2, team: Team, aim: Direction) {
        let target_pos = position.add(aim.to_step());
        let victims: Vec<PlayerId> = self
            .players
            .iter()
            .filter(|(pid, p)| {
                *pid != attacker
                    && p.alive
                    && p.team != team
                    && p.position.manhattan_distance(target_pos) <= BACKSTAB_RANGE
                    && p.aim_direction == aim
            })
            .map(|(pid, _)| pid)
            .collect();
        if let Some(&victim) = victims.first() {
            self.apply_damage_to_player(victim, i32::MAX, SoundId::SpyKill, false, attacker, Weapon::Knife);
        }
    }

    fn blast_jump(&mut self, id: PlayerId) {
        let Some(player) = self.players.find_mut(id) else { return };
        let direction = player.move_direction;
        let chain = player.blast_jump.chain_count + 1;
        let ticks = (BLAST_JUMP_TICKS as f32 * BLAST_JUMP_CHAIN_COEFFICIENT.powi(chain as i32 - 1)) as u32;
        player.blast_jump = BlastJumpState { direction, ticks_remaining: ticks, chain_count: chain };
        self.apply_damage_to_player(id, 1, SoundId::None, true, id, Weapon::RocketLauncher);
    }

    // Phase 3 -----------------------------------------------------------

    fn advance_sentry_guns(&mut self) {
        let ids: Vec<SentryGunId> = self.sentry_guns.ids().collect();
        for id in ids {
            self.advance_one_sentry(id);
        }
    }

    fn advance_one_sentry(&mut self, id: SentryGunId) {
        let Some(sentry) = self.sentry_guns.find_mut(id) else { return };
        if !sentry.alive {
            sentry.despawn_timer -= 1;
            return;
        }
        let (position, team) = (sentry.position, sentry.team);
        let nearest = self
            .players
            .iter()
            .filter(|(_, p)| p.alive && p.team != team && !p.noclip)
            .min_by_key(|(_, p)| p.position.manhattan_distance(position));

        let Some((target_id, target)) = nearest.map(|(id, p)| (id, p.clone())) else { return };
        let Some(sentry) = self.sentry_guns.find_mut(id) else { return };
        let diff = (target.position.x as f32 - position.x as f32, target.position.y as f32 - position.y as f32);
        sentry.aim_direction = Direction::from_offset(diff.0, diff.1);
        if sentry.shoot_timer > 0 {
            sentry.shoot_timer -= 1;
            return;
        }
        sentry.shoot_timer = 16;
        let Some(stats) = weapon_stats(Weapon::SentryGun) else { return };
        self.apply_damage_to_player(target_id, stats.damage, stats.hurt_sound, false, PlayerId::NONE, Weapon::SentryGun);
        self.emit_sound(SoundId::SentryFire, SoundScope::Positional(position));
    }

    // Phase 4 -----------------------------------------------------------

    fn advance_projectiles(&mut self) {
        let ids: Vec<ProjectileId> = self.projectiles.ids().collect();
        for id in ids {
            self.advance_one_projectile(id);
        }
    }

    fn advance_one_projectile(&mut self, id: ProjectileId) {
        let Some(p) = self.projectiles.find_mut(id) else { return };
        if p.sticky_attached {
            return;
        }
        p.move_timer -= 1;
        let should_move = p.move_timer <= 0;
        if should_move {
            p.move_timer = p.move_interval;
        }
        let (position, direction, collides_with) = (p.position, p.move_direction, collides_with_for(p.team));

        if should_move {
            if !self.map.can_move(&self.collision_map, position, collides_with, false, direction) {
                self.resolve_projectile_collision(id, position);
                return;
            }
            let new_pos = position.add(direction.to_step());
            let hits: Vec<EntityRef> = self.collision_map.occupants_intersecting(new_pos, collides_with).collect();
            for hit in hits {
                if let EntityRef::Player(target) = hit {
                    self.resolve_projectile_hit(id, target);
                    return;
                }
            }
            if let Some(p) = self.projectiles.find_mut(id) {
                p.position = new_pos;
            }
        }

        let Some(p) = self.projectiles.find_mut(id) else { return };
        if p.kind.persists_until_detonated() {
            return;
        }
        p.disappear_ticks -= 1;
        if p.disappear_ticks <= 0 {
            if p.kind.explodes_on_expiry() {
                self.detonate_projectile(id);
            } else {
                self.projectiles.remove(id);
            }
        }
    }

    fn resolve_projectile_collision(&mut self, id: ProjectileId, _position: Vec2) {
        let Some(p) = self.projectiles.find(id) else { return };
        if p.kind.explodes_on_expiry() || p.kind == ProjectileType::Sticky {
            self.detonate_projectile(id);
        } else {
            self.projectiles.remove(id);
        }
    }

    fn resolve_projectile_hit(&mut self, id: ProjectileId, target: PlayerId) {
        let Some(p) = self.projectiles.find(id).cloned() else { return };
        if p.kind.explodes_on_expiry() {
            self.detonate_projectile(id);
            return;
        }
        self.apply_damage_to_player(target, p.damage, p.hurt_sound, false, p.owner, p.weapon);
        self.projectiles.remove(id);
    }

    fn detonate_projectile(&mut self, id: ProjectileId) {
        let Some(p) = self.projectiles.find(id).cloned() else { return };
        self.projectiles.remove(id);
        self.explosions.create(Explosion {
            position: p.position,
            team: p.team,
            owner: p.owner,
            weapon: p.weapon,
            damage: p.damage,
            hurt_sound: p.hurt_sound,
            disappear_ticks: 1,
            damaged_players: Vec::new(),
            damaged_sentries: Vec::new(),
        });
        self.emit_sound(SoundId::Explosion, SoundScope::Positional(p.position));
    }

    // Phase 5 -----------------------------------------------------------

    fn advance_explosions(&mut self) {
        let ids: Vec<ExplosionId> = self.explosions.ids().collect();
        for id in ids {
            self.advance_one_explosion(id);
        }
    }

    fn advance_one_explosion(&mut self, id: ExplosionId) {
        let Some(exp) = self.explosions.find(id).cloned() else { return };
        let nearby: Vec<PlayerId> = self
            .players
            .iter()
            .filter(|(pid, p)| {
                p.alive && p.position.manhattan_distance(exp.position) <= 1 && !exp.damaged_players.contains(pid)
            })
            .map(|(pid, _)| pid)
            .collect();
        for target in nearby {
            let self_inflicted = target == exp.owner;
            let damage = if self_inflicted {
                (exp.damage as f32 * SELF_DAMAGE_COEFFICIENT) as i32
            } else {
                exp.damage
            };
            self.apply_damage_to_player(target, damage, exp.hurt_sound, false, exp.owner, exp.weapon);
            if let Some(exp) = self.explosions.find_mut(id) {
                exp.damaged_players.push(target);
            }
        }

        let nearby_sentries: Vec<SentryGunId> = self
            .sentry_guns
            .iter()
            .filter(|(sid, s)| {
                s.alive && s.position.manhattan_distance(exp.position) <= 1 && !exp.damaged_sentries.contains(sid)
            })
            .map(|(sid, _)| sid)
            .collect();
        for sentry_id in nearby_sentries {
            if let Some(sentry) = self.sentry_guns.find_mut(sentry_id) {
                sentry.health -= exp.damage;
                if sentry.health <= 0 {
                    sentry.alive = false;
                    sentry.despawn_timer = SENTRY_DESPAWN_TICKS;
                }
            }
            if let Some(exp) = self.explosions.find_mut(id) {
                exp.damaged_sentries.push(sentry_id);
            }
        }

        if let Some(exp) = self.explosions.find_mut(id) {
            exp.disappear_ticks -= 1;
            if exp.disappear_ticks <= 0 {
                self.explosions.remove(id);
            }
        }
    }

    // Phase 6 -----------------------------------------------------------

    fn advance_pickups(&mut self) {
        for (_, m) in self.medkits.iter_mut() {
            if !m.alive {
                m.respawn_timer -= 1;
                if m.respawn_timer <= 0 {
                    m.alive = true;
                }
            }
        }
        for (_, a) in self.ammopacks.iter_mut() {
            if !a.alive {
                a.respawn_timer -= 1;
                if a.respawn_timer <= 0 {
                    a.alive = true;
                }
            }
        }

        let medkit_hits: Vec<(MedkitId, Vec2)> =
            self.medkits.iter().filter(|(_, m)| m.alive).map(|(id, m)| (id, m.position)).collect();
        for (id, pos) in medkit_hits {
            if let Some(player) = self
                .players
                .iter_mut()
                .find(|(_, p)| p.alive && p.position == pos)
                .map(|(_, p)| p)
            {
                if let Some(stats) = player_class_stats(player.class) {
                    player.health = (player.health + 50).min(stats.max_health);
                }
                if let Some(m) = self.medkits.find_mut(id) {
                    m.alive = false;
                    m.respawn_timer = 10 * 64;
                }
            }
        }
    }

    // Phase 7 -----------------------------------------------------------

    fn advance_generic_entities(&mut self) {
        let ids: Vec<GenericEntityId> = self.generic_entities.ids().collect();
        for id in ids {
            let Some(entity) = self.generic_entities.find_mut(id) else { continue };
            if entity.velocity == Vec2::ZERO {
                continue;
            }
            entity.move_timer -= 1;
            if entity.move_timer > 0 {
                continue;
            }
            entity.move_timer = entity.move_interval.max(1);
            let (position, velocity, solid_flags) = (entity.position, entity.velocity, entity.solid_flags);
            let dest = position.add(velocity);
            let blocked = self.collision_map.occupants_intersecting(dest, solid_flags).next().is_some();
            if !blocked {
                if let Some(entity) = self.generic_entities.find_mut(id) {
                    entity.position = dest;
                }
            }
        }
    }

    // Phase 8 -----------------------------------------------------------

    fn advance_flags(&mut self) {
        let ids: Vec<FlagId> = self.flags.ids().collect();
        for id in ids {
            self.advance_one_flag(id);
        }
    }

    fn advance_one_flag(&mut self, id: FlagId) {
        let Some(flag) = self.flags.find(id).cloned() else { return };

        if flag.returning {
            if let Some(f) = self.flags.find_mut(id) {
                f.return_timer -= 1;
                if f.return_timer <= 0 {
                    f.position = f.spawn_position;
                    f.returning = false;
                }
            }
            return;
        }

        if !flag.carrier.is_none() {
            let Some(carrier) = self.players.find(flag.carrier) else {
                if let Some(f) = self.flags.find_mut(id) {
                    f.carrier = PlayerId::NONE;
                    f.returning = true;
                    f.return_timer = FLAG_RETURN_TICKS;
                }
                return;
            };
            if !carrier.alive {
                let carrier_pos = carrier.position;
                if let Some(f) = self.flags.find_mut(id) {
                    f.carrier = PlayerId::NONE;
                    f.position = carrier_pos;
                    f.returning = true;
                    f.return_timer = FLAG_RETURN_TICKS;
                }
                return;
            }
            let carrier_team = carrier.team;
            let carrier_pos = carrier.position;
            if let Some(f) = self.flags.find_mut(id) {
                f.position = carrier_pos;
            }
            if carrier_team != flag.team && carrier_pos == Self::team_spawn(carrier_team) {
                self.capture_flag(id, flag.carrier, carrier_team);
            }
            return;
        }

        // Uncarried: check for pickup by an enemy player standing on it.
        let carriers: Vec<PlayerId> = self
            .players
            .iter()
            .filter(|(_, p)| p.alive && p.team != flag.team && p.position == flag.position)
            .map(|(pid, _)| pid)
            .collect();
        if let Some(&picker) = carriers.first() {
            if let Some(f) = self.flags.find_mut(id) {
                f.carrier = picker;
            }
            self.emit_sound(SoundId::FlagPickup, SoundScope::Positional(flag.position));
        }
    }

    fn team_spawn(team: Team) -> Vec2 {
        match team {
            Team::Red => Vec2::new(5, 5),
            Team::Blue => Vec2::new(50, 50),
            _ => Vec2::ZERO,
        }
    }

    fn capture_flag(&mut self, flag_id: FlagId, carrier: PlayerId, capturing_team: Team) {
        let Some(flag) = self.flags.find_mut(flag_id) else { return };
        flag.carrier = PlayerId::NONE;
        flag.returning = true;
        flag.return_timer = FLAG_RETURN_TICKS;
        flag.score += 1;
        let flag_name = flag.name.clone();
        if let Some(player) = self.players.find_mut(carrier) {
            player.score += 5;
        }
        self.events.push(WorldEvent::FlagCaptured { team: capturing_team, flag_name: flag_name.clone() });
        self.emit_sound(SoundId::FlagCapture, SoundScope::Positional(Self::team_spawn(capturing_team)));
        self.events.push(WorldEvent::Chat {
            text: format!("{} captured {}'s flag", capturing_team.name(), flag_name),
            scope: MessageScope::All,
        });
    }

    // Phase 9 -----------------------------------------------------------

    fn advance_carts(&mut self) {
        let ids: Vec<PayloadCartId> = self.carts.ids().collect();
        for id in ids {
            self.advance_one_cart(id);
        }
    }

    fn advance_one_cart(&mut self, id: PayloadCartId) {
        let Some(cart) = self.carts.find(id).cloned() else { return };
        let position = cart.position();
        let pushers = self
            .players
            .iter()
            .filter(|(_, p)| p.alive && p.team == cart.team && p.position.manhattan_distance(position) <= 1)
            .count();
        let defenders = self
            .players
            .iter()
            .filter(|(_, p)| p.alive && p.team != cart.team && p.position.manhattan_distance(position) <= 1)
            .count();
        if defenders > 0 || pushers == 0 {
            return;
        }
        let Some(cart) = self.carts.find_mut(id) else { return };
        cart.push_timer -= 1;
        if cart.push_timer > 0 {
            return;
        }
        cart.push_timer = 8;
        if cart.at_end() {
            let team = cart.team;
            self.events.push(WorldEvent::RoundEnded { winner: Some(team) });
            self.round_state = RoundState::RoundEnd { winner: Some(team) };
        } else {
            cart.track_index += 1;
        }
    }

    // Phase 10 ------------------------------------------------------------

    fn advance_round_state(&mut self) {
        match self.round_state {
            RoundState::Playing => {
                if self.round_seconds_left > 0 {
                    if self.tick % 64 == 0 {
                        self.round_seconds_left -= 1;
                    }
                    if self.round_seconds_left == 0 {
                        self.events.push(WorldEvent::RoundEnded { winner: None });
                        self.round_state = RoundState::RoundEnd { winner: None };
                    }
                }
            }
            RoundState::RoundEnd { .. } => {
                self.round_state = RoundState::MapChangeCountdown { ticks_left: 5 * 64 };
            }
            RoundState::MapChangeCountdown { ticks_left } => {
                if ticks_left <= 1 {
                    self.round_state = RoundState::Playing;
                } else {
                    self.round_state = RoundState::MapChangeCountdown { ticks_left: ticks_left - 1 };
                }
            }
        }
    }

    /// Ends the round immediately with an optional winning team, honoring
    /// the control surface's explicit round-end operation (as opposed to
    /// timer or cart-push triggered endings).
    pub fn end_round(&mut self, winner: Option<Team>) {
        self.events.push(WorldEvent::RoundEnded { winner });
        self.round_state = RoundState::RoundEnd { winner };
    }

    /// Script/control-surface entry point for "reset round/map": drops back
    /// to `RoundState::Playing` with a fresh timer, independent of whatever
    /// state the round was in. Entities are left alone; a full map reload is
    /// a `Server`-level operation this crate has no say over.
    pub fn reset_round(&mut self, round_seconds: u32) {
        self.round_seconds_left = round_seconds;
        self.round_state = RoundState::Playing;
    }

    /// Script/control-surface teleport: moves a player's position directly,
    /// bypassing collision and move timers. Returns `false` if `id` doesn't
    /// resolve to a connected player.
    pub fn teleport_player(&mut self, id: PlayerId, position: Vec2) -> bool {
        let Some(player) = self.players.find_mut(id) else { return false };
        player.position = position;
        true
    }

    /// Script/control-surface score award: adds `delta` to a player's score
    /// (negative to deduct). Returns `false` if `id` doesn't resolve.
    pub fn award_score(&mut self, id: PlayerId, delta: i32) -> bool {
        let Some(player) = self.players.find_mut(id) else { return false };
        player.score += delta;
        true
    }

    /// First connected player whose name matches exactly, for the control
    /// surface's lookup-by-name operation.
    pub fn find_player_id_by_name(&self, name: &str) -> Option<PlayerId> {
        self.players.iter().find(|(_, p)| p.name == name).map(|(id, _)| id)
    }

    /// Every connected player id, for the control surface's list-ids
    /// operation.
    pub fn player_ids(&self) -> Vec<PlayerId> {
        self.players.ids().collect()
    }

    /// Script/control-surface entity creation: spawns a map-script-authored
    /// solid entity (a sign, a prop, a scripted trigger volume) outside the
    /// normal map-load path.
    pub fn spawn_generic_entity(&mut self, entity: GenericEntity) -> GenericEntityId {
        self.generic_entities.create(entity)
    }

    /// Script/control-surface entity destruction. Returns `false` if `id`
    /// doesn't resolve.
    pub fn destroy_generic_entity(&mut self, id: GenericEntityId) -> bool {
        self.generic_entities.remove(id)
    }

    // Phase 11 ------------------------------------------------------------

    fn cleanup(&mut self) {
        let over_limit_stickies: Vec<ProjectileId> = {
            let mut by_owner: std::collections::HashMap<PlayerId, Vec<ProjectileId>> = std::collections::HashMap::new();
            for (id, p) in self.projectiles.iter() {
                if p.kind == ProjectileType::Sticky {
                    by_owner.entry(p.owner).or_default().push(id);
                }
            }
            by_owner
                .into_values()
                .flat_map(|mut v| {
                    if v.len() > STICKIES_PER_OWNER_LIMIT {
                        v.split_off(STICKIES_PER_OWNER_LIMIT)
                    } else {
                        Vec::new()
                    }
                })
                .collect()
        };
        for id in over_limit_stickies {
            self.detonate_projectile(id);
        }
    }

    // Damage --------------------------------------------------------------

    /// Applies damage (or, with a negative amount, healing) to `target`.
    /// A kill credits `inflictor`'s score, starts the respawn countdown, and
    /// emits a death sound; negative amounts heal, capped at the class max
    /// unless `allow_overheal` is set.
    pub fn apply_damage_to_player(
        &mut self,
        target: PlayerId,
        amount: i32,
        hurt_sound: SoundId,
        allow_overheal: bool,
        inflictor: PlayerId,
        _weapon: Weapon,
    ) {
        let Some(player) = self.players.find_mut(target) else { return };
        if !player.alive {
            return;
        }
        let max_health = player_class_stats(player.class).map_or(i32::MAX, |s| s.max_health);
        if amount < 0 {
            player.health -= amount;
            if !allow_overheal {
                player.health = player.health.min(max_health);
            }
            return;
        }

        player.health -= amount;
        let position = player.position;
        if hurt_sound != SoundId::None {
            self.emit_sound(hurt_sound, SoundScope::Positional(position));
        }
        let Some(player) = self.players.find_mut(target) else { return };
        if player.health <= 0 {
            player.alive = false;
            player.respawn_timer = RESPAWN_TICKS;
            self.emit_sound(SoundId::Death, SoundScope::Positional(position));
            if !inflictor.is_none() && inflictor != target {
                if let Some(killer) = self.players.find_mut(inflictor) {
                    killer.score += 1;
                }
            }
        }
    }

    // Snapshot --------------------------------------------------------------

    /// Builds the snapshot view `for_player` would receive this tick:
    /// self-player detail for its own entity, disguise-aware `skin_team`
    /// substitution for every other player, and per-kind renderable lists.
    pub fn take_snapshot(&self, for_player: PlayerId) -> Snapshot {
        let viewer_team = self.players.find(for_player).map_or(Team::Spectators, |p| p.team);

        let self_player = self.players.find(for_player).map_or(
            SelfPlayerView {
                player_id: for_player,
                position: Vec2::ZERO,
                team: Team::Spectators,
                class: PlayerClass::Spectator,
                alive: false,
                health: 0,
                primary_ammo: 0,
                secondary_ammo: 0,
                noclip: false,
                score: 0,
            },
            |p| SelfPlayerView {
                player_id: for_player,
                position: p.position,
                team: p.team,
                class: p.class,
                alive: p.alive,
                health: p.health,
                primary_ammo: p.primary_ammo,
                secondary_ammo: p.secondary_ammo,
                noclip: p.noclip,
                score: p.score,
            },
        );

        let mut players = Vec::new();
        let mut corpses = Vec::new();
        for (id, p) in self.players.iter() {
            if id == for_player {
                continue;
            }
            let skin_team = if p.disguised && p.team != viewer_team { viewer_team } else { p.team };
            let view = PlayerView {
                player_id: id,
                name: p.name.clone(),
                position: p.position,
                skin_team,
                class: p.class,
                alive: p.alive,
                aim_direction: p.aim_direction,
                hat: p.hat,
                score: p.score,
            };
            if p.alive {
                players.push(view);
            } else {
                corpses.push(view);
            }
        }

        Snapshot {
            tick: self.tick,
            round_seconds_left: self.round_seconds_left,
            self_player,
            players,
            corpses,
            sentry_guns: self
                .sentry_guns
                .iter()
                .map(|(id, s)| SentryGunView {
                    sentry_gun_id: id,
                    position: s.position,
                    aim_direction: s.aim_direction,
                    team: s.team,
                    alive: s.alive,
                })
                .collect(),
            projectiles: self
                .projectiles
                .iter()
                .map(|(id, p)| ProjectileView {
                    projectile_id: id,
                    position: p.position,
                    kind: p.kind,
                    team: p.team,
                    move_direction: p.move_direction,
                })
                .collect(),
            explosions: self
                .explosions
                .iter()
                .map(|(id, e)| ExplosionView { explosion_id: id, position: e.position, team: e.team })
                .collect(),
            medkits: self
                .medkits
                .iter()
                .map(|(id, m)| MedkitView { medkit_id: id, position: m.position, alive: m.alive })
                .collect(),
            ammopacks: self
                .ammopacks
                .iter()
                .map(|(id, a)| AmmopackView { ammopack_id: id, position: a.position, alive: a.alive })
                .collect(),
            generic_entities: self
                .generic_entities
                .iter()
                .map(|(id, g)| GenericEntityView {
                    generic_entity_id: id,
                    position: g.position,
                    color: g.color,
                    visible: g.visible,
                })
                .collect(),
            flags: self
                .flags
                .iter()
                .map(|(id, f)| FlagView {
                    flag_id: id,
                    name: f.name.clone(),
                    position: f.position,
                    team: f.team,
                    carrier: f.carrier,
                })
                .collect(),
            carts: self
                .carts
                .iter()
                .map(|(id, c)| PayloadCartView { cart_id: id, position: c.position(), team: c.team })
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_world() -> World {
        World::new(Map::empty(64, 64), 300)
    }

    #[test]
    fn backstab_kills_in_one_hit_and_credits_the_spy() {
        let mut world = test_world();
        let spy = world.connect_player("spy".into());
        let soldier = world.connect_player("soldier".into());
        world.select_team_and_class(spy, Team::Red, PlayerClass::Spy, Vec2::new(10, 10));
        world.select_team_and_class(soldier, Team::Blue, PlayerClass::Soldier, Vec2::new(11, 10));

        {
            let p = world.players.find_mut(spy).unwrap();
            p.aim_direction = Direction::RIGHT;
            p.attack1 = true;
            p.active_weapon = Weapon::Knife;
        }
        {
            // Stationary but facing right: movement input must not matter,
            // only the facing direction, for the backstab check to land.
            let s = world.players.find_mut(soldier).unwrap();
            s.aim_direction = Direction::RIGHT;
            s.move_direction = Direction::NONE;
        }

        world.tick();

        assert!(!world.players.find(soldier).unwrap().alive);
        assert_eq!(world.players.find(spy).unwrap().score, 1);
        let events = world.drain_events();
        assert!(events.iter().any(|e| matches!(e, WorldEvent::Sound { sound_id: SoundId::SpyKill, .. })));
    }

    #[test]
    fn flag_capture_scores_and_returns_the_flag() {
        let mut world = test_world();
        let carrier = world.connect_player("runner".into());
        world.select_team_and_class(carrier, Team::Blue, PlayerClass::Scout, Vec2::new(5, 5));

        let flag = world.flags.create(Flag {
            name: "RED".into(),
            position: Vec2::new(5, 5),
            spawn_position: Vec2::new(5, 5),
            team: Team::Red,
            score: 0,
            carrier: PlayerId::NONE,
            return_timer: 0,
            returning: false,
        });

        world.tick();
        assert_eq!(world.flags.find(flag).unwrap().carrier, carrier);

        {
            let p = world.players.find_mut(carrier).unwrap();
            p.position = World::team_spawn(Team::Blue);
        }
        world.tick();

        let f = world.flags.find(flag).unwrap();
        assert_eq!(f.carrier, PlayerId::NONE);
        assert_eq!(f.score, 1);
        assert_eq!(world.players.find(carrier).unwrap().score, 5);
    }

    #[test]
    fn tick_advances_monotonically() {
        let mut world = test_world();
        let before = world.tick;
        world.tick();
        assert_eq!(world.tick, before.wrapping_add(1));
    }
}
