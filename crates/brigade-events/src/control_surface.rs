use brigade_types::{GenericEntityId, PlayerClass, PlayerId, SoundId, Team, Vec2, Weapon};
use brigade_world::{GenericEntity, MessageScope, SoundScope, World};

/// A single named, typed field on an entity, for the control surface's
/// get/set-field operations. Trimmed to the handful of fields a map script
/// actually needs to read or poke; anything finer-grained goes through the
/// dedicated operations (`apply_damage`, `teleport`, `award_score`) instead.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum EntityField {
    Position(Vec2),
    Health(i32),
    Score(i32),
    Team(Team),
    Class(PlayerClass),
    Alive(bool),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ControlSurfaceError {
    #[error("no entity with that id")]
    NoSuchEntity,
    #[error("field does not apply to this entity kind")]
    WrongFieldKind,
}

/// The scripting-facing surface of a running game instance: create/destroy
/// entities, poke damage/position/score, broadcast chat/sound, and drive
/// round transitions, matching spec.md's control-surface operation list.
/// `World` implements the entity/simulation half directly; the
/// connection-lifecycle half (ban/unban, kick, bot add/kick, change level,
/// lookup by IP) has no meaning without a socket and connection map, so it
/// is implemented by `brigade-server::Server` instead, not here.
pub trait ScriptControlSurface {
    fn create_entity(&mut self, entity: GenericEntity) -> GenericEntityId;
    fn destroy_entity(&mut self, id: GenericEntityId) -> bool;

    fn apply_damage(&mut self, target: PlayerId, amount: i32, inflictor: PlayerId);
    fn teleport(&mut self, target: PlayerId, position: Vec2) -> bool;

    fn get_field(&self, target: PlayerId, field: &str) -> Option<EntityField>;
    fn set_field(&mut self, target: PlayerId, field: EntityField) -> Result<(), ControlSurfaceError>;

    fn award_score(&mut self, target: PlayerId, delta: i32) -> bool;

    fn list_player_ids(&self) -> Vec<PlayerId>;
    fn find_player_by_name(&self, name: &str) -> Option<PlayerId>;

    fn broadcast_chat(&mut self, text: String, scope: MessageScope);
    fn broadcast_sound(&mut self, sound_id: SoundId, scope: SoundScope);

    fn end_round(&mut self, winner: Option<Team>);
    fn reset_round(&mut self, round_seconds: u32);
}

impl ScriptControlSurface for World {
    fn create_entity(&mut self, entity: GenericEntity) -> GenericEntityId {
        self.spawn_generic_entity(entity)
    }

    fn destroy_entity(&mut self, id: GenericEntityId) -> bool {
        self.destroy_generic_entity(id)
    }

    fn apply_damage(&mut self, target: PlayerId, amount: i32, inflictor: PlayerId) {
        self.apply_damage_to_player(target, amount, SoundId::None, false, inflictor, Weapon::None);
    }

    fn teleport(&mut self, target: PlayerId, position: Vec2) -> bool {
        self.teleport_player(target, position)
    }

    fn get_field(&self, target: PlayerId, field: &str) -> Option<EntityField> {
        let player = self.players.find(target)?;
        match field {
            "position" => Some(EntityField::Position(player.position)),
            "health" => Some(EntityField::Health(player.health)),
            "score" => Some(EntityField::Score(player.score)),
            "team" => Some(EntityField::Team(player.team)),
            "class" => Some(EntityField::Class(player.class)),
            "alive" => Some(EntityField::Alive(player.alive)),
            _ => None,
        }
    }

    fn set_field(&mut self, target: PlayerId, field: EntityField) -> Result<(), ControlSurfaceError> {
        let player = self.players.find_mut(target).ok_or(ControlSurfaceError::NoSuchEntity)?;
        match field {
            EntityField::Position(v) => player.position = v,
            EntityField::Health(h) => player.health = h,
            EntityField::Score(s) => player.score = s,
            EntityField::Team(t) => player.team = t,
            EntityField::Class(c) => player.class = c,
            EntityField::Alive(a) => player.alive = a,
        }
        Ok(())
    }

    fn award_score(&mut self, target: PlayerId, delta: i32) -> bool {
        World::award_score(self, target, delta)
    }

    fn list_player_ids(&self) -> Vec<PlayerId> {
        self.player_ids()
    }

    fn find_player_by_name(&self, name: &str) -> Option<PlayerId> {
        self.find_player_id_by_name(name)
    }

    fn broadcast_chat(&mut self, text: String, scope: MessageScope) {
        World::broadcast_chat(self, text, scope)
    }

    fn broadcast_sound(&mut self, sound_id: SoundId, scope: SoundScope) {
        World::broadcast_sound(self, sound_id, scope)
    }

    fn end_round(&mut self, winner: Option<Team>) {
        World::end_round(self, winner)
    }

    fn reset_round(&mut self, round_seconds: u32) {
        World::reset_round(self, round_seconds)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use brigade_world::Map;

    fn world() -> World {
        World::new(Map::empty(32, 32), 300)
    }

    #[test]
    fn get_and_set_field_roundtrip() {
        let mut w = world();
        let id = w.connect_player("Alice".into());
        w.select_team_and_class(id, Team::Red, PlayerClass::Soldier, Vec2::new(1, 1));

        ScriptControlSurface::set_field(&mut w, id, EntityField::Score(7)).unwrap();
        assert_eq!(ScriptControlSurface::get_field(&w, id, "score"), Some(EntityField::Score(7)));
    }

    #[test]
    fn set_field_on_unknown_player_errors() {
        let mut w = world();
        let bogus = PlayerId(9999);
        assert_eq!(
            ScriptControlSurface::set_field(&mut w, bogus, EntityField::Score(1)),
            Err(ControlSurfaceError::NoSuchEntity)
        );
    }

    #[test]
    fn find_by_name_matches_connected_player() {
        let mut w = world();
        let id = w.connect_player("Bob".into());
        assert_eq!(ScriptControlSurface::find_player_by_name(&w, "Bob"), Some(id));
        assert_eq!(ScriptControlSurface::find_player_by_name(&w, "Nobody"), None);
    }

    #[test]
    fn create_and_destroy_entity_roundtrip() {
        let mut w = world();
        let entity = GenericEntity {
            position: Vec2::new(3, 3),
            velocity: Vec2::ZERO,
            tiles: vec![vec!['#']],
            color: 0,
            solid_flags: Default::default(),
            move_interval: 0,
            move_timer: 0,
            visible: true,
        };
        let id = ScriptControlSurface::create_entity(&mut w, entity);
        assert!(ScriptControlSurface::destroy_entity(&mut w, id));
        assert!(!ScriptControlSurface::destroy_entity(&mut w, id));
    }
}
