use std::collections::HashMap;

use brigade_types::{
    AmmopackId, Direction, ExplosionId, FlagId, GenericEntityId, MedkitId, PayloadCartId,
    PlayerId, ProjectileId, SentryGunId, SolidFlags, Vec2,
};

/// Identifies which registry (and id within it) occupies a collision-map
/// cell, so collision resolution can look the entity back up without the
/// collision map owning any entity data itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityRef {
    Player(PlayerId),
    Projectile(ProjectileId),
    Explosion(ExplosionId),
    SentryGun(SentryGunId),
    Medkit(MedkitId),
    Ammopack(AmmopackId),
    GenericEntity(GenericEntityId),
    Flag(FlagId),
    PayloadCart(PayloadCartId),
}

#[derive(Debug, Clone, Copy)]
pub struct Occupant {
    pub entity: EntityRef,
    pub solid_flags: SolidFlags,
}

/// Rebuilt from scratch at the start of every tick: maps an occupied tile to
/// every entity standing on it this tick. Never mutated mid-tick, so phases
/// later in the same tick and phase 1 of the next both see a consistent
/// snapshot of where things stood when the tick began.
#[derive(Debug, Default)]
pub struct CollisionMap {
    cells: HashMap<Vec2, Vec<Occupant>>,
}

impl CollisionMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, position: Vec2, entity: EntityRef, solid_flags: SolidFlags) {
        self.cells.entry(position).or_default().push(Occupant { entity, solid_flags });
    }

    pub fn at(&self, position: Vec2) -> &[Occupant] {
        self.cells.get(&position).map_or(&[], |v| v.as_slice())
    }

    pub fn occupants_intersecting(&self, position: Vec2, mask: SolidFlags) -> impl Iterator<Item = EntityRef> + '_ {
        self.at(position).iter().filter(move |o| o.solid_flags.intersects(mask)).map(|o| o.entity)
    }
}

/// The static level: a rectangular tile grid of solid-flag classes. Tiles
/// outside the grid are always solid, matching a walled-in map border.
#[derive(Debug, Clone)]
pub struct Map {
    width: usize,
    height: usize,
    tiles: Vec<SolidFlags>,
}

impl Map {
    pub fn empty(width: usize, height: usize) -> Self {
        Self { width, height, tiles: vec![SolidFlags::NONE; width * height] }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    fn index(&self, pos: Vec2) -> Option<usize> {
        if pos.x < 0 || pos.y < 0 {
            return None;
        }
        let (x, y) = (pos.x as usize, pos.y as usize);
        if x >= self.width || y >= self.height {
            return None;
        }
        Some(y * self.width + x)
    }

    pub fn tile_flags(&self, pos: Vec2) -> SolidFlags {
        match self.index(pos) {
            Some(i) => self.tiles[i],
            None => SolidFlags::WORLD,
        }
    }

    pub fn set_tile(&mut self, pos: Vec2, flags: SolidFlags) {
        if let Some(i) = self.index(pos) {
            self.tiles[i] = flags;
        }
    }

    fn tile_free(&self, pos: Vec2, collides_with: SolidFlags, collision_map: &CollisionMap) -> bool {
        if self.tile_flags(pos).intersects(collides_with) {
            return false;
        }
        !collision_map.at(pos).iter().any(|o| o.solid_flags.intersects(collides_with))
    }

    /// True if a step in `direction` from `from` is legal: the destination
    /// tile must be clear of both static geometry and this tick's occupants,
    /// and a diagonal step additionally requires at least one of its two
    /// cardinal neighbors to be clear (no cutting through a solid corner).
    pub fn can_move(
        &self,
        collision_map: &CollisionMap,
        from: Vec2,
        collides_with: SolidFlags,
        noclip: bool,
        direction: Direction,
    ) -> bool {
        if noclip {
            return true;
        }
        let step = direction.to_step();
        if step == Vec2::ZERO {
            return true;
        }
        let dest = from.add(step);
        if !self.tile_free(dest, collides_with, collision_map) {
            return false;
        }
        if step.x != 0 && step.y != 0 {
            let horizontal = Vec2::new(from.x + step.x, from.y);
            let vertical = Vec2::new(from.x, from.y + step.y);
            let horizontal_free = self.tile_free(horizontal, collides_with, collision_map);
            let vertical_free = self.tile_free(vertical, collides_with, collision_map);
            if !horizontal_free && !vertical_free {
                return false;
            }
        }
        true
    }

    /// The furthest position reachable from `from` walking one tile at a
    /// time toward `direction`, for up to `max_steps` tiles. Used by
    /// instantaneous-trail weapons (sniper rifle) and clipped blast-jump
    /// pushes to clamp to the last legal tile instead of teleporting through
    /// a wall.
    pub fn clipped_line(
        &self,
        collision_map: &CollisionMap,
        from: Vec2,
        direction: Direction,
        max_steps: u32,
        collides_with: SolidFlags,
    ) -> Vec2 {
        let mut pos = from;
        for _ in 0..max_steps {
            if !self.can_move(collision_map, pos, collides_with, false, direction) {
                break;
            }
            pos = pos.add(direction.to_step());
        }
        pos
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn open_tile_is_free() {
        let map = Map::empty(10, 10);
        let cmap = CollisionMap::new();
        assert!(map.can_move(&cmap, Vec2::new(5, 5), SolidFlags::WORLD, false, Direction::RIGHT));
    }

    #[test]
    fn wall_blocks_movement() {
        let mut map = Map::empty(10, 10);
        map.set_tile(Vec2::new(6, 5), SolidFlags::WORLD);
        let cmap = CollisionMap::new();
        assert!(!map.can_move(&cmap, Vec2::new(5, 5), SolidFlags::WORLD, false, Direction::RIGHT));
    }

    #[test]
    fn out_of_bounds_is_always_solid() {
        let map = Map::empty(4, 4);
        let cmap = CollisionMap::new();
        assert!(!map.can_move(&cmap, Vec2::new(0, 0), SolidFlags::WORLD, false, Direction::LEFT));
    }

    #[test]
    fn noclip_ignores_all_solidity() {
        let mut map = Map::empty(10, 10);
        map.set_tile(Vec2::new(6, 5), SolidFlags::WORLD);
        let cmap = CollisionMap::new();
        assert!(map.can_move(&cmap, Vec2::new(5, 5), SolidFlags::WORLD, true, Direction::RIGHT));
    }

    #[test]
    fn diagonal_is_blocked_when_both_corner_neighbors_are_solid() {
        let mut map = Map::empty(10, 10);
        map.set_tile(Vec2::new(6, 5), SolidFlags::WORLD);
        map.set_tile(Vec2::new(5, 6), SolidFlags::WORLD);
        let cmap = CollisionMap::new();
        let diag = Direction::RIGHT | Direction::DOWN;
        assert!(!map.can_move(&cmap, Vec2::new(5, 5), SolidFlags::WORLD, false, diag));
    }

    #[test]
    fn diagonal_is_allowed_when_one_corner_neighbor_is_clear() {
        let mut map = Map::empty(10, 10);
        map.set_tile(Vec2::new(6, 5), SolidFlags::WORLD);
        let cmap = CollisionMap::new();
        let diag = Direction::RIGHT | Direction::DOWN;
        assert!(map.can_move(&cmap, Vec2::new(5, 5), SolidFlags::WORLD, false, diag));
    }

    #[test]
    fn clipped_line_stops_before_a_wall() {
        let mut map = Map::empty(10, 10);
        map.set_tile(Vec2::new(8, 5), SolidFlags::WORLD);
        let cmap = CollisionMap::new();
        let end = map.clipped_line(&cmap, Vec2::new(5, 5), Direction::RIGHT, 10, SolidFlags::WORLD);
        assert_eq!(end, Vec2::new(7, 5));
    }

    #[test]
    fn collision_map_occupant_blocks_like_a_wall() {
        let map = Map::empty(10, 10);
        let mut cmap = CollisionMap::new();
        cmap.insert(Vec2::new(6, 5), EntityRef::Player(PlayerId(1)), SolidFlags::RED_PLAYERS);
        assert!(!map.can_move(&cmap, Vec2::new(5, 5), SolidFlags::RED_PLAYERS, false, Direction::RIGHT));
        assert!(map.can_move(&cmap, Vec2::new(5, 5), SolidFlags::BLUE_PLAYERS, false, Direction::RIGHT));
    }
}
