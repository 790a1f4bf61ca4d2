//! Build-time generated stat tables for classes, weapons, and projectile
//! kinds. The tables themselves live in `data/brigade/*.json` at the
//! workspace root; `build.rs` turns them into the match statements included
//! below so a typo in the data shows up as a compile error, not a runtime
//! `None`.

use brigade_types::{PlayerClass, ProjectileType, SoundId, Weapon};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlayerClassStats {
    pub max_health: i32,
    pub move_interval: i32,
    /// Per-team cap on simultaneous players of this class, 0 = unlimited.
    pub player_limit: i32,
    pub primary: Weapon,
    pub secondary: Weapon,
    pub melee: Weapon,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WeaponStats {
    pub ammo_per_shot: i32,
    pub clip_size: i32,
    pub damage: i32,
    pub shoot_interval: i32,
    pub reload_delay: i32,
    pub projectile: ProjectileType,
    pub shoot_sound: SoundId,
    pub hurt_sound: SoundId,
    pub reload_sound: SoundId,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProjectileStats {
    pub move_interval: i32,
    pub disappear_time: i32,
    pub display_char: char,
}

include!(concat!(env!("OUT_DIR"), "/generated.rs"));

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_non_none_class_has_stats() {
        for class in PlayerClass::ALL {
            if class == PlayerClass::None || class == PlayerClass::Spectator {
                continue;
            }
            assert!(player_class_stats(class).is_some(), "missing stats for {class:?}");
        }
    }

    #[test]
    fn every_non_none_weapon_has_stats() {
        for weapon in Weapon::ALL {
            if weapon == Weapon::None {
                continue;
            }
            assert!(weapon_stats(weapon).is_some(), "missing stats for {weapon:?}");
        }
    }

    #[test]
    fn soldier_carries_a_rocket_launcher() {
        let stats = player_class_stats(PlayerClass::Soldier).unwrap();
        assert_eq!(stats.primary, Weapon::RocketLauncher);
    }

    #[test]
    fn rocket_launcher_fires_rockets() {
        let stats = weapon_stats(Weapon::RocketLauncher).unwrap();
        assert_eq!(stats.projectile, ProjectileType::Rocket);
    }

    #[test]
    fn sticky_projectile_has_no_disappear_timer() {
        let stats = projectile_stats(ProjectileType::Sticky).unwrap();
        assert_eq!(stats.disappear_time, 0);
    }
}
