use serde::Deserialize;
use std::fs;
use std::io::Write;
use std::path::Path;

#[derive(Deserialize)]
struct ClassRow {
    class: String,
    max_health: i32,
    move_interval: i32,
    player_limit: i32,
    primary: String,
    secondary: String,
    melee: String,
}

#[derive(Deserialize)]
struct WeaponRow {
    weapon: String,
    ammo_per_shot: i32,
    clip_size: i32,
    damage: i32,
    shoot_interval: i32,
    reload_delay: i32,
    projectile: String,
    shoot_sound: String,
    hurt_sound: String,
    reload_sound: String,
}

#[derive(Deserialize)]
struct ProjectileRow {
    kind: String,
    move_interval: i32,
    disappear_time: i32,
    display_char: String,
}

fn load<T: serde::de::DeserializeOwned>(path: &Path) -> Vec<T> {
    let contents =
        fs::read_to_string(path).unwrap_or_else(|e| panic!("cannot read {path:?}: {e}"));
    serde_json::from_str(&contents).unwrap_or_else(|e| panic!("invalid JSON in {path:?}: {e}"))
}

fn main() {
    let manifest_dir = std::env::var("CARGO_MANIFEST_DIR").unwrap();
    let data_dir = Path::new(&manifest_dir)
        .parent()
        .unwrap()
        .parent()
        .unwrap()
        .join("data/brigade");
    let out_dir = std::env::var("OUT_DIR").unwrap();

    let classes: Vec<ClassRow> = load(&data_dir.join("classes.json"));
    let weapons: Vec<WeaponRow> = load(&data_dir.join("weapons.json"));
    let projectiles: Vec<ProjectileRow> = load(&data_dir.join("projectiles.json"));

    let mut out = fs::File::create(Path::new(&out_dir).join("generated.rs")).unwrap();

    writeln!(out, "/// Per-class stat lookup, keyed by the closed `PlayerClass` enum.").unwrap();
    writeln!(
        out,
        "pub fn player_class_stats(class: PlayerClass) -> Option<PlayerClassStats> {{"
    )
    .unwrap();
    writeln!(out, "    match class {{").unwrap();
    for c in &classes {
        writeln!(
            out,
            "        PlayerClass::{} => Some(PlayerClassStats {{ max_health: {}, move_interval: {}, player_limit: {}, primary: Weapon::{}, secondary: Weapon::{}, melee: Weapon::{} }}),",
            c.class, c.max_health, c.move_interval, c.player_limit, c.primary, c.secondary, c.melee
        )
        .unwrap();
    }
    writeln!(out, "        _ => None,").unwrap();
    writeln!(out, "    }}").unwrap();
    writeln!(out, "}}").unwrap();
    writeln!(out).unwrap();

    writeln!(out, "/// Per-weapon stat lookup, keyed by the closed `Weapon` enum.").unwrap();
    writeln!(
        out,
        "pub fn weapon_stats(weapon: Weapon) -> Option<WeaponStats> {{"
    )
    .unwrap();
    writeln!(out, "    match weapon {{").unwrap();
    for w in &weapons {
        writeln!(
            out,
            "        Weapon::{} => Some(WeaponStats {{ ammo_per_shot: {}, clip_size: {}, damage: {}, shoot_interval: {}, reload_delay: {}, projectile: ProjectileType::{}, shoot_sound: SoundId::{}, hurt_sound: SoundId::{}, reload_sound: SoundId::{} }}),",
            w.weapon, w.ammo_per_shot, w.clip_size, w.damage, w.shoot_interval, w.reload_delay,
            w.projectile, w.shoot_sound, w.hurt_sound, w.reload_sound
        )
        .unwrap();
    }
    writeln!(out, "        _ => None,").unwrap();
    writeln!(out, "    }}").unwrap();
    writeln!(out, "}}").unwrap();
    writeln!(out).unwrap();

    writeln!(
        out,
        "/// Per-kind stat lookup, keyed by the closed `ProjectileType` enum."
    )
    .unwrap();
    writeln!(
        out,
        "pub fn projectile_stats(kind: ProjectileType) -> Option<ProjectileStats> {{"
    )
    .unwrap();
    writeln!(out, "    match kind {{").unwrap();
    for p in &projectiles {
        writeln!(
            out,
            "        ProjectileType::{} => Some(ProjectileStats {{ move_interval: {}, disappear_time: {}, display_char: {:?} }}),",
            p.kind, p.move_interval, p.disappear_time, p.display_char.chars().next().unwrap()
        )
        .unwrap();
    }
    writeln!(out, "        _ => None,").unwrap();
    writeln!(out, "    }}").unwrap();
    writeln!(out, "}}").unwrap();

    println!("cargo:rerun-if-changed={}", data_dir.display());
}
