use std::collections::HashMap;
use std::fmt;

/// Flag bits guarding who can read/write a cvar and what happens to it
/// around replication and shutdown. Trimmed from the original engine's much
/// larger `ConVar::Flag` set down to the handful spec.md actually names
/// (`ARCHIVE`, `REPLICATED`) plus the two common access-guard patterns every
/// cvar layer needs (`CHEAT`, `READ_ONLY`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
pub struct CvarFlags(pub u32);

impl CvarFlags {
    pub const NONE: CvarFlags = CvarFlags(0);
    /// Persisted to the config file on server shutdown.
    pub const ARCHIVE: CvarFlags = CvarFlags(1 << 0);
    /// Sent to clients in `CvarMod` on join and whenever its value changes.
    pub const REPLICATED: CvarFlags = CvarFlags(1 << 1);
    /// Only settable when cheats are enabled server-side.
    pub const CHEAT: CvarFlags = CvarFlags(1 << 2);
    /// Never settable after registration; `set` always fails.
    pub const READ_ONLY: CvarFlags = CvarFlags(1 << 3);

    pub fn contains(self, other: CvarFlags) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn intersects(self, other: CvarFlags) -> bool {
        self.0 & other.0 != 0
    }
}

impl std::ops::BitOr for CvarFlags {
    type Output = CvarFlags;

    fn bitor(self, rhs: CvarFlags) -> CvarFlags {
        CvarFlags(self.0 | rhs.0)
    }
}

impl std::ops::BitOrAssign for CvarFlags {
    fn bitor_assign(&mut self, rhs: CvarFlags) {
        self.0 |= rhs.0;
    }
}

/// A cvar's typed value. The original engine's `Char`/`Color`/`Hash` variants
/// are dropped: passwords are hashed by the protocol layer already, and
/// nothing in this domain needs a single-character or packed-color cvar.
#[derive(Debug, Clone, PartialEq)]
pub enum CvarValue {
    String(String),
    Bool(bool),
    Int(i64),
    Float(f64),
}

impl CvarValue {
    pub fn type_name(&self) -> &'static str {
        match self {
            CvarValue::String(_) => "string",
            CvarValue::Bool(_) => "bool",
            CvarValue::Int(_) => "int",
            CvarValue::Float(_) => "float",
        }
    }

    /// Renders the value the way it is written to the replicated `CvarMod`
    /// message and the ARCHIVE config file: both want plain text, not a
    /// type-tagged wire encoding.
    pub fn to_wire_string(&self) -> String {
        match self {
            CvarValue::String(s) => s.clone(),
            CvarValue::Bool(b) => b.to_string(),
            CvarValue::Int(i) => i.to_string(),
            CvarValue::Float(f) => f.to_string(),
        }
    }
}

impl fmt::Display for CvarValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_wire_string())
    }
}

#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum CvarError {
    #[error("unknown cvar '{0}'")]
    Unknown(String),
    #[error("cvar '{0}' is read-only")]
    ReadOnly(String),
    #[error("cvar '{0}' is cheat-protected and cheats are disabled")]
    CheatsDisabled(String),
    #[error("cvar '{name}' expects a {expected} value, got '{given}'")]
    TypeMismatch { name: String, expected: &'static str, given: String },
    #[error("cvar '{0}' is already registered")]
    AlreadyRegistered(String),
}

struct CvarEntry {
    value: CvarValue,
    default: CvarValue,
    flags: CvarFlags,
}

/// Dependency-injected cvar store. Nothing here is a singleton: a
/// `CvarRegistry` is created fresh per server instance, handed to whatever
/// needs it, and dropped with it — matching the `init(server) -> live ->
/// teardown(server)` lifecycle the original console layer uses rather than a
/// process-global table.
#[derive(Default)]
pub struct CvarRegistry {
    entries: HashMap<String, CvarEntry>,
    cheats_enabled: bool,
}

impl CvarRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_cheats_enabled(&mut self, enabled: bool) {
        self.cheats_enabled = enabled;
    }

    pub fn cheats_enabled(&self) -> bool {
        self.cheats_enabled
    }

    /// Registers a new cvar with its starting value as the restore-on-reset
    /// default. Re-registering an existing name is a programmer error, not a
    /// runtime condition to recover from — callers register their cvar set
    /// once at startup.
    pub fn register(&mut self, name: &str, default: CvarValue, flags: CvarFlags) -> Result<(), CvarError> {
        if self.entries.contains_key(name) {
            return Err(CvarError::AlreadyRegistered(name.to_string()));
        }
        self.entries.insert(
            name.to_string(),
            CvarEntry { value: default.clone(), default, flags },
        );
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&CvarValue> {
        self.entries.get(name).map(|e| &e.value)
    }

    pub fn flags(&self, name: &str) -> Option<CvarFlags> {
        self.entries.get(name).map(|e| e.flags)
    }

    /// Sets a cvar's value, enforcing `READ_ONLY` and `CHEAT` guards. The new
    /// value's variant must match the registered type — a cvar declared
    /// `Int` never silently becomes a `String`.
    pub fn set(&mut self, name: &str, value: CvarValue) -> Result<(), CvarError> {
        let cheats_enabled = self.cheats_enabled;
        let entry = self.entries.get_mut(name).ok_or_else(|| CvarError::Unknown(name.to_string()))?;
        if entry.flags.contains(CvarFlags::READ_ONLY) {
            return Err(CvarError::ReadOnly(name.to_string()));
        }
        if entry.flags.contains(CvarFlags::CHEAT) && !cheats_enabled {
            return Err(CvarError::CheatsDisabled(name.to_string()));
        }
        if std::mem::discriminant(&entry.value) != std::mem::discriminant(&value) {
            return Err(CvarError::TypeMismatch {
                name: name.to_string(),
                expected: entry.value.type_name(),
                given: value.to_wire_string(),
            });
        }
        entry.value = value;
        Ok(())
    }

    pub fn reset(&mut self, name: &str) -> Result<(), CvarError> {
        let entry = self.entries.get_mut(name).ok_or_else(|| CvarError::Unknown(name.to_string()))?;
        entry.value = entry.default.clone();
        Ok(())
    }

    /// Cvars to send in a `CvarMod` message: every `REPLICATED` cvar,
    /// name/value pairs in registration order is not guaranteed (backed by a
    /// `HashMap`) since the wire message itself has no ordering requirement.
    pub fn replicated(&self) -> Vec<(String, String)> {
        self.entries
            .iter()
            .filter(|(_, e)| e.flags.contains(CvarFlags::REPLICATED))
            .map(|(name, e)| (name.clone(), e.value.to_wire_string()))
            .collect()
    }

    /// Cvars to persist at shutdown: every `ARCHIVE` cvar, rendered as the
    /// plain `name = value` bag the ambient config layer writes into the
    /// server's TOML file.
    pub fn archived(&self) -> HashMap<String, String> {
        self.entries
            .iter()
            .filter(|(_, e)| e.flags.contains(CvarFlags::ARCHIVE))
            .map(|(name, e)| (name.clone(), e.value.to_wire_string()))
            .collect()
    }

    /// Restores ARCHIVE cvars from a persisted `name -> value` bag (the
    /// config file loaded at startup), parsing each value against the
    /// cvar's already-registered type. Unknown names or values that don't
    /// parse are skipped rather than failing the whole load — a stale config
    /// key left over from a removed cvar shouldn't block startup.
    pub fn load_archived(&mut self, saved: &HashMap<String, String>) {
        for (name, raw) in saved {
            let Some(entry) = self.entries.get_mut(name) else { continue };
            if !entry.flags.contains(CvarFlags::ARCHIVE) {
                continue;
            }
            let parsed = match &entry.value {
                CvarValue::String(_) => Some(CvarValue::String(raw.clone())),
                CvarValue::Bool(_) => raw.parse::<bool>().ok().map(CvarValue::Bool),
                CvarValue::Int(_) => raw.parse::<i64>().ok().map(CvarValue::Int),
                CvarValue::Float(_) => raw.parse::<f64>().ok().map(CvarValue::Float),
            };
            if let Some(value) = parsed {
                entry.value = value;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_and_get_roundtrip() {
        let mut reg = CvarRegistry::new();
        reg.register("sv_password", CvarValue::String(String::new()), CvarFlags::NONE).unwrap();
        reg.set("sv_password", CvarValue::String("hunter2".into())).unwrap();
        assert_eq!(reg.get("sv_password"), Some(&CvarValue::String("hunter2".into())));
    }

    #[test]
    fn read_only_rejects_set() {
        let mut reg = CvarRegistry::new();
        reg.register("sv_tickrate", CvarValue::Int(64), CvarFlags::READ_ONLY).unwrap();
        assert_eq!(reg.set("sv_tickrate", CvarValue::Int(128)), Err(CvarError::ReadOnly("sv_tickrate".into())));
    }

    #[test]
    fn cheat_flag_blocks_set_until_cheats_enabled() {
        let mut reg = CvarRegistry::new();
        reg.register("sv_noclip", CvarValue::Bool(false), CvarFlags::CHEAT).unwrap();
        assert!(reg.set("sv_noclip", CvarValue::Bool(true)).is_err());
        reg.set_cheats_enabled(true);
        assert!(reg.set("sv_noclip", CvarValue::Bool(true)).is_ok());
    }

    #[test]
    fn type_mismatch_is_rejected() {
        let mut reg = CvarRegistry::new();
        reg.register("sv_maxplayers", CvarValue::Int(24), CvarFlags::NONE).unwrap();
        assert!(matches!(
            reg.set("sv_maxplayers", CvarValue::String("lots".into())),
            Err(CvarError::TypeMismatch { .. })
        ));
    }

    #[test]
    fn replicated_lists_only_flagged_cvars() {
        let mut reg = CvarRegistry::new();
        reg.register("sv_tickrate", CvarValue::Int(64), CvarFlags::REPLICATED).unwrap();
        reg.register("sv_rcon_password", CvarValue::String("x".into()), CvarFlags::NONE).unwrap();
        let replicated = reg.replicated();
        assert_eq!(replicated.len(), 1);
        assert_eq!(replicated[0].0, "sv_tickrate");
    }

    #[test]
    fn archive_roundtrips_through_load() {
        let mut reg = CvarRegistry::new();
        reg.register("sv_motd", CvarValue::String("welcome".into()), CvarFlags::ARCHIVE).unwrap();
        reg.set("sv_motd", CvarValue::String("hello".into())).unwrap();
        let saved = reg.archived();

        let mut reloaded = CvarRegistry::new();
        reloaded.register("sv_motd", CvarValue::String("welcome".into()), CvarFlags::ARCHIVE).unwrap();
        reloaded.load_archived(&saved);
        assert_eq!(reloaded.get("sv_motd"), Some(&CvarValue::String("hello".into())));
    }

    #[test]
    fn reset_restores_default() {
        let mut reg = CvarRegistry::new();
        reg.register("sv_gravity", CvarValue::Float(800.0), CvarFlags::NONE).unwrap();
        reg.set("sv_gravity", CvarValue::Float(400.0)).unwrap();
        reg.reset("sv_gravity").unwrap();
        assert_eq!(reg.get("sv_gravity"), Some(&CvarValue::Float(800.0)));
    }

    #[test]
    fn double_registration_errors() {
        let mut reg = CvarRegistry::new();
        reg.register("sv_hostname", CvarValue::String("srv".into()), CvarFlags::NONE).unwrap();
        assert_eq!(
            reg.register("sv_hostname", CvarValue::String("other".into()), CvarFlags::NONE),
            Err(CvarError::AlreadyRegistered("sv_hostname".into()))
        );
    }
}
