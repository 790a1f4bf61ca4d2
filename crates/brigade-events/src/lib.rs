//! Scripting-collaborator boundary: a dependency-injected cvar registry and
//! a control-surface trait a scripting host calls into. Nothing in here
//! runs a script itself — that collaborator is external to this crate, per
//! the core's scope. `WorldEvent` delivery to that collaborator is the
//! `World`'s own `drain_events`/`Server::dispatch_world_events` queue; this
//! crate doesn't duplicate that with a separate listener registry.

pub mod control_surface;
pub mod cvar;

pub use control_surface::{ControlSurfaceError, EntityField, ScriptControlSurface};
pub use cvar::{CvarError, CvarFlags, CvarRegistry, CvarValue};
