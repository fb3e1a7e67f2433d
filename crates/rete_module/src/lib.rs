//! # rete-module
//!
//! Resolves construct names (deftemplates, defrules, and the rest) across
//! modules, honouring explicit import/export port specifications. `MAIN` is
//! predefined and redefinable exactly once, before it gains any ports.
//! Port violations roll the affected module back to its pre-attempt
//! snapshot rather than leaving it partially mutated.

pub mod module;
pub mod port;

pub use module::{ModuleTable, MAIN_MODULE};
pub use port::{ConstructType, NameScope, PortItem};
