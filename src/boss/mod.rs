//! The boss: module registry and kickstart distribution.
//!
//! The boss is the single coordinating component of an installation run.
//! It owns the kickstart document for the duration of one split+distribute
//! cycle, knows which service modules are running (via [`ModuleRegistry`]),
//! and hands each module the fragment of the document it claimed. Modules
//! are invoked strictly one after another, in registration order; the only
//! point where the boss blocks is the `configure_with_kickstart` call into
//! a module.
//!
//! Parse errors reported by modules are aggregated, never fatal to the
//! cycle - see [`KickstartManager`] for the details.

pub mod manager;
pub mod registry;

pub use manager::{DistributionReport, DistributionState, KickstartManager, ModuleError};
pub use registry::{ConfigureResult, ModuleClaim, ModuleHandle, ModuleRegistry};
