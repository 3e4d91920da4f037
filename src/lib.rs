//! Kickstart splitting and service-module coordination for OS installation.
//!
//! An installation run is driven by one declarative kickstart document, but
//! carried out by independent service modules (network, storage, security,
//! payload, ...) that each understand only their own slice of the kickstart
//! vocabulary. This crate implements the piece in between: the boss that
//! splits the document into per-module fragments, hands every module its
//! fragment, and maps the errors modules report back to the original
//! document - across `%include` boundaries.
//!
//! # Architecture
//!
//! ```text
//! ks.cfg (+ %includes)
//!     │
//!     ▼
//! kickstart::SplitKickstartParser     ordered, provenance-tagged elements
//!     │
//!     ▼
//! boss::KickstartManager ── claim ──> per-module ElementBundle
//!     │                                   │ render()
//!     │  configure_with_kickstart(text)   ▼
//!     ├─────────────────────────────> service module 1
//!     ├─────────────────────────────> service module 2   (registration order)
//!     ├─────────────────────────────> ...
//!     │        (error_line, message) replies, translated via LineReferences
//!     ▼
//! aggregated ModuleErrors + unprocessed kickstart
//! ```
//!
//! A module's parse failure is recorded and distribution continues with the
//! next module; only a document that cannot be split at all (unknown
//! section, missing include) aborts the run before any module is contacted.
//!
//! # Example
//!
//! ```rust
//! use installer_boss::{modules, KickstartManager};
//!
//! # fn main() -> anyhow::Result<()> {
//! let mut manager = KickstartManager::default();
//! manager.split_from_string("network --device=ens3 --activate\ntimezone UTC\n", None)?;
//!
//! let mut registry = modules::default_registry();
//! let errors = manager.distribute(&mut registry)?;
//! assert!(errors.is_empty());
//! assert!(manager.unprocessed_kickstart().unwrap().is_empty());
//! # Ok(())
//! # }
//! ```

pub mod boss;
pub mod config;
pub mod kickstart;
pub mod modules;

pub use boss::{
    ConfigureResult, DistributionReport, DistributionState, KickstartManager, ModuleClaim,
    ModuleError, ModuleHandle, ModuleRegistry,
};
pub use config::{load_config, load_config_or_default, InstallerConfig};
pub use kickstart::{
    ElementBundle, ElementFilter, KickstartElement, KickstartElements, LineReferences,
    SourcePosition, SplitKickstartError, SplitKickstartParser, SplitOptions,
};
