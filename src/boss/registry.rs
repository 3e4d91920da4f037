//! Registry of running service modules.
//!
//! The coordinator never talks to a concrete module type: it sees only the
//! object-safe [`ModuleHandle`] trait, so a module may live in-process (the
//! built-in modules do), or behind a socket or message bus in a separate OS
//! process. Whatever the backend, the contract is the same: a module reports
//! the kickstart names it owns and accepts its fragment as plain text,
//! answering with an `(error_line, message)` pair instead of ever raising
//! across the boundary.
//!
//! Registration order is the distribution order. It is deterministic across
//! runs but carries no other meaning.

use crate::kickstart::ElementFilter;

/// Kickstart names a module declares ownership of.
///
/// Queried live at distribution time: the claim may change between runs,
/// e.g. when a module discovers installable addons.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ModuleClaim {
    /// Command names, e.g. `network`.
    pub commands: Vec<String>,
    /// Section names without the leading `%`, e.g. `packages`.
    pub sections: Vec<String>,
    /// Addon names, e.g. `scorched`.
    pub addons: Vec<String>,
}

impl ModuleClaim {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty() && self.sections.is_empty() && self.addons.is_empty()
    }
}

impl From<&ModuleClaim> for ElementFilter {
    fn from(claim: &ModuleClaim) -> Self {
        ElementFilter {
            commands: claim.commands.clone(),
            sections: claim.sections.clone(),
            addons: claim.addons.clone(),
        }
    }
}

/// Outcome of handing a kickstart fragment to a module.
///
/// Line 0 with an empty message means success; any other line is a
/// module-local semantic error at that line of the *fragment* text (the
/// coordinator translates it back to original-document coordinates).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigureResult {
    pub error_line: usize,
    pub message: String,
}

impl ConfigureResult {
    pub fn success() -> Self {
        Self {
            error_line: 0,
            message: String::new(),
        }
    }

    pub fn error(line: usize, message: impl Into<String>) -> Self {
        Self {
            error_line: line,
            message: message.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.error_line == 0
    }
}

/// Capability contract a running service module exposes to the coordinator.
pub trait ModuleHandle {
    /// Stable identifier used in logs and error reports.
    fn identifier(&self) -> &str;

    /// The kickstart names this module currently owns.
    fn claim(&self) -> ModuleClaim;

    /// Parse the given kickstart fragment and apply it to the module's
    /// configuration state. All failures are converted into the returned
    /// [`ConfigureResult`]; this call must not panic.
    fn configure_with_kickstart(&mut self, kickstart: &str) -> ConfigureResult;

    /// Re-serialize the module's current configuration as kickstart text.
    fn generate_kickstart(&self) -> String;
}

/// Ordered collection of module handles, iterated in registration order.
#[derive(Default)]
pub struct ModuleRegistry {
    modules: Vec<Box<dyn ModuleHandle>>,
}

impl ModuleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, module: Box<dyn ModuleHandle>) {
        self.modules.push(module);
    }

    pub fn len(&self) -> usize {
        self.modules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }

    pub fn modules(&self) -> impl Iterator<Item = &dyn ModuleHandle> {
        self.modules.iter().map(Box::as_ref)
    }

    pub fn modules_mut(&mut self) -> impl Iterator<Item = &mut Box<dyn ModuleHandle>> {
        self.modules.iter_mut()
    }

    pub fn get(&self, identifier: &str) -> Option<&dyn ModuleHandle> {
        self.modules
            .iter()
            .map(Box::as_ref)
            .find(|m| m.identifier() == identifier)
    }
}
