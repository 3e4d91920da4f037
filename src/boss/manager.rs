//! Kickstart distribution coordinator.
//!
//! [`KickstartManager`] drives one split+distribute cycle:
//!
//! 1. **Split** - parse the kickstart document into elements. A document
//!    that cannot be split (unknown section, missing include) fails fatally
//!    here, before any module is contacted.
//! 2. **Distribute** - walk the registered modules in registration order,
//!    hand each one the rendered fragment matching its claim, and collect a
//!    [`ModuleError`] for every module that rejects its fragment. One
//!    module's failure never stops distribution to the modules after it.
//!
//! Error lines reported by modules refer to the fragment text each module
//! received; the manager translates them back to original-document
//! coordinates through the fragment's reverse line index. When a reported
//! line is not in the index the error is kept with an explicit
//! unknown-provenance marker instead of being dropped.

use std::collections::BTreeSet;
use std::fmt;
use std::path::Path;

use anyhow::{bail, Result};
use serde::Serialize;
use tracing::{info, warn};

use crate::boss::registry::ModuleRegistry;
use crate::kickstart::{
    ElementFilter, KickstartElements, SourcePosition, SplitKickstartError, SplitKickstartParser,
    SplitOptions,
};

/// Phases of one split+distribute cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DistributionState {
    /// No kickstart has been split yet (or the last split failed).
    Idle,
    /// A kickstart was split; distribution has not started.
    Split,
    /// Fragments are being handed to modules.
    Distributing,
    /// Distribution finished; errors (if any) are collected.
    Done,
}

/// A module's failure to parse its kickstart fragment, in original-document
/// coordinates where provenance could be resolved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ModuleError {
    pub module: String,
    pub location: SourcePosition,
    pub message: String,
}

impl fmt::Display for ModuleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}: {}", self.module, self.location, self.message)
    }
}

/// Snapshot of a finished distribution, suitable for dumping as JSON.
#[derive(Debug, Clone, Serialize)]
pub struct DistributionReport {
    pub errors: Vec<ModuleError>,
    pub unprocessed_kickstart: String,
}

/// Coordinator that splits one kickstart document and distributes the
/// fragments to registered service modules.
pub struct KickstartManager {
    options: SplitOptions,
    elements: Option<KickstartElements>,
    module_errors: Vec<ModuleError>,
    state: DistributionState,
}

impl Default for KickstartManager {
    fn default() -> Self {
        Self::new(SplitOptions::default())
    }
}

impl KickstartManager {
    pub fn new(options: SplitOptions) -> Self {
        Self {
            options,
            elements: None,
            module_errors: Vec::new(),
            state: DistributionState::Idle,
        }
    }

    pub fn state(&self) -> DistributionState {
        self.state
    }

    /// Split the kickstart file at `path` into elements.
    ///
    /// A failure leaves the manager idle with no elements; the previous
    /// split (if any) is discarded either way.
    pub fn split(&mut self, path: impl AsRef<Path>) -> Result<(), SplitKickstartError> {
        self.reset();
        let parser = SplitKickstartParser::new(self.options.clone());
        let elements = parser.split(path)?;
        self.finish_split(elements);
        Ok(())
    }

    /// Split an in-memory kickstart string, attributing elements to
    /// `filename` when given.
    pub fn split_from_string(
        &mut self,
        kickstart: &str,
        filename: Option<&str>,
    ) -> Result<(), SplitKickstartError> {
        self.reset();
        let parser = SplitKickstartParser::new(self.options.clone());
        let elements = parser.split_from_string(kickstart, filename)?;
        self.finish_split(elements);
        Ok(())
    }

    fn reset(&mut self) {
        self.elements = None;
        self.module_errors.clear();
        self.state = DistributionState::Idle;
    }

    fn finish_split(&mut self, elements: KickstartElements) {
        info!(elements = elements.len(), "kickstart split");
        self.elements = Some(elements);
        self.state = DistributionState::Split;
    }

    /// Distribute fragments to all registered modules, in registration
    /// order, and return the collected module errors (empty on success).
    ///
    /// Overlapping claims resolve to the first-registered module: names a
    /// previous module already claimed in this run are dropped from later
    /// modules' effective claims, with a warning. A module error is
    /// recorded and distribution continues with the next module.
    pub fn distribute(&mut self, registry: &mut ModuleRegistry) -> Result<&[ModuleError]> {
        if self.state != DistributionState::Split {
            bail!("kickstart must be split before it can be distributed");
        }
        let mut elements = self.elements.take().expect("split state implies elements");

        self.state = DistributionState::Distributing;
        self.module_errors.clear();

        let mut seen_commands = BTreeSet::new();
        let mut seen_sections = BTreeSet::new();
        let mut seen_addons = BTreeSet::new();

        for module in registry.modules_mut() {
            let claim = module.claim();
            info!(
                module = module.identifier(),
                commands = ?claim.commands,
                sections = ?claim.sections,
                addons = ?claim.addons,
                "distributing kickstart"
            );

            let mut filter = ElementFilter::from(&claim);
            drop_already_claimed(module.identifier(), "command", &mut filter.commands, &mut seen_commands);
            drop_already_claimed(module.identifier(), "section", &mut filter.sections, &mut seen_sections);
            drop_already_claimed(module.identifier(), "addon", &mut filter.addons, &mut seen_addons);

            let bundle = elements.claim(&filter);
            let kickstart = bundle.render();
            let references = bundle.line_references();

            let result = module.configure_with_kickstart(&kickstart);
            if result.is_success() {
                continue;
            }

            let location = match references.lookup(result.error_line) {
                Some(position) => position.clone(),
                None => {
                    warn!(
                        module = module.identifier(),
                        line = result.error_line,
                        "reported error line has no provenance"
                    );
                    SourcePosition::unknown_provenance(result.error_line)
                }
            };
            warn!(
                module = module.identifier(),
                %location,
                message = %result.message,
                "module rejected kickstart fragment"
            );
            self.module_errors.push(ModuleError {
                module: module.identifier().to_string(),
                location,
                message: result.message,
            });
        }

        self.elements = Some(elements);
        self.state = DistributionState::Done;
        Ok(&self.module_errors)
    }

    /// Errors collected by the last distribution.
    pub fn module_errors(&self) -> &[ModuleError] {
        &self.module_errors
    }

    /// Kickstart text no module has claimed. `None` before a successful
    /// split; idempotent afterwards.
    pub fn unprocessed_kickstart(&self) -> Option<String> {
        self.elements.as_ref().map(|e| e.unprocessed().render())
    }

    /// Elements of the last successful split.
    pub fn elements(&self) -> Option<&KickstartElements> {
        self.elements.as_ref()
    }

    /// Re-collect a full kickstart: every module's generated configuration
    /// in registration order, followed by the unprocessed remainder
    /// verbatim.
    pub fn generate_kickstart(&self, registry: &ModuleRegistry) -> Option<String> {
        let unprocessed = self.unprocessed_kickstart()?;
        let mut output = String::new();
        for module in registry.modules() {
            output.push_str(&module.generate_kickstart());
        }
        output.push_str(&unprocessed);
        Some(output)
    }

    /// Snapshot of the last distribution, or `None` before a split.
    pub fn report(&self) -> Option<DistributionReport> {
        Some(DistributionReport {
            errors: self.module_errors.clone(),
            unprocessed_kickstart: self.unprocessed_kickstart()?,
        })
    }
}

/// Remove names an earlier module already claimed in this run, warning for
/// each dropped name, and record the rest as claimed.
fn drop_already_claimed(
    module: &str,
    kind: &str,
    names: &mut Vec<String>,
    seen: &mut BTreeSet<String>,
) {
    names.retain(|name| {
        if seen.contains(name) {
            warn!(module, kind, name = %name, "name already claimed by an earlier module");
            false
        } else {
            true
        }
    });
    seen.extend(names.iter().cloned());
}
