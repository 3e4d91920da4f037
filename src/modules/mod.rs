//! Built-in service modules and their kickstart handling.
//!
//! Every service module owns a slice of the kickstart vocabulary and keeps
//! its own configuration state. The boss never sees any of this: it talks
//! to modules through the [`ModuleHandle`](crate::boss::ModuleHandle)
//! contract only. The glue between the two worlds lives here:
//!
//! - [`ServiceModule`] is what a concrete module implements: its claimed
//!   names plus typed handlers for the commands, sections and addons it
//!   owns.
//! - [`KickstartModule`] wraps any `ServiceModule` into a `ModuleHandle`.
//!   It re-splits the received fragment in memory, dispatches each element
//!   to the matching handler, and converts the first failure into the
//!   `(error_line, message)` pair the boss expects - errors cross the
//!   module boundary as data, never as a panic.
//!
//! Module handlers only build up configuration state. Acting on that state
//! (writing network configs, resolving packages, creating users) belongs
//! to a later execute phase performed by external collaborators.

pub mod localization;
pub mod network;
pub mod options;
pub mod payload;
pub mod security;
pub mod storage;
pub mod subscription;
pub mod timezone;
pub mod users;

use anyhow::{bail, Result};
use tracing::debug;

use crate::boss::{ConfigureResult, ModuleClaim, ModuleHandle, ModuleRegistry};
use crate::kickstart::{
    ElementKind, SplitKickstartError, SplitKickstartParser, SplitOptions, DEFAULT_VALID_SECTIONS,
};

pub use localization::LocalizationModule;
pub use network::NetworkModule;
pub use payload::PayloadModule;
pub use security::SecurityModule;
pub use storage::StorageModule;
pub use subscription::SubscriptionModule;
pub use timezone::TimezoneModule;
pub use users::UsersModule;

/// Module names in their default registration (and thus distribution)
/// order.
pub const DEFAULT_MODULES: &[&str] = &[
    "network",
    "localization",
    "timezone",
    "security",
    "users",
    "storage",
    "payload",
    "subscription",
];

/// Behavior a concrete service module implements.
///
/// Handlers receive split arguments (for commands: everything after the
/// command word) and return `Err` for module-local semantic problems such
/// as an unknown option or an invalid value. The error message - not the
/// error itself - travels back across the module boundary.
pub trait ServiceModule {
    /// Stable module name, also used as the registry identifier.
    fn name(&self) -> &str;

    /// Command names this module owns.
    fn commands(&self) -> &[&str] {
        &[]
    }

    /// Section names this module owns, without the leading `%`.
    fn sections(&self) -> &[&str] {
        &[]
    }

    /// Addon names this module currently recognizes. Dynamic on purpose:
    /// addons can be discovered at runtime.
    fn addons(&self) -> Vec<String> {
        Vec::new()
    }

    fn handle_command(&mut self, name: &str, options: &[String]) -> Result<()>;

    fn handle_section(&mut self, name: &str, _options: &[String], _body: &[String]) -> Result<()> {
        bail!("section %{} is not handled by module {}", name, self.name())
    }

    fn handle_addon(&mut self, name: &str, _options: &[String], _body: &[String]) -> Result<()> {
        bail!("addon {} is not handled by module {}", name, self.name())
    }

    /// Re-serialize the module's configuration as kickstart text. Text the
    /// module never claimed must not appear here; the boss re-emits the
    /// unprocessed remainder itself.
    fn generate_kickstart(&self) -> String;

    /// Drop all configuration state, returning to defaults.
    fn reset(&mut self);
}

/// Adapter turning any [`ServiceModule`] into a boss-facing
/// [`ModuleHandle`].
pub struct KickstartModule<M> {
    inner: M,
}

impl<M: ServiceModule> KickstartModule<M> {
    pub fn new(inner: M) -> Self {
        Self { inner }
    }

    pub fn boxed(inner: M) -> Box<Self> {
        Box::new(Self::new(inner))
    }

    pub fn inner(&self) -> &M {
        &self.inner
    }

    /// Parser for fragments addressed to this module. The module's own
    /// sections are added to the standard vocabulary so a custom section
    /// claim parses cleanly.
    fn fragment_parser(&self) -> SplitKickstartParser {
        let mut valid_sections: Vec<String> =
            DEFAULT_VALID_SECTIONS.iter().map(|s| s.to_string()).collect();
        for section in self.inner.sections() {
            let with_percent = format!("%{section}");
            if !valid_sections.contains(&with_percent) {
                valid_sections.push(with_percent);
            }
        }
        SplitKickstartParser::new(SplitOptions {
            valid_sections,
            missing_include_is_fatal: true,
        })
    }
}

impl<M: ServiceModule> ModuleHandle for KickstartModule<M> {
    fn identifier(&self) -> &str {
        self.inner.name()
    }

    fn claim(&self) -> ModuleClaim {
        ModuleClaim {
            commands: self.inner.commands().iter().map(|s| s.to_string()).collect(),
            sections: self.inner.sections().iter().map(|s| s.to_string()).collect(),
            addons: self.inner.addons(),
        }
    }

    fn configure_with_kickstart(&mut self, kickstart: &str) -> ConfigureResult {
        debug!(module = self.inner.name(), "configuring from kickstart");
        self.inner.reset();

        let elements = match self.fragment_parser().split_from_string(kickstart, None) {
            Ok(elements) => elements,
            Err(error) => {
                return ConfigureResult::error(split_error_line(&error), error.to_string());
            }
        };

        for element in elements.all() {
            let args = element.args();
            let outcome = match element.kind() {
                ElementKind::Command => self
                    .inner
                    .handle_command(element.name(), args.get(1..).unwrap_or(&[])),
                ElementKind::Section => self.inner.handle_section(
                    element.name(),
                    args.get(1..).unwrap_or(&[]),
                    element.lines(),
                ),
                ElementKind::Addon => self.inner.handle_addon(
                    element.name(),
                    args.get(2..).unwrap_or(&[]),
                    element.lines(),
                ),
            };
            if let Err(error) = outcome {
                return ConfigureResult::error(element.lineno(), format!("{error:#}"));
            }
        }

        ConfigureResult::success()
    }

    fn generate_kickstart(&self) -> String {
        self.inner.generate_kickstart()
    }
}

/// Fragment line to report when the fragment itself does not split.
fn split_error_line(error: &SplitKickstartError) -> usize {
    match error {
        SplitKickstartError::UnknownSection { line, .. }
        | SplitKickstartError::UnclosedSection { line, .. }
        | SplitKickstartError::MissingInclude { line, .. } => *line,
        SplitKickstartError::Io { .. } => 1,
    }
}

/// Build a registry of built-in modules from an ordered name list.
///
/// The order of `names` becomes the registration order and therefore the
/// distribution order.
pub fn registry_from_names<S: AsRef<str>>(names: &[S]) -> Result<ModuleRegistry> {
    let mut registry = ModuleRegistry::new();
    for name in names {
        let module: Box<dyn ModuleHandle> = match name.as_ref() {
            "network" => KickstartModule::boxed(NetworkModule::default()),
            "localization" => KickstartModule::boxed(LocalizationModule::default()),
            "timezone" => KickstartModule::boxed(TimezoneModule::default()),
            "security" => KickstartModule::boxed(SecurityModule::default()),
            "users" => KickstartModule::boxed(UsersModule::default()),
            "storage" => KickstartModule::boxed(StorageModule::default()),
            "payload" => KickstartModule::boxed(PayloadModule::default()),
            "subscription" => KickstartModule::boxed(SubscriptionModule::default()),
            other => bail!("unknown service module '{}'", other),
        };
        registry.register(module);
    }
    Ok(registry)
}

/// Registry with every built-in module in default order.
pub fn default_registry() -> ModuleRegistry {
    registry_from_names(DEFAULT_MODULES).expect("default module names are valid")
}
