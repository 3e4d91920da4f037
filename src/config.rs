//! Runtime configuration for one installation run.
//!
//! Everything that used to be an ambient flag lives here as an explicit
//! value: the kickstart split options and the ordered list of enabled
//! service modules. The configuration is built once - from defaults or
//! from an `installer-boss.toml` file - and threaded into the parser and
//! the coordinator at construction time.

use std::fs;
use std::path::Path;

use anyhow::{bail, Context, Result};
use serde::Deserialize;

use crate::kickstart::SplitOptions;
use crate::modules::DEFAULT_MODULES;

/// Config file looked up in the working directory by the CLI.
pub const DEFAULT_CONFIG_FILE: &str = "installer-boss.toml";

/// Resolved configuration for one run.
#[derive(Debug, Clone)]
pub struct InstallerConfig {
    /// Options for the split phase.
    pub split: SplitOptions,
    /// Enabled service modules, in registration (= distribution) order.
    pub modules: Vec<String>,
}

impl Default for InstallerConfig {
    fn default() -> Self {
        Self {
            split: SplitOptions::default(),
            modules: DEFAULT_MODULES.iter().map(|m| m.to_string()).collect(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct InstallerToml {
    kickstart: Option<KickstartToml>,
    modules: Option<ModulesToml>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct KickstartToml {
    missing_include_is_fatal: Option<bool>,
    extra_valid_sections: Option<Vec<String>>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ModulesToml {
    enabled: Option<Vec<String>>,
}

/// Load configuration from a toml file.
pub fn load_config(path: &Path) -> Result<InstallerConfig> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("reading config '{}'", path.display()))?;
    parse_config(&text).with_context(|| format!("parsing config '{}'", path.display()))
}

/// Load configuration from `path` when the file exists, defaults otherwise.
pub fn load_config_or_default(path: &Path) -> Result<InstallerConfig> {
    if path.exists() {
        load_config(path)
    } else {
        Ok(InstallerConfig::default())
    }
}

fn parse_config(text: &str) -> Result<InstallerConfig> {
    let parsed: InstallerToml = toml::from_str(text)?;
    let mut config = InstallerConfig::default();

    if let Some(kickstart) = parsed.kickstart {
        if let Some(fatal) = kickstart.missing_include_is_fatal {
            config.split.missing_include_is_fatal = fatal;
        }
        for section in kickstart.extra_valid_sections.unwrap_or_default() {
            let section = section.trim().to_string();
            if !section.starts_with('%') {
                bail!(
                    "invalid extra section '{}': section names must start with '%'",
                    section
                );
            }
            if !config.split.valid_sections.contains(&section) {
                config.split.valid_sections.push(section);
            }
        }
    }

    if let Some(modules) = parsed.modules {
        if let Some(enabled) = modules.enabled {
            let enabled: Vec<String> = enabled
                .into_iter()
                .map(|m| m.trim().to_string())
                .filter(|m| !m.is_empty())
                .collect();
            if enabled.is_empty() {
                bail!("modules.enabled must name at least one module");
            }
            for (i, module) in enabled.iter().enumerate() {
                if enabled[..i].contains(module) {
                    bail!("module '{}' is enabled twice", module);
                }
            }
            config.modules = enabled;
        }
    }

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kickstart::DEFAULT_VALID_SECTIONS;

    #[test]
    fn test_default_config() {
        let config = InstallerConfig::default();
        assert!(config.split.missing_include_is_fatal);
        assert_eq!(config.split.valid_sections.len(), DEFAULT_VALID_SECTIONS.len());
        assert_eq!(config.modules, DEFAULT_MODULES);
    }

    #[test]
    fn test_parse_config() {
        let config = parse_config(
            r#"
[kickstart]
missing_include_is_fatal = false
extra_valid_sections = ["%vendor"]

[modules]
enabled = ["payload", "network"]
"#,
        )
        .unwrap();

        assert!(!config.split.missing_include_is_fatal);
        assert!(config.split.valid_sections.contains(&"%vendor".to_string()));
        // the configured order is the distribution order
        assert_eq!(config.modules, vec!["payload", "network"]);
    }

    #[test]
    fn test_unknown_field_rejected() {
        assert!(parse_config("[kickstart]\nbogus = 1\n").is_err());
        assert!(parse_config("[typo_section]\n").is_err());
    }

    #[test]
    fn test_invalid_extra_section() {
        let err = parse_config("[kickstart]\nextra_valid_sections = [\"vendor\"]\n").unwrap_err();
        assert!(format!("{err:#}").contains("must start with '%'"));
    }

    #[test]
    fn test_duplicate_module_rejected() {
        let err = parse_config("[modules]\nenabled = [\"network\", \"network\"]\n").unwrap_err();
        assert!(format!("{err:#}").contains("enabled twice"));
    }

    #[test]
    fn test_load_config_or_default_missing_file() {
        let config = load_config_or_default(Path::new("does-not-exist.toml")).unwrap();
        assert_eq!(config.modules, DEFAULT_MODULES);
    }
}
