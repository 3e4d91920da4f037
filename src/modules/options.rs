//! Option parsing for kickstart command lines.
//!
//! Kickstart commands use a small, uniform `--option`, `--option=value`,
//! `--option value` syntax plus positional arguments. Each command declares
//! which options it knows (and which of them take a value) through
//! [`OptionParser`]; anything undeclared is a module-local semantic error,
//! which the distribution layer reports back against the original document
//! line.

use std::collections::{BTreeMap, BTreeSet};

use anyhow::{bail, Result};

/// Declarative parser for one command's option grammar.
///
/// ```rust
/// use installer_boss::modules::options::OptionParser;
///
/// let args: Vec<String> = vec!["--device=ens3".into(), "--activate".into()];
/// let opts = OptionParser::new("network")
///     .value("device")
///     .flag("activate")
///     .parse(&args)
///     .unwrap();
/// assert_eq!(opts.value("device"), Some("ens3"));
/// assert!(opts.flag("activate"));
/// ```
#[derive(Debug, Clone)]
pub struct OptionParser {
    command: String,
    flags: Vec<&'static str>,
    values: Vec<&'static str>,
}

impl OptionParser {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            flags: Vec::new(),
            values: Vec::new(),
        }
    }

    /// Declare a boolean option (`--name`).
    pub fn flag(mut self, name: &'static str) -> Self {
        self.flags.push(name);
        self
    }

    /// Declare an option taking a value (`--name=value` or `--name value`).
    pub fn value(mut self, name: &'static str) -> Self {
        self.values.push(name);
        self
    }

    /// Parse a command's arguments (everything after the command word).
    ///
    /// A repeated value option keeps the last occurrence, matching the
    /// later-overrides-earlier convention of kickstart documents.
    pub fn parse(&self, args: &[String]) -> Result<ParsedOptions> {
        let mut parsed = ParsedOptions::default();

        let mut i = 0;
        while i < args.len() {
            let arg = &args[i];
            let Some(rest) = arg.strip_prefix("--") else {
                parsed.positional.push(arg.clone());
                i += 1;
                continue;
            };

            let (name, inline_value) = match rest.split_once('=') {
                Some((name, value)) => (name, Some(value.to_string())),
                None => (rest, None),
            };

            if self.values.contains(&name) {
                let value = match inline_value {
                    Some(value) => value,
                    None => {
                        i += 1;
                        match args.get(i) {
                            Some(value) => value.clone(),
                            None => bail!(
                                "option --{} of command {} requires a value",
                                name,
                                self.command
                            ),
                        }
                    }
                };
                parsed.values.insert(name.to_string(), value);
            } else if self.flags.contains(&name) {
                if inline_value.is_some() {
                    bail!("option --{} of command {} takes no value", name, self.command);
                }
                parsed.flags.insert(name.to_string());
            } else {
                bail!("unknown option --{} for command {}", name, self.command);
            }
            i += 1;
        }

        Ok(parsed)
    }
}

/// Result of parsing a command line against its declared grammar.
#[derive(Debug, Clone, Default)]
pub struct ParsedOptions {
    values: BTreeMap<String, String>,
    flags: BTreeSet<String>,
    positional: Vec<String>,
}

impl ParsedOptions {
    pub fn flag(&self, name: &str) -> bool {
        self.flags.contains(name)
    }

    pub fn value(&self, name: &str) -> Option<&str> {
        self.values.get(name).map(String::as_str)
    }

    pub fn positional(&self) -> &[String] {
        &self.positional
    }

    /// The single positional argument some commands require.
    pub fn required_positional(&self, command: &str) -> Result<&str> {
        match self.positional.as_slice() {
            [one] => Ok(one),
            [] => bail!("command {} requires an argument", command),
            _ => bail!("command {} takes a single argument", command),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    fn network_parser() -> OptionParser {
        OptionParser::new("network")
            .value("device")
            .value("bootproto")
            .flag("activate")
    }

    #[test]
    fn test_inline_and_separate_values() {
        let opts = network_parser()
            .parse(&args(&["--device=ens3", "--bootproto", "dhcp", "--activate"]))
            .unwrap();
        assert_eq!(opts.value("device"), Some("ens3"));
        assert_eq!(opts.value("bootproto"), Some("dhcp"));
        assert!(opts.flag("activate"));
        assert!(!opts.flag("bootproto"));
    }

    #[test]
    fn test_last_value_wins() {
        let opts = network_parser()
            .parse(&args(&["--device=ens3", "--device=ens4"]))
            .unwrap();
        assert_eq!(opts.value("device"), Some("ens4"));
    }

    #[test]
    fn test_unknown_option() {
        let err = network_parser()
            .parse(&args(&["--devce=ens9"]))
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "unknown option --devce for command network"
        );
    }

    #[test]
    fn test_missing_value() {
        let err = network_parser().parse(&args(&["--device"])).unwrap_err();
        assert!(err.to_string().contains("requires a value"));
    }

    #[test]
    fn test_flag_with_value_rejected() {
        let err = network_parser()
            .parse(&args(&["--activate=yes"]))
            .unwrap_err();
        assert!(err.to_string().contains("takes no value"));
    }

    #[test]
    fn test_positional_arguments() {
        let parser = OptionParser::new("timezone").flag("utc");
        let opts = parser.parse(&args(&["--utc", "Asia/Tokyo"])).unwrap();
        assert_eq!(opts.positional(), &["Asia/Tokyo".to_string()]);
        assert_eq!(opts.required_positional("timezone").unwrap(), "Asia/Tokyo");

        let opts = parser.parse(&args(&["--utc"])).unwrap();
        assert!(opts.required_positional("timezone").is_err());

        let opts = parser.parse(&args(&["A", "B"])).unwrap();
        assert!(opts.required_positional("timezone").is_err());
    }
}
