//! Storage service module: `clearpart`, `ignoredisk` and `zerombr`.
//!
//! Only the disk-selection commands are claimed here. The module records
//! what the document asked for; partitioning itself is performed by the
//! storage backend, outside this crate.

use anyhow::{bail, Result};

use crate::modules::options::OptionParser;
use crate::modules::ServiceModule;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClearPartData {
    pub all: bool,
    pub init_label: bool,
    pub drives: Vec<String>,
}

/// Disk selection from `ignoredisk`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiskSelection {
    OnlyUse(Vec<String>),
    Ignore(Vec<String>),
}

#[derive(Debug, Default)]
pub struct StorageModule {
    clearpart: Option<ClearPartData>,
    disk_selection: Option<DiskSelection>,
    zero_mbr: bool,
}

impl StorageModule {
    pub fn clearpart(&self) -> Option<&ClearPartData> {
        self.clearpart.as_ref()
    }

    pub fn disk_selection(&self) -> Option<&DiskSelection> {
        self.disk_selection.as_ref()
    }

    pub fn zero_mbr(&self) -> bool {
        self.zero_mbr
    }

    fn parse_clearpart(&mut self, options: &[String]) -> Result<()> {
        let opts = OptionParser::new("clearpart")
            .flag("all")
            .flag("initlabel")
            .value("drives")
            .parse(options)?;

        self.clearpart = Some(ClearPartData {
            all: opts.flag("all"),
            init_label: opts.flag("initlabel"),
            drives: opts
                .value("drives")
                .map(|v| v.split(',').map(str::to_string).collect())
                .unwrap_or_default(),
        });
        Ok(())
    }

    fn parse_ignoredisk(&mut self, options: &[String]) -> Result<()> {
        let opts = OptionParser::new("ignoredisk")
            .value("only-use")
            .value("drives")
            .parse(options)?;

        let split = |v: &str| v.split(',').map(str::to_string).collect();
        self.disk_selection = match (opts.value("only-use"), opts.value("drives")) {
            (Some(only), None) => Some(DiskSelection::OnlyUse(split(only))),
            (None, Some(drives)) => Some(DiskSelection::Ignore(split(drives))),
            _ => bail!("ignoredisk requires exactly one of --only-use or --drives"),
        };
        Ok(())
    }

    fn parse_zerombr(&mut self, options: &[String]) -> Result<()> {
        if !options.is_empty() {
            bail!("zerombr takes no options");
        }
        self.zero_mbr = true;
        Ok(())
    }
}

impl ServiceModule for StorageModule {
    fn name(&self) -> &str {
        "storage"
    }

    fn commands(&self) -> &[&str] {
        &["clearpart", "ignoredisk", "zerombr"]
    }

    fn handle_command(&mut self, name: &str, options: &[String]) -> Result<()> {
        match name {
            "clearpart" => self.parse_clearpart(options),
            "ignoredisk" => self.parse_ignoredisk(options),
            "zerombr" => self.parse_zerombr(options),
            other => bail!("command {} is not handled by module storage", other),
        }
    }

    fn generate_kickstart(&self) -> String {
        let mut output = String::new();
        if self.zero_mbr {
            output.push_str("zerombr\n");
        }
        if let Some(clearpart) = &self.clearpart {
            output.push_str("clearpart");
            if clearpart.all {
                output.push_str(" --all");
            }
            if clearpart.init_label {
                output.push_str(" --initlabel");
            }
            if !clearpart.drives.is_empty() {
                output.push_str(&format!(" --drives={}", clearpart.drives.join(",")));
            }
            output.push('\n');
        }
        match &self.disk_selection {
            Some(DiskSelection::OnlyUse(drives)) => {
                output.push_str(&format!("ignoredisk --only-use={}\n", drives.join(",")));
            }
            Some(DiskSelection::Ignore(drives)) => {
                output.push_str(&format!("ignoredisk --drives={}\n", drives.join(",")));
            }
            None => {}
        }
        output
    }

    fn reset(&mut self) {
        self.clearpart = None;
        self.disk_selection = None;
        self.zero_mbr = false;
    }
}
