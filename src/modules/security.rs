//! Security service module: `selinux` and `authselect`.

use anyhow::{bail, Result};

use crate::modules::options::OptionParser;
use crate::modules::ServiceModule;

/// SELinux enforcement mode requested by the document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SELinuxMode {
    Enforcing,
    Permissive,
    Disabled,
}

impl SELinuxMode {
    fn option(&self) -> &'static str {
        match self {
            SELinuxMode::Enforcing => "--enforcing",
            SELinuxMode::Permissive => "--permissive",
            SELinuxMode::Disabled => "--disabled",
        }
    }
}

#[derive(Debug, Default)]
pub struct SecurityModule {
    selinux: Option<SELinuxMode>,
    authselect: Vec<String>,
}

impl SecurityModule {
    pub fn selinux(&self) -> Option<SELinuxMode> {
        self.selinux
    }

    pub fn authselect(&self) -> &[String] {
        &self.authselect
    }

    fn parse_selinux(&mut self, options: &[String]) -> Result<()> {
        let opts = OptionParser::new("selinux")
            .flag("enforcing")
            .flag("permissive")
            .flag("disabled")
            .parse(options)?;

        let modes: Vec<SELinuxMode> = [
            (SELinuxMode::Enforcing, "enforcing"),
            (SELinuxMode::Permissive, "permissive"),
            (SELinuxMode::Disabled, "disabled"),
        ]
        .iter()
        .filter(|(_, flag)| opts.flag(flag))
        .map(|(mode, _)| *mode)
        .collect();

        match modes.as_slice() {
            [mode] => {
                self.selinux = Some(*mode);
                Ok(())
            }
            [] => bail!("selinux requires one of --enforcing, --permissive, --disabled"),
            _ => bail!("selinux accepts only one mode option"),
        }
    }

    fn parse_authselect(&mut self, options: &[String]) -> Result<()> {
        // authselect passes its arguments through to the tool; no options
        // of its own.
        let opts = OptionParser::new("authselect").parse(options)?;
        if opts.positional().is_empty() {
            bail!("command authselect requires an argument");
        }
        self.authselect = opts.positional().to_vec();
        Ok(())
    }
}

impl ServiceModule for SecurityModule {
    fn name(&self) -> &str {
        "security"
    }

    fn commands(&self) -> &[&str] {
        &["selinux", "authselect"]
    }

    fn handle_command(&mut self, name: &str, options: &[String]) -> Result<()> {
        match name {
            "selinux" => self.parse_selinux(options),
            "authselect" => self.parse_authselect(options),
            other => bail!("command {} is not handled by module security", other),
        }
    }

    fn generate_kickstart(&self) -> String {
        let mut output = String::new();
        if let Some(mode) = self.selinux {
            output.push_str(&format!("selinux {}\n", mode.option()));
        }
        if !self.authselect.is_empty() {
            output.push_str(&format!("authselect {}\n", self.authselect.join(" ")));
        }
        output
    }

    fn reset(&mut self) {
        self.selinux = None;
        self.authselect.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_selinux_modes() {
        let mut module = SecurityModule::default();
        module.handle_command("selinux", &args(&["--enforcing"])).unwrap();
        assert_eq!(module.selinux(), Some(SELinuxMode::Enforcing));

        let err = module.handle_command("selinux", &args(&[])).unwrap_err();
        assert!(err.to_string().contains("requires one of"));

        let err = module
            .handle_command("selinux", &args(&["--enforcing", "--disabled"]))
            .unwrap_err();
        assert!(err.to_string().contains("only one"));
    }

    #[test]
    fn test_authselect() {
        let mut module = SecurityModule::default();
        module
            .handle_command("authselect", &args(&["select", "sssd"]))
            .unwrap();
        assert_eq!(module.authselect(), &["select", "sssd"]);
        assert_eq!(module.generate_kickstart(), "authselect select sssd\n");
    }
}
