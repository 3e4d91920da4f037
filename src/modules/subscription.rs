//! Subscription service module: `rhsm`, `syspurpose` and discovered addons.
//!
//! Addon claims are dynamic: the set of addon names this module owns is
//! whatever was discovered at startup and passed to [`SubscriptionModule::with_addons`].
//! Addon content is not interpreted - the raw section is stored so it can
//! be re-emitted unchanged.

use anyhow::{bail, Result};

use crate::modules::options::OptionParser;
use crate::modules::ServiceModule;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RhsmData {
    pub organization: String,
    pub activation_key: String,
    pub server_hostname: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SysPurposeData {
    pub role: Option<String>,
    pub sla: Option<String>,
    pub usage: Option<String>,
}

/// A claimed `%addon` section, kept verbatim.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddonData {
    pub name: String,
    pub options: Vec<String>,
    pub body: Vec<String>,
}

#[derive(Debug, Default)]
pub struct SubscriptionModule {
    known_addons: Vec<String>,
    rhsm: Option<RhsmData>,
    syspurpose: Option<SysPurposeData>,
    addons: Vec<AddonData>,
}

impl SubscriptionModule {
    /// Module with the given discovered addon names in its claim.
    pub fn with_addons(addons: Vec<String>) -> Self {
        Self {
            known_addons: addons,
            ..Self::default()
        }
    }

    pub fn rhsm(&self) -> Option<&RhsmData> {
        self.rhsm.as_ref()
    }

    pub fn syspurpose(&self) -> Option<&SysPurposeData> {
        self.syspurpose.as_ref()
    }

    pub fn configured_addons(&self) -> &[AddonData] {
        &self.addons
    }

    fn parse_rhsm(&mut self, options: &[String]) -> Result<()> {
        let opts = OptionParser::new("rhsm")
            .value("organization")
            .value("activation-key")
            .value("server-hostname")
            .parse(options)?;

        let (Some(organization), Some(activation_key)) =
            (opts.value("organization"), opts.value("activation-key"))
        else {
            bail!("rhsm requires both --organization and --activation-key");
        };

        self.rhsm = Some(RhsmData {
            organization: organization.to_string(),
            activation_key: activation_key.to_string(),
            server_hostname: opts.value("server-hostname").map(str::to_string),
        });
        Ok(())
    }

    fn parse_syspurpose(&mut self, options: &[String]) -> Result<()> {
        let opts = OptionParser::new("syspurpose")
            .value("role")
            .value("sla")
            .value("usage")
            .parse(options)?;
        self.syspurpose = Some(SysPurposeData {
            role: opts.value("role").map(str::to_string),
            sla: opts.value("sla").map(str::to_string),
            usage: opts.value("usage").map(str::to_string),
        });
        Ok(())
    }
}

impl ServiceModule for SubscriptionModule {
    fn name(&self) -> &str {
        "subscription"
    }

    fn commands(&self) -> &[&str] {
        &["rhsm", "syspurpose"]
    }

    fn addons(&self) -> Vec<String> {
        self.known_addons.clone()
    }

    fn handle_command(&mut self, name: &str, options: &[String]) -> Result<()> {
        match name {
            "rhsm" => self.parse_rhsm(options),
            "syspurpose" => self.parse_syspurpose(options),
            other => bail!("command {} is not handled by module subscription", other),
        }
    }

    fn handle_addon(&mut self, name: &str, options: &[String], body: &[String]) -> Result<()> {
        if !self.known_addons.iter().any(|a| a == name) {
            bail!("addon {} is not known to module subscription", name);
        }
        self.addons.push(AddonData {
            name: name.to_string(),
            options: options.to_vec(),
            body: body.to_vec(),
        });
        Ok(())
    }

    fn generate_kickstart(&self) -> String {
        let mut output = String::new();
        if let Some(rhsm) = &self.rhsm {
            output.push_str(&format!(
                "rhsm --organization={} --activation-key={}",
                rhsm.organization, rhsm.activation_key
            ));
            if let Some(server) = &rhsm.server_hostname {
                output.push_str(&format!(" --server-hostname={server}"));
            }
            output.push('\n');
        }
        if let Some(syspurpose) = &self.syspurpose {
            output.push_str("syspurpose");
            if let Some(role) = &syspurpose.role {
                output.push_str(&format!(" --role={role}"));
            }
            if let Some(sla) = &syspurpose.sla {
                output.push_str(&format!(" --sla={sla}"));
            }
            if let Some(usage) = &syspurpose.usage {
                output.push_str(&format!(" --usage={usage}"));
            }
            output.push('\n');
        }
        for addon in &self.addons {
            output.push_str(&format!("%addon {}", addon.name));
            for option in &addon.options {
                output.push_str(&format!(" {option}"));
            }
            output.push('\n');
            for line in &addon.body {
                output.push_str(line);
            }
            output.push_str("%end\n");
        }
        output
    }

    fn reset(&mut self) {
        self.rhsm = None;
        self.syspurpose = None;
        self.addons.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_rhsm() {
        let mut module = SubscriptionModule::default();
        module
            .handle_command(
                "rhsm",
                &args(&["--organization=1234", "--activation-key=lab"]),
            )
            .unwrap();
        let rhsm = module.rhsm().unwrap();
        assert_eq!(rhsm.organization, "1234");
        assert_eq!(rhsm.activation_key, "lab");

        let err = module
            .handle_command("rhsm", &args(&["--organization=1234"]))
            .unwrap_err();
        assert!(err.to_string().contains("both"));
    }

    #[test]
    fn test_syspurpose() {
        let mut module = SubscriptionModule::default();
        module
            .handle_command("syspurpose", &args(&["--role=server", "--sla=standard"]))
            .unwrap();
        let purpose = module.syspurpose().unwrap();
        assert_eq!(purpose.role.as_deref(), Some("server"));
        assert_eq!(purpose.sla.as_deref(), Some("standard"));
    }

    #[test]
    fn test_addon_claim_is_dynamic() {
        let module = SubscriptionModule::default();
        assert!(module.addons().is_empty());

        let module = SubscriptionModule::with_addons(vec!["scorched".to_string()]);
        assert_eq!(module.addons(), vec!["scorched"]);
    }

    #[test]
    fn test_addon_content_round_trips() {
        let mut module = SubscriptionModule::with_addons(vec!["scorched".to_string()]);
        module
            .handle_addon(
                "scorched",
                &args(&["--planet=Earth"]),
                &["nuke\n".to_string()],
            )
            .unwrap();
        assert_eq!(
            module.generate_kickstart(),
            "%addon scorched --planet=Earth\nnuke\n%end\n"
        );

        let err = module
            .handle_addon("pony", &args(&[]), &[])
            .unwrap_err();
        assert!(err.to_string().contains("not known"));
    }
}
