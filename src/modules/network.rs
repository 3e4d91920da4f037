//! Network service module: owns the `network` and `firewall` commands.
//!
//! The module validates and stores network configuration requests; applying
//! them to actual devices is the job of the network backend consumed during
//! the execute phase, not of this module.

use anyhow::{bail, Context, Result};

use crate::modules::options::OptionParser;
use crate::modules::ServiceModule;

/// Boot protocols accepted by `network --bootproto`.
pub const BOOT_PROTOCOLS: &[&str] = &["dhcp", "static", "ibft", "query"];

/// One `network` command's worth of device configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NetworkData {
    pub device: Option<String>,
    pub bootproto: Option<String>,
    pub ip: Option<String>,
    pub netmask: Option<String>,
    pub gateway: Option<String>,
    pub nameserver: Option<String>,
    pub hostname: Option<String>,
    pub mtu: Option<u32>,
    pub activate: bool,
    pub onboot: Option<bool>,
}

/// Firewall configuration from the `firewall` command.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FirewallData {
    pub enabled: bool,
    pub ports: Vec<String>,
    pub services: Vec<String>,
}

#[derive(Debug, Default)]
pub struct NetworkModule {
    devices: Vec<NetworkData>,
    firewall: Option<FirewallData>,
}

impl NetworkModule {
    pub fn devices(&self) -> &[NetworkData] {
        &self.devices
    }

    pub fn firewall(&self) -> Option<&FirewallData> {
        self.firewall.as_ref()
    }

    fn parse_network(&mut self, options: &[String]) -> Result<()> {
        let opts = OptionParser::new("network")
            .value("device")
            .value("bootproto")
            .value("ip")
            .value("netmask")
            .value("gateway")
            .value("nameserver")
            .value("hostname")
            .value("mtu")
            .value("onboot")
            .flag("activate")
            .parse(options)?;

        let bootproto = opts.value("bootproto").map(str::to_string);
        if let Some(proto) = &bootproto {
            if !BOOT_PROTOCOLS.contains(&proto.as_str()) {
                bail!(
                    "invalid --bootproto '{}'; expected one of: {}",
                    proto,
                    BOOT_PROTOCOLS.join(", ")
                );
            }
            if proto == "static" && (opts.value("ip").is_none() || opts.value("netmask").is_none())
            {
                bail!("--bootproto=static requires --ip and --netmask");
            }
        }

        let mtu = opts
            .value("mtu")
            .map(|v| v.parse::<u32>().with_context(|| format!("invalid --mtu '{v}'")))
            .transpose()?;
        let onboot = opts.value("onboot").map(parse_yes_no).transpose()?;

        self.devices.push(NetworkData {
            device: opts.value("device").map(str::to_string),
            bootproto,
            ip: opts.value("ip").map(str::to_string),
            netmask: opts.value("netmask").map(str::to_string),
            gateway: opts.value("gateway").map(str::to_string),
            nameserver: opts.value("nameserver").map(str::to_string),
            hostname: opts.value("hostname").map(str::to_string),
            mtu,
            activate: opts.flag("activate"),
            onboot,
        });
        Ok(())
    }

    fn parse_firewall(&mut self, options: &[String]) -> Result<()> {
        let opts = OptionParser::new("firewall")
            .flag("enabled")
            .flag("disabled")
            .value("port")
            .value("service")
            .parse(options)?;

        if opts.flag("enabled") && opts.flag("disabled") {
            bail!("firewall cannot be both --enabled and --disabled");
        }

        self.firewall = Some(FirewallData {
            enabled: !opts.flag("disabled"),
            ports: split_list(opts.value("port")),
            services: split_list(opts.value("service")),
        });
        Ok(())
    }
}

impl ServiceModule for NetworkModule {
    fn name(&self) -> &str {
        "network"
    }

    fn commands(&self) -> &[&str] {
        &["network", "firewall"]
    }

    fn handle_command(&mut self, name: &str, options: &[String]) -> Result<()> {
        match name {
            "network" => self.parse_network(options),
            "firewall" => self.parse_firewall(options),
            other => bail!("command {} is not handled by module network", other),
        }
    }

    fn generate_kickstart(&self) -> String {
        let mut output = String::new();
        for device in &self.devices {
            output.push_str("network");
            push_value(&mut output, "device", device.device.as_deref());
            push_value(&mut output, "bootproto", device.bootproto.as_deref());
            push_value(&mut output, "ip", device.ip.as_deref());
            push_value(&mut output, "netmask", device.netmask.as_deref());
            push_value(&mut output, "gateway", device.gateway.as_deref());
            push_value(&mut output, "nameserver", device.nameserver.as_deref());
            push_value(&mut output, "hostname", device.hostname.as_deref());
            if let Some(mtu) = device.mtu {
                output.push_str(&format!(" --mtu={mtu}"));
            }
            if let Some(onboot) = device.onboot {
                output.push_str(if onboot { " --onboot=yes" } else { " --onboot=no" });
            }
            if device.activate {
                output.push_str(" --activate");
            }
            output.push('\n');
        }
        if let Some(firewall) = &self.firewall {
            output.push_str("firewall");
            output.push_str(if firewall.enabled { " --enabled" } else { " --disabled" });
            if !firewall.ports.is_empty() {
                output.push_str(&format!(" --port={}", firewall.ports.join(",")));
            }
            if !firewall.services.is_empty() {
                output.push_str(&format!(" --service={}", firewall.services.join(",")));
            }
            output.push('\n');
        }
        output
    }

    fn reset(&mut self) {
        self.devices.clear();
        self.firewall = None;
    }
}

fn parse_yes_no(value: &str) -> Result<bool> {
    match value {
        "yes" => Ok(true),
        "no" => Ok(false),
        other => bail!("invalid --onboot '{}'; expected yes or no", other),
    }
}

fn split_list(value: Option<&str>) -> Vec<String> {
    value
        .map(|v| v.split(',').map(str::to_string).collect())
        .unwrap_or_default()
}

fn push_value(output: &mut String, name: &str, value: Option<&str>) {
    if let Some(value) = value {
        output.push_str(&format!(" --{name}={value}"));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_network_command() {
        let mut module = NetworkModule::default();
        module
            .handle_command(
                "network",
                &args(&["--device=ens3", "--bootproto=dhcp", "--activate"]),
            )
            .unwrap();
        module
            .handle_command("network", &args(&["--device=ens4", "--hostname=lab1"]))
            .unwrap();

        assert_eq!(module.devices().len(), 2);
        assert_eq!(module.devices()[0].device.as_deref(), Some("ens3"));
        assert!(module.devices()[0].activate);
        assert_eq!(module.devices()[1].hostname.as_deref(), Some("lab1"));
    }

    #[test]
    fn test_network_validation() {
        let mut module = NetworkModule::default();

        let err = module
            .handle_command("network", &args(&["--bootproto=carrier-pigeon"]))
            .unwrap_err();
        assert!(err.to_string().contains("invalid --bootproto"));

        let err = module
            .handle_command("network", &args(&["--bootproto=static", "--ip=10.0.0.2"]))
            .unwrap_err();
        assert!(err.to_string().contains("requires --ip and --netmask"));

        let err = module
            .handle_command("network", &args(&["--mtu=banana"]))
            .unwrap_err();
        assert!(err.to_string().contains("invalid --mtu"));

        let err = module
            .handle_command("network", &args(&["--devce=ens9"]))
            .unwrap_err();
        assert!(err.to_string().contains("unknown option --devce"));
    }

    #[test]
    fn test_firewall_command() {
        let mut module = NetworkModule::default();
        module
            .handle_command("firewall", &args(&["--enabled", "--port=22:tcp,80:tcp"]))
            .unwrap();
        let firewall = module.firewall().unwrap();
        assert!(firewall.enabled);
        assert_eq!(firewall.ports, vec!["22:tcp", "80:tcp"]);

        let err = module
            .handle_command("firewall", &args(&["--enabled", "--disabled"]))
            .unwrap_err();
        assert!(err.to_string().contains("both"));
    }

    #[test]
    fn test_generate_round_trip() {
        let mut module = NetworkModule::default();
        module
            .handle_command(
                "network",
                &args(&[
                    "--device=ens3",
                    "--bootproto=static",
                    "--ip=10.0.0.2",
                    "--netmask=255.255.255.0",
                    "--activate",
                ]),
            )
            .unwrap();
        module.handle_command("firewall", &args(&["--enabled"])).unwrap();

        let generated = module.generate_kickstart();
        assert_eq!(
            generated,
            "network --device=ens3 --bootproto=static --ip=10.0.0.2 --netmask=255.255.255.0 --activate\n\
             firewall --enabled\n"
        );

        // feeding the generated text back reproduces the same state
        let devices = module.devices().to_vec();
        let mut second = NetworkModule::default();
        for line in generated.lines() {
            let mut words = line.split_whitespace().map(str::to_string);
            let name = words.next().unwrap();
            second.handle_command(&name, &words.collect::<Vec<_>>()).unwrap();
        }
        assert_eq!(second.devices(), devices.as_slice());
    }
}
