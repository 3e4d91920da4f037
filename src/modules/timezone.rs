//! Timezone service module: the `timezone` command.

use anyhow::{bail, Result};

use crate::modules::options::OptionParser;
use crate::modules::ServiceModule;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TimezoneData {
    pub timezone: String,
    pub utc: bool,
    pub ntp_servers: Vec<String>,
}

#[derive(Debug, Default)]
pub struct TimezoneModule {
    timezone: Option<TimezoneData>,
}

impl TimezoneModule {
    pub fn timezone(&self) -> Option<&TimezoneData> {
        self.timezone.as_ref()
    }
}

impl ServiceModule for TimezoneModule {
    fn name(&self) -> &str {
        "timezone"
    }

    fn commands(&self) -> &[&str] {
        &["timezone"]
    }

    fn handle_command(&mut self, name: &str, options: &[String]) -> Result<()> {
        if name != "timezone" {
            bail!("command {} is not handled by module timezone", name);
        }
        let opts = OptionParser::new("timezone")
            .flag("utc")
            .value("ntpservers")
            .parse(options)?;
        let timezone = opts.required_positional("timezone")?;

        self.timezone = Some(TimezoneData {
            timezone: timezone.to_string(),
            utc: opts.flag("utc"),
            ntp_servers: opts
                .value("ntpservers")
                .map(|v| v.split(',').map(str::to_string).collect())
                .unwrap_or_default(),
        });
        Ok(())
    }

    fn generate_kickstart(&self) -> String {
        let Some(data) = &self.timezone else {
            return String::new();
        };
        let mut output = String::from("timezone");
        if data.utc {
            output.push_str(" --utc");
        }
        if !data.ntp_servers.is_empty() {
            output.push_str(&format!(" --ntpservers={}", data.ntp_servers.join(",")));
        }
        output.push_str(&format!(" {}\n", data.timezone));
        output
    }

    fn reset(&mut self) {
        self.timezone = None;
    }
}
