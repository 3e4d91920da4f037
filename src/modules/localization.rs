//! Localization service module: `keyboard` and `lang`.

use anyhow::{bail, Result};

use crate::modules::options::OptionParser;
use crate::modules::ServiceModule;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeyboardData {
    pub vc_keymap: Option<String>,
    pub x_layouts: Vec<String>,
    /// Layout given positionally, the pre-layout-options spelling.
    pub layout: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LanguageData {
    pub lang: String,
    pub addsupport: Vec<String>,
}

#[derive(Debug, Default)]
pub struct LocalizationModule {
    keyboard: Option<KeyboardData>,
    language: Option<LanguageData>,
}

impl LocalizationModule {
    pub fn keyboard(&self) -> Option<&KeyboardData> {
        self.keyboard.as_ref()
    }

    pub fn language(&self) -> Option<&LanguageData> {
        self.language.as_ref()
    }

    fn parse_keyboard(&mut self, options: &[String]) -> Result<()> {
        let opts = OptionParser::new("keyboard")
            .value("vckeymap")
            .value("xlayouts")
            .parse(options)?;

        let layout = match opts.positional() {
            [] => None,
            [one] => Some(one.clone()),
            _ => bail!("command keyboard takes a single layout argument"),
        };
        if layout.is_none() && opts.value("vckeymap").is_none() && opts.value("xlayouts").is_none()
        {
            bail!("command keyboard requires a layout or --vckeymap/--xlayouts");
        }

        self.keyboard = Some(KeyboardData {
            vc_keymap: opts.value("vckeymap").map(str::to_string),
            x_layouts: opts
                .value("xlayouts")
                .map(|v| v.split(',').map(str::to_string).collect())
                .unwrap_or_default(),
            layout,
        });
        Ok(())
    }

    fn parse_lang(&mut self, options: &[String]) -> Result<()> {
        let opts = OptionParser::new("lang").value("addsupport").parse(options)?;
        let lang = opts.required_positional("lang")?;
        self.language = Some(LanguageData {
            lang: lang.to_string(),
            addsupport: opts
                .value("addsupport")
                .map(|v| v.split(',').map(str::to_string).collect())
                .unwrap_or_default(),
        });
        Ok(())
    }
}

impl ServiceModule for LocalizationModule {
    fn name(&self) -> &str {
        "localization"
    }

    fn commands(&self) -> &[&str] {
        &["keyboard", "lang"]
    }

    fn handle_command(&mut self, name: &str, options: &[String]) -> Result<()> {
        match name {
            "keyboard" => self.parse_keyboard(options),
            "lang" => self.parse_lang(options),
            other => bail!("command {} is not handled by module localization", other),
        }
    }

    fn generate_kickstart(&self) -> String {
        let mut output = String::new();
        if let Some(keyboard) = &self.keyboard {
            output.push_str("keyboard");
            if let Some(vc) = &keyboard.vc_keymap {
                output.push_str(&format!(" --vckeymap={vc}"));
            }
            if !keyboard.x_layouts.is_empty() {
                output.push_str(&format!(" --xlayouts={}", keyboard.x_layouts.join(",")));
            }
            if let Some(layout) = &keyboard.layout {
                output.push_str(&format!(" {layout}"));
            }
            output.push('\n');
        }
        if let Some(language) = &self.language {
            output.push_str(&format!("lang {}", language.lang));
            if !language.addsupport.is_empty() {
                output.push_str(&format!(" --addsupport={}", language.addsupport.join(",")));
            }
            output.push('\n');
        }
        output
    }

    fn reset(&mut self) {
        self.keyboard = None;
        self.language = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_keyboard() {
        let mut module = LocalizationModule::default();
        module
            .handle_command("keyboard", &args(&["--vckeymap=us", "--xlayouts=us,cz"]))
            .unwrap();
        let keyboard = module.keyboard().unwrap();
        assert_eq!(keyboard.vc_keymap.as_deref(), Some("us"));
        assert_eq!(keyboard.x_layouts, vec!["us", "cz"]);

        let err = module.handle_command("keyboard", &args(&[])).unwrap_err();
        assert!(err.to_string().contains("requires a layout"));
    }

    #[test]
    fn test_lang() {
        let mut module = LocalizationModule::default();
        module
            .handle_command("lang", &args(&["en_US.UTF-8", "--addsupport=cs_CZ.UTF-8"]))
            .unwrap();
        let language = module.language().unwrap();
        assert_eq!(language.lang, "en_US.UTF-8");
        assert_eq!(language.addsupport, vec!["cs_CZ.UTF-8"]);

        assert!(module.handle_command("lang", &args(&[])).is_err());
    }

    #[test]
    fn test_generate() {
        let mut module = LocalizationModule::default();
        module
            .handle_command("keyboard", &args(&["--vckeymap=us"]))
            .unwrap();
        module.handle_command("lang", &args(&["en_US.UTF-8"])).unwrap();
        assert_eq!(
            module.generate_kickstart(),
            "keyboard --vckeymap=us\nlang en_US.UTF-8\n"
        );
    }
}
