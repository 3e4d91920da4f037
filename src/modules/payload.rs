//! Payload service module: package source and package selection.
//!
//! Owns the `url` and `repo` commands and the `%packages` section. The
//! module only models what should be installed and from where; dependency
//! resolution, download and install are delegated to the external package
//! engine during the execute phase.

use anyhow::{bail, Context, Result};

use crate::modules::options::OptionParser;
use crate::modules::ServiceModule;

/// Where the installation tree comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InstallSource {
    Url(String),
    Mirrorlist(String),
    Metalink(String),
}

/// One additional repository from a `repo` command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoData {
    pub name: String,
    pub source: InstallSource,
    pub cost: Option<u32>,
    pub proxy: Option<String>,
}

/// Parsed body of the `%packages` section.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PackagesSelection {
    pub environment: Option<String>,
    pub groups: Vec<String>,
    pub packages: Vec<String>,
    pub excluded_groups: Vec<String>,
    pub excluded_packages: Vec<String>,
    pub ignore_missing: bool,
    pub no_core: bool,
    pub exclude_docs: bool,
}

#[derive(Debug, Default)]
pub struct PayloadModule {
    source: Option<InstallSource>,
    repos: Vec<RepoData>,
    packages: Option<PackagesSelection>,
}

impl PayloadModule {
    pub fn source(&self) -> Option<&InstallSource> {
        self.source.as_ref()
    }

    pub fn repos(&self) -> &[RepoData] {
        &self.repos
    }

    pub fn packages(&self) -> Option<&PackagesSelection> {
        self.packages.as_ref()
    }

    fn parse_url(&mut self, options: &[String]) -> Result<()> {
        let opts = OptionParser::new("url")
            .value("url")
            .value("mirrorlist")
            .value("metalink")
            .parse(options)?;
        self.source = Some(parse_source("url", &opts)?);
        Ok(())
    }

    fn parse_repo(&mut self, options: &[String]) -> Result<()> {
        let opts = OptionParser::new("repo")
            .value("name")
            .value("baseurl")
            .value("mirrorlist")
            .value("metalink")
            .value("cost")
            .value("proxy")
            .parse(options)?;

        let Some(name) = opts.value("name") else {
            bail!("repo requires --name");
        };
        if self.repos.iter().any(|r| r.name == name) {
            bail!("repo '{}' is already defined", name);
        }

        let source = match (
            opts.value("baseurl"),
            opts.value("mirrorlist"),
            opts.value("metalink"),
        ) {
            (Some(url), None, None) => InstallSource::Url(url.to_string()),
            (None, Some(url), None) => InstallSource::Mirrorlist(url.to_string()),
            (None, None, Some(url)) => InstallSource::Metalink(url.to_string()),
            _ => bail!("repo requires exactly one of --baseurl, --mirrorlist, --metalink"),
        };

        self.repos.push(RepoData {
            name: name.to_string(),
            source,
            cost: opts
                .value("cost")
                .map(|v| v.parse::<u32>().with_context(|| format!("invalid --cost '{v}'")))
                .transpose()?,
            proxy: opts.value("proxy").map(str::to_string),
        });
        Ok(())
    }

    fn parse_packages(&mut self, options: &[String], body: &[String]) -> Result<()> {
        let opts = OptionParser::new("%packages")
            .flag("ignoremissing")
            .flag("nocore")
            .flag("excludedocs")
            .parse(options)?;

        let mut selection = PackagesSelection {
            ignore_missing: opts.flag("ignoremissing"),
            no_core: opts.flag("nocore"),
            exclude_docs: opts.flag("excludedocs"),
            ..PackagesSelection::default()
        };

        for line in body {
            let spec = line.trim();
            if spec.is_empty() || spec.starts_with('#') {
                continue;
            }
            if let Some(env) = spec.strip_prefix("@^") {
                selection.environment = Some(env.to_string());
            } else if let Some(group) = spec.strip_prefix("-@") {
                selection.excluded_groups.push(group.to_string());
            } else if let Some(group) = spec.strip_prefix('@') {
                selection.groups.push(group.to_string());
            } else if let Some(package) = spec.strip_prefix('-') {
                selection.excluded_packages.push(package.to_string());
            } else {
                selection.packages.push(spec.to_string());
            }
        }

        self.packages = Some(selection);
        Ok(())
    }
}

impl ServiceModule for PayloadModule {
    fn name(&self) -> &str {
        "payload"
    }

    fn commands(&self) -> &[&str] {
        &["url", "repo"]
    }

    fn sections(&self) -> &[&str] {
        &["packages"]
    }

    fn handle_command(&mut self, name: &str, options: &[String]) -> Result<()> {
        match name {
            "url" => self.parse_url(options),
            "repo" => self.parse_repo(options),
            other => bail!("command {} is not handled by module payload", other),
        }
    }

    fn handle_section(&mut self, name: &str, options: &[String], body: &[String]) -> Result<()> {
        match name {
            "packages" => self.parse_packages(options, body),
            other => bail!("section %{} is not handled by module payload", other),
        }
    }

    fn generate_kickstart(&self) -> String {
        let mut output = String::new();
        if let Some(source) = &self.source {
            output.push_str(&format!("url {}\n", source_option(source, "url")));
        }
        for repo in &self.repos {
            output.push_str(&format!(
                "repo --name={} {}",
                repo.name,
                source_option(&repo.source, "baseurl")
            ));
            if let Some(cost) = repo.cost {
                output.push_str(&format!(" --cost={cost}"));
            }
            if let Some(proxy) = &repo.proxy {
                output.push_str(&format!(" --proxy={proxy}"));
            }
            output.push('\n');
        }
        if let Some(selection) = &self.packages {
            output.push_str("%packages");
            if selection.ignore_missing {
                output.push_str(" --ignoremissing");
            }
            if selection.no_core {
                output.push_str(" --nocore");
            }
            if selection.exclude_docs {
                output.push_str(" --excludedocs");
            }
            output.push('\n');
            if let Some(env) = &selection.environment {
                output.push_str(&format!("@^{env}\n"));
            }
            for group in &selection.groups {
                output.push_str(&format!("@{group}\n"));
            }
            for package in &selection.packages {
                output.push_str(&format!("{package}\n"));
            }
            for group in &selection.excluded_groups {
                output.push_str(&format!("-@{group}\n"));
            }
            for package in &selection.excluded_packages {
                output.push_str(&format!("-{package}\n"));
            }
            output.push_str("%end\n");
        }
        output
    }

    fn reset(&mut self) {
        self.source = None;
        self.repos.clear();
        self.packages = None;
    }
}

fn parse_source(command: &str, opts: &crate::modules::options::ParsedOptions) -> Result<InstallSource> {
    match (
        opts.value("url"),
        opts.value("mirrorlist"),
        opts.value("metalink"),
    ) {
        (Some(url), None, None) => Ok(InstallSource::Url(url.to_string())),
        (None, Some(url), None) => Ok(InstallSource::Mirrorlist(url.to_string())),
        (None, None, Some(url)) => Ok(InstallSource::Metalink(url.to_string())),
        _ => bail!(
            "{} requires exactly one of --url, --mirrorlist, --metalink",
            command
        ),
    }
}

fn source_option(source: &InstallSource, url_name: &str) -> String {
    match source {
        InstallSource::Url(url) => format!("--{url_name}={url}"),
        InstallSource::Mirrorlist(url) => format!("--mirrorlist={url}"),
        InstallSource::Metalink(url) => format!("--metalink={url}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    fn body(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| format!("{s}\n")).collect()
    }

    #[test]
    fn test_url_source() {
        let mut module = PayloadModule::default();
        module
            .handle_command("url", &args(&["--url=http://mirror/os"]))
            .unwrap();
        assert_eq!(
            module.source(),
            Some(&InstallSource::Url("http://mirror/os".to_string()))
        );

        let err = module.handle_command("url", &args(&[])).unwrap_err();
        assert!(err.to_string().contains("exactly one"));

        let err = module
            .handle_command(
                "url",
                &args(&["--url=http://a", "--mirrorlist=http://b"]),
            )
            .unwrap_err();
        assert!(err.to_string().contains("exactly one"));
    }

    #[test]
    fn test_repo() {
        let mut module = PayloadModule::default();
        module
            .handle_command(
                "repo",
                &args(&["--name=extras", "--baseurl=http://mirror/extras", "--cost=50"]),
            )
            .unwrap();
        assert_eq!(module.repos().len(), 1);
        assert_eq!(module.repos()[0].cost, Some(50));

        let err = module
            .handle_command("repo", &args(&["--baseurl=http://mirror/x"]))
            .unwrap_err();
        assert!(err.to_string().contains("requires --name"));

        let err = module
            .handle_command(
                "repo",
                &args(&["--name=extras", "--baseurl=http://mirror/dup"]),
            )
            .unwrap_err();
        assert!(err.to_string().contains("already defined"));
    }

    #[test]
    fn test_packages_section() {
        let mut module = PayloadModule::default();
        module
            .handle_section(
                "packages",
                &args(&["--ignoremissing"]),
                &body(&["@^server", "@core", "vim", "# a comment", "", "-@games", "-nano"]),
            )
            .unwrap();

        let selection = module.packages().unwrap();
        assert_eq!(selection.environment.as_deref(), Some("server"));
        assert_eq!(selection.groups, vec!["core"]);
        assert_eq!(selection.packages, vec!["vim"]);
        assert_eq!(selection.excluded_groups, vec!["games"]);
        assert_eq!(selection.excluded_packages, vec!["nano"]);
        assert!(selection.ignore_missing);
    }

    #[test]
    fn test_generate_round_trip() {
        let mut module = PayloadModule::default();
        module
            .handle_command("url", &args(&["--url=http://mirror/os"]))
            .unwrap();
        module
            .handle_section("packages", &args(&[]), &body(&["@core", "vim", "-nano"]))
            .unwrap();

        let generated = module.generate_kickstart();
        assert_eq!(
            generated,
            "url --url=http://mirror/os\n%packages\n@core\nvim\n-nano\n%end\n"
        );
    }
}
