//! Users service module: `rootpw` and `user`.

use anyhow::{bail, Context, Result};

use crate::modules::options::OptionParser;
use crate::modules::ServiceModule;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RootPassword {
    pub password: Option<String>,
    pub is_crypted: bool,
    pub locked: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserData {
    pub name: String,
    pub password: Option<String>,
    pub groups: Vec<String>,
    pub home_dir: Option<String>,
    pub shell: Option<String>,
    pub uid: Option<u32>,
    pub gid: Option<u32>,
}

#[derive(Debug, Default)]
pub struct UsersModule {
    root_password: Option<RootPassword>,
    users: Vec<UserData>,
}

impl UsersModule {
    pub fn root_password(&self) -> Option<&RootPassword> {
        self.root_password.as_ref()
    }

    pub fn users(&self) -> &[UserData] {
        &self.users
    }

    fn parse_rootpw(&mut self, options: &[String]) -> Result<()> {
        let opts = OptionParser::new("rootpw")
            .flag("plaintext")
            .flag("iscrypted")
            .flag("lock")
            .parse(options)?;

        if opts.flag("plaintext") && opts.flag("iscrypted") {
            bail!("rootpw cannot be both --plaintext and --iscrypted");
        }

        let password = match opts.positional() {
            [] => None,
            [one] => Some(one.clone()),
            _ => bail!("command rootpw takes a single password argument"),
        };
        if password.is_none() && !opts.flag("lock") {
            bail!("rootpw requires a password unless --lock is given");
        }

        self.root_password = Some(RootPassword {
            password,
            is_crypted: opts.flag("iscrypted"),
            locked: opts.flag("lock"),
        });
        Ok(())
    }

    fn parse_user(&mut self, options: &[String]) -> Result<()> {
        let opts = OptionParser::new("user")
            .value("name")
            .value("password")
            .value("groups")
            .value("homedir")
            .value("shell")
            .value("uid")
            .value("gid")
            .parse(options)?;

        let Some(name) = opts.value("name") else {
            bail!("user requires --name");
        };
        if self.users.iter().any(|u| u.name == name) {
            bail!("user '{}' is already defined", name);
        }

        let parse_id = |option: &str| -> Result<Option<u32>> {
            opts.value(option)
                .map(|v| {
                    v.parse::<u32>()
                        .with_context(|| format!("invalid --{option} '{v}'"))
                })
                .transpose()
        };

        self.users.push(UserData {
            name: name.to_string(),
            password: opts.value("password").map(str::to_string),
            groups: opts
                .value("groups")
                .map(|v| v.split(',').map(str::to_string).collect())
                .unwrap_or_default(),
            home_dir: opts.value("homedir").map(str::to_string),
            shell: opts.value("shell").map(str::to_string),
            uid: parse_id("uid")?,
            gid: parse_id("gid")?,
        });
        Ok(())
    }
}

impl ServiceModule for UsersModule {
    fn name(&self) -> &str {
        "users"
    }

    fn commands(&self) -> &[&str] {
        &["rootpw", "user"]
    }

    fn handle_command(&mut self, name: &str, options: &[String]) -> Result<()> {
        match name {
            "rootpw" => self.parse_rootpw(options),
            "user" => self.parse_user(options),
            other => bail!("command {} is not handled by module users", other),
        }
    }

    fn generate_kickstart(&self) -> String {
        let mut output = String::new();
        if let Some(root) = &self.root_password {
            output.push_str("rootpw");
            if root.is_crypted {
                output.push_str(" --iscrypted");
            }
            if root.locked {
                output.push_str(" --lock");
            }
            if let Some(password) = &root.password {
                output.push_str(&format!(" {password}"));
            }
            output.push('\n');
        }
        for user in &self.users {
            output.push_str(&format!("user --name={}", user.name));
            if let Some(password) = &user.password {
                output.push_str(&format!(" --password={password}"));
            }
            if !user.groups.is_empty() {
                output.push_str(&format!(" --groups={}", user.groups.join(",")));
            }
            if let Some(home) = &user.home_dir {
                output.push_str(&format!(" --homedir={home}"));
            }
            if let Some(shell) = &user.shell {
                output.push_str(&format!(" --shell={shell}"));
            }
            if let Some(uid) = user.uid {
                output.push_str(&format!(" --uid={uid}"));
            }
            if let Some(gid) = user.gid {
                output.push_str(&format!(" --gid={gid}"));
            }
            output.push('\n');
        }
        output
    }

    fn reset(&mut self) {
        self.root_password = None;
        self.users.clear();
    }
}
