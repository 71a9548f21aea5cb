use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;

use crate::core_cli::Cli;
use crate::users::{parse_user_spec, User};

/// Complete application configuration. The protocol engines consume this as
/// an immutable, validated value; nothing below the loader reads files or
/// environment variables.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Host directory all user data lives under.
    pub data: String,
    pub users: HashMap<String, User>,
    pub services: ServicesConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ServicesConfig {
    pub ftp: FtpConfig,
    pub tftp: TftpConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FtpConfig {
    pub enabled: bool,
    pub port: u16,
    pub pasv_min_port: u16,
    pub pasv_max_port: u16,
    /// IPv4 address advertised in PASV replies. When unset the address is
    /// derived from the control socket, falling back to 127.0.0.1.
    pub advertised_host: Option<String>,
}

impl Default for FtpConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            port: 21,
            pasv_min_port: 2122,
            pasv_max_port: 2132,
            advertised_host: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TftpConfig {
    pub enabled: bool,
    pub port: u16,
    /// Account all TFTP transfers run as. When unset the server falls back
    /// to the alphabetically first configured user and warns the operator.
    pub user: Option<String>,
}

impl Default for TftpConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            port: 69,
            user: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// One of debug, info, warn, error.
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data: "./data".to_string(),
            users: HashMap::new(),
            services: ServicesConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Config {
    /// Loads configuration from a TOML file. A missing path (or a path that
    /// does not exist) yields the defaults; CLI flags fill in the rest.
    pub fn load(path: Option<&str>) -> Result<Config> {
        let path = match path {
            Some(p) => p,
            None => return Ok(Config::default()),
        };

        let config_str = match fs::read_to_string(path) {
            Ok(s) => s,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Ok(Config::default());
            }
            Err(e) => {
                return Err(e)
                    .with_context(|| format!("Failed to read configuration file: {}", path));
            }
        };

        toml::from_str(&config_str)
            .with_context(|| format!("Failed to parse configuration file: {}", path))
    }

    /// Applies CLI overrides on top of the file configuration.
    pub fn apply_cli(&mut self, args: &Cli) -> Result<()> {
        if let Some(data) = &args.data {
            self.data = data.clone();
        }

        if let Some(spec) = &args.user {
            // CLI users replace the file-configured map outright.
            self.users = parse_user_spec(spec)?;
        }

        if args.ftp {
            self.services.ftp.enabled = true;
        }
        if let Some(port) = args.ftp_port {
            self.services.ftp.port = port;
        }

        if args.tftp {
            self.services.tftp.enabled = true;
        }
        if let Some(port) = args.tftp_port {
            self.services.tftp.port = port;
        }
        if let Some(user) = &args.tftp_user {
            self.services.tftp.user = Some(user.clone());
        }

        if let Some(level) = &args.log_level {
            self.logging.level = level.clone();
        }

        Ok(())
    }

    /// Validates the configuration and prepares the data tree: the data root
    /// and every user's home sub-tree are created if missing. Also stamps
    /// each user record with its map key.
    pub fn validate(&mut self) -> Result<()> {
        if self.data.is_empty() {
            bail!("data directory cannot be empty");
        }

        fs::create_dir_all(&self.data)
            .with_context(|| format!("failed to create data directory {}", self.data))?;

        if self.users.is_empty() {
            bail!("at least one user must be configured");
        }

        for (name, user) in self.users.iter_mut() {
            if name.is_empty() {
                bail!("username cannot be empty");
            }
            if user.pass.is_empty() {
                bail!("password cannot be empty for user {}", name);
            }
            if user.permissions != "ro" && user.permissions != "rw" {
                bail!(
                    "invalid permissions '{}' for user {}, must be 'ro' or 'rw'",
                    user.permissions,
                    name
                );
            }

            user.name = name.clone();
            if user.path.is_empty() {
                user.path = "/".to_string();
            } else if !user.path.starts_with('/') {
                user.path = format!("/{}", user.path);
            }

            let home = PathBuf::from(&self.data).join(user.path.trim_start_matches('/'));
            fs::create_dir_all(&home)
                .with_context(|| format!("failed to create home directory for user {}", name))?;
        }

        if !self.services.ftp.enabled && !self.services.tftp.enabled {
            bail!("at least one service must be enabled");
        }

        if self.services.ftp.pasv_min_port > self.services.ftp.pasv_max_port {
            bail!(
                "invalid passive port range {}-{}",
                self.services.ftp.pasv_min_port,
                self.services.ftp.pasv_max_port
            );
        }

        if let Some(tftp_user) = &self.services.tftp.user {
            if !self.users.contains_key(tftp_user) {
                bail!("tftp user '{}' is not a configured user", tftp_user);
            }
        }

        match self.logging.level.as_str() {
            "debug" | "info" | "warn" | "error" => {}
            other => bail!(
                "invalid log level '{}', must be one of: debug, info, warn, error",
                other
            ),
        }

        Ok(())
    }
}
