// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Server configuration.
//!
//! `pqd.conf` carries the scheduler knobs and `<Location>` access blocks;
//! `pq-files.conf` carries paths and the unprivileged identity. Unknown
//! directives warn and are skipped so configs survive version skew.

pub mod directives;

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use thiserror::Error;
use tracing::warn;

use crate::access::{AuthType, LocationRule, Mask, Method, MethodMask, Order, Satisfy};
use directives::{Item, ParseError};

/// Where a listener binds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListenAddr {
    Tcp(SocketAddr),
    Unix(PathBuf),
}

/// One configured listener.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListenSpec {
    pub addr: ListenAddr,
    /// TLS expected on this listener
    pub secure: bool,
    /// Supplied by the service supervisor rather than opened by us
    pub on_demand: bool,
}

/// Log verbosity, in increasing order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub enum LogLevel {
    None,
    Emerg,
    Alert,
    Crit,
    Error,
    Warn,
    Notice,
    #[default]
    Info,
    Debug,
    Debug2,
}

impl LogLevel {
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "none" => Some(LogLevel::None),
            "emerg" => Some(LogLevel::Emerg),
            "alert" => Some(LogLevel::Alert),
            "crit" => Some(LogLevel::Crit),
            "error" => Some(LogLevel::Error),
            "warn" | "warning" => Some(LogLevel::Warn),
            "notice" => Some(LogLevel::Notice),
            "info" => Some(LogLevel::Info),
            "debug" => Some(LogLevel::Debug),
            "debug2" => Some(LogLevel::Debug2),
            _ => None,
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error("{file}:{line}: bad value for {directive}: {value}")]
    BadValue {
        directive: String,
        value: String,
        file: PathBuf,
        line: usize,
    },
}

/// All scheduler knobs.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    // Paths
    pub server_root: PathBuf,
    pub request_root: PathBuf,
    pub temp_dir: PathBuf,
    pub data_dir: PathBuf,
    pub server_bin: PathBuf,
    pub cache_dir: PathBuf,
    pub state_dir: PathBuf,
    pub doc_root: PathBuf,
    pub banner_dir: PathBuf,
    pub error_log: PathBuf,
    pub font_path: String,

    // Identity
    pub user: Option<String>,
    pub group: Option<String>,
    pub system_group: String,
    pub server_admin: String,
    pub default_language: String,
    pub default_charset: String,

    // Listeners
    pub listeners: Vec<ListenSpec>,

    // Limits and timers
    pub max_clients: usize,
    pub max_jobs: usize,
    pub max_jobs_per_user: usize,
    pub max_jobs_per_printer: usize,
    pub filter_limit: u32,
    pub filter_nice: i32,
    pub timeout: Duration,
    pub reload_timeout: Duration,
    pub job_kill_delay: Duration,
    pub max_job_time: Duration,
    pub browse_interval: Duration,
    pub browse_timeout: Duration,
    pub browsing: bool,
    pub dirty_clean_interval: Duration,
    pub job_retention: Duration,
    pub preserve_job_files: bool,

    pub log_level: LogLevel,
    pub hostname_lookups: bool,
    pub default_job_sheets: (String, String),

    /// `<Location>` access rules; a permissive root rule is appended when
    /// the config defines none.
    pub locations: Vec<LocationRule>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        let server_root = PathBuf::from("/etc/printq");
        let request_root = PathBuf::from("/var/spool/printq");
        let data_dir = PathBuf::from("/usr/share/printq");
        Self {
            temp_dir: request_root.join("tmp"),
            banner_dir: data_dir.join("banners"),
            error_log: PathBuf::from("/var/log/printq/error_log"),
            server_root,
            request_root,
            data_dir,
            server_bin: PathBuf::from("/usr/lib/printq"),
            cache_dir: PathBuf::from("/var/cache/printq"),
            state_dir: PathBuf::from("/run/printq"),
            doc_root: PathBuf::from("/usr/share/doc/printq"),
            font_path: String::new(),
            user: None,
            group: None,
            system_group: "pqadmin".to_string(),
            server_admin: "root@localhost".to_string(),
            default_language: "en".to_string(),
            default_charset: "utf-8".to_string(),
            listeners: Vec::new(),
            max_clients: 100,
            max_jobs: 500,
            max_jobs_per_user: 0,
            max_jobs_per_printer: 0,
            filter_limit: 0,
            filter_nice: 0,
            timeout: Duration::from_secs(300),
            reload_timeout: Duration::from_secs(60),
            job_kill_delay: Duration::from_secs(5),
            max_job_time: Duration::from_secs(3 * 3600),
            browse_interval: Duration::from_secs(30),
            browse_timeout: Duration::from_secs(300),
            browsing: false,
            dirty_clean_interval: Duration::from_secs(30),
            job_retention: Duration::from_secs(86_400),
            preserve_job_files: false,
            log_level: LogLevel::Info,
            hostname_lookups: false,
            default_job_sheets: ("none".to_string(), "none".to_string()),
            locations: Vec::new(),
        }
    }
}

impl ServerConfig {
    /// Load `pqd.conf`, then overlay `pq-files.conf` when present.
    pub fn load(conf: &Path, files_conf: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = ServerConfig::default();
        config.apply_items(&directives::parse_file(conf)?)?;
        if let Some(files) = files_conf {
            config.apply_items(&directives::parse_file(files)?)?;
        }
        config.finish();
        Ok(config)
    }

    /// Parse directive text (tests and `-t` validation).
    pub fn from_text(text: &str, file: &Path) -> Result<Self, ConfigError> {
        let mut config = ServerConfig::default();
        config.apply_items(&directives::parse_text(text, file)?)?;
        config.finish();
        Ok(config)
    }

    /// Fill derived defaults after all files are applied.
    fn finish(&mut self) {
        if self.locations.is_empty() {
            self.locations.push(LocationRule::new("/"));
        }
        if self.listeners.is_empty() {
            self.listeners.push(ListenSpec {
                addr: ListenAddr::Tcp(SocketAddr::from(([127, 0, 0, 1], 631))),
                secure: false,
                on_demand: false,
            });
        }
    }

    fn apply_items(&mut self, items: &[Item]) -> Result<(), ConfigError> {
        for item in items {
            match item {
                Item::Directive { name, value, file, line } => {
                    self.apply_directive(name, value, file, *line)?;
                }
                Item::Block { name, arg, items, file, line } => {
                    if name.eq_ignore_ascii_case("Location") {
                        let rule = parse_location(arg, items, file, *line)?;
                        // A later block for the same path replaces the earlier one
                        self.locations.retain(|r| r.path != rule.path);
                        self.locations.push(rule);
                    } else {
                        warn!(block = %name, file = %file.display(), line, "unknown block; skipping");
                    }
                }
            }
        }
        Ok(())
    }

    fn apply_directive(
        &mut self,
        name: &str,
        value: &str,
        file: &Path,
        line: usize,
    ) -> Result<(), ConfigError> {
        let bad = || ConfigError::BadValue {
            directive: name.to_string(),
            value: value.to_string(),
            file: file.to_path_buf(),
            line,
        };

        match name.to_ascii_lowercase().as_str() {
            "serverroot" => self.server_root = value.into(),
            "requestroot" => {
                self.request_root = value.into();
                self.temp_dir = self.request_root.join("tmp");
            }
            "tempdir" => self.temp_dir = value.into(),
            "datadir" => {
                self.data_dir = value.into();
                self.banner_dir = self.data_dir.join("banners");
            }
            "serverbin" => self.server_bin = value.into(),
            "cachedir" => self.cache_dir = value.into(),
            "statedir" => self.state_dir = value.into(),
            "documentroot" => self.doc_root = value.into(),
            "bannerdir" => self.banner_dir = value.into(),
            "errorlog" => self.error_log = value.into(),
            "fontpath" => self.font_path = value.to_string(),
            "user" => self.user = Some(value.to_string()),
            "group" => self.group = Some(value.to_string()),
            "systemgroup" => self.system_group = value.to_string(),
            "serveradmin" => self.server_admin = value.to_string(),
            "defaultlanguage" => self.default_language = value.to_string(),
            "defaultcharset" => self.default_charset = value.to_string(),
            "port" => {
                let port: u16 = value.parse().map_err(|_| bad())?;
                self.listeners.push(ListenSpec {
                    addr: ListenAddr::Tcp(SocketAddr::from(([0, 0, 0, 0], port))),
                    secure: false,
                    on_demand: false,
                });
            }
            "listen" => {
                self.listeners.push(parse_listen(value, false).ok_or_else(bad)?);
            }
            "ssllisten" => {
                self.listeners.push(parse_listen(value, true).ok_or_else(bad)?);
            }
            "maxclients" => self.max_clients = value.parse().map_err(|_| bad())?,
            "maxjobs" => self.max_jobs = value.parse().map_err(|_| bad())?,
            "maxjobsperuser" => self.max_jobs_per_user = value.parse().map_err(|_| bad())?,
            "maxjobsperprinter" => {
                self.max_jobs_per_printer = value.parse().map_err(|_| bad())?
            }
            "filterlimit" => self.filter_limit = value.parse().map_err(|_| bad())?,
            "filternice" => self.filter_nice = value.parse().map_err(|_| bad())?,
            "timeout" => self.timeout = parse_secs(value).ok_or_else(bad)?,
            "reloadtimeout" => self.reload_timeout = parse_secs(value).ok_or_else(bad)?,
            "jobkilldelay" => self.job_kill_delay = parse_secs(value).ok_or_else(bad)?,
            "maxjobtime" => self.max_job_time = parse_secs(value).ok_or_else(bad)?,
            "browseinterval" => self.browse_interval = parse_secs(value).ok_or_else(bad)?,
            "browsetimeout" => self.browse_timeout = parse_secs(value).ok_or_else(bad)?,
            "browsing" => self.browsing = parse_bool(value).ok_or_else(bad)?,
            "dirtycleaninterval" => {
                self.dirty_clean_interval = parse_secs(value).ok_or_else(bad)?
            }
            "jobretention" => self.job_retention = parse_secs(value).ok_or_else(bad)?,
            "preservejobfiles" => self.preserve_job_files = parse_bool(value).ok_or_else(bad)?,
            "loglevel" => self.log_level = LogLevel::parse(value).ok_or_else(bad)?,
            "hostnamelookups" => self.hostname_lookups = parse_bool(value).ok_or_else(bad)?,
            "defaultjobsheets" => {
                let mut parts = value.split_whitespace();
                let start = parts.next().unwrap_or("none").to_string();
                let end = parts.next().unwrap_or("none").to_string();
                self.default_job_sheets = (start, end);
            }
            _ => {
                warn!(directive = %name, file = %file.display(), line, "unknown directive; skipping");
            }
        }
        Ok(())
    }
}

fn parse_secs(value: &str) -> Option<Duration> {
    value.parse::<u64>().ok().map(Duration::from_secs)
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.to_ascii_lowercase().as_str() {
        "yes" | "on" | "true" | "1" | "" => Some(true),
        "no" | "off" | "false" | "0" => Some(false),
        _ => None,
    }
}

fn parse_listen(value: &str, secure: bool) -> Option<ListenSpec> {
    if value.starts_with('/') {
        return Some(ListenSpec {
            addr: ListenAddr::Unix(value.into()),
            secure,
            on_demand: false,
        });
    }
    let addr = if let Ok(sa) = value.parse::<SocketAddr>() {
        sa
    } else {
        // Bare port, or *:port for all interfaces
        let (host, port) = value.rsplit_once(':').unwrap_or(("*", value));
        let port: u16 = port.parse().ok()?;
        match host {
            "*" => SocketAddr::from(([0, 0, 0, 0], port)),
            _ => return None,
        }
    };
    Some(ListenSpec {
        addr: ListenAddr::Tcp(addr),
        secure,
        on_demand: false,
    })
}

fn parse_location(
    arg: &str,
    items: &[Item],
    file: &Path,
    line: usize,
) -> Result<LocationRule, ConfigError> {
    if arg.is_empty() {
        return Err(ConfigError::BadValue {
            directive: "Location".to_string(),
            value: arg.to_string(),
            file: file.to_path_buf(),
            line,
        });
    }
    let mut rule = LocationRule::new(arg);
    apply_location_items(&mut rule, items)?;
    Ok(rule)
}

fn apply_location_items(rule: &mut LocationRule, items: &[Item]) -> Result<(), ConfigError> {
    for item in items {
        match item {
            Item::Directive { name, value, file, line } => {
                apply_location_directive(rule, name, value, file, *line)?;
            }
            Item::Block { name, arg, items, file, line } => {
                if name.eq_ignore_ascii_case("Limit") {
                    let methods: Vec<Method> =
                        arg.split_whitespace().filter_map(Method::parse).collect();
                    if methods.is_empty() {
                        return Err(ConfigError::BadValue {
                            directive: "Limit".to_string(),
                            value: arg.to_string(),
                            file: file.to_path_buf(),
                            line: *line,
                        });
                    }
                    rule.methods = methods.into_iter().collect::<MethodMask>();
                    apply_location_items(rule, items)?;
                } else {
                    warn!(block = %name, "unknown block inside Location; skipping");
                }
            }
        }
    }
    Ok(())
}

fn apply_location_directive(
    rule: &mut LocationRule,
    name: &str,
    value: &str,
    file: &Path,
    line: usize,
) -> Result<(), ConfigError> {
    let bad = || ConfigError::BadValue {
        directive: name.to_string(),
        value: value.to_string(),
        file: file.to_path_buf(),
        line,
    };

    match name.to_ascii_lowercase().as_str() {
        "authtype" => {
            rule.auth_type = match value.to_ascii_lowercase().as_str() {
                "none" => AuthType::None,
                "basic" => AuthType::Basic,
                "digest" => AuthType::Digest,
                "basicdigest" => AuthType::BasicDigest,
                "negotiate" => AuthType::Negotiate,
                _ => return Err(bad()),
            };
        }
        "require" => {
            let mut parts = value.split_whitespace();
            match parts.next() {
                Some("valid-user") => rule.require_valid_user = true,
                Some("group") => {
                    rule.require_groups.extend(parts.map(|g| g.to_string()));
                }
                Some("user") => {
                    // `Require user @SYSTEM` style is modeled as a group
                    rule.require_groups
                        .extend(parts.map(|g| g.trim_start_matches('@').to_string()));
                }
                _ => return Err(bad()),
            }
        }
        "encryption" => {
            rule.encryption = match value.to_ascii_lowercase().as_str() {
                "always" | "required" => true,
                "never" | "ifrequested" => false,
                _ => return Err(bad()),
            };
        }
        "order" => {
            rule.order = match value.to_ascii_lowercase().replace(' ', "").as_str() {
                "deny,allow" => Order::DenyAllow,
                "allow,deny" => Order::AllowDeny,
                _ => return Err(bad()),
            };
        }
        "allow" => {
            for word in mask_words(value) {
                rule.allow.push(word.parse::<Mask>().map_err(|_| bad())?);
            }
        }
        "deny" => {
            for word in mask_words(value) {
                rule.deny.push(word.parse::<Mask>().map_err(|_| bad())?);
            }
        }
        "satisfy" => {
            rule.satisfy = match value.to_ascii_lowercase().as_str() {
                "all" => Satisfy::All,
                "any" => Satisfy::Any,
                _ => return Err(bad()),
            };
        }
        _ => {
            warn!(directive = %name, "unknown Location directive; skipping");
        }
    }
    Ok(())
}

/// Strip the optional `from` keyword of Allow/Deny lines.
fn mask_words(value: &str) -> impl Iterator<Item = &str> {
    value
        .split_whitespace()
        .filter(|w| !w.eq_ignore_ascii_case("from"))
}

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;
