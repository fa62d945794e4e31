//! Configuration Module
//!
//! Parses command-line flags into an immutable server configuration.

use std::ffi::OsString;

use clap::Parser;
use tracing::info;

/// Command-line flags.
///
/// Flag names keep their historical camel-case spelling so existing
/// deployment scripts keep working.
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Master name tracked by the sentinels
    #[arg(long = "masterName", allow_hyphen_values = true, default_value = "mymaster")]
    pub master_name: String,

    /// Sentinel addresses separated with commas, eg: 10.0.0.1:26379,10.0.0.2:26379
    #[arg(long = "sentinels", allow_hyphen_values = true, default_value = "")]
    pub sentinels: String,

    /// Database index
    #[arg(long = "db", allow_negative_numbers = true, default_value_t = 0)]
    pub db: i64,

    /// Redis password
    #[arg(long = "password", allow_hyphen_values = true, default_value = "")]
    pub password: String,

    /// HTTP server address to listen on, eg: 127.0.0.1:80, :80
    #[arg(long = "addr", allow_hyphen_values = true, default_value = ":80")]
    pub addr: String,

    /// Key search pattern
    #[arg(long = "regex", allow_hyphen_values = true, default_value = "JSABCWeiXin-menuKey*")]
    pub regex: String,

    /// Read/write timeout in seconds
    #[arg(long = "timeOut", default_value_t = 15)]
    pub time_out: u64,
}

impl Cli {
    /// Parses flags, accepting Go-style single-dash long flags (`-addr :80`).
    pub fn try_parse_go_style<I, T>(args: I) -> Result<Self, clap::Error>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString>,
    {
        Self::try_parse_from(normalize_flags(args))
    }
}

/// Flags that take no value.
const SWITCHES: &[&str] = &["help", "version", "h", "V"];

/// Rewrites `-name` into `--name` so clap sees long flags.
///
/// Only tokens in flag position are touched: the token after a flag that
/// takes a value is passed through untouched, so `-password -s3cret` keeps
/// its value. Single-letter short flags and everything after `--` are left
/// alone.
fn normalize_flags<I, T>(args: I) -> Vec<OsString>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString>,
{
    let mut args = args.into_iter().map(Into::into);
    let mut out: Vec<OsString> = args.next().into_iter().collect();

    while let Some(arg) = args.next() {
        let text: Option<String> = arg.to_str().map(str::to_owned);
        let Some(text) = text else {
            out.push(arg);
            continue;
        };
        if text == "--" {
            out.push(arg);
            out.extend(args);
            break;
        }
        let Some(body) = text.strip_prefix('-') else {
            out.push(arg);
            continue;
        };

        let body = body.strip_prefix('-').unwrap_or(body);
        let takes_value = !body.contains('=') && !SWITCHES.contains(&body);
        if body.chars().count() > 1 {
            out.push(OsString::from(format!("--{}", body)));
        } else {
            out.push(arg);
        }

        if takes_value {
            if let Some(value) = args.next() {
                out.push(value);
            }
        }
    }

    out
}

/// Server configuration parameters.
///
/// Built once at startup and shared read-only afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// Master name tracked by the sentinels
    pub master_name: String,
    /// Sentinel `host:port` addresses
    pub sentinels: Vec<String>,
    /// Database index selected on the master
    pub db: i64,
    /// Master password, `None` when empty
    pub password: Option<String>,
    /// HTTP listen address as given on the command line
    pub addr: String,
    /// Glob pattern of keys to purge
    pub pattern: String,
    /// Per-request timeout in seconds
    pub timeout_secs: u64,
}

impl From<Cli> for Config {
    fn from(cli: Cli) -> Self {
        Self {
            master_name: cli.master_name,
            sentinels: split_sentinels(&cli.sentinels),
            db: cli.db,
            password: Some(cli.password).filter(|p| !p.is_empty()),
            addr: cli.addr,
            pattern: cli.regex,
            timeout_secs: cli.time_out,
        }
    }
}

fn split_sentinels(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

impl Config {
    /// Returns the address in a form `TcpListener::bind` accepts.
    ///
    /// A bare `:port` listens on all interfaces.
    pub fn listen_addr(&self) -> String {
        if self.addr.starts_with(':') {
            format!("0.0.0.0{}", self.addr)
        } else {
            self.addr.clone()
        }
    }

    pub fn log_startup(&self) {
        info!(
            "Configuration loaded: master={}, sentinels=[{}], db={}, password={}, addr={}, pattern={}, timeout={}s",
            self.master_name,
            self.sentinels.join(","),
            self.db,
            if self.password.is_some() { "<set>" } else { "<none>" },
            self.addr,
            self.pattern,
            self.timeout_secs
        );
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            master_name: "mymaster".to_string(),
            sentinels: Vec::new(),
            db: 0,
            password: None,
            addr: ":80".to_string(),
            pattern: "JSABCWeiXin-menuKey*".to_string(),
            timeout_secs: 15,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Config {
        let mut argv = vec!["sentinel_purge"];
        argv.extend_from_slice(args);
        Cli::try_parse_go_style(argv).unwrap().into()
    }

    #[test]
    fn test_config_default() {
        let config = Config::default();
        assert_eq!(config.master_name, "mymaster");
        assert!(config.sentinels.is_empty());
        assert_eq!(config.db, 0);
        assert_eq!(config.password, None);
        assert_eq!(config.addr, ":80");
        assert_eq!(config.pattern, "JSABCWeiXin-menuKey*");
        assert_eq!(config.timeout_secs, 15);
    }

    #[test]
    fn test_cli_defaults_match_config_default() {
        assert_eq!(parse(&[]), Config::default());
    }

    #[test]
    fn test_cli_all_flags() {
        let config = parse(&[
            "--masterName",
            "cache",
            "--sentinels",
            "10.0.0.1:26379, 10.0.0.2:26379",
            "--db",
            "3",
            "--password",
            "secret",
            "--addr",
            "127.0.0.1:8080",
            "--regex",
            "session:*",
            "--timeOut",
            "5",
        ]);

        assert_eq!(config.master_name, "cache");
        assert_eq!(config.sentinels, vec!["10.0.0.1:26379", "10.0.0.2:26379"]);
        assert_eq!(config.db, 3);
        assert_eq!(config.password.as_deref(), Some("secret"));
        assert_eq!(config.addr, "127.0.0.1:8080");
        assert_eq!(config.pattern, "session:*");
        assert_eq!(config.timeout_secs, 5);
    }

    #[test]
    fn test_cli_go_style_flags() {
        let config = parse(&["-sentinels", "s1:26379", "-addr=:9000", "-db", "2"]);
        assert_eq!(config.sentinels, vec!["s1:26379"]);
        assert_eq!(config.addr, ":9000");
        assert_eq!(config.db, 2);
    }

    #[test]
    fn test_cli_values_starting_with_hyphen() {
        let config = parse(&["-password", "-s3cret", "-db", "-1", "-regex", "-menu*"]);
        assert_eq!(config.password.as_deref(), Some("-s3cret"));
        assert_eq!(config.db, -1);
        assert_eq!(config.pattern, "-menu*");

        let config = parse(&["--password", "-s3cret", "--addr", ":81"]);
        assert_eq!(config.password.as_deref(), Some("-s3cret"));
        assert_eq!(config.addr, ":81");
    }

    #[test]
    fn test_normalize_only_touches_flag_position() {
        let args: Vec<String> = normalize_flags(["p", "-password", "-s3cret", "-db=2", "-h"])
            .into_iter()
            .map(|a| a.into_string().unwrap())
            .collect();
        assert_eq!(args, vec!["p", "--password", "-s3cret", "--db=2", "-h"]);
    }

    #[test]
    fn test_cli_rejects_bad_number() {
        let result = Cli::try_parse_go_style(["sentinel_purge", "--db", "zero"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_cli_rejects_unknown_flag() {
        let result = Cli::try_parse_go_style(["sentinel_purge", "--verbose"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_empty_sentinel_entries_dropped() {
        assert!(split_sentinels("").is_empty());
        assert_eq!(split_sentinels("a:1,,b:2,"), vec!["a:1", "b:2"]);
    }

    #[test]
    fn test_listen_addr_expands_bare_port() {
        let config = Config::default();
        assert_eq!(config.listen_addr(), "0.0.0.0:80");

        let config = Config {
            addr: "127.0.0.1:8080".to_string(),
            ..Config::default()
        };
        assert_eq!(config.listen_addr(), "127.0.0.1:8080");
    }
}
