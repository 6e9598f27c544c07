/// Runtime configuration.
///
/// Layers, later wins: built-in defaults, JSON file named by `FANFETCH_CONFIG`,
/// environment variables (a `.env` file is loaded by `main`), command line.
use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::Parser;
use serde::Deserialize;
use tracing::{info, warn};

use fanfetch_shared::errors::{FanfetchError, FanfetchResult};

/// URLs fetched when nothing else is configured.
pub const DEFAULT_URLS: &[&str] = &[
    "https://golang.org",
    "https://example.com",
    "https://httpbin.org/delay/2",
];

pub const DEFAULT_TIMEOUT_SECS: u64 = 10;

/// Command-line layer. Unset options leave the file/env values alone.
#[derive(Debug, Default, Parser)]
#[command(name = "fanfetch")]
#[command(about = "Fetch URLs concurrently under one shared deadline", long_about = None)]
pub struct Args {
    /// URLs to fetch, replacing the configured list
    pub urls: Vec<String>,

    /// Shared deadline in seconds
    #[arg(long)]
    pub timeout: Option<u64>,

    /// Directory for downloaded files
    #[arg(long)]
    pub output_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Config {
    pub urls: Vec<String>,
    /// Shared deadline for the whole run.
    pub timeout_secs: u64,
    pub output_dir: PathBuf,
    pub file_prefix: String,
    pub file_extension: String,
    /// Write non-2xx bodies to disk instead of reporting them as errors.
    pub accept_error_status: bool,
    pub user_agent: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            urls: DEFAULT_URLS.iter().map(|u| u.to_string()).collect(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            output_dir: PathBuf::from("."),
            file_prefix: "file".to_string(),
            file_extension: "html".to_string(),
            accept_error_status: false,
            user_agent: format!("fanfetch/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

impl Config {
    /// Build the configuration from every layer.
    pub fn load(args: Args) -> FanfetchResult<Self> {
        let mut config = match std::env::var("FANFETCH_CONFIG") {
            Ok(path) => Self::from_file(&path)?,
            Err(_) => Self::default(),
        };
        config.apply_env(|key| std::env::var(key).ok());
        config.apply_args(args);
        config.validate()?;

        info!(
            "Config: {} url(s), timeout {}s, output dir {}",
            config.urls.len(),
            config.timeout_secs,
            config.output_dir.display()
        );
        Ok(config)
    }

    /// Read a JSON config file. Missing keys keep their defaults.
    pub fn from_file(path: impl AsRef<Path>) -> FanfetchResult<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| {
            FanfetchError::Config(format!("cannot read {}: {}", path.display(), e))
        })?;
        let config = serde_json::from_str(&raw)?;
        info!("Loaded config file {}", path.display());
        Ok(config)
    }

    /// Apply `FANFETCH_*` overrides. `lookup` abstracts the environment.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(urls) = lookup("FANFETCH_URLS") {
            self.urls = split_urls(&urls);
        }
        if let Some(raw) = lookup("FANFETCH_TIMEOUT_SECS") {
            match raw.trim().parse() {
                Ok(secs) => self.timeout_secs = secs,
                Err(_) => warn!(
                    "Ignoring FANFETCH_TIMEOUT_SECS={:?}, keeping {}s",
                    raw, self.timeout_secs
                ),
            }
        }
        if let Some(dir) = lookup("FANFETCH_OUTPUT_DIR") {
            self.output_dir = PathBuf::from(dir);
        }
        if let Some(prefix) = lookup("FANFETCH_FILE_PREFIX") {
            self.file_prefix = prefix;
        }
        if let Some(ext) = lookup("FANFETCH_FILE_EXTENSION") {
            self.file_extension = ext.trim_start_matches('.').to_string();
        }
        if let Some(raw) = lookup("FANFETCH_ACCEPT_ERROR_STATUS") {
            match parse_bool(&raw) {
                Some(v) => self.accept_error_status = v,
                None => warn!("Ignoring FANFETCH_ACCEPT_ERROR_STATUS={:?}", raw),
            }
        }
        if let Some(agent) = lookup("FANFETCH_USER_AGENT") {
            self.user_agent = agent;
        }
    }

    /// Overlay command-line arguments: positional URLs replace the list,
    /// flags override single values.
    pub fn apply_args(&mut self, args: Args) {
        if !args.urls.is_empty() {
            self.urls = args.urls;
        }
        if let Some(secs) = args.timeout {
            self.timeout_secs = secs;
        }
        if let Some(dir) = args.output_dir {
            self.output_dir = dir;
        }
    }

    pub fn validate(&self) -> FanfetchResult<()> {
        if self.timeout_secs == 0 {
            return Err(FanfetchError::Config("timeout must be at least 1 second".into()));
        }
        if self.file_prefix.is_empty() {
            return Err(FanfetchError::Config("file prefix must not be empty".into()));
        }
        Ok(())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

fn split_urls(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|u| !u.is_empty())
        .map(String::from)
        .collect()
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_defaults_match_reference_run() {
        let config = Config::default();
        assert_eq!(config.urls.len(), 3);
        assert_eq!(config.timeout(), Duration::from_secs(10));
        assert_eq!(config.file_prefix, "file");
        assert_eq!(config.file_extension, "html");
        assert!(!config.accept_error_status);
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = HashMap::from([
            ("FANFETCH_URLS", " https://a.test, ,https://b.test "),
            ("FANFETCH_TIMEOUT_SECS", "3"),
            ("FANFETCH_FILE_EXTENSION", ".bin"),
            ("FANFETCH_ACCEPT_ERROR_STATUS", "yes"),
        ]);
        let mut config = Config::default();
        config.apply_env(|k| env.get(k).map(|v| v.to_string()));

        assert_eq!(config.urls, vec!["https://a.test", "https://b.test"]);
        assert_eq!(config.timeout_secs, 3);
        assert_eq!(config.file_extension, "bin");
        assert!(config.accept_error_status);
    }

    #[test]
    fn test_bad_env_values_keep_current() {
        let mut config = Config::default();
        config.apply_env(|k| match k {
            "FANFETCH_TIMEOUT_SECS" => Some("soon".to_string()),
            "FANFETCH_ACCEPT_ERROR_STATUS" => Some("maybe".to_string()),
            _ => None,
        });
        assert_eq!(config.timeout_secs, DEFAULT_TIMEOUT_SECS);
        assert!(!config.accept_error_status);
    }

    #[test]
    fn test_args_replace_urls_and_flags() {
        let args = Args::try_parse_from(args(&[
            "fanfetch", "--timeout", "2", "https://x.test", "--output-dir", "out",
        ]))
        .unwrap();
        let mut config = Config::default();
        config.apply_args(args);
        assert_eq!(config.urls, vec!["https://x.test"]);
        assert_eq!(config.timeout_secs, 2);
        assert_eq!(config.output_dir, PathBuf::from("out"));
    }

    #[test]
    fn test_args_without_urls_keep_list() {
        let args = Args::try_parse_from(args(&["fanfetch", "--timeout", "5"])).unwrap();
        let mut config = Config::default();
        config.apply_args(args);
        assert_eq!(config.urls.len(), DEFAULT_URLS.len());
        assert_eq!(config.output_dir, PathBuf::from("."));
    }

    #[test]
    fn test_unknown_flag_rejected() {
        let err = Args::try_parse_from(args(&["fanfetch", "--retries", "3"])).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::UnknownArgument);
    }

    #[test]
    fn test_flag_without_value_rejected() {
        let err = Args::try_parse_from(args(&["fanfetch", "--timeout"])).unwrap_err();
        assert!(err.to_string().contains("--timeout"), "{}", err);

        let err = Args::try_parse_from(args(&["fanfetch", "--timeout", "soon"])).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::ValueValidation);
    }

    #[test]
    fn test_zero_timeout_invalid() {
        let config = Config {
            timeout_secs: 0,
            ..Config::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_from_file_partial() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("fanfetch.json");
        std::fs::write(&path, r#"{"urls":["https://only.test"],"timeout_secs":4}"#).unwrap();

        let config = Config::from_file(&path).unwrap();
        assert_eq!(config.urls, vec!["https://only.test"]);
        assert_eq!(config.timeout_secs, 4);
        assert_eq!(config.file_prefix, "file");
    }

    #[test]
    fn test_from_missing_file() {
        let err = Config::from_file("/definitely/not/here.json").unwrap_err();
        assert!(matches!(err, FanfetchError::Config(_)));
    }
}
