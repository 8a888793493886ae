use log::{debug, warn};
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

use crate::cli::{Args, ExportFormat};

/// How hop addresses are resolved to locations.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ResolveMode {
    /// One lookup at a time with a fixed delay before each request.
    Sequential { delay: Duration },
    /// A fixed-width worker pool; no rate limiting beyond pool width.
    Concurrent { workers: usize },
}

/// Runtime configuration, built once at startup from CLI arguments merged
/// with an optional JSON config file, then passed by reference through the
/// pipeline. There is no ambient configuration state.
#[derive(Debug, Clone)]
pub struct Config {
    /// Target host to trace
    pub target: String,
    /// Whole-run traceroute timeout
    pub timeout: Duration,
    /// Maximum hop count passed to traceroute
    pub max_hops: u8,
    /// Output file for the rendered artifact
    pub output: PathBuf,
    /// Export format
    pub format: ExportFormat,
    /// Resolve hop locations concurrently
    pub parallel: bool,
    /// Worker count for parallel resolution
    pub workers: usize,
    /// Delay before each sequential geolocation request
    pub rate_limit_delay: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            target: "github.com".to_string(),
            timeout: Duration::from_secs(30),
            max_hops: 15,
            output: PathBuf::from("route_map.html"),
            format: ExportFormat::Html,
            parallel: false,
            workers: 5,
            rate_limit_delay: Duration::from_millis(100),
        }
    }
}

/// On-disk configuration file. Only knobs the CLI can leave unset appear
/// here; flags with built-in defaults always carry a value, so the file
/// could never win for them. Unknown keys are ignored.
#[derive(Debug, Default, Deserialize)]
pub struct ConfigFile {
    pub default_target: Option<String>,
    pub rate_limit_delay: Option<f64>,
    pub max_workers: Option<usize>,
}

impl ConfigFile {
    /// Load from an explicit path, or from the default location
    /// (`<config dir>/georoute/config.json`) when none is given.
    ///
    /// A missing file is not an error; an unreadable or malformed one is
    /// reported and ignored, matching the tolerant config contract.
    pub fn load(explicit: Option<&str>) -> Self {
        let path = match explicit {
            Some(p) => PathBuf::from(p),
            None => {
                let Some(dir) = dirs::config_dir() else {
                    return Self::default();
                };
                dir.join("georoute").join("config.json")
            }
        };

        if !path.exists() {
            if explicit.is_some() {
                warn!("Config file not found: {}", path.display());
            }
            return Self::default();
        }

        match std::fs::read_to_string(&path) {
            Ok(data) => match serde_json::from_str(&data) {
                Ok(file) => {
                    debug!("Loaded config from {}", path.display());
                    file
                }
                Err(e) => {
                    warn!("Could not parse config file {}: {}", path.display(), e);
                    Self::default()
                }
            },
            Err(e) => {
                warn!("Could not read config file {}: {}", path.display(), e);
                Self::default()
            }
        }
    }
}

impl Config {
    /// Merge CLI arguments over the config file over built-in defaults.
    /// CLI values win where the flag was given; knobs the CLI leaves unset
    /// (`--workers`, `--rate-limit`, target) fall back to the file.
    pub fn resolve(args: &Args, file: &ConfigFile) -> Self {
        let defaults = Config::default();

        let target = args
            .target
            .clone()
            .or_else(|| file.default_target.clone())
            .unwrap_or(defaults.target);

        let workers = args
            .workers
            .or(file.max_workers)
            .unwrap_or(defaults.workers);

        let rate_limit_delay = args
            .rate_limit
            .map(Duration::from_secs_f64)
            .or_else(|| file.rate_limit_delay.map(Duration::from_secs_f64))
            .unwrap_or(defaults.rate_limit_delay);

        Self {
            target,
            timeout: args.timeout_duration(),
            max_hops: args.max_hops,
            output: PathBuf::from(&args.output),
            format: args.format,
            parallel: args.parallel,
            workers,
            rate_limit_delay,
        }
    }

    /// Resolution mode derived from the parallel flag and its knobs
    pub fn resolve_mode(&self) -> ResolveMode {
        if self.parallel {
            ResolveMode::Concurrent {
                workers: self.workers,
            }
        } else {
            ResolveMode::Sequential {
                delay: self.rate_limit_delay,
            }
        }
    }
}
