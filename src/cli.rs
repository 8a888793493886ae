use clap::Parser;
use std::time::Duration;

/// Trace the network path to a host, geolocate every hop, and render the
/// route as an interactive map
#[derive(Parser, Debug, Clone)]
#[command(name = "georoute")]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Target host to trace (hostname or IPv4 address)
    pub target: Option<String>,

    /// Traceroute timeout in seconds
    #[arg(short = 't', long = "timeout", default_value = "30")]
    pub timeout: u64,

    /// Maximum hop count passed to traceroute
    #[arg(short = 'm', long = "max-hops", default_value = "15")]
    pub max_hops: u8,

    /// Output file for the rendered artifact
    #[arg(short = 'o', long = "output", default_value = "route_map.html")]
    pub output: String,

    /// Export format
    #[arg(long = "format", value_enum, default_value = "html")]
    pub format: ExportFormat,

    /// Resolve hop locations concurrently instead of sequentially
    #[arg(short = 'p', long = "parallel")]
    pub parallel: bool,

    /// Worker count for parallel resolution
    #[arg(long = "workers")]
    pub workers: Option<usize>,

    /// Delay in seconds before each sequential geolocation request
    #[arg(long = "rate-limit")]
    pub rate_limit: Option<f64>,

    /// Configuration file path (JSON)
    #[arg(short = 'c', long = "config")]
    pub config: Option<String>,

    /// Enable verbose logging
    #[arg(short = 'v', long = "verbose")]
    pub verbose: bool,
}

/// Output format for the assembled route
#[derive(clap::ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Html,
    Json,
    Csv,
    Report,
}

impl Args {
    /// Get trace timeout as Duration
    pub fn timeout_duration(&self) -> Duration {
        Duration::from_secs(self.timeout)
    }

    /// Validate arguments
    pub fn validate(&self) -> Result<(), String> {
        if self.timeout == 0 {
            return Err("Timeout must be at least 1 second".into());
        }

        if self.max_hops == 0 {
            return Err("Max hops must be at least 1".into());
        }

        // Upper bound keeps a misbehaving trace from running forever
        const MAX_SAFE_HOPS: u8 = 64;
        if self.max_hops > MAX_SAFE_HOPS {
            return Err(format!("Max hops cannot exceed {}", MAX_SAFE_HOPS));
        }

        if let Some(workers) = self.workers {
            if workers == 0 {
                return Err("Workers must be at least 1".into());
            }
            const MAX_WORKERS: usize = 32;
            if workers > MAX_WORKERS {
                return Err(format!("Workers cannot exceed {} (resource limit)", MAX_WORKERS));
            }
        }

        if let Some(delay) = self.rate_limit {
            if delay < 0.0 {
                return Err("Rate limit delay cannot be negative".into());
            }
        }

        if self.output.is_empty() {
            return Err("Output path cannot be empty".into());
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_args() -> Args {
        Args::parse_from(["georoute", "example.com"])
    }

    #[test]
    fn test_defaults() {
        let args = base_args();
        assert_eq!(args.target.as_deref(), Some("example.com"));
        assert_eq!(args.timeout, 30);
        assert_eq!(args.max_hops, 15);
        assert_eq!(args.format, ExportFormat::Html);
        assert!(!args.parallel);
        assert!(args.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_zero_timeout() {
        let mut args = base_args();
        args.timeout = 0;
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_excessive_hops() {
        let mut args = base_args();
        args.max_hops = 200;
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_zero_workers() {
        let mut args = base_args();
        args.workers = Some(0);
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_negative_rate_limit() {
        let mut args = base_args();
        args.rate_limit = Some(-0.5);
        assert!(args.validate().is_err());
    }
}
