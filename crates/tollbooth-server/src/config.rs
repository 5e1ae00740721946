//! Args - コマンドライン引数と環境変数

use std::net::SocketAddr;
use std::path::PathBuf;

use clap::Parser;
use tollbooth_core::app::{GcConfig, ServiceConfig};

/// Pay-per-run file processing server
#[derive(Debug, Clone, Parser)]
#[command(name = "tollbooth", version, about)]
pub struct Args {
    /// Address to listen on
    #[arg(long, env = "TOLLBOOTH_LISTEN", default_value = "127.0.0.1:3000")]
    pub listen: SocketAddr,

    /// Directory holding run records, inputs and outputs
    #[arg(long, env = "TOLLBOOTH_DATA_DIR", default_value = "./tmp")]
    pub data_dir: PathBuf,

    /// Tool manifest (CSV). The built-in catalog is used when omitted
    #[arg(long, env = "TOLLBOOTH_TOOLS")]
    pub tools: Option<PathBuf>,

    /// Hours a paid run stays downloadable
    #[arg(long, env = "TOLLBOOTH_RUN_LIFETIME_HOURS", default_value_t = 24)]
    pub run_lifetime_hours: u32,

    /// Seconds between garbage collection sweeps
    #[arg(long, default_value_t = 600)]
    pub gc_interval_secs: u64,

    /// Hours to keep an expired run before deleting it
    #[arg(long, default_value_t = 24)]
    pub gc_grace_hours: u32,

    /// Hours to keep an unpaid preview before deleting it
    #[arg(long, default_value_t = 72)]
    pub preview_retention_hours: u32,
}

impl Args {
    pub fn service_config(&self) -> ServiceConfig {
        ServiceConfig {
            run_lifetime: chrono::Duration::hours(i64::from(self.run_lifetime_hours)),
        }
    }

    pub fn gc_config(&self) -> GcConfig {
        GcConfig {
            interval: std::time::Duration::from_secs(self.gc_interval_secs.max(1)),
            grace: chrono::Duration::hours(i64::from(self.gc_grace_hours)),
            preview_retention: chrono::Duration::hours(i64::from(self.preview_retention_hours)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let args = Args::try_parse_from(["tollbooth"]).unwrap();
        assert_eq!(args.listen, "127.0.0.1:3000".parse().unwrap());
        assert_eq!(args.data_dir, PathBuf::from("./tmp"));
        assert_eq!(args.service_config().run_lifetime, chrono::Duration::hours(24));
        assert_eq!(args.gc_config().interval, std::time::Duration::from_secs(600));
        assert_eq!(args.gc_config().preview_retention, chrono::Duration::hours(72));
    }

    #[test]
    fn flags_override_defaults() {
        let args = Args::try_parse_from([
            "tollbooth",
            "--run-lifetime-hours",
            "1",
            "--gc-interval-secs",
            "0",
            "--tools",
            "tools.csv",
        ])
        .unwrap();
        assert_eq!(args.service_config().run_lifetime, chrono::Duration::hours(1));
        assert_eq!(args.gc_config().interval, std::time::Duration::from_secs(1));
        assert_eq!(args.tools, Some(PathBuf::from("tools.csv")));
    }
}
