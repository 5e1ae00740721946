//! Config - RunService と GcLoop の設定

use chrono::Duration;

use crate::domain::DEFAULT_RUN_LIFETIME_HOURS;

/// RunService の設定
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// unlock からダウンロード期限までの時間
    pub run_lifetime: Duration,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            run_lifetime: Duration::hours(DEFAULT_RUN_LIFETIME_HOURS),
        }
    }
}

/// GcLoop の設定
#[derive(Debug, Clone)]
pub struct GcConfig {
    /// 掃除の間隔
    pub interval: std::time::Duration,
    /// expires_at を過ぎてから削除するまでの猶予
    pub grace: Duration,
    /// 支払われなかった preview_ready の Run を残しておく期間
    pub preview_retention: Duration,
}

impl Default for GcConfig {
    fn default() -> Self {
        Self {
            interval: std::time::Duration::from_secs(600),
            grace: Duration::hours(24),
            preview_retention: Duration::hours(72),
        }
    }
}
