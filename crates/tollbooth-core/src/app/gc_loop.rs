//! GcLoop - 古い Run のガベージコレクション
//!
//! # フロー
//! 1. interval ごとに RunService::sweep を呼ぶ
//! 2. sweep は期限切れ + 猶予を過ぎた Run と、放置されたプレビューを削除
//! 3. shutdown を受け取ったら終了

use std::sync::Arc;

use tokio::sync::watch;
use tokio::time::MissedTickBehavior;

use super::config::GcConfig;
use super::service::RunService;

/// GcLoop は期限切れの Run を定期的に削除
pub struct GcLoop {
    service: Arc<RunService>,
    config: GcConfig,
}

impl GcLoop {
    pub fn new(service: Arc<RunService>, config: GcConfig) -> Self {
        Self { service, config }
    }

    /// 1 回分の掃除。失敗してもループは止めない
    pub async fn tick(&self) -> usize {
        match self.service.sweep(&self.config).await {
            Ok(purged) => {
                if purged > 0 {
                    tracing::info!(purged, "gc sweep removed stale runs");
                }
                purged
            }
            Err(e) => {
                tracing::warn!(error = %e, "gc sweep failed");
                0
            }
        }
    }

    /// shutdown が true になるか送信側が drop されるまで回る
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        let mut interval = tokio::time::interval(self.config.interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    self.tick().await;
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        tracing::debug!("gc loop stopping");
                        return;
                    }
                }
            }
        }
    }
}
