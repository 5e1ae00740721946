//! RunService - Run ライフサイクルの実行
//!
//! preview → unlock → process → download の各操作と、GC 用の sweep を提供します。
//!
//! # フロー
//! 1. preview: 入力を保存し、Handler でプレビューを計算、`preview_ready` の Run を作成
//! 2. unlock: `preview_ready → paid`（expires_at = paid_at + lifetime）
//! 3. process: 入力を読み Handler で変換、出力を保存して `ready`
//! 4. download: `ready` かつ期限内なら出力を返す
//!
//! 同じ Run への変更操作は RunLocks で直列化します。

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::instrument;

use super::config::{GcConfig, ServiceConfig};
use super::locks::RunLocks;
use super::status::RunView;
use crate::domain::{
    DomainEvent, InputMeta, PreviewMeta, RequestId, Run, RunError, RunId, RunStatus, Tool, ToolSlug,
    content_type_for_ext,
};
use crate::ports::{ArtifactKey, ArtifactStore, Clock, EventSink, IdGenerator, RunStore};
use crate::tools::{HandlerRegistry, ToolCatalog, ToolHandler};

/// アップロードされたファイル
#[derive(Debug, Clone)]
pub struct Upload {
    pub filename: String,
    pub bytes: Vec<u8>,
}

/// preview の結果
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PreviewReceipt {
    pub run_id: RunId,
    pub preview: PreviewMeta,
}

/// unlock の結果
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UnlockReceipt {
    pub ok: bool,
    pub status: RunStatus,
    #[serde(with = "chrono::serde::ts_milliseconds_option")]
    pub expires_at: Option<DateTime<Utc>>,
}

/// download の結果
#[derive(Debug, Clone)]
pub struct Download {
    pub filename: String,
    pub content_type: &'static str,
    pub bytes: Vec<u8>,
}

/// `runId` の文字列を RunId に
///
/// 空文字は「指定なし」、形式が不正なものは「存在しない Run」として扱う。
pub fn parse_run_id(raw: &str) -> Result<RunId, RunError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(RunError::MissingRunId);
    }
    raw.parse()
        .map_err(|_| RunError::RunNotFound(raw.to_string()))
}

/// RunService は ports を組み合わせて Run ライフサイクルを実装
pub struct RunService {
    catalog: ToolCatalog,
    handlers: HandlerRegistry,
    runs: Arc<dyn RunStore>,
    artifacts: Arc<dyn ArtifactStore>,
    clock: Arc<dyn Clock>,
    ids: Arc<dyn IdGenerator>,
    events: Arc<dyn EventSink>,
    locks: RunLocks,
    config: ServiceConfig,
}

impl RunService {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        catalog: ToolCatalog,
        handlers: HandlerRegistry,
        runs: Arc<dyn RunStore>,
        artifacts: Arc<dyn ArtifactStore>,
        clock: Arc<dyn Clock>,
        ids: Arc<dyn IdGenerator>,
        events: Arc<dyn EventSink>,
        config: ServiceConfig,
    ) -> Self {
        Self {
            catalog,
            handlers,
            runs,
            artifacts,
            clock,
            ids,
            events,
            locks: RunLocks::new(),
            config,
        }
    }

    pub fn catalog(&self) -> &ToolCatalog {
        &self.catalog
    }

    /// カタログ一覧（`GET /api/tools`）
    pub fn tools(&self) -> Vec<Tool> {
        self.catalog.iter().cloned().collect()
    }

    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    /// エラー応答に付ける ID
    pub fn new_request_id(&self) -> RequestId {
        self.ids.generate_request_id()
    }

    /// Tool がカタログにあり、Handler も登録されているか
    ///
    /// HTTP 層は本文を読む前にこれを呼び、404 / 400 を本文のエラーより優先する。
    pub fn check_tool(&self, slug: &ToolSlug) -> Result<&Tool, RunError> {
        self.handler_for(slug)?;
        self.catalog
            .get(slug)
            .ok_or_else(|| RunError::UnknownTool(slug.clone()))
    }

    fn handler_for(&self, slug: &ToolSlug) -> Result<Arc<dyn ToolHandler>, RunError> {
        if !self.catalog.contains(slug) {
            return Err(RunError::UnknownTool(slug.clone()));
        }
        self.handlers
            .get(slug)
            .ok_or_else(|| RunError::NoHandler(slug.clone()))
    }

    async fn load(&self, id: RunId) -> Result<Run, RunError> {
        self.runs
            .load(id)
            .await?
            .ok_or_else(|| RunError::RunNotFound(id.to_string()))
    }

    /// 無料プレビュー。`upload` が None ならファイル未指定
    #[instrument(skip(self, upload), fields(tool = %slug))]
    pub async fn preview(
        &self,
        slug: &ToolSlug,
        upload: Option<Upload>,
    ) -> Result<PreviewReceipt, RunError> {
        let handler = self.handler_for(slug)?;
        // handler_for で存在確認済み
        let tool = self
            .catalog
            .get(slug)
            .ok_or_else(|| RunError::UnknownTool(slug.clone()))?;
        let upload = upload.ok_or(RunError::MissingFile)?;

        let size = upload.bytes.len() as u64;
        if size > tool.max_bytes() {
            return Err(RunError::TooLarge {
                max_size_mb: tool.input.max_size_mb,
            });
        }

        let preview = handler
            .preview(&upload.bytes)
            .await
            .map_err(RunError::PreviewFailed)?;

        let run_id = self.ids.generate_run_id();
        let input_key = ArtifactKey::input(run_id, handler.input_ext());
        self.artifacts.put(&input_key, &upload.bytes).await?;

        let run = Run::preview(
            run_id,
            slug.clone(),
            self.clock.now(),
            InputMeta {
                filename: upload.filename,
                size,
            },
            preview.clone(),
            handler.input_ext(),
            tool.output_ext.clone(),
        );
        self.runs.save(&run).await?;

        self.events.emit(&DomainEvent::Previewed {
            run_id,
            tool: slug.clone(),
            input_bytes: size,
            preview: preview.clone(),
        });
        Ok(PreviewReceipt { run_id, preview })
    }

    /// 支払い済みにする。何度呼んでも結果は同じ
    #[instrument(skip(self), fields(%run_id))]
    pub async fn unlock(&self, run_id: RunId) -> Result<UnlockReceipt, RunError> {
        let _guard = self.locks.acquire(run_id).await;
        let mut run = self.load(run_id).await?;

        if run.unlock(self.clock.now(), self.config.run_lifetime) {
            self.runs.save(&run).await?;
            if let Some(expires_at) = run.expires_at() {
                self.events.emit(&DomainEvent::Unlocked { run_id, expires_at });
            }
        } else {
            tracing::debug!(status = %run.status(), "unlock is a no-op");
        }

        Ok(UnlockReceipt {
            ok: true,
            status: run.status(),
            expires_at: run.expires_at(),
        })
    }

    /// 本処理。`paid` でも `ready` でも実行でき、出力は毎回書き直す
    #[instrument(skip(self), fields(tool = %slug, %run_id))]
    pub async fn process(&self, slug: &ToolSlug, run_id: RunId) -> Result<RunStatus, RunError> {
        let handler = self.handler_for(slug)?;

        let _guard = self.locks.acquire(run_id).await;
        let mut run = self.load(run_id).await?;
        if &run.tool_slug != slug {
            return Err(RunError::ToolMismatch {
                run_id,
                requested: slug.clone(),
                actual: run.tool_slug.clone(),
            });
        }
        run.ensure_processable(self.clock.now())?;

        let input = self
            .artifacts
            .get(&ArtifactKey::input(run_id, run.input_ext.clone()))
            .await?;
        let output = handler
            .process(&input)
            .await
            .map_err(RunError::ProcessingFailed)?;
        let output_bytes = self
            .artifacts
            .put(&ArtifactKey::output(run_id, run.output_ext.clone()), &output)
            .await?;

        run.mark_ready()?;
        self.runs.save(&run).await?;

        self.events.emit(&DomainEvent::Processed {
            run_id,
            output_bytes,
        });
        Ok(run.status())
    }

    /// 状態照会
    pub async fn status(&self, run_id: RunId) -> Result<RunView, RunError> {
        let run = self.load(run_id).await?;
        Ok(RunView::of(&run, self.clock.now()))
    }

    /// 出力の取得（`ready` かつ期限内のみ）
    #[instrument(skip(self), fields(%run_id))]
    pub async fn download(&self, run_id: RunId) -> Result<Download, RunError> {
        let run = self.load(run_id).await?;
        run.ensure_downloadable(self.clock.now())?;

        let bytes = self
            .artifacts
            .get(&ArtifactKey::output(run_id, run.output_ext.clone()))
            .await?;

        self.events.emit(&DomainEvent::Downloaded { run_id });
        Ok(Download {
            filename: run.download_filename(),
            content_type: content_type_for_ext(&run.output_ext),
            bytes,
        })
    }

    /// GC 対象か（期限切れ + 猶予、または放置されたプレビュー）
    fn is_stale(run: &Run, now: DateTime<Utc>, gc: &GcConfig) -> bool {
        match run.expires_at() {
            Some(expires_at) => now > expires_at + gc.grace,
            None => {
                run.status() == RunStatus::PreviewReady
                    && now > run.created_at + gc.preview_retention
            }
        }
    }

    /// 古い Run のレコードと artifact を削除し、削除件数を返す
    #[instrument(skip(self, gc))]
    pub async fn sweep(&self, gc: &GcConfig) -> Result<usize, RunError> {
        let candidates: Vec<RunId> = {
            let now = self.clock.now();
            self.runs
                .list()
                .await?
                .into_iter()
                .filter(|run| Self::is_stale(run, now, gc))
                .map(|run| run.id)
                .collect()
        };

        let mut purged = 0;
        for run_id in candidates {
            let _guard = self.locks.acquire(run_id).await;
            // ロック待ちの間に状態が変わっているかもしれないので読み直す
            let Some(run) = self.runs.load(run_id).await? else {
                continue;
            };
            if !Self::is_stale(&run, self.clock.now(), gc) {
                continue;
            }

            self.artifacts
                .delete(&ArtifactKey::input(run_id, run.input_ext.clone()))
                .await?;
            self.artifacts
                .delete(&ArtifactKey::output(run_id, run.output_ext.clone()))
                .await?;
            self.runs.delete(run_id).await?;

            self.events.emit(&DomainEvent::Purged { run_id });
            purged += 1;
        }
        Ok(purged)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::AppBuilder;
    use crate::domain::{ErrorKind, RunState};
    use crate::impls::{InMemoryArtifactStore, InMemoryRunStore, RecordingEventSink};
    use crate::ports::FixedClock;
    use chrono::{Duration, TimeZone};

    const DEDUPE: &str = "remove-duplicate-csv";
    const COUNT: &str = "count-csv-rows";
    const CSV: &[u8] = b"email\na@example.com\nb@example.com\na@example.com";

    struct Fixture {
        service: RunService,
        clock: Arc<FixedClock>,
        runs: InMemoryRunStore,
        artifacts: InMemoryArtifactStore,
        events: Arc<RecordingEventSink>,
    }

    fn fixture() -> Fixture {
        let clock = Arc::new(FixedClock::new(
            Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap(),
        ));
        let runs = InMemoryRunStore::new();
        let artifacts = InMemoryArtifactStore::new();
        let events = Arc::new(RecordingEventSink::new());
        let service = AppBuilder::new()
            .with_builtin_handlers()
            .with_clock(clock.clone())
            .with_run_store(runs.clone())
            .with_artifact_store(artifacts.clone())
            .with_event_sink(events.clone())
            .build()
            .unwrap();
        Fixture {
            service,
            clock,
            runs,
            artifacts,
            events,
        }
    }

    fn upload(bytes: &[u8]) -> Option<Upload> {
        Some(Upload {
            filename: "input.csv".into(),
            bytes: bytes.to_vec(),
        })
    }

    async fn paid_run(fx: &Fixture, slug: &str) -> RunId {
        let receipt = fx
            .service
            .preview(&ToolSlug::new(slug), upload(CSV))
            .await
            .unwrap();
        fx.service.unlock(receipt.run_id).await.unwrap();
        receipt.run_id
    }

    #[tokio::test]
    async fn full_lifecycle_dedupes_csv() {
        let fx = fixture();
        let slug = ToolSlug::new(DEDUPE);

        let receipt = fx.service.preview(&slug, upload(CSV)).await.unwrap();
        assert_eq!(receipt.preview.get("totalRows"), Some(4));
        assert_eq!(receipt.preview.get("uniqueRows"), Some(3));
        assert_eq!(receipt.preview.get("duplicates"), Some(1));

        let unlocked = fx.service.unlock(receipt.run_id).await.unwrap();
        assert_eq!(unlocked.status, RunStatus::Paid);
        assert_eq!(
            unlocked.expires_at,
            Some(fx.clock.now() + Duration::hours(24))
        );

        let status = fx.service.process(&slug, receipt.run_id).await.unwrap();
        assert_eq!(status, RunStatus::Ready);

        let download = fx.service.download(receipt.run_id).await.unwrap();
        assert_eq!(download.bytes, b"email\na@example.com\nb@example.com");
        assert_eq!(download.content_type, "text/csv; charset=utf-8");
        assert_eq!(
            download.filename,
            format!("{DEDUPE}-{}.csv", receipt.run_id)
        );

        let names: Vec<&str> = fx.events.events().iter().map(DomainEvent::name).collect();
        assert_eq!(
            names,
            vec!["run.previewed", "run.unlocked", "run.processed", "run.downloaded"]
        );
    }

    #[tokio::test]
    async fn preview_persists_input_and_record() {
        let fx = fixture();
        let receipt = fx
            .service
            .preview(&ToolSlug::new(DEDUPE), upload(CSV))
            .await
            .unwrap();

        let run = fx.runs.load(receipt.run_id).await.unwrap().unwrap();
        assert_eq!(run.status(), RunStatus::PreviewReady);
        assert_eq!(run.input_meta.filename, "input.csv");
        assert_eq!(run.input_meta.size, CSV.len() as u64);
        assert!(
            fx.artifacts
                .contains(&ArtifactKey::input(receipt.run_id, "csv"))
                .await
        );
    }

    #[tokio::test]
    async fn preview_errors_in_request_order() {
        let fx = fixture();

        let err = fx
            .service
            .preview(&ToolSlug::new("nope"), None)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);

        let err = fx
            .service
            .preview(&ToolSlug::new(DEDUPE), None)
            .await
            .unwrap_err();
        assert!(matches!(err, RunError::MissingFile));
    }

    #[tokio::test]
    async fn catalog_tool_without_handler_is_rejected() {
        let service = AppBuilder::new()
            .register(crate::tools::RemoveDuplicateCsv)
            .unwrap()
            .build()
            .unwrap();

        let err = service
            .preview(&ToolSlug::new(COUNT), upload(CSV))
            .await
            .unwrap_err();
        assert!(matches!(err, RunError::NoHandler(_)));
        assert_eq!(err.kind(), ErrorKind::InvalidInput);
    }

    #[test]
    fn check_tool_reports_unknown_before_missing_handler() {
        let service = AppBuilder::new()
            .register(crate::tools::RemoveDuplicateCsv)
            .unwrap()
            .build()
            .unwrap();

        let tool = service.check_tool(&ToolSlug::new(DEDUPE)).unwrap();
        assert_eq!(tool.input.max_size_mb, 10);
        assert!(matches!(
            service.check_tool(&ToolSlug::new("nope")),
            Err(RunError::UnknownTool(_))
        ));
        assert!(matches!(
            service.check_tool(&ToolSlug::new(COUNT)),
            Err(RunError::NoHandler(_))
        ));
    }

    #[tokio::test]
    async fn oversized_upload_is_rejected() {
        let fx = fixture();
        let too_big = vec![b'a'; 10 * 1024 * 1024 + 1];
        let err = fx
            .service
            .preview(&ToolSlug::new(DEDUPE), upload(&too_big))
            .await
            .unwrap_err();
        assert!(matches!(err, RunError::TooLarge { max_size_mb: 10 }));
        assert!(fx.runs.is_empty().await);
    }

    #[tokio::test]
    async fn unknown_run_is_not_found_everywhere() {
        let fx = fixture();
        let id = fx.service.ids.generate_run_id();
        let slug = ToolSlug::new(DEDUPE);

        for err in [
            fx.service.unlock(id).await.unwrap_err(),
            fx.service.process(&slug, id).await.unwrap_err(),
            fx.service.status(id).await.unwrap_err(),
            fx.service.download(id).await.unwrap_err(),
        ] {
            assert!(matches!(err, RunError::RunNotFound(_)));
        }
    }

    #[tokio::test]
    async fn unlock_is_idempotent_and_keeps_first_deadline() {
        let fx = fixture();
        let run_id = paid_run(&fx, DEDUPE).await;
        let first = fx.runs.load(run_id).await.unwrap().unwrap().expires_at();

        fx.clock.advance(Duration::hours(1));
        let again = fx.service.unlock(run_id).await.unwrap();
        assert_eq!(again.status, RunStatus::Paid);
        assert_eq!(again.expires_at, first);

        let unlocked_events = fx
            .events
            .events()
            .iter()
            .filter(|e| matches!(e, DomainEvent::Unlocked { .. }))
            .count();
        assert_eq!(unlocked_events, 1);
    }

    #[tokio::test]
    async fn process_before_payment_is_payment_required() {
        let fx = fixture();
        let slug = ToolSlug::new(DEDUPE);
        let receipt = fx.service.preview(&slug, upload(CSV)).await.unwrap();

        let err = fx.service.process(&slug, receipt.run_id).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::PaymentRequired);
    }

    #[tokio::test]
    async fn process_with_other_tool_is_mismatch() {
        let fx = fixture();
        let run_id = paid_run(&fx, DEDUPE).await;

        let err = fx
            .service
            .process(&ToolSlug::new(COUNT), run_id)
            .await
            .unwrap_err();
        assert!(matches!(err, RunError::ToolMismatch { .. }));
    }

    #[tokio::test]
    async fn process_is_reinvocable() {
        let fx = fixture();
        let slug = ToolSlug::new(DEDUPE);
        let run_id = paid_run(&fx, DEDUPE).await;

        fx.service.process(&slug, run_id).await.unwrap();
        let first = fx.service.download(run_id).await.unwrap().bytes;
        fx.service.process(&slug, run_id).await.unwrap();
        let second = fx.service.download(run_id).await.unwrap().bytes;

        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn download_before_processing_is_conflict() {
        let fx = fixture();
        let run_id = paid_run(&fx, DEDUPE).await;

        let err = fx.service.download(run_id).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Conflict);
    }

    #[tokio::test]
    async fn expired_run_is_gone() {
        let fx = fixture();
        let slug = ToolSlug::new(DEDUPE);
        let run_id = paid_run(&fx, DEDUPE).await;
        fx.service.process(&slug, run_id).await.unwrap();

        fx.clock.advance(Duration::hours(24) + Duration::seconds(1));

        assert_eq!(
            fx.service.download(run_id).await.unwrap_err().kind(),
            ErrorKind::Gone
        );
        assert_eq!(
            fx.service.process(&slug, run_id).await.unwrap_err().kind(),
            ErrorKind::Gone
        );
        let view = fx.service.status(run_id).await.unwrap();
        assert!(view.expired);
        assert_eq!(view.state, RunState::Expired);
    }

    #[tokio::test]
    async fn count_rows_downloads_json() {
        let fx = fixture();
        let slug = ToolSlug::new(COUNT);
        let run_id = paid_run(&fx, COUNT).await;
        fx.service.process(&slug, run_id).await.unwrap();

        let download = fx.service.download(run_id).await.unwrap();
        assert_eq!(download.content_type, "application/json; charset=utf-8");
        assert!(download.filename.ends_with(".json"));
        let report: serde_json::Value = serde_json::from_slice(&download.bytes).unwrap();
        assert_eq!(report["duplicates"], 1);
    }

    #[tokio::test]
    async fn concurrent_unlocks_stamp_once() {
        let fx = fixture();
        let receipt = fx
            .service
            .preview(&ToolSlug::new(DEDUPE), upload(CSV))
            .await
            .unwrap();
        let service = Arc::new(fx.service);

        let mut tasks = Vec::new();
        for _ in 0..8 {
            let service = service.clone();
            tasks.push(tokio::spawn(async move {
                service.unlock(receipt.run_id).await.unwrap()
            }));
        }
        for task in tasks {
            assert_eq!(task.await.unwrap().status, RunStatus::Paid);
        }

        let unlocked_events = fx
            .events
            .events()
            .iter()
            .filter(|e| matches!(e, DomainEvent::Unlocked { .. }))
            .count();
        assert_eq!(unlocked_events, 1);
    }

    #[tokio::test]
    async fn sweep_purges_expired_and_abandoned_runs() {
        let fx = fixture();
        let gc = GcConfig::default();
        let slug = ToolSlug::new(DEDUPE);

        let expired = paid_run(&fx, DEDUPE).await;
        fx.service.process(&slug, expired).await.unwrap();
        let abandoned = fx.service.preview(&slug, upload(CSV)).await.unwrap().run_id;

        // まだ何も古くない
        assert_eq!(fx.service.sweep(&gc).await.unwrap(), 0);

        fx.clock.advance(Duration::hours(60));
        let fresh = paid_run(&fx, DEDUPE).await;

        // 期限切れ + 猶予を過ぎた paid run だけ
        assert_eq!(fx.service.sweep(&gc).await.unwrap(), 1);
        assert!(fx.runs.load(expired).await.unwrap().is_none());
        assert!(
            !fx.artifacts
                .contains(&ArtifactKey::output(expired, "csv"))
                .await
        );

        fx.clock.advance(Duration::hours(13));
        // 放置されたプレビュー（72h 超）
        assert_eq!(fx.service.sweep(&gc).await.unwrap(), 1);
        assert!(fx.runs.load(abandoned).await.unwrap().is_none());
        assert!(fx.runs.load(fresh).await.unwrap().is_some());
    }

    #[test]
    fn parse_run_id_distinguishes_missing_and_garbage() {
        assert!(matches!(parse_run_id("  "), Err(RunError::MissingRunId)));
        assert!(matches!(parse_run_id("nope"), Err(RunError::RunNotFound(_))));
    }
}
