use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use engine_logging::{engine_debug, engine_info, engine_warn};
use futures_util::stream::{self, StreamExt};
use thiserror::Error;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::config::PipelineConfig;
use crate::dispatch::{utc_timestamp, Clock, ContentKind, Dispatcher};
use crate::fallback::FallbackResolver;
use crate::fetch::{Fetcher, ReqwestFetcher, RetryingFetcher};
use crate::metadata::{JsonlMetadataLog, MetadataError, PersistedRecord, RecordSink};
use crate::naming::derive_base_name;
use crate::persist::PersistError;
use crate::readable::ReadableTextExtractor;
use crate::render::{ChromeRenderer, PdfRenderer};
use crate::{
    FetchError, FetchExhausted, NullProgressSink, PipelineEvent, ProgressSink, RunSummary,
    SourceItem,
};

/// Run-level failures; nothing that happens to a single item ends up here.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("failed to build http client: {0}")]
    Client(#[from] FetchError),
    #[error("failed to reset metadata log: {0}")]
    Metadata(#[from] MetadataError),
    #[error("failed to prepare output directories: {0}")]
    Output(#[from] PersistError),
}

/// Why one item produced no record.
#[derive(Debug, Error)]
pub enum ItemError {
    #[error(transparent)]
    Fetch(#[from] FetchExhausted),
    #[error("failed to save: {0}")]
    Persist(#[from] PersistError),
    #[error("failed to record metadata: {0}")]
    Metadata(#[from] MetadataError),
    #[error("processing task failed: {0}")]
    Task(String),
    #[error("timed out after {0:?}")]
    TimedOut(Duration),
}

pub struct PipelineBuilder {
    config: PipelineConfig,
    fetcher: Option<Arc<dyn Fetcher>>,
    records: Option<Arc<dyn RecordSink>>,
    renderer: Option<Arc<dyn PdfRenderer>>,
    progress: Arc<dyn ProgressSink>,
    extractor: ReadableTextExtractor,
    clock: Clock,
}

impl PipelineBuilder {
    pub fn fetcher(mut self, fetcher: Arc<dyn Fetcher>) -> Self {
        self.fetcher = Some(fetcher);
        self
    }

    pub fn records(mut self, records: Arc<dyn RecordSink>) -> Self {
        self.records = Some(records);
        self
    }

    /// Renderer used when `render_pdf` is on; defaults to a discovered Chrome.
    pub fn renderer(mut self, renderer: Arc<dyn PdfRenderer>) -> Self {
        self.renderer = Some(renderer);
        self
    }

    pub fn progress(mut self, progress: Arc<dyn ProgressSink>) -> Self {
        self.progress = progress;
        self
    }

    pub fn extractor(mut self, extractor: ReadableTextExtractor) -> Self {
        self.extractor = extractor;
        self
    }

    pub fn clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    pub fn build(self) -> Result<Pipeline, PipelineError> {
        let config = self.config;
        let fetcher: Arc<dyn Fetcher> = match self.fetcher {
            Some(fetcher) => fetcher,
            None => Arc::new(ReqwestFetcher::new(config.fetch_settings())?),
        };
        let records: Arc<dyn RecordSink> = match self.records {
            Some(records) => records,
            None => Arc::new(JsonlMetadataLog::new(config.output.metadata_path.clone())),
        };
        let renderer = if config.render_pdf {
            Some(match self.renderer {
                Some(renderer) => renderer,
                None => discover_chrome(config.render_timeout()),
            })
        } else {
            None
        };
        let dispatcher = Dispatcher::new(
            config.output.clone(),
            self.extractor,
            config.tags.clone(),
            self.clock,
        );

        Ok(Pipeline {
            resolver: FallbackResolver::new(config.fallback_rules.clone()),
            fetcher: RetryingFetcher::new(fetcher, config.retry_policy()),
            dispatcher: Arc::new(dispatcher),
            records,
            renderer,
            progress: self.progress,
            config,
        })
    }
}

fn discover_chrome(timeout: Duration) -> Arc<dyn PdfRenderer> {
    let chrome = ChromeRenderer::discover().with_timeout(timeout);
    match chrome.binary() {
        Some(binary) => engine_info!("Rendering PDFs with {}", binary.display()),
        None => engine_warn!("PDF rendering requested but no Chrome/Chromium was found"),
    }
    Arc::new(chrome)
}

/// Drives resolve -> fetch -> dispatch -> record for every source item.
pub struct Pipeline {
    config: PipelineConfig,
    resolver: FallbackResolver,
    fetcher: RetryingFetcher<Arc<dyn Fetcher>>,
    dispatcher: Arc<Dispatcher>,
    records: Arc<dyn RecordSink>,
    renderer: Option<Arc<dyn PdfRenderer>>,
    progress: Arc<dyn ProgressSink>,
}

impl Pipeline {
    pub fn builder(config: PipelineConfig) -> PipelineBuilder {
        PipelineBuilder {
            config,
            fetcher: None,
            records: None,
            renderer: None,
            progress: Arc::new(NullProgressSink),
            extractor: ReadableTextExtractor::default(),
            clock: Arc::new(utc_timestamp),
        }
    }

    /// Pipeline over the real network, metadata file and browser.
    pub fn new(config: PipelineConfig) -> Result<Self, PipelineError> {
        Self::builder(config).build()
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub async fn run(&self, items: &[SourceItem]) -> Result<RunSummary, PipelineError> {
        self.run_until_cancelled(items, CancellationToken::new()).await
    }

    /// Process `items`, resetting the metadata log first.
    ///
    /// Once `cancel` fires or the configured run deadline passes, items not yet
    /// started are counted as skipped; items already running are finished.
    pub async fn run_until_cancelled(
        &self,
        items: &[SourceItem],
        cancel: CancellationToken,
    ) -> Result<RunSummary, PipelineError> {
        self.records.reset()?;
        self.dispatcher.layout().ensure_dirs()?;

        // An unrepresentable deadline is as good as none.
        let deadline = self
            .config
            .run_deadline()
            .and_then(|d| Instant::now().checked_add(d));
        let ok = AtomicUsize::new(0);
        let failed = AtomicUsize::new(0);
        let skipped = AtomicUsize::new(0);
        let (ok_ref, failed_ref, skipped_ref, cancel_ref) = (&ok, &failed, &skipped, &cancel);

        stream::iter(items)
            .map(|item| async move {
                let expired = deadline.is_some_and(|d| Instant::now() >= d);
                if cancel_ref.is_cancelled() || expired {
                    engine_warn!("Skipping {}: run stopped before it started", item.url);
                    skipped_ref.fetch_add(1, Ordering::SeqCst);
                    self.progress.emit(PipelineEvent::Skipped {
                        url: item.url.clone(),
                    });
                    return;
                }
                match self.process_with_timeout(item).await {
                    Ok(record) => {
                        ok_ref.fetch_add(1, Ordering::SeqCst);
                        self.render(item, &record).await;
                    }
                    Err(err) => {
                        engine_warn!("Item failed: {} -> {}", item.url, err);
                        failed_ref.fetch_add(1, Ordering::SeqCst);
                        self.progress.emit(PipelineEvent::Failed {
                            url: item.url.clone(),
                            error: err.to_string(),
                        });
                    }
                }
            })
            .buffer_unordered(self.config.concurrency.max(1))
            .for_each(|()| async {})
            .await;

        let summary = RunSummary {
            ok: ok.load(Ordering::SeqCst),
            failed: failed.load(Ordering::SeqCst),
            skipped: skipped.load(Ordering::SeqCst),
        };
        engine_info!("Run finished: {}", summary);
        Ok(summary)
    }

    /// Resolve, fetch, save and record one item. The item timeout covers
    /// exactly this much, so a timed-out item never leaves a record behind.
    async fn process_with_timeout(&self, item: &SourceItem) -> Result<PersistedRecord, ItemError> {
        match self.config.item_timeout() {
            Some(limit) => tokio::time::timeout(limit, self.process_item(item))
                .await
                .unwrap_or(Err(ItemError::TimedOut(limit))),
            None => self.process_item(item).await,
        }
    }

    async fn process_item(&self, item: &SourceItem) -> Result<PersistedRecord, ItemError> {
        let candidates = self.resolver.resolve(&item.url);
        engine_debug!("{} candidates for {}", candidates.len(), item.url);

        let result = self.fetcher.fetch(&candidates).await?;
        if result.served_from != item.url {
            self.progress.emit(PipelineEvent::FallbackUsed {
                url: item.url.clone(),
                served_from: result.served_from.clone(),
            });
        }

        let dispatcher = Arc::clone(&self.dispatcher);
        let original = item.url.clone();
        let base_name = derive_base_name(&item.url);
        let dispatched =
            tokio::task::spawn_blocking(move || dispatcher.dispatch(&original, &base_name, &result))
                .await
                .map_err(|err| ItemError::Task(err.to_string()))??;

        self.records.append(&dispatched.record)?;
        let record = dispatched.record;
        engine_debug!("Saved {} as {}", item.url, record.saved_path);
        self.progress.emit(PipelineEvent::Saved {
            url: item.url.clone(),
            kind: record.kind,
            path: record.saved_path.clone().into(),
            companion: dispatched.companion,
        });
        Ok(record)
    }

    /// Optional PDF of a saved HTML page, bounded by its own timeout.
    async fn render(&self, item: &SourceItem, record: &PersistedRecord) {
        let Some(renderer) = &self.renderer else {
            return;
        };
        if record.kind != ContentKind::Html {
            return;
        }
        let output = self
            .dispatcher
            .layout()
            .pdf_path(&derive_base_name(&item.url));
        let limit = self.config.render_timeout();
        let outcome =
            match tokio::time::timeout(limit, renderer.render_to_pdf(&record.served_from, &output))
                .await
            {
                Ok(result) => result.map_err(|err| err.to_string()),
                Err(_) => Err(format!("render timed out after {limit:?}")),
            };
        match outcome {
            Ok(()) => self.progress.emit(PipelineEvent::PdfRendered {
                url: item.url.clone(),
                path: output,
            }),
            Err(reason) => {
                engine_warn!("PDF skipped for {}: {}", item.url, reason);
                self.progress.emit(PipelineEvent::PdfSkipped {
                    url: item.url.clone(),
                    reason,
                });
            }
        }
    }
}
