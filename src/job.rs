//! Crawl job orchestration
//!
//! A [`CrawlJob`] binds one engine run, one pipeline instance, and one
//! notification delivery, and owns the job lifecycle: it constructs the
//! HTTP client with the job's proxy pick, wires the engine into the
//! pipeline, maps the engine outcome to a terminal status, finalizes the
//! sink on every terminal path, and notifies exactly once.

use crate::cache::PriceCache;
use crate::config::JobParams;
use crate::crawler::{build_http_client, CrawlEngine, EngineOutcome};
use crate::notify::{CrawlSummary, NotificationClient};
use crate::pipeline::{DedupeStage, ImageStage, JsonSink, Pipeline};
use crate::Result;
use std::fmt;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Job lifecycle state
///
/// `Pending → Running → {CompletedNormally, CompletedAtLimit, Cancelled,
/// Failed}`; exactly one terminal state is reached exactly once per job.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobStatus {
    Pending,
    Running,
    CompletedNormally,
    CompletedAtLimit,
    Cancelled,
    Failed,
}

impl JobStatus {
    pub fn is_terminal(self) -> bool {
        !matches!(self, JobStatus::Pending | JobStatus::Running)
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            JobStatus::Pending => "pending",
            JobStatus::Running => "running",
            JobStatus::CompletedNormally => "completed normally",
            JobStatus::CompletedAtLimit => "completed at page limit",
            JobStatus::Cancelled => "cancelled",
            JobStatus::Failed => "failed",
        };
        f.write_str(text)
    }
}

/// Cloneable cancellation signal checked between page fetches
///
/// Raising the flag stops the engine at the top of its next iteration;
/// records already accumulated are still persisted at job finalization.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Final accounting for one job
#[derive(Debug, Clone)]
pub struct JobReport {
    pub status: JobStatus,
    pub pages_fetched: u64,
    pub items_extracted: u64,
    pub items_saved: u64,
    /// Path of the written export, when any record was persisted
    pub export_path: Option<PathBuf>,
}

/// One invocation of the crawl-and-pipeline engine
pub struct CrawlJob {
    params: JobParams,
    cache: Arc<dyn PriceCache>,
    cancel: CancelFlag,
    status: JobStatus,
}

impl CrawlJob {
    /// Creates a job after validating its parameters
    pub fn new(params: JobParams, cache: Arc<dyn PriceCache>) -> Result<Self> {
        params.validate()?;
        Ok(Self {
            params,
            cache,
            cancel: CancelFlag::new(),
            status: JobStatus::Pending,
        })
    }

    /// Handle the launcher can use to cancel the job between pages
    pub fn cancel_flag(&self) -> CancelFlag {
        self.cancel.clone()
    }

    /// Current lifecycle state
    pub fn status(&self) -> JobStatus {
        self.status
    }

    /// Runs the job to its terminal state
    ///
    /// Always finalizes the sink and, when an endpoint is configured, always
    /// delivers exactly one notification, whichever terminal state was
    /// reached.
    pub async fn run(mut self) -> JobReport {
        self.status = JobStatus::Running;
        tracing::info!(start_url = %self.params.start_url, "Job starting");

        let proxy = pick_proxy(&self.params.proxies);
        if let Some(p) = proxy {
            tracing::info!(proxy = %p, "Proxy selected for this job");
        }

        let sink = JsonSink::new(&self.params.data_dir, self.params.export_name.as_deref());

        let (status, pages_fetched, items_extracted, mut pipeline) =
            match build_http_client(proxy) {
                Ok(client) => {
                    let mut pipeline = Pipeline::new(sink)
                        .with_stage(DedupeStage::new(self.cache.clone()))
                        .with_stage(ImageStage::new(
                            client.clone(),
                            self.params.image_dir.clone(),
                        ));

                    let mut engine = CrawlEngine::new(
                        client,
                        self.params.selectors.clone(),
                        self.params.page_limit,
                        self.cancel.clone(),
                    );

                    let status = match engine.run(&self.params.start_url, &mut pipeline).await {
                        Ok(EngineOutcome::NoMorePages) => JobStatus::CompletedNormally,
                        Ok(EngineOutcome::PageLimitReached) => JobStatus::CompletedAtLimit,
                        Ok(EngineOutcome::Cancelled) => JobStatus::Cancelled,
                        Err(e) => {
                            tracing::error!("Crawl failed: {e}");
                            JobStatus::Failed
                        }
                    };

                    (status, engine.pages_fetched(), engine.items_extracted(), pipeline)
                }
                Err(e) => {
                    tracing::error!("Could not build HTTP client: {e}");
                    (JobStatus::Failed, 0, 0, Pipeline::new(sink))
                }
            };

        debug_assert!(status.is_terminal());
        self.status = status;

        // Finalization runs on every terminal path, including failure, so
        // already-accumulated records are never lost.
        let items_saved = pipeline.items_saved();
        let export_path = match pipeline.finalize() {
            Ok(path) => path,
            Err(e) => {
                tracing::error!("Export write failed: {e}");
                None
            }
        };

        self.notify_once(status, pages_fetched, items_extracted, items_saved)
            .await;

        tracing::info!(
            %status,
            pages_fetched,
            items_extracted,
            items_saved,
            "Job finished"
        );

        JobReport {
            status,
            pages_fetched,
            items_extracted,
            items_saved,
            export_path,
        }
    }

    async fn notify_once(
        &self,
        status: JobStatus,
        pages_fetched: u64,
        items_extracted: u64,
        items_saved: u64,
    ) {
        let Some(endpoint) = &self.params.notify_endpoint else {
            tracing::info!("No notification endpoint configured, skipping notification");
            return;
        };

        let summary = CrawlSummary {
            status: format!("Crawl finished: {status}"),
            total_items_scraped: items_extracted,
            total_items_saved: items_saved,
            total_pages_scraped: pages_fetched,
        };
        NotificationClient::new().notify(endpoint, &summary).await;
    }
}

/// Picks one proxy uniformly at random; the choice holds for the whole job
fn pick_proxy(proxies: &[String]) -> Option<&str> {
    if proxies.is_empty() {
        None
    } else {
        Some(proxies[fastrand::usize(..proxies.len())].as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::MemoryCache;

    #[test]
    fn invalid_params_are_rejected_at_construction() {
        let cache = Arc::new(MemoryCache::new());
        assert!(CrawlJob::new(JobParams::new(""), cache).is_err());
    }

    #[test]
    fn proxy_pick_comes_from_the_configured_list() {
        assert_eq!(pick_proxy(&[]), None);

        let proxies = vec!["http://a:8080".to_string(), "http://b:8080".to_string()];
        for _ in 0..20 {
            let picked = pick_proxy(&proxies).unwrap();
            assert!(proxies.iter().any(|p| p == picked));
        }
    }

    #[test]
    fn terminal_statuses_are_terminal() {
        assert!(!JobStatus::Pending.is_terminal());
        assert!(!JobStatus::Running.is_terminal());
        assert!(JobStatus::CompletedNormally.is_terminal());
        assert!(JobStatus::CompletedAtLimit.is_terminal());
        assert!(JobStatus::Cancelled.is_terminal());
        assert!(JobStatus::Failed.is_terminal());
    }

    #[test]
    fn cancel_flag_is_shared_between_clones() {
        let flag = CancelFlag::new();
        let clone = flag.clone();
        assert!(!clone.is_cancelled());
        flag.cancel();
        assert!(clone.is_cancelled());
    }
}
