//! Item-processing pipeline
//!
//! Every record the engine extracts flows through the pipeline's stages in
//! order and, if no stage drops it, lands in the terminal record sink. Stage
//! errors are stage-local: a stage either passes a (possibly modified)
//! record on or drops it, it never unwinds the crawl.

pub mod dedupe;
pub mod images;
pub mod sink;

pub use dedupe::DedupeStage;
pub use images::ImageStage;
pub use sink::JsonSink;

use crate::record::ProductRecord;
use async_trait::async_trait;

/// One processing stage
///
/// `process` returns `Some` to pass the record (possibly modified) to the
/// next stage and `None` to drop it. Failures inside a stage are handled by
/// the stage itself per its own policy (fail-open for dedupe, pass-without-
/// image for the image stage) and logged, not propagated.
#[async_trait]
pub trait Stage: Send {
    /// Name used in drop/error logs
    fn name(&self) -> &'static str;

    /// Processes a single record
    async fn process(&mut self, record: ProductRecord) -> Option<ProductRecord>;
}

/// Ordered composition of stages ending in the JSON record sink
pub struct Pipeline {
    stages: Vec<Box<dyn Stage>>,
    sink: JsonSink,
}

impl Pipeline {
    /// Creates a pipeline with no intermediate stages
    pub fn new(sink: JsonSink) -> Self {
        Self {
            stages: Vec::new(),
            sink,
        }
    }

    /// Appends a stage; stages run in insertion order
    pub fn with_stage(mut self, stage: impl Stage + 'static) -> Self {
        self.stages.push(Box::new(stage));
        self
    }

    /// Feeds one record through the stages into the sink
    ///
    /// Returns `true` when the record reached the sink.
    pub async fn feed(&mut self, record: ProductRecord) -> bool {
        let mut current = record;
        for stage in &mut self.stages {
            match stage.process(current).await {
                Some(next) => current = next,
                None => {
                    tracing::debug!("Record dropped by {} stage", stage.name());
                    return false;
                }
            }
        }
        self.sink.accept(current);
        true
    }

    /// Number of records that reached the sink
    pub fn items_saved(&self) -> u64 {
        self.sink.len() as u64
    }

    /// Finalizes the sink, writing the export document if anything was saved
    ///
    /// Returns the written path, or `None` when no records accumulated.
    pub fn finalize(&mut self) -> crate::Result<Option<std::path::PathBuf>> {
        self.sink.finalize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    struct DropAll;

    #[async_trait]
    impl Stage for DropAll {
        fn name(&self) -> &'static str {
            "drop-all"
        }

        async fn process(&mut self, _record: ProductRecord) -> Option<ProductRecord> {
            None
        }
    }

    struct Tag;

    #[async_trait]
    impl Stage for Tag {
        fn name(&self) -> &'static str {
            "tag"
        }

        async fn process(&mut self, mut record: ProductRecord) -> Option<ProductRecord> {
            record.local_path = Some("tagged".to_string());
            Some(record)
        }
    }

    #[tokio::test]
    async fn dropped_record_never_reaches_later_stages_or_sink() {
        let dir = tempdir().unwrap();
        let sink = JsonSink::new(dir.path(), Some("out"));
        let mut pipeline = Pipeline::new(sink).with_stage(DropAll).with_stage(Tag);

        let saved = pipeline.feed(ProductRecord::new("Scaler", "10.0")).await;
        assert!(!saved);
        assert_eq!(pipeline.items_saved(), 0);
    }

    #[tokio::test]
    async fn passed_record_flows_through_in_order() {
        let dir = tempdir().unwrap();
        let sink = JsonSink::new(dir.path(), Some("out"));
        let mut pipeline = Pipeline::new(sink).with_stage(Tag);

        let saved = pipeline.feed(ProductRecord::new("Scaler", "10.0")).await;
        assert!(saved);
        assert_eq!(pipeline.items_saved(), 1);
    }
}
