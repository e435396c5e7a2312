use std::sync::Arc;

use crate::batch::BatchScheduler;
use crate::config::Config;
use crate::extraction::TextExtractor;
use crate::llm_client::ProviderRegistry;
use crate::parsing::ResumeParser;
use crate::scoring::ResumeScorer;
use crate::store::RecordStore;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    /// Provider adapters, built once in `main`.
    pub providers: ProviderRegistry,
    pub extractor: Arc<dyn TextExtractor>,
    pub store: Arc<dyn RecordStore>,
    pub parser: ResumeParser,
    pub scorer: ResumeScorer,
    pub scheduler: BatchScheduler,
}

impl AppState {
    pub fn new(
        config: Config,
        providers: ProviderRegistry,
        extractor: Arc<dyn TextExtractor>,
        store: Arc<dyn RecordStore>,
    ) -> Self {
        Self {
            parser: ResumeParser::new(providers.clone()),
            scorer: ResumeScorer::new(providers.clone()),
            scheduler: BatchScheduler::new(&config.batch),
            config,
            providers,
            extractor,
            store,
        }
    }
}
