//! State module for accumulating crawl results
//!
//! # Components
//!
//! - `CategoryStore`: deduplicated categories keyed by code
//! - `SubcategoryStore`: subcategory lists keyed by parent code
//! - `ProgressTracker`: counters and failure log with an optional observer
//! - `CrawlState`: the three of them, owned by the orchestrator for one run

mod category_store;
mod progress;

pub use category_store::{CategoryStore, SubcategoryStore};
pub use progress::{CrawlProgress, LoggingObserver, ProgressObserver, ProgressTracker};

/// Everything a run accumulates; mutated only by the dispatcher
#[derive(Debug, Default)]
pub struct CrawlState {
    pub categories: CategoryStore,
    pub subcategories: SubcategoryStore,
    pub progress: ProgressTracker,
}

impl CrawlState {
    pub fn new(progress: ProgressTracker) -> Self {
        Self {
            categories: CategoryStore::new(),
            subcategories: SubcategoryStore::new(),
            progress,
        }
    }
}
