//! Crawl orchestration
//!
//! The orchestrator owns the crawl state for one run. It seeds the engine,
//! lets the dispatcher drain the queue and, once nothing is left, persists
//! and exports whatever was collected. Partial results are always exported.

use crate::config::{Config, ExtractionConfig, OutputFormat};
use crate::crawler::dispatcher::{DispatchOptions, Dispatcher};
use crate::crawler::engine::{CrawlEngine, EngineSettings, EngineStats};
use crate::crawler::fetcher::{HttpFetcher, PageFetcher};
use crate::crawler::request::CrawlRequest;
use crate::extract::{infer_code, slug_name, Extractor, SelectorExtractor};
use crate::output::{print_statistics, write_tree, RunSummary};
use crate::records::{build_tree, CategoryTree};
use crate::state::{CrawlState, ProgressObserver, ProgressTracker};
use crate::storage::{
    append_records, DatasetSink, RunCounts, RunStatus, SqliteDataset, CATEGORIES_DATASET,
    SUBCATEGORIES_DATASET,
};
use crate::ShelfError;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use url::Url;

/// Which page kinds a run visits
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CrawlMode {
    /// Main pages, then one category page per discovered category
    #[default]
    Full,

    /// Main pages only
    CategoriesOnly,

    /// Seeds are category pages; no main pages are visited
    SubcategoriesOnly,
}

impl CrawlMode {
    pub fn from_config(extraction: &ExtractionConfig) -> Self {
        if extraction.subcategories {
            CrawlMode::Full
        } else {
            CrawlMode::CategoriesOnly
        }
    }
}

/// Everything a finished crawl produced
#[derive(Debug)]
pub struct CrawlOutcome {
    pub state: CrawlState,
    pub engine: EngineStats,
    pub tree: Option<CategoryTree>,
}

/// Main crawler orchestration structure
pub struct Orchestrator<E: Extractor> {
    config: Config,
    extractor: E,
    fetcher: Arc<dyn PageFetcher>,
    mode: CrawlMode,
    observer: Option<Arc<dyn ProgressObserver>>,
}

impl Orchestrator<SelectorExtractor> {
    /// Creates an orchestrator with the HTTP fetcher and selector extractor
    /// described by `config`
    ///
    /// # Arguments
    ///
    /// * `config` - The validated configuration
    ///
    /// # Returns
    ///
    /// * `Ok(Orchestrator)` - Ready to crawl
    /// * `Err(ShelfError)` - The HTTP client or a selector could not be built
    pub fn from_config(config: Config) -> Result<Self, ShelfError> {
        let extractor = SelectorExtractor::new(&config.selectors, &config.site.name)
            .map_err(|e| ShelfError::Config(crate::ConfigError::InvalidSelector(e.to_string())))?;
        let fetcher = HttpFetcher::new(&config.user_agent, &config.crawler, &config.proxy)?;
        Ok(Self::new(config, extractor, Arc::new(fetcher)))
    }
}

impl<E: Extractor> Orchestrator<E> {
    pub fn new(config: Config, extractor: E, fetcher: Arc<dyn PageFetcher>) -> Self {
        let mode = CrawlMode::from_config(&config.extraction);
        Self {
            config,
            extractor,
            fetcher,
            mode,
            observer: None,
        }
    }

    pub fn with_mode(mut self, mode: CrawlMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_observer(mut self, observer: Arc<dyn ProgressObserver>) -> Self {
        self.observer = Some(observer);
        self
    }

    pub fn mode(&self) -> CrawlMode {
        self.mode
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Initial requests for the configured seeds
    ///
    /// In subcategories-only mode the parent code is inferred from each seed
    /// URL and the parent name is taken from its slug. That mode needs explicit
    /// seeds; the site base URL is a main page.
    pub fn seed_requests(&self) -> Result<Vec<CrawlRequest>, ShelfError> {
        if self.mode == CrawlMode::SubcategoriesOnly && self.config.site.seeds.is_empty() {
            return Err(ShelfError::Usage(
                "subcategories-only mode needs category page seeds (--url or [site] seeds)"
                    .to_string(),
            ));
        }

        self.config
            .seed_urls()
            .iter()
            .map(|seed| -> Result<CrawlRequest, ShelfError> {
                let url = Url::parse(seed)?;
                Ok(match self.mode {
                    CrawlMode::SubcategoriesOnly => {
                        let code = infer_code(url.as_str());
                        let name = slug_name(url.path());
                        let name = if name.is_empty() { code.clone() } else { name };
                        CrawlRequest::category(url, &name, &code)
                    }
                    CrawlMode::Full | CrawlMode::CategoriesOnly => CrawlRequest::main(url),
                })
            })
            .collect()
    }

    /// Runs the crawl until the queue drains
    ///
    /// Failed requests never abort the run; they are recorded in the progress
    /// failure log.
    pub async fn crawl(&self) -> Result<CrawlOutcome, ShelfError> {
        let tracker = match &self.observer {
            Some(observer) => ProgressTracker::with_observer(Arc::clone(observer)),
            None => ProgressTracker::new(),
        };
        let mut state = CrawlState::new(tracker);

        let mut engine = CrawlEngine::new(
            Arc::clone(&self.fetcher),
            EngineSettings::from(&self.config.crawler),
        );
        for request in self.seed_requests()? {
            tracing::info!("Seeding {}", request.url);
            engine.enqueue(request);
        }

        let options = DispatchOptions {
            follow_categories: self.mode == CrawlMode::Full,
            dedupe_category_urls: self.config.crawler.dedupe_category_urls,
        };

        let stats = {
            let mut dispatcher = Dispatcher::new(&self.extractor, &mut state, options);
            engine.run(&mut dispatcher).await
        };

        let tree = if self.config.extraction.build_tree {
            let mut tree = build_tree(&state.categories.all());
            let grafted = tree.graft_subcategories(&state.subcategories.all_flattened());
            tracing::debug!("Grafted {} subcategories into the category tree", grafted);
            Some(tree)
        } else {
            None
        };

        tracing::info!(
            "Crawl finished: {} categories, {} subcategories, {} failed requests",
            state.categories.len(),
            state.subcategories.len(),
            state.progress.progress().failed_requests.len()
        );

        Ok(CrawlOutcome {
            state,
            engine: stats,
            tree,
        })
    }
}

/// Appends the outcome to the sink and writes the configured exports
///
/// # Returns
///
/// Paths of every file written.
pub fn export_outcome<S: DatasetSink + ?Sized>(
    sink: &mut S,
    outcome: &CrawlOutcome,
    config: &Config,
) -> Result<Vec<PathBuf>, ShelfError> {
    append_records(sink, CATEGORIES_DATASET, &outcome.state.categories.all())?;
    append_records(
        sink,
        SUBCATEGORIES_DATASET,
        &outcome.state.subcategories.all_flattened(),
    )?;

    let dir = Path::new(&config.output.export_dir);
    let mut written = Vec::new();
    for dataset in [CATEGORIES_DATASET, SUBCATEGORIES_DATASET] {
        let path = match config.output.format {
            OutputFormat::Json => sink.export_json(dataset, dir)?,
            OutputFormat::Csv => sink.export_csv(dataset, dir)?,
        };
        tracing::info!("Exported {} to {}", dataset, path.display());
        written.push(path);
    }

    if let Some(tree) = &outcome.tree {
        written.extend(write_tree(tree, dir, &config.site.name)?);
    }

    Ok(written)
}

/// Runs a complete crawl operation
///
/// This is the main entry point for starting a crawl. It will:
/// 1. Open the dataset database and start a run record
/// 2. Crawl main pages and category pages
/// 3. Append and export the collected records
/// 4. Complete the run record and print the summary
///
/// # Arguments
///
/// * `orchestrator` - A configured orchestrator
/// * `config_hash` - Hash of the configuration file, stored on the run
///
/// # Returns
///
/// * `Ok(RunSummary)` - Crawl completed, possibly with failed requests
/// * `Err(ShelfError)` - Storage or export failed
pub async fn run_crawl<E: Extractor>(
    orchestrator: &Orchestrator<E>,
    config_hash: &str,
) -> Result<RunSummary, ShelfError> {
    let config = orchestrator.config();
    let started = Instant::now();

    let mut sink = SqliteDataset::open(Path::new(&config.output.database_path))?;
    let run_id = sink.start_run(config_hash)?;
    tracing::info!("Starting crawl run {} ({:?})", run_id, orchestrator.mode());

    let outcome = match orchestrator.crawl().await {
        Ok(outcome) => outcome,
        Err(e) => {
            sink.finish_run(RunStatus::Failed, RunCounts::default())?;
            return Err(e);
        }
    };

    let exported = match export_outcome(&mut sink, &outcome, config) {
        Ok(paths) => paths,
        Err(e) => {
            sink.finish_run(RunStatus::Failed, counts(&outcome))?;
            return Err(e);
        }
    };
    sink.finish_run(RunStatus::Completed, counts(&outcome))?;

    let mut summary = RunSummary {
        run_id: Some(run_id),
        categories: outcome.state.categories.len(),
        subcategories: outcome.state.subcategories.len(),
        progress: outcome.state.progress.snapshot(),
        tree_nodes: outcome.tree.as_ref().map(CategoryTree::node_count),
        duration_seconds: started.elapsed().as_secs_f64(),
        exported,
        ..RunSummary::default()
    };
    summary.record_engine(outcome.engine);

    print_statistics(&summary);
    Ok(summary)
}

fn counts(outcome: &CrawlOutcome) -> RunCounts {
    RunCounts {
        categories: outcome.state.categories.len(),
        subcategories: outcome.state.subcategories.len(),
        failed_requests: outcome.state.progress.progress().failed_requests.len(),
    }
}
