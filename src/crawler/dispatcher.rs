//! Routes fetched pages to the handler matching their request tag
//!
//! Main pages yield categories and derived category requests; category pages
//! yield subcategories. The dispatcher is the only writer of [`CrawlState`].

use crate::crawler::engine::{CrawlFailure, PageHandler};
use crate::crawler::fetcher::FetchedPage;
use crate::crawler::request::{CrawlRequest, RequestTag};
use crate::extract::{Extractor, Page};
use crate::records::{validate_category, validate_subcategory, Category, Subcategory};
use crate::state::CrawlState;
use crate::url::normalize_url;
use crate::ExtractionError;
use std::collections::HashSet;
use url::Url;

/// Switches controlling what the dispatcher enqueues
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DispatchOptions {
    /// Enqueue one category request per stored category
    pub follow_categories: bool,
    /// Skip derived requests whose normalized URL was already enqueued
    pub dedupe_category_urls: bool,
}

impl Default for DispatchOptions {
    fn default() -> Self {
        Self {
            follow_categories: true,
            dedupe_category_urls: false,
        }
    }
}

pub struct Dispatcher<'a, E: Extractor + ?Sized> {
    extractor: &'a E,
    state: &'a mut CrawlState,
    options: DispatchOptions,
    seen_category_urls: HashSet<String>,
}

impl<'a, E: Extractor + ?Sized> Dispatcher<'a, E> {
    pub fn new(extractor: &'a E, state: &'a mut CrawlState, options: DispatchOptions) -> Self {
        Self {
            extractor,
            state,
            options,
            seen_category_urls: HashSet::new(),
        }
    }

    fn handle_main(
        &mut self,
        page: &Page,
        request: &CrawlRequest,
    ) -> Result<Vec<CrawlRequest>, ExtractionError> {
        let raw_categories = self
            .extractor
            .extract_categories(page)
            .map_err(|e| ExtractionError::new(request.url.as_str(), e.to_string()))?;

        let mut stored: Vec<Category> = Vec::with_capacity(raw_categories.len());
        for raw in raw_categories {
            match validate_category(raw) {
                Ok(category) => {
                    tracing::debug!("Category {} ({})", category.name, category.code);
                    self.state.categories.upsert(category.clone());
                    stored.push(category);
                }
                Err(e) => tracing::warn!("Skipping category on {}: {}", request.url, e),
            }
        }

        self.state.progress.add_categories(stored.len());
        tracing::info!("Main page {}: {} categories", request.url, stored.len());

        let mut follow_ups = Vec::new();

        if self.options.follow_categories {
            for category in &stored {
                let url = match Url::parse(&category.url) {
                    Ok(url) => url,
                    Err(e) => {
                        tracing::warn!("Not following {}: {}", category.url, e);
                        continue;
                    }
                };

                if self.options.dedupe_category_urls && !self.first_sighting(&url) {
                    tracing::debug!("Already enqueued {}", url);
                    continue;
                }

                follow_ups.push(CrawlRequest::category(url, &category.name, &category.code));
            }
        }

        if let Some(next) = self.extractor.next_page(page) {
            if next != request.url && next != page.url {
                tracing::debug!("Following pagination to {}", next);
                follow_ups.push(CrawlRequest::main(next));
            }
        }

        Ok(follow_ups)
    }

    fn handle_category(
        &mut self,
        page: &Page,
        request: &CrawlRequest,
        parent_name: &str,
        parent_code: &str,
    ) -> Result<Vec<CrawlRequest>, ExtractionError> {
        let raw_subcategories = self
            .extractor
            .extract_subcategories(page, parent_name, parent_code)
            .map_err(|e| ExtractionError::new(request.url.as_str(), e.to_string()))?;

        let mut names = HashSet::new();
        let mut subcategories: Vec<Subcategory> = Vec::with_capacity(raw_subcategories.len());
        for raw in raw_subcategories {
            match validate_subcategory(raw) {
                Ok(subcategory) if names.insert(subcategory.name.clone()) => {
                    subcategories.push(subcategory)
                }
                Ok(subcategory) => {
                    tracing::debug!("Duplicate subcategory {} on {}", subcategory.name, request.url)
                }
                Err(e) => tracing::warn!("Skipping subcategory on {}: {}", request.url, e),
            }
        }

        let count = subcategories.len();
        if count > 0 {
            self.state.subcategories.append(parent_code, subcategories);
        }
        self.state.progress.add_subcategories(count);
        self.state.progress.mark_category_processed();

        tracing::info!(
            "Category {} ({}): {} subcategories",
            parent_name,
            parent_code,
            count
        );

        Ok(Vec::new())
    }

    /// Records a derived request URL; false if it was seen before
    fn first_sighting(&mut self, url: &Url) -> bool {
        let key = normalize_url(url.as_str())
            .map(String::from)
            .unwrap_or_else(|_| url.to_string());
        self.seen_category_urls.insert(key)
    }
}

impl<E: Extractor + ?Sized> PageHandler for Dispatcher<'_, E> {
    fn handle(
        &mut self,
        fetched: &FetchedPage,
        request: &CrawlRequest,
    ) -> Result<Vec<CrawlRequest>, ExtractionError> {
        let page = Page::parse(fetched.url.clone(), &fetched.body);

        match &request.tag {
            RequestTag::Main => self.handle_main(&page, request),
            RequestTag::Category {
                parent_name,
                parent_code,
            } => self.handle_category(&page, request, parent_name, parent_code),
        }
    }

    fn on_failure(&mut self, request: &CrawlRequest, failure: &CrawlFailure) {
        tracing::error!("Request failed: {}: {}", request.url, failure);
        self.state.progress.record_failure(request.url.as_str());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::ExtractError;
    use crate::records::{RawCategory, RawSubcategory};
    use crate::state::{CrawlProgress, ProgressTracker};
    use std::sync::{Arc, Mutex};

    /// Reads records out of a line-based body: `cat CODE NAME` and `sub NAME`
    struct LineExtractor;

    impl Extractor for LineExtractor {
        fn extract_categories(&self, page: &Page) -> Result<Vec<RawCategory>, ExtractError> {
            let text: String = page.document.root_element().text().collect();
            if text.contains("garbled") {
                return Err(ExtractError::MissingStructure("garbled".to_string()));
            }
            Ok(text
                .lines()
                .filter_map(|line| line.trim().strip_prefix("cat "))
                .map(|rest| {
                    let (code, name) = rest.split_once(' ').unwrap_or((rest, ""));
                    RawCategory {
                        code: Some(code.to_string()),
                        name: Some(name.to_string()),
                        url: Some(format!("https://shop.example/{}.html", code.to_lowercase())),
                        ..RawCategory::default()
                    }
                })
                .collect())
        }

        fn extract_subcategories(
            &self,
            page: &Page,
            parent_name: &str,
            parent_code: &str,
        ) -> Result<Vec<RawSubcategory>, ExtractError> {
            let text: String = page.document.root_element().text().collect();
            Ok(text
                .lines()
                .filter_map(|line| line.trim().strip_prefix("sub "))
                .map(|name| RawSubcategory {
                    name: Some(name.to_string()),
                    url: Some(format!("https://shop.example/{}.html", name)),
                    parent_category: Some(parent_name.to_string()),
                    parent_category_code: Some(parent_code.to_string()),
                    ..RawSubcategory::default()
                })
                .collect())
        }
    }

    fn fetched(url: &str, body: &str) -> FetchedPage {
        FetchedPage {
            url: Url::parse(url).unwrap(),
            status: 200,
            body: format!("<html><body><pre>{}</pre></body></html>", body),
        }
    }

    fn main_request() -> CrawlRequest {
        CrawlRequest::main(Url::parse("https://shop.example/").unwrap())
    }

    #[test]
    fn test_main_page_stores_and_enqueues() {
        let mut state = CrawlState::default();
        let mut dispatcher = Dispatcher::new(&LineExtractor, &mut state, DispatchOptions::default());

        let follow_ups = dispatcher
            .handle(
                &fetched("https://shop.example/", "cat GI Guitars\ncat DR Drums\ncat XY \n"),
                &main_request(),
            )
            .unwrap();

        assert_eq!(follow_ups.len(), 2);
        assert_eq!(follow_ups[0].url.as_str(), "https://shop.example/gi.html");
        assert_eq!(
            follow_ups[1].tag,
            RequestTag::Category {
                parent_name: "Drums".to_string(),
                parent_code: "DR".to_string(),
            }
        );

        assert_eq!(state.categories.len(), 2);
        assert_eq!(state.progress.progress().total_categories, 2);
    }

    #[test]
    fn test_categories_only_enqueues_nothing() {
        let mut state = CrawlState::default();
        let options = DispatchOptions {
            follow_categories: false,
            ..DispatchOptions::default()
        };
        let mut dispatcher = Dispatcher::new(&LineExtractor, &mut state, options);

        let follow_ups = dispatcher
            .handle(&fetched("https://shop.example/", "cat GI Guitars"), &main_request())
            .unwrap();

        assert!(follow_ups.is_empty());
        assert_eq!(state.categories.len(), 1);
    }

    #[test]
    fn test_duplicate_category_urls() {
        let body = "cat GI Guitars\ncat GI Guitars";

        let mut state = CrawlState::default();
        let mut dispatcher = Dispatcher::new(&LineExtractor, &mut state, DispatchOptions::default());
        let follow_ups = dispatcher
            .handle(&fetched("https://shop.example/", body), &main_request())
            .unwrap();
        assert_eq!(follow_ups.len(), 2);

        let options = DispatchOptions {
            dedupe_category_urls: true,
            ..DispatchOptions::default()
        };
        let mut state = CrawlState::default();
        let mut dispatcher = Dispatcher::new(&LineExtractor, &mut state, options);
        let follow_ups = dispatcher
            .handle(&fetched("https://shop.example/", body), &main_request())
            .unwrap();
        assert_eq!(follow_ups.len(), 1);
    }

    #[test]
    fn test_category_page_updates_progress() {
        let seen = Arc::new(Mutex::new(Vec::<CrawlProgress>::new()));
        let sink = Arc::clone(&seen);
        let tracker = ProgressTracker::with_observer(Arc::new(move |p: &CrawlProgress| {
            sink.lock().unwrap().push(p.clone())
        }));
        let mut state = CrawlState::new(tracker);
        let mut dispatcher = Dispatcher::new(&LineExtractor, &mut state, DispatchOptions::default());

        let request = CrawlRequest::category(
            Url::parse("https://shop.example/dj.html").unwrap(),
            "DJ Equipment",
            "DJ",
        );
        dispatcher
            .handle(
                &fetched("https://shop.example/dj.html", "sub Sets\nsub Mixers\nsub Sets"),
                &request,
            )
            .unwrap();

        let stored = state.subcategories.get("DJ").unwrap();
        assert_eq!(stored.len(), 2);
        assert_eq!(stored[0].parent_category, "DJ Equipment");

        let progress = state.progress.snapshot();
        assert_eq!(progress.total_subcategories, 2);
        assert_eq!(progress.processed_categories, 1);

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 2);
        assert_eq!(seen[0].total_subcategories, 2);
        assert_eq!(seen[0].processed_categories, 0);
    }

    #[test]
    fn test_empty_category_page_still_counts() {
        let mut state = CrawlState::default();
        let mut dispatcher = Dispatcher::new(&LineExtractor, &mut state, DispatchOptions::default());
        let request = CrawlRequest::category(
            Url::parse("https://shop.example/pa.html").unwrap(),
            "PA",
            "PA",
        );

        dispatcher
            .handle(&fetched("https://shop.example/pa.html", ""), &request)
            .unwrap();

        assert!(state.subcategories.get("PA").is_none());
        assert_eq!(state.progress.progress().processed_categories, 1);
    }

    #[test]
    fn test_extraction_failure_is_wrapped() {
        let mut state = CrawlState::default();
        let mut dispatcher = Dispatcher::new(&LineExtractor, &mut state, DispatchOptions::default());

        let error = dispatcher
            .handle(&fetched("https://shop.example/", "garbled"), &main_request())
            .unwrap_err();

        assert_eq!(error.url, "https://shop.example/");
        assert!(error.message.contains("garbled"));
        assert!(state.categories.is_empty());
        assert_eq!(state.progress.progress().total_categories, 0);
    }

    #[test]
    fn test_terminal_failure_recorded() {
        let mut state = CrawlState::default();
        let mut dispatcher = Dispatcher::new(&LineExtractor, &mut state, DispatchOptions::default());
        let request = main_request();
        let failure = CrawlFailure::Extraction(ExtractionError::new("https://shop.example/", "x"));

        dispatcher.on_failure(&request, &failure);

        assert_eq!(
            state.progress.progress().failed_requests,
            vec!["https://shop.example/".to_string()]
        );
    }
}
