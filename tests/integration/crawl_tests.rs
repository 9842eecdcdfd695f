//! Integration tests for the crawler
//!
//! The wiremock tests run the full HTTP cycle end-to-end; the others use an
//! in-memory fetcher to pin down dispatch, budget and export behavior.

use async_trait::async_trait;
use serde_json::Value;
use shelf_mapper::config::{Config, OutputFormat};
use shelf_mapper::crawler::{
    export_outcome, run_crawl, CrawlMode, FetchError, FetchedPage, Orchestrator, PageFetcher,
};
use shelf_mapper::extract::SelectorExtractor;
use shelf_mapper::state::CrawlProgress;
use shelf_mapper::storage::SqliteDataset;
use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex};
use url::Url;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const SHOP: &str = "https://shop.example";

fn main_page(links: &[(&str, &str)]) -> String {
    let anchors: String = links
        .iter()
        .map(|(href, name)| format!(r#"<a href="{}">{}</a>"#, href, name))
        .collect();
    format!(
        r#"<html><body><nav class="main-categories">{}</nav></body></html>"#,
        anchors
    )
}

fn category_page(subcategories: &[(&str, &str)]) -> String {
    let items: String = subcategories
        .iter()
        .map(|(href, name)| {
            format!(
                r#"<div class="subcategory"><a href="{}"><picture><img src="/img/{}.jpg"></picture><span class="subcategory__name">{}</span><span class="subcategory__count">42 Artikel</span></a></div>"#,
                href, name, name
            )
        })
        .collect();
    format!(
        r#"<html><body><div class="subcategory-list">{}</div></body></html>"#,
        items
    )
}

fn html(body: String) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_raw(body, "text/html")
}

/// Creates a test configuration writing into `dir`
fn create_test_config(base_url: &str, dir: &Path) -> Config {
    let mut config = Config::default();
    config.site.name = "TestShop".to_string();
    config.site.base_url = base_url.to_string();
    config.crawler.retry_delay_ms = 10;
    config.crawler.request_timeout_secs = 5;
    config.output.database_path = dir.join("shelf.db").display().to_string();
    config.output.export_dir = dir.join("export").display().to_string();
    config
}

/// Serves pages from memory; unknown URLs are 404
#[derive(Default)]
struct StubFetcher {
    pages: HashMap<String, String>,
    requested: Mutex<Vec<String>>,
}

impl StubFetcher {
    fn page(mut self, url: &str, body: String) -> Self {
        self.pages.insert(url.to_string(), body);
        self
    }

    fn requested(&self) -> Vec<String> {
        self.requested.lock().unwrap().clone()
    }
}

#[async_trait]
impl PageFetcher for StubFetcher {
    async fn fetch(&self, url: &Url) -> Result<FetchedPage, FetchError> {
        self.requested.lock().unwrap().push(url.to_string());
        match self.pages.get(url.as_str()) {
            Some(body) => Ok(FetchedPage {
                url: url.clone(),
                status: 200,
                body: body.clone(),
            }),
            None => Err(FetchError::Status {
                url: url.to_string(),
                status: 404,
            }),
        }
    }
}

fn stub_orchestrator(
    fetcher: StubFetcher,
    config: Config,
) -> (Orchestrator<SelectorExtractor>, Arc<StubFetcher>) {
    let fetcher = Arc::new(fetcher);
    let extractor = SelectorExtractor::new(&config.selectors, &config.site.name).unwrap();
    let orchestrator = Orchestrator::new(config, extractor, fetcher.clone());
    (orchestrator, fetcher)
}

fn guitars_and_drums() -> StubFetcher {
    StubFetcher::default()
        .page(
            &format!("{}/de/index.html", SHOP),
            main_page(&[("/de/GI_guitars.html", "Guitars"), ("/de/DR_drums.html", "Drums")]),
        )
        .page(
            &format!("{}/de/GI_guitars.html", SHOP),
            category_page(&[("/de/e_guitars.html", "E-Guitars")]),
        )
        .page(
            &format!("{}/de/DR_drums.html", SHOP),
            category_page(&[("/de/cymbals.html", "Cymbals")]),
        )
}

#[tokio::test]
async fn test_full_crawl_with_http_server() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    Mock::given(method("GET"))
        .and(path("/de/index.html"))
        .respond_with(html(main_page(&[
            ("/de/GI_guitars.html", "Guitars"),
            ("/de/DR_drums.html", "Drums"),
        ])))
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/de/GI_guitars.html"))
        .respond_with(html(category_page(&[("/de/e_guitars.html", "E-Guitars")])))
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/de/DR_drums.html"))
        .respond_with(html(category_page(&[("/de/cymbals.html", "Cymbals")])))
        .expect(1)
        .mount(&mock_server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let mut config = create_test_config(&format!("{}/de/index.html", base_url), dir.path());
    config.extraction.build_tree = true;

    let orchestrator = Orchestrator::from_config(config).unwrap();
    let summary = run_crawl(&orchestrator, "test-hash").await.unwrap();

    assert_eq!(summary.categories, 2);
    assert_eq!(summary.subcategories, 2);
    assert_eq!(
        summary.progress,
        CrawlProgress {
            total_categories: 2,
            processed_categories: 2,
            total_subcategories: 2,
            failed_requests: vec![],
        }
    );
    assert_eq!(summary.requests_succeeded, 3);
    assert_eq!(summary.tree_nodes, Some(4));

    let export = dir.path().join("export");
    let categories: Vec<Value> =
        serde_json::from_str(&std::fs::read_to_string(export.join("categories.json")).unwrap())
            .unwrap();
    let codes: Vec<&str> = categories
        .iter()
        .map(|c| c["code"].as_str().unwrap())
        .collect();
    assert_eq!(codes, vec!["GI", "DR"]);
    assert_eq!(categories[0]["source"], "TestShop");

    let subcategories: Vec<Value> = serde_json::from_str(
        &std::fs::read_to_string(export.join("subcategories.json")).unwrap(),
    )
    .unwrap();
    assert_eq!(subcategories.len(), 2);
    assert!(subcategories
        .iter()
        .any(|s| s["parentCategoryCode"] == "DR" && s["name"] == "Cymbals"));
    assert!(subcategories.iter().all(|s| s["productCount"] == 42));

    let tree: Value =
        serde_json::from_str(&std::fs::read_to_string(export.join("category-tree.json")).unwrap())
            .unwrap();
    assert_eq!(tree["totalCategories"], 2);
    assert_eq!(tree["root"].as_array().unwrap().len(), 2);
    assert_eq!(tree["root"][1]["code"], "DR");
    assert_eq!(tree["root"][1]["subcategories"][0]["name"], "Cymbals");
    assert!(export.join("category-tree.md").exists());

    let db = SqliteDataset::open(&dir.path().join("shelf.db")).unwrap();
    let run = db.get_latest_run().unwrap().unwrap();
    assert_eq!(run.config_hash, "test-hash");
    assert_eq!(run.counts.categories, 2);
}

#[tokio::test]
async fn test_failed_category_page_is_recorded_once() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    Mock::given(method("GET"))
        .and(path("/de/index.html"))
        .respond_with(html(main_page(&[
            ("/de/GI_guitars.html", "Guitars"),
            ("/de/DR_drums.html", "Drums"),
        ])))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/de/GI_guitars.html"))
        .respond_with(html(category_page(&[("/de/e_guitars.html", "E-Guitars")])))
        .mount(&mock_server)
        .await;

    // One attempt plus two retries
    Mock::given(method("GET"))
        .and(path("/de/DR_drums.html"))
        .respond_with(ResponseTemplate::new(503))
        .expect(3)
        .mount(&mock_server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let mut config = create_test_config(&format!("{}/de/index.html", base_url), dir.path());
    config.crawler.max_retries = 2;

    let orchestrator = Orchestrator::from_config(config).unwrap();
    let summary = run_crawl(&orchestrator, "test-hash").await.unwrap();

    let drums_url = format!("{}/de/DR_drums.html", base_url);
    assert_eq!(summary.progress.failed_requests, vec![drums_url]);
    assert_eq!(summary.progress.processed_categories, 1);
    assert_eq!(summary.progress.total_subcategories, 1);
    assert_eq!(summary.requests_failed, 1);
    assert_eq!(summary.requests_retried, 2);

    // Partial results are still exported
    let subcategories: Vec<Value> = serde_json::from_str(
        &std::fs::read_to_string(dir.path().join("export/subcategories.json")).unwrap(),
    )
    .unwrap();
    assert_eq!(subcategories.len(), 1);
    assert_eq!(subcategories[0]["parentCategoryCode"], "GI");
}

#[tokio::test]
async fn test_non_html_response_is_not_retried() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/de/index.html"))
        .respond_with(ResponseTemplate::new(200).set_body_raw("{}", "application/json"))
        .expect(1)
        .mount(&mock_server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let config = create_test_config(
        &format!("{}/de/index.html", mock_server.uri()),
        dir.path(),
    );

    let orchestrator = Orchestrator::from_config(config).unwrap();
    let outcome = orchestrator.crawl().await.unwrap();

    assert_eq!(outcome.engine.failed, 1);
    assert_eq!(outcome.engine.retried, 0);
    assert!(outcome.state.categories.is_empty());
}

#[tokio::test]
async fn test_end_to_end_state() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = create_test_config(&format!("{}/de/index.html", SHOP), dir.path());
    config.extraction.build_tree = true;
    let (orchestrator, _) = stub_orchestrator(guitars_and_drums(), config);

    let outcome = orchestrator.crawl().await.unwrap();
    let state = &outcome.state;

    assert_eq!(state.categories.len(), 2);
    assert_eq!(state.categories.get("GI").unwrap().name, "Guitars");
    assert_eq!(state.subcategories.parent_count(), 2);
    assert_eq!(state.subcategories.get("GI").unwrap().len(), 1);
    assert_eq!(state.subcategories.get("DR").unwrap().len(), 1);
    assert_eq!(
        state.subcategories.get("DR").unwrap()[0].url,
        format!("{}/de/cymbals.html", SHOP)
    );
    assert_eq!(
        state.progress.snapshot(),
        CrawlProgress {
            total_categories: 2,
            processed_categories: 2,
            total_subcategories: 2,
            failed_requests: vec![],
        }
    );

    let tree = outcome.tree.unwrap();
    assert_eq!(tree.root.len(), 2);
    assert_eq!(tree.total_categories, 2);
    for root in &tree.root {
        assert_eq!(root.subcategories.len(), 1);
        assert_eq!(
            root.subcategories[0].name(),
            state.subcategories.get(&root.category.code).unwrap()[0].name
        );
    }
}

#[tokio::test]
async fn test_request_budget_limits_category_pages() {
    let mut fetcher = StubFetcher::default().page(
        &format!("{}/de/index.html", SHOP),
        main_page(&[
            ("/de/GI_guitars.html", "Guitars"),
            ("/de/DR_drums.html", "Drums"),
            ("/de/KE_keys.html", "Keys"),
            ("/de/PA_live.html", "PA"),
        ]),
    );
    for code in ["GI_guitars", "DR_drums", "KE_keys", "PA_live"] {
        fetcher = fetcher.page(
            &format!("{}/de/{}.html", SHOP, code),
            category_page(&[("/de/x.html", "X")]),
        );
    }

    let dir = tempfile::tempdir().unwrap();
    let mut config = create_test_config(&format!("{}/de/index.html", SHOP), dir.path());
    config.crawler.max_requests_per_crawl = 3;
    let (orchestrator, fetcher) = stub_orchestrator(fetcher, config);

    let outcome = orchestrator.crawl().await.unwrap();

    assert_eq!(fetcher.requested().len(), 3);
    assert_eq!(outcome.engine.rejected, 2);
    assert_eq!(outcome.state.categories.len(), 4);
    assert_eq!(outcome.state.progress.progress().processed_categories, 2);
    assert!(outcome.state.progress.progress().failed_requests.is_empty());
}

#[tokio::test]
async fn test_categories_only_mode() {
    let dir = tempfile::tempdir().unwrap();
    let config = create_test_config(&format!("{}/de/index.html", SHOP), dir.path());
    let (orchestrator, fetcher) = stub_orchestrator(guitars_and_drums(), config);

    let outcome = orchestrator
        .with_mode(CrawlMode::CategoriesOnly)
        .crawl()
        .await
        .unwrap();

    assert_eq!(fetcher.requested(), vec![format!("{}/de/index.html", SHOP)]);
    assert_eq!(outcome.state.categories.len(), 2);
    assert!(outcome.state.subcategories.is_empty());
}

#[tokio::test]
async fn test_subcategories_only_mode() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = create_test_config(&format!("{}/de/index.html", SHOP), dir.path());
    config.site.seeds = vec![format!("{}/de/DR_drums.html", SHOP)];
    let (orchestrator, _) = stub_orchestrator(guitars_and_drums(), config);

    let outcome = orchestrator
        .with_mode(CrawlMode::SubcategoriesOnly)
        .crawl()
        .await
        .unwrap();

    assert!(outcome.state.categories.is_empty());
    let drums = outcome.state.subcategories.get("DR").unwrap();
    assert_eq!(drums.len(), 1);
    assert_eq!(drums[0].parent_category, "DR drums");
    assert_eq!(outcome.state.progress.progress().processed_categories, 1);
}

#[tokio::test]
async fn test_csv_export() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = create_test_config(&format!("{}/de/index.html", SHOP), dir.path());
    config.output.format = OutputFormat::Csv;
    let (orchestrator, _) = stub_orchestrator(guitars_and_drums(), config.clone());

    let outcome = orchestrator.crawl().await.unwrap();

    let mut sink = SqliteDataset::new_in_memory().unwrap();
    sink.start_run("csv").unwrap();
    let written = export_outcome(&mut sink, &outcome, &config).unwrap();
    assert_eq!(written.len(), 2);

    let csv = std::fs::read_to_string(dir.path().join("export/categories.csv")).unwrap();
    let mut lines = csv.lines();
    assert_eq!(
        lines.next().unwrap(),
        "code,name,url,parentCategory,level,productCount,scrapedAt,source"
    );
    let first = lines.next().unwrap();
    assert!(first.starts_with(&format!("GI,Guitars,{}/de/GI_guitars.html,,0,,", SHOP)));
    assert!(first.ends_with(",TestShop"));

    assert!(dir.path().join("export/subcategories.csv").exists());
}
