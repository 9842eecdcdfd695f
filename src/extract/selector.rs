//! CSS-selector driven extractor
//!
//! The selectors come from the `[selectors]` configuration section, so one
//! implementation covers any shop whose listing markup can be described by them.

use crate::config::SelectorConfig;
use crate::extract::{infer_code, ExtractError, Extractor, Page};
use crate::records::{RawCategory, RawSubcategory};
use crate::url::resolve_link;
use scraper::{ElementRef, Selector};
use url::Url;

pub struct SelectorExtractor {
    source: String,
    code_attribute: String,
    category_link: Selector,
    category_group: Selector,
    category_group_title: Selector,
    category_group_link: Selector,
    product_count: Selector,
    next_page: Selector,
    subcategory_item: Selector,
    subcategory_name: Selector,
    subcategory_link: Selector,
    subcategory_image: Selector,
    subcategory_image_webp: Selector,
    subcategory_count: Selector,
}

fn parse_selector(name: &str, selector: &str) -> Result<Selector, ExtractError> {
    Selector::parse(selector)
        .map_err(|e| ExtractError::Selector(format!("{} '{}': {:?}", name, selector, e)))
}

impl SelectorExtractor {
    /// Compiles the configured selectors
    ///
    /// # Arguments
    ///
    /// * `config` - The selector configuration
    /// * `source` - Site name recorded on every extracted record
    pub fn new(config: &SelectorConfig, source: &str) -> Result<Self, ExtractError> {
        Ok(Self {
            source: source.to_string(),
            code_attribute: config.code_attribute.clone(),
            category_link: parse_selector("category-link", &config.category_link)?,
            category_group: parse_selector("category-group", &config.category_group)?,
            category_group_title: parse_selector(
                "category-group-title",
                &config.category_group_title,
            )?,
            category_group_link: parse_selector(
                "category-group-link",
                &config.category_group_link,
            )?,
            product_count: parse_selector("product-count", &config.product_count)?,
            next_page: parse_selector("next-page", &config.next_page)?,
            subcategory_item: parse_selector("subcategory-item", &config.subcategory_item)?,
            subcategory_name: parse_selector("subcategory-name", &config.subcategory_name)?,
            subcategory_link: parse_selector("subcategory-link", &config.subcategory_link)?,
            subcategory_image: parse_selector("subcategory-image", &config.subcategory_image)?,
            subcategory_image_webp: parse_selector(
                "subcategory-image-webp",
                &config.subcategory_image_webp,
            )?,
            subcategory_count: parse_selector("subcategory-count", &config.subcategory_count)?,
        })
    }

    fn category_from_link(
        &self,
        link: ElementRef<'_>,
        base_url: &Url,
        parent: Option<&str>,
    ) -> RawCategory {
        let href = link.value().attr("href").unwrap_or_default();
        let url = resolve_link(href, base_url);

        let name = non_empty(self.link_label(link))
            .or_else(|| link.value().attr("title").map(str::to_string));

        let code = link
            .value()
            .attr(&self.code_attribute)
            .and_then(|code| non_empty(code.trim().to_string()))
            .or_else(|| {
                url.as_ref()
                    .map(|u| infer_code(u.path()))
                    .or_else(|| non_empty(href.trim().to_string()).map(|h| infer_code(&h)))
            });

        let product_count = link
            .select(&self.product_count)
            .next()
            .and_then(|count| parse_count(&element_text(count)));

        RawCategory {
            code,
            name,
            url: url.map(String::from),
            parent_category: parent.map(str::to_string),
            level: Some(u32::from(parent.is_some())),
            product_count,
            scraped_at: None,
            source: Some(self.source.clone()),
        }
    }

    /// Link text without any nested product count label
    fn link_label(&self, link: ElementRef<'_>) -> String {
        let counts: Vec<_> = link.select(&self.product_count).map(|count| count.id()).collect();
        let parts: Vec<&str> = link
            .descendants()
            .filter(|node| !node.ancestors().any(|ancestor| counts.contains(&ancestor.id())))
            .filter_map(|node| node.value().as_text().map(|text| &**text))
            .collect();
        collapse_whitespace(&parts.join(" "))
    }

    fn subcategory_from_item(
        &self,
        item: ElementRef<'_>,
        base_url: &Url,
        parent_name: &str,
        parent_code: &str,
    ) -> RawSubcategory {
        let link = if item.value().name() == "a" {
            Some(item)
        } else {
            item.select(&self.subcategory_link).next()
        };

        let url = link
            .and_then(|a| a.value().attr("href"))
            .and_then(|href| resolve_link(href, base_url));

        let name = item
            .select(&self.subcategory_name)
            .next()
            .map(element_text)
            .and_then(non_empty)
            .or_else(|| link.map(element_text).and_then(non_empty))
            .or_else(|| link.and_then(|a| a.value().attr("title")).map(str::to_string));

        let image_url = item
            .select(&self.subcategory_image)
            .next()
            .and_then(|img| img.value().attr("src").or_else(|| img.value().attr("data-src")))
            .and_then(|src| resolve_link(src, base_url));

        let image_url_webp = item
            .select(&self.subcategory_image_webp)
            .next()
            .and_then(|source| {
                source
                    .value()
                    .attr("srcset")
                    .or_else(|| source.value().attr("data-srcset"))
            })
            .and_then(first_srcset_candidate)
            .and_then(|src| resolve_link(src, base_url));

        let product_count = item
            .select(&self.subcategory_count)
            .next()
            .and_then(|count| parse_count(&element_text(count)));

        RawSubcategory {
            name,
            url: url.map(String::from),
            image_url: image_url.map(String::from),
            image_url_webp: image_url_webp.map(String::from),
            parent_category: Some(parent_name.to_string()),
            parent_category_code: Some(parent_code.to_string()),
            product_count,
            scraped_at: None,
            source: Some(self.source.clone()),
        }
    }
}

impl Extractor for SelectorExtractor {
    fn extract_categories(&self, page: &Page) -> Result<Vec<RawCategory>, ExtractError> {
        let mut categories: Vec<RawCategory> = page
            .document
            .select(&self.category_link)
            .map(|link| self.category_from_link(link, &page.url, None))
            .collect();

        for group in page.document.select(&self.category_group) {
            let title = group
                .select(&self.category_group_title)
                .next()
                .map(element_text)
                .and_then(non_empty);

            for link in group.select(&self.category_group_link) {
                categories.push(self.category_from_link(link, &page.url, title.as_deref()));
            }
        }

        if categories.is_empty() {
            return Err(ExtractError::MissingStructure(format!(
                "no category links found on {}",
                page.url
            )));
        }

        tracing::debug!("Extracted {} raw categories from {}", categories.len(), page.url);
        Ok(categories)
    }

    fn extract_subcategories(
        &self,
        page: &Page,
        parent_name: &str,
        parent_code: &str,
    ) -> Result<Vec<RawSubcategory>, ExtractError> {
        let subcategories: Vec<RawSubcategory> = page
            .document
            .select(&self.subcategory_item)
            .map(|item| self.subcategory_from_item(item, &page.url, parent_name, parent_code))
            .collect();

        tracing::debug!(
            "Extracted {} raw subcategories from {}",
            subcategories.len(),
            page.url
        );
        Ok(subcategories)
    }

    fn next_page(&self, page: &Page) -> Option<Url> {
        page.document
            .select(&self.next_page)
            .next()
            .and_then(|a| a.value().attr("href"))
            .and_then(|href| resolve_link(href, &page.url))
    }
}

/// Text content of an element with whitespace collapsed
fn element_text(element: ElementRef<'_>) -> String {
    collapse_whitespace(&element.text().collect::<Vec<_>>().join(" "))
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn non_empty(value: String) -> Option<String> {
    if value.is_empty() {
        None
    } else {
        Some(value)
    }
}

/// Reads the digits out of a count label such as "(1.234)" or "142 Artikel"
fn parse_count(text: &str) -> Option<u64> {
    let digits: String = text.chars().filter(char::is_ascii_digit).collect();
    digits.parse().ok()
}

/// First URL of a `srcset` attribute
fn first_srcset_candidate(srcset: &str) -> Option<&str> {
    srcset
        .split(',')
        .next()
        .and_then(|candidate| candidate.split_whitespace().next())
}
