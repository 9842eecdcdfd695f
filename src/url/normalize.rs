use crate::UrlError;
use url::Url;

/// Query parameters that only carry tracking information
const TRACKING_PARAMS: &[&str] = &["fbclid", "gclid", "mc_eid", "ref", "sid"];

/// Normalizes a URL for comparison
///
/// # Normalization Steps
///
/// 1. Parse the URL; reject if malformed
/// 2. Require an HTTP(S) scheme and a host (the host is lowercased by parsing)
/// 3. Collapse empty and dot path segments
/// 4. Remove the fragment
/// 5. Remove tracking query parameters and sort the rest
///
/// Unlike a general crawler normalizer this keeps the scheme, `www.` prefix and
/// trailing slashes, since shops route on them.
///
/// # Examples
///
/// ```
/// use shelf_mapper::url::normalize_url;
///
/// let url = normalize_url("https://WWW.Shop.example/de//dj.html?b=2&a=1#top").unwrap();
/// assert_eq!(url.as_str(), "https://www.shop.example/de/dj.html?a=1&b=2");
/// ```
pub fn normalize_url(url_str: &str) -> Result<Url, UrlError> {
    let mut url = Url::parse(url_str.trim()).map_err(|e| UrlError::Parse(e.to_string()))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(UrlError::InvalidScheme(format!(
            "Only HTTP and HTTPS schemes are supported, got: {}",
            url.scheme()
        )));
    }

    if url.host_str().is_none() {
        return Err(UrlError::MissingHost);
    }

    let normalized_path = normalize_path(url.path());
    url.set_path(&normalized_path);

    url.set_fragment(None);

    if url.query().is_some() {
        let params = filter_and_sort_query_params(&url);
        if params.is_empty() {
            url.set_query(None);
        } else {
            url.query_pairs_mut().clear().extend_pairs(params);
        }
    }

    Ok(url)
}

/// Removes empty segments (from repeated slashes) and dot segments
fn normalize_path(path: &str) -> String {
    let trailing_slash = path.len() > 1 && path.ends_with('/');
    let mut segments: Vec<&str> = Vec::new();

    for segment in path.split('/') {
        match segment {
            "" | "." => continue,
            ".." => {
                segments.pop();
            }
            _ => segments.push(segment),
        }
    }

    if segments.is_empty() {
        return "/".to_string();
    }

    let mut result = format!("/{}", segments.join("/"));
    if trailing_slash {
        result.push('/');
    }
    result
}

fn filter_and_sort_query_params(url: &Url) -> Vec<(String, String)> {
    let mut params: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(key, _)| !is_tracking_param(key))
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();

    params.sort_by(|a, b| a.0.cmp(&b.0));
    params
}

fn is_tracking_param(key: &str) -> bool {
    TRACKING_PARAMS.contains(&key) || key.starts_with("utm_")
}

/// Resolves an href found on a page to an absolute URL
///
/// Returns None if the link should be ignored:
/// - empty or fragment-only hrefs
/// - javascript:, mailto:, tel: and data: links
/// - anything that does not resolve to HTTP(S)
pub fn resolve_link(href: &str, base_url: &Url) -> Option<Url> {
    let href = href.trim();

    if href.is_empty() || href.starts_with('#') {
        return None;
    }

    if href.starts_with("javascript:")
        || href.starts_with("mailto:")
        || href.starts_with("tel:")
        || href.starts_with("data:")
    {
        return None;
    }

    let absolute = base_url.join(href).ok()?;
    match absolute.scheme() {
        "http" | "https" => Some(absolute),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_url() -> Url {
        Url::parse("https://www.thomann.de/de/index.html").unwrap()
    }

    #[test]
    fn test_keep_scheme_and_www() {
        let result = normalize_url("http://www.example.com/page").unwrap();
        assert_eq!(result.as_str(), "http://www.example.com/page");
    }

    #[test]
    fn test_lowercase_host() {
        let result = normalize_url("https://EXAMPLE.COM/Page").unwrap();
        assert_eq!(result.as_str(), "https://example.com/Page");
    }

    #[test]
    fn test_remove_fragment() {
        let result = normalize_url("https://example.com/page#section").unwrap();
        assert_eq!(result.as_str(), "https://example.com/page");
    }

    #[test]
    fn test_remove_tracking_params() {
        let result =
            normalize_url("https://example.com/page?utm_source=a&fbclid=b&gclid=c").unwrap();
        assert_eq!(result.as_str(), "https://example.com/page");
    }

    #[test]
    fn test_sort_query_params() {
        let result = normalize_url("https://example.com/page?b=2&a=1&utm_medium=x").unwrap();
        assert_eq!(result.as_str(), "https://example.com/page?a=1&b=2");
    }

    #[test]
    fn test_collapse_path_segments() {
        let result = normalize_url("https://example.com///a/../b/./c.html").unwrap();
        assert_eq!(result.as_str(), "https://example.com/b/c.html");
    }

    #[test]
    fn test_trailing_slash_kept() {
        let result = normalize_url("https://example.com/de/").unwrap();
        assert_eq!(result.as_str(), "https://example.com/de/");
    }

    #[test]
    fn test_invalid_scheme() {
        let result = normalize_url("ftp://example.com/page");
        assert!(matches!(result.unwrap_err(), UrlError::InvalidScheme(_)));
    }

    #[test]
    fn test_malformed_url() {
        assert!(matches!(
            normalize_url("not a url").unwrap_err(),
            UrlError::Parse(_)
        ));
    }

    #[test]
    fn test_resolve_relative_link() {
        let resolved = resolve_link("/de/dj_mixer.html", &base_url()).unwrap();
        assert_eq!(resolved.as_str(), "https://www.thomann.de/de/dj_mixer.html");

        let sibling = resolve_link("drums_und_percussion.html", &base_url()).unwrap();
        assert_eq!(
            sibling.as_str(),
            "https://www.thomann.de/de/drums_und_percussion.html"
        );
    }

    #[test]
    fn test_resolve_absolute_link() {
        let resolved = resolve_link("https://other.example/x.html", &base_url()).unwrap();
        assert_eq!(resolved.as_str(), "https://other.example/x.html");
    }

    #[test]
    fn test_skip_special_links() {
        for href in [
            "",
            "   ",
            "#top",
            "javascript:void(0)",
            "mailto:shop@example.com",
            "tel:+49123",
            "data:text/html,<h1>x</h1>",
        ] {
            assert!(resolve_link(href, &base_url()).is_none(), "{}", href);
        }
    }
}
