use std::sync::LazyLock;
use url::Url;

/// Base used to resolve bare paths. Only its path component ever leaks into
/// results, and only when the identifier has no path of its own.
const PLACEHOLDER_BASE: &str = "http://placeholder.invalid/";

static BASE: LazyLock<Option<Url>> = LazyLock::new(|| Url::parse(PLACEHOLDER_BASE).ok());

/// Reduce a raw view identifier (absolute URL or bare path, optionally with a
/// query string) to its canonical path.
///
/// Identifiers starting with `/` are already paths and are only cut at the
/// first `?` or `#`. Never fails: identifiers the URL parser rejects are
/// treated as paths and cut at the first `?`. Applying this to its own output
/// returns it unchanged.
pub fn extract_path(identifier: &str) -> String {
    // A leading `//` would otherwise resolve as a scheme-relative host.
    if identifier.starts_with('/') {
        let path = identifier
            .find(['?', '#'])
            .map_or(identifier, |end| &identifier[..end]);
        return non_empty_path(path);
    }
    if let Some(url) = BASE.as_ref().and_then(|base| base.join(identifier).ok()) {
        return non_empty_path(url.path());
    }
    let path = identifier
        .split_once('?')
        .map_or(identifier, |(path, _)| path);
    non_empty_path(path)
}

fn non_empty_path(path: &str) -> String {
    if path.is_empty() {
        "/".to_string()
    } else {
        path.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_absolute_url_with_query() {
        assert_eq!(extract_path("https://shop.example.com/about?ref=1#section"), "/about");
    }

    #[test]
    fn test_absolute_url_root() {
        assert_eq!(extract_path("https://shop.example.com/"), "/");
        assert_eq!(extract_path("https://shop.example.com"), "/");
    }

    #[test]
    fn test_deep_path() {
        assert_eq!(
            extract_path("https://shop.example.com/blog/post/123"),
            "/blog/post/123"
        );
    }

    #[test]
    fn test_bare_path_with_query() {
        assert_eq!(extract_path("/products/mug?utm_source=ig"), "/products/mug");
    }

    #[test]
    fn test_bare_path_without_leading_slash() {
        assert_eq!(extract_path("checkout"), "/checkout");
    }

    #[test]
    fn test_empty_and_query_only() {
        assert_eq!(extract_path(""), "/");
        assert_eq!(extract_path("?a=1"), "/");
    }

    #[test]
    fn test_unparseable_falls_back_to_query_split() {
        // An empty host is rejected by the URL parser even with a base.
        assert_eq!(extract_path("http://?x=1"), "http://");
        assert_eq!(extract_path("https://[oops/cart?step=2"), "https://[oops/cart");
    }

    #[test]
    fn test_double_slash_path_is_stable() {
        let once = extract_path("https://shop.example.com//promo/x?y=1");
        assert_eq!(once, "//promo/x");
        assert_eq!(extract_path(&once), "//promo/x");
        assert_eq!(extract_path("//promo/x#top"), "//promo/x");
    }

    #[test]
    fn test_bare_path_drops_fragment() {
        assert_eq!(extract_path("/about#team"), "/about");
    }

    #[test]
    fn test_same_path_from_url_and_bare_path() {
        assert_eq!(extract_path("https://s/a?x=1"), extract_path("/a"));
    }
}
