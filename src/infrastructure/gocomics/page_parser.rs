//! Extraction of the strip image URL from a strip page.

use std::sync::OnceLock;

use regex::Regex;
use reqwest::Url;

use crate::domain::ports::FetchError;

const IMAGE_PROPERTY: &str = "og:image";

fn meta_regex() -> &'static Regex {
    static META_REGEX: OnceLock<Regex> = OnceLock::new();
    META_REGEX.get_or_init(|| Regex::new(r"(?is)<meta\s[^>]*>").expect("Invalid regex"))
}

fn attr_regex() -> &'static Regex {
    static ATTR_REGEX: OnceLock<Regex> = OnceLock::new();
    ATTR_REGEX.get_or_init(|| {
        Regex::new(r#"(?is)([a-z][a-z0-9:_-]*)\s*=\s*(?:"([^"]*)"|'([^']*)')"#)
            .expect("Invalid regex")
    })
}

/// Returns the `og:image` URL of `html`, resolved against `page_url`.
///
/// Attribute order does not matter and both `property` and `name` are
/// accepted. `og:image:width` and friends are ignored.
///
/// # Errors
/// Returns a parse error if the page has no usable `og:image`.
pub fn extract_image_url(html: &str, page_url: &Url) -> Result<Url, FetchError> {
    let content = meta_regex()
        .find_iter(html)
        .find_map(|tag| og_image_content(tag.as_str()))
        .ok_or_else(|| FetchError::parse("no og:image meta property found"))?;

    let content = unescape_entities(content.trim());
    if content.is_empty() {
        return Err(FetchError::parse("empty og:image content"));
    }

    page_url
        .join(&content)
        .map_err(|e| FetchError::parse(format!("invalid og:image URL {content:?}: {e}")))
}

fn og_image_content(tag: &str) -> Option<String> {
    let mut is_image = false;
    let mut content = None;

    for caps in attr_regex().captures_iter(tag) {
        let Some(name) = caps.get(1) else {
            continue;
        };
        let value = caps.get(2).or_else(|| caps.get(3)).map_or("", |m| m.as_str());

        match name.as_str().to_ascii_lowercase().as_str() {
            "property" | "name" if value.trim().eq_ignore_ascii_case(IMAGE_PROPERTY) => {
                is_image = true;
            }
            "content" => content = Some(value.to_string()),
            _ => {}
        }
    }

    if is_image { content } else { None }
}

fn unescape_entities(value: &str) -> String {
    if !value.contains('&') {
        return value.to_string();
    }
    value
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&#x27;", "'")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&amp;", "&")
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    fn page() -> Url {
        Url::parse("https://www.gocomics.com/garfield/1978/06/19").unwrap()
    }

    #[test_case(
        r#"<meta property="og:image" content="https://assets.example.com/strip.gif">"#,
        "https://assets.example.com/strip.gif" ;
        "property first"
    )]
    #[test_case(
        r#"<meta content='https://assets.example.com/a.png' property='og:image' />"#,
        "https://assets.example.com/a.png" ;
        "content first single quotes"
    )]
    #[test_case(
        r#"<META NAME="og:image" CONTENT="/img/strip.jpg">"#,
        "https://www.gocomics.com/img/strip.jpg" ;
        "relative url and uppercase"
    )]
    #[test_case(
        r#"<meta property="og:image" content="https://x.test/i?w=900&amp;h=300">"#,
        "https://x.test/i?w=900&h=300" ;
        "ampersand entity"
    )]
    fn test_extract_image_url(html: &str, expected: &str) {
        assert_eq!(extract_image_url(html, &page()).unwrap().as_str(), expected);
    }

    #[test]
    fn test_ignores_image_dimension_properties() {
        let html = r#"
            <head>
                <meta property="og:image:width" content="900">
                <meta property="og:title" content="Garfield">
                <meta
                    property="og:image"
                    content="https://featureassets.gocomics.com/assets/abc">
            </head>
        "#;
        assert_eq!(
            extract_image_url(html, &page()).unwrap().as_str(),
            "https://featureassets.gocomics.com/assets/abc"
        );
    }

    #[test]
    fn test_missing_or_empty_image_is_parse_error() {
        let missing = extract_image_url("<html><title>Garfield</title></html>", &page());
        assert!(matches!(missing, Err(FetchError::Parse { .. })));

        let empty = extract_image_url(r#"<meta property="og:image" content="  ">"#, &page());
        assert!(matches!(empty, Err(FetchError::Parse { .. })));
    }
}
