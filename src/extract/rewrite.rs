//! URL resolution inside extracted fragments.

use std::sync::OnceLock;

use regex::{Captures, Regex};
use scraper::{Html, Selector};
use url::Url;

/// Substrings that mark tracking pixels and spacer images (checked lowercased).
const PIXEL_PATTERNS: &[&str] = &[
    "pixel",
    "tracking",
    "analytics",
    "beacon",
    "spacer",
    "clear.gif",
    "blank.gif",
    "1x1",
    "data:image/gif;base64,r0lgodlhaqabai",
];

/// Attributes that carry a single URL.
const URL_ATTRIBUTES: &str = r#"(?i)\b(data-lazy-src|data-src|src|href|poster)\s*=\s*"([^"]*)""#;
const SRCSET_ATTRIBUTE: &str = r#"(?i)\bsrcset\s*=\s*"([^"]*)""#;

fn url_attribute_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(URL_ATTRIBUTES).expect("url attribute pattern"))
}

fn srcset_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(SRCSET_ATTRIBUTE).expect("srcset pattern"))
}

/// Resolve a possibly relative reference to an absolute URL.
///
/// Returns `None` for blank values and `javascript:` pseudo links. Absolute
/// references (including `data:` URIs) are returned as written.
pub fn resolve_url(base: Option<&Url>, raw: &str) -> Option<String> {
    let raw = raw.trim();
    if raw.is_empty() || raw.to_lowercase().starts_with("javascript:") {
        return None;
    }

    if Url::parse(raw).is_ok() {
        return Some(raw.to_string());
    }

    base?.join(raw).ok().map(|u| u.to_string())
}

/// Rewrite one attribute value found in serialized HTML.
///
/// Serialized attribute values have `&` escaped, so the value is decoded
/// before resolution and re-escaped afterwards.
fn rewrite_value(base: Option<&Url>, value: &str) -> String {
    let decoded = value.replace("&amp;", "&");
    if decoded.trim().is_empty() || decoded.starts_with('#') {
        return value.to_string();
    }
    match resolve_url(base, &decoded) {
        Some(resolved) => resolved.replace('&', "&amp;"),
        None => value.to_string(),
    }
}

fn rewrite_srcset(base: Option<&Url>, value: &str) -> String {
    value
        .split(',')
        .map(str::trim)
        .filter(|candidate| !candidate.is_empty())
        .map(|candidate| {
            let mut parts = candidate.splitn(2, char::is_whitespace);
            let url = parts.next().unwrap_or("");
            match parts.next() {
                Some(descriptor) => {
                    format!("{} {}", rewrite_value(base, url), descriptor.trim())
                }
                None => rewrite_value(base, url),
            }
        })
        .collect::<Vec<_>>()
        .join(", ")
}

/// Make every URL inside a serialized HTML fragment absolute.
///
/// Covers `src`, `href`, `poster`, the lazy-load `data-src` and
/// `data-lazy-src` attributes, and each entry of `srcset`.
pub fn absolutize_fragment(html: &str, base: Option<&Url>) -> String {
    let rewritten = url_attribute_re().replace_all(html, |caps: &Captures| {
        format!("{}=\"{}\"", &caps[1], rewrite_value(base, &caps[2]))
    });

    srcset_re()
        .replace_all(&rewritten, |caps: &Captures| {
            format!("srcset=\"{}\"", rewrite_srcset(base, &caps[1]))
        })
        .into_owned()
}

/// Checks that an image URL is not a tracking pixel or spacer.
pub fn is_content_image(url: &str) -> bool {
    let lowered = url.to_lowercase();
    if PIXEL_PATTERNS.iter().any(|pattern| lowered.contains(pattern)) {
        return false;
    }

    let tiny = ["width=1", "height=1", "w=1&", "h=1&", "&w=1", "&h=1"];
    !(tiny.iter().any(|marker| lowered.contains(marker))
        || lowered.ends_with("?w=1")
        || lowered.ends_with("?h=1"))
}

/// First real image referenced inside an HTML fragment, resolved absolute.
pub fn extract_first_image(html: &str, base: Option<&Url>) -> Option<String> {
    let fragment = Html::parse_fragment(html);
    let selector = Selector::parse("img").ok()?;

    fragment.select(&selector).find_map(|img| {
        let element = img.value();
        if element.attr("width") == Some("1") || element.attr("height") == Some("1") {
            return None;
        }
        ["src", "data-src", "data-lazy-src"]
            .iter()
            .filter_map(|attr| element.attr(attr))
            .filter_map(|src| resolve_url(base, src))
            .find(|url| is_content_image(url))
    })
}
