//! Field extraction rules applied inside one item scope.
//!
//! Every function here degrades to `None` or an empty list when a selector
//! is missing, invalid or matches nothing. None of them fail.

use scraper::ElementRef;
use url::Url;

use crate::domain::descriptor::configured;
use crate::domain::SelectorSet;
use crate::extract::document::{select_first, select_within};
use crate::extract::rewrite::{absolutize_fragment, extract_first_image, resolve_url};

/// Raw field values pulled from one item (or one detail page).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractedFields {
    pub title: Option<String>,
    pub link: Option<String>,
    pub description_html: Option<String>,
    pub description_text: Option<String>,
    pub date_text: Option<String>,
    pub image: Option<String>,
    pub author: Option<String>,
    pub categories: Vec<String>,
}

/// Whitespace-collapsed text of an element.
pub fn element_text(element: ElementRef<'_>) -> String {
    collapse_whitespace(&element.text().collect::<String>())
}

pub(crate) fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn non_empty(value: String) -> Option<String> {
    if value.is_empty() {
        None
    } else {
        Some(value)
    }
}

/// First matching element's trimmed text.
pub fn text(scope: ElementRef<'_>, selector: &str) -> Option<String> {
    select_first(scope, selector).and_then(|el| non_empty(element_text(el)))
}

/// The element's own `href`, else its first descendant anchor's, resolved absolute.
pub fn link_of(element: ElementRef<'_>, base: Option<&Url>) -> Option<String> {
    let href = element.value().attr("href").or_else(|| {
        select_first(element, "a[href]").and_then(|anchor| anchor.value().attr("href"))
    })?;
    resolve_url(base, href)
}

pub fn link(scope: ElementRef<'_>, selector: &str, base: Option<&Url>) -> Option<String> {
    select_first(scope, selector).and_then(|el| link_of(el, base))
}

/// Image source of an element, honoring lazy-load attributes.
///
/// Looks at the element itself, then at its first descendant `img`.
pub fn image_of(element: ElementRef<'_>, base: Option<&Url>) -> Option<String> {
    let from = |el: ElementRef<'_>| {
        ["src", "data-src", "data-lazy-src"]
            .iter()
            .filter_map(|attr| el.value().attr(attr))
            .find_map(|src| resolve_url(base, src))
    };

    from(element).or_else(|| select_first(element, "img").and_then(from))
}

/// Image field: the selector's image, else the first real image in `companion`.
pub fn image(
    scope: ElementRef<'_>,
    selector: Option<&str>,
    base: Option<&Url>,
    companion: Option<&str>,
) -> Option<String> {
    selector
        .and_then(|sel| select_first(scope, sel))
        .and_then(|el| image_of(el, base))
        .or_else(|| companion.and_then(|html| extract_first_image(html, base)))
}

/// Matched subtree serialized verbatim, with every URL inside made absolute.
pub fn rich_html(scope: ElementRef<'_>, selector: &str, base: Option<&Url>) -> Option<String> {
    let element = select_first(scope, selector)?;
    Some(absolutize_fragment(&element.html(), base))
}

/// Plain text of an HTML fragment.
pub fn plain_text(fragment: &str) -> String {
    let parsed = scraper::Html::parse_fragment(fragment);
    collapse_whitespace(&parsed.root_element().text().collect::<String>())
}

/// Text of every matched element, blanks and duplicates dropped.
pub fn all_text(scope: ElementRef<'_>, selector: &str) -> Vec<String> {
    let mut values: Vec<String> = Vec::new();
    for value in select_within(scope, selector)
        .into_iter()
        .map(element_text)
        .filter(|v| !v.is_empty())
    {
        if !values.contains(&value) {
            values.push(value);
        }
    }
    values
}

/// Run every configured selector of `selectors` inside `scope`.
///
/// The item selector itself is not used here; callers pick the scope. When
/// no link selector is configured, the scope's own link (or first anchor)
/// is used. When no image matches, the description (or, failing that, the
/// scope's own markup) is scanned for the first embedded image.
pub fn extract_fields(
    scope: ElementRef<'_>,
    selectors: &SelectorSet,
    base: Option<&Url>,
) -> ExtractedFields {
    let description_html =
        configured(&selectors.description).and_then(|sel| rich_html(scope, sel, base));
    let description_text = description_html
        .as_deref()
        .map(plain_text)
        .and_then(non_empty);

    let link = match configured(&selectors.link) {
        Some(sel) => link(scope, sel, base),
        None => link_of(scope, base),
    };

    let scope_html;
    let companion = match &description_html {
        Some(html) => Some(html.as_str()),
        None => {
            scope_html = scope.html();
            Some(scope_html.as_str())
        }
    };

    ExtractedFields {
        title: configured(&selectors.title).and_then(|sel| text(scope, sel)),
        link,
        image: image(scope, configured(&selectors.image), base, companion),
        date_text: configured(&selectors.date).and_then(|sel| date_text(scope, sel)),
        author: configured(&selectors.author).and_then(|sel| text(scope, sel)),
        categories: configured(&selectors.categories)
            .map(|sel| all_text(scope, sel))
            .unwrap_or_default(),
        description_html,
        description_text,
    }
}

/// Date text, preferring a machine-readable `datetime` or `content` attribute.
pub fn date_text(scope: ElementRef<'_>, selector: &str) -> Option<String> {
    let element = select_first(scope, selector)?;
    element
        .value()
        .attr("datetime")
        .or_else(|| element.value().attr("content"))
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
        .or_else(|| non_empty(element_text(element)))
}
