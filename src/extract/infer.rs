//! Derive a readable CSS path for an element. Used by the `preview` command.

use scraper::ElementRef;

const MAX_CLASSES: usize = 2;

/// Class names produced by CSS-in-JS tooling or build hashes.
fn looks_generated(class: &str) -> bool {
    const PREFIXES: &[&str] = &["css-", "sc-", "jsx-", "emotion-", "svelte-"];
    if PREFIXES.iter().any(|p| class.starts_with(p)) {
        return true;
    }

    let digits = class.chars().filter(|c| c.is_ascii_digit()).count();
    let longest_hex_run = class
        .split(|c: char| !c.is_ascii_hexdigit())
        .map(str::len)
        .max()
        .unwrap_or(0);

    digits >= 3 || (longest_hex_run >= 6 && digits > 0) || class.len() > 30
}

fn is_plain_identifier(value: &str) -> bool {
    let mut chars = value.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic())
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

fn usable_id(element: ElementRef<'_>) -> Option<&str> {
    element
        .value()
        .id()
        .filter(|id| is_plain_identifier(id) && !looks_generated(id))
}

/// One path segment: tag, stable classes and, when needed, `:nth-of-type`.
fn segment(element: ElementRef<'_>) -> String {
    let name = element.value().name();
    let mut segment = name.to_string();

    for class in element
        .value()
        .classes()
        .filter(|c| is_plain_identifier(c) && !looks_generated(c))
        .take(MAX_CLASSES)
    {
        segment.push('.');
        segment.push_str(class);
    }

    let same_tag = |sibling: &ElementRef<'_>| sibling.value().name() == name;
    let before = element
        .prev_siblings()
        .filter_map(ElementRef::wrap)
        .filter(same_tag)
        .count();
    let after = element
        .next_siblings()
        .filter_map(ElementRef::wrap)
        .filter(same_tag)
        .count();

    if before + after > 0 {
        segment.push_str(&format!(":nth-of-type({})", before + 1));
    }
    segment
}

/// Build a CSS path from the nearest identifiable ancestor down to `element`.
///
/// Walks up until an element with a usable id (which anchors the path) or
/// the `html` root. Segments are joined with the child combinator.
pub fn infer_selector(element: ElementRef<'_>) -> String {
    let mut segments = Vec::new();
    let mut current = Some(element);

    while let Some(el) = current {
        if el.value().name() == "html" {
            break;
        }
        if let Some(id) = usable_id(el) {
            segments.push(format!("#{}", id));
            break;
        }
        segments.push(segment(el));
        current = el.parent().and_then(ElementRef::wrap);
    }

    segments.reverse();
    segments.join(" > ")
}
