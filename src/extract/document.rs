use scraper::{ElementRef, Html, Selector};
use url::Url;

/// Compile a CSS selector, logging and discarding invalid ones.
pub(crate) fn compile(selector: &str) -> Option<Selector> {
    let selector = selector.trim();
    if selector.is_empty() {
        return None;
    }
    match Selector::parse(selector) {
        Ok(compiled) => Some(compiled),
        Err(e) => {
            tracing::warn!(selector, error = %e, "ignoring invalid css selector");
            None
        }
    }
}

/// Descendants of `scope` matching `selector`, in document order.
pub fn select_within<'a>(scope: ElementRef<'a>, selector: &str) -> Vec<ElementRef<'a>> {
    match compile(selector) {
        Some(compiled) => scope.select(&compiled).collect(),
        None => Vec::new(),
    }
}

pub fn select_first<'a>(scope: ElementRef<'a>, selector: &str) -> Option<ElementRef<'a>> {
    let compiled = compile(selector)?;
    let first = scope.select(&compiled).next();
    first
}

/// A parsed page with exclusion selectors already applied.
///
/// Pruning happens once, at construction; afterwards the tree is only read,
/// so extraction order cannot change what a field sees.
pub struct Document {
    html: Html,
    base_url: Option<Url>,
    pruned: usize,
}

impl Document {
    /// Parse markup leniently and drop every element matched by `exclude`.
    pub fn parse(markup: &str, base_url: &str, exclude: &[String]) -> Self {
        let mut html = Html::parse_document(markup);
        let pruned = prune(&mut html, exclude);
        if pruned > 0 {
            tracing::debug!(base_url, pruned, "pruned excluded elements");
        }

        Self {
            html,
            base_url: Url::parse(base_url).ok(),
            pruned,
        }
    }

    pub fn base_url(&self) -> Option<&Url> {
        self.base_url.as_ref()
    }

    /// Number of subtrees removed by exclusion selectors.
    pub fn pruned(&self) -> usize {
        self.pruned
    }

    pub fn root(&self) -> ElementRef<'_> {
        self.html.root_element()
    }

    /// Match against the live tree only. `Html::select` would also walk
    /// detached nodes, so selection always starts from the root element.
    pub fn select(&self, selector: &str) -> Vec<ElementRef<'_>> {
        select_within(self.root(), selector)
    }

    /// Item-scope elements, capped at `limit`.
    pub fn items(&self, selector: &str, limit: usize) -> Vec<ElementRef<'_>> {
        let mut items = self.select(selector);
        items.truncate(limit);
        items
    }
}

fn prune(html: &mut Html, exclude: &[String]) -> usize {
    let mut pruned = 0;
    for selector in exclude {
        let Some(compiled) = compile(selector) else {
            continue;
        };
        let ids: Vec<_> = html
            .root_element()
            .select(&compiled)
            .map(|element| (*element).id())
            .collect();
        for id in ids {
            if let Some(mut node) = html.tree.get_mut(id) {
                node.detach();
                pruned += 1;
            }
        }
    }
    pruned
}
