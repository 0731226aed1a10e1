// Site-specific adapters. All selector and URL knowledge lives behind these
// modules so markup drift on one site only ever touches one file.

pub mod mafab;
pub mod porthu;

pub use mafab::MafabAdapter;
pub use porthu::PorthuAdapter;

use scraper::ElementRef;
use url::Url;

/// Resolve a possibly-relative href against the page URL. Fragments are
/// dropped; non-http(s) schemes are rejected.
pub(crate) fn absolutize(base_url: &str, href: &str) -> Option<String> {
    let href = href.trim();
    if href.is_empty() {
        return None;
    }
    let base = Url::parse(base_url).ok()?;
    let mut joined = base.join(href).ok()?;
    if joined.scheme() != "http" && joined.scheme() != "https" {
        return None;
    }
    joined.set_fragment(None);
    Some(joined.to_string())
}

pub(crate) fn has_class(element: &ElementRef<'_>, class: &str) -> bool {
    element
        .value()
        .attr("class")
        .unwrap_or("")
        .split_whitespace()
        .any(|c| c == class)
}

/// Visible text content of an element, whitespace-collapsed.
pub(crate) fn element_text(element: &ElementRef<'_>) -> String {
    huncat_common::text::sanitize(&element.text().collect::<Vec<_>>().join(" "))
}
