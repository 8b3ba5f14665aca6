//! Minimal selection helpers over parsed documents.

use scraper::{ElementRef, Html, Selector};

/// Returns the first element matching a CSS selector, or `None`.
pub(crate) fn select_first<'a>(document: &'a Html, css: &str) -> Option<ElementRef<'a>> {
    let selector = Selector::parse(css).expect("static selector");
    document.select(&selector).next()
}

/// Returns the first descendant of `element` matching a CSS selector.
pub(crate) fn select_first_in<'a>(element: ElementRef<'a>, css: &str) -> Option<ElementRef<'a>> {
    let selector = Selector::parse(css).expect("static selector");
    element.select(&selector).next()
}

/// Returns the concatenated, trimmed text content of an element.
pub(crate) fn text_of(element: ElementRef<'_>) -> String {
    element.text().collect::<String>().trim().to_string()
}
