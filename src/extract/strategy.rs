//! Ordered, named extraction strategies
//!
//! A field is described by a [`FieldChain`]: a list of strategies, each one a
//! way to locate a raw string on the page plus a parser that turns it into a
//! typed value. The chain is walked in order and the first strategy whose raw
//! value is non-empty and parses wins. Values from different strategies are
//! never merged.

use crate::extract::error::ExtractError;
use crate::extract::parse::collapse_whitespace;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use std::cell::OnceCell;
use tracing::trace;

/// Compile a CSS selector from a strategy table
pub(crate) fn css(selector: &str) -> Result<Selector, ExtractError> {
    Selector::parse(selector).map_err(|e| ExtractError::Selector {
        selector: selector.to_string(),
        message: e.to_string(),
    })
}

/// Compile a regular expression from a strategy table
pub(crate) fn pattern(source: &str) -> Result<Regex, ExtractError> {
    Ok(Regex::new(source)?)
}

/// A parsed page together with its URL and lazily computed visible text
pub struct PageView {
    url: String,
    doc: Html,
    text: OnceCell<String>,
}

impl PageView {
    pub fn parse(url: &str, body: &str) -> Self {
        Self {
            url: url.to_string(),
            doc: Html::parse_document(body),
            text: OnceCell::new(),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn document(&self) -> &Html {
        &self.doc
    }

    /// Visible text of the whole page with whitespace collapsed
    pub fn full_text(&self) -> &str {
        self.text.get_or_init(|| {
            let mut text = String::new();
            for node in self.doc.root_element().descendants() {
                let Some(fragment) = node.value().as_text() else {
                    continue;
                };
                let hidden = node
                    .parent()
                    .and_then(|parent| parent.value().as_element().map(|e| e.name()))
                    .is_some_and(|name| matches!(name, "script" | "style" | "noscript"));
                if !hidden {
                    text.push_str(fragment);
                    text.push(' ');
                }
            }
            collapse_whitespace(&text)
        })
    }
}

/// Text content of an element with whitespace collapsed
pub(crate) fn element_text(element: ElementRef<'_>) -> String {
    collapse_whitespace(&element.text().collect::<Vec<_>>().join(" "))
}

/// Where a strategy looks for its raw value
pub enum Locate {
    /// Text of the first matching element that has any
    Text(Selector),
    /// Text of every matching element, joined
    JoinedText(Selector),
    /// First non-empty attribute value among matching elements
    Attr(Selector, &'static str),
    /// Remainder of the first row whose text contains the label
    Labeled { rows: Selector, label: &'static str },
    /// First capture group over the visible page text
    PageRegex(Regex),
    /// First capture group over the joined text of a page region
    ScopedRegex { scope: Selector, pattern: Regex },
    /// First capture group over the page URL
    UrlRegex(Regex),
    /// A fixed marker when any element matches
    Exists(Selector),
}

impl Locate {
    /// Raw string for this strategy, if the page has one
    pub fn locate(&self, page: &PageView) -> Option<String> {
        let doc = page.document();
        let raw = match self {
            Locate::Text(selector) => doc
                .select(selector)
                .map(element_text)
                .find(|text| !text.is_empty()),
            Locate::JoinedText(selector) => {
                let joined = doc
                    .select(selector)
                    .map(element_text)
                    .collect::<Vec<_>>()
                    .join(" ");
                Some(joined)
            }
            Locate::Attr(selector, name) => doc
                .select(selector)
                .filter_map(|element| element.value().attr(name))
                .map(|value| value.trim().to_string())
                .find(|value| !value.is_empty()),
            Locate::Labeled { rows, label } => doc.select(rows).find_map(|row| {
                let text = element_text(row);
                let start = text.find(label)? + label.len();
                let rest = text[start..]
                    .trim_matches(|c: char| c == ':' || c.is_whitespace() || is_direction_mark(c))
                    .to_string();
                (!rest.is_empty()).then_some(rest)
            }),
            Locate::PageRegex(regex) => first_capture(regex, page.full_text()),
            Locate::ScopedRegex { scope, pattern } => {
                let region = doc
                    .select(scope)
                    .map(element_text)
                    .collect::<Vec<_>>()
                    .join(" ");
                first_capture(pattern, &region)
            }
            Locate::UrlRegex(regex) => first_capture(regex, page.url()),
            Locate::Exists(selector) => doc.select(selector).next().map(|_| "present".to_string()),
        };

        raw.filter(|value| !value.trim().is_empty())
    }
}

fn is_direction_mark(c: char) -> bool {
    matches!(c, '\u{200e}' | '\u{200f}')
}

fn first_capture(regex: &Regex, haystack: &str) -> Option<String> {
    let captures = regex.captures(haystack)?;
    captures
        .get(1)
        .or_else(|| captures.get(0))
        .map(|m| m.as_str().trim().to_string())
}

/// One named way of extracting a field
pub struct Strategy<T> {
    pub name: &'static str,
    pub locate: Locate,
    pub parse: fn(&str) -> Option<T>,
}

/// The value a chain resolved and the strategy that produced it
#[derive(Debug, Clone, PartialEq)]
pub struct Resolved<T> {
    pub value: T,
    pub strategy: &'static str,
}

/// Ordered strategies for one field
pub struct FieldChain<T> {
    field: &'static str,
    strategies: Vec<Strategy<T>>,
}

impl<T> FieldChain<T> {
    pub fn new(field: &'static str) -> Self {
        Self {
            field,
            strategies: Vec::new(),
        }
    }

    /// Append a strategy to the end of the chain
    pub fn then(mut self, name: &'static str, locate: Locate, parse: fn(&str) -> Option<T>) -> Self {
        self.strategies.push(Strategy { name, locate, parse });
        self
    }

    pub fn field(&self) -> &'static str {
        self.field
    }

    /// Walk the chain and commit to the first strategy that yields a value
    pub fn resolve(&self, page: &PageView) -> Option<Resolved<T>> {
        for strategy in &self.strategies {
            let Some(raw) = strategy.locate.locate(page) else {
                continue;
            };
            if let Some(value) = (strategy.parse)(&raw) {
                trace!(field = self.field, strategy = strategy.name, "field resolved");
                return Some(Resolved {
                    value,
                    strategy: strategy.name,
                });
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::parse;

    const PAGE: &str = r#"
        <html><body>
          <h1><span> Primary   Title </span></h1>
          <span class="alt-title"></span>
          <table id="details">
            <tr><th>Colour</th><td>Blue</td></tr>
            <tr><th>Date First Available</th><td>&lrm; 3 Feb. 2021</td></tr>
          </table>
          <div id="box">Sold by: Acme Ltd and Fulfilled by Someone</div>
          <script>var hidden = "Best Sellers Rank: 1 in Secrets";</script>
        </body></html>
    "#;

    fn page() -> PageView {
        PageView::parse("https://www.amazon.co.uk/dp/B000000001", PAGE)
    }

    #[test]
    fn test_first_successful_strategy_wins() {
        let chain = FieldChain::new("title")
            .then("alt", Locate::Text(css(".alt-title").unwrap()), parse::text)
            .then("heading", Locate::Text(css("h1 span").unwrap()), parse::text)
            .then("whole-heading", Locate::Text(css("h1").unwrap()), |_| {
                Some("never".to_string())
            });

        let resolved = chain.resolve(&page()).unwrap();
        assert_eq!(resolved.value, "Primary Title");
        assert_eq!(resolved.strategy, "heading");
    }

    #[test]
    fn test_unparseable_value_falls_through() {
        let chain = FieldChain::new("price")
            .then("heading", Locate::Text(css("h1").unwrap()), parse::price)
            .then("constant", Locate::Exists(css("#box").unwrap()), |_| Some(1.5));

        let resolved = chain.resolve(&page()).unwrap();
        assert_eq!(resolved.value, 1.5);
        assert_eq!(resolved.strategy, "constant");
    }

    #[test]
    fn test_labeled_row_and_scoped_regex() {
        let page = page();
        let listed = Locate::Labeled {
            rows: css("#details tr").unwrap(),
            label: "Date First Available",
        };
        assert_eq!(listed.locate(&page).as_deref(), Some("3 Feb. 2021"));

        let seller = Locate::ScopedRegex {
            scope: css("#box").unwrap(),
            pattern: pattern(r"Sold by:?\s*(.+?)\s+and").unwrap(),
        };
        assert_eq!(seller.locate(&page).as_deref(), Some("Acme Ltd"));

        let asin = Locate::UrlRegex(pattern(r"/dp/([A-Z0-9]{10})").unwrap());
        assert_eq!(asin.locate(&page).as_deref(), Some("B000000001"));
    }

    #[test]
    fn test_full_text_skips_scripts() {
        let page = page();
        assert!(page.full_text().contains("Primary Title"));
        assert!(!page.full_text().contains("Secrets"));
    }

    #[test]
    fn test_exhausted_chain_is_absent() {
        let chain: FieldChain<String> =
            FieldChain::new("brand").then("byline", Locate::Text(css("#bylineInfo").unwrap()), parse::text);
        assert!(chain.resolve(&page()).is_none());
    }
}
