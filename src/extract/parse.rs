//! Coercions from raw page strings into typed field values
//!
//! Every parser returns `None` for input it cannot make sense of, which lets a
//! strategy chain fall through to its next strategy.

use crate::catalog::{Availability, SalesRank};
use chrono::Weekday;
use regex::Regex;
use std::sync::LazyLock;

static RANK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"#?(\d[\d,.]*)\s+in\s+").expect("rank pattern is valid"));

const WEEKDAYS: [(&str, Weekday); 7] = [
    ("monday", Weekday::Mon),
    ("tuesday", Weekday::Tue),
    ("wednesday", Weekday::Wed),
    ("thursday", Weekday::Thu),
    ("friday", Weekday::Fri),
    ("saturday", Weekday::Sat),
    ("sunday", Weekday::Sun),
];

const CURRENCY_SYMBOLS: [char; 5] = ['£', '$', '€', '¥', '₹'];

/// Trim and collapse runs of whitespace into single spaces
pub fn collapse_whitespace(raw: &str) -> String {
    raw.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Non-empty text with whitespace collapsed
pub fn text(raw: &str) -> Option<String> {
    let text = collapse_whitespace(raw);
    (!text.is_empty()).then_some(text)
}

/// Strip currency symbols and thousands separators, then parse a decimal
///
/// `"£12.99"` is 12.99, `"1,299.00"` is 1299.0 and `"1.299,00 €"` is 1299.0.
/// A lone separator followed by exactly three digits is grouping: `"1.299 €"`
/// is 1299.0.
pub fn price(raw: &str) -> Option<f64> {
    let start = raw.find(|c: char| c.is_ascii_digit())?;
    let number: String = raw[start..]
        .chars()
        .take_while(|c| c.is_ascii_digit() || *c == ',' || *c == '.')
        .collect();
    let number = number.trim_end_matches([',', '.']);

    let last_comma = number.rfind(',');
    let last_dot = number.rfind('.');
    let normalized = match (last_comma, last_dot) {
        (Some(comma), Some(dot)) if comma > dot => number.replace('.', "").replace(',', "."),
        (Some(_), Some(_)) => number.replace(',', ""),
        (Some(comma), None) => {
            let decimals = number.len() - comma - 1;
            if number.matches(',').count() == 1 && decimals <= 2 {
                number.replace(',', ".")
            } else {
                number.replace(',', "")
            }
        }
        (None, Some(dot)) if number.matches('.').count() > 1 || number.len() - dot - 1 == 3 => {
            number.replace('.', "")
        }
        _ => number.to_string(),
    };

    normalized
        .parse::<f64>()
        .ok()
        .filter(|value| value.is_finite() && *value >= 0.0)
}

/// `"<n> out of 5"` becomes n; a bare number is taken as is
pub fn star_rating(raw: &str) -> Option<f64> {
    let lower = raw.to_lowercase();
    let candidate = match lower.find("out of 5") {
        Some(idx) => lower[..idx]
            .trim_end()
            .rsplit(|c: char| !(c.is_ascii_digit() || c == '.' || c == ','))
            .next()?
            .to_string(),
        None => lower.trim().to_string(),
    };
    candidate
        .replace(',', ".")
        .parse::<f64>()
        .ok()
        .filter(|value| value.is_finite())
}

/// First run of digits with grouping separators removed
pub fn count(raw: &str) -> Option<u64> {
    let chars: Vec<char> = raw.chars().collect();
    let start = chars.iter().position(|c| c.is_ascii_digit())?;

    let mut digits = String::new();
    let mut i = start;
    while i < chars.len() {
        let c = chars[i];
        if c.is_ascii_digit() {
            digits.push(c);
        } else if matches!(c, ',' | '.' | ' ' | '\u{a0}')
            && chars.get(i + 1).is_some_and(|next| next.is_ascii_digit())
        {
            // grouping separator
        } else {
            break;
        }
        i += 1;
    }
    digits.parse().ok()
}

/// All `"#<rank> in <category>"` pairs, in page order
pub fn ranks(raw: &str) -> Option<Vec<SalesRank>> {
    // "(See Top 100 in ...)" asides would otherwise read as ranks
    let mut depth = 0usize;
    let raw: String = raw
        .chars()
        .filter(|c| match c {
            '(' => {
                depth += 1;
                false
            }
            ')' => {
                depth = depth.saturating_sub(1);
                false
            }
            _ => depth == 0,
        })
        .collect();
    let raw = raw.as_str();

    let matches: Vec<_> = RANK.captures_iter(raw).collect();
    let mut ranks = Vec::with_capacity(matches.len());

    for (i, captures) in matches.iter().enumerate() {
        let (Some(whole), Some(number)) = (captures.get(0), captures.get(1)) else {
            continue;
        };
        let Some(rank) = count(number.as_str()).and_then(|r| u32::try_from(r).ok()) else {
            continue;
        };
        let end = matches
            .get(i + 1)
            .and_then(|next| next.get(0))
            .map_or(raw.len(), |next| next.start());
        let category = raw[whole.end()..end]
            .trim()
            .trim_end_matches([',', '#'])
            .trim();
        if category.is_empty() {
            continue;
        }
        ranks.push(SalesRank {
            rank,
            category: category.to_string(),
        });
    }

    (!ranks.is_empty()).then_some(ranks)
}

/// Days from `today` until the delivery day named in the phrase
///
/// `today` and `tomorrow` short-circuit to 0 and 1. A weekday on or after
/// today is the difference; an earlier weekday wraps into next week.
pub fn delivery_day_offset(phrase: &str, today: Weekday) -> Option<u32> {
    let lower = phrase.to_lowercase();
    if lower.contains("tomorrow") {
        return Some(1);
    }
    if lower.contains("today") {
        return Some(0);
    }

    let target = WEEKDAYS
        .iter()
        .filter_map(|(name, day)| lower.find(name).map(|idx| (idx, *day)))
        .min_by_key(|(idx, _)| *idx)
        .map(|(_, day)| day)?;

    let today = today.num_days_from_monday();
    let target = target.num_days_from_monday();
    Some(if target >= today {
        target - today
    } else {
        7 - (today - target)
    })
}

/// Stock state from an availability message
pub fn availability(raw: &str) -> Option<Availability> {
    let lower = raw.to_lowercase();
    if lower.contains("out of stock") {
        Some(Availability::OutOfStock)
    } else if lower.contains("temporarily unavailable") || lower.contains("currently unavailable") {
        Some(Availability::TemporarilyUnavailable)
    } else if lower.contains("only") && lower.contains("left in stock") {
        Some(Availability::LimitedStock)
    } else if lower.contains("in stock") || lower.contains("add to basket") || lower.contains("add to cart") {
        Some(Availability::InStock)
    } else {
        None
    }
}

/// Shipping cost from a delivery message; free delivery costs nothing
pub fn shipping(raw: &str) -> Option<f64> {
    let lower = raw.to_lowercase();
    if lower.contains("free delivery") || lower.contains("free shipping") {
        return Some(0.0);
    }
    let symbol = raw.find(CURRENCY_SYMBOLS)?;
    price(&raw[symbol..])
}

/// Brand name with byline decorations removed
pub fn brand(raw: &str) -> Option<String> {
    let mut brand = collapse_whitespace(raw);
    for prefix in ["Visit the ", "Brand: ", "Brand:", "by "] {
        if let Some(rest) = brand.strip_prefix(prefix) {
            brand = rest.trim().to_string();
        }
    }
    if let Some(rest) = brand.strip_suffix(" Store") {
        brand = rest.trim().to_string();
    }
    (brand.chars().count() > 1).then_some(brand)
}

/// Seller or dispatcher name
pub fn party(raw: &str) -> Option<String> {
    let name = collapse_whitespace(raw);
    let name = name
        .trim_start_matches("Sold by")
        .trim_start_matches("Dispatches from")
        .trim_start_matches("Ships from")
        .trim_matches(|c: char| c == ':' || c == '.' || c.is_whitespace());
    (name.chars().count() > 1).then(|| name.to_string())
}

/// Product identifier: uppercase alphanumerics
pub fn identifier(raw: &str) -> Option<String> {
    let id = raw.trim().to_uppercase();
    (!id.is_empty() && id.chars().all(|c| c.is_ascii_alphanumeric())).then_some(id)
}

/// Presence marker
pub fn flag(_: &str) -> Option<bool> {
    Some(true)
}
