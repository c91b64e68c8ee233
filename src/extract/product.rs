//! Strategy tables for product detail pages

use crate::catalog::{Availability, Delivery, SalesRank, Seller};
use crate::extract::error::ExtractError;
use crate::extract::parse;
use crate::extract::strategy::{FieldChain, Locate, PageView, Resolved, css, pattern};
use chrono::Weekday;

/// Rows of the various product detail tables and bullet lists
const DETAIL_ROWS: &str = "#productDetails_detailBullets_sections1 tr, \
     #productDetails_techSpec_section_1 tr, \
     #productDetails_db_sections tr, \
     #detailBullets_feature_div li, \
     #detailBulletsWrapper_feature_div li, \
     #productOverview_feature_div tr";

const BUYBOX: &str = "#buybox, #tabular-buybox, #desktop_buybox, #apex_desktop";

const DELIVERY_BLOCK: &str = "#mir-layout-DELIVERY_BLOCK, #deliveryBlockMessage";

const DELIVERY_DATE: &str = r"(?i)((?:\w+day|tomorrow),?\s+(?:\d{1,2}\s+\w+|\w+\s+\d{1,2}))";

/// Raw product fields as found on a detail page, before validation
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractedProduct {
    pub asin: String,
    pub url: String,
    pub title: Option<String>,
    pub brand: Option<String>,
    pub price: Option<f64>,
    pub star_rating: Option<f64>,
    pub num_ratings: Option<u64>,
    pub ranks: Vec<SalesRank>,
    pub shipping_cost: Option<f64>,
    pub delivery: Delivery,
    pub seller: Seller,
    pub availability: Option<Availability>,
    pub is_prime: bool,
    pub listing_date: Option<String>,
    /// `(field, strategy)` for every field that resolved
    pub strategies: Vec<(&'static str, &'static str)>,
}

pub(crate) struct ProductRules {
    asin: FieldChain<String>,
    title: FieldChain<String>,
    brand: FieldChain<String>,
    price: FieldChain<f64>,
    star_rating: FieldChain<f64>,
    num_ratings: FieldChain<u64>,
    ranks: FieldChain<Vec<SalesRank>>,
    shipping_cost: FieldChain<f64>,
    delivery_text: FieldChain<String>,
    delivery_estimate: FieldChain<String>,
    sold_by: FieldChain<String>,
    dispatches_from: FieldChain<String>,
    fulfilled_by: FieldChain<String>,
    buy_box_winner: FieldChain<bool>,
    availability: FieldChain<Availability>,
    is_prime: FieldChain<bool>,
    listing_date: FieldChain<String>,
}

impl ProductRules {
    pub(crate) fn new() -> Result<Self, ExtractError> {
        let asin = FieldChain::new("asin")
            .then(
                "url-path",
                Locate::UrlRegex(pattern(r"/(?:dp|gp/product)/([A-Za-z0-9]{10})")?),
                parse::identifier,
            )
            .then(
                "asin-input",
                Locate::Attr(css(r#"input#ASIN, input[name="ASIN"]"#)?, "value"),
                parse::identifier,
            )
            .then(
                "review-widget",
                Locate::Attr(css("#averageCustomerReviews[data-asin]")?, "data-asin"),
                parse::identifier,
            )
            .then(
                "detail-row",
                Locate::Labeled { rows: css(DETAIL_ROWS)?, label: "ASIN" },
                parse::identifier,
            );

        let title = FieldChain::new("title")
            .then("product-title", Locate::Text(css("#productTitle")?), parse::text)
            .then("title-class", Locate::Text(css(".product-title")?), parse::text)
            .then("heading-span", Locate::Text(css("h1 span")?), parse::text)
            .then("heading", Locate::Text(css("h1")?), parse::text);

        let brand = FieldChain::new("brand")
            .then("byline", Locate::Text(css("#bylineInfo")?), parse::brand)
            .then("byline-link", Locate::Text(css("#bylineInfo a")?), parse::brand)
            .then(
                "detail-brand",
                Locate::Labeled { rows: css(DETAIL_ROWS)?, label: "Brand" },
                parse::brand,
            )
            .then(
                "detail-manufacturer",
                Locate::Labeled { rows: css(DETAIL_ROWS)?, label: "Manufacturer" },
                parse::brand,
            );

        let price = FieldChain::new("price")
            .then("apex-to-pay", Locate::Text(css(".apexPriceToPay .a-offscreen")?), parse::price)
            .then(
                "core-price",
                Locate::Text(css("#corePrice_feature_div .a-price .a-offscreen")?),
                parse::price,
            )
            .then("price-offscreen", Locate::Text(css(".a-price .a-offscreen")?), parse::price)
            .then("our-price", Locate::Text(css("#priceblock_ourprice")?), parse::price)
            .then("deal-price", Locate::Text(css("#priceblock_dealprice")?), parse::price)
            .then(
                "price-range",
                Locate::Text(css(".a-price-range .a-price .a-offscreen")?),
                parse::price,
            )
            .then("price-whole", Locate::Text(css(".a-price-whole")?), parse::price);

        let star_rating = FieldChain::new("star_rating")
            .then(
                "average-stars",
                Locate::Text(css(r#"[data-hook="average-star-rating"] .a-icon-alt"#)?),
                parse::star_rating,
            )
            .then("popover-title", Locate::Attr(css("#acrPopover")?, "title"), parse::star_rating)
            .then("icon-alt", Locate::Text(css(".a-icon-alt")?), parse::star_rating)
            .then(
                "out-of-text",
                Locate::Text(css(r#"[data-hook="rating-out-of-text"]"#)?),
                parse::star_rating,
            )
            .then(
                "page-text",
                Locate::PageRegex(pattern(r"(\d+(?:[.,]\d+)?\s*out\s*of\s*5)")?),
                parse::star_rating,
            );

        let num_ratings = FieldChain::new("num_ratings")
            .then(
                "total-review-count",
                Locate::Text(css(r#"[data-hook="total-review-count"]"#)?),
                parse::count,
            )
            .then("review-text", Locate::Text(css("#acrCustomerReviewText")?), parse::count)
            .then(
                "page-text",
                Locate::PageRegex(pattern(r"(\d[\d,.]*)\s+(?:global\s+)?ratings")?),
                parse::count,
            );

        let ranks = FieldChain::new("ranks")
            .then(
                "detail-row",
                Locate::Labeled { rows: css(DETAIL_ROWS)?, label: "Best Sellers Rank" },
                parse::ranks,
            )
            .then(
                "sales-rank",
                Locate::Text(css("#SalesRank")?),
                parse::ranks,
            )
            .then(
                "page-text",
                Locate::PageRegex(pattern(r"Best Sellers Rank:?\s*(#?\d[\d,.]*\s+in\s+[^#()]+)")?),
                parse::ranks,
            );

        let shipping_cost = FieldChain::new("shipping_cost")
            .then(
                "delivery-block",
                Locate::JoinedText(css("#mir-layout-DELIVERY_BLOCK")?),
                parse::shipping,
            )
            .then(
                "delivery-message",
                Locate::JoinedText(css("#deliveryBlockMessage, #delivery-message")?),
                parse::shipping,
            )
            .then(
                "buybox-free",
                Locate::ScopedRegex {
                    scope: css(BUYBOX)?,
                    pattern: pattern(r"(?i)(free\s+(?:delivery|shipping))")?,
                },
                parse::shipping,
            );

        let delivery_text = FieldChain::new("delivery_text")
            .then("delivery-block", Locate::Text(css("#mir-layout-DELIVERY_BLOCK")?), parse::text)
            .then("delivery-message", Locate::Text(css("#deliveryBlockMessage")?), parse::text);

        let delivery_estimate = FieldChain::new("delivery_estimate")
            .then(
                "delivery-block-date",
                Locate::ScopedRegex { scope: css(DELIVERY_BLOCK)?, pattern: pattern(DELIVERY_DATE)? },
                parse::text,
            )
            .then(
                "buybox-date",
                Locate::ScopedRegex {
                    scope: css(BUYBOX)?,
                    pattern: pattern(
                        r"(?i)(?:delivery|arrives|get it)\s+((?:\w+day|tomorrow),?\s+(?:\d{1,2}\s+\w+|\w+\s+\d{1,2}))",
                    )?,
                },
                parse::text,
            )
            .then(
                "location-prompt",
                Locate::ScopedRegex {
                    scope: css("#contextualIngressPt")?,
                    pattern: pattern(r"(Select delivery location)")?,
                },
                |_| Some("Select delivery location for estimate".to_string()),
            );

        let sold_by = FieldChain::new("sold_by")
            .then(
                "buybox-sold-by",
                Locate::ScopedRegex {
                    scope: css(BUYBOX)?,
                    pattern: pattern(
                        r"Sold by:?\s*(.+?)(?:\s+Dispatches|\s+Ships|\s+Returns|\s+Payment|\s+Gift|$)",
                    )?,
                },
                parse::party,
            )
            .then("merchant-link", Locate::Text(css("#merchant-info a")?), parse::party)
            .then("seller-profile", Locate::Text(css("#sellerProfileTriggerId")?), parse::party)
            .then("third-party", Locate::Text(css("#soldByThirdParty a")?), parse::party);

        let dispatches_from = FieldChain::new("dispatches_from")
            .then(
                "buybox-dispatch",
                Locate::ScopedRegex {
                    scope: css(BUYBOX)?,
                    pattern: pattern(
                        r"(?:Dispatches|Ships) from:?\s*(.+?)(?:\s+Sold|\s+Returns|\s+Payment|\s+Gift|$)",
                    )?,
                },
                parse::party,
            )
            .then(
                "fulfiller-info",
                Locate::Text(css("#fulfillerInfoFeature_feature_div .offer-display-feature-text")?),
                parse::party,
            );

        let fulfilled_by = FieldChain::new("fulfilled_by").then(
            "amazon-fulfilment",
            Locate::ScopedRegex {
                scope: css(&format!("{BUYBOX}, #merchant-info"))?,
                pattern: pattern(
                    r"(?i)(fulfilled by amazon|(?:dispatched|shipped|ships) from and sold by amazon)",
                )?,
            },
            |_| Some("Amazon".to_string()),
        );

        let buy_box_winner = FieldChain::new("buy_box_winner").then(
            "buybox-seller",
            Locate::ScopedRegex { scope: css(BUYBOX)?, pattern: pattern(r"(Sold by)")? },
            parse::flag,
        );

        let availability = FieldChain::new("availability")
            .then("availability-span", Locate::Text(css("#availability span")?), parse::availability)
            .then("availability", Locate::Text(css("#availability")?), parse::availability)
            .then("availability-brief", Locate::Text(css("#availability-brief")?), parse::availability)
            .then("out-of-stock", Locate::JoinedText(css("#outOfStock")?), parse::availability)
            .then("buybox", Locate::JoinedText(css(BUYBOX)?), parse::availability)
            .then(
                "quantity-select",
                Locate::Exists(css(r#"#quantity, select[name="quantity"]"#)?),
                |_| Some(Availability::InStock),
            );

        let is_prime = FieldChain::new("is_prime").then(
            "prime-badge",
            Locate::Exists(css("#prime-badge, #primeBadge, i.a-icon-prime, .a-icon-prime")?),
            parse::flag,
        );

        let listing_date = FieldChain::new("listing_date").then(
            "detail-row",
            Locate::Labeled { rows: css(DETAIL_ROWS)?, label: "Date First Available" },
            parse::text,
        );

        Ok(Self {
            asin,
            title,
            brand,
            price,
            star_rating,
            num_ratings,
            ranks,
            shipping_cost,
            delivery_text,
            delivery_estimate,
            sold_by,
            dispatches_from,
            fulfilled_by,
            buy_box_winner,
            availability,
            is_prime,
            listing_date,
        })
    }

    /// Resolve every field of a detail page; `None` when no identifier is found
    pub(crate) fn extract(&self, page: &PageView, today: Weekday) -> Option<ExtractedProduct> {
        let mut strategies = Vec::new();

        let asin = self.asin.resolve(page)?;
        strategies.push((self.asin.field(), asin.strategy));

        let title = record(&self.title, page, &mut strategies);
        let brand = record(&self.brand, page, &mut strategies);
        let price = record(&self.price, page, &mut strategies);
        let star_rating = record(&self.star_rating, page, &mut strategies);
        let num_ratings = record(&self.num_ratings, page, &mut strategies);
        let ranks = record(&self.ranks, page, &mut strategies).unwrap_or_default();
        let shipping_cost = record(&self.shipping_cost, page, &mut strategies);
        let delivery_text = record(&self.delivery_text, page, &mut strategies);
        let delivery_estimate = record(&self.delivery_estimate, page, &mut strategies);
        let sold_by = record(&self.sold_by, page, &mut strategies);
        let dispatches_from = record(&self.dispatches_from, page, &mut strategies);
        let fulfilled_by = record(&self.fulfilled_by, page, &mut strategies).or_else(|| {
            dispatches_from
                .as_deref()
                .filter(|from| from.contains("Amazon"))
                .map(|_| "Amazon".to_string())
        });
        let buy_box_winner = record(&self.buy_box_winner, page, &mut strategies).unwrap_or(false);
        let availability = record(&self.availability, page, &mut strategies);
        let is_prime = record(&self.is_prime, page, &mut strategies).unwrap_or(false);
        let listing_date = record(&self.listing_date, page, &mut strategies);

        let days = delivery_text
            .as_deref()
            .and_then(|text| parse::delivery_day_offset(text, today))
            .or_else(|| {
                delivery_estimate
                    .as_deref()
                    .and_then(|estimate| parse::delivery_day_offset(estimate, today))
            });

        Some(ExtractedProduct {
            asin: asin.value,
            url: page.url().to_string(),
            title,
            brand,
            price,
            star_rating,
            num_ratings,
            ranks,
            shipping_cost,
            delivery: Delivery {
                text: delivery_text,
                estimate: delivery_estimate,
                days,
            },
            seller: Seller {
                sold_by,
                dispatches_from,
                fulfilled_by,
                is_buy_box_winner: buy_box_winner,
            },
            availability,
            is_prime,
            listing_date,
            strategies,
        })
    }
}

fn record<T>(
    chain: &FieldChain<T>,
    page: &PageView,
    strategies: &mut Vec<(&'static str, &'static str)>,
) -> Option<T> {
    let Resolved { value, strategy } = chain.resolve(page)?;
    strategies.push((chain.field(), strategy));
    Some(value)
}
