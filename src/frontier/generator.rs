//! Pluggable keyword generation
//!
//! A generator proposes search terms for a category. The bundled
//! [`PlaceholderGenerator`] samples from hard-coded word lists with random
//! brand and modifier variants; a model-backed generator can replace it
//! through the same trait.

use crate::frontier::error::GenerateError;
use async_trait::async_trait;
use rand::Rng;
use rand::seq::SliceRandom;
use tracing::debug;

/// Proposes search keywords for a category
#[async_trait]
pub trait KeywordGenerator: Send + Sync {
    /// Short name recorded as `generator:<name>` on generated keywords
    fn name(&self) -> &str;

    async fn generate(&self, category: &str, domain: &str) -> Result<Vec<String>, GenerateError>;
}

const TEMPLATES: &[(&str, &[&str])] = &[
    (
        "Electronics",
        &[
            "wireless headphones", "bluetooth speaker", "smartphone case", "laptop stand",
            "usb cable", "wireless charger", "gaming mouse", "mechanical keyboard", "webcam",
            "tablet", "smart watch", "power bank", "bluetooth earbuds", "monitor", "hdmi cable",
            "wireless adapter",
        ],
    ),
    (
        "Home & Kitchen",
        &[
            "coffee machine", "air fryer", "blender", "toaster", "microwave", "pressure cooker",
            "kitchen knife set", "cutting board", "mixing bowl", "coffee grinder",
            "food processor", "stand mixer", "rice cooker", "slow cooker", "electric kettle",
            "can opener",
        ],
    ),
    (
        "Sports & Outdoors",
        &[
            "running shoes", "yoga mat", "dumbbell set", "resistance bands", "treadmill",
            "bicycle", "camping tent", "hiking backpack", "water bottle", "fitness tracker",
            "golf clubs", "tennis racket", "basketball", "soccer ball", "swimming goggles",
            "gym bag",
        ],
    ),
    (
        "Health & Personal Care",
        &[
            "electric toothbrush", "hair dryer", "face cream", "shampoo", "body lotion",
            "sunscreen", "vitamins", "protein powder", "massage gun", "blood pressure monitor",
            "thermometer", "first aid kit", "hand sanitizer", "face mask", "hair straightener",
        ],
    ),
    (
        "Clothing & Accessories",
        &[
            "sneakers", "t-shirt", "jeans", "dress", "jacket", "handbag", "sunglasses", "watch",
            "belt", "scarf", "hoodie", "socks", "underwear", "shoes", "backpack", "wallet",
        ],
    ),
    (
        "Books",
        &[
            "fiction book", "cookbook", "self help book", "biography", "mystery novel",
            "romance novel", "science book", "history book", "children book", "textbook",
            "comic book", "poetry book", "travel guide", "art book", "business book",
            "psychology book",
        ],
    ),
    (
        "Toys & Games",
        &[
            "lego set", "board game", "puzzle", "action figure", "doll", "remote control car",
            "video game", "card game", "building blocks", "stuffed animal", "educational toy",
            "outdoor toy", "craft kit", "musical toy", "science kit",
        ],
    ),
    (
        "Automotive",
        &[
            "car charger", "phone mount", "dash cam", "car vacuum", "tire gauge",
            "jumper cables", "car cover", "floor mats", "air freshener", "car wax", "motor oil",
            "brake pads", "headlights", "car battery", "windshield wipers",
        ],
    ),
    (
        "Beauty",
        &[
            "makeup brush set", "lipstick", "foundation", "mascara", "eyeshadow palette",
            "nail polish", "perfume", "skincare set", "face serum", "moisturizer", "cleanser",
            "hair mask", "nail file", "makeup remover", "concealer", "blush",
        ],
    ),
    (
        "Office Products",
        &[
            "notebook", "pen set", "stapler", "paper clips", "desk organizer", "office chair",
            "desk lamp", "printer paper", "file folders", "calculator", "whiteboard", "desk pad",
            "hole punch", "tape dispenser", "paper shredder", "label maker",
        ],
    ),
];

const FALLBACK: &[&str] = &[
    "wireless headphones", "laptop", "smartphone", "gaming chair", "bluetooth speaker",
    "coffee machine", "running shoes", "tablet",
];

const BRANDS: &[&str] = &["apple", "samsung", "sony", "amazon", "nike", "adidas"];

const MODIFIERS: &[&str] = &["black", "white", "small", "large", "wireless", "portable"];

/// Word-list generator with random brand and modifier variants
#[derive(Debug, Clone)]
pub struct PlaceholderGenerator {
    /// How many keywords one call returns at most
    pub count: usize,
    pub brand_chance: f64,
    pub modifier_chance: f64,
}

impl Default for PlaceholderGenerator {
    fn default() -> Self {
        Self {
            count: 2,
            brand_chance: 0.3,
            modifier_chance: 0.2,
        }
    }
}

impl PlaceholderGenerator {
    pub fn new(count: usize) -> Self {
        Self {
            count,
            ..Self::default()
        }
    }

    /// Base terms for a category, or a general list for unknown categories
    pub fn templates(category: &str) -> &'static [&'static str] {
        TEMPLATES
            .iter()
            .find(|(name, _)| *name == category)
            .map_or(FALLBACK, |(_, words)| *words)
    }

    /// Base terms plus random variants, sampled down to `count`
    pub fn sample<R: Rng + ?Sized>(&self, category: &str, rng: &mut R) -> Vec<String> {
        let mut variations = Vec::new();
        for keyword in Self::templates(category) {
            variations.push(keyword.to_string());
            if rng.gen_bool(self.brand_chance) {
                if let Some(brand) = BRANDS.choose(rng) {
                    variations.push(format!("{} {}", brand, keyword));
                }
            }
            if rng.gen_bool(self.modifier_chance) {
                if let Some(modifier) = MODIFIERS.choose(rng) {
                    variations.push(format!("{} {}", modifier, keyword));
                }
            }
        }

        variations
            .choose_multiple(rng, self.count.min(variations.len()))
            .cloned()
            .collect()
    }
}

#[async_trait]
impl KeywordGenerator for PlaceholderGenerator {
    fn name(&self) -> &str {
        "placeholder"
    }

    async fn generate(&self, category: &str, domain: &str) -> Result<Vec<String>, GenerateError> {
        let keywords = self.sample(category, &mut rand::thread_rng());
        debug!(category, domain, count = keywords.len(), "generated placeholder keywords");
        Ok(keywords)
    }
}
