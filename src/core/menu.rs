//! Static menu table, customer category profiles and the availability seam
//! shared with the bakery collaborator.

use serde::{Deserialize, Serialize};

use super::random::{RandomSource, WeightedSampler};

/// One item on the menu
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MenuItem {
    pub key: String,
    pub name: String,
    pub price: f64,
    pub prep_time_minutes: f64,
}

impl MenuItem {
    pub fn new(key: &str, name: &str, price: f64, prep_time_minutes: f64) -> Self {
        Self {
            key: key.to_string(),
            name: name.to_string(),
            price,
            prep_time_minutes,
        }
    }
}

/// Ordered menu table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Menu {
    items: Vec<MenuItem>,
}

impl Menu {
    pub fn new(items: Vec<MenuItem>) -> Self {
        Self { items }
    }

    pub fn items(&self) -> &[MenuItem] {
        &self.items
    }

    pub fn get(&self, key: &str) -> Option<&MenuItem> {
        self.items.iter().find(|item| item.key == key)
    }
}

impl Default for Menu {
    fn default() -> Self {
        Self::new(vec![
            MenuItem::new("coffee", "Coffee", 3.0, 2.0),
            MenuItem::new("tea", "Tea", 2.5, 2.0),
            MenuItem::new("croissant", "Croissant", 3.5, 3.0),
            MenuItem::new("muffin", "Muffin", 3.0, 2.0),
            MenuItem::new("cinnamon_roll", "Cinnamon Roll", 4.5, 4.0),
            MenuItem::new("sandwich", "Sandwich", 8.0, 6.0),
            MenuItem::new("baguette", "Baguette", 5.0, 3.0),
            MenuItem::new("sourdough", "Sourdough Loaf", 7.0, 4.0),
        ])
    }
}

/// Read-only availability query answered by the bakery/inventory side
pub trait MenuAvailability: Send {
    fn is_item_available(&self, item_key: &str) -> bool;
}

/// Every item is always available
#[derive(Debug, Clone, Copy, Default)]
pub struct AlwaysAvailable;

impl MenuAvailability for AlwaysAvailable {
    fn is_item_available(&self, _item_key: &str) -> bool {
        true
    }
}

/// Only the listed items are available
#[derive(Debug, Clone, Default)]
pub struct AvailableItems {
    keys: Vec<String>,
}

impl AvailableItems {
    pub fn new<S: Into<String>>(keys: impl IntoIterator<Item = S>) -> Self {
        Self {
            keys: keys.into_iter().map(Into::into).collect(),
        }
    }

    pub fn none() -> Self {
        Self::default()
    }
}

impl MenuAvailability for AvailableItems {
    fn is_item_available(&self, item_key: &str) -> bool {
        self.keys.iter().any(|key| key == item_key)
    }
}

/// Free-form tag attached to some orders
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SpecialRequest {
    ExtraHot,
    NoSugar,
    OatMilk,
    GlutenFree,
    Warmed,
    ToGo,
}

impl SpecialRequest {
    /// Vocabulary sampler; take-away and warming are asked for more often
    pub fn sampler() -> WeightedSampler<SpecialRequest> {
        WeightedSampler::new(vec![
            (1.0, SpecialRequest::ExtraHot),
            (1.0, SpecialRequest::NoSugar),
            (1.0, SpecialRequest::OatMilk),
            (0.5, SpecialRequest::GlutenFree),
            (1.5, SpecialRequest::Warmed),
            (2.0, SpecialRequest::ToGo),
        ])
    }
}

/// Fixed set of customer categories
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CustomerCategory {
    Student,
    Business,
    Tourist,
    #[default]
    Regular,
}

/// Category-derived base values
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CategoryProfile {
    pub base_patience_minutes: f64,
    pub base_spend: f64,
    pub tip_multiplier: f64,
    pub preferences: &'static [&'static str],
    pub special_request_probability: f64,
}

impl CustomerCategory {
    pub const ALL: [CustomerCategory; 4] = [
        CustomerCategory::Student,
        CustomerCategory::Business,
        CustomerCategory::Tourist,
        CustomerCategory::Regular,
    ];

    /// Parse a category name, falling back to the default category for
    /// anything unrecognized
    pub fn from_name(name: &str) -> Self {
        match name.trim().to_ascii_lowercase().as_str() {
            "student" => CustomerCategory::Student,
            "business" => CustomerCategory::Business,
            "tourist" => CustomerCategory::Tourist,
            "regular" => CustomerCategory::Regular,
            other => {
                log::debug!("Unknown customer category '{}', using default", other);
                CustomerCategory::default()
            }
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            CustomerCategory::Student => "student",
            CustomerCategory::Business => "business",
            CustomerCategory::Tourist => "tourist",
            CustomerCategory::Regular => "regular",
        }
    }

    pub fn profile(&self) -> CategoryProfile {
        match self {
            CustomerCategory::Student => CategoryProfile {
                base_patience_minutes: 15.0,
                base_spend: 8.0,
                tip_multiplier: 0.8,
                preferences: &["coffee", "muffin", "croissant"],
                special_request_probability: 0.1,
            },
            CustomerCategory::Business => CategoryProfile {
                base_patience_minutes: 8.0,
                base_spend: 20.0,
                tip_multiplier: 1.2,
                preferences: &["coffee", "sandwich", "croissant"],
                special_request_probability: 0.3,
            },
            CustomerCategory::Tourist => CategoryProfile {
                base_patience_minutes: 20.0,
                base_spend: 15.0,
                tip_multiplier: 1.0,
                preferences: &["croissant", "cinnamon_roll", "baguette"],
                special_request_probability: 0.2,
            },
            CustomerCategory::Regular => CategoryProfile {
                base_patience_minutes: 25.0,
                base_spend: 12.0,
                tip_multiplier: 1.5,
                preferences: &["sourdough", "coffee", "tea"],
                special_request_probability: 0.15,
            },
        }
    }
}

impl std::fmt::Display for CustomerCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Pick the item a customer orders. Available preferred items come first;
/// otherwise any available item; otherwise nothing.
pub fn choose_item<'m>(
    menu: &'m Menu,
    preferences: &[&str],
    availability: &dyn MenuAvailability,
    rng: &mut dyn RandomSource,
) -> Option<&'m MenuItem> {
    let preferred: Vec<&MenuItem> = preferences
        .iter()
        .filter_map(|key| menu.get(key))
        .filter(|item| availability.is_item_available(&item.key))
        .collect();

    let candidates = if preferred.is_empty() {
        menu.items()
            .iter()
            .filter(|item| availability.is_item_available(&item.key))
            .collect()
    } else {
        preferred
    };

    if candidates.is_empty() {
        return None;
    }
    Some(candidates[rng.index(candidates.len())])
}
