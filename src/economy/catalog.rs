//! Static catalog tables.
//!
//! The engine reads these for prices, income and merger requirements and
//! never mutates them. Tests build small synthetic catalogs; the driver uses
//! `Catalog::starter()`. A catalog can also be loaded from JSON.

use serde::{Deserialize, Serialize};

use super::state::ItemCategory;

/// One purchasable size of a business (kiosk, shop, chain...).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BusinessSize {
    pub size_type: String,
    pub cost: u64,
    pub income_per_hour: u64,
    /// Credited when an owned business of this size is sold.
    pub sell_price: u64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BusinessDef {
    pub id: String,
    pub name: String,
    pub sizes: Vec<BusinessSize>,
}

impl BusinessDef {
    pub fn size(&self, size_type: &str) -> Option<&BusinessSize> {
        self.sizes.iter().find(|s| s.size_type == size_type)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MergerRequirement {
    pub business_id: String,
    pub min_count: u32,
}

/// A merger multiplies all business income once its requirements are met.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MergerDef {
    pub id: String,
    pub name: String,
    pub bonus_percent: f64,
    pub requirements: Vec<MergerRequirement>,
}

impl MergerDef {
    pub fn multiplier(&self) -> f64 {
        1.0 + self.bonus_percent / 100.0
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssetClass {
    Stock,
    Crypto,
}

impl AssetClass {
    /// Allowed price range as multiples of the base price. Crypto swings
    /// wider than stocks.
    pub fn price_band(self) -> (f64, f64) {
        match self {
            AssetClass::Stock => (0.5, 2.0),
            AssetClass::Crypto => (0.3, 3.0),
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            AssetClass::Stock => "stock",
            AssetClass::Crypto => "crypto",
        }
    }
}

/// A tradable asset. `volatility` is a 0-10 rating.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AssetDef {
    pub id: String,
    pub name: String,
    pub base_price: f64,
    pub volatility: f64,
}

/// A property improvement. Installed improvements are stored as-is on the
/// owned property.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Improvement {
    pub id: String,
    pub name: String,
    pub cost: u64,
    pub bonus_income: u64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PropertyDef {
    pub id: String,
    pub name: String,
    pub price: u64,
    pub rental_income_per_hour: u64,
    pub improvements: Vec<Improvement>,
}

impl PropertyDef {
    pub fn improvement(&self, id: &str) -> Option<&Improvement> {
        self.improvements.iter().find(|i| i.id == id)
    }
}

/// Vehicles, collectibles, NFTs and islands.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ItemDef {
    pub id: String,
    pub name: String,
    pub category: ItemCategory,
    pub price: u64,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Catalog {
    pub businesses: Vec<BusinessDef>,
    pub mergers: Vec<MergerDef>,
    pub stocks: Vec<AssetDef>,
    pub crypto: Vec<AssetDef>,
    pub properties: Vec<PropertyDef>,
    pub items: Vec<ItemDef>,
}

impl Catalog {
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn business(&self, id: &str) -> Option<&BusinessDef> {
        self.businesses.iter().find(|b| b.id == id)
    }

    pub fn merger(&self, id: &str) -> Option<&MergerDef> {
        self.mergers.iter().find(|m| m.id == id)
    }

    pub fn assets(&self, class: AssetClass) -> &[AssetDef] {
        match class {
            AssetClass::Stock => &self.stocks,
            AssetClass::Crypto => &self.crypto,
        }
    }

    pub fn asset(&self, class: AssetClass, id: &str) -> Option<&AssetDef> {
        self.assets(class).iter().find(|a| a.id == id)
    }

    pub fn property(&self, id: &str) -> Option<&PropertyDef> {
        self.properties.iter().find(|p| p.id == id)
    }

    pub fn item(&self, id: &str) -> Option<&ItemDef> {
        self.items.iter().find(|i| i.id == id)
    }

    /// Small built-in catalog used by the browser driver.
    pub fn starter() -> Self {
        fn size(size_type: &str, cost: u64, income_per_hour: u64) -> BusinessSize {
            BusinessSize {
                size_type: size_type.into(),
                cost,
                income_per_hour,
                sell_price: cost * 6 / 10,
            }
        }
        fn asset(id: &str, name: &str, base_price: f64, volatility: f64) -> AssetDef {
            AssetDef {
                id: id.into(),
                name: name.into(),
                base_price,
                volatility,
            }
        }
        fn improvement(id: &str, name: &str, cost: u64, bonus_income: u64) -> Improvement {
            Improvement {
                id: id.into(),
                name: name.into(),
                cost,
                bonus_income,
            }
        }
        fn item(id: &str, name: &str, category: ItemCategory, price: u64) -> ItemDef {
            ItemDef {
                id: id.into(),
                name: name.into(),
                category,
                price,
            }
        }

        Self {
            businesses: vec![
                BusinessDef {
                    id: "coffee".into(),
                    name: "Coffee Stand".into(),
                    sizes: vec![size("small", 500, 10), size("medium", 2_000, 45)],
                },
                BusinessDef {
                    id: "shop".into(),
                    name: "Shop".into(),
                    sizes: vec![size("small", 4_000, 50), size("large", 15_000, 210)],
                },
                BusinessDef {
                    id: "cardealership".into(),
                    name: "Car Dealership".into(),
                    sizes: vec![size("medium", 60_000, 900)],
                },
            ],
            mergers: vec![MergerDef {
                id: "retail_empire".into(),
                name: "Retail Empire".into(),
                bonus_percent: 25.0,
                requirements: vec![
                    MergerRequirement {
                        business_id: "shop".into(),
                        min_count: 3,
                    },
                    MergerRequirement {
                        business_id: "cardealership".into(),
                        min_count: 1,
                    },
                ],
            }],
            stocks: vec![
                asset("TECH", "Tech Corp", 150.0, 4.0),
                asset("BANK", "Big Bank", 80.0, 2.0),
                asset("OILX", "Oil Exploration", 45.0, 6.0),
            ],
            crypto: vec![
                asset("BTC", "Bitcoin", 30_000.0, 8.0),
                asset("DOGE", "Dogecoin", 0.25, 10.0),
            ],
            properties: vec![PropertyDef {
                id: "studio".into(),
                name: "Studio Apartment".into(),
                price: 25_000,
                rental_income_per_hour: 120,
                improvements: vec![
                    improvement("kitchen", "New Kitchen", 5_000, 30),
                    improvement("balcony", "Balcony", 3_000, 15),
                ],
            }],
            items: vec![
                item("scooter", "Scooter", ItemCategory::Vehicle, 1_200),
                item("vase", "Ming Vase", ItemCategory::Collectible, 9_000),
                item("ape", "Pixel Ape", ItemCategory::Nft, 20_000),
                item("atoll", "Tiny Atoll", ItemCategory::Island, 500_000),
            ],
        }
    }
}
