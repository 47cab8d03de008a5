//! Entitlement catalog - static product-to-grant mapping for purchase
//! webhooks

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::booster::BoosterType;

/// Concrete state changes one product purchase unlocks
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EntitlementGrant {
    #[serde(default)]
    pub gems: i64,
    #[serde(default)]
    pub grace_passes: i64,
    #[serde(default)]
    pub booster: Option<BoosterType>,
}

/// Product-id keyed grant table.
///
/// Exposed as configuration: deployments can deserialize a replacement
/// table instead of editing code. The default table covers the products
/// the store currently sells.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntitlementCatalog {
    products: HashMap<String, EntitlementGrant>,
}

impl EntitlementCatalog {
    pub fn new(products: HashMap<String, EntitlementGrant>) -> Self {
        Self { products }
    }

    pub fn lookup(&self, product_id: &str) -> Option<&EntitlementGrant> {
        self.products.get(product_id)
    }

    pub fn product_ids(&self) -> impl Iterator<Item = &str> {
        self.products.keys().map(String::as_str)
    }
}

impl Default for EntitlementCatalog {
    fn default() -> Self {
        let mut products = HashMap::new();
        products.insert(
            "gems_pouch".to_string(),
            EntitlementGrant {
                gems: 150,
                ..Default::default()
            },
        );
        products.insert(
            "gems_chest".to_string(),
            EntitlementGrant {
                gems: 800,
                ..Default::default()
            },
        );
        products.insert(
            "grace_pack_3".to_string(),
            EntitlementGrant {
                grace_passes: 3,
                ..Default::default()
            },
        );
        products.insert(
            "starter_bundle".to_string(),
            EntitlementGrant {
                gems: 250,
                grace_passes: 2,
                booster: None,
            },
        );
        products.insert(
            "booster_weekend".to_string(),
            EntitlementGrant {
                booster: Some(BoosterType::Double),
                ..Default::default()
            },
        );
        Self { products }
    }
}

/// Result of `grant_entitlements`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntitlementOutcome {
    pub user_id: String,
    pub product_id: String,
    pub gems_granted: i64,
    pub grace_passes_granted: i64,
    pub booster_granted: Option<BoosterType>,
    pub booster_expires_at: Option<DateTime<Utc>>,
    /// True when this payment-provider transaction id was already applied
    pub already_processed: bool,
}
