//! Medicine catalogue types
//!
//! Listing entries come from the A-Z medicine index, details from the
//! per-medicine page.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One entry of the A-Z medicine index
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MedicineListing {
    /// Sequential position within the scraped letter
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<u64>,
    pub name: String,
    /// Detail page URL, unique per medicine
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub letter: Option<String>,
    #[serde(default)]
    pub formula: String,
    /// Price as shown on the index page, without the currency sign
    #[serde(default)]
    pub price: String,
    #[serde(default)]
    pub image: String,
}

/// Output document of an index scrape for one letter
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MedicineIndex {
    pub scraped_at: DateTime<Utc>,
    pub letter: String,
    pub pages_scraped: u32,
    pub total_medicines: usize,
    pub medicines: Vec<MedicineListing>,
    /// Error that ended the scrape early, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Index documents for several letters, written by a multi-letter scrape
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MedicineCatalog {
    pub scraped_at: DateTime<Utc>,
    pub total_medicines: usize,
    pub letters: Vec<MedicineIndex>,
}

impl MedicineCatalog {
    pub fn new(letters: Vec<MedicineIndex>) -> Self {
        Self {
            scraped_at: Utc::now(),
            total_medicines: letters.iter().map(|l| l.total_medicines).sum(),
            letters,
        }
    }
}

/// Content extracted from a medicine detail page
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MedicineDetails {
    pub introduction: Option<String>,
    pub uses: Vec<String>,
    pub benefits: Option<String>,
    pub side_effects: SideEffects,
    pub how_to_use: Option<String>,
    pub how_it_works: Option<String>,
    /// Keyed by `alcohol`, `pregnancy`, `breastfeeding`, `driving`, `kidney`, `liver`
    pub safety_advice: BTreeMap<String, SafetyAdvice>,
    pub missed_dose: Option<String>,
    pub substitutes: Vec<Substitute>,
    pub quick_tips: Vec<String>,
    pub fact_box: FactBox,
    pub patient_concerns: Vec<String>,
    pub faqs: Vec<Faq>,
    pub manufacturer_details: Option<String>,
}

impl MedicineDetails {
    /// True when the page yielded none of the known sections
    pub fn is_empty(&self) -> bool {
        self.introduction.is_none()
            && self.uses.is_empty()
            && self.benefits.is_none()
            && self.side_effects.summary.is_none()
            && self.how_to_use.is_none()
            && self.safety_advice.is_empty()
            && self.substitutes.is_empty()
            && self.faqs.is_empty()
            && self.manufacturer_details.is_none()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SideEffects {
    pub summary: Option<String>,
    pub common: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SafetyAdvice {
    /// Tag such as `SAFE`, `CAUTION` or `UNSAFE`
    #[serde(default = "unknown_status")]
    pub status: String,
    #[serde(default)]
    pub details: String,
}

fn unknown_status() -> String {
    "UNKNOWN".to_string()
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Substitute {
    pub name: String,
    pub price: String,
    pub url: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Faq {
    pub question: String,
    pub answer: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FactBox {
    /// `None` when the page does not say
    pub habit_forming: Option<bool>,
    pub therapeutic_class: Option<String>,
}
