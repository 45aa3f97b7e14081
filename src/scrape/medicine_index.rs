//! A-Z medicine index scraper
//!
//! Walks `drugs-all-medicines?page=N&label=L` for one letter and collects the
//! medicine cards on each page.

use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use serde::Deserialize;
use tracing::info;

use super::human::{self, BROWSE, SKIM};
use super::listing::{ListingPage, ListingSource, paginate};
use crate::{
    Result,
    session::BrowserSession,
    types::{MedicineIndex, MedicineListing},
};

/// Index listing endpoint
pub const INDEX_BASE_URL: &str = "https://www.1mg.com/drugs-all-medicines";

/// Extracts medicine cards and the presence of a next-page link
const EXTRACT_INDEX_SCRIPT: &str = r#"
(() => {
    const medicines = [];
    const seen = new Set();
    const cards = document.querySelectorAll('a[href*="/drugs/"], div[class*="style__product"], div[class*="medicine"]');

    cards.forEach(card => {
        try {
            const link = card.tagName === 'A' ? card : card.querySelector('a[href*="/drugs/"]');
            if (!link || seen.has(link.href)) return;

            let name = card.querySelector('h3, h2, div[class*="name"], .product-name')?.innerText?.trim();
            if (!name) {
                name = link.innerText?.split('\n')[0]?.trim();
            }
            if (!name || name.length <= 2) return;

            const formula = card.querySelector('div[class*="pack"], div[class*="Pack"], div[class*="quantity"]')?.innerText?.trim();
            const priceMatch = card.innerText.match(/₹\s*([\d,]+\.?\d*)/);
            const img = card.querySelector('img');

            seen.add(link.href);
            medicines.push({
                name,
                url: link.href,
                formula: formula || 'N/A',
                price: priceMatch ? priceMatch[1] : '',
                image: img?.src || img?.getAttribute('data-src') || ''
            });
        } catch (e) {}
    });

    const next = document.querySelector('a[rel="next"], button[class*="next"], a[class*="next"]');
    return { medicines, hasNext: !!next && !next.classList.contains('disabled') };
})()
"#;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ExtractedIndexPage {
    #[serde(default)]
    medicines: Vec<MedicineListing>,
    #[serde(default)]
    has_next: bool,
}

/// Index page URL for `letter`
pub fn index_url(base_url: &str, letter: char, page: u32) -> String {
    format!("{}?page={}&label={}", base_url, page, letter.to_ascii_uppercase())
}

/// Uppercase ASCII letters in `input`, e.g. `"A-C"` or `"ABX"`
pub fn parse_letters(input: &str) -> crate::Result<Vec<char>> {
    let input = input.trim();
    let chars: Vec<char> = input.chars().collect();

    let letters: Vec<char> = match chars.as_slice() {
        [from, '-', to] if from.is_ascii_alphabetic() && to.is_ascii_alphabetic() => {
            let (from, to) = (from.to_ascii_uppercase(), to.to_ascii_uppercase());
            if from > to {
                return Err(crate::Error::config(format!("Invalid letter range: {}", input)));
            }
            (from..=to).collect()
        }
        _ => chars
            .iter()
            .filter(|c| !c.is_whitespace() && **c != ',')
            .map(|c| c.to_ascii_uppercase())
            .collect(),
    };

    if letters.is_empty() || letters.iter().any(|c| !c.is_ascii_uppercase()) {
        return Err(crate::Error::config(format!("Invalid letters: {:?}", input)));
    }
    Ok(letters)
}

/// Index pages for one letter, read through a browser session
#[derive(Debug)]
pub struct MedicineIndexScraper<'a> {
    session: &'a BrowserSession,
    base_url: String,
    letter: char,
    page_load_timeout: Duration,
}

impl<'a> MedicineIndexScraper<'a> {
    pub fn new(session: &'a BrowserSession, letter: char, page_load_timeout: Duration) -> Self {
        Self {
            session,
            base_url: INDEX_BASE_URL.to_string(),
            letter: letter.to_ascii_uppercase(),
            page_load_timeout,
        }
    }

    /// Use a different listing endpoint
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Scrape up to `max_pages` pages and assemble the index document.
    pub async fn scrape(&mut self, max_pages: u32, page_delay: Duration) -> MedicineIndex {
        info!("Scraping medicine index for letter {}", self.letter);
        let outcome = paginate(self, 1, max_pages, page_delay).await;

        let letter = self.letter.to_string();
        let medicines: Vec<MedicineListing> = outcome
            .records
            .into_iter()
            .enumerate()
            .map(|(i, medicine)| MedicineListing {
                id: Some(i as u64 + 1),
                letter: Some(letter.clone()),
                ..medicine
            })
            .collect();

        MedicineIndex {
            scraped_at: Utc::now(),
            letter,
            pages_scraped: outcome.pages_scraped,
            total_medicines: medicines.len(),
            medicines,
            error: outcome.error,
        }
    }
}

#[async_trait]
impl ListingSource for MedicineIndexScraper<'_> {
    type Record = MedicineListing;

    async fn fetch_page(&mut self, page: u32) -> Result<ListingPage<MedicineListing>> {
        let url = index_url(&self.base_url, self.letter, page);
        self.session.navigate(&url, self.page_load_timeout).await?;

        let routine = if page == 1 { BROWSE } else { SKIM };
        human::perform(self.session.page(), routine).await;

        let extracted: ExtractedIndexPage =
            self.session.evaluate_json(EXTRACT_INDEX_SCRIPT).await?;

        Ok(ListingPage {
            records: extracted.medicines,
            has_next: extracted.has_next,
        })
    }
}
