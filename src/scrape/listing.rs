//! Paginated listing extraction
//!
//! A [`ListingSource`] yields one page of records at a time; [`paginate`]
//! walks pages until the source runs dry, a page comes back empty, or the page
//! limit is reached.

use std::time::Duration;

use async_trait::async_trait;
use tracing::{info, warn};

use crate::Result;

/// Records found on one listing page
#[derive(Debug, Clone, PartialEq)]
pub struct ListingPage<R> {
    pub records: Vec<R>,
    /// Whether the page links to a following page
    pub has_next: bool,
}

/// A paginated listing
#[async_trait]
pub trait ListingSource: Send {
    type Record: Send;

    /// Load and extract page `page` (1-based)
    async fn fetch_page(&mut self, page: u32) -> Result<ListingPage<Self::Record>>;
}

/// Result of walking a listing
#[derive(Debug, Clone, PartialEq)]
pub struct ListingOutcome<R> {
    pub records: Vec<R>,
    /// Pages that produced records
    pub pages_scraped: u32,
    /// Error that ended the walk early
    pub error: Option<String>,
}

/// Walk pages `start..=max_pages`, waiting `page_delay` between pages.
///
/// An empty page, or [`Error::ExtractionEmpty`](crate::Error::ExtractionEmpty),
/// ends the walk normally. Any other error ends it too, but is kept in the
/// outcome alongside the records collected so far.
pub async fn paginate<S: ListingSource>(
    source: &mut S,
    start: u32,
    max_pages: u32,
    page_delay: Duration,
) -> ListingOutcome<S::Record> {
    let mut outcome = ListingOutcome {
        records: Vec::new(),
        pages_scraped: 0,
        error: None,
    };

    let mut page = start;
    while page <= max_pages {
        if page > start {
            tokio::time::sleep(page_delay).await;
        }

        let listing = match source.fetch_page(page).await {
            Ok(listing) => listing,
            Err(e) if e.is_extraction_empty() => {
                info!("Page {} yielded no records, stopping", page);
                break;
            }
            Err(e) => {
                warn!("Page {} failed: {}", page, e);
                outcome.error = Some(e.to_string());
                break;
            }
        };

        if listing.records.is_empty() {
            info!("Page {} yielded no records, stopping", page);
            break;
        }

        info!("Page {}/{}: {} records", page, max_pages, listing.records.len());
        outcome.records.extend(listing.records);
        outcome.pages_scraped += 1;

        if !listing.has_next {
            info!("No next page after {}", page);
            break;
        }
        page += 1;
    }

    outcome
}
