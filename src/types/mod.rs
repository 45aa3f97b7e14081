//! Type definitions for the scraper
//!
//! This module contains the GraphQL request/response shapes, the bearer
//! credential, and the product and medicine catalogue records.

pub mod catalog;
pub mod internal;
pub mod medicine;
pub mod request;
pub mod response;
pub mod serde_helpers;

pub use catalog::{
    CatalogStatus, CategoryCatalog, CategoryLink, CategoryListing, CategoryProduct,
    DiscoveredCategory, DiscoveredProduct, ProductPage, SkuDiscovery,
};
pub use internal::{BearerToken, TokenReport};
pub use medicine::{MedicineCatalog, MedicineDetails, MedicineIndex, MedicineListing};
pub use request::{AddressInfo, GraphqlRequest, SkuQuery};
pub use response::{
    Availability, GraphqlError, GraphqlResponse, PdpPriceInfo, ProductInfo, SearchProduct,
    SearchResult, SkuInfo, TatInfo,
};
