//! Pharmacy GraphQL API access
//!
//! [`ApolloClient`] performs single calls and classifies failures;
//! [`AuthenticatedClient`] adds the token lifecycle on top.

pub mod authenticated;
pub mod client;

pub use authenticated::{AuthenticatedClient, BrowserAuthenticatedClient};
pub use client::{ApolloClient, UNAUTHENTICATED_CODE, classify_response};
