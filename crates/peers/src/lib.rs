//! Clients for calling peer services.
//!
//! Every outbound call carries the process's service token, is bounded by a
//! timeout and comes back as a fully validated domain object or a
//! [`PeerError`]. Nothing is retried here.

pub mod catalog;
pub mod error;
pub mod http;
pub mod orders;

pub use catalog::{CatalogClient, HttpCatalogClient, InMemoryCatalogClient, Product};
pub use error::{PeerError, Result};
pub use http::{DEFAULT_PEER_TIMEOUT, PeerConfig};
pub use orders::{
    HttpOrderClient, InMemoryOrderClient, OrderClient, OrderSnapshot, OrderSnapshotItem,
};
