//! Dronetrack client - access to the order and drone mission store.

pub mod client;
pub mod error;
pub mod store;

pub use client::StoreClient;
pub use error::StoreError;
pub use store::OrderStore;
