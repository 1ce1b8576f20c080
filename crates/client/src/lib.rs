//! Fleet client
//!
//! Client for the fleet-management REST service. The service exposes its
//! collections as HAL pages; this crate walks them and hands the results out
//! as push-based [`PageStream`]s.
//!
//! # Overview
//!
//! - [`PageStream`] - batches pushed to callbacks, ended by exactly one
//!   `completed` or `error` event
//! - [`ApiClient::retrieve_all_pages`] / [`ApiClient::retrieve_pages_until`] -
//!   walk a paginated endpoint, optionally stopping early
//! - [`ApiClient::retrieve_since`] / [`filter_since`] - only items newer than a
//!   boundary, stopping at the first page that reaches past it
//! - [`merge_all`] / [`ApiClient::retrieve_partitioned`] - one stream over
//!   several independently paginated partitions
//!
//! # Quick Start
//!
//! ```ignore
//! use fleet_client::{ApiClient, ClientConfig, PageStream};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = ApiClient::new(
//!         ClientConfig::new("https://api.fleet.example.com/v1").with_token("secret"),
//!     )?;
//!
//!     let devices = PageStream::new();
//!     devices.on_item_batch(|batch: &[fleet_types::Device]| {
//!         for device in batch {
//!             println!("{} {}", device.id, device.status);
//!         }
//!     });
//!
//!     client.list_all_devices(&devices).wait().await?;
//!     Ok(())
//! }
//! ```

pub mod api;
pub mod client;
pub mod config;
pub mod endpoint;
pub mod error;
pub mod filter;
pub mod multiplex;
pub mod page;
pub mod stream;
pub mod template;

#[cfg(test)]
mod testing;

// Re-export main types at crate root
pub use api::{LoginRequest, LoginResponse};
pub use client::{ApiClient, AUTH_HEADER, StopCondition};
pub use config::{ClientConfig, DEFAULT_API_URL};
pub use endpoint::{Endpoint, Endpoints, FetchOptions, keys};
pub use error::{ClientError, Result, SharedError};
pub use filter::{boundary_crossed, filter_since, newer_than};
pub use multiplex::merge_all;
pub use page::Envelope;
pub use stream::{PageStream, StreamState};
