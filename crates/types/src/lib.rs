//! Domain types shared by the Fleet client and CLI.
//!
//! Every type mirrors one resource of the fleet-management REST service and
//! deserializes from the items found inside a HAL `_embedded` collection.

use chrono::{DateTime, Utc};

pub mod access;
pub mod activity;
pub mod catalog;
pub mod device;

pub use access::{Hook, Token};
pub use activity::{DeviceEvent, Update, UpdateStatus};
pub use catalog::{Filter, Package, Segment};
pub use device::{Device, DeviceStatus};

/// A resource carrying the instant it was recorded at.
///
/// Used to bound history queries: only items newer than a given instant are
/// kept, and a page holding an older item ends the walk.
pub trait Dated {
    fn timestamp(&self) -> DateTime<Utc>;
}
