//! Persistent domain models outside the request event stream

pub mod pickup_slot;
pub mod usage_counter;

pub use pickup_slot::PickupSlot;
pub use usage_counter::{UsageCounter, WeekKey};
