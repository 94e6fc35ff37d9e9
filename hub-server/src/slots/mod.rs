//! Pickup slot administration
//!
//! Slot scheduling data comes from an external admin workflow; this
//! module owns the registry and the capacity counter. Reservation and
//! release of capacity happen inside the request lifecycle transactions,
//! not here.

mod allocator;

pub use allocator::{NewSlot, SlotAllocator, SlotError, SlotResult, SlotUpdate};
