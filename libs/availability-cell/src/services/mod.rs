pub mod availability;
pub mod slot_store;

pub use availability::AvailabilityService;
pub use slot_store::SlotStore;
