//! Sea-ORM entities backing the primary store

pub mod opening_hours;
pub mod product;
pub mod shop;
pub mod sync_status;
