//! Reservation reconciliation and cleaning scheduling for a
//! property-rental management system.

pub mod engine;
pub mod feed;
pub mod limits;
pub mod model;
pub mod notify;
pub mod observability;
pub mod sweeper;
