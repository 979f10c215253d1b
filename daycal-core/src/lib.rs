//! Core of daycal: calendar events, their sync with a document store, and
//! the day-by-day projections calendar views are drawn from.
//!
//! - [`store::EventStore`] keeps the signed-in owner's events in sync with a
//!   [`remote::RemoteStore`] and mirrors them to a [`cache::LocalCache`]
//! - [`projection`] turns an event list into per-day markers, groupings and
//!   search results

pub mod cache;
pub mod config;
pub mod error;
pub mod event;
pub mod identity;
pub mod projection;
pub mod record;
pub mod remote;
pub mod store;

pub use error::{DaycalError, DaycalResult, ValidationError};
pub use event::*;
pub use store::{EventStore, Following, StoreOptions};
