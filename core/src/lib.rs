//! # Eventbook Core
//!
//! Domain types and traits for the eventbook booking system.
//!
//! This crate holds everything that is free of I/O:
//!
//! - **Records**: [`event::EventRecord`] and [`user::UserRecord`], the two
//!   documents the booking operation touches
//! - **Decision**: [`booking::decide`], the pure duplicate/capacity check that
//!   turns a snapshot of both records into a [`booking::BookingPlan`]
//! - **Stores**: [`store::BookingStore`], [`store::EventCatalog`] and
//!   [`store::SessionStore`], implemented by the in-memory and `PostgreSQL`
//!   crates
//! - **Payments**: [`payment::PaymentGateway`], the external charge/refund seam
//! - **Environment**: [`environment::Clock`] for deterministic time
//!
//! ## Architecture Principles
//!
//! - Functional Core, Imperative Shell
//! - The store owns atomicity: the booking write is a conditional write keyed
//!   on record versions, never an application-level lock
//! - Dependency Injection via traits (`Arc<dyn BookingStore>` etc.)
//!
//! ## Example
//!
//! ```ignore
//! use eventbook_core::booking::{decide, BookingRejection};
//!
//! // `event` is at max_attendees = 2, current_attendees = 1
//! let plan = decide(&event, &user, alice)?;
//! let (event_after, user_after) = plan.apply(event.record, user.record);
//! assert_eq!(event_after.current_attendees, 2);
//!
//! // Bob now sees a full event
//! assert_eq!(decide(&full, &bob_record, bob), Err(BookingRejection::EventFull));
//! ```

pub use chrono::{DateTime, NaiveDate, NaiveTime, Utc};

pub mod booking;
pub mod environment;
pub mod error;
pub mod event;
pub mod payment;
pub mod session;
pub mod store;
pub mod types;
pub mod user;

pub use booking::{BookingPlan, BookingRejection, decide};
pub use error::BookingError;
pub use event::{EventDetails, EventRecord, Organizer, Pricing, Venue};
pub use store::{BookingStore, EventCatalog, SessionStore, SpotReservation, StoreError};
pub use types::{EventId, Money, PaymentId, SessionId, UserId, Version, Versioned};
pub use user::UserRecord;
