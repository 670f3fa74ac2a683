//! `PostgreSQL` store implementation for eventbook.
//!
//! This crate provides a PostgreSQL-based implementation of the
//! [`BookingStore`](eventbook_core::store::BookingStore),
//! [`EventCatalog`](eventbook_core::store::EventCatalog) and
//! [`SessionStore`](eventbook_core::store::SessionStore) traits from
//! `eventbook-core`. It uses sqlx and supports:
//!
//! - Version-checked conditional writes for bookings and organizer edits
//! - All-or-nothing booking transactions (counter, attendee, booked list)
//! - Connection pooling
//! - Embedded migrations
//!
//! # Example
//!
//! ```ignore
//! use eventbook_postgres::PostgresStore;
//!
//! async fn example() -> Result<(), Box<dyn std::error::Error>> {
//!     let store = PostgresStore::connect("postgres://localhost/eventbook").await?;
//!     store.migrate().await?;
//!     Ok(())
//! }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod rows;
mod store;

pub use store::PostgresStore;
