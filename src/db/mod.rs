//! Document store connectivity.
//!
//! The [`Connector`] owns the connection lifecycle; the
//! [`ConnectionTracker`] holds the state it produces, and drivers implement
//! [`StoreDriver`] for a concrete backend.

pub mod connector;
pub mod driver;
pub mod memory;
pub mod postgres;
pub mod state;

pub use connector::{ConnectError, Connector};
pub use driver::{open_driver, ConnectOptions, Document, DriverEvent, Filter, StoreDriver, StoreError};
pub use memory::MemoryDriver;
pub use postgres::PostgresDriver;
pub use state::{ConnectionState, ConnectionTracker};
