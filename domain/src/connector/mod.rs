//! Connector domain module
//!
//! A connector is an external tool server described by a
//! [`ConnectorConfig`]. The application layer keeps one live connection per
//! enabled config id and reports on it through [`ConnectorStatus`].
//!
//! ```text
//!            reconcile             connect ok
//!  absent ─────────────▶ connecting ──────────▶ connected
//!    ▲                       │                     │
//!    │ removed / disabled    │ connect failed      │ reconnect
//!    └──────────────────── failed ◀────────────────┘ (via connecting)
//! ```

pub mod entities;
pub mod value_objects;

pub use entities::{ConnectorConfig, TransportKind, desired_set_hash};
pub use value_objects::{ConnectionState, ConnectorStatus};
