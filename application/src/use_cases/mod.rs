//! Use cases

pub mod connection_manager;
pub mod render;
pub mod router;
