//! Application layer for warden
//!
//! This crate contains the use cases (connection management, routing,
//! rendering) and the ports the infrastructure layer implements.
//! It depends only on the domain layer.

pub mod ports;
pub mod use_cases;

// Re-export commonly used types
pub use ports::{
    connector::{ConnectorError, ConnectorFactory, ConnectorSession},
    tool_executor::ToolExecutorPort,
};
pub use use_cases::connection_manager::{
    CatalogEntry, ConnectionManager, HealthReport, ReconcileReport,
};
pub use use_cases::render::{RenderTarget, render, render_text};
pub use use_cases::router::{DispatchOutcome, InvocationError, ToolInvocation, ToolRouter};
