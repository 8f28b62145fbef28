//! Specforge - tool specification generation service
//!
//! Generates structured, parameterized query descriptions ("tool
//! specifications") for Astra DB collections and tables with the help of
//! a language model, and manages the catalog they are saved to. This
//! library exposes the components for integration tests and embedding.

pub mod config;
pub mod error;
pub mod handlers;
pub mod pipeline;
pub mod providers;
pub mod slug;
pub mod spec;
pub mod state;
pub mod store;

// Re-export key types for convenience
pub use config::Config;
pub use error::{AppError, Result};
pub use pipeline::{generate_tool_spec, GenerateRequest, GenerationOutcome};
pub use spec::{DataType, Parameter, ToolSpecification};
pub use state::AppState;
pub use store::{CatalogStore, DataSource};
