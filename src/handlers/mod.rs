pub mod generate;
pub mod health;
pub mod models;
pub mod tools;

pub use generate::generate_handler;
pub use health::{health_handler, ready_handler};
pub use models::list_models_handler;
pub use tools::{list_tools_handler, save_tool_handler};
