//! Tool RPC protocol core
//!
//! Message model, shallow schema validation, the tool registry and the
//! dispatcher that ties them together.

pub mod builtin;
pub mod dispatcher;
pub mod registry;
pub mod schema;
pub mod types;

pub use dispatcher::Dispatcher;
pub use registry::{ToolDescriptor, ToolHandler, ToolRegistry};
