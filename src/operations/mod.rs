pub mod dispatcher;
pub mod models;
pub mod registry;

pub use dispatcher::{OperationDispatcher, WorkflowConfig};
pub use registry::OperationRegistry;
