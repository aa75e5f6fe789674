pub mod pipeline;
pub mod runner;

pub use pipeline::PipelineStore;
pub use runner::{Scheduler, SchedulerConfig};
