pub mod error;
mod id;
mod runner;

pub use id::{JobId, TaskId};
pub use runner::{materialize, LocalTaskRunner, TaskHandle, TaskRunner};
