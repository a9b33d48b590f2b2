pub mod connection;
pub mod dataset;
mod dispatcher;
pub mod engine;
pub mod error;
mod fetch;
mod index;
mod plan;
mod probe;

pub use dispatcher::{SqlDispatcher, SqlReadOptions};
pub use index::GlobalIndex;
