mod application;

pub use application::{AppConfig, ReadConfig};
