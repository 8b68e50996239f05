//! Configuration for crudkit components.

mod executor;

pub use executor::{ExecutorConfig, ExecutorConfigBuilder};
