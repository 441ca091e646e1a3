pub mod adapters;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;
pub mod workflow;

#[cfg(feature = "cli")]
pub use config::Cli;

pub use adapters::storage::LocalStorage;
pub use config::WorkflowConfig;
pub use core::{etl::EtlEngine, pipeline::NewsPipeline};
pub use utils::error::{PagesError, Result};
pub use workflow::{Scheduler, TriggerKind, WorkflowRunner};
