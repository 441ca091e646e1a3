pub mod etl;
pub mod filter;
pub mod pipeline;
pub mod render;

pub use crate::domain::model::{Article, SiteBundle};
pub use crate::domain::ports::{ConfigProvider, FetchFailurePolicy, Pipeline, Storage};
pub use crate::utils::error::Result;
