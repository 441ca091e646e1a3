use crate::domain::model::{Article, SiteBundle};
use crate::utils::error::Result;
use async_trait::async_trait;

pub trait Storage: Send + Sync {
    fn read_file(&self, path: &str) -> impl std::future::Future<Output = Result<Vec<u8>>> + Send;
    fn write_file(
        &self,
        path: &str,
        data: &[u8],
    ) -> impl std::future::Future<Output = Result<()>> + Send;
    /// Remove everything under the storage root and recreate it empty.
    fn reset(&self) -> impl std::future::Future<Output = Result<()>> + Send;
    fn root(&self) -> &str;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchFailurePolicy {
    /// Log the failure and render the "no articles" page.
    Empty,
    /// Propagate the failure and halt the run.
    Fail,
}

pub trait ConfigProvider: Send + Sync {
    fn api_endpoint(&self) -> &str;
    fn api_key(&self) -> Option<String>;
    fn query(&self) -> &str;
    fn sort_by(&self) -> &str;
    fn page_size(&self) -> u32;
    fn language(&self) -> &str;
    fn timeout_seconds(&self) -> u64;
    fn keywords(&self) -> &[String];
    fn output_path(&self) -> &str;
    fn site_title(&self) -> &str;
    fn site_heading(&self) -> &str;
    fn empty_message(&self) -> &str;
    fn stylesheet(&self) -> &str;
    fn fetch_failure_policy(&self) -> FetchFailurePolicy;
}

#[async_trait]
pub trait Pipeline: Send + Sync {
    async fn extract(&self) -> Result<Vec<Article>>;
    async fn transform(&self, articles: Vec<Article>) -> Result<SiteBundle>;
    async fn load(&self, bundle: SiteBundle) -> Result<String>;
}
