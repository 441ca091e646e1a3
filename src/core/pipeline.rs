use crate::adapters::http::{NewsApiClient, NewsQuery};
use crate::core::filter::KeywordFilter;
use crate::core::render::{render_page, PageSettings};
use crate::core::{Article, ConfigProvider, FetchFailurePolicy, Pipeline, SiteBundle, Storage};
use crate::domain::model::SiteFile;
use crate::utils::error::{PagesError, Result};
use std::time::Duration;

pub const INDEX_FILE: &str = "index.html";

/// NewsAPI → keyword filter → single HTML page in the site directory.
pub struct NewsPipeline<S: Storage, C: ConfigProvider> {
    storage: S,
    config: C,
    client: NewsApiClient,
    filter: KeywordFilter,
}

impl<S: Storage, C: ConfigProvider> NewsPipeline<S, C> {
    pub fn new(storage: S, config: C) -> Result<Self> {
        let client = NewsApiClient::new(
            config.api_endpoint(),
            Duration::from_secs(config.timeout_seconds()),
        )?;
        let filter = KeywordFilter::new(config.keywords())?;

        Ok(Self {
            storage,
            config,
            client,
            filter,
        })
    }

    fn page_settings(&self) -> PageSettings {
        PageSettings {
            title: self.config.site_title().to_string(),
            heading: self.config.site_heading().to_string(),
            empty_message: self.config.empty_message().to_string(),
            stylesheet: self.config.stylesheet().to_string(),
        }
    }

    async fn fetch(&self) -> Result<Vec<Article>> {
        let api_key = self
            .config
            .api_key()
            .ok_or_else(|| PagesError::MissingConfigError {
                field: "source.api_key (or the NEWS_API_KEY environment variable)".to_string(),
            })?;

        let query = NewsQuery {
            query: self.config.query(),
            sort_by: self.config.sort_by(),
            page_size: self.config.page_size(),
            language: self.config.language(),
        };
        self.client.fetch_everything(&api_key, &query).await
    }
}

#[async_trait::async_trait]
impl<S: Storage, C: ConfigProvider> Pipeline for NewsPipeline<S, C> {
    async fn extract(&self) -> Result<Vec<Article>> {
        match self.fetch().await {
            Ok(articles) => Ok(articles),
            Err(e) => match self.config.fetch_failure_policy() {
                FetchFailurePolicy::Empty => {
                    tracing::error!("Error fetching news: {}", e);
                    tracing::warn!("Continuing with no articles");
                    Ok(Vec::new())
                }
                FetchFailurePolicy::Fail => Err(e),
            },
        }
    }

    async fn transform(&self, articles: Vec<Article>) -> Result<SiteBundle> {
        let outcome = self.filter.apply(articles);
        tracing::debug!(
            "Keyword filter kept {} articles, dropped {}",
            outcome.kept.len(),
            outcome.dropped
        );

        let html = render_page(&outcome.kept, &self.page_settings());

        Ok(SiteBundle {
            files: vec![SiteFile {
                path: INDEX_FILE.to_string(),
                contents: html,
            }],
            articles_rendered: outcome.kept.len(),
            articles_dropped: outcome.dropped,
        })
    }

    async fn load(&self, bundle: SiteBundle) -> Result<String> {
        self.storage.reset().await?;

        for file in &bundle.files {
            tracing::debug!("Writing {} ({} bytes)", file.path, file.contents.len());
            self.storage
                .write_file(&file.path, file.contents.as_bytes())
                .await?;
        }

        let output_path = format!("{}/{}", self.storage.root().trim_end_matches('/'), INDEX_FILE);
        tracing::info!("Site generated at '{}'", output_path);
        Ok(output_path)
    }
}
