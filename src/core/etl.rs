use crate::core::Pipeline;
use crate::utils::error::Result;
use crate::utils::monitor::SystemMonitor;

pub struct EtlEngine<P: Pipeline> {
    pipeline: P,
    monitor: SystemMonitor,
}

impl<P: Pipeline> EtlEngine<P> {
    pub fn new(pipeline: P) -> Self {
        Self::new_with_monitoring(pipeline, false)
    }

    pub fn new_with_monitoring(pipeline: P, monitor_enabled: bool) -> Self {
        Self {
            pipeline,
            monitor: SystemMonitor::new(monitor_enabled),
        }
    }

    pub async fn run(&self) -> Result<String> {
        tracing::info!("Starting site build...");
        self.monitor.log_stats("Start");

        // Extract
        tracing::info!("Fetching articles...");
        let articles = self.pipeline.extract().await?;
        tracing::info!("Fetched {} articles", articles.len());
        self.monitor.log_stats("Extract");

        // Transform
        tracing::info!("Filtering and rendering...");
        let bundle = self.pipeline.transform(articles).await?;
        tracing::info!(
            "Rendered {} articles ({} dropped by the keyword filter)",
            bundle.articles_rendered,
            bundle.articles_dropped
        );
        self.monitor.log_stats("Transform");

        // Load
        tracing::info!("Writing site...");
        let output_path = self.pipeline.load(bundle).await?;
        self.monitor.log_stats("Load");
        self.monitor.log_final_stats();

        Ok(output_path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{Article, SiteBundle};
    use crate::domain::model::SiteFile;
    use crate::utils::error::PagesError;
    use std::sync::Mutex;

    struct RecordingPipeline {
        calls: Mutex<Vec<&'static str>>,
        fail_transform: bool,
    }

    #[async_trait::async_trait]
    impl Pipeline for RecordingPipeline {
        async fn extract(&self) -> Result<Vec<Article>> {
            self.calls.lock().unwrap().push("extract");
            Ok(vec![Article::default()])
        }

        async fn transform(&self, articles: Vec<Article>) -> Result<SiteBundle> {
            self.calls.lock().unwrap().push("transform");
            if self.fail_transform {
                return Err(PagesError::ProcessingError {
                    message: "render failed".to_string(),
                });
            }
            Ok(SiteBundle {
                files: vec![SiteFile {
                    path: "index.html".to_string(),
                    contents: String::new(),
                }],
                articles_rendered: articles.len(),
                articles_dropped: 0,
            })
        }

        async fn load(&self, _bundle: SiteBundle) -> Result<String> {
            self.calls.lock().unwrap().push("load");
            Ok("site/index.html".to_string())
        }
    }

    #[tokio::test]
    async fn test_runs_phases_in_order() {
        let engine = EtlEngine::new(RecordingPipeline {
            calls: Mutex::new(Vec::new()),
            fail_transform: false,
        });

        assert_eq!(engine.run().await.unwrap(), "site/index.html");
        assert_eq!(
            *engine.pipeline.calls.lock().unwrap(),
            vec!["extract", "transform", "load"]
        );
    }

    #[tokio::test]
    async fn test_transform_failure_skips_load() {
        let engine = EtlEngine::new(RecordingPipeline {
            calls: Mutex::new(Vec::new()),
            fail_transform: true,
        });

        assert!(engine.run().await.is_err());
        assert_eq!(*engine.pipeline.calls.lock().unwrap(), vec!["extract", "transform"]);
    }
}
