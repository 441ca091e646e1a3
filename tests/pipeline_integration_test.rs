use httpmock::prelude::*;
use news_pages::config::toml_config::DEFAULT_QUERY;
use news_pages::core::render::DEFAULT_EMPTY_MESSAGE;
use news_pages::{EtlEngine, LocalStorage, NewsPipeline, PagesError, WorkflowConfig};
use tempfile::TempDir;

fn config_for(server: &MockServer, output_path: &str) -> WorkflowConfig {
    let mut config = WorkflowConfig::default();
    config.source.endpoint = server.url("/v2/everything");
    config.source.api_key = Some("test-key".to_string());
    config.site.output_path = output_path.to_string();
    config
}

fn articles_body() -> serde_json::Value {
    serde_json::json!({
        "status": "ok",
        "totalResults": 3,
        "articles": [
            {
                "source": {"id": null, "name": "Tech Daily"},
                "author": "Sam",
                "title": "New Machine Learning chip ships",
                "description": "Faster training for deep models",
                "url": "https://example.com/ml-chip",
                "urlToImage": "https://example.com/ml-chip.png",
                "publishedAt": "2024-05-01T10:00:00Z",
                "content": "..."
            },
            {
                "source": {"id": null, "name": "Home & Garden"},
                "author": null,
                "title": "Paint your fence in a weekend",
                "description": "Tips for the summer",
                "url": "https://example.com/fence",
                "urlToImage": null,
                "publishedAt": "2024-05-01T09:00:00Z",
                "content": null
            },
            {
                "source": {"id": "wire", "name": "Wire"},
                "author": "Alex",
                "title": "Regulators look at <AI> safety",
                "description": null,
                "url": "https://example.com/ai-safety",
                "urlToImage": "",
                "publishedAt": "2024-05-01T08:00:00Z",
                "content": null
            }
        ]
    })
}

#[tokio::test]
async fn test_build_writes_filtered_index() -> anyhow::Result<()> {
    let temp_dir = TempDir::new()?;
    let output_path = temp_dir.path().join("site").display().to_string();

    let server = MockServer::start();
    let api_mock = server.mock(|when, then| {
        when.method(GET)
            .path("/v2/everything")
            .header("X-Api-Key", "test-key")
            .query_param("q", DEFAULT_QUERY)
            .query_param("sortBy", "publishedAt")
            .query_param("pageSize", "20")
            .query_param("language", "en");
        then.status(200)
            .header("Content-Type", "application/json")
            .json_body(articles_body());
    });

    let config = config_for(&server, &output_path);
    let storage = LocalStorage::new(output_path.clone());
    let pipeline = NewsPipeline::new(storage, config)?;
    let engine = EtlEngine::new_with_monitoring(pipeline, false);

    let index_path = engine.run().await?;
    api_mock.assert();
    assert!(index_path.ends_with("index.html"));

    let html = std::fs::read_to_string(temp_dir.path().join("site").join("index.html"))?;
    assert!(html.contains("New Machine Learning chip ships"));
    assert!(html.contains("Regulators look at &lt;AI&gt; safety"));
    assert!(!html.contains("Paint your fence"));
    assert!(html.contains(r#"<img src="https://example.com/ml-chip.png""#));
    assert!(!html.contains(DEFAULT_EMPTY_MESSAGE));

    let first = html.find("Machine Learning chip").unwrap_or(usize::MAX);
    let second = html.find("Regulators look").unwrap_or(0);
    assert!(first < second, "articles keep the order the API returned");

    Ok(())
}

#[tokio::test]
async fn test_build_replaces_previous_site() -> anyhow::Result<()> {
    let temp_dir = TempDir::new()?;
    let site_dir = temp_dir.path().join("site");
    std::fs::create_dir_all(site_dir.join("old"))?;
    std::fs::write(site_dir.join("old").join("stale.html"), "stale")?;

    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path("/v2/everything");
        then.status(200).json_body(articles_body());
    });

    let output_path = site_dir.display().to_string();
    let pipeline = NewsPipeline::new(
        LocalStorage::new(output_path.clone()),
        config_for(&server, &output_path),
    )?;
    EtlEngine::new(pipeline).run().await?;

    assert!(site_dir.join("index.html").exists());
    assert!(!site_dir.join("old").exists());
    Ok(())
}

#[tokio::test]
async fn test_fetch_failure_renders_empty_page() -> anyhow::Result<()> {
    let temp_dir = TempDir::new()?;
    let output_path = temp_dir.path().join("site").display().to_string();

    let server = MockServer::start();
    let api_mock = server.mock(|when, then| {
        when.method(GET).path("/v2/everything");
        then.status(401).json_body(serde_json::json!({
            "status": "error",
            "code": "apiKeyInvalid",
            "message": "Your API key is invalid or incorrect."
        }));
    });

    let pipeline = NewsPipeline::new(
        LocalStorage::new(output_path.clone()),
        config_for(&server, &output_path),
    )?;
    EtlEngine::new(pipeline).run().await?;
    api_mock.assert();

    let html = std::fs::read_to_string(temp_dir.path().join("site").join("index.html"))?;
    assert!(html.contains(DEFAULT_EMPTY_MESSAGE));
    assert!(!html.contains("card-title"));
    Ok(())
}

#[tokio::test]
async fn test_fetch_failure_can_fail_the_build() -> anyhow::Result<()> {
    let temp_dir = TempDir::new()?;
    let output_path = temp_dir.path().join("site").display().to_string();

    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path("/v2/everything");
        then.status(429).json_body(serde_json::json!({
            "status": "error",
            "code": "rateLimited",
            "message": "You have made too many requests recently."
        }));
    });

    let mut config = config_for(&server, &output_path);
    config.error_handling.on_fetch_failure = "fail".to_string();
    let pipeline = NewsPipeline::new(LocalStorage::new(output_path.clone()), config)?;

    let result = EtlEngine::new(pipeline).run().await;
    match result {
        Err(PagesError::NewsApiError { code, .. }) => assert_eq!(code, "rateLimited"),
        other => panic!("expected NewsApiError, got {:?}", other),
    }
    assert!(!temp_dir.path().join("site").join("index.html").exists());
    Ok(())
}

#[tokio::test]
async fn test_error_body_with_ok_status_counts_as_failure() -> anyhow::Result<()> {
    let temp_dir = TempDir::new()?;
    let output_path = temp_dir.path().join("site").display().to_string();

    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path("/v2/everything");
        then.status(200).json_body(serde_json::json!({
            "status": "error",
            "code": "parametersMissing",
            "message": "Required parameters are missing."
        }));
    });

    let pipeline = NewsPipeline::new(
        LocalStorage::new(output_path.clone()),
        config_for(&server, &output_path),
    )?;
    EtlEngine::new(pipeline).run().await?;

    let html = std::fs::read_to_string(temp_dir.path().join("site").join("index.html"))?;
    assert!(html.contains(DEFAULT_EMPTY_MESSAGE));
    Ok(())
}
