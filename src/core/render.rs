use crate::domain::model::Article;
use maud::{html, Markup, DOCTYPE};

pub const DEFAULT_TITLE: &str = "Strict AI News Blog";
pub const DEFAULT_HEADING: &str = "Latest AI News";
pub const DEFAULT_EMPTY_MESSAGE: &str = "No strictly AI-related articles found.";
pub const DEFAULT_STYLESHEET: &str =
    "https://cdn.jsdelivr.net/npm/bootstrap@5.3.0/dist/css/bootstrap.min.css";

/// Page-level text for the rendered site.
#[derive(Debug, Clone)]
pub struct PageSettings {
    pub title: String,
    pub heading: String,
    pub empty_message: String,
    pub stylesheet: String,
}

impl Default for PageSettings {
    fn default() -> Self {
        Self {
            title: DEFAULT_TITLE.to_string(),
            heading: DEFAULT_HEADING.to_string(),
            empty_message: DEFAULT_EMPTY_MESSAGE.to_string(),
            stylesheet: DEFAULT_STYLESHEET.to_string(),
        }
    }
}

fn text(value: &Option<String>) -> &str {
    value.as_deref().unwrap_or("")
}

fn render_card(article: &Article) -> Markup {
    let title = text(&article.title);
    html! {
        div class="card mb-3" {
            @if let Some(src) = article.image_url() {
                img src=(src) class="card-img-top" alt=(title);
            }
            div class="card-body" {
                h5 class="card-title" { (title) }
                p class="card-text" { (text(&article.description)) }
                a href=(text(&article.url)) target="_blank" rel="noopener" class="btn btn-primary" {
                    "Read More"
                }
                p class="card-text" {
                    small class="text-muted" {
                        "Published at: " (text(&article.published_at))
                    }
                }
            }
        }
    }
}

/// Renders the full index page. Every interpolated value is escaped by maud,
/// and identical input always produces identical bytes.
pub fn render_page(articles: &[Article], settings: &PageSettings) -> String {
    html! {
        (DOCTYPE)
        html lang="en" {
            head {
                meta charset="UTF-8";
                title { (settings.title) }
                meta name="viewport" content="width=device-width, initial-scale=1";
                link rel="stylesheet" href=(settings.stylesheet);
            }
            body {
                div class="container mt-5" {
                    h1 class="mb-4" { (settings.heading) }
                    @if articles.is_empty() {
                        p { (settings.empty_message) }
                    } @else {
                        @for article in articles {
                            (render_card(article))
                        }
                    }
                }
            }
        }
    }
    .into_string()
}
