use crate::domain::model::Article;
use crate::utils::error::{PagesError, Result};
use regex::{Regex, RegexBuilder};

pub const DEFAULT_KEYWORDS: &[&str] = &[
    "artificial intelligence",
    "machine learning",
    "deep learning",
    "neural network",
    "ai",
];

/// Whole-word, case-insensitive keyword match over title, description and content.
#[derive(Debug, Clone)]
pub struct KeywordFilter {
    pattern: Regex,
}

#[derive(Debug, Clone)]
pub struct FilterOutcome {
    pub kept: Vec<Article>,
    pub dropped: usize,
}

impl KeywordFilter {
    pub fn new<S: AsRef<str>>(keywords: &[S]) -> Result<Self> {
        let alternatives: Vec<String> = keywords
            .iter()
            .map(|k| k.as_ref().trim())
            .filter(|k| !k.is_empty())
            .map(regex::escape)
            .collect();

        if alternatives.is_empty() {
            return Err(PagesError::InvalidConfigValueError {
                field: "filter.keywords".to_string(),
                value: "[]".to_string(),
                reason: "At least one keyword is required".to_string(),
            });
        }

        let pattern = RegexBuilder::new(&format!(r"\b({})\b", alternatives.join("|")))
            .case_insensitive(true)
            .build()?;

        Ok(Self { pattern })
    }

    pub fn matches(&self, article: &Article) -> bool {
        self.pattern.is_match(&article.searchable_text())
    }

    pub fn apply(&self, articles: Vec<Article>) -> FilterOutcome {
        let total = articles.len();
        let kept: Vec<Article> = articles.into_iter().filter(|a| self.matches(a)).collect();

        FilterOutcome {
            dropped: total - kept.len(),
            kept,
        }
    }
}
