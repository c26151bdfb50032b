use std::sync::Arc;
use tracing::{error, info};

use super::web::{FetchedPage, SearchHit};
use crate::llm::{ChatModel, Turn};

const SEARCH_FALLBACK_CHARS: usize = 200;

/// One-shot, tool-free model calls that compress web content before it
/// re-enters a research transcript. Never fails: on model error the raw
/// content is returned in a trimmed form.
#[derive(Clone)]
pub struct Summarizer {
    model: Option<Arc<dyn ChatModel>>,
    search_focus: String,
    fetch_focus: String,
}

impl Summarizer {
    pub fn new(
        model: Arc<dyn ChatModel>,
        search_focus: impl Into<String>,
        fetch_focus: impl Into<String>,
    ) -> Self {
        Self {
            model: Some(model),
            search_focus: search_focus.into(),
            fetch_focus: fetch_focus.into(),
        }
    }

    /// Skip the model entirely and always use the fallback rendering
    pub fn passthrough() -> Self {
        Self {
            model: None,
            search_focus: String::new(),
            fetch_focus: String::new(),
        }
    }

    /// Summarise each hit individually and join them into one tool result
    pub async fn summarize_search(&self, query: &str, hits: &[SearchHit]) -> String {
        let mut out = format!("Search results for: {query}\n\n");
        for (index, hit) in hits.iter().enumerate() {
            let summary = self.summarize_hit(query, index, hit).await;
            out.push_str(&format!("Result {}:\n{}\n\n", index + 1, summary));
        }
        out
    }

    async fn summarize_hit(&self, query: &str, index: usize, hit: &SearchHit) -> String {
        let Some(model) = &self.model else {
            return search_fallback(hit);
        };
        let transcript = [
            Turn::system(format!(
                "You are a search result summarizer. Extract the key information from this single search result. \
                 Keep it concise (2-3 sentences max). Include the URL. Focus on {}. \
                 Focus on facts relevant to the search query: {query}",
                self.search_focus
            )),
            Turn::user(format!(
                "Title: {}\nURL: {}\nContent: {}",
                hit.title.as_deref().unwrap_or("No title"),
                hit.url.as_deref().unwrap_or("No URL"),
                hit.content.as_deref().unwrap_or("No content"),
            )),
        ];
        info!(target: "web_tools", result = index + 1, query = %query, "Summarizing search result");
        match model.respond_without_tools(&transcript).await {
            Ok(summary) if !summary.trim().is_empty() => summary,
            Ok(_) => search_fallback(hit),
            Err(e) => {
                error!(target: "web_tools", result = index + 1, error = %e, "Failed to summarize search result");
                search_fallback(hit)
            }
        }
    }

    /// Bullet summary of a fetched page, falling back to the raw page JSON
    pub async fn summarize_page(&self, url: &str, page: &FetchedPage) -> String {
        let Some(model) = &self.model else {
            return page_fallback(page);
        };
        let transcript = [
            Turn::system(format!(
                "You are a web content summarizer. Extract and distill {} from the provided web page content. \
                 Return a concise bullet-point summary. Include the source URL in your summary.",
                self.fetch_focus
            )),
            Turn::user(format!(
                "URL: {url}\nTitle: {}\n\nContent:\n{}\n\nPlease summarize the interesting and relevant facts from this web page.",
                page.title.as_deref().unwrap_or("Unknown"),
                page.content.as_deref().unwrap_or("No content available"),
            )),
        ];
        info!(target: "web_tools", url = %url, "Summarizing fetched page");
        match model.respond_without_tools(&transcript).await {
            Ok(summary) if !summary.trim().is_empty() => summary,
            Ok(_) => page_fallback(page),
            Err(e) => {
                error!(target: "web_tools", url = %url, error = %e, "Failed to summarize web content");
                page_fallback(page)
            }
        }
    }
}

fn search_fallback(hit: &SearchHit) -> String {
    let snippet: String = hit
        .content
        .as_deref()
        .unwrap_or_default()
        .chars()
        .take(SEARCH_FALLBACK_CHARS)
        .collect();
    format!(
        "Title: {}\nURL: {}\nSummary: {}",
        hit.title.as_deref().unwrap_or("No title"),
        hit.url.as_deref().unwrap_or("No URL"),
        snippet
    )
}

fn page_fallback(page: &FetchedPage) -> String {
    serde_json::to_string(page).unwrap_or_default()
}
