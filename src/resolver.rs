//! Customer context resolution
//!
//! Normalizes either a website URL or a free-text summary into the
//! `(summary, company name?)` pair that personalizes generated script text.
//! The URL branch fetches page content and summarizes it with an LLM; the
//! text branch uses the text directly and extracts a company name with
//! best-effort heuristics.

use crate::llm::{extract_json_object, LlmError, LlmService};
use crate::prompts;
use async_trait::async_trait;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, OnceLock};

/// Fallback context when the customer input carries no usable detail
pub const NO_CUSTOMER_DETAILS: &str =
    "No specific customer details provided beyond general business info.";

/// Customer-side input, exactly one of a URL or a text summary
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CustomerInput {
    Url { url: String },
    Text { text: String },
}

/// Normalized customer context
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomerContext {
    /// Concise summary used to personalize the script
    pub summary: String,
    /// Best-effort company name; absent when not identifiable
    pub company_name: Option<String>,
}

/// Errors from context resolution
#[derive(Debug, thiserror::Error)]
pub enum ResolveError {
    /// The content fetch failed (unreachable or malformed URL)
    #[error("Invalid URL: {0}. Could not extract content.")]
    Fetch(String),

    #[error("The model did not return a usable website analysis")]
    NoOutput,

    #[error(transparent)]
    Llm(#[from] LlmError),
}

impl ResolveError {
    pub fn is_retryable(&self) -> bool {
        match self {
            ResolveError::Llm(e) => e.kind.is_retryable(),
            _ => false,
        }
    }
}

// ============================================================================
// Content Fetcher
// ============================================================================

/// Fetches raw text content for a URL
#[async_trait]
pub trait ContentFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<String, ResolveError>;
}

#[async_trait]
impl<T: ContentFetcher + ?Sized> ContentFetcher for Arc<T> {
    async fn fetch(&self, url: &str) -> Result<String, ResolveError> {
        (**self).fetch(url).await
    }
}

/// Stand-in fetcher. Real scraping is out of scope; this returns placeholder
/// text for well-formed http(s) URLs and fails otherwise.
pub struct PlaceholderFetcher;

#[async_trait]
impl ContentFetcher for PlaceholderFetcher {
    async fn fetch(&self, url: &str) -> Result<String, ResolveError> {
        tracing::debug!(url = %url, "Fetching website content");
        if url.starts_with("http://") || url.starts_with("https://") {
            Ok(format!(
                "Placeholder content for {url}. This would normally be the extracted \
                 text from the website. This service currently does not implement \
                 full web scraping."
            ))
        } else {
            Err(ResolveError::Fetch(url.to_string()))
        }
    }
}

// ============================================================================
// Context Resolver
// ============================================================================

/// Resolves customer input into a normalized context
#[async_trait]
pub trait ContextResolver: Send + Sync {
    async fn resolve(&self, input: &CustomerInput) -> Result<CustomerContext, ResolveError>;
}

#[async_trait]
impl<T: ContextResolver + ?Sized> ContextResolver for Arc<T> {
    async fn resolve(&self, input: &CustomerInput) -> Result<CustomerContext, ResolveError> {
        (**self).resolve(input).await
    }
}

/// Production resolver: content fetch + LLM summarization for URLs, direct
/// text + name heuristics for text summaries
pub struct CustomerContextResolver<F> {
    fetcher: F,
    llm: Arc<dyn LlmService>,
}

impl<F: ContentFetcher> CustomerContextResolver<F> {
    pub fn new(fetcher: F, llm: Arc<dyn LlmService>) -> Self {
        Self { fetcher, llm }
    }

    async fn analyze_website(&self, url: &str) -> Result<CustomerContext, ResolveError> {
        let content = self.fetcher.fetch(url).await?;

        let request = prompts::build_website_analysis_request(url, &content);
        let response = self.llm.complete(&request).await?;
        let text = response.non_empty_text().ok_or(ResolveError::NoOutput)?;

        let json = extract_json_object(text).ok_or(ResolveError::NoOutput)?;
        let analysis: WebsiteAnalysis =
            serde_json::from_str(json).map_err(|_| ResolveError::NoOutput)?;

        Ok(CustomerContext {
            summary: analysis.summary,
            // The analysis prompt allows an empty string for "not found"
            company_name: analysis.company_name.filter(|name| !name.trim().is_empty()),
        })
    }
}

#[async_trait]
impl<F: ContentFetcher> ContextResolver for CustomerContextResolver<F> {
    async fn resolve(&self, input: &CustomerInput) -> Result<CustomerContext, ResolveError> {
        match input {
            CustomerInput::Url { url } => self.analyze_website(url).await,
            CustomerInput::Text { text } => {
                if text.trim().is_empty() {
                    return Ok(CustomerContext {
                        summary: NO_CUSTOMER_DETAILS.to_string(),
                        company_name: None,
                    });
                }
                Ok(CustomerContext {
                    summary: text.clone(),
                    company_name: extract_company_name(text),
                })
            }
        }
    }
}

/// Wire shape of the website-analysis model output
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WebsiteAnalysis {
    summary: String,
    #[serde(default)]
    company_name: Option<String>,
}

// ============================================================================
// Company Name Heuristics
// ============================================================================

fn label_regex() -> &'static Regex {
    static LABEL_RE: OnceLock<Regex> = OnceLock::new();
    LABEL_RE.get_or_init(|| {
        Regex::new(r"(?i)(?:Company Name|Business Name|Company|Business):\s*([^,\n;]+)")
            .expect("company label regex is valid")
    })
}

/// Best-effort company name extraction from a free-text customer summary.
///
/// First looks for an explicit label ("Company Name: Acme"); failing that,
/// treats the first line as the name when it is short, not a sentence, not
/// a URL, and not a generic "... services" description. Deliberately
/// permissive: a hint for the prompt, not a guarantee.
pub fn extract_company_name(text: &str) -> Option<String> {
    if let Some(captures) = label_regex().captures(text) {
        let name = captures.get(1)?.as_str().trim();
        if !name.is_empty() {
            return Some(name.to_string());
        }
    }

    let first_line = text.lines().next()?.trim();
    let lowered = first_line.to_lowercase();
    if !first_line.is_empty()
        && first_line.len() < 70
        && !first_line.contains('.')
        && !lowered.starts_with("http")
        && !lowered.contains("services")
    {
        return Some(first_line.to_string());
    }
    None
}
