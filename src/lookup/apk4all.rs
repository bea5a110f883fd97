use std::time::Duration;

use async_trait::async_trait;
use lazy_static::lazy_static;
use log::debug;
use regex::Regex;

use super::{LookupClient, LookupError, LookupResult};

lazy_static! {
    static ref RESULT_TITLE: Regex = Regex::new(
        r#"(?is)<h[1-4][^>]*class="[^"]*\b(?:entry-)?title\b[^"]*"[^>]*>\s*<a[^>]*href="([^"]+)"[^>]*>(.*?)</a>"#
    )
    .expect("title pattern compiles");
    static ref TAG: Regex =
        Regex::new(r"<[^>]*>").expect("tag pattern compiles");
    static ref WHITESPACE: Regex =
        Regex::new(r"\s+").expect("whitespace pattern compiles");
}

/// Extract result titles and links from an apk4all search page.
pub fn parse_search_results(html: &str) -> Vec<LookupResult> {
    RESULT_TITLE
        .captures_iter(html)
        .filter_map(|caps| {
            let link = decode_entities(caps.get(1)?.as_str().trim());
            let text = TAG.replace_all(caps.get(2)?.as_str(), "");
            let name = decode_entities(WHITESPACE.replace_all(&text, " ").trim());
            if name.is_empty() || link.is_empty() {
                return None;
            }
            Some(LookupResult { name, link })
        })
        .collect()
}

fn decode_entities(s: &str) -> String {
    s.replace("&#8211;", "-")
        .replace("&#8217;", "'")
        .replace("&#038;", "&")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&amp;", "&")
}

/// Scrapes the apk4all search page over blocking HTTP.
#[derive(Clone)]
pub struct Apk4AllClient {
    base_url: String,
    agent: ureq::Agent,
}

impl Apk4AllClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout(Duration::from_secs(30))
            .user_agent(concat!("wa-selfbot/", env!("CARGO_PKG_VERSION")))
            .build();
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            agent,
        }
    }

    fn fetch(&self, query: &str) -> Result<String, LookupError> {
        let url = format!("{}/", self.base_url);
        let response = self
            .agent
            .get(&url)
            .query("s", query)
            .call()
            .map_err(|e| LookupError::Http(e.to_string()))?;
        Ok(response.into_string()?)
    }
}

#[async_trait]
impl LookupClient for Apk4AllClient {
    async fn search(&self, query: &str) -> Result<Option<Vec<LookupResult>>, LookupError> {
        let client = self.clone();
        let query = query.to_string();
        let html = tokio::task::spawn_blocking(move || client.fetch(&query))
            .await
            .map_err(|e| LookupError::Task(e.to_string()))??;

        let results = parse_search_results(&html);
        debug!("lookup returned {} results", results.len());
        Ok((!results.is_empty()).then_some(results))
    }
}
