//! Model server probe.
//!
//! Asks an Ollama server at `llm_url` for its downloaded models so the
//! banner can say whether the configured model is actually available.

use std::time::Duration;

use serde::Deserialize;

const PROBE_TIMEOUT: Duration = Duration::from_secs(3);

#[derive(Debug, Clone, Deserialize)]
pub struct OllamaModel {
    pub name: String,
}

#[derive(Debug, Deserialize)]
struct TagsResponse {
    #[serde(default)]
    models: Vec<OllamaModel>,
}

fn tags_url(base_url: &str) -> String {
    format!("{}/api/tags", base_url.trim_end_matches('/'))
}

/// List the models the server at `base_url` has downloaded.
///
/// Must be called outside a tokio runtime.
pub fn fetch_models(base_url: &str) -> Result<Vec<OllamaModel>, String> {
    let url = tags_url(base_url);
    let client = reqwest::blocking::Client::builder()
        .timeout(PROBE_TIMEOUT)
        .build()
        .map_err(|e| format!("Failed to build HTTP client: {}", e))?;
    let response = client
        .get(&url)
        .send()
        .map_err(|e| format!("Model server unreachable at {}: {}", url, e))?;

    if !response.status().is_success() {
        return Err(format!("Model server returned HTTP {}", response.status()));
    }

    let body = response
        .text()
        .map_err(|e| format!("Failed to read model list: {}", e))?;
    parse_models(&body)
}

fn parse_models(body: &str) -> Result<Vec<OllamaModel>, String> {
    let tags: TagsResponse = serde_json::from_str(body).map_err(|e| format!("Failed to parse model list: {}", e))?;
    Ok(tags.models)
}

/// Whether `wanted` is among `models`, ignoring a `:latest` suffix.
pub fn has_model(models: &[OllamaModel], wanted: &str) -> bool {
    let bare = |s: &str| s.strip_suffix(":latest").unwrap_or(s).to_string();
    models.iter().any(|m| bare(&m.name) == bare(wanted))
}
