//! Generative text provider abstraction.
//!
//! Defines the [`GenerativeModel`] trait and its implementations:
//! - **[`DisabledModel`]**: fails every call; used when insight is turned off
//!   or no API key is available.
//! - **[`GeminiModel`]**: calls the `models/{model}:generateContent` REST
//!   endpoint with retry and backoff.
//!
//! One request type covers the three call shapes the insight adapter needs:
//! plain generation with a system instruction, JSON-schema constrained
//! generation, and tool-grounded generation (web search + maps, optionally
//! scoped to a coordinate).

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::debug;

use crate::config::InsightConfig;
use crate::http;
use crate::models::GeoPoint;

/// Retrieval tools enabled for a grounded request.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Grounding {
    pub web_search: bool,
    pub maps: bool,
    /// Scopes the maps tool to this point when present.
    pub location: Option<GeoPoint>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct GenerateRequest {
    pub prompt: String,
    pub system_instruction: Option<String>,
    /// When set, the response is constrained to JSON matching this schema.
    pub response_schema: Option<Value>,
    pub grounding: Option<Grounding>,
}

impl GenerateRequest {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct WebSource {
    pub uri: Option<String>,
    pub title: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct MapsSource {
    pub uri: Option<String>,
    #[serde(rename = "googleMapsUri")]
    pub google_maps_uri: Option<String>,
    pub title: Option<String>,
}

impl MapsSource {
    /// `uri` when non-empty, else `googleMapsUri`.
    pub fn link(&self) -> Option<&str> {
        [&self.uri, &self.google_maps_uri]
            .into_iter()
            .filter_map(|u| u.as_deref())
            .find(|u| !u.is_empty())
    }
}

/// One citation attached to a grounded response. At most one of `web` and
/// `maps` is normally set.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct GroundingChunk {
    pub web: Option<WebSource>,
    pub maps: Option<MapsSource>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct GenerateResponse {
    /// `None` when the model produced no text.
    pub text: Option<String>,
    pub grounding_chunks: Vec<GroundingChunk>,
}

#[async_trait]
pub trait GenerativeModel: Send + Sync {
    /// Returns the model identifier (e.g. `"gemini-2.5-flash"`).
    fn model_name(&self) -> &str;

    async fn generate(&self, request: &GenerateRequest) -> Result<GenerateResponse>;
}

// ============ Disabled Model ============

pub struct DisabledModel;

#[async_trait]
impl GenerativeModel for DisabledModel {
    fn model_name(&self) -> &str {
        "disabled"
    }

    async fn generate(&self, _request: &GenerateRequest) -> Result<GenerateResponse> {
        bail!("Insight provider is disabled")
    }
}

// ============ Gemini Model ============

/// Requires the API key in the environment variable named by
/// `insight.api_key_env` (default `GEMINI_API_KEY`).
pub struct GeminiModel {
    client: reqwest::Client,
    base_url: String,
    model: String,
    api_key: String,
    max_retries: u32,
}

impl GeminiModel {
    pub fn new(config: &InsightConfig) -> Result<Self> {
        let api_key = std::env::var(&config.api_key_env)
            .ok()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| anyhow::anyhow!("{} environment variable not set", config.api_key_env))?;

        Self::with_api_key(config, api_key)
    }

    pub fn with_api_key(config: &InsightConfig, api_key: String) -> Result<Self> {
        Ok(Self {
            client: http::build_client(config.timeout_secs)?,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            api_key,
            max_retries: config.max_retries,
        })
    }
}

#[async_trait]
impl GenerativeModel for GeminiModel {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn generate(&self, request: &GenerateRequest) -> Result<GenerateResponse> {
        let url = format!("{}/models/{}:generateContent", self.base_url, self.model);
        let body = request_body(request);

        let response = http::send_with_retry(self.max_retries, || {
            self.client
                .post(&url)
                .header("x-goog-api-key", &self.api_key)
                .json(&body)
        })
        .await?;

        let json: Value = http::read_json(response).await?;
        parse_response(&json)
    }
}

/// Build the `generateContent` request body.
pub fn request_body(request: &GenerateRequest) -> Value {
    let mut body = json!({
        "contents": [{
            "role": "user",
            "parts": [{ "text": request.prompt }],
        }],
    });

    if let Some(instruction) = &request.system_instruction {
        body["systemInstruction"] = json!({ "parts": [{ "text": instruction }] });
    }

    if let Some(schema) = &request.response_schema {
        body["generationConfig"] = json!({
            "responseMimeType": "application/json",
            "responseSchema": schema,
        });
    }

    if let Some(grounding) = &request.grounding {
        let mut tools = Vec::new();
        if grounding.web_search {
            tools.push(json!({ "googleSearch": {} }));
        }
        if grounding.maps {
            tools.push(json!({ "googleMaps": {} }));
        }
        body["tools"] = Value::Array(tools);

        if let Some(point) = grounding.location {
            body["toolConfig"] = json!({
                "retrievalConfig": {
                    "latLng": { "latitude": point.lat, "longitude": point.lng }
                }
            });
        }
    }

    body
}

/// Parse a `generateContent` response.
///
/// Text is the concatenation of the first candidate's text parts; empty
/// text reads as `None`. Citations come from the first candidate's
/// grounding metadata; a chunk that does not decode is dropped on its own.
pub fn parse_response(json: &Value) -> Result<GenerateResponse> {
    if let Some(error) = json.get("error") {
        bail!("Insight API error: {}", error);
    }

    let candidates = json
        .get("candidates")
        .and_then(|c| c.as_array())
        .context("Invalid insight response: missing candidates array")?;

    let Some(candidate) = candidates.first() else {
        return Ok(GenerateResponse::default());
    };

    let text: String = candidate
        .pointer("/content/parts")
        .and_then(|p| p.as_array())
        .map(|parts| {
            parts
                .iter()
                .filter(|p| !p.get("thought").and_then(Value::as_bool).unwrap_or(false))
                .filter_map(|p| p.get("text").and_then(Value::as_str))
                .collect()
        })
        .unwrap_or_default();

    let grounding_chunks = candidate
        .pointer("/groundingMetadata/groundingChunks")
        .and_then(Value::as_array)
        .map(|chunks| chunks.iter().filter_map(grounding_chunk).collect())
        .unwrap_or_default();

    Ok(GenerateResponse {
        text: if text.trim().is_empty() { None } else { Some(text) },
        grounding_chunks,
    })
}

fn grounding_chunk(chunk: &Value) -> Option<GroundingChunk> {
    match serde_json::from_value(chunk.clone()) {
        Ok(chunk) => Some(chunk),
        Err(e) => {
            debug!(error = %e, "dropping malformed grounding chunk");
            None
        }
    }
}

/// Create the [`GenerativeModel`] named by `insight.provider`.
///
/// # Errors
///
/// Returns an error for unknown providers or when the Gemini API key is not
/// in the environment.
pub fn create_model(config: &InsightConfig) -> Result<Arc<dyn GenerativeModel>> {
    match config.provider.as_str() {
        "disabled" => Ok(Arc::new(DisabledModel)),
        "gemini" => Ok(Arc::new(GeminiModel::new(config)?)),
        other => bail!("Unknown insight provider: {}", other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_request_body() {
        let mut request = GenerateRequest::new("Who wins at Monza?");
        request.system_instruction = Some("You are an analyst.".to_string());
        let body = request_body(&request);

        assert_eq!(body["contents"][0]["parts"][0]["text"], "Who wins at Monza?");
        assert_eq!(body["systemInstruction"]["parts"][0]["text"], "You are an analyst.");
        assert!(body.get("tools").is_none());
        assert!(body.get("generationConfig").is_none());
    }

    #[test]
    fn schema_request_body() {
        let mut request = GenerateRequest::new("records");
        request.response_schema = Some(json!({ "type": "OBJECT" }));
        let body = request_body(&request);

        assert_eq!(body["generationConfig"]["responseMimeType"], "application/json");
        assert_eq!(body["generationConfig"]["responseSchema"]["type"], "OBJECT");
    }

    #[test]
    fn grounded_request_body_with_location() {
        let mut request = GenerateRequest::new("report");
        request.grounding = Some(Grounding {
            web_search: true,
            maps: true,
            location: Some(GeoPoint { lat: 45.6156, lng: 9.28111 }),
        });
        let body = request_body(&request);

        let tools = body["tools"].as_array().unwrap();
        assert_eq!(tools.len(), 2);
        assert!(tools[0].get("googleSearch").is_some());
        assert!(tools[1].get("googleMaps").is_some());
        assert_eq!(body["toolConfig"]["retrievalConfig"]["latLng"]["latitude"], 45.6156);
    }

    #[test]
    fn grounded_request_body_without_location() {
        let mut request = GenerateRequest::new("report");
        request.grounding = Some(Grounding {
            web_search: true,
            maps: true,
            location: None,
        });
        assert!(request_body(&request).get("toolConfig").is_none());
    }

    #[test]
    fn parse_text_and_chunks() {
        let json = json!({
            "candidates": [{
                "content": { "parts": [
                    { "text": "thinking...", "thought": true },
                    { "text": "Monza is " },
                    { "text": "fast." }
                ] },
                "groundingMetadata": { "groundingChunks": [
                    { "maps": { "title": "Autodromo", "uri": "https://maps.example/1" } },
                    { "maps": { "title": "Parco", "googleMapsUri": "https://maps.example/2" } },
                    { "web": { "title": "Wiki", "uri": "https://web.example/1" } }
                ] }
            }]
        });

        let response = parse_response(&json).unwrap();
        assert_eq!(response.text.as_deref(), Some("Monza is fast."));
        assert_eq!(response.grounding_chunks.len(), 3);
        assert_eq!(
            response.grounding_chunks[1].maps.as_ref().unwrap().link(),
            Some("https://maps.example/2")
        );
    }

    #[test]
    fn malformed_chunk_is_dropped_alone() {
        let json = json!({
            "candidates": [{
                "content": { "parts": [{ "text": "Real Monza report" }] },
                "groundingMetadata": { "groundingChunks": [
                    { "web": { "title": 7, "uri": "u0" } },
                    { "maps": { "title": "M1", "uri": "u1", "googleMapsUri": "u1" } },
                    "not a chunk",
                    { "web": { "title": "W2", "uri": "u2" } }
                ] }
            }]
        });

        let response = parse_response(&json).unwrap();
        assert_eq!(response.text.as_deref(), Some("Real Monza report"));
        assert_eq!(response.grounding_chunks.len(), 2);
        assert_eq!(response.grounding_chunks[0].maps.as_ref().unwrap().link(), Some("u1"));
        assert_eq!(
            response.grounding_chunks[1].web.as_ref().unwrap().title.as_deref(),
            Some("W2")
        );
    }

    #[test]
    fn maps_link_prefers_uri() {
        let source = MapsSource {
            uri: Some(String::new()),
            google_maps_uri: Some("g".to_string()),
            title: None,
        };
        assert_eq!(source.link(), Some("g"));
        assert_eq!(MapsSource::default().link(), None);
    }

    #[test]
    fn parse_empty_text() {
        let json = json!({ "candidates": [{ "content": { "parts": [{ "text": "  " }] } }] });
        assert_eq!(parse_response(&json).unwrap().text, None);

        let json = json!({ "candidates": [] });
        assert_eq!(parse_response(&json).unwrap(), GenerateResponse::default());
    }

    #[test]
    fn parse_error_payloads() {
        assert!(parse_response(&json!({ "error": { "code": 400 } })).is_err());
        assert!(parse_response(&json!({ "unexpected": true })).is_err());
    }

    #[test]
    fn disabled_provider() {
        let config = InsightConfig {
            provider: "disabled".to_string(),
            ..Default::default()
        };
        let model = create_model(&config).unwrap();
        assert_eq!(model.model_name(), "disabled");
    }

    #[test]
    fn unknown_provider() {
        let config = InsightConfig {
            provider: "nope".to_string(),
            ..Default::default()
        };
        assert!(create_model(&config).is_err());
    }
}
