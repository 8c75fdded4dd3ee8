//! Generative insight adapter.
//!
//! Three call shapes, three failure policies. Callers must respect each one:
//!
//! | Method | Shape | On failure |
//! |--------|-------|------------|
//! | [`InsightAdapter::race_analysis`] | free text | fixed apology string |
//! | [`InsightAdapter::driver_analysis`] | free text | fixed apology string |
//! | [`InsightAdapter::track_records`] | schema-constrained JSON | `None` |
//! | [`InsightAdapter::explore_track`] | grounded text + citations | fixed text, no links |

use serde_json::{json, Value};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::config::FallbackConfig;
use crate::genai::{GenerateRequest, GenerativeModel, Grounding, GroundingChunk};
use crate::models::{CircuitRecordsInsight, CitationLink, GeoPoint, TrackIntelligence};

const ANALYST_INSTRUCTION: &str = "You are an expert Formula 1 analyst and historian. \
Provide concise, data-driven insights about drivers, tracks, and strategies.";

pub struct InsightAdapter {
    model: Arc<dyn GenerativeModel>,
    fallbacks: Arc<FallbackConfig>,
}

impl InsightAdapter {
    pub fn new(model: Arc<dyn GenerativeModel>, fallbacks: Arc<FallbackConfig>) -> Self {
        Self { model, fallbacks }
    }

    pub fn model_name(&self) -> &str {
        self.model.model_name()
    }

    /// Free-form analysis framed by the analyst system instruction.
    pub async fn race_analysis(&self, prompt: &str) -> String {
        let mut request = GenerateRequest::new(prompt);
        request.system_instruction = Some(ANALYST_INSTRUCTION.to_string());

        match self.model.generate(&request).await {
            Ok(response) => response
                .text
                .unwrap_or_else(|| self.fallbacks.race_analysis_empty.clone()),
            Err(e) => {
                warn!(error = %e, "race analysis failed");
                self.fallbacks.race_analysis_failed.clone()
            }
        }
    }

    /// Three-section driver write-up built from recent results, each given as
    /// `"P{position} at {race}"`.
    pub async fn driver_analysis(&self, driver_name: &str, team: &str, recent_form: &[String]) -> String {
        let request = GenerateRequest::new(driver_analysis_prompt(driver_name, team, recent_form));

        match self.model.generate(&request).await {
            Ok(response) => response
                .text
                .unwrap_or_else(|| self.fallbacks.driver_analysis_empty.clone()),
            Err(e) => {
                warn!(driver = driver_name, error = %e, "driver analysis failed");
                self.fallbacks.driver_analysis_failed.clone()
            }
        }
    }

    /// Lap record, most wins, and a description for a circuit.
    ///
    /// `None` when the call fails, returns no text, or the text does not
    /// parse into the records shape.
    pub async fn track_records(&self, track_name: &str, location: &str) -> Option<CircuitRecordsInsight> {
        let mut request = GenerateRequest::new(format!(
            "For the Formula 1 circuit \"{}\" in {}, provide the current Lap Record \
             (Driver, Time, Year) and the driver with the Most Wins there. \
             Return strictly valid JSON.",
            track_name, location
        ));
        request.response_schema = Some(track_records_schema());

        let text = match self.model.generate(&request).await {
            Ok(response) => response.text?,
            Err(e) => {
                warn!(track = track_name, error = %e, "track records failed");
                return None;
            }
        };

        let records = parse_track_records(&text);
        if records.is_none() {
            debug!(track = track_name, "track records did not match schema");
        }
        records
    }

    /// Grounded intelligence report with web and maps citations.
    ///
    /// Never fails visibly: on error the report is a fixed message and the
    /// link list is empty.
    pub async fn explore_track(
        &self,
        track_name: &str,
        location: &str,
        coordinates: Option<GeoPoint>,
    ) -> TrackIntelligence {
        let mut request = GenerateRequest::new(track_report_prompt(track_name, location));
        request.grounding = Some(Grounding {
            web_search: true,
            maps: true,
            location: coordinates,
        });

        match self.model.generate(&request).await {
            Ok(response) => TrackIntelligence {
                text: response
                    .text
                    .unwrap_or_else(|| self.fallbacks.track_report_empty.clone()),
                links: collect_citations(&response.grounding_chunks, &self.fallbacks),
            },
            Err(e) => {
                warn!(track = track_name, error = %e, "track intelligence failed");
                TrackIntelligence {
                    text: self.fallbacks.track_report_failed.clone(),
                    links: Vec::new(),
                }
            }
        }
    }
}

pub fn driver_analysis_prompt(driver_name: &str, team: &str, recent_form: &[String]) -> String {
    format!(
        "Analyze Formula 1 driver {} driving for {}.\n\
         Based on their recent performance ({}), provide a concise 3-bullet point summary of:\n\
         1. Driving Style & Strengths\n\
         2. Current Season Form\n\
         3. Outlook for the next race\n\n\
         Keep it professional and analytical.",
        driver_name,
        team,
        recent_form.join(", ")
    )
}

fn track_report_prompt(track_name: &str, location: &str) -> String {
    format!(
        "Provide a detailed intelligence report for the Formula 1 circuit \"{}\" located in {}.\n\n\
         Use Google Maps to find specific circuit details and Google Search for historical context if needed.\n\n\
         Structure your response to cover:\n\
         1. Technical Layout: Length, corners, DRS zones.\n\
         2. Strategy Notes: Tyre wear, overtaking difficulty.\n\
         3. Historical Significance: Lap record, most wins.\n\n\
         Important: If you find Google Maps data, include it.",
        track_name, location
    )
}

pub fn track_records_schema() -> Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "lap_record": {
                "type": "OBJECT",
                "properties": {
                    "time": { "type": "STRING" },
                    "driver": { "type": "STRING" },
                    "year": { "type": "STRING" }
                }
            },
            "most_wins": {
                "type": "OBJECT",
                "properties": {
                    "driver": { "type": "STRING" },
                    "count": { "type": "STRING" }
                }
            },
            "description": { "type": "STRING" }
        }
    })
}

/// Parse schema-constrained output. Anything but a JSON object of the
/// records shape yields `None`.
pub fn parse_track_records(text: &str) -> Option<CircuitRecordsInsight> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }
    let value: Value = serde_json::from_str(text).ok()?;
    if !value.is_object() {
        return None;
    }
    serde_json::from_value(value).ok()
}

/// Maps citations first, then web citations, deduplicated by `uri` keeping
/// the first occurrence.
///
/// Maps chunks need a `uri`; web chunks need both `uri` and `title`.
pub fn collect_citations(chunks: &[GroundingChunk], fallbacks: &FallbackConfig) -> Vec<CitationLink> {
    let maps = chunks.iter().filter_map(|chunk| {
        let maps = chunk.maps.as_ref()?;
        let uri = maps.link()?;
        Some(CitationLink {
            title: maps
                .title
                .clone()
                .filter(|t| !t.is_empty())
                .unwrap_or_else(|| fallbacks.maps_citation_title.clone()),
            uri: uri.to_string(),
        })
    });

    let web = chunks.iter().filter_map(|chunk| {
        let web = chunk.web.as_ref()?;
        let uri = web.uri.as_ref().filter(|u| !u.is_empty())?;
        let title = web.title.as_ref().filter(|t| !t.is_empty())?;
        Some(CitationLink {
            title: title.clone(),
            uri: uri.clone(),
        })
    });

    let mut seen = HashSet::new();
    maps.chain(web)
        .filter(|link| seen.insert(link.uri.clone()))
        .collect()
}
