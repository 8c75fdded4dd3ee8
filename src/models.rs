//! Domain records exposed to the presentation layer.
//!
//! Records are built fresh per fetch and are immutable afterwards, with one
//! exception: [`CircuitRecord::image`], which the circuit registry fills at
//! most once per session.

use serde::{Deserialize, Deserializer, Serialize};

/// A championship competitor in the current standings snapshot.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DriverRecord {
    pub id: String,
    /// 1-based, in source order.
    pub rank: u32,
    pub name: String,
    pub team: String,
    pub points: f64,
    pub wins: u32,
    pub image: String,
    pub country: String,
}

/// A constructor in the current standings snapshot.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TeamRecord {
    pub id: String,
    pub rank: u32,
    pub name: String,
    pub points: f64,
    /// Always empty; logos are not resolved.
    pub logo: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lng: f64,
}

/// A race venue.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CircuitRecord {
    pub id: String,
    pub name: String,
    /// `"locality, country"`.
    pub location: String,
    /// Reference page used to resolve imagery.
    pub url: String,
    pub coordinates: Option<GeoPoint>,
    pub image: Option<String>,
}

/// The next scheduled race.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RaceEventRecord {
    pub id: String,
    pub name: String,
    pub date: String,
    pub location: String,
    pub flag: String,
    pub circuit_image: String,
    /// `0` when the source does not say.
    pub laps: u32,
    /// Empty when the source does not say.
    pub length: String,
    pub completed: bool,
}

/// One driver's result in one race. Positions stay strings: the source uses
/// status tokens such as `"R"` or `"W"` alongside numbers.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RaceResultRecord {
    pub round: String,
    pub race_name: String,
    pub date: String,
    pub grid: String,
    pub position: String,
    pub points: String,
    pub status: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LastRaceEntry {
    pub position: String,
    pub driver_name: String,
    pub driver_code: String,
    pub constructor: String,
    /// Finishing time, or the status text when the driver has none.
    pub time: String,
    pub points: String,
}

/// Full classification of the most recent race held at a circuit.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LastRaceResults {
    pub race_name: String,
    pub season: String,
    pub date: String,
    pub results: Vec<LastRaceEntry>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct LapRecord {
    #[serde(default, deserialize_with = "loose_string")]
    pub time: Option<String>,
    #[serde(default, deserialize_with = "loose_string")]
    pub driver: Option<String>,
    #[serde(default, deserialize_with = "loose_string")]
    pub year: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct MostWins {
    #[serde(default, deserialize_with = "loose_string")]
    pub driver: Option<String>,
    #[serde(default, deserialize_with = "loose_string")]
    pub count: Option<String>,
}

/// AI-derived historical facts for a circuit. Any field may be absent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct CircuitRecordsInsight {
    #[serde(default)]
    pub lap_record: Option<LapRecord>,
    #[serde(default)]
    pub most_wins: Option<MostWins>,
    #[serde(default, deserialize_with = "loose_string")]
    pub description: Option<String>,
}

/// [`CircuitRecordsInsight`] with every gap filled by a placeholder.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CircuitRecordsSummary {
    pub available: bool,
    pub lap_record_time: String,
    pub lap_record_driver: String,
    pub lap_record_year: String,
    pub most_wins_driver: String,
    pub most_wins_count: String,
    pub description: String,
}

impl CircuitRecordsSummary {
    pub fn from_insight(
        insight: Option<&CircuitRecordsInsight>,
        not_available: &str,
        unknown: &str,
    ) -> Self {
        let lap = insight.and_then(|i| i.lap_record.as_ref());
        let wins = insight.and_then(|i| i.most_wins.as_ref());
        let pick = |value: Option<&String>, placeholder: &str| {
            value
                .filter(|v| !v.trim().is_empty())
                .cloned()
                .unwrap_or_else(|| placeholder.to_string())
        };

        Self {
            available: insight.is_some(),
            lap_record_time: pick(lap.and_then(|l| l.time.as_ref()), not_available),
            lap_record_driver: pick(lap.and_then(|l| l.driver.as_ref()), unknown),
            lap_record_year: pick(lap.and_then(|l| l.year.as_ref()), not_available),
            most_wins_driver: pick(wins.and_then(|w| w.driver.as_ref()), not_available),
            most_wins_count: pick(wins.and_then(|w| w.count.as_ref()), not_available),
            description: pick(insight.and_then(|i| i.description.as_ref()), not_available),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CitationLink {
    pub title: String,
    pub uri: String,
}

/// AI-derived narrative plus citations, deduplicated by `uri`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrackIntelligence {
    pub text: String,
    pub links: Vec<CitationLink>,
}

/// Accepts strings, numbers, and booleans; anything else reads as absent.
fn loose_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(serde_json::Value::String(s)) => Some(s),
        Some(serde_json::Value::Number(n)) => Some(n.to_string()),
        Some(serde_json::Value::Bool(b)) => Some(b.to_string()),
        _ => None,
    })
}
