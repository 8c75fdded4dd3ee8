//! Wire shapes of the season-scoped racing-results API and the pure
//! functions that turn them into domain records.
//!
//! Every field on the wire is optional. Parsers never fail on a missing or
//! unparsable field: they substitute a per-field default (see
//! [`FallbackConfig`]) so one bad entry cannot sink a whole response.
//!
//! Endpoints (relative to `stats.base_url`):
//!
//! | Path | Shape |
//! |------|-------|
//! | `current/next.json` | `RaceTable` |
//! | `current/driverStandings.json` | `StandingsTable` |
//! | `current/constructorStandings.json` | `StandingsTable` |
//! | `current/circuits.json?limit=N` | `CircuitTable` |
//! | `current/drivers/{id}/results.json` | `RaceTable` |
//! | `circuits/{id}/races.json?limit=N` | `RaceTable` |
//! | `{season}/{round}/results.json` | `RaceTable` |

use serde::Deserialize;
use tracing::debug;

use crate::config::FallbackConfig;
use crate::models::{
    CircuitRecord, DriverRecord, GeoPoint, LastRaceEntry, LastRaceResults, RaceResultRecord,
    TeamRecord,
};

#[derive(Debug, Deserialize)]
pub struct Envelope<T> {
    #[serde(rename = "MRData")]
    pub data: T,
}

#[derive(Debug, Deserialize, Default)]
pub struct RaceTableData {
    #[serde(rename = "RaceTable", default)]
    pub race_table: RaceTable,
}

#[derive(Debug, Deserialize, Default)]
pub struct RaceTable {
    #[serde(rename = "Races", default)]
    pub races: Vec<Race>,
}

#[derive(Debug, Deserialize, Default, Clone)]
#[serde(rename_all = "camelCase")]
pub struct Race {
    pub season: Option<String>,
    pub round: Option<String>,
    pub race_name: Option<String>,
    pub date: Option<String>,
    #[serde(rename = "Circuit")]
    pub circuit: Option<Circuit>,
    #[serde(rename = "Results", default)]
    pub results: Vec<ResultEntry>,
}

#[derive(Debug, Deserialize, Default, Clone)]
#[serde(rename_all = "camelCase")]
pub struct Circuit {
    pub circuit_id: Option<String>,
    pub url: Option<String>,
    pub circuit_name: Option<String>,
    #[serde(rename = "Location")]
    pub location: Option<Location>,
}

#[derive(Debug, Deserialize, Default, Clone)]
pub struct Location {
    pub lat: Option<String>,
    pub long: Option<String>,
    pub locality: Option<String>,
    pub country: Option<String>,
}

#[derive(Debug, Deserialize, Default, Clone)]
#[serde(rename_all = "camelCase")]
pub struct ResultEntry {
    pub position: Option<String>,
    pub position_text: Option<String>,
    pub points: Option<String>,
    pub grid: Option<String>,
    pub status: Option<String>,
    #[serde(rename = "Driver")]
    pub driver: Option<DriverRef>,
    #[serde(rename = "Constructor")]
    pub constructor: Option<ConstructorRef>,
    #[serde(rename = "Time")]
    pub time: Option<TimeRef>,
}

#[derive(Debug, Deserialize, Default, Clone)]
#[serde(rename_all = "camelCase")]
pub struct DriverRef {
    pub driver_id: Option<String>,
    pub url: Option<String>,
    pub given_name: Option<String>,
    pub family_name: Option<String>,
    pub nationality: Option<String>,
    pub code: Option<String>,
}

#[derive(Debug, Deserialize, Default, Clone)]
#[serde(rename_all = "camelCase")]
pub struct ConstructorRef {
    pub constructor_id: Option<String>,
    pub name: Option<String>,
}

#[derive(Debug, Deserialize, Default, Clone)]
pub struct TimeRef {
    pub time: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
pub struct StandingsTableData {
    #[serde(rename = "StandingsTable", default)]
    pub standings_table: StandingsTable,
}

#[derive(Debug, Deserialize, Default)]
pub struct StandingsTable {
    #[serde(rename = "StandingsLists", default)]
    pub standings_lists: Vec<StandingsList>,
}

#[derive(Debug, Deserialize, Default)]
pub struct StandingsList {
    #[serde(rename = "DriverStandings", default)]
    pub driver_standings: Vec<DriverStanding>,
    #[serde(rename = "ConstructorStandings", default)]
    pub constructor_standings: Vec<ConstructorStanding>,
}

#[derive(Debug, Deserialize, Default, Clone)]
pub struct DriverStanding {
    pub position: Option<String>,
    pub points: Option<String>,
    pub wins: Option<String>,
    #[serde(rename = "Driver")]
    pub driver: Option<DriverRef>,
    #[serde(rename = "Constructors", default)]
    pub constructors: Vec<ConstructorRef>,
}

#[derive(Debug, Deserialize, Default, Clone)]
pub struct ConstructorStanding {
    pub position: Option<String>,
    pub points: Option<String>,
    #[serde(rename = "Constructor")]
    pub constructor: Option<ConstructorRef>,
}

#[derive(Debug, Deserialize, Default)]
pub struct CircuitTableData {
    #[serde(rename = "CircuitTable", default)]
    pub circuit_table: CircuitTable,
}

#[derive(Debug, Deserialize, Default)]
pub struct CircuitTable {
    #[serde(rename = "Circuits", default)]
    pub circuits: Vec<Circuit>,
}

// ═══════════════════════════════════════════════════════════════════════
// Normalization
// ═══════════════════════════════════════════════════════════════════════

/// Country code shown next to a driver: `"British"` → `"UK"`,
/// `"Dutch"` → `"NL"`, otherwise the first three letters uppercased.
pub fn country_code(nationality: &str) -> String {
    match nationality {
        "British" => "UK".to_string(),
        "Dutch" => "NL".to_string(),
        other => other.chars().take(3).collect::<String>().to_uppercase(),
    }
}

const FLAGS: &[(&str, &str)] = &[
    ("UK", "🇬🇧"),
    ("Great Britain", "🇬🇧"),
    ("Netherlands", "🇳🇱"),
    ("Monaco", "🇲🇨"),
    ("Australia", "🇦🇺"),
    ("Spain", "🇪🇸"),
    ("Mexico", "🇲🇽"),
    ("Germany", "🇩🇪"),
    ("Japan", "🇯🇵"),
    ("Thailand", "🇹🇭"),
    ("Denmark", "🇩🇰"),
    ("Finland", "🇫🇮"),
    ("China", "🇨🇳"),
    ("France", "🇫🇷"),
    ("USA", "🇺🇸"),
    ("United States", "🇺🇸"),
    ("Argentina", "🇦🇷"),
    ("Brazil", "🇧🇷"),
    ("Italy", "🇮🇹"),
    ("Canada", "🇨🇦"),
    ("Belgium", "🇧🇪"),
    ("Austria", "🇦🇹"),
    ("Hungary", "🇭🇺"),
    ("Singapore", "🇸🇬"),
    ("Azerbaijan", "🇦🇿"),
    ("Qatar", "🇶🇦"),
    ("Saudi Arabia", "🇸🇦"),
    ("UAE", "🇦🇪"),
    ("Abu Dhabi", "🇦🇪"),
    ("Bahrain", "🇧🇭"),
];

/// Flag glyph for a country name; `None` when the country is not mapped.
pub fn country_flag(country: &str) -> Option<&'static str> {
    FLAGS
        .iter()
        .find(|(name, _)| *name == country)
        .map(|(_, flag)| *flag)
}

/// `"locality, country"`, tolerating either half being absent.
pub fn location_label(location: Option<&Location>) -> String {
    let locality = location.and_then(|l| l.locality.as_deref()).unwrap_or("");
    let country = location.and_then(|l| l.country.as_deref()).unwrap_or("");
    match (locality.is_empty(), country.is_empty()) {
        (false, false) => format!("{}, {}", locality, country),
        (false, true) => locality.to_string(),
        _ => country.to_string(),
    }
}

fn parse_or<T: std::str::FromStr>(field: &str, raw: Option<&str>, default: T) -> T {
    match raw.map(str::trim).map(str::parse::<T>) {
        Some(Ok(value)) => value,
        Some(Err(_)) => {
            debug!(field, raw = raw.unwrap_or(""), "unparsable numeric field");
            default
        }
        None => default,
    }
}

fn text_or(raw: Option<&String>, default: &str) -> String {
    raw.filter(|s| !s.is_empty())
        .cloned()
        .unwrap_or_else(|| default.to_string())
}

fn full_name(driver: &DriverRef, fallbacks: &FallbackConfig) -> String {
    let parts: Vec<&str> = [driver.given_name.as_deref(), driver.family_name.as_deref()]
        .into_iter()
        .flatten()
        .filter(|s| !s.is_empty())
        .collect();
    if parts.is_empty() {
        fallbacks.unknown.clone()
    } else {
        parts.join(" ")
    }
}

/// A driver standing without its portrait; the adapter resolves images
/// separately and concurrently.
#[derive(Debug, Clone)]
pub struct PendingDriver {
    pub record: DriverRecord,
    pub reference_url: Option<String>,
}

/// The first standings list's driver entries, in source order. `image` is
/// left empty for the caller to fill.
pub fn driver_standings(data: StandingsTableData, fallbacks: &FallbackConfig) -> Vec<PendingDriver> {
    let entries = data
        .standings_table
        .standings_lists
        .into_iter()
        .next()
        .map(|list| list.driver_standings)
        .unwrap_or_default();

    entries
        .into_iter()
        .enumerate()
        .map(|(index, entry)| {
            let driver = entry.driver.unwrap_or_default();
            let source_rank = index as u32 + 1;
            PendingDriver {
                reference_url: driver.url.clone(),
                record: DriverRecord {
                    id: text_or(driver.driver_id.as_ref(), &fallbacks.unknown),
                    rank: parse_or("position", entry.position.as_deref(), source_rank),
                    name: full_name(&driver, fallbacks),
                    team: text_or(
                        entry.constructors.first().and_then(|c| c.name.as_ref()),
                        &fallbacks.unknown,
                    ),
                    points: parse_or("points", entry.points.as_deref(), 0.0),
                    wins: parse_or("wins", entry.wins.as_deref(), 0),
                    image: String::new(),
                    country: country_code(driver.nationality.as_deref().unwrap_or("")),
                },
            }
        })
        .collect()
}

pub fn constructor_standings(data: StandingsTableData, fallbacks: &FallbackConfig) -> Vec<TeamRecord> {
    let entries = data
        .standings_table
        .standings_lists
        .into_iter()
        .next()
        .map(|list| list.constructor_standings)
        .unwrap_or_default();

    entries
        .into_iter()
        .enumerate()
        .map(|(index, entry)| {
            let constructor = entry.constructor.unwrap_or_default();
            TeamRecord {
                id: text_or(constructor.constructor_id.as_ref(), &fallbacks.unknown),
                rank: parse_or("position", entry.position.as_deref(), index as u32 + 1),
                name: text_or(constructor.name.as_ref(), &fallbacks.unknown),
                points: parse_or("points", entry.points.as_deref(), 0.0),
                logo: String::new(),
            }
        })
        .collect()
}

pub fn circuit_record(circuit: Circuit, fallbacks: &FallbackConfig) -> CircuitRecord {
    let location = circuit.location.as_ref();
    let lat = location.and_then(|l| l.lat.as_deref()).and_then(|v| v.trim().parse::<f64>().ok());
    let lng = location.and_then(|l| l.long.as_deref()).and_then(|v| v.trim().parse::<f64>().ok());

    CircuitRecord {
        id: text_or(circuit.circuit_id.as_ref(), &fallbacks.unknown),
        name: text_or(circuit.circuit_name.as_ref(), &fallbacks.unknown),
        location: location_label(location),
        url: circuit.url.clone().unwrap_or_default(),
        coordinates: match (lat, lng) {
            (Some(lat), Some(lng)) => Some(GeoPoint { lat, lng }),
            _ => None,
        },
        image: None,
    }
}

/// Circuits in source order, capped at `limit`.
pub fn circuits(data: CircuitTableData, limit: usize, fallbacks: &FallbackConfig) -> Vec<CircuitRecord> {
    data.circuit_table
        .circuits
        .into_iter()
        .take(limit)
        .map(|c| circuit_record(c, fallbacks))
        .collect()
}

/// A driver's season results, most recent race first.
///
/// The source lists races oldest first; races without a result entry are
/// skipped.
pub fn driver_results(data: RaceTableData, fallbacks: &FallbackConfig) -> Vec<RaceResultRecord> {
    let mut results: Vec<RaceResultRecord> = data
        .race_table
        .races
        .into_iter()
        .filter_map(|race| {
            let entry = race.results.into_iter().next()?;
            Some(RaceResultRecord {
                round: race.round.unwrap_or_default(),
                race_name: text_or(race.race_name.as_ref(), &fallbacks.unknown),
                date: race.date.unwrap_or_default(),
                grid: entry.grid.unwrap_or_default(),
                position: entry
                    .position_text
                    .or(entry.position)
                    .unwrap_or_else(|| fallbacks.not_available.clone()),
                points: entry.points.unwrap_or_else(|| "0".to_string()),
                status: entry.status.unwrap_or_default(),
            })
        })
        .collect();
    results.reverse();
    results
}

/// The most recent `(season, round)` in a circuit's race list.
///
/// Sorts explicitly rather than trusting source order; entries whose season
/// or round do not parse are ignored.
pub fn latest_season_round(data: &RaceTableData) -> Option<(u32, u32)> {
    data.race_table
        .races
        .iter()
        .filter_map(|race| {
            let season = race.season.as_deref()?.trim().parse::<u32>().ok()?;
            let round = race.round.as_deref()?.trim().parse::<u32>().ok()?;
            Some((season, round))
        })
        .max()
}

fn driver_code(driver: &DriverRef) -> String {
    match driver.code.as_deref() {
        Some(code) if !code.is_empty() => code.to_string(),
        _ => driver
            .family_name
            .as_deref()
            .unwrap_or("")
            .chars()
            .filter(|c| c.is_alphabetic())
            .take(3)
            .collect::<String>()
            .to_uppercase(),
    }
}

/// Full classification of the first race in a results response.
pub fn last_race_results(data: RaceTableData, fallbacks: &FallbackConfig) -> Option<LastRaceResults> {
    let race = data.race_table.races.into_iter().next()?;

    let results = race
        .results
        .into_iter()
        .map(|entry| {
            let driver = entry.driver.clone().unwrap_or_default();
            LastRaceEntry {
                position: entry
                    .position
                    .clone()
                    .or_else(|| entry.position_text.clone())
                    .unwrap_or_else(|| fallbacks.not_available.clone()),
                driver_name: full_name(&driver, fallbacks),
                driver_code: driver_code(&driver),
                constructor: text_or(
                    entry.constructor.as_ref().and_then(|c| c.name.as_ref()),
                    &fallbacks.unknown,
                ),
                time: entry
                    .time
                    .as_ref()
                    .and_then(|t| t.time.clone())
                    .or_else(|| entry.status.clone())
                    .unwrap_or_else(|| fallbacks.not_available.clone()),
                points: entry.points.clone().unwrap_or_else(|| "0".to_string()),
            }
        })
        .collect();

    Some(LastRaceResults {
        race_name: text_or(race.race_name.as_ref(), &fallbacks.unknown),
        season: race.season.unwrap_or_default(),
        date: race.date.unwrap_or_default(),
        results,
    })
}
