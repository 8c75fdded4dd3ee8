//! Racing-results adapter.
//!
//! Every public method is fail-soft: transport, protocol, and shape failures
//! are logged and turned into the method's documented empty value (`None`
//! or an empty `Vec`). Callers never see an error.

use anyhow::Result;
use futures::future::join_all;
use serde::de::DeserializeOwned;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::config::{FallbackConfig, StatsConfig};
use crate::ergast::{self, CircuitTableData, Envelope, RaceTableData, StandingsTableData};
use crate::http;
use crate::images::ImageResolver;
use crate::models::{
    CircuitRecord, DriverRecord, LastRaceResults, RaceEventRecord, RaceResultRecord, TeamRecord,
};

pub struct StatsAdapter {
    client: reqwest::Client,
    config: StatsConfig,
    images: ImageResolver,
    fallbacks: Arc<FallbackConfig>,
}

impl StatsAdapter {
    pub fn new(config: &StatsConfig, fallbacks: Arc<FallbackConfig>) -> Result<Self> {
        let client = http::build_client(config.timeout_secs)?;
        Ok(Self {
            images: ImageResolver::new(client.clone(), config),
            client,
            config: config.clone(),
            fallbacks,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.config.base_url.trim_end_matches('/'), path)
    }

    async fn get<T: DeserializeOwned>(&self, path: &str, query: &[(&str, String)]) -> Result<T> {
        let envelope: Envelope<T> =
            http::get_json(&self.client, &self.url(path), query, self.config.max_retries).await?;
        Ok(envelope.data)
    }

    /// The next scheduled race, or `None` when there is none or the lookup
    /// fails. `None` means "no upcoming race" to callers.
    pub async fn next_race(&self) -> Option<RaceEventRecord> {
        let data: RaceTableData = match self.get("current/next.json", &[]).await {
            Ok(data) => data,
            Err(e) => {
                warn!(error = %e, "failed to fetch next race");
                return None;
            }
        };

        let Some(race) = data.race_table.races.into_iter().next() else {
            debug!("season has no upcoming race");
            return None;
        };

        let circuit = race.circuit.unwrap_or_default();
        let country = circuit
            .location
            .as_ref()
            .and_then(|l| l.country.as_deref())
            .unwrap_or("");
        let image = match circuit.url.as_deref() {
            Some(url) => self.resolve_image(url).await,
            None => None,
        };

        Some(RaceEventRecord {
            id: circuit
                .circuit_id
                .clone()
                .unwrap_or_else(|| self.fallbacks.unknown.clone()),
            name: race
                .race_name
                .unwrap_or_else(|| self.fallbacks.unknown.clone()),
            date: race.date.unwrap_or_default(),
            location: ergast::location_label(circuit.location.as_ref()),
            flag: ergast::country_flag(country)
                .map(str::to_string)
                .unwrap_or_else(|| self.fallbacks.flag.clone()),
            circuit_image: image.unwrap_or_else(|| self.fallbacks.track_image.clone()),
            laps: 0,
            length: String::new(),
            completed: false,
        })
    }

    /// Current driver standings in source order, portraits resolved
    /// concurrently. Empty on failure.
    pub async fn driver_standings(&self) -> Vec<DriverRecord> {
        let data: StandingsTableData = match self.get("current/driverStandings.json", &[]).await {
            Ok(data) => data,
            Err(e) => {
                warn!(error = %e, "failed to fetch driver standings");
                return Vec::new();
            }
        };

        let pending = ergast::driver_standings(data, &self.fallbacks);
        join_all(pending.into_iter().map(|p| async move {
            let image = match p.reference_url.as_deref() {
                Some(url) => self.resolve_image(url).await,
                None => None,
            };
            DriverRecord {
                image: image.unwrap_or_else(|| self.fallbacks.driver_image.clone()),
                ..p.record
            }
        }))
        .await
    }

    /// Current constructor standings. Logos are left empty. Empty on failure.
    pub async fn constructor_standings(&self) -> Vec<TeamRecord> {
        match self.get("current/constructorStandings.json", &[]).await {
            Ok(data) => ergast::constructor_standings(data, &self.fallbacks),
            Err(e) => {
                warn!(error = %e, "failed to fetch constructor standings");
                Vec::new()
            }
        }
    }

    /// Current-season circuits, images unresolved, capped at
    /// `stats.circuit_limit`. Empty on failure.
    pub async fn circuits(&self) -> Vec<CircuitRecord> {
        let limit = self.config.circuit_limit;
        let result: Result<CircuitTableData> = self
            .get("current/circuits.json", &[("limit", limit.to_string())])
            .await;
        match result {
            Ok(data) => ergast::circuits(data, limit, &self.fallbacks),
            Err(e) => {
                warn!(error = %e, "failed to fetch circuits");
                Vec::new()
            }
        }
    }

    /// A driver's current-season results, most recent first. Empty on failure.
    pub async fn driver_results(&self, driver_id: &str) -> Vec<RaceResultRecord> {
        let path = format!("current/drivers/{}/results.json", driver_id);
        match self.get(&path, &[]).await {
            Ok(data) => ergast::driver_results(data, &self.fallbacks),
            Err(e) => {
                warn!(driver_id, error = %e, "failed to fetch driver results");
                Vec::new()
            }
        }
    }

    /// Full results of the most recent race held at a circuit.
    ///
    /// Looks up the circuit's race history first, picks the latest
    /// season/round, then fetches that race's classification. `None` if
    /// either step fails or the circuit has no races.
    pub async fn last_race_results(&self, circuit_id: &str) -> Option<LastRaceResults> {
        match self.try_last_race_results(circuit_id).await {
            Ok(results) => results,
            Err(e) => {
                warn!(circuit_id, error = %e, "failed to fetch last race results");
                None
            }
        }
    }

    async fn try_last_race_results(&self, circuit_id: &str) -> Result<Option<LastRaceResults>> {
        let history: RaceTableData = self
            .get(
                &format!("circuits/{}/races.json", circuit_id),
                &[("limit", self.config.race_history_limit.to_string())],
            )
            .await?;

        let Some((season, round)) = ergast::latest_season_round(&history) else {
            debug!(circuit_id, "circuit has no race history");
            return Ok(None);
        };

        let results: RaceTableData = self
            .get(&format!("{}/{}/results.json", season, round), &[])
            .await?;
        Ok(ergast::last_race_results(results, &self.fallbacks))
    }

    /// Thumbnail for a reference URL, or `None` on any failure.
    pub async fn resolve_image(&self, reference_url: &str) -> Option<String> {
        self.images.resolve(reference_url).await
    }

    /// Thumbnail for a circuit, falling back to the default track image.
    pub async fn circuit_image(&self, circuit: &CircuitRecord) -> String {
        self.resolve_image(&circuit.url)
            .await
            .unwrap_or_else(|| self.fallbacks.track_image.clone())
    }
}
