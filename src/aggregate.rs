//! Per-screen aggregation.
//!
//! Each method fans out to the adapters, applies the fallback table to
//! anything that failed, and returns one bundle the presentation layer can
//! render without further lookups. A failing source only ever blanks its
//! own part of a bundle.
//!
//! # Join flavors
//!
//! - **Together** ([`Aggregator::dashboard`], [`Aggregator::standings`]):
//!   members run under `tokio::join!` and the bundle is returned once all
//!   have finished. Adapters are fail-soft, so this only decides when the
//!   section stops loading.
//! - **Independent** ([`Aggregator::circuit_gallery`],
//!   [`Aggregator::driver_details`], [`Aggregator::explore_track`]): every
//!   member runs as its own task. A member that dies contributes its
//!   fallback value and never holds back the others.

use anyhow::Result;
use chrono::NaiveDate;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::circuits::CircuitRegistry;
use crate::config::{Config, FallbackConfig, ViewConfig};
use crate::genai::GenerativeModel;
use crate::insight::InsightAdapter;
use crate::models::{
    CircuitRecord, CircuitRecordsSummary, DriverRecord, LastRaceResults, RaceEventRecord,
    RaceResultRecord, TeamRecord, TrackIntelligence,
};
use crate::selection::{SelectionToken, Tagged};
use crate::stats::StatsAdapter;
use crate::views::{TrackExplorerView, TrackUpdate};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DashboardBundle {
    pub next_race: Option<RaceEventRecord>,
    pub days_until_race: Option<i64>,
    pub top_drivers: Vec<DriverRecord>,
    pub analysis: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StandingsBundle {
    pub drivers: Vec<DriverRecord>,
    pub teams: Vec<TeamRecord>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CircuitGalleryBundle {
    /// `image` is always filled.
    pub circuit: CircuitRecord,
    pub last_race: Option<LastRaceResults>,
    pub records: CircuitRecordsSummary,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DriverDetailBundle {
    pub driver: DriverRecord,
    pub results: Vec<RaceResultRecord>,
    pub recent_form: Vec<String>,
    pub analysis: String,
}

#[derive(Clone)]
pub struct Aggregator {
    stats: Arc<StatsAdapter>,
    insight: Arc<InsightAdapter>,
    fallbacks: Arc<FallbackConfig>,
    views: ViewConfig,
    circuits: Arc<CircuitRegistry>,
}

impl Aggregator {
    pub fn new(
        stats: Arc<StatsAdapter>,
        insight: Arc<InsightAdapter>,
        fallbacks: Arc<FallbackConfig>,
        views: ViewConfig,
    ) -> Self {
        Self {
            stats,
            insight,
            fallbacks,
            views,
            circuits: Arc::new(CircuitRegistry::new()),
        }
    }

    /// Build both adapters from configuration around the given model.
    pub fn from_config(config: &Config, model: Arc<dyn GenerativeModel>) -> Result<Self> {
        let fallbacks = Arc::new(config.fallbacks.clone());
        let stats = Arc::new(StatsAdapter::new(&config.stats, fallbacks.clone())?);
        let insight = Arc::new(InsightAdapter::new(model, fallbacks.clone()));
        Ok(Self::new(stats, insight, fallbacks, config.views.clone()))
    }

    /// Identifier of the model behind the insight adapter.
    pub fn model_name(&self) -> &str {
        self.insight.model_name()
    }

    pub fn circuit_registry(&self) -> &CircuitRegistry {
        &self.circuits
    }

    /// Next race, top drivers, and an analysis of the race.
    ///
    /// The analysis depends on the next race, so it starts only after both
    /// fetches have finished.
    pub async fn dashboard(&self) -> DashboardBundle {
        let (next_race, mut drivers) =
            tokio::join!(self.stats.next_race(), self.stats.driver_standings());
        drivers.truncate(self.views.top_drivers);

        let analysis = match &next_race {
            Some(race) => {
                self.insight
                    .race_analysis(&format!(
                        "Analyze the upcoming {} at {}. What should fans watch out for? \
                         Keep it under 50 words.",
                        race.name, race.location
                    ))
                    .await
            }
            None => self.fallbacks.no_upcoming_race.clone(),
        };

        let today = chrono::Utc::now().date_naive();
        DashboardBundle {
            days_until_race: next_race.as_ref().and_then(|r| days_until(&r.date, today)),
            next_race,
            top_drivers: drivers,
            analysis,
        }
    }

    pub async fn standings(&self) -> StandingsBundle {
        let (drivers, teams) = tokio::join!(
            self.stats.driver_standings(),
            self.stats.constructor_standings()
        );
        StandingsBundle { drivers, teams }
    }

    /// Fetch the circuit list into the shared registry and return it.
    pub async fn circuits(&self) -> Vec<CircuitRecord> {
        let fresh = self.stats.circuits().await;
        if !fresh.is_empty() {
            self.circuits.replace(fresh);
        }
        self.circuits.list()
    }

    /// Look a circuit up, loading the list first if it has not been loaded.
    pub async fn find_circuit(&self, circuit_id: &str) -> Option<CircuitRecord> {
        if self.circuits.is_empty() {
            self.circuits().await;
        }
        self.circuits.get(circuit_id)
    }

    pub async fn find_driver(&self, driver_id: &str) -> Option<DriverRecord> {
        self.stats
            .driver_standings()
            .await
            .into_iter()
            .find(|d| d.id == driver_id)
    }

    /// A circuit's image, resolved at most once per session.
    ///
    /// Check-then-fetch: two racing callers may both fetch, but the registry
    /// keeps the first value and both return it.
    pub async fn circuit_image(&self, circuit: &CircuitRecord) -> String {
        if let Some(image) = self.circuits.cached_image(&circuit.id) {
            return image;
        }
        let image = self.stats.circuit_image(circuit).await;
        self.circuits.fill_image(&circuit.id, image)
    }

    /// Last race results, AI circuit records, and image for one circuit,
    /// each applied independently. `None` only when the circuit is unknown.
    pub async fn circuit_gallery(&self, circuit_id: &str) -> Option<CircuitGalleryBundle> {
        let mut circuit = self.find_circuit(circuit_id).await?;

        let results_task = {
            let stats = self.stats.clone();
            let id = circuit.id.clone();
            tokio::spawn(async move { stats.last_race_results(&id).await })
        };
        let records_task = {
            let insight = self.insight.clone();
            let (name, location) = (circuit.name.clone(), circuit.location.clone());
            tokio::spawn(async move { insight.track_records(&name, &location).await })
        };
        let image_task = {
            let this = self.clone();
            let circuit = circuit.clone();
            tokio::spawn(async move { this.circuit_image(&circuit).await })
        };

        let track_image = self.fallbacks.track_image.clone();
        let (last_race, records, image) = tokio::join!(
            settle(results_task, "last race results", || None),
            settle(records_task, "track records", || None),
            settle(image_task, "circuit image", move || track_image),
        );

        circuit.image = Some(image);
        Some(CircuitGalleryBundle {
            circuit,
            last_race,
            records: CircuitRecordsSummary::from_insight(
                records.as_ref(),
                &self.fallbacks.not_available,
                &self.fallbacks.unknown,
            ),
        })
    }

    /// Season results plus an AI write-up for one driver.
    ///
    /// Results are fetched alongside a minimum display delay; a failed
    /// fetch reads as no results. The analysis uses the most recent races.
    pub async fn driver_details(&self, driver: DriverRecord) -> DriverDetailBundle {
        let results_task = {
            let stats = self.stats.clone();
            let id = driver.id.clone();
            tokio::spawn(async move { stats.driver_results(&id).await })
        };
        let delay = Duration::from_millis(self.views.detail_min_delay_ms);

        let (results, ()) = tokio::join!(
            settle(results_task, "driver results", Vec::new),
            tokio::time::sleep(delay),
        );

        let recent_form = recent_form(&results, self.views.recent_form_races);
        let analysis = self
            .insight
            .driver_analysis(&driver.name, &driver.team, &recent_form)
            .await;

        DriverDetailBundle {
            driver,
            results,
            recent_form,
            analysis,
        }
    }

    /// Start the track-explorer fan-out for `circuit`.
    ///
    /// The image and the intelligence report are sent on `updates` as soon
    /// as each one resolves, tagged with `token`. The returned handle
    /// finishes once both have been sent.
    pub fn explore_track<U>(
        &self,
        circuit: CircuitRecord,
        token: SelectionToken,
        updates: mpsc::UnboundedSender<Tagged<U>>,
    ) -> JoinHandle<()>
    where
        U: From<TrackUpdate> + Send + 'static,
    {
        let image_member = {
            let this = self.clone();
            let circuit = circuit.clone();
            let updates = updates.clone();
            let fallback = self.fallbacks.track_image.clone();
            tokio::spawn(async move {
                let task = tokio::spawn(async move { this.circuit_image(&circuit).await });
                let image = settle(task, "track image", move || fallback).await;
                if updates.send(Tagged::new(token, TrackUpdate::Image(image).into())).is_err() {
                    debug!("track image arrived after the view closed");
                }
            })
        };

        let report_member = {
            let insight = self.insight.clone();
            let fallback = TrackIntelligence {
                text: self.fallbacks.track_report_offline.clone(),
                links: Vec::new(),
            };
            tokio::spawn(async move {
                let task = tokio::spawn(async move {
                    insight
                        .explore_track(&circuit.name, &circuit.location, circuit.coordinates)
                        .await
                });
                let report = settle(task, "track intelligence", move || fallback).await;
                if updates
                    .send(Tagged::new(token, TrackUpdate::Intelligence(report).into()))
                    .is_err()
                {
                    debug!("track intelligence arrived after the view closed");
                }
            })
        };

        tokio::spawn(async move {
            let _ = tokio::join!(image_member, report_member);
        })
    }

    /// Run the track-explorer fan-out to completion and return the view.
    pub async fn track_explorer(&self, circuit: CircuitRecord) -> TrackExplorerView {
        let (tx, mut rx) = mpsc::unbounded_channel::<Tagged<TrackUpdate>>();
        let mut view = TrackExplorerView::new(circuit.clone());
        let token = SelectionToken::default();
        let _ = self.explore_track(circuit, token, tx);

        while let Some(update) = rx.recv().await {
            view.apply(update.value);
        }
        view
    }
}

/// Await a member task; if it died, log and use its fallback.
async fn settle<T>(task: JoinHandle<T>, member: &'static str, fallback: impl FnOnce() -> T) -> T {
    match task.await {
        Ok(value) => value,
        Err(e) => {
            warn!(member, error = %e, "aggregation member failed, using fallback");
            fallback()
        }
    }
}

/// `"P{position} at {race}"` for the `limit` most recent results.
pub fn recent_form(results: &[RaceResultRecord], limit: usize) -> Vec<String> {
    results
        .iter()
        .take(limit)
        .map(|r| format!("P{} at {}", r.position, r.race_name))
        .collect()
}

/// Whole days from `today` until an ISO race date; `None` if it does not parse.
pub fn days_until(date: &str, today: NaiveDate) -> Option<i64> {
    let date = NaiveDate::parse_from_str(date.trim(), "%Y-%m-%d").ok()?;
    Some((date - today).num_days())
}
