mod common;

use std::sync::Arc;

use common::{thumbnail, Stub, Upstream, ERGAST};
use paddock::config::{Config, FallbackConfig};
use paddock::genai::{GeminiModel, GenerativeModel};
use paddock::insight::InsightAdapter;
use paddock::models::GeoPoint;
use paddock::stats::StatsAdapter;
use serde_json::json;

fn stats(config: &Config) -> StatsAdapter {
    StatsAdapter::new(&config.stats, Arc::new(config.fallbacks.clone())).unwrap()
}

#[tokio::test]
async fn driver_standings_resolve_portraits() {
    let upstream = Upstream::season().await;
    let config = upstream.config();
    let drivers = stats(&config).driver_standings().await;

    assert_eq!(drivers.len(), 2);
    assert_eq!(drivers[0].id, "norris");
    assert_eq!(drivers[0].rank, 1);
    assert_eq!(drivers[0].name, "Lando Norris");
    assert_eq!(drivers[0].team, "McLaren");
    assert_eq!(drivers[0].points, 423.0);
    assert_eq!(drivers[0].country, "UK");
    assert_eq!(drivers[0].image, thumbnail("Lando_Norris"));

    // Missing page falls back to the silhouette.
    assert_eq!(drivers[1].country, "NL");
    assert_eq!(drivers[1].wins, 8);
    assert_eq!(drivers[1].image, config.fallbacks.driver_image);
}

#[tokio::test]
async fn constructor_standings_leave_logo_empty() {
    let upstream = Upstream::season().await;
    let teams = stats(&upstream.config()).constructor_standings().await;
    assert_eq!(teams.len(), 2);
    assert_eq!(teams[1].name, "Ferrari");
    assert_eq!(teams[1].points, 469.0);
    assert!(teams.iter().all(|t| t.logo.is_empty()));
}

#[tokio::test]
async fn next_race_is_normalized() {
    let upstream = Upstream::season().await;
    let race = stats(&upstream.config()).next_race().await.unwrap();

    assert_eq!(race.id, "monza");
    assert_eq!(race.name, "Italian Grand Prix");
    assert_eq!(race.location, "Monza, Italy");
    assert_eq!(race.flag, "🇮🇹");
    assert_eq!(race.circuit_image, thumbnail("Monza_Circuit"));
    assert_eq!(race.laps, 0);
    assert_eq!(race.length, "");
    assert!(!race.completed);
}

#[tokio::test]
async fn empty_schedule_means_no_upcoming_race() {
    let upstream = Upstream::start().await;
    upstream.ergast("current/next.json", json!({ "MRData": { "RaceTable": { "Races": [] } } }));
    assert_eq!(stats(&upstream.config()).next_race().await, None);
}

#[tokio::test]
async fn unmapped_country_gets_fallback_flag() {
    let upstream = Upstream::start().await;
    upstream.ergast(
        "current/next.json",
        json!({ "MRData": { "RaceTable": { "Races": [{
            "raceName": "Las Vegas Grand Prix", "date": "2025-11-22",
            "Circuit": { "circuitId": "vegas", "Location": { "locality": "Las Vegas", "country": "Nevada" } }
        }]}}}),
    );
    let config = upstream.config();
    let race = stats(&config).next_race().await.unwrap();
    assert_eq!(race.flag, config.fallbacks.flag);
    assert_eq!(race.circuit_image, config.fallbacks.track_image);
}

#[tokio::test]
async fn last_race_uses_latest_season_and_round() {
    let upstream = Upstream::season().await;
    let results = stats(&upstream.config())
        .last_race_results("monza")
        .await
        .unwrap();

    assert_eq!(results.season, "2024");
    assert_eq!(results.race_name, "Italian Grand Prix");
    assert_eq!(upstream.hits(&format!("{}/2024/16/results.json", ERGAST)), 1);

    assert_eq!(results.results.len(), 3);
    assert_eq!(results.results[0].driver_code, "LEC");
    assert_eq!(results.results[0].time, "1:14:40.727");
    assert_eq!(results.results[1].driver_code, "PIA");
    assert_eq!(results.results[2].time, "Retired");
}

#[tokio::test]
async fn html_body_is_a_failure_not_a_parse_error() {
    let upstream = Upstream::season().await;
    assert_eq!(stats(&upstream.config()).last_race_results("spa").await, None);
}

#[tokio::test]
async fn html_results_page_fails_second_step() {
    let upstream = Upstream::season().await;
    upstream.route(
        &format!("{}/2024/16/results.json", ERGAST),
        Stub::html("<html><body>Bad gateway</body></html>"),
    );

    assert_eq!(stats(&upstream.config()).last_race_results("monza").await, None);
    assert_eq!(upstream.hits(&format!("{}/circuits/monza/races.json", ERGAST)), 1);
    assert_eq!(upstream.hits(&format!("{}/2024/16/results.json", ERGAST)), 1);
}

#[tokio::test]
async fn driver_results_most_recent_first() {
    let upstream = Upstream::season().await;
    let results = stats(&upstream.config()).driver_results("norris").await;

    let names: Vec<&str> = results.iter().map(|r| r.race_name.as_str()).collect();
    assert_eq!(
        names,
        vec!["Bahrain Grand Prix", "Japanese Grand Prix", "Australian Grand Prix"]
    );
    assert_eq!(results[0].position, "R");
}

#[tokio::test]
async fn server_errors_yield_empty_values() {
    let upstream = Upstream::start().await;
    upstream.route(&format!("{}/current/driverStandings.json", ERGAST), Stub::status(503));
    let adapter = stats(&upstream.config());

    assert!(adapter.driver_standings().await.is_empty());
    assert!(adapter.constructor_standings().await.is_empty());
    assert!(adapter.circuits().await.is_empty());
    assert_eq!(adapter.next_race().await, None);
}

#[tokio::test]
async fn unreachable_upstream_yields_empty_values() {
    let mut config = Config::minimal();
    config.stats.base_url = "http://127.0.0.1:9/ergast/f1".to_string();
    config.stats.image_api_url = "http://127.0.0.1:9/w/api.php".to_string();
    config.stats.max_retries = 0;
    let adapter = stats(&config);

    assert!(adapter.driver_standings().await.is_empty());
    assert_eq!(adapter.last_race_results("monza").await, None);
}

#[tokio::test]
async fn circuits_carry_coordinates() {
    let upstream = Upstream::season().await;
    let circuits = stats(&upstream.config()).circuits().await;
    assert_eq!(circuits.len(), 2);
    assert_eq!(circuits[0].coordinates, Some(GeoPoint { lat: 45.6156, lng: 9.28111 }));
    assert_eq!(circuits[1].location, "Spa, Belgium");
    assert!(circuits.iter().all(|c| c.image.is_none()));
}

#[tokio::test]
async fn gemini_grounded_round_trip() {
    let upstream = Upstream::start().await;
    upstream.route(
        "/gemini/v1beta/models/gemini-test:generateContent",
        Stub::json(json!({
            "candidates": [{
                "content": { "parts": [{ "text": "Monza is " }, { "text": "fast." }] },
                "groundingMetadata": { "groundingChunks": [
                    { "web": { "uri": "u1", "title": "W1" } },
                    { "maps": { "uri": "u1", "title": "M1" } },
                    { "web": { "uri": "u2", "title": "W2" } }
                ]}
            }]
        })),
    );
    let mut config = upstream.config();
    config.insight.model = "gemini-test".to_string();

    let model = GeminiModel::with_api_key(&config.insight, "test-key".to_string()).unwrap();
    assert_eq!(model.model_name(), "gemini-test");
    let insight = InsightAdapter::new(Arc::new(model), Arc::new(FallbackConfig::default()));

    let intel = insight
        .explore_track("Monza", "Monza, Italy", Some(GeoPoint { lat: 45.6, lng: 9.2 }))
        .await;
    assert_eq!(intel.text, "Monza is fast.");
    let links: Vec<(&str, &str)> = intel
        .links
        .iter()
        .map(|l| (l.title.as_str(), l.uri.as_str()))
        .collect();
    assert_eq!(links, vec![("M1", "u1"), ("W2", "u2")]);
}

#[tokio::test]
async fn malformed_citation_keeps_report_and_other_links() {
    let upstream = Upstream::start().await;
    upstream.route(
        "/gemini/v1beta/models/gemini-test:generateContent",
        Stub::json(json!({
            "candidates": [{
                "content": { "parts": [{ "text": "Real Monza report" }] },
                "groundingMetadata": { "groundingChunks": [
                    { "web": { "title": 7, "uri": "u0" } },
                    { "maps": { "title": "M1", "uri": "u1", "googleMapsUri": "u1" } },
                    { "web": { "title": "W2", "uri": "u2" } }
                ]}
            }]
        })),
    );
    let mut config = upstream.config();
    config.insight.model = "gemini-test".to_string();
    let model = GeminiModel::with_api_key(&config.insight, "test-key".to_string()).unwrap();
    let insight = InsightAdapter::new(Arc::new(model), Arc::new(FallbackConfig::default()));

    let intel = insight.explore_track("Monza", "Monza, Italy", None).await;
    assert_eq!(intel.text, "Real Monza report");
    let links: Vec<(&str, &str)> = intel
        .links
        .iter()
        .map(|l| (l.title.as_str(), l.uri.as_str()))
        .collect();
    assert_eq!(links, vec![("M1", "u1"), ("W2", "u2")]);
}

#[tokio::test]
async fn gemini_error_body_uses_failure_text() {
    let upstream = Upstream::start().await;
    upstream.route(
        "/gemini/v1beta/models/gemini-test:generateContent",
        Stub::json(json!({ "error": { "code": 400, "message": "API key not valid" } })),
    );
    let mut config = upstream.config();
    config.insight.model = "gemini-test".to_string();
    let model = GeminiModel::with_api_key(&config.insight, "bad".to_string()).unwrap();
    let insight = InsightAdapter::new(Arc::new(model), Arc::new(FallbackConfig::default()));

    assert_eq!(
        insight.race_analysis("Preview Monza").await,
        FallbackConfig::default().race_analysis_failed
    );
    assert_eq!(insight.track_records("Monza", "Italy").await, None);
}
