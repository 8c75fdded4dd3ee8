//! Shared fixtures: a stub of the upstream HTTP services served by axum on
//! an ephemeral port, and a scripted generative model.

#![allow(dead_code)]

use anyhow::{bail, Result};
use async_trait::async_trait;
use axum::body::Body;
use axum::extract::{Query, State};
use axum::http::{header::CONTENT_TYPE, StatusCode, Uri};
use axum::response::Response;
use axum::Router;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use paddock::config::Config;
use paddock::genai::{GenerateRequest, GenerateResponse, GenerativeModel};

pub const ERGAST: &str = "/ergast/f1";

#[derive(Clone)]
pub struct Stub {
    pub status: u16,
    pub content_type: &'static str,
    pub body: String,
    pub delay: Duration,
}

impl Stub {
    pub fn json(body: Value) -> Self {
        Self {
            status: 200,
            content_type: "application/json; charset=utf-8",
            body: body.to_string(),
            delay: Duration::ZERO,
        }
    }

    pub fn html(body: &str) -> Self {
        Self {
            status: 200,
            content_type: "text/html; charset=utf-8",
            body: body.to_string(),
            delay: Duration::ZERO,
        }
    }

    pub fn status(status: u16) -> Self {
        Self {
            status,
            content_type: "application/json",
            body: "{}".to_string(),
            delay: Duration::ZERO,
        }
    }
}

#[derive(Default)]
struct StubState {
    routes: Mutex<HashMap<String, Stub>>,
    hits: Mutex<HashMap<String, usize>>,
}

/// Handle to a running upstream stub.
///
/// Routes are keyed by request path. Image lookups against `/w/api.php`
/// are keyed as `wiki:<titles>`.
#[derive(Clone)]
pub struct Upstream {
    pub addr: std::net::SocketAddr,
    state: Arc<StubState>,
}

impl Upstream {
    pub async fn start() -> Self {
        let state = Arc::new(StubState::default());
        let app = Router::new().fallback(handle).with_state(state.clone());
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        Self { addr, state }
    }

    /// Stub with the standard season fixtures installed.
    pub async fn season() -> Self {
        let upstream = Self::start().await;
        install_season(&upstream);
        upstream
    }

    pub fn route(&self, key: &str, stub: Stub) {
        self.state.routes.lock().unwrap().insert(key.to_string(), stub);
    }

    pub fn ergast(&self, path: &str, body: Value) {
        self.route(&format!("{}/{}", ERGAST, path), Stub::json(body));
    }

    pub fn hits(&self, key: &str) -> usize {
        self.state.hits.lock().unwrap().get(key).copied().unwrap_or(0)
    }

    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    /// Config pointing every upstream at this stub, with retries off and no
    /// display delay.
    pub fn config(&self) -> Config {
        let mut config = Config::minimal();
        config.stats.base_url = self.url(ERGAST);
        config.stats.image_api_url = self.url("/w/api.php");
        config.stats.max_retries = 0;
        config.stats.timeout_secs = 5;
        config.insight.base_url = self.url("/gemini/v1beta");
        config.insight.max_retries = 0;
        config.views.detail_min_delay_ms = 0;
        config
    }
}

async fn handle(
    State(state): State<Arc<StubState>>,
    uri: Uri,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    let key = if uri.path().ends_with("/w/api.php") {
        format!("wiki:{}", params.get("titles").cloned().unwrap_or_default())
    } else {
        uri.path().to_string()
    };

    *state.hits.lock().unwrap().entry(key.clone()).or_default() += 1;
    let stub = state.routes.lock().unwrap().get(&key).cloned();

    let stub = match stub {
        Some(stub) => stub,
        None if key.starts_with("wiki:") => Stub::json(json!({
            "query": { "pages": { "-1": { "missing": "" } } }
        })),
        None => Stub::status(404),
    };

    if !stub.delay.is_zero() {
        tokio::time::sleep(stub.delay).await;
    }

    Response::builder()
        .status(StatusCode::from_u16(stub.status).unwrap())
        .header(CONTENT_TYPE, stub.content_type)
        .body(Body::from(stub.body))
        .unwrap()
}

pub fn thumbnail(title: &str) -> String {
    format!("https://upload.example/{}.jpg", title)
}

pub fn wiki_page(upstream: &Upstream, title: &str) {
    upstream.route(
        &format!("wiki:{}", title),
        Stub::json(json!({
            "query": { "pages": { "123": { "thumbnail": { "source": thumbnail(title) } } } }
        })),
    );
}

fn mr(body: Value) -> Value {
    json!({ "MRData": body })
}

fn monza_circuit() -> Value {
    json!({
        "circuitId": "monza",
        "url": "http://en.wikipedia.org/wiki/Monza_Circuit",
        "circuitName": "Autodromo Nazionale di Monza",
        "Location": { "lat": "45.6156", "long": "9.28111", "locality": "Monza", "country": "Italy" }
    })
}

fn spa_circuit() -> Value {
    json!({
        "circuitId": "spa",
        "url": "http://en.wikipedia.org/wiki/Circuit_de_Spa-Francorchamps",
        "circuitName": "Circuit de Spa-Francorchamps",
        "Location": { "lat": "50.4372", "long": "5.97139", "locality": "Spa", "country": "Belgium" }
    })
}

fn result_entry(position: &str, given: &str, family: &str, code: Option<&str>, team: &str, time: Option<&str>, status: &str) -> Value {
    let mut driver = json!({
        "driverId": family.to_lowercase(),
        "givenName": given,
        "familyName": family,
    });
    if let Some(code) = code {
        driver["code"] = json!(code);
    }
    let mut entry = json!({
        "position": position,
        "positionText": position,
        "points": "25",
        "grid": "2",
        "status": status,
        "Driver": driver,
        "Constructor": { "name": team },
    });
    if let Some(time) = time {
        entry["Time"] = json!({ "time": time });
    }
    entry
}

/// Standings, schedule, circuits, race history, and results for a small
/// two-driver season.
pub fn install_season(upstream: &Upstream) {
    upstream.ergast(
        "current/driverStandings.json",
        mr(json!({ "StandingsTable": { "StandingsLists": [{ "DriverStandings": [
            {
                "position": "1", "points": "423", "wins": "7",
                "Driver": {
                    "driverId": "norris", "givenName": "Lando", "familyName": "Norris",
                    "nationality": "British", "url": "http://en.wikipedia.org/wiki/Lando_Norris"
                },
                "Constructors": [{ "constructorId": "mclaren", "name": "McLaren" }]
            },
            {
                "position": "2", "points": "421", "wins": "8",
                "Driver": {
                    "driverId": "max_verstappen", "givenName": "Max", "familyName": "Verstappen",
                    "nationality": "Dutch", "url": "http://en.wikipedia.org/wiki/Max_Verstappen"
                },
                "Constructors": [{ "constructorId": "red_bull", "name": "Red Bull" }]
            }
        ]}]}})),
    );
    wiki_page(upstream, "Lando_Norris");

    upstream.ergast(
        "current/constructorStandings.json",
        mr(json!({ "StandingsTable": { "StandingsLists": [{ "ConstructorStandings": [
            { "position": "1", "points": "833", "Constructor": { "constructorId": "mclaren", "name": "McLaren" } },
            { "position": "2", "points": "469", "Constructor": { "constructorId": "ferrari", "name": "Ferrari" } }
        ]}]}})),
    );

    upstream.ergast(
        "current/next.json",
        mr(json!({ "RaceTable": { "Races": [{
            "season": "2025", "round": "16", "raceName": "Italian Grand Prix",
            "date": "2025-09-07", "Circuit": monza_circuit()
        }]}})),
    );
    wiki_page(upstream, "Monza_Circuit");

    upstream.ergast(
        "current/circuits.json",
        mr(json!({ "CircuitTable": { "Circuits": [monza_circuit(), spa_circuit()] } })),
    );

    // Deliberately out of order.
    upstream.ergast(
        "circuits/monza/races.json",
        mr(json!({ "RaceTable": { "Races": [
            { "season": "2023", "round": "14", "raceName": "Italian Grand Prix" },
            { "season": "2024", "round": "16", "raceName": "Italian Grand Prix" },
            { "season": "2019", "round": "13", "raceName": "Italian Grand Prix" }
        ]}})),
    );
    upstream.ergast(
        "2024/16/results.json",
        mr(json!({ "RaceTable": { "Races": [{
            "season": "2024", "round": "16", "raceName": "Italian Grand Prix", "date": "2024-09-01",
            "Results": [
                result_entry("1", "Charles", "Leclerc", Some("LEC"), "Ferrari", Some("1:14:40.727"), "Finished"),
                result_entry("2", "Oscar", "Piastri", None, "McLaren", Some("+2.664"), "Finished"),
                result_entry("20", "Alexander", "Albon", Some("ALB"), "Williams", None, "Retired")
            ]
        }]}})),
    );

    upstream.route(
        &format!("{}/circuits/spa/races.json", ERGAST),
        Stub::html("<html><body>Service temporarily unavailable</body></html>"),
    );

    upstream.ergast(
        "current/drivers/norris/results.json",
        mr(json!({ "RaceTable": { "Races": [
            {
                "round": "1", "raceName": "Australian Grand Prix", "date": "2025-03-16",
                "Results": [{ "position": "1", "positionText": "1", "grid": "1", "points": "25", "status": "Finished" }]
            },
            { "round": "2", "raceName": "Chinese Grand Prix", "date": "2025-03-23", "Results": [] },
            {
                "round": "3", "raceName": "Japanese Grand Prix", "date": "2025-04-06",
                "Results": [{ "position": "2", "positionText": "2", "grid": "3", "points": "18", "status": "Finished" }]
            },
            {
                "round": "4", "raceName": "Bahrain Grand Prix", "date": "2025-04-13",
                "Results": [{ "position": "18", "positionText": "R", "grid": "6", "points": "0", "status": "Retired" }]
            }
        ]}})),
    );
}

type Script = dyn Fn(&GenerateRequest) -> Result<GenerateResponse> + Send + Sync;

/// Generative model answering from a closure, with an optional per-prompt
/// delay. Records every prompt it receives.
pub struct ScriptedModel {
    script: Box<Script>,
    delays: Vec<(&'static str, Duration)>,
    pub calls: AtomicUsize,
    pub prompts: Mutex<Vec<String>>,
}

impl ScriptedModel {
    pub fn new(script: impl Fn(&GenerateRequest) -> Result<GenerateResponse> + Send + Sync + 'static) -> Self {
        Self {
            script: Box::new(script),
            delays: Vec::new(),
            calls: AtomicUsize::new(0),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn text(text: &'static str) -> Self {
        Self::new(move |_| Ok(reply(text)))
    }

    pub fn failing() -> Self {
        Self::new(|_| bail!("model unavailable"))
    }

    /// Delay answers to prompts containing `needle`.
    pub fn with_delay(mut self, needle: &'static str, delay: Duration) -> Self {
        self.delays.push((needle, delay));
        self
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl GenerativeModel for ScriptedModel {
    fn model_name(&self) -> &str {
        "scripted"
    }

    async fn generate(&self, request: &GenerateRequest) -> Result<GenerateResponse> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.prompts.lock().unwrap().push(request.prompt.clone());
        for (needle, delay) in &self.delays {
            if request.prompt.contains(needle) {
                tokio::time::sleep(*delay).await;
            }
        }
        (self.script)(request)
    }
}

pub fn reply(text: &str) -> GenerateResponse {
    GenerateResponse {
        text: Some(text.to_string()),
        grounding_chunks: Vec::new(),
    }
}
