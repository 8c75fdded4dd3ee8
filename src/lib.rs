//! # Paddock
//!
//! An aggregation layer for a Formula 1 dashboard.
//!
//! Two upstream adapters feed one aggregation layer:
//!
//! - [`stats::StatsAdapter`] turns the Ergast-compatible results API and the
//!   Wikipedia page-image API into typed records. It never fails: every
//!   method returns an empty collection, `None`, or a record built from
//!   fallbacks.
//! - [`insight::InsightAdapter`] wraps a [`genai::GenerativeModel`] in three
//!   call shapes (free text, schema-constrained JSON, grounded text with
//!   citations), each with its own failure policy.
//! - [`aggregate::Aggregator`] composes both into one bundle per screen, with
//!   partial-failure joins and the fallback table applied.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐   ┌──────────────┐
//! │ StatsAdapter │   │InsightAdapter│
//! │ Ergast + Wiki│   │   Gemini     │
//! └──────┬───────┘   └──────┬───────┘
//!        └────────┬─────────┘
//!                 ▼
//!          ┌─────────────┐
//!          │ Aggregator  │◀── CircuitRegistry (images, write-once)
//!          └──────┬──────┘
//!        ┌────────┼─────────┐
//!        ▼        ▼         ▼
//!    ┌──────┐ ┌────────┐ ┌──────┐
//!    │ CLI  │ │ browse │ │ HTTP │
//!    └──────┘ └────────┘ └──────┘
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration and fallback table |
//! | [`models`] | Domain records |
//! | [`http`] | Shared HTTP client, retry, JSON guard |
//! | [`ergast`] | Results API wire format and mapping |
//! | [`images`] | Wikipedia thumbnail lookup |
//! | [`stats`] | Fail-soft statistics adapter |
//! | [`genai`] | Generative model abstraction and Gemini client |
//! | [`insight`] | Fail-soft insight adapter |
//! | [`circuits`] | Shared circuit list with write-once images |
//! | [`aggregate`] | Per-screen fan-out and joins |
//! | [`selection`] | Selection tokens for stale-result rejection |
//! | [`navigation`] | Screen state transitions |
//! | [`views`] | View state fed by aggregation results |
//! | [`report`] | Text and JSON rendering |
//! | [`browse`] | Interactive browser |
//! | [`server`] | JSON HTTP API |

pub mod aggregate;
pub mod browse;
pub mod circuits;
pub mod config;
pub mod ergast;
pub mod genai;
pub mod http;
pub mod images;
pub mod insight;
pub mod models;
pub mod navigation;
pub mod report;
pub mod selection;
pub mod server;
pub mod stats;
pub mod views;
