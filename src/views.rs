//! View state fed by aggregation results.
//!
//! A [`ScreenView`] is what the interactive browser currently shows. It only
//! changes through [`ScreenView::apply`], one [`ScreenUpdate`] at a time, so
//! results that arrive in any order produce the same final view.

use serde::Serialize;

use crate::aggregate::{CircuitGalleryBundle, DashboardBundle, DriverDetailBundle, StandingsBundle};
use crate::models::{CircuitRecord, CitationLink, TrackIntelligence};
use crate::navigation::Screen;

/// One resolved member of the track-explorer fan-out.
#[derive(Debug, Clone, PartialEq)]
pub enum TrackUpdate {
    Image(String),
    Intelligence(TrackIntelligence),
}

/// Track explorer for one circuit. Each part stays `None` until its
/// member resolves.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrackExplorerView {
    pub circuit: CircuitRecord,
    pub image: Option<String>,
    pub report: Option<String>,
    pub links: Vec<CitationLink>,
}

impl TrackExplorerView {
    pub fn new(circuit: CircuitRecord) -> Self {
        Self {
            image: circuit.image.clone(),
            circuit,
            report: None,
            links: Vec::new(),
        }
    }

    pub fn apply(&mut self, update: TrackUpdate) {
        match update {
            TrackUpdate::Image(image) => {
                self.circuit.image = Some(image.clone());
                self.image = Some(image);
            }
            TrackUpdate::Intelligence(intel) => {
                self.report = Some(intel.text);
                self.links = intel.links;
            }
        }
    }

    pub fn is_loading(&self) -> bool {
        self.image.is_none() || self.report.is_none()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ScreenView {
    Loading(Screen),
    Dashboard(DashboardBundle),
    Standings(StandingsBundle),
    Circuits(Vec<CircuitRecord>),
    Gallery(Box<CircuitGalleryBundle>),
    Driver(Box<DriverDetailBundle>),
    Track(TrackExplorerView),
    NotFound(String),
}

#[derive(Debug, Clone, PartialEq)]
pub enum ScreenUpdate {
    Dashboard(DashboardBundle),
    Standings(StandingsBundle),
    Circuits(Vec<CircuitRecord>),
    Gallery(Box<CircuitGalleryBundle>),
    Driver(Box<DriverDetailBundle>),
    TrackOpened(CircuitRecord),
    Track(TrackUpdate),
    NotFound(String),
}

impl From<TrackUpdate> for ScreenUpdate {
    fn from(update: TrackUpdate) -> Self {
        ScreenUpdate::Track(update)
    }
}

impl ScreenView {
    pub fn apply(&mut self, update: ScreenUpdate) {
        *self = match (std::mem::replace(self, ScreenView::Loading(Screen::Dashboard)), update) {
            (_, ScreenUpdate::Dashboard(b)) => ScreenView::Dashboard(b),
            (_, ScreenUpdate::Standings(b)) => ScreenView::Standings(b),
            (_, ScreenUpdate::Circuits(c)) => ScreenView::Circuits(c),
            (_, ScreenUpdate::Gallery(b)) => ScreenView::Gallery(b),
            (_, ScreenUpdate::Driver(b)) => ScreenView::Driver(b),
            (_, ScreenUpdate::TrackOpened(c)) => ScreenView::Track(TrackExplorerView::new(c)),
            (ScreenView::Track(mut view), ScreenUpdate::Track(u)) => {
                view.apply(u);
                ScreenView::Track(view)
            }
            // Track parts only land on an open explorer.
            (other, ScreenUpdate::Track(_)) => other,
            (_, ScreenUpdate::NotFound(what)) => ScreenView::NotFound(what),
        };
    }
}
