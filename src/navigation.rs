//! Navigation state.
//!
//! The current screen and selected driver live in one [`NavState`] value
//! owned by the top-level controller. Transitions are pure: they take the
//! previous state and an event and return the next state.

use serde::Serialize;

use crate::models::DriverRecord;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Screen {
    Dashboard,
    Standings,
    Tracks,
    Circuits,
    DriverDetails,
}

#[derive(Debug, Clone, PartialEq)]
pub enum NavEvent {
    Navigate(Screen),
    SelectDriver(DriverRecord),
    Back,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NavState {
    pub screen: Screen,
    pub selected_driver: Option<DriverRecord>,
}

impl Default for NavState {
    fn default() -> Self {
        Self {
            screen: Screen::Dashboard,
            selected_driver: None,
        }
    }
}

impl NavState {
    /// The screen actually shown. Driver details without a selected driver
    /// fall back to the standings.
    pub fn effective_screen(&self) -> Screen {
        match (self.screen, &self.selected_driver) {
            (Screen::DriverDetails, None) => Screen::Standings,
            (screen, _) => screen,
        }
    }
}

pub fn transition(state: &NavState, event: NavEvent) -> NavState {
    match event {
        NavEvent::Navigate(screen) => NavState {
            screen,
            selected_driver: state.selected_driver.clone(),
        },
        NavEvent::SelectDriver(driver) => NavState {
            screen: Screen::DriverDetails,
            selected_driver: Some(driver),
        },
        NavEvent::Back => match state.screen {
            Screen::DriverDetails => NavState {
                screen: Screen::Standings,
                selected_driver: state.selected_driver.clone(),
            },
            _ => state.clone(),
        },
    }
}
