//! Interactive browser (`paddock browse`).
//!
//! Reads commands from stdin and renders the current screen as results
//! arrive. Every load is tagged with the selection token current when it
//! started; results for a superseded selection are dropped, so switching
//! circuits quickly never shows a stale report.

use anyhow::Result;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing::debug;

use crate::aggregate::Aggregator;
use crate::models::DriverRecord;
use crate::navigation::{transition, NavEvent, NavState, Screen};
use crate::report::render_view;
use crate::selection::{Selection, SelectionToken, Tagged};
use crate::views::{ScreenUpdate, ScreenView};

const HELP: &str = "\
commands:
  dashboard            next race, leaders, analysis
  standings            driver and constructor standings
  circuits             circuit gallery list
  tracks               track explorer list
  circuit <id>         gallery entry for a circuit
  track <id>           intelligence report for a circuit
  driver <id>          details for a driver on screen
  back                 previous screen
  help                 this text
  quit                 exit";

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Open(Screen),
    Circuit(String),
    Track(String),
    Driver(String),
    Back,
    Help,
    Quit,
}

pub fn parse_command(line: &str) -> Result<Command, String> {
    let mut words = line.split_whitespace();
    let verb = words.next().unwrap_or("").to_ascii_lowercase();
    let arg = words.next().map(str::to_string);

    let needs_arg = |make: fn(String) -> Command| match arg.clone() {
        Some(id) => Ok(make(id)),
        None => Err(format!("usage: {} <id>", verb)),
    };

    match verb.as_str() {
        "dashboard" | "d" => Ok(Command::Open(Screen::Dashboard)),
        "standings" | "s" => Ok(Command::Open(Screen::Standings)),
        "circuits" | "c" => Ok(Command::Open(Screen::Circuits)),
        "tracks" | "t" => Ok(Command::Open(Screen::Tracks)),
        "circuit" => needs_arg(Command::Circuit),
        "track" => needs_arg(Command::Track),
        "driver" => needs_arg(Command::Driver),
        "back" | "b" => Ok(Command::Back),
        "help" | "?" => Ok(Command::Help),
        "quit" | "q" | "exit" => Ok(Command::Quit),
        "" => Err(String::new()),
        other => Err(format!("unknown command: {} (try `help`)", other)),
    }
}

pub struct BrowseSession {
    aggregator: Aggregator,
    nav: NavState,
    selection: Selection<ScreenView>,
    updates: mpsc::UnboundedSender<Tagged<ScreenUpdate>>,
}

impl BrowseSession {
    pub fn new(aggregator: Aggregator, updates: mpsc::UnboundedSender<Tagged<ScreenUpdate>>) -> Self {
        Self {
            aggregator,
            nav: NavState::default(),
            selection: Selection::new(ScreenView::Loading(Screen::Dashboard)),
            updates,
        }
    }

    pub fn nav(&self) -> &NavState {
        &self.nav
    }

    pub fn view(&self) -> &ScreenView {
        self.selection.view()
    }

    /// Apply a tagged result. Returns whether the view changed.
    pub fn apply(&mut self, update: Tagged<ScreenUpdate>) -> bool {
        self.selection.apply(update, |view, u| view.apply(u))
    }

    /// Handle one command. Returns a message to print, if any.
    pub fn handle(&mut self, command: Command) -> Option<String> {
        match command {
            Command::Open(screen) => {
                self.navigate(NavEvent::Navigate(screen));
                None
            }
            Command::Back => {
                self.navigate(NavEvent::Back);
                None
            }
            Command::Driver(id) => match self.driver_on_screen(&id) {
                Some(driver) => {
                    self.navigate(NavEvent::SelectDriver(driver));
                    None
                }
                None => Some(format!(
                    "driver {} is not on screen; open `standings` first",
                    id
                )),
            },
            Command::Circuit(id) => {
                self.nav = transition(&self.nav, NavEvent::Navigate(Screen::Circuits));
                let token = self.selection.select(ScreenView::Loading(Screen::Circuits));
                let (aggregator, updates) = (self.aggregator.clone(), self.updates.clone());
                tokio::spawn(async move {
                    let update = match aggregator.circuit_gallery(&id).await {
                        Some(bundle) => ScreenUpdate::Gallery(Box::new(bundle)),
                        None => ScreenUpdate::NotFound(format!("circuit {}", id)),
                    };
                    send(&updates, token, update);
                });
                None
            }
            Command::Track(id) => {
                self.nav = transition(&self.nav, NavEvent::Navigate(Screen::Tracks));
                let token = self.selection.select(ScreenView::Loading(Screen::Tracks));
                let (aggregator, updates) = (self.aggregator.clone(), self.updates.clone());
                tokio::spawn(async move {
                    match aggregator.find_circuit(&id).await {
                        Some(circuit) => {
                            send(&updates, token, ScreenUpdate::TrackOpened(circuit.clone()));
                            let _ = aggregator.explore_track(circuit, token, updates);
                        }
                        None => send(&updates, token, ScreenUpdate::NotFound(format!("circuit {}", id))),
                    }
                });
                None
            }
            Command::Help => Some(HELP.to_string()),
            Command::Quit => None,
        }
    }

    fn navigate(&mut self, event: NavEvent) {
        self.nav = transition(&self.nav, event);
        let screen = self.nav.effective_screen();
        let token = self.selection.select(ScreenView::Loading(screen));
        let (aggregator, updates) = (self.aggregator.clone(), self.updates.clone());
        let driver = self.nav.selected_driver.clone();

        tokio::spawn(async move {
            let update = match (screen, driver) {
                (Screen::Dashboard, _) => ScreenUpdate::Dashboard(aggregator.dashboard().await),
                (Screen::Standings, _) => ScreenUpdate::Standings(aggregator.standings().await),
                (Screen::Circuits | Screen::Tracks, _) => {
                    ScreenUpdate::Circuits(aggregator.circuits().await)
                }
                (Screen::DriverDetails, Some(driver)) => {
                    ScreenUpdate::Driver(Box::new(aggregator.driver_details(driver).await))
                }
                (Screen::DriverDetails, None) => {
                    ScreenUpdate::Standings(aggregator.standings().await)
                }
            };
            send(&updates, token, update);
        });
    }

    fn driver_on_screen(&self, id: &str) -> Option<DriverRecord> {
        let drivers = match self.selection.view() {
            ScreenView::Standings(b) => &b.drivers,
            ScreenView::Dashboard(b) => &b.top_drivers,
            ScreenView::Driver(b) if b.driver.id == id => return Some(b.driver.clone()),
            _ => return None,
        };
        drivers.iter().find(|d| d.id == id).cloned()
    }
}

fn send(updates: &mpsc::UnboundedSender<Tagged<ScreenUpdate>>, token: SelectionToken, update: ScreenUpdate) {
    if updates.send(Tagged::new(token, update)).is_err() {
        debug!("browse session closed before update arrived");
    }
}

/// Run the interactive loop until `quit` or end of input.
pub async fn run_browse(aggregator: Aggregator) -> Result<()> {
    let (tx, mut rx) = mpsc::unbounded_channel();
    let mut session = BrowseSession::new(aggregator, tx);
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    println!("{}", HELP);
    session.handle(Command::Open(Screen::Dashboard));
    print!("{}", render_view(session.view()));

    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else { break };
                match parse_command(&line) {
                    Ok(Command::Quit) => break,
                    Ok(command) => {
                        if let Some(message) = session.handle(command) {
                            println!("{}", message);
                        } else {
                            print!("{}", render_view(session.view()));
                        }
                    }
                    Err(message) if message.is_empty() => {}
                    Err(message) => println!("{}", message),
                }
            }
            Some(update) = rx.recv() => {
                if session.apply(update) {
                    print!("{}", render_view(session.view()));
                }
            }
        }
    }
    Ok(())
}
