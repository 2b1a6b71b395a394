use std::sync::Arc;

use anyhow::{Context, Result};
use skycast_core::Config;
use skycast_search::{GeolocationStatus, SearchSession, SearchState};
use skycast_weather::{ApiClient, ForecastState, LocationCandidate, StaticGeolocation};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::{mpsc, watch};

/// One line of terminal input
#[derive(Debug, PartialEq)]
enum Command {
    /// Plain text replaces the search query
    Query(String),
    Down,
    Up,
    Enter,
    Pick(usize),
    Forecast,
    Help,
    Quit,
    Unknown(String),
}

impl Command {
    fn parse(line: &str) -> Self {
        let Some(command) = line.trim().strip_prefix(':') else {
            return Command::Query(line.to_string());
        };
        let mut parts = command.split_whitespace();
        match (parts.next(), parts.next()) {
            (Some("down"), None) => Command::Down,
            (Some("up"), None) => Command::Up,
            (Some("enter"), None) => Command::Enter,
            (Some("pick"), Some(n)) => match n.parse() {
                Ok(n) => Command::Pick(n),
                Err(_) => Command::Unknown(command.to_string()),
            },
            (Some("forecast"), None) => Command::Forecast,
            (Some("help"), None) => Command::Help,
            (Some("quit" | "q"), None) => Command::Quit,
            _ => Command::Unknown(command.to_string()),
        }
    }
}

const HELP: &str = "\
Type to search. Commands:
  :down / :up     move the highlight
  :enter          confirm the highlighted location
  :pick N         confirm result number N
  :forecast       show the forecast for the active location
  :quit           exit";

#[tokio::main]
async fn main() -> Result<()> {
    skycast_core::init()?;

    let (config, _) = Config::load_validated()?;
    let client = Arc::new(
        ApiClient::from_config(&config.api).context("Failed to create weather client")?,
    );
    let geolocation = Arc::new(StaticGeolocation::from_config(&config.geolocation));

    let (forecast_tx, forecast_rx) = mpsc::unbounded_channel();
    let on_select = forecast_tx.clone();
    let session = SearchSession::new(Arc::clone(&client), geolocation, &config.search)
        .on_select(move |location| {
            request_forecast(&on_select, location.clone());
        });

    tracing::info!("SkyCast started against {}", client.base_url());
    println!("{}", HELP);

    tokio::spawn(forecast_worker(Arc::clone(&client), forecast_rx));
    tokio::spawn(render_results(session.subscribe()));

    if let Some(locating) = session.spawn_geolocation() {
        let states = session.subscribe();
        let forecast_tx = forecast_tx.clone();
        tokio::spawn(async move {
            if let Ok(GeolocationStatus::Resolved) = locating.await {
                let state = states.borrow().clone();
                if let (None, Some(current)) = (state.selected_item(), state.current_item()) {
                    println!("Current location: {}", current.title);
                    request_forecast(&forecast_tx, current.clone());
                }
            }
        });
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        match Command::parse(&line) {
            Command::Query(text) => session.set_query(&text),
            Command::Down => {
                session.next_item();
            }
            Command::Up => {
                session.prev_item();
            }
            Command::Enter => {
                if session.confirm().is_none() {
                    println!("Nothing highlighted.");
                }
            }
            Command::Pick(n) => {
                let state = session.state();
                let picked = n.checked_sub(1).and_then(|i| state.results().get(i));
                match picked.and_then(|candidate| session.choose(candidate)) {
                    Some(_) => {}
                    None => println!("No result #{}.", n),
                }
            }
            Command::Forecast => match session.active_location() {
                Some(location) => {
                    request_forecast(&forecast_tx, location);
                }
                None => println!("No location selected."),
            },
            Command::Help => println!("{}", HELP),
            Command::Quit => break,
            Command::Unknown(command) => println!("Unknown command :{} (try :help)", command),
        }
    }

    tracing::info!("SkyCast shutting down");
    Ok(())
}

/// Queue a forecast fetch. Returns `false` once the worker has exited.
fn request_forecast(
    forecasts: &mpsc::UnboundedSender<LocationCandidate>,
    location: LocationCandidate,
) -> bool {
    match forecasts.send(location) {
        Ok(()) => true,
        Err(e) => {
            tracing::debug!(id = e.0.id, title = %e.0.title, "Forecast worker gone, request dropped");
            false
        }
    }
}

/// Print the result list whenever what it shows changes.
async fn render_results(mut states: watch::Receiver<SearchState>) {
    let mut last = String::new();
    while states.changed().await.is_ok() {
        let view = results_view(&states.borrow_and_update());
        if !view.is_empty() && view != last {
            println!("{}", view);
        }
        last = view;
    }
}

fn results_view(state: &SearchState) -> String {
    if let Some(selected) = state.selected_item() {
        return format!("Selected {}", selected.title);
    }
    if !state.show_results_list() {
        return String::new();
    }
    state
        .results()
        .iter()
        .enumerate()
        .map(|(i, candidate)| {
            let cursor = if state.is_highlighted(candidate) { '>' } else { ' ' };
            format!("{} {}. {} ({})", cursor, i + 1, candidate.title, candidate.location_type)
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Fetch forecasts for confirmed locations. A newer location supersedes any
/// fetch still in flight.
async fn forecast_worker(
    client: Arc<ApiClient>,
    mut locations: mpsc::UnboundedReceiver<LocationCandidate>,
) {
    let (done_tx, mut done_rx) = mpsc::unbounded_channel();
    let mut forecast = ForecastState::new();

    loop {
        tokio::select! {
            Some(location) = locations.recv() => {
                let id = location.id;
                forecast.begin(location);
                println!("{}", forecast.render());

                let client = Arc::clone(&client);
                let done_tx = done_tx.clone();
                tokio::spawn(async move {
                    let result = client.fetch_forecast(id).await;
                    if done_tx.send((id, result)).is_err() {
                        tracing::debug!(id, "Forecast worker gone, result dropped");
                    }
                });
            }
            Some((id, result)) = done_rx.recv() => {
                let failure = result.as_ref().err().map(|e| e.user_message());
                if forecast.finish(id, result) {
                    if let Some(message) = failure {
                        println!("{}", message);
                    }
                    println!("{}", forecast.render());
                }
            }
            else => break,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(id: u64, title: &str) -> LocationCandidate {
        LocationCandidate {
            id,
            title: title.to_string(),
            location_type: "City".to_string(),
            latt_long: String::new(),
        }
    }

    #[test]
    fn test_parse_commands() {
        assert_eq!(Command::parse(":down"), Command::Down);
        assert_eq!(Command::parse(" :up "), Command::Up);
        assert_eq!(Command::parse(":enter"), Command::Enter);
        assert_eq!(Command::parse(":pick 3"), Command::Pick(3));
        assert_eq!(Command::parse(":forecast"), Command::Forecast);
        assert_eq!(Command::parse(":q"), Command::Quit);
        assert_eq!(Command::parse(":pick x"), Command::Unknown("pick x".to_string()));
        assert_eq!(Command::parse(":launch"), Command::Unknown("launch".to_string()));
    }

    #[test]
    fn test_plain_text_is_a_query() {
        assert_eq!(Command::parse("ho chi minh"), Command::Query("ho chi minh".to_string()));
        assert_eq!(Command::parse(""), Command::Query(String::new()));
    }

    #[test]
    fn test_results_view() {
        let mut state = SearchState::new();
        assert_eq!(results_view(&state), "");

        state.show_results(vec![candidate(1, "Berlin"), candidate(2, "Bern")]);
        state.next_item();
        assert_eq!(results_view(&state), "  1. Berlin (City)\n> 2. Bern (City)");

        state.select_item(Some(candidate(2, "Bern")));
        assert_eq!(results_view(&state), "Selected Bern");
    }

    #[test]
    fn test_request_forecast_after_worker_exit() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        assert!(request_forecast(&tx, candidate(44418, "London")));
        assert_eq!(rx.try_recv().map(|l| l.id), Ok(44418));

        drop(rx);
        assert!(!request_forecast(&tx, candidate(615702, "Paris")));
    }
}
