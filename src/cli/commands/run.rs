//! `run` command
//!
//! Hosts one session in the terminal. Visitor and page signals arrive as
//! stdin lines; the surface is rendered as the JSONL event stream.
//!
//! Commands: `play`, `leave [y]`, `back`, `dismiss`, `contact`, `quit`.

use std::str::FromStr;
use std::sync::Arc;

use thiserror::Error;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::broadcast::error::{RecvError, TryRecvError};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::cli::args::RunArgs;
use crate::config::FunnelConfig;
use crate::config::validation::Validator;
use crate::error::{ConfigError, RevealGateError};
use crate::funnel::session::deadline_after;
use crate::funnel::{Collaborators, PageSignal, Session};
use crate::geo::HttpGeolocator;
use crate::navigation::SimulatedHistory;
use crate::observability::{EndReason, Event, EventEmitter, init_metrics, metrics};
use crate::storage::FileFlagStore;

use super::load_config;

/// One line of stdin input.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Input {
    /// Video widget reports playback started.
    Play,
    /// Pointer left the viewport at vertical position `y`.
    Leave(f64),
    /// Browser back gesture.
    Back,
    /// Close the exit modal.
    Dismiss,
    /// Press the call-to-action.
    Contact,
    /// End the session.
    Quit,
}

/// Unparseable stdin line.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum InputError {
    /// Unrecognized command word
    #[error("unknown command '{0}' (expected play, leave [y], back, dismiss, contact, quit)")]
    Unknown(String),

    /// `leave` with a position that is not a number
    #[error("invalid pointer position '{0}'")]
    Position(String),
}

impl FromStr for Input {
    type Err = InputError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let mut words = line.split_whitespace();
        let command = words.next().unwrap_or_default().to_ascii_lowercase();
        match command.as_str() {
            "play" => Ok(Self::Play),
            "leave" => match words.next() {
                None => Ok(Self::Leave(0.0)),
                Some(raw) => raw
                    .parse()
                    .map(Self::Leave)
                    .map_err(|_| InputError::Position(raw.to_string())),
            },
            "back" => Ok(Self::Back),
            "dismiss" => Ok(Self::Dismiss),
            "contact" => Ok(Self::Contact),
            "quit" | "exit" => Ok(Self::Quit),
            _ => Err(InputError::Unknown(command)),
        }
    }
}

/// Applies command-line overrides on top of the loaded configuration and
/// re-validates the result.
///
/// # Errors
///
/// Returns a validation error if an override produces an invalid config.
pub fn apply_overrides(
    mut config: FunnelConfig,
    args: &RunArgs,
) -> Result<FunnelConfig, ConfigError> {
    if let Some(seed) = args.seed {
        config.seed = Some(seed);
    }
    if let Some(delay) = args.reveal_delay {
        config.reveal.delay = delay;
    }
    if let Some(store) = &args.store {
        config.storage.path.clone_from(store);
    }

    let result = Validator::new().validate(&config);
    if result.has_errors() {
        return Err(ConfigError::ValidationError {
            path: "<command line>".to_string(),
            errors: result.errors,
        });
    }
    Ok(config)
}

/// Host a funnel session until quit, end of input, `--duration`, or `cancel`.
///
/// # Errors
///
/// Returns a config error if the configuration is invalid, or an I/O error if
/// the events file cannot be created or the metrics endpoint cannot bind.
pub async fn run(args: &RunArgs, cancel: CancellationToken) -> Result<(), RevealGateError> {
    let config = apply_overrides(load_config(args.config.as_deref())?, args)?;

    init_metrics(args.metrics_port)?;
    if let Some(port) = args.metrics_port {
        tracing::info!(port, "Prometheus metrics endpoint started");
    }

    let history = Arc::new(SimulatedHistory::new());
    let mut collaborators = Collaborators::offline()
        .with_store(Arc::new(FileFlagStore::new(config.storage.path.clone())))
        .with_navigation(history.clone());
    if args.offline {
        tracing::info!("offline; skipping geolocation");
    } else {
        collaborators = collaborators.with_geolocator(Arc::new(HttpGeolocator::new(
            config.geolocation.endpoint.clone(),
        )));
    }

    let session = Session::start(config, collaborators);
    let emitter = match &args.events_file {
        Some(path) => EventEmitter::from_file(path, session.id())?,
        None => EventEmitter::stdout(session.id()),
    };

    let (initial, mut changes) = session.watch_changes();
    emitter.emit(Event::SessionStarted {
        timestamp: chrono::Utc::now(),
        reveal_state: initial.reveal_state,
        viewer_count: initial.viewer_count,
        remaining_spots: initial.remaining_spots,
        closing_time: initial.closing_time,
    });

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdin_open = true;
    let deadline = args.duration.map(deadline_after);

    let reason = loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => break EndReason::Interrupted,
            () = wait_until(deadline) => break EndReason::Elapsed,
            change = changes.recv() => match change {
                Ok(change) => emitter.emit(change.into()),
                Err(RecvError::Lagged(skipped)) => {
                    metrics::record_changes_lagged(skipped);
                    tracing::warn!(skipped, "event stream fell behind; changes dropped");
                }
                Err(RecvError::Closed) => break EndReason::Quit,
            },
            line = lines.next_line(), if stdin_open => match line {
                Ok(Some(line)) => {
                    if let Some(reason) = handle_line(&line, &session, &history, &emitter) {
                        break reason;
                    }
                }
                Ok(None) => {
                    tracing::debug!("end of input");
                    stdin_open = false;
                    if deadline.is_none() {
                        break EndReason::Quit;
                    }
                }
                Err(e) => {
                    tracing::warn!(error = %e, "stdin read failed");
                    stdin_open = false;
                    if deadline.is_none() {
                        break EndReason::Quit;
                    }
                }
            },
        }
    };

    // Render whatever was published before teardown.
    loop {
        match changes.try_recv() {
            Ok(change) => emitter.emit(change.into()),
            Err(TryRecvError::Lagged(skipped)) => metrics::record_changes_lagged(skipped),
            Err(TryRecvError::Empty | TryRecvError::Closed) => break,
        }
    }

    session.shutdown().await;
    emitter.emit(Event::SessionEnded {
        timestamp: chrono::Utc::now(),
        reason,
    });
    tracing::info!(?reason, events = emitter.event_count(), "run finished");
    Ok(())
}

fn handle_line(
    line: &str,
    session: &Session,
    history: &SimulatedHistory,
    emitter: &EventEmitter,
) -> Option<EndReason> {
    if line.trim().is_empty() {
        return None;
    }

    let input = match line.parse::<Input>() {
        Ok(input) => input,
        Err(e) => {
            tracing::warn!("{e}");
            return None;
        }
    };
    tracing::debug!(?input, "input");

    match input {
        Input::Play => {
            session.play();
        }
        Input::Leave(y) => {
            session.signal(PageSignal::PointerLeave { y });
        }
        Input::Back => {
            if !history.back() {
                return Some(EndReason::NavigatedAway);
            }
            session.signal(PageSignal::BackNavigation);
        }
        Input::Dismiss => {
            session.dismiss_exit_modal();
        }
        Input::Contact => {
            if session.contact() {
                emitter.emit(Event::ContactOpened {
                    timestamp: chrono::Utc::now(),
                    destination: session.config().contact.destination.clone(),
                });
            }
        }
        Input::Quit => return Some(EndReason::Quit),
    }
    None
}

async fn wait_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}
