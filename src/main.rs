//! `revealgate` - timed disclosure funnel simulator

use std::future::Future;

use clap::Parser;
use tokio::signal::unix::{SignalKind, signal};
use tokio_util::sync::CancellationToken;

use revealgate::cli::args::Cli;
use revealgate::cli::commands;
use revealgate::error::ExitCode;
use revealgate::observability::{LogSettings, init_logging};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    init_logging(&LogSettings::from_cli(&cli));

    let cancel = CancellationToken::new();

    // First signal tears the session down; a second one forces exit.
    let shutdown = cancel.clone();
    tokio::spawn(async move {
        let mut sigterm = match signal(SignalKind::terminate()) {
            Ok(sigterm) => sigterm,
            Err(e) => {
                tracing::warn!(error = %e, "could not register SIGTERM handler");
                if relay_interrupts(tokio::signal::ctrl_c, &shutdown).await {
                    std::process::exit(ExitCode::INTERRUPTED);
                }
                return;
            }
        };

        let interrupted = tokio::select! {
            result = tokio::signal::ctrl_c() => result,
            _ = sigterm.recv() => Ok(()),
        };
        if let Err(e) = interrupted {
            tracing::error!(error = %e, "could not listen for Ctrl+C; only SIGTERM stops the session");
            sigterm.recv().await;
        }

        eprintln!("\nShutting down... (press Ctrl+C again to force)");
        shutdown.cancel();

        let forced = tokio::select! {
            result = tokio::signal::ctrl_c() => result.map(|()| ExitCode::INTERRUPTED),
            _ = sigterm.recv() => Ok(ExitCode::TERMINATED),
        };
        match forced {
            Ok(code) => std::process::exit(code),
            Err(e) => {
                tracing::warn!(error = %e, "could not listen for a second Ctrl+C");
                sigterm.recv().await;
                std::process::exit(ExitCode::TERMINATED);
            }
        }
    });

    match commands::dispatch(cli, cancel).await {
        Ok(()) => std::process::exit(ExitCode::SUCCESS),
        Err(e) => {
            eprintln!("error: {e}");
            std::process::exit(e.exit_code());
        }
    }
}

/// Ctrl+C-only shutdown. The first interrupt cancels `shutdown`; returns
/// `true` once a second one asks for a forced exit.
///
/// A listener error is logged and ends the relay. Failing before the first
/// interrupt leaves the session running: it still ends on `quit`, end of
/// input, or `--duration`.
async fn relay_interrupts<F, Fut>(mut interrupted: F, shutdown: &CancellationToken) -> bool
where
    F: FnMut() -> Fut,
    Fut: Future<Output = std::io::Result<()>>,
{
    if let Err(e) = interrupted().await {
        tracing::error!(error = %e, "could not listen for Ctrl+C; the session can only end on its own");
        return false;
    }
    eprintln!("\nShutting down... (press Ctrl+C again to force)");
    shutdown.cancel();

    match interrupted().await {
        Ok(()) => true,
        Err(e) => {
            tracing::warn!(error = %e, "could not listen for a second Ctrl+C; waiting for teardown");
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::future::ready;
    use std::io;

    use super::*;

    fn listener(
        outcomes: Vec<io::Result<()>>,
    ) -> impl FnMut() -> std::future::Ready<io::Result<()>> {
        let mut outcomes: VecDeque<_> = outcomes.into();
        move || ready(outcomes.pop_front().unwrap_or(Ok(())))
    }

    #[tokio::test]
    async fn test_listener_failure_keeps_session_running() {
        let shutdown = CancellationToken::new();
        let forced = relay_interrupts(listener(vec![Err(io::Error::other("no handler"))]), &shutdown).await;
        assert!(!forced);
        assert!(!shutdown.is_cancelled());
    }

    #[tokio::test]
    async fn test_second_interrupt_forces_exit() {
        let shutdown = CancellationToken::new();
        let forced = relay_interrupts(listener(vec![Ok(()), Ok(())]), &shutdown).await;
        assert!(forced);
        assert!(shutdown.is_cancelled());
    }

    #[tokio::test]
    async fn test_failed_second_listener_lets_teardown_finish() {
        let shutdown = CancellationToken::new();
        let forced = relay_interrupts(
            listener(vec![Ok(()), Err(io::Error::other("gone"))]),
            &shutdown,
        )
        .await;
        assert!(!forced);
        assert!(shutdown.is_cancelled());
    }
}
