//! OS signal handling.
//!
//! SIGINT and SIGTERM (Ctrl-C on non-Unix platforms) are turned into a quit
//! request for the scheduler loop.

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Spawns a task forwarding termination signals to `quit_tx`.
///
/// The task ends after the first signal or when `cancel` fires.
pub fn spawn_signal_listener(
    quit_tx: mpsc::Sender<()>,
    cancel: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        tokio::select! {
            () = cancel.cancelled() => debug!("Signal listener stopped"),
            received = wait_for_termination() => match received {
                Ok(name) => {
                    info!(signal = name, "Received termination signal, requesting quit");
                    let _ = quit_tx.try_send(());
                }
                Err(e) => warn!(error = %e, "Failed to register signal handlers"),
            },
        }
    })
}

#[cfg(unix)]
async fn wait_for_termination() -> std::io::Result<&'static str> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut sigint = signal(SignalKind::interrupt())?;
    let mut sigterm = signal(SignalKind::terminate())?;
    debug!("Signal handlers registered (SIGINT, SIGTERM)");

    tokio::select! {
        _ = sigint.recv() => Ok("SIGINT"),
        _ = sigterm.recv() => Ok("SIGTERM"),
    }
}

#[cfg(not(unix))]
async fn wait_for_termination() -> std::io::Result<&'static str> {
    tokio::signal::ctrl_c().await?;
    Ok("Ctrl-C")
}
