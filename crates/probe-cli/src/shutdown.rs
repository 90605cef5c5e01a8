//! Signal-driven cancellation

use probe_runner::CancellationToken;
use std::future::Future;
use tracing::{error, info};

/// Wait for `signal`; never resolves if it could not be installed
pub async fn wait_for<F>(name: &str, signal: F)
where
    F: Future<Output = std::io::Result<()>>,
{
    if let Err(e) = signal.await {
        error!(signal = name, error = %e, "cannot listen for signal");
        std::future::pending::<()>().await;
    }
}

#[cfg(unix)]
async fn terminate() -> std::io::Result<()> {
    use tokio::signal::unix::{signal, SignalKind};
    let mut stream = signal(SignalKind::terminate())?;
    match stream.recv().await {
        Some(()) => Ok(()),
        None => Err(std::io::Error::new(std::io::ErrorKind::Other, "signal stream closed")),
    }
}

#[cfg(not(unix))]
async fn terminate() -> std::io::Result<()> {
    std::future::pending().await
}

/// Cancel `token` once `interrupt` or `terminate` fires
///
/// A signal that fails to install is logged and ignored.
pub async fn cancel_on<A, B>(token: CancellationToken, interrupt: A, terminate: B)
where
    A: Future<Output = std::io::Result<()>>,
    B: Future<Output = std::io::Result<()>>,
{
    tokio::select! {
        () = wait_for("ctrl-c", interrupt) => {}
        () = wait_for("sigterm", terminate) => {}
    }
    info!("shutdown requested, finishing the current attempt");
    token.cancel();
}

/// Cancel `token` on Ctrl-C, or SIGTERM on unix
pub fn spawn_listener(token: CancellationToken) {
    tokio::spawn(cancel_on(token, tokio::signal::ctrl_c(), terminate()));
}
