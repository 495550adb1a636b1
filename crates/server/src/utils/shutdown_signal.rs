use tokio::signal;

/// Resolves on Ctrl+C or, on unix, SIGTERM. In-flight requests are drained
/// by axum afterwards; their cancellation scopes fire as they complete.
///
/// # Panics
///
/// Panics if a signal handler fails to install.
pub async fn shutdown_signal() {
  let ctrl_c = async {
    signal::ctrl_c()
      .await
      .expect("failed to install Ctrl+C handler");
  };

  #[cfg(unix)]
  let terminate = async {
    signal::unix::signal(signal::unix::SignalKind::terminate())
      .expect("failed to install SIGTERM handler")
      .recv()
      .await;
  };

  #[cfg(not(unix))]
  let terminate = std::future::pending::<()>();

  let received = tokio::select! {
    () = ctrl_c => "ctrl_c",
    () = terminate => "terminate",
  };
  tracing::info!(signal = received, "shutting down");
}
