use axum::Router;
use std::future::IntoFuture;
use std::io;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Time given to aborted handlers to roll back before the server task is dropped.
const ABORT_SETTLE: Duration = Duration::from_secs(1);

/// Serve `app` until `shutdown` fires, then drain for at most `grace`.
///
/// When the grace period runs out, `abort` is cancelled so that in-flight
/// firewall commands are killed, and the server task is torn down.
pub async fn serve(
    listener: TcpListener,
    app: Router,
    shutdown: CancellationToken,
    abort: CancellationToken,
    grace: Duration,
) -> io::Result<()> {
    let server = axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown.clone().cancelled_owned());
    let mut task = tokio::spawn(server.into_future());

    tokio::select! {
        result = &mut task => return joined(result),
        _ = shutdown.cancelled() => {}
    }

    info!("The server is shutting down (grace {:?})", grace);
    match tokio::time::timeout(grace, &mut task).await {
        Ok(result) => {
            joined(result)?;
            info!("Server is shut down");
            Ok(())
        }
        Err(_) => {
            warn!("Shutdown grace period expired, aborting in-flight requests");
            abort.cancel();
            if tokio::time::timeout(ABORT_SETTLE, &mut task).await.is_err() {
                task.abort();
            }
            info!("Server is shut down");
            Ok(())
        }
    }
}

fn joined(result: Result<io::Result<()>, tokio::task::JoinError>) -> io::Result<()> {
    result.map_err(io::Error::other)?
}
