pub mod bootstrap;
pub mod checkout;
pub mod dlr;
pub mod error;
pub mod recovery;
pub mod routes;
pub mod sms_ledger;
pub mod state;
pub mod upsell;

pub use routes::router;
pub use state::AppState;

use std::future::Future;
use std::sync::Arc;
use tokio::net::TcpListener;

/// Serves the API on `listener` until `shutdown` resolves.
pub async fn serve<F>(listener: TcpListener, state: Arc<AppState>, shutdown: F) -> anyhow::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown)
        .await?;
    Ok(())
}
