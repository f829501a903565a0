use std::sync::Arc;

use anyhow::Result;
use tracing::info;

use skylark_server::state::AppState;

/// `skylark health` - liveness probe for Docker HEALTHCHECK.
///
/// Calls `GET http://localhost:$SKYLARK_PORT/health`.
/// Exits 0 if the server responds with HTTP 200, exits 1 otherwise.
fn run_health_check() -> ! {
    let port = std::env::var("SKYLARK_PORT").unwrap_or_else(|_| "3000".to_string());
    let url = format!("http://localhost:{}/health", port);
    match ureq::get(&url).call() {
        Ok(resp) if resp.status() == 200 => std::process::exit(0),
        _ => std::process::exit(1),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Health-check subcommand, handled first so the probe stays fast.
    let args: Vec<String> = std::env::args().collect();
    if args.get(1).map(|s| s.as_str()) == Some("health") {
        run_health_check();
    }

    // Initialise structured JSON logging. Level controlled via RUST_LOG.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("skylark=info".parse()?)
                .add_directive("skylark_server=info".parse()?)
                .add_directive("skylark_billing=info".parse()?),
        )
        .json()
        .init();

    let cfg = skylark_core::config::Config::from_env().map_err(|e| anyhow::anyhow!(e))?;

    // Fails fast when the catalog or the public URL is broken; a server
    // that cannot validate checkouts should not come up at all.
    let state = Arc::new(AppState::new(cfg.clone())?);

    // Spawn the rate-limit window sweeper.
    {
        let state = Arc::clone(&state);
        tokio::spawn(async move {
            state.run_window_sweep_loop().await;
        });
    }

    let addr = format!("0.0.0.0:{}", cfg.port);
    let app = skylark_server::app::build_app(Arc::clone(&state));

    info!(
        port = cfg.port,
        public_url = %cfg.public_url,
        "Skylark checkout service listening on {}",
        addr
    );

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            tokio::signal::ctrl_c().await.ok();
        })
        .await?;

    Ok(())
}
