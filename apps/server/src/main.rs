use pulse_server::{
    api::app_router,
    build_state,
    config::Config,
    init_tracing,
    scheduler::{shutdown_signal, start_update_scheduler},
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();
    let config = Config::from_env();
    let state = build_state(&config);
    let updates = start_update_scheduler(&state);
    let router = app_router(state, &config);
    tracing::info!("Listening on {}", config.listen_addr);
    let listener = tokio::net::TcpListener::bind(config.listen_addr).await?;
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    updates.shutdown().await;
    Ok(())
}
