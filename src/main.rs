use std::{net::SocketAddr, sync::Arc};

use fba_model_services::{
    auth::HttpIdentityProvider,
    build_app,
    config::Config,
    logging,
    rpc::dispatcher::Dispatcher,
    service::{backend::UnimplementedBackend, catalog::build_registry},
    AppState,
};
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    logging::init_logging();

    let config = Config::from_env()?;
    let bind_socket = config.bind_socket()?;

    let identity = HttpIdentityProvider::new(config.auth_service_url.clone(), config.auth_timeout)?;
    warn!("no model engine attached, every catalogue method will report a server error");
    let registry = build_registry(Arc::new(UnimplementedBackend::new()))?;
    let methods = registry.len();

    let dispatcher = Dispatcher::new(
        Arc::new(registry),
        Arc::new(identity),
        config.service_name.clone(),
    );
    let app = build_app(AppState::new(dispatcher, config.max_body_bytes));
    let listener = tokio::net::TcpListener::bind(bind_socket).await?;

    info!(
        bind_addr = %config.bind_addr,
        bind_port = config.bind_port,
        service = %config.service_name,
        auth_service = %config.auth_service_url,
        methods,
        "server starting"
    );

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;
    Ok(())
}
