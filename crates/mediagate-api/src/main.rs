use mediagate_api::{routes, server, state, telemetry};
use mediagate_core::Config;

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    telemetry::init_telemetry();

    let config = Config::from_env()?;

    let app_state = state::build_state(config.clone()).await?;
    let router = routes::build_router(app_state)?;

    server::start_server(&config, router).await?;

    Ok(())
}
