use slidepilot_mock::config::MockConfig;
use slidepilot_mock::MockServer;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "slidepilot_mock=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = MockConfig::from_env()?;
    let server = MockServer::start(&config).await?;
    tracing::info!(
        base_url = %server.base_url(),
        step_delay_ms = config.step_delay.as_millis() as u64,
        "Mock backend ready",
    );

    tokio::signal::ctrl_c().await?;
    tracing::info!("Received SIGINT (Ctrl-C), stopping mock backend");
    server.stop();
    Ok(())
}
