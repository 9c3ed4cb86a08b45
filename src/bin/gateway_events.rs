use anyhow::Result;
use disgate::{ClientEvent, GatewayClient, GatewayConfig};
use tracing::{error, info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let config = GatewayConfig::from_env()?;

    print_banner(&config);

    let client = GatewayClient::new(config);
    client.connect()?;

    let events = tokio::task::spawn_blocking(move || {
        while let Ok(event) = client.recv_event() {
            match event {
                ClientEvent::Connected => info!("Gateway connected"),
                ClientEvent::Ready => info!("Session ready"),
                ClientEvent::Dispatch { event, .. } => info!("Event: {}", event),
                ClientEvent::Error(message) => error!("Gateway error: {}", message),
                ClientEvent::Disconnected => {
                    warn!("Gateway disconnected; reconnect by restarting for now");
                    break;
                }
            }
        }
        client
    });

    let client = tokio::select! {
        client = events => client?,
        _ = tokio::signal::ctrl_c() => {
            info!("Ctrl+C received");
            return Ok(());
        }
    };

    client.shutdown().await?;
    print_shutdown();
    Ok(())
}

fn print_banner(config: &GatewayConfig) {
    info!("========================================");
    info!("Starting gateway event printer");
    info!("REST base: {}", config.rest_base_url);
    info!("Intents: {:#x}", config.intents);
    info!("Press Ctrl+C to stop");
    info!("========================================");
}

fn print_shutdown() {
    info!("========================================");
    info!("Gateway client stopped gracefully");
    info!("========================================");
}
