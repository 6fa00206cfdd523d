//! Ballot client - terminal front end for a live voting session

use ballot_client::config::ClientConfig;
use ballot_client::runtime::{spawn_session, TokioScheduler};
use ballot_client::terminal::{self, Dispatch, Screen, USAGE};
use ballot_client::transport::WsConnector;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging; stdout belongs to the view
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "ballot_client=info".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_current_span(false)
                .with_span_list(false)
                .with_writer(std::io::stderr),
        )
        .init();

    // Configuration
    let config = ClientConfig::from_env()?;
    tracing::info!(
        url = %config.server_url,
        reconnect = ?config.reconnect,
        notice_ttl = ?config.notice_ttl,
        "Starting ballot client"
    );

    let connector = WsConnector::new(config.server_url.clone());
    let (handle, runtime) = spawn_session(config.session_context(), connector, TokioScheduler);

    // Redraw on every published view
    let mut views = handle.subscribe();
    let renderer = tokio::spawn(async move {
        loop {
            let text = Screen(&views.borrow_and_update()).to_string();
            println!("{text}\n");
            if views.changed().await.is_err() {
                break;
            }
        }
    });

    println!("{USAGE}\n");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else {
                    tracing::info!("Input closed, shutting down");
                    handle.shutdown().await;
                    break;
                };
                match terminal::dispatch(&handle, terminal::parse(&line)).await? {
                    Dispatch::Continue => {}
                    Dispatch::Hint(hint) => println!("{hint}"),
                    Dispatch::Quit => break,
                }
            }
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Interrupted, shutting down");
                handle.shutdown().await;
                break;
            }
        }
    }

    runtime.await?;
    renderer.await?;
    Ok(())
}
