//! CLI for lampmq
//!
//! Subcommands:
//! - `server`: run the broker
//! - `client`: run a simple smoke-test client (connect, subscribe, publish)

use clap::Parser;
use lampmq::broker::Broker;
use lampmq::config::load_config;
use lampmq::transport::websocket::start_websocket_server;
use std::sync::{Arc, Mutex};
use tracing::{error, info};

#[derive(Parser)]
#[command(name = "lampmq")]
enum Command {
    /// Start the broker
    Server,
    /// Run the smoke-test client (connect, subscribe, publish, read back)
    Client {
        /// WebSocket URL of the broker to connect to
        #[arg(long, default_value = "ws://127.0.0.1:1883")]
        url: String,
    },
}

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    lampmq::utils::logging::init("info");

    let cmd = Command::parse();

    match cmd {
        Command::Server => {
            if let Err(e) = run_server().await {
                error!("Server failed: {e}");
            }
        }
        Command::Client { url } => {
            if let Err(e) = run_client(&url).await {
                error!("Client failed: {e}");
            }
        }
    }
}

async fn run_server() -> Result<(), Box<dyn std::error::Error>> {
    let config = load_config()?;
    let addr = format!("{}:{}", config.server.host, config.server.port);
    let broker = Arc::new(Mutex::new(Broker::new(&config.broker)));

    tokio::select! {
        _ = start_websocket_server(addr, broker) => {
            error!("WebSocket server exited unexpectedly.");
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Shutdown signal received. Exiting gracefully.");
        }
    }

    Ok(())
}

async fn run_client(url: &str) -> Result<(), Box<dyn std::error::Error>> {
    use futures_util::{SinkExt, StreamExt};
    use serde_json::json;
    use tokio_tungstenite::connect_async;
    use tokio_tungstenite::tungstenite::Message as WsMessage;

    let (mut ws_stream, _response) = connect_async(url).await?;

    // 1. Connect
    let connect = json!({ "type": "connect", "client_id": "lampmq-cli" });
    ws_stream
        .send(WsMessage::Text(connect.to_string().into()))
        .await?;

    // 2. Read ConnAck
    if let Some(Ok(WsMessage::Text(msg))) = ws_stream.next().await {
        println!("Connect response: {msg}");

        // 3. Subscribe
        let subscribe = json!({ "type": "subscribe", "topic": "lamp/demo" });
        ws_stream
            .send(WsMessage::Text(subscribe.to_string().into()))
            .await?;

        // 4. Publish (echoed back to us, since we are subscribed)
        let publish = json!({
            "type": "publish",
            "topic": "lamp/demo",
            "payload": "hello from lampmq",
            "qos": 0
        });
        ws_stream
            .send(WsMessage::Text(publish.to_string().into()))
            .await?;

        // 5. Read the delivered message
        if let Some(Ok(WsMessage::Text(incoming))) = ws_stream.next().await {
            println!("Incoming: {incoming}");
        }

        // 6. Say goodbye
        let disconnect = json!({ "type": "disconnect" });
        ws_stream
            .send(WsMessage::Text(disconnect.to_string().into()))
            .await?;
    }

    Ok(())
}
