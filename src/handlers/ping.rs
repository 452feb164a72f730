//! Ping handler for health checks

use anyhow::Result;
use async_nats::{Client, Subscriber};
use futures::StreamExt;
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

#[derive(Debug, Serialize, Deserialize)]
struct PingRequest {
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    timestamp: Option<i64>,
}

#[derive(Debug, Serialize, Deserialize)]
struct PongResponse {
    message: String,
    timestamp: String,
}

/// Build the reply for one ping payload
fn pong_reply(payload: &[u8]) -> Result<Vec<u8>> {
    let request: PingRequest = match serde_json::from_slice(payload) {
        Ok(req) => req,
        Err(e) => {
            error!("Failed to parse ping request: {}", e);
            let error_response = serde_json::json!({
                "error": {
                    "code": "INVALID_REQUEST",
                    "message": format!("Failed to parse request: {}", e)
                }
            });
            return Ok(error_response.to_string().into_bytes());
        }
    };

    let response = PongResponse {
        message: request.message.map(|m| format!("Pong: {}", m)).unwrap_or_else(|| "Pong".to_string()),
        timestamp: chrono::Utc::now().to_rfc3339(),
    };

    Ok(serde_json::to_vec(&response)?)
}

/// Handle ping messages
pub async fn handle_ping(client: Client, mut subscriber: Subscriber) -> Result<()> {
    while let Some(msg) = subscriber.next().await {
        debug!("Received ping message");

        let reply = match msg.reply {
            Some(ref reply) => reply.clone(),
            None => {
                error!("Ping message without reply subject");
                continue;
            }
        };

        let response = pong_reply(&msg.payload)?;
        client.publish(reply, response.into()).await?;

        debug!("Sent pong response");
    }

    Ok(())
}
