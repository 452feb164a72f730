//! Master data message handlers
//!
//! The same three handlers serve every master data table. Each one turns a
//! raw request payload into the serialized reply, so the NATS loop only
//! routes bytes.

use std::sync::Arc;

use anyhow::Result;
use async_nats::{Client, Subscriber};
use base64::Engine as _;
use futures::StreamExt;
use tracing::{debug, error, warn};
use uuid::Uuid;

use crate::auth;
use crate::db::MasterDataStore;
use crate::services::bulk_import;
use crate::types::{
    EmptyPayload, ErrorResponse, MasterDataListResponse, MasterEntity, Request, SuccessResponse,
    UploadCsvRequest,
};

fn invalid_request(e: impl std::fmt::Display) -> Result<Vec<u8>> {
    error!("Failed to parse request: {}", e);
    let error = ErrorResponse::new(Uuid::nil(), "INVALID_REQUEST", e.to_string());
    Ok(serde_json::to_vec(&error)?)
}

fn unauthorized(request_id: Uuid) -> Result<Vec<u8>> {
    let error = ErrorResponse::new(request_id, "UNAUTHORIZED", "Authentication required");
    Ok(serde_json::to_vec(&error)?)
}

/// Process one `{entity}.upload` request
pub async fn upload_reply<E: MasterEntity>(
    store: &dyn MasterDataStore,
    jwt_secret: &str,
    payload: &[u8],
) -> Result<Vec<u8>> {
    let table = E::TABLE;

    let request: Request<UploadCsvRequest> = match serde_json::from_slice(payload) {
        Ok(req) => req,
        Err(e) => return invalid_request(e),
    };

    let user = match auth::extract_auth(&request, jwt_secret) {
        Ok(info) => info,
        Err(_) => return unauthorized(request.id),
    };

    let content = match base64::engine::general_purpose::STANDARD.decode(&request.payload.content) {
        Ok(content) => content,
        Err(e) => {
            warn!("Upload {} is not valid base64: {}", request.payload.filename, e);
            let error = ErrorResponse::new(
                request.id,
                "INVALID_REQUEST",
                format!("File content is not valid base64: {}", e),
            );
            return Ok(serde_json::to_vec(&error)?);
        }
    };

    debug!("{} uploads {} for {}", user.email, request.payload.filename, table.table);

    match bulk_import::import_csv(store, table, &request.payload.filename, &content).await {
        Ok(response) => Ok(serde_json::to_vec(&SuccessResponse::new(request.id, response))?),
        Err(e) => {
            warn!("Upload of {} for {} rejected: {}", request.payload.filename, table.table, e);
            let error = ErrorResponse::with_messages(request.id, e.code(), e.messages(table));
            Ok(serde_json::to_vec(&error)?)
        }
    }
}

/// Process one `{entity}.list` request
pub async fn list_reply<E: MasterEntity>(
    store: &dyn MasterDataStore,
    jwt_secret: &str,
    payload: &[u8],
) -> Result<Vec<u8>> {
    let request: Request<EmptyPayload> = match serde_json::from_slice(payload) {
        Ok(req) => req,
        Err(e) => return invalid_request(e),
    };

    if auth::extract_auth(&request, jwt_secret).is_err() {
        return unauthorized(request.id);
    }

    match store.list(E::TABLE).await {
        Ok(rows) => {
            let items: Vec<E> = rows.iter().map(E::from_row).collect();
            debug!("Listed {} {}", items.len(), E::TABLE.entity_plural);
            let response = SuccessResponse::new(
                request.id,
                MasterDataListResponse {
                    total: items.len() as i64,
                    items,
                },
            );
            Ok(serde_json::to_vec(&response)?)
        }
        Err(e) => {
            error!("Failed to list {}: {}", E::TABLE.table, e);
            let error = ErrorResponse::with_messages(request.id, e.code(), vec![e.user_message(E::TABLE)]);
            Ok(serde_json::to_vec(&error)?)
        }
    }
}

/// Process one `{entity}.delete_all` request
pub async fn delete_all_reply<E: MasterEntity>(
    store: &dyn MasterDataStore,
    jwt_secret: &str,
    payload: &[u8],
) -> Result<Vec<u8>> {
    let table = E::TABLE;

    let request: Request<EmptyPayload> = match serde_json::from_slice(payload) {
        Ok(req) => req,
        Err(e) => return invalid_request(e),
    };

    let user = match auth::extract_auth(&request, jwt_secret) {
        Ok(info) => info,
        Err(_) => return unauthorized(request.id),
    };

    debug!("{} deletes all {}", user.email, table.entity_plural);

    match bulk_import::delete_table(store, table).await {
        Ok(response) => Ok(serde_json::to_vec(&SuccessResponse::new(request.id, response))?),
        Err(e) => {
            let error = ErrorResponse::with_messages(request.id, e.code(), e.messages(table));
            Ok(serde_json::to_vec(&error)?)
        }
    }
}

/// Handle `{entity}.upload` messages
pub async fn handle_upload<E: MasterEntity>(
    client: Client,
    mut subscriber: Subscriber,
    store: Arc<dyn MasterDataStore>,
    jwt_secret: Arc<String>,
) -> Result<()> {
    while let Some(msg) = subscriber.next().await {
        debug!("Received {}.upload message", E::TABLE.entity);

        let reply = match msg.reply {
            Some(ref reply) => reply.clone(),
            None => {
                warn!("Message without reply subject");
                continue;
            }
        };

        let response = upload_reply::<E>(store.as_ref(), &jwt_secret, &msg.payload).await?;
        let _ = client.publish(reply, response.into()).await;
    }

    Ok(())
}

/// Handle `{entity}.list` messages
pub async fn handle_list<E: MasterEntity>(
    client: Client,
    mut subscriber: Subscriber,
    store: Arc<dyn MasterDataStore>,
    jwt_secret: Arc<String>,
) -> Result<()> {
    while let Some(msg) = subscriber.next().await {
        debug!("Received {}.list message", E::TABLE.entity);

        let reply = match msg.reply {
            Some(ref reply) => reply.clone(),
            None => {
                warn!("Message without reply subject");
                continue;
            }
        };

        let response = list_reply::<E>(store.as_ref(), &jwt_secret, &msg.payload).await?;
        let _ = client.publish(reply, response.into()).await;
    }

    Ok(())
}

/// Handle `{entity}.delete_all` messages
pub async fn handle_delete_all<E: MasterEntity>(
    client: Client,
    mut subscriber: Subscriber,
    store: Arc<dyn MasterDataStore>,
    jwt_secret: Arc<String>,
) -> Result<()> {
    while let Some(msg) = subscriber.next().await {
        debug!("Received {}.delete_all message", E::TABLE.entity);

        let reply = match msg.reply {
            Some(ref reply) => reply.clone(),
            None => {
                warn!("Message without reply subject");
                continue;
            }
        };

        let response = delete_all_reply::<E>(store.as_ref(), &jwt_secret, &msg.payload).await?;
        let _ = client.publish(reply, response.into()).await;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::memory::VesselRecord;
    use crate::db::MemoryStore;
    use crate::types::{Charterer, ShippingLine, TransportSea};
    use serde_json::Value;

    const SECRET: &str = "test-secret-key-for-jwt-at-least-32-bytes-long";

    fn token() -> String {
        auth::generate_token(Uuid::new_v4(), "ops@example.com", "operator", SECRET).unwrap()
    }

    fn upload_payload(filename: &str, csv: &str) -> Vec<u8> {
        let content = base64::engine::general_purpose::STANDARD.encode(csv);
        let request = Request::with_token(
            token(),
            UploadCsvRequest {
                filename: filename.to_string(),
                content,
            },
        );
        serde_json::to_vec(&request).unwrap()
    }

    fn empty_payload() -> Vec<u8> {
        serde_json::to_vec(&Request::with_token(token(), EmptyPayload::default())).unwrap()
    }

    fn parse(bytes: Vec<u8>) -> Value {
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_upload_then_list() {
        let store = MemoryStore::new();
        let csv = "Code,Description\nMAEU,Maersk Line\nCMDU,CMA CGM\n";

        let reply = parse(upload_reply::<ShippingLine>(&store, SECRET, &upload_payload("lines.csv", csv)).await.unwrap());
        assert_eq!(reply["payload"]["importedCount"], 2);
        assert_eq!(reply["payload"]["message"], "Successfully uploaded 2 shipping lines.");

        let reply = parse(list_reply::<ShippingLine>(&store, SECRET, &empty_payload()).await.unwrap());
        assert_eq!(reply["payload"]["total"], 2);
        assert_eq!(reply["payload"]["items"][0]["code"], "CMDU");
        assert_eq!(reply["payload"]["items"][0]["name"], "CMA CGM");
    }

    #[tokio::test]
    async fn test_upload_validation_failure_lists_messages() {
        let store = MemoryStore::new();
        let csv = "Key Code,Description,Long Description\nAB,Acme,\nAB,Baltic,\n";

        let reply = parse(upload_reply::<Charterer>(&store, SECRET, &upload_payload("c.csv", csv)).await.unwrap());

        assert_eq!(reply["error"]["code"], "VALIDATION_FAILED");
        assert_eq!(reply["error"]["message"], "Duplicate key codes found: AB");
        assert_eq!(reply["error"]["details"]["messages"].as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_upload_wrong_extension() {
        let store = MemoryStore::new();
        let reply = parse(
            upload_reply::<TransportSea>(&store, SECRET, &upload_payload("callsigns.txt", "TransportID\nX\n"))
                .await
                .unwrap(),
        );

        assert_eq!(reply["error"]["code"], "INVALID_FILE_TYPE");
        assert_eq!(reply["error"]["message"], "Please upload a CSV file.");
    }

    #[tokio::test]
    async fn test_upload_invalid_base64() {
        let store = MemoryStore::new();
        let request = Request::with_token(
            token(),
            UploadCsvRequest {
                filename: "lines.csv".to_string(),
                content: "not base64 at all!".to_string(),
            },
        );

        let reply = parse(
            upload_reply::<ShippingLine>(&store, SECRET, &serde_json::to_vec(&request).unwrap())
                .await
                .unwrap(),
        );
        assert_eq!(reply["error"]["code"], "INVALID_REQUEST");
    }

    #[tokio::test]
    async fn test_requests_without_token_are_unauthorized() {
        let store = MemoryStore::new();
        let mut request = Request::with_token(String::new(), EmptyPayload::default());
        request.token = None;
        let payload = serde_json::to_vec(&request).unwrap();

        let reply = parse(delete_all_reply::<Charterer>(&store, SECRET, &payload).await.unwrap());
        assert_eq!(reply["error"]["code"], "UNAUTHORIZED");
        assert_eq!(reply["id"], request.id.to_string());

        let reply = parse(list_reply::<Charterer>(&store, SECRET, &payload).await.unwrap());
        assert_eq!(reply["error"]["code"], "UNAUTHORIZED");
    }

    #[tokio::test]
    async fn test_malformed_request() {
        let store = MemoryStore::new();
        let reply = parse(list_reply::<ShippingLine>(&store, SECRET, b"{not json").await.unwrap());
        assert_eq!(reply["error"]["code"], "INVALID_REQUEST");
    }

    #[tokio::test]
    async fn test_delete_all_reports_cleared_vessels() {
        let mut vessel = VesselRecord::new("V001", "Ever Given");
        vessel.call_sign = Some("H3RC".to_string());
        let store = MemoryStore::with_vessels(vec![vessel]);
        let csv = "TransportID,Name,CarrierCode,CarrierName\nH3RC,Ever Given,EGL,Evergreen\n";
        upload_reply::<TransportSea>(&store, SECRET, &upload_payload("callsigns.csv", csv))
            .await
            .unwrap();

        let reply = parse(delete_all_reply::<TransportSea>(&store, SECRET, &empty_payload()).await.unwrap());

        assert_eq!(reply["payload"]["deletedCount"], 1);
        assert_eq!(reply["payload"]["referencesCleared"], 1);
        assert_eq!(
            reply["payload"]["message"],
            "Successfully deleted 1 call signs and cleared references from 1 vessel(s)."
        );
        assert!(store.vessels()[0].call_sign.is_none());
    }
}
