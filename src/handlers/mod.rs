//! NATS message handlers

pub mod master_data;
pub mod ping;

use std::sync::Arc;

use anyhow::Result;
use async_nats::Client;
use tokio::select;
use tracing::{error, info};

use crate::config::Config;
use crate::db::MasterDataStore;
use crate::types::{Charterer, MasterEntity, ShippingLine, TransportSea};

/// Subject prefix of every request handled by this worker
const SUBJECT_PREFIX: &str = "breakbulk";

/// Serve `breakbulk.{entity}.upload|list|delete_all` for one master data table
async fn serve_master_data<E: MasterEntity>(
    client: Client,
    entity: &'static str,
    store: Arc<dyn MasterDataStore>,
    jwt_secret: Arc<String>,
) -> Result<()> {
    let upload_sub = client.subscribe(format!("{SUBJECT_PREFIX}.{entity}.upload")).await?;
    let list_sub = client.subscribe(format!("{SUBJECT_PREFIX}.{entity}.list")).await?;
    let delete_all_sub = client.subscribe(format!("{SUBJECT_PREFIX}.{entity}.delete_all")).await?;

    let client_upload = client.clone();
    let store_upload = Arc::clone(&store);
    let jwt_upload = Arc::clone(&jwt_secret);
    let upload_handle = tokio::spawn(async move {
        master_data::handle_upload::<E>(client_upload, upload_sub, store_upload, jwt_upload).await
    });

    let client_list = client.clone();
    let store_list = Arc::clone(&store);
    let jwt_list = Arc::clone(&jwt_secret);
    let list_handle = tokio::spawn(async move {
        master_data::handle_list::<E>(client_list, list_sub, store_list, jwt_list).await
    });

    let delete_all_handle = tokio::spawn(async move {
        master_data::handle_delete_all::<E>(client, delete_all_sub, store, jwt_secret).await
    });

    info!("Serving {SUBJECT_PREFIX}.{entity}.*");

    select! {
        result = upload_handle => {
            error!("{} upload handler finished: {:?}", entity, result);
        }
        result = list_handle => {
            error!("{} list handler finished: {:?}", entity, result);
        }
        result = delete_all_handle => {
            error!("{} delete_all handler finished: {:?}", entity, result);
        }
    }

    Ok(())
}

/// Start all message handlers
pub async fn start_handlers(client: Client, store: Arc<dyn MasterDataStore>, config: &Config) -> Result<()> {
    info!("Starting message handlers...");

    let jwt_secret = Arc::new(config.jwt_secret.clone());

    let ping_sub = client.subscribe(format!("{SUBJECT_PREFIX}.ping")).await?;
    let client_ping = client.clone();
    let ping_handle = tokio::spawn(async move {
        ping::handle_ping(client_ping, ping_sub).await
    });

    let shipping_line_handle = tokio::spawn(serve_master_data::<ShippingLine>(
        client.clone(),
        "shipping_line",
        Arc::clone(&store),
        Arc::clone(&jwt_secret),
    ));

    let charterer_handle = tokio::spawn(serve_master_data::<Charterer>(
        client.clone(),
        "charterer",
        Arc::clone(&store),
        Arc::clone(&jwt_secret),
    ));

    let transport_sea_handle = tokio::spawn(serve_master_data::<TransportSea>(
        client,
        "transport_sea",
        store,
        jwt_secret,
    ));

    info!("All handlers started, waiting for messages...");

    // Wait for any handler to finish (which would indicate an error)
    select! {
        result = ping_handle => {
            error!("Ping handler finished: {:?}", result);
        }
        result = shipping_line_handle => {
            error!("Shipping line handlers finished: {:?}", result);
        }
        result = charterer_handle => {
            error!("Charterer handlers finished: {:?}", result);
        }
        result = transport_sea_handle => {
            error!("Transport sea handlers finished: {:?}", result);
        }
    }

    Ok(())
}
