//! Device endpoint and MCP server initialization.
//!
//! [`serve_http`] hosts the device feed (`/device`), a health report
//! (`/health`) and the MCP Streamable HTTP service (`/mcp`), with an
//! ingestion listener mirroring every feed change into the signed-in user's
//! entries. [`serve_stdio`] runs the MCP tools over stdio.

use std::sync::Arc;

use anyhow::Result;
use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use rmcp::ServiceExt;

use flowfriend::config::FlowFriendConfig;
use flowfriend::db::{self, HealthReport};
use flowfriend::device::{self, DeviceData, DeviceFeed};
use flowfriend::llm::{self, LanguageModel};
use flowfriend::tracking::EntryStore;

use crate::cli::AppContext;
use crate::tools::FlowFriendTools;

/// Build the model client once. A missing key is not fatal here: the
/// tracking tools still work and the advice tools report the error.
fn setup_model(config: &FlowFriendConfig) -> Option<Arc<dyn LanguageModel>> {
    match llm::create_model(&config.model) {
        Ok(model) => {
            tracing::info!(model = model.name(), "model client ready");
            Some(model)
        }
        Err(e) => {
            tracing::warn!(error = %e, "model unavailable, advice tools disabled");
            None
        }
    }
}

fn tools_for(ctx: &AppContext, model: Option<Arc<dyn LanguageModel>>) -> FlowFriendTools {
    FlowFriendTools::new(
        ctx.store.clone(),
        Arc::from(ctx.user_id.as_str()),
        Arc::clone(&ctx.config),
        model,
    )
}

/// Start the MCP server over stdio transport.
pub async fn serve_stdio(config: FlowFriendConfig) -> Result<()> {
    tracing::info!("starting FlowFriend MCP server on stdio");

    let ctx = AppContext::open(config)?;
    let model = setup_model(&ctx.config);

    let tools = tools_for(&ctx, model);
    let transport = rmcp::transport::stdio();

    let server = tools.serve(transport).await?;
    tracing::info!("MCP server running, waiting for client");

    server.waiting().await?;
    tracing::info!("MCP server shut down");

    Ok(())
}

#[derive(Clone)]
struct DeviceState {
    feed: DeviceFeed,
    store: EntryStore,
}

async fn get_device(State(state): State<DeviceState>) -> Json<Option<DeviceData>> {
    Json(state.feed.current())
}

async fn put_device(
    State(state): State<DeviceState>,
    Json(data): Json<DeviceData>,
) -> Json<serde_json::Value> {
    let changed = state.feed.publish(data);
    let seq = state.feed.latest().map(|update| update.seq);
    tracing::debug!(changed, ?seq, "device record written");
    Json(serde_json::json!({ "changed": changed, "seq": seq }))
}

async fn health(
    State(state): State<DeviceState>,
) -> Result<Json<HealthReport>, (StatusCode, String)> {
    state
        .store
        .with_conn(|conn| db::check_database_health(conn))
        .await
        .map(Json)
        .map_err(|e| {
            tracing::error!(error = %e, "health check failed");
            (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
        })
}

fn device_router(state: DeviceState) -> Router {
    Router::new()
        .route("/device", get(get_device).put(put_device))
        .route("/health", get(health))
        .with_state(state)
}

/// Serve the device endpoint and MCP over Streamable HTTP until ctrl-c.
pub async fn serve_http(config: FlowFriendConfig) -> Result<()> {
    let bind_addr = format!("{}:{}", config.server.host, config.server.port);
    tracing::info!(addr = %bind_addr, "starting FlowFriend server");

    let ctx = AppContext::open(config)?;
    let model = setup_model(&ctx.config);

    let feed = DeviceFeed::new();
    let listener_handle = device::listen(&feed, Arc::new(ctx.store.clone()), ctx.user_id.clone());

    let mcp_ctx = ctx.clone();
    let service = rmcp::transport::streamable_http_server::StreamableHttpService::new(
        move || Ok(tools_for(&mcp_ctx, model.clone())),
        rmcp::transport::streamable_http_server::session::local::LocalSessionManager::default()
            .into(),
        Default::default(),
    );

    let router = device_router(DeviceState {
        feed,
        store: ctx.store.clone(),
    })
    .nest_service("/mcp", service);

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    tracing::info!(
        addr = %bind_addr,
        "device feed at http://{bind_addr}/device, MCP at http://{bind_addr}/mcp"
    );

    axum::serve(listener, router)
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "failed to listen for ctrl-c");
            }
            tracing::info!("shutting down server");
        })
        .await?;

    listener_handle.cancel();
    Ok(())
}
