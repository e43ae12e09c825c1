//! HTTP surface: one `POST /api/<method>` route per request, JSON in and out,
//! plus `GET /api/events` streaming [`ModelUpdate`]s as server-sent events.

use crate::protocol::*;
use crate::workspace::{ModelUpdate, Workspace};
use axum::{
    extract::{Json, State},
    response::sse::{Event, KeepAlive, Sse},
    routing::{get, post},
    Router,
};
use futures::stream::{self, Stream};
use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;
use tandem_model::ValidationReport;
use tokio::sync::broadcast::error::RecvError;
use tower_http::cors::CorsLayer;

pub type SharedWorkspace = Arc<Workspace>;

pub fn router(workspace: SharedWorkspace) -> Router {
    Router::new()
        .route("/api/openDocument", post(open_document))
        .route("/api/closeDocument", post(close_document))
        .route("/api/loadModel", post(load_model))
        .route("/api/saveModel", post(save_model))
        .route("/api/executeOperation", post(execute_operation))
        .route("/api/requestLayout", post(request_layout))
        .route("/api/getToolPalette", post(get_tool_palette))
        .route("/api/getContextMenu", post(get_context_menu))
        .route("/api/validate", post(validate))
        .route("/api/syncDocument", post(sync_document))
        .route("/api/getProperties", post(get_properties))
        .route("/api/updateProperty", post(update_property))
        .route("/api/setCollapsed", post(set_collapsed))
        .route("/api/events", get(events))
        .with_state(workspace)
        .layer(CorsLayer::permissive())
}

async fn open_document(
    State(ws): State<SharedWorkspace>,
    Json(params): Json<OpenDocumentParams>,
) -> Json<AckResponse> {
    Json(ws.open_document(&params.document_uri, &params.content, params.version).await)
}

async fn close_document(
    State(ws): State<SharedWorkspace>,
    Json(params): Json<DocumentParams>,
) -> Json<AckResponse> {
    Json(ws.close_document(&params.document_uri).await)
}

async fn load_model(
    State(ws): State<SharedWorkspace>,
    Json(params): Json<LoadModelParams>,
) -> Json<LoadModelResponse> {
    Json(
        ws.load_model(&params.document_uri, params.saved_id_map, params.saved_fingerprints)
            .await,
    )
}

/// Persisting runs in the background; the reply does not wait for the disk.
async fn save_model(
    State(ws): State<SharedWorkspace>,
    Json(params): Json<DocumentParams>,
) -> Json<AckResponse> {
    tokio::spawn(async move {
        let response = ws.save_model(&params.document_uri).await;
        if let Some(error) = response.error {
            tracing::warn!(uri = %params.document_uri, %error, "save failed");
        }
    });
    Json(AckResponse::ok())
}

async fn execute_operation(
    State(ws): State<SharedWorkspace>,
    Json(params): Json<ExecuteOperationParams>,
) -> Json<ExecuteOperationResponse> {
    Json(ws.execute_operation(&params.document_uri, params.operation).await)
}

async fn request_layout(
    State(ws): State<SharedWorkspace>,
    Json(params): Json<RequestLayoutParams>,
) -> Json<LayoutResponse> {
    Json(ws.request_layout(&params.document_uri, params.options).await)
}

async fn get_tool_palette(
    State(ws): State<SharedWorkspace>,
    Json(params): Json<DocumentParams>,
) -> Json<ToolPaletteResponse> {
    Json(ws.get_tool_palette(&params.document_uri).await)
}

async fn get_context_menu(
    State(ws): State<SharedWorkspace>,
    Json(params): Json<ContextMenuParams>,
) -> Json<ContextMenuResponse> {
    Json(
        ws.get_context_menu(&params.document_uri, &params.selected_ids, params.position)
            .await,
    )
}

async fn validate(
    State(ws): State<SharedWorkspace>,
    Json(params): Json<DocumentParams>,
) -> Json<ValidationReport> {
    Json(ws.validate(&params.document_uri).await)
}

async fn sync_document(
    State(ws): State<SharedWorkspace>,
    Json(params): Json<SyncDocumentParams>,
) -> Json<AckResponse> {
    Json(ws.sync_document(&params.document_uri, &params.content, params.version).await)
}

async fn get_properties(
    State(ws): State<SharedWorkspace>,
    Json(params): Json<PropertiesParams>,
) -> Json<PropertiesResponse> {
    Json(ws.get_properties(&params.document_uri, &params.element_ids).await)
}

async fn update_property(
    State(ws): State<SharedWorkspace>,
    Json(params): Json<UpdatePropertyParams>,
) -> Json<UpdatePropertyResponse> {
    Json(
        ws.update_property(
            &params.document_uri,
            &params.element_ids,
            &params.property,
            &params.value,
        )
        .await,
    )
}

async fn set_collapsed(
    State(ws): State<SharedWorkspace>,
    Json(params): Json<SetCollapsedParams>,
) -> Json<LoadModelResponse> {
    Json(
        ws.set_collapsed(&params.document_uri, &params.element_id, params.collapsed)
            .await,
    )
}

async fn events(State(ws): State<SharedWorkspace>) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let rx = ws.subscribe();
    let stream = stream::unfold(rx, |mut rx| async move {
        loop {
            match rx.recv().await {
                Ok(update) => return Some((Ok(update_event(&update)), rx)),
                Err(RecvError::Lagged(n)) => {
                    tracing::warn!("event subscriber lagged by {} updates", n);
                }
                Err(RecvError::Closed) => return None,
            }
        }
    });

    Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("ping"),
    )
}

fn update_event(update: &ModelUpdate) -> Event {
    let json = serde_json::to_string(update).unwrap_or_default();
    Event::default().event("modelUpdate").data(json)
}
