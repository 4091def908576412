//! HTTP surface: multipart form in, event stream or JSON report out.
//!
//! Each request runs its own pipeline on a blocking thread. Events travel to
//! the response body through a bounded per-request channel; dropping the body
//! (client gone) closes the channel and the run stops before its next model
//! call.
use crate::catalog::STEP_CATALOG;
use crate::config::PxoConfig;
use crate::error::{PipelineError, ValidationError};
use crate::gateway::ModelGateway;
use crate::inputs::{AnalysisInputs, RawForm, RawImage, FIELD_IMAGE};
use crate::pipeline::{run_pipeline, PipelineEvent};
use crate::report::{build_report, ErrorDocument, Strategy};
use crate::stream::{encode_frame, WireEvent};
use anyhow::{Context, Result};
use axum::body::Body;
use axum::extract::multipart::MultipartError;
use axum::extract::{DefaultBodyLimit, Multipart, Query, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use bytes::Bytes;
use serde::Deserialize;
use std::convert::Infallible;
use std::sync::Arc;
use tokio::sync::mpsc;

const EVENT_CHANNEL_CAPACITY: usize = 32;

/// Shared, read-only state; nothing mutable crosses requests.
#[derive(Clone)]
pub struct AppState {
    gateway: Arc<dyn ModelGateway>,
    config: Arc<PxoConfig>,
}

impl AppState {
    pub fn new(gateway: Arc<dyn ModelGateway>, config: PxoConfig) -> Self {
        Self {
            gateway,
            config: Arc::new(config),
        }
    }
}

pub fn router(state: AppState) -> Router {
    let body_limit = state.config.max_upload_bytes;
    Router::new()
        .route("/api/analyze", post(analyze_stream))
        .route("/api/analyze/report", post(analyze_report))
        .route("/healthz", get(|| async { "ok" }))
        .layer(DefaultBodyLimit::max(body_limit))
        .with_state(state)
}

/// Bind and serve until Ctrl-C.
pub async fn serve(state: AppState) -> Result<()> {
    let bind_addr = state.config.bind_addr.clone();
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("bind {bind_addr}"))?;
    tracing::info!(%bind_addr, "pxo server listening");
    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("run http server")?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %err, "install ctrl-c handler");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutting down");
}

async fn analyze_stream(State(state): State<AppState>, multipart: Multipart) -> Response {
    let inputs = match read_inputs(multipart).await {
        Ok(inputs) => inputs,
        Err(response) => return response,
    };

    let (tx, mut rx) = mpsc::channel::<PipelineEvent>(EVENT_CHANNEL_CAPACITY);
    let gateway = Arc::clone(&state.gateway);
    let budgets = state.config.budgets;
    tokio::task::spawn_blocking(move || {
        let mut tx = tx;
        if let Err(err) = run_pipeline(gateway.as_ref(), &STEP_CATALOG, &inputs, &budgets, &mut tx)
        {
            tracing::debug!(kind = err.kind(), "streamed run ended early");
        }
    });

    let step_count = STEP_CATALOG.len();
    let frames = async_stream::stream! {
        while let Some(event) = rx.recv().await {
            match encode_frame(&WireEvent::from_event(&event, step_count)) {
                Ok(frame) => yield Ok::<Bytes, Infallible>(Bytes::from(frame)),
                Err(err) => tracing::error!(error = %err, "encode stream frame"),
            }
        }
    };

    (
        [
            (header::CONTENT_TYPE, "text/event-stream"),
            (header::CACHE_CONTROL, "no-cache"),
        ],
        Body::from_stream(frames),
    )
        .into_response()
}

#[derive(Debug, Default, Deserialize)]
struct ReportQuery {
    #[serde(default)]
    strategy: Strategy,
}

async fn analyze_report(
    State(state): State<AppState>,
    Query(query): Query<ReportQuery>,
    multipart: Multipart,
) -> Response {
    let inputs = match read_inputs(multipart).await {
        Ok(inputs) => inputs,
        Err(response) => return response,
    };

    let gateway = Arc::clone(&state.gateway);
    let budgets = state.config.budgets;
    let joined = tokio::task::spawn_blocking(move || {
        build_report(
            gateway.as_ref(),
            &STEP_CATALOG,
            &inputs,
            &budgets,
            query.strategy,
        )
    })
    .await;

    match joined {
        Ok(Ok(report)) => Json(report).into_response(),
        Ok(Err(err)) => {
            tracing::warn!(kind = err.kind(), error = %err, "report request failed");
            error_response(status_for(&err), ErrorDocument::new(err.kind(), &err))
        }
        Err(err) => error_response(
            StatusCode::INTERNAL_SERVER_ERROR,
            ErrorDocument::new("internal", err),
        ),
    }
}

async fn read_inputs(multipart: Multipart) -> Result<AnalysisInputs, Response> {
    let form = read_form(multipart).await.map_err(|err| {
        error_response(err.status(), ErrorDocument::new("request", err.body_text()))
    })?;
    AnalysisInputs::from_form(form).map_err(|err| validation_response(&err))
}

async fn read_form(mut multipart: Multipart) -> Result<RawForm, MultipartError> {
    let mut form = RawForm::default();
    while let Some(field) = multipart.next_field().await? {
        let name = field.name().unwrap_or_default().to_string();
        if name == FIELD_IMAGE {
            let content_type = field.content_type().map(str::to_string);
            let bytes = field.bytes().await?;
            form.image = Some(RawImage {
                bytes: bytes.to_vec(),
                content_type,
            });
        } else {
            let value = field.text().await?;
            if !form.set_text(&name, value) {
                tracing::debug!(field = %name, "ignoring unknown form field");
            }
        }
    }
    Ok(form)
}

fn validation_response(err: &ValidationError) -> Response {
    tracing::info!(error = %err, "rejected request");
    error_response(StatusCode::BAD_REQUEST, ErrorDocument::new("validation", err))
}

fn status_for(err: &PipelineError) -> StatusCode {
    match err {
        PipelineError::Gateway { .. } => StatusCode::BAD_GATEWAY,
        PipelineError::Format(_) => StatusCode::UNPROCESSABLE_ENTITY,
        PipelineError::Catalog(_) | PipelineError::Abandoned => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn error_response(status: StatusCode, document: ErrorDocument) -> Response {
    (status, Json(document)).into_response()
}
