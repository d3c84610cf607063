//! REST/JSON front end.
//!
//! Routes mirror the gRPC method paths, so
//! `POST /calendar.EventService/CreateEvent` takes the same message as the
//! `CreateEvent` RPC, encoded as JSON:
//! - `Event`: `{ "id", "clientId", "title", "time" }` with an RFC 3339 time
//! - `EventId`: `{ "id" }`
//! - `TimeQuery`: `{ "time" }`
//! - `Events`: `{ "events": [Event] }`
//!
//! Methods returning nothing answer `{}`. Failures carry the gRPC code number
//! in a JSON body alongside the matching HTTP status.

use std::net::SocketAddr;
use std::sync::Arc;

use async_trait::async_trait;
use axum::extract::rejection::JsonRejection;
use axum::extract::{ConnectInfo, FromRequest, State};
use axum::http::{HeaderMap, Request, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tokio::net::TcpListener;
use tonic::Code;
use tower_http::trace::{DefaultOnResponse, TraceLayer};
use tower_http::LatencyUnit;
use tracing::{info, Level};

use super::{bind, Server, ServerError, ServerKind};
use crate::app::{AppError, Calendar};
use crate::config::ListenConfig;
use crate::proto;
use crate::proto_ext::{timestamp_to_utc, utc_to_timestamp};
use crate::utils::cancel::CancelToken;

/// Status code for a request abandoned because of cancellation.
const CLIENT_CLOSED_REQUEST: u16 = 499;

// ============================================================================
// JSON messages
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EventJson {
    pub id: i64,
    pub client_id: i64,
    pub title: String,
    pub time: Option<DateTime<Utc>>,
}

impl From<EventJson> for proto::Event {
    fn from(event: EventJson) -> Self {
        proto::Event {
            id: event.id,
            client_id: event.client_id,
            title: event.title,
            time: event.time.as_ref().map(utc_to_timestamp),
        }
    }
}

impl From<proto::Event> for EventJson {
    fn from(event: proto::Event) -> Self {
        EventJson {
            id: event.id,
            client_id: event.client_id,
            title: event.title,
            time: event.time.as_ref().and_then(timestamp_to_utc),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EventIdJson {
    pub id: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimeQueryJson {
    pub time: Option<DateTime<Utc>>,
}

impl From<TimeQueryJson> for proto::TimeQuery {
    fn from(query: TimeQueryJson) -> Self {
        proto::TimeQuery {
            time: query.time.as_ref().map(utc_to_timestamp),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EventsJson {
    pub events: Vec<EventJson>,
}

impl From<proto::Events> for EventsJson {
    fn from(events: proto::Events) -> Self {
        EventsJson {
            events: events.events.into_iter().map(EventJson::from).collect(),
        }
    }
}

/// `{}`
#[derive(Debug, Serialize)]
struct EmptyJson {}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorJson {
    pub code: i32,
    pub message: String,
}

/// HTTP status matching a gRPC code.
pub fn http_status(code: Code) -> StatusCode {
    match code {
        Code::NotFound => StatusCode::NOT_FOUND,
        Code::Cancelled => StatusCode::from_u16(CLIENT_CLOSED_REQUEST)
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
        Code::Unavailable => StatusCode::SERVICE_UNAVAILABLE,
        Code::InvalidArgument => StatusCode::BAD_REQUEST,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// Application error rendered as an HTTP response.
pub struct HttpError(AppError);

impl From<AppError> for HttpError {
    fn from(err: AppError) -> Self {
        HttpError(err)
    }
}

impl IntoResponse for HttpError {
    fn into_response(self) -> Response {
        let code = self.0.code();
        let body = ErrorJson {
            code: code as i32,
            message: self.0.to_string(),
        };
        (http_status(code), Json(body)).into_response()
    }
}

/// JSON request body whose rejection is reported as `InvalidArgument`.
pub struct JsonBody<T>(pub T);

impl<T, S> FromRequest<S> for JsonBody<T>
where
    T: DeserializeOwned + Send,
    S: Send + Sync,
{
    type Rejection = HttpError;

    async fn from_request(req: axum::extract::Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(JsonBody(value)),
            Err(rejection) => Err(HttpError(AppError::InvalidArgument(rejection_message(
                &rejection,
            )))),
        }
    }
}

fn rejection_message(rejection: &JsonRejection) -> String {
    format!("malformed request body: {}", rejection.body_text())
}

// ============================================================================
// Router
// ============================================================================

#[derive(Clone)]
struct HttpState {
    app: Arc<Calendar>,
    token: CancelToken,
}

/// Build the axum router (separated for testing).
pub fn router(app: Arc<Calendar>, token: CancelToken) -> Router {
    let trace = TraceLayer::new_for_http()
        .make_span_with(|request: &Request<axum::body::Body>| {
            let peer = request
                .extensions()
                .get::<ConnectInfo<SocketAddr>>()
                .map(|info| info.0);
            let user_agent = request
                .headers()
                .get(axum::http::header::USER_AGENT)
                .and_then(|v| v.to_str().ok())
                .unwrap_or("");
            tracing::info_span!(
                "http",
                method = %request.method(),
                path = %request.uri().path(),
                user_agent = %user_agent,
                client_ip = %client_ip(request.headers(), peer),
            )
        })
        .on_response(
            DefaultOnResponse::new()
                .level(Level::INFO)
                .latency_unit(LatencyUnit::Millis),
        );

    Router::new()
        .route("/health", get(health))
        .route("/calendar.EventService/CreateEvent", post(create_event))
        .route("/calendar.EventService/UpdateEvent", post(update_event))
        .route("/calendar.EventService/RemoveEvent", post(remove_event))
        .route("/calendar.EventService/GetDayEvents", post(get_day_events))
        .route("/calendar.EventService/GetWeekEvents", post(get_week_events))
        .route("/calendar.EventService/GetMonthEvents", post(get_month_events))
        .layer(trace)
        .with_state(HttpState { app, token })
}

/// Originating client address: first `X-Forwarded-For` entry, else
/// `X-Real-Ip`, else the socket peer.
pub fn client_ip(headers: &HeaderMap, peer: Option<SocketAddr>) -> String {
    let header = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
    };

    if let Some(first) = header("x-forwarded-for").and_then(|v| v.split(',').next()) {
        let first = first.trim();
        if !first.is_empty() {
            return first.to_string();
        }
    }
    if let Some(real_ip) = header("x-real-ip") {
        return real_ip.to_string();
    }
    peer.map(|addr| addr.ip().to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

// ============================================================================
// Handlers
// ============================================================================

async fn health() -> StatusCode {
    StatusCode::OK
}

async fn create_event(
    State(state): State<HttpState>,
    JsonBody(body): JsonBody<EventJson>,
) -> Result<Json<EventIdJson>, HttpError> {
    let id = state.app.create_event(&state.token, body.into()).await?;
    Ok(Json(EventIdJson { id: id.id }))
}

async fn update_event(
    State(state): State<HttpState>,
    JsonBody(body): JsonBody<EventJson>,
) -> Result<Json<EmptyJson>, HttpError> {
    state.app.update_event(&state.token, body.into()).await?;
    Ok(Json(EmptyJson {}))
}

async fn remove_event(
    State(state): State<HttpState>,
    JsonBody(body): JsonBody<EventIdJson>,
) -> Result<Json<EmptyJson>, HttpError> {
    state
        .app
        .remove_event(&state.token, proto::EventId { id: body.id })
        .await?;
    Ok(Json(EmptyJson {}))
}

async fn get_day_events(
    State(state): State<HttpState>,
    JsonBody(body): JsonBody<TimeQueryJson>,
) -> Result<Json<EventsJson>, HttpError> {
    let events = state.app.get_day_events(&state.token, body.into()).await?;
    Ok(Json(events.into()))
}

async fn get_week_events(
    State(state): State<HttpState>,
    JsonBody(body): JsonBody<TimeQueryJson>,
) -> Result<Json<EventsJson>, HttpError> {
    let events = state.app.get_week_events(&state.token, body.into()).await?;
    Ok(Json(events.into()))
}

async fn get_month_events(
    State(state): State<HttpState>,
    JsonBody(body): JsonBody<TimeQueryJson>,
) -> Result<Json<EventsJson>, HttpError> {
    let events = state.app.get_month_events(&state.token, body.into()).await?;
    Ok(Json(events.into()))
}

// ============================================================================
// Server
// ============================================================================

/// REST/JSON server for the calendar.
pub struct HttpServer {
    app: Arc<Calendar>,
    listen: ListenConfig,
    stop: CancelToken,
}

impl HttpServer {
    pub fn new(app: Arc<Calendar>, listen: ListenConfig) -> Self {
        Self {
            app,
            listen,
            stop: CancelToken::new(),
        }
    }
}

#[async_trait]
impl Server for HttpServer {
    fn kind(&self) -> ServerKind {
        ServerKind::Http
    }

    async fn start(&self) -> Result<(), ServerError> {
        if self.stop.is_cancelled() {
            return Ok(());
        }
        let listener = bind(&self.listen.addr()).await?;
        self.start_with_listener(listener).await
    }

    async fn start_with_listener(&self, listener: TcpListener) -> Result<(), ServerError> {
        if self.stop.is_cancelled() {
            return Ok(());
        }

        let app = router(self.app.clone(), self.stop.clone());
        let stop = self.stop.clone();

        info!("HTTP server started");
        axum::serve(
            listener,
            app.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .with_graceful_shutdown(async move { stop.cancelled().await })
        .await?;
        info!("HTTP server stopped");
        Ok(())
    }

    fn stop(&self) {
        self.stop.cancel();
    }
}
