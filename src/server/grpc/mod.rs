//! gRPC front end.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::net::TcpListener;
use tonic::{Request, Response, Status};
use tower_http::trace::TraceLayer;
use tracing::info;

use super::{bind, Server, ServerError, ServerKind};
use crate::app::Calendar;
use crate::config::ListenConfig;
use crate::proto::event_service_server::{EventService, EventServiceServer};
use crate::proto::{Event, EventId, Events, TimeQuery};
use crate::utils::cancel::CancelToken;

/// Tower trace layer opening one span per gRPC call, named by its path.
pub fn grpc_trace_layer() -> TraceLayer<
    tower_http::classify::SharedClassifier<tower_http::classify::GrpcErrorsAsFailures>,
    impl Fn(&http::Request<tonic::body::BoxBody>) -> tracing::Span + Clone,
> {
    TraceLayer::new_for_grpc().make_span_with(|request: &http::Request<tonic::body::BoxBody>| {
        let path = request.uri().path();
        tracing::info_span!("grpc", %path)
    })
}

/// `EventService` implementation handing every call the server's token.
pub struct EventServiceHandler {
    app: Arc<Calendar>,
    token: CancelToken,
}

impl EventServiceHandler {
    pub fn new(app: Arc<Calendar>, token: CancelToken) -> Self {
        Self { app, token }
    }
}

#[tonic::async_trait]
impl EventService for EventServiceHandler {
    async fn create_event(&self, request: Request<Event>) -> Result<Response<EventId>, Status> {
        let id = self
            .app
            .create_event(&self.token, request.into_inner())
            .await?;
        Ok(Response::new(id))
    }

    async fn update_event(&self, request: Request<Event>) -> Result<Response<()>, Status> {
        self.app
            .update_event(&self.token, request.into_inner())
            .await?;
        Ok(Response::new(()))
    }

    async fn remove_event(&self, request: Request<EventId>) -> Result<Response<()>, Status> {
        self.app
            .remove_event(&self.token, request.into_inner())
            .await?;
        Ok(Response::new(()))
    }

    async fn get_day_events(&self, request: Request<TimeQuery>) -> Result<Response<Events>, Status> {
        let events = self
            .app
            .get_day_events(&self.token, request.into_inner())
            .await?;
        Ok(Response::new(events))
    }

    async fn get_week_events(
        &self,
        request: Request<TimeQuery>,
    ) -> Result<Response<Events>, Status> {
        let events = self
            .app
            .get_week_events(&self.token, request.into_inner())
            .await?;
        Ok(Response::new(events))
    }

    async fn get_month_events(
        &self,
        request: Request<TimeQuery>,
    ) -> Result<Response<Events>, Status> {
        let events = self
            .app
            .get_month_events(&self.token, request.into_inner())
            .await?;
        Ok(Response::new(events))
    }
}

/// gRPC server for the calendar, with the standard health service.
pub struct GrpcServer {
    app: Arc<Calendar>,
    listen: ListenConfig,
    stop: CancelToken,
}

impl GrpcServer {
    pub fn new(app: Arc<Calendar>, listen: ListenConfig) -> Self {
        Self {
            app,
            listen,
            stop: CancelToken::new(),
        }
    }
}

#[async_trait]
impl Server for GrpcServer {
    fn kind(&self) -> ServerKind {
        ServerKind::Grpc
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

        let (mut health_reporter, health_service) = tonic_health::server::health_reporter();
        health_reporter
            .set_serving::<EventServiceServer<EventServiceHandler>>()
            .await;

        let handler = EventServiceHandler::new(self.app.clone(), self.stop.clone());
        let incoming = tokio_stream::wrappers::TcpListenerStream::new(listener);
        let stop = self.stop.clone();

        info!("gRPC server started");
        tonic::transport::Server::builder()
            .layer(grpc_trace_layer())
            .add_service(health_service)
            .add_service(EventServiceServer::new(handler))
            .serve_with_incoming_shutdown(incoming, async move { stop.cancelled().await })
            .await?;
        info!("gRPC server stopped");
        Ok(())
    }

    fn stop(&self) {
        self.stop.cancel();
    }
}
