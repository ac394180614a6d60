use axum::{
    Json as AxumJson, Router,
    extract::{
        FromRef, FromRequest, Request,
        rejection::{JsonRejection, PathRejection},
    },
    http::{StatusCode, Uri},
    response::{IntoResponse, Response},
};
use async_graphql_axum::GraphQL;
use serde::{Deserialize, Serialize};
use tagebuch_tasks::{DispatchError, TaskQueue};
use thiserror::Error;
use tracing::error;

use crate::server::{auth::AuthService, content::ContentService, graphql::GatewaySchema};

pub mod auth;
pub mod content;
pub mod graphql;
mod routes;

/// `axum::Json` with its rejection routed into [`ServerError`], so
/// malformed request bodies reply through the shared error path.
#[derive(FromRequest, Debug, Clone, Copy, Default)]
#[from_request(via(AxumJson), rejection(ServerError))]
pub struct Json<T>(pub T);

impl<T: Serialize> IntoResponse for Json<T> {
    fn into_response(self) -> Response {
        AxumJson(self.0).into_response()
    }
}

pub type ServerRouter = Router<ServerState>;

#[derive(Clone, FromRef)]
pub struct ServerState {
    pub auth: AuthService,
    pub content: ContentService,
    pub tasks: TaskQueue,
}

pub fn routes(schema: GatewaySchema) -> ServerRouter {
    routes::routes()
        .route_service("/graphql", GraphQL::new(schema))
        .fallback(fallback)
}

pub async fn fallback(request: Request) -> ServerError {
    ServerError::UnknownRoute(request.into_parts().0.uri)
}

pub type Result<T, E = ServerError> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Unknown route requested: {0}")]
    UnknownRoute(Uri),
    #[error("Path rejected: {0}")]
    PathRejection(#[from] PathRejection),
    #[error("Incoming JSON rejected: {0}")]
    JsonRejection(#[from] JsonRejection),
    #[error("The worker did not deliver a result: {0}")]
    Upstream(#[from] DispatchError),
}

impl ServerError {
    pub fn status(&self) -> StatusCode {
        match self {
            ServerError::UnknownRoute(_) | ServerError::PathRejection(_) => StatusCode::NOT_FOUND,
            ServerError::JsonRejection(_) => StatusCode::BAD_REQUEST,
            ServerError::Upstream(_) => StatusCode::BAD_GATEWAY,
        }
    }
}

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
struct ErrorResponse {
    status: u16,
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status = self.status();

        error!(error = %self, %status, "Replying with error");

        let error_response = ErrorResponse {
            status: status.as_u16(),
        };
        (status, Json(error_response)).into_response()
    }
}
