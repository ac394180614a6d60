use crate::server::{ServerState, auth::AuthService, content::ContentService};
use serde::Deserialize;
use std::{
    net::{IpAddr, SocketAddr},
    sync::Arc,
    time::Duration,
};
use tagebuch_common::token::TokenIssuer;
use tagebuch_db::client::{DbClient, DbError};
use tagebuch_tasks::{ArithmeticWorker, TaskQueue};
use thiserror::Error;
use tower_http::trace::TraceLayer;
use tracing::debug;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod server;

#[derive(Debug, Error)]
enum InitError {
    #[error("Error parsing .env file: {0}")]
    Dotenv(#[from] dotenvy::Error),
    #[error("Error parsing environment: {0}")]
    Envy(#[from] envy::Error),
    #[error("Error setting up database: {0}")]
    Db(#[from] DbError),
    #[error("Error binding tcp listener: {0}")]
    TcpBind(std::io::Error),
    #[error("Error serving server: {0}")]
    TcpServe(std::io::Error),
}

fn default_task_timeout_ms() -> u64 {
    10_000
}

#[derive(Clone, Eq, PartialEq, Debug, Hash, Deserialize)]
struct Env {
    server_address: IpAddr,
    server_port: u16,
    database_url: String,
    jwt_secret: String,
    #[serde(default = "default_task_timeout_ms")]
    task_timeout_ms: u64,
}

fn install_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "tagebuch_api=debug,tagebuch_common=debug,tagebuch_db=debug,\
                tagebuch_tasks=debug,tower_http=debug,axum::rejection=trace,sqlx=debug"
                    .into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

fn get_env() -> Result<Env, InitError> {
    if let Err(e) = dotenvy::dotenv() {
        if e.not_found() {
            debug!("No .dotenv file found");
        } else {
            return Err(e.into());
        }
    }

    envy::from_env().map_err(InitError::from)
}

#[tokio::main]
async fn main() -> Result<(), InitError> {
    install_tracing();
    let env = get_env()?;

    let db_client = Arc::new(DbClient::connect(&env.database_url).await?);
    db_client.init_schema().await?;

    let token_issuer = Arc::new(TokenIssuer::new(env.jwt_secret.as_bytes()));
    let auth = AuthService::new(Arc::clone(&db_client), token_issuer);
    let content = ContentService::new(db_client, auth.clone());
    let tasks = TaskQueue::spawn(
        Arc::new(ArithmeticWorker),
        Duration::from_millis(env.task_timeout_ms),
    );

    let schema = server::graphql::build_schema(auth.clone(), content.clone());
    let state = ServerState {
        auth,
        content,
        tasks,
    };

    let tracing_layer = TraceLayer::new_for_http();
    let app = server::routes(schema)
        .with_state(state)
        .layer(tracing_layer);

    let server_address = SocketAddr::new(env.server_address, env.server_port);
    let listener = tokio::net::TcpListener::bind(server_address)
        .await
        .map_err(InitError::TcpBind)?;
    axum::serve(listener, app)
        .await
        .map_err(InitError::TcpServe)?;

    Ok(())
}
