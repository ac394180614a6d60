use crate::server::{Json, Result, ServerError, ServerRouter};
use axum::extract::State;
use axum_extra::routing::{RouterExt, TypedPath};
use serde::{Deserialize, Serialize};
use tagebuch_tasks::{TaskQueue, TaskRequest};

pub fn routes() -> ServerRouter {
    ServerRouter::new().typed_post(run_task)
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/ex1", rejection(ServerError))]
struct RunTaskPath();

/// The response keeps the legacy `"Result:"` key, colon included, that
/// clients of this endpoint already parse.
#[derive(Copy, Clone, Eq, PartialEq, Debug, Serialize)]
struct TaskResult {
    #[serde(rename = "Result:")]
    result: i64,
}

async fn run_task(
    RunTaskPath(): RunTaskPath,
    State(tasks): State<TaskQueue>,
    Json(request): Json<TaskRequest>,
) -> Result<Json<TaskResult>> {
    let result = tasks.dispatch(request).await?;

    Ok(Json(TaskResult { result }))
}
