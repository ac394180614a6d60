use crate::server::ServerRouter;

mod tasks;

pub fn routes() -> ServerRouter {
    tasks::routes()
}
