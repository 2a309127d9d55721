//! This library contains definitions for the API layer.

use std::sync::Arc;

use app::request_flow;
use rocket::{Build, Rocket};
use state::RocketState;

mod access;
mod error;
mod lnurl_response;
mod routes;
mod state;

pub fn register(
    rocket: Rocket<Build>,
    ctx: Arc<request_flow::Context>,
    auth: app::auth::Config,
) -> Rocket<Build> {
    routes::register(rocket, RocketState { ctx, auth })
}
