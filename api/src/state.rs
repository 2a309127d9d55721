use std::sync::Arc;

use app::request_flow;

pub struct RocketState {
    pub ctx: Arc<request_flow::Context>,
    pub auth: app::auth::Config,
}
