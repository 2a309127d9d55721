//! Process bootstrap (§1: explicitly out of scope for the core itself, but still has to exist
//! somewhere). Wires the process-scoped runtime object (§9: "a process-scoped runtime object
//! that owns the LedgerStore, SessionCache, NodeClient, and StreamSupervisor, constructed at
//! startup and disposed at shutdown") and mounts the API layer on top of it. No hidden
//! singletons: every collaborator is constructed here and threaded through explicitly.

use std::sync::{Arc, Mutex};

use app::request_flow::{self, Context};
use app::{auth, database, session, supervisor};
use jsonwebtoken::Algorithm;
use rocket::fairing::{Fairing, Info, Kind};
use rocket::{launch, Build, Orbit, Rocket};
use serde::Deserialize;
use url::Url;

#[derive(Debug, Deserialize)]
struct Config {
    database_url: Url,
    cache_host: String,
    cache_port: u16,
    cache_password: Option<String>,
    jwt_secret: String,
    #[serde(default = "default_jwt_algorithm")]
    jwt_algorithm: Algorithm,
    schema: String,
    domain: String,
}

fn default_jwt_algorithm() -> Algorithm {
    Algorithm::HS256
}

#[launch]
async fn rocket() -> _ {
    start_server().await
}

async fn start_server() -> Rocket<Build> {
    env_logger::init();

    let rocket = Rocket::build();
    let config: Config = rocket.figment().extract().unwrap();

    let db = database::connect(&config.database_url).await;
    database::run_migrations(&db).await;
    #[cfg(debug_assertions)]
    database::seed_development_data(&db).await;

    let cache = session::SessionCache::connect(
        &config.cache_host,
        config.cache_port,
        config.cache_password.as_deref(),
    )
    .await;

    // The real node's wire protocol is out of scope (§1, §6); FakeNode stands in for it until a
    // live LND/CLN/Eclair client is plugged in behind the same `NodeClient` trait.
    let node: Arc<dyn app::ln::NodeClient> = Arc::new(app::ln::FakeNode::default());

    let flow_config = request_flow::Config {
        schema: config.schema,
        domain: config.domain,
        ..request_flow::Config::default()
    };

    let withdraw_limiter: request_flow::WithdrawRateLimiter = Arc::new(
        app::rate_limit::RateLimiter::new(flow_config.withdraw_rate_window),
    );

    let ctx = Arc::new(Context {
        db: db.clone(),
        cache,
        node: Arc::clone(&node),
        withdraw_limiter: Arc::clone(&withdraw_limiter),
        config: flow_config,
    });

    let background = supervisor::Supervisor::start(db, node, withdraw_limiter);

    let auth_config = auth::Config {
        secret: config.jwt_secret,
        algorithm: config.jwt_algorithm,
    };

    api::register(rocket, ctx, auth_config).attach(SupervisorShutdown::new(background))
}

/// Cancels the payment/deposit reconcilers and the rate-limit sweeper when Rocket's own shutdown
/// sequence runs, so no partial state is committed after cancellation has been observed (§5).
struct SupervisorShutdown(Mutex<Option<supervisor::Supervisor>>);

impl SupervisorShutdown {
    fn new(background: supervisor::Supervisor) -> Self {
        Self(Mutex::new(Some(background)))
    }
}

#[rocket::async_trait]
impl Fairing for SupervisorShutdown {
    fn info(&self) -> Info {
        Info {
            name: "background consumer shutdown",
            kind: Kind::Shutdown,
        }
    }

    async fn on_shutdown(&self, _rocket: &Rocket<Orbit>) {
        let background = self.0.lock().unwrap().take();
        if let Some(background) = background {
            background.shutdown().await;
        }
    }
}
