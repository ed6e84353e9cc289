pub mod config;
pub mod db;
pub mod handlers;
pub mod service;
pub mod models;
pub mod dto;
pub mod errors;

use std::sync::Arc;

use actix_web::{HttpServer, App, web};
use config::{Config, StoreBackend};
use db::{event::PgEventStore, init_db_pool, memory::MemoryStore, user::PgUserStore, EventStore, UserStore};
use dotenv::dotenv;
use log::{error, info, warn};
use service::{
    auth::session::SessionKeys,
    checkout::{CheckoutGateway, DisabledCheckout, StripeCheckout},
    contact::{DisabledRelay, EmailJsRelay, EmailRelay},
    log::{init_logger, LoggerMiddleware},
};
use sqlx::{postgres::Postgres, Pool};

pub type PGPool = Pool<Postgres>;

/// Shared by every worker. Handlers only see the store and collaborator traits.
pub struct AppState {
    pub events: Arc<dyn EventStore>,
    pub users: Arc<dyn UserStore>,
    pub sessions: SessionKeys,
    pub checkout: Arc<dyn CheckoutGateway>,
    pub relay: Arc<dyn EmailRelay>,
}

async fn build_state(config: &Config) -> std::io::Result<AppState> {
    let (events, users): (Arc<dyn EventStore>, Arc<dyn UserStore>) = match config.backend {
        StoreBackend::Postgres => {
            let db_url = config.database_url.as_deref().unwrap_or_default();
            let pool = init_db_pool(db_url, config.db_max_connections)
                .await
                .map_err(|e| {
                    error!("Failed to connect to postgres: {e}");
                    std::io::Error::new(std::io::ErrorKind::Other, e)
                })?;
            (
                Arc::new(PgEventStore::new(pool.clone(), config.store_timeout)) as Arc<dyn EventStore>,
                Arc::new(PgUserStore::new(pool, config.store_timeout)) as Arc<dyn UserStore>,
            )
        }
        StoreBackend::Memory => {
            warn!("using the in-memory store, data is lost on exit");
            let store = Arc::new(MemoryStore::new());
            (store.clone() as Arc<dyn EventStore>, store as Arc<dyn UserStore>)
        }
    };

    if config.seed_demo_data {
        if let Err(e) = db::seed::seed_demo_data(events.as_ref(), users.as_ref(), &config.demo_admin_password).await {
            warn!("demo data not seeded: {e}");
        }
    }

    let checkout: Arc<dyn CheckoutGateway> = match &config.stripe_secret_key {
        Some(key) => Arc::new(StripeCheckout::new(key.clone())),
        None => {
            warn!("STRIPE_SECRET_KEY not set, checkout is disabled");
            Arc::new(DisabledCheckout)
        }
    };
    let relay: Arc<dyn EmailRelay> = match &config.emailjs {
        Some(c) => Arc::new(EmailJsRelay::new(c.service_id.clone(), c.template_id.clone(), c.public_key.clone())),
        None => {
            warn!("EmailJS keys not set, contact form is disabled");
            Arc::new(DisabledRelay)
        }
    };

    Ok(AppState {
        events,
        users,
        sessions: SessionKeys::new(&config.session_secret, config.session_secure),
        checkout,
        relay,
    })
}

#[actix_web::main]
async fn main() -> std::io::Result<()>{
    dotenv().ok();
    init_logger();
    let config = Config::from_env().map_err(|e| {
        error!("Invalid configuration: {e}");
        std::io::Error::new(std::io::ErrorKind::InvalidInput, e)
    })?;
    let state = web::Data::new(build_state(&config).await?);

    info!("listening on {}:{}", config.host, config.port);
    HttpServer::new(move || {
        App::new()
            .app_data(state.clone())
            .wrap(LoggerMiddleware)
            .configure(handlers::config)
    })
    .bind((config.host.as_str(), config.port))?
    .run()
    .await
}
