//! Runs the seminar hall booking API.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use sqlx::postgres::PgPoolOptions;

use hallbook::config::Config;
use hallbook::db::PgStore;
use hallbook::email::mailer_from_config;
use hallbook::models::user::User;
use hallbook::routes::{router, AppState};
use hallbook::util::current_time;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    tracing_subscriber::fmt::init();

    let config = Config::from_env().context("Failed to load configuration")?;

    let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(&config.database_url)
        .await
        .context("Failed to connect to the database")?;
    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .context("Failed to run migrations")?;

    let store = Arc::new(PgStore::new(pool));
    if let Some(account) = &config.bootstrap_admin {
        User::bootstrap_admin(account, current_time(), &*store)
            .await
            .context("Failed to create the admin account")?;
    }

    let state = AppState {
        store,
        mailer: mailer_from_config(&config.mail),
        config: Arc::new(config.clone()),
    };

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!("listening on {addr}");
    axum::Server::bind(&addr)
        .serve(router(state).into_make_service())
        .await
        .context("Server failed")?;

    Ok(())
}
