#[macro_use]
extern crate rocket;

mod entrypoints;

use lms_gamification_server::db;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::EnvFilter;

#[derive(Debug, serde::Deserialize)]
pub struct Env {
    default_page_size: Option<u64>,
}

/// Service tunables resolved once at startup and managed as Rocket state.
#[derive(Debug, Clone, Copy)]
pub struct Config {
    pub default_page_size: u64,
}

#[launch]
async fn rocket() -> _ {
    dotenv::dotenv().ok();

    let subscriber = tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer().pretty());
    tracing::subscriber::set_global_default(subscriber).expect("Failed to set subscriber");

    let env = envy::from_env::<Env>().expect("Failed to load environment variables");
    let config = Config {
        default_page_size: env.default_page_size.unwrap_or(50),
    };

    let span = tracing::info_span!("Starting Rocket");
    let _enter = span.enter();

    rocket::build()
        .attach(db::stage())
        .manage(config)
        .attach(entrypoints::stage())
}
