use std::collections::HashSet;
use std::process;
use std::sync::Arc;

use sqlx::{postgres::PgPoolOptions, PgPool};
use tokio::net::TcpListener;
use tracing_subscriber::{fmt::{writer::BoxMakeWriter, Layer}, layer::SubscriberExt, EnvFilter, Registry};

use openbanking_service::db::PgLedger;
use openbanking_service::payments::{PaymentService, DEFAULT_BLOCKED_CURRENCIES};
use openbanking_service::routes::{self, AppState, ToolRegistry};

#[tokio::main]
async fn main() {

    // mandatory fields
    let db_url = dotenv::var("DATABASE_URL").unwrap();
    // optional fields
    let max_connection_pooling = dotenv::var("MAX_CONNECTION_POOLING").unwrap_or("5".to_string()).parse::<u32>().unwrap();
    let port = dotenv::var("PORT").unwrap_or("3000".to_string()).parse::<u16>().unwrap();
    let log_file = dotenv::var("LOG_FILE").unwrap_or("app.log".to_string());
    let blocked_currencies = blocked_currencies_from_env();

    // add tracing layer
    let file_appender = tracing_appender::rolling::never(".", &log_file);
    let (file_writer, _guard) = tracing_appender::non_blocking(file_appender);
    let (stdout_writer, _guard) = tracing_appender::non_blocking(std::io::stdout());

    let file_layer = Layer::new().json().with_writer(BoxMakeWriter::new(move || file_writer.clone()));
    let stdout_layer = Layer::new().with_writer(BoxMakeWriter::new(move || stdout_writer.clone()));

    let subscriber = Registry::default()
        .with(EnvFilter::from_default_env())
        .with(file_layer)
        .with(stdout_layer);

    tracing::subscriber::set_global_default(subscriber).expect("Unable to set global subscriber");

    let database_pool = match process_database(&db_url, max_connection_pooling).await {
        Ok(db) => {
            tracing::info!("Connected to database");
            db
        },
        Err(err) => {
            tracing::error!("Failed to connect to database: {}", err);
            process::exit(1);
        }
    };

    let listener = match TcpListener::bind(("0.0.0.0", port)).await {
        Ok(port) => {
            tracing::info!("Listening on port: {}", port.local_addr().unwrap().port());
            port
        }
        Err(err) => {
            tracing::error!("Failed to bind to port: {}", err);
            process::exit(1);
        }
    };

    let ledger = Arc::new(PgLedger::new(database_pool));
    let state = Arc::new(AppState {
        ledger: ledger.clone(),
        payments: PaymentService::new(ledger, blocked_currencies),
    });
    let registry = Arc::new(ToolRegistry::new());
    let router = routes::router(state, registry);
    tracing::info!("Routes constructed successfully");

    //start the http service
    let http_service = axum::serve(listener, router);
    if let Err(err) = http_service.await {
        tracing::error!("Failed to start server: {}", err);
        process::exit(1);
    }
}

fn blocked_currencies_from_env() -> HashSet<String> {
    match dotenv::var("BLOCKED_CURRENCIES") {
        Ok(list) => list
            .split(',')
            .map(|code| code.trim().to_uppercase())
            .filter(|code| !code.is_empty())
            .collect(),
        Err(_) => DEFAULT_BLOCKED_CURRENCIES
            .iter()
            .map(|code| code.to_string())
            .collect(),
    }
}

async fn process_database(url: &str, max_conn_pool: u32) -> Result<PgPool, String> {
    // create a connection pool
    let db_pool = PgPoolOptions::new()
        .max_connections(max_conn_pool)
        .connect(url)
        .await
        .map_err(|err| format!("Failed to connect to database: {}", err))?;

    match sqlx::migrate!("./migrations")
        .run(&db_pool)
        .await
        .map_err(|err| format!("Failed to run migrations: {}", err))
    {
        Ok(_) => {
            tracing::info!("Migrations run successfully");
        },
        Err(err) => {
            // if it fails we assume to continue believing that the database is already migrated
            tracing::warn!("Failed to run migrations: {err}");
        },
    }

    Ok(db_pool)
}
