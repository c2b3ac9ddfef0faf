use chrono::Utc;
use log::*;
use sqlx::{migrate::MigrateDatabase, Sqlite};

use crate::{helpers::signature::sign_payload, SqliteDatabase};

/// Creates a fresh database at `url`, runs the migrations and returns a connection to it. Also loads `.env.test` and
/// initialises logging.
pub async fn prepare_test_env(url: &str) -> SqliteDatabase {
    dotenvy::from_filename(".env.test").ok();
    let _ = env_logger::try_init();
    debug!("🚀️ Logging initialised");
    create_database(url).await;
    let db = SqliteDatabase::new_with_url(url, 5).await.expect("Error creating connection to database");
    db.migrate().await.expect("Error running DB migrations");
    db
}

pub fn random_db_path() -> String {
    let dir = std::env::temp_dir();
    format!("sqlite://{}/order_engine_test_{}.db", dir.display(), rand::random::<u64>())
}

async fn create_database(url: &str) {
    if Sqlite::database_exists(url).await.unwrap_or(false) {
        if let Err(e) = Sqlite::drop_database(url).await {
            warn!("Error dropping database {url}: {e:?}");
        }
    }
    Sqlite::create_database(url).await.expect("Error creating database");
    info!("Created Sqlite database {url}");
}

/// A signature header for `body`, signed now with `secret`.
pub fn signed_header(secret: &str, body: &[u8]) -> String {
    sign_payload(secret, Utc::now().timestamp(), body)
}
