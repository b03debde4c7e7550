pub mod config;
pub mod env_file;
pub mod db {
    pub mod models;
    #[cfg(test)]
    pub mod test_support;
}
pub mod schema;
pub mod utils;
pub mod services {
    pub mod devices;
    pub mod fake_data;
    pub mod ingest;
    pub mod owners;
}

use crate::config::Config;
use crate::services::fake_data;
use diesel::prelude::*;
use diesel::PgConnection;
use diesel_migrations::{embed_migrations, EmbeddedMigrations, MigrationHarness};
use log::{error, info};

pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");

fn apply_database_migrations(conn: &mut PgConnection) -> Result<(), String> {
    match conn.run_pending_migrations(MIGRATIONS) {
        Ok(applied) => {
            if applied.is_empty() {
                info!("Database schema is up to date; no migrations were applied");
            } else {
                let names = applied.iter().map(|v| v.to_string()).collect::<Vec<_>>().join(", ");
                info!("Applied {} database migration(s): {}", applied.len(), names);
            }
            Ok(())
        }
        Err(e) => Err(format!("Applying database migrations failed: {}", e)),
    }
}

fn log_table_counts(conn: &mut PgConnection) -> Result<(), String> {
    use crate::schema::{device_message_devices, device_messages, devices, users};

    let count_err = |table: &str, e: diesel::result::Error| format!("count {} failed: {}", table, e);
    let user_count: i64 = users::table.count().get_result(conn).map_err(|e| count_err("users", e))?;
    let device_count: i64 = devices::table
        .count()
        .get_result(conn)
        .map_err(|e| count_err("devices", e))?;
    let message_count: i64 = device_messages::table
        .count()
        .get_result(conn)
        .map_err(|e| count_err("device_messages", e))?;
    let link_count: i64 = device_message_devices::table
        .count()
        .get_result(conn)
        .map_err(|e| count_err("device_message_devices", e))?;
    info!(
        "Database holds {} user(s), {} device(s), {} message(s), {} message link(s)",
        user_count, device_count, message_count, link_count
    );
    Ok(())
}

pub fn run() -> Result<(), String> {
    // 1) Load config
    let cfg = Config::from_env()?;
    info!(
        "Config loaded (demo_data_enabled={}, demo_data_days={})",
        cfg.demo_data_enabled,
        cfg.demo_data_days.get()
    );

    // 2) Connect DB
    let mut conn = PgConnection::establish(&cfg.database_url).map_err(|e| format!("DB connection failed: {}", e))?;
    info!("Connected to database");

    // 3) Apply pending database migrations
    apply_database_migrations(&mut conn)?;

    // 4) Demo data
    if cfg.demo_data_enabled {
        let summary = fake_data::run(&mut conn, cfg.demo_data_days.get())?;
        let rendered =
            serde_json::to_string_pretty(&summary).map_err(|e| format!("render demo summary failed: {}", e))?;
        info!("Demo data: latest readings\n{}", rendered);
    } else {
        info!("Demo data disabled via DEMO_DATA_ENABLED={}", cfg.demo_data_enabled);
    }

    log_table_counts(&mut conn)?;
    Ok(())
}

fn main() {
    let loaded_env = match env_file::load_from_args(std::env::args_os().skip(1)) {
        Ok(info) => info,
        Err(err) => {
            eprintln!("fatal: {}", err);
            std::process::exit(1);
        }
    };

    // Init logging after environment so RUST_LOG from .env is respected.
    let default_filter = env_logger::Env::default().default_filter_or("info");
    env_logger::Builder::from_env(default_filter)
        .format_timestamp_secs()
        .init();

    if let Some(info) = loaded_env.as_ref() {
        let origin = if info.explicit { "CLI-specified" } else { "default" };
        info!("Environment loaded from {} .env file: {}", origin, info.path.display());
    }

    info!(
        "poolguy-backend {} (git {}) starting",
        env!("CARGO_PKG_VERSION"),
        env!("BUILD_TIME_GIT_HASH")
    );
    if let Err(e) = run() {
        error!("fatal: {}", e);
        std::process::exit(1);
    }
}
