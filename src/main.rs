use std::fs;
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use log::LevelFilter;
use log4rs::append::console::ConsoleAppender;
use log4rs::config::{Appender, Root};
use sqlx::postgres::PgPoolOptions;

use numbet::repositories::{memory::MemoryStore, Repositories};
use numbet::services;
use numbet::settings::Settings;

#[derive(Parser)]
#[command(version, about, long_about = None)]
struct Args {
    #[arg(short, long, default_value = "numbet.toml")]
    config: String,
    #[arg(short, long)]
    listen: Option<String>,
    #[arg(long, default_value = "log4rs.yaml")]
    log4rs: String,
    /// Keep all data in process memory instead of Postgres.
    #[arg(long)]
    memory: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    let args = Args::parse();

    init_logging(&args.log4rs)?;

    let mut settings = Settings::new(&args.config).context("Could not load settings")?;
    if let Some(listen) = args.listen {
        settings.server.listen = listen;
    }

    let repositories = if args.memory {
        log::warn!("Using the in-memory store, data will not survive a restart.");
        Repositories::memory(Arc::new(MemoryStore::new()))
    } else {
        let conn = PgPoolOptions::new()
            .max_connections(settings.postgres.max_connections)
            .connect(&settings.postgres.url)
            .await
            .context("Could not connect to database")?;

        sqlx::migrate!("./migrations")
            .run(&conn)
            .await
            .context("Could not run migrations")?;

        Repositories::postgres(conn)
    };

    log::info!("Starting services.");
    services::start_services(repositories, settings).await
}

fn init_logging(path: &str) -> Result<()> {
    if !Path::new("logs").exists() {
        fs::create_dir("logs")?;
    }

    match log4rs::init_file(path, Default::default()) {
        Ok(_) => Ok(()),
        Err(e) => {
            eprintln!("[WARN] Could not load {}: {}. Logging to console.", path, e);

            let stdout = ConsoleAppender::builder().build();
            let config = log4rs::Config::builder()
                .appender(Appender::builder().build("stdout", Box::new(stdout)))
                .build(Root::builder().appender("stdout").build(LevelFilter::Info))?;
            log4rs::init_config(config)?;

            Ok(())
        }
    }
}
