use std::net::SocketAddr;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use hotell::accounts::session;
use hotell::config::{Cli, Command, Config};
use hotell::state::AppState;
use hotell::{commands, db, mail, routes, storage};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // Parse CLI args and load config
    let cli = Cli::parse();
    let data_dir = Config::data_dir(&cli);
    std::fs::create_dir_all(&data_dir)?;
    tracing::info!("Data directory: {}", data_dir.display());

    let config = Config::load(&cli)?;

    // Initialize database
    let pool = db::create_pool(&config.db_path())?;
    db::run_migrations(&pool)?;

    let storage = storage::build_storage(&config.storage)?;

    match cli.command.clone().unwrap_or(Command::Serve) {
        Command::CreateSuperuser {
            email,
            username,
            password,
        } => return commands::create_superuser(&pool, &email, &username, &password),
        Command::Seed => {
            let report = commands::seed(&pool)?;
            println!(
                "Seeded {} amenities and {} rooms",
                report.amenities, report.rooms
            );
            return Ok(());
        }
        Command::UploadMedia { dir } => {
            let stored = commands::upload_media(storage.as_ref(), &dir).await?;
            println!("Uploaded {} files", stored.len());
            return Ok(());
        }
        Command::Serve => {}
    }

    let purged = session::purge_expired(&*pool.get()?)?;
    if purged > 0 {
        tracing::info!("Removed {} expired sessions", purged);
    }

    let mailer = mail::build_mailer(&config.mail)?;

    // Build app state
    let state = AppState {
        db: pool,
        config: config.clone(),
        storage,
        mailer,
    };
    let app = routes::app(state);

    // Start server
    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;
    tracing::info!("Listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
