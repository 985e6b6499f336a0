use clap::{Parser, Subcommand};
use sea_orm_migration::MigratorTrait;
use tracing::info;

use tutuplapak_api::{config, db, migrator::Migrator};

#[derive(Parser)]
#[command(name = "migration", about = "Manage the tutuplapak database schema", version)]
struct Cli {
    #[arg(
        long,
        env = "DATABASE_URL",
        help = "Database to migrate; defaults to the configured database_url"
    )]
    database_url: Option<String>,
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone, Copy)]
enum Command {
    /// Apply every pending migration (default)
    Up,
    /// Roll back the given number of migrations
    Down {
        #[arg(long, default_value_t = 1)]
        steps: u32,
    },
    /// Drop all tables and re-apply every migration
    Fresh,
    /// Print applied and pending migrations
    Status,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let cfg = config::load_config()?;
    config::init_tracing(cfg.log_level(), cfg.log_json);

    let mut db_config = db::DbConfig::from(&cfg);
    if let Some(url) = cli.database_url {
        db_config.url = url;
    }
    let conn = db::establish_connection_with_config(&db_config).await?;

    let command = cli.command.unwrap_or(Command::Up);
    info!(?command, "Running migration command");
    match command {
        Command::Up => Migrator::up(&conn, None).await?,
        Command::Down { steps } => Migrator::down(&conn, Some(steps)).await?,
        Command::Fresh => Migrator::fresh(&conn).await?,
        Command::Status => Migrator::status(&conn).await?,
    }

    info!("Migration command completed");
    Ok(())
}
