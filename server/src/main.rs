mod config;
mod extract;
mod http;
mod routes;

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use migration::{Migrator, MigratorTrait};
use platform_db::{DatabaseSettings, DbPool, Store, connect};
use platform_obs::{ObsConfig, init_tracing};
use products_tutoring::{AccountService, CloudinaryStore, ImageStore, ReviewService, seed};
use tracing::info;

use crate::{
    config::{AppConfig, DEFAULT_PORT},
    http::{AppState, ServeConfig},
};

#[derive(Parser, Debug)]
#[command(name = "tutoring-server", version, about = "Tutoring marketplace API")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the HTTP server.
    Serve(ServeCommand),
    /// Run database migrations.
    #[command(subcommand)]
    Migrate(MigrateCommand),
    /// Insert demo tutor, student and review records.
    Seed,
    /// Moderate reviews.
    #[command(subcommand)]
    Review(ReviewCommand),
    /// Manage account status.
    #[command(subcommand)]
    User(UserCommand),
}

#[derive(Subcommand, Debug)]
enum MigrateCommand {
    /// Apply pending migrations.
    Up,
    /// Rollback the most recent migration.
    Down,
}

#[derive(Subcommand, Debug)]
enum ReviewCommand {
    /// Make a hidden review visible again.
    Publish { id: i32 },
    /// Hide a review from listings and rating stats.
    Unpublish { id: i32 },
}

#[derive(Subcommand, Debug)]
enum UserCommand {
    Activate { email: String },
    /// Block login and hide the user's tutor profile.
    Deactivate { email: String },
}

#[derive(Args, Debug)]
struct ServeCommand {
    #[arg(long, default_value = "0.0.0.0")]
    host: std::net::IpAddr,
    #[arg(long, env = "PORT", default_value_t = DEFAULT_PORT)]
    port: u16,
    #[arg(long, help = "Allow starting even when migrations are pending")]
    allow_dirty: bool,
}

impl From<&ServeCommand> for ServeConfig {
    fn from(value: &ServeCommand) -> Self {
        ServeConfig::new(value.host, value.port)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    init_tracing(ObsConfig::default())?;
    let cli = Cli::parse();
    match cli.command {
        Command::Serve(cmd) => run_server(cmd).await,
        Command::Migrate(action) => match action {
            MigrateCommand::Up => migrate_up().await,
            MigrateCommand::Down => migrate_down().await,
        },
        Command::Seed => run_seed().await,
        Command::Review(action) => moderate_review(action).await,
        Command::User(action) => set_user_status(action).await,
    }
}

async fn setup_store() -> Result<Store> {
    let settings = DatabaseSettings::from_env()?;
    let pool = connect(&settings).await?;
    Ok(Store::new(pool, settings.call_timeout))
}

async fn run_server(cmd: ServeCommand) -> Result<()> {
    let config = Arc::new(AppConfig::load()?);
    let store = setup_store().await?;
    ensure_migrations(store.conn(), cmd.allow_dirty).await?;

    let image_store = match config.cloudinary.clone() {
        Some(cloudinary) => {
            let store: Arc<dyn ImageStore> = Arc::new(CloudinaryStore::new(cloudinary)?);
            Some(store)
        }
        None => {
            info!("cloudinary not configured; image uploads disabled");
            None
        }
    };
    let state = AppState::new(store, config, image_store);
    http::serve((&cmd).into(), state).await
}

async fn ensure_migrations(pool: &DbPool, allow_dirty: bool) -> Result<()> {
    let pending = Migrator::get_pending_migrations(pool).await?;
    if !pending.is_empty() && !allow_dirty {
        anyhow::bail!(
            "pending migrations detected; run `tutoring-server migrate up` or pass --allow-dirty"
        );
    }
    Ok(())
}

async fn migrate_up() -> Result<()> {
    let store = setup_store().await?;
    Migrator::up(store.conn(), None).await?;
    info!("database migrations applied");
    Ok(())
}

async fn migrate_down() -> Result<()> {
    let store = setup_store().await?;
    Migrator::down(store.conn(), Some(1)).await?;
    info!("most recent migration rolled back");
    Ok(())
}

async fn run_seed() -> Result<()> {
    let config = AppConfig::load()?;
    let store = setup_store().await?;
    let seeded = seed::seed_demo(&store, &config.auth)
        .await
        .context("seeding demo data")?;
    info!(
        tutor_profile = seeded.tutor.id,
        students = seeded.students.len(),
        reviews = seeded.reviews.len(),
        "demo data ready"
    );
    Ok(())
}

async fn moderate_review(action: ReviewCommand) -> Result<()> {
    let (id, published) = match action {
        ReviewCommand::Publish { id } => (id, true),
        ReviewCommand::Unpublish { id } => (id, false),
    };
    let reviews = ReviewService::new(setup_store().await?);
    let review = reviews
        .set_published(id, published)
        .await
        .with_context(|| format!("updating review {id}"))?;
    info!(review_id = review.id, published = review.is_published, "review updated");
    Ok(())
}

async fn set_user_status(action: UserCommand) -> Result<()> {
    let (email, active) = match action {
        UserCommand::Activate { email } => (email, true),
        UserCommand::Deactivate { email } => (email, false),
    };
    let config = AppConfig::load()?;
    let accounts = AccountService::new(setup_store().await?, config.auth);
    let user = accounts
        .set_active(&email, active)
        .await
        .with_context(|| format!("updating account {email}"))?;
    info!(user_id = user.id, active = user.is_active, "account updated");
    Ok(())
}
