use std::{borrow::Cow, net::SocketAddr, path::PathBuf};

use anyhow::anyhow;
use clap::{Args, Parser, Subcommand};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use crate::{
    identities::{domain::users::NewUserData, services::UserService},
    server::{self, Repositories},
};

mod migrate;

#[derive(Parser)]
struct Cli {
    #[clap(subcommand)]
    command: Commands,

    /// DSN to tell Sentry where to send events.
    ///
    /// If provided, errors will be sent to Sentry.
    #[clap(long = "sentry-dsn", env = "SENTRY_DSN")]
    sentry_dsn: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    Migrate(MigrateOpts),
    Serve(ServeOpts),
    /// Create an administrator. Sign-up only ever creates regular users.
    CreateAdmin(CreateAdminOpts),
}

#[derive(Args)]
struct DatabaseOpts {
    /// The number of connections to use for the database pool.
    #[clap(long = "database-pool-size", default_value = "16")]
    database_pool_size: u32,

    /// The number of seconds before a database connection times out.
    #[clap(long = "database-timeout", default_value = "5")]
    database_timeout: u8,

    /// Connection string for the application database.
    #[clap(long = "database-url", env = "DATABASE_URL")]
    database_url: String,
}

#[derive(Args)]
struct MigrateOpts {
    /// Connection string for the database.
    #[clap(long = "database-url", env = "DATABASE_URL")]
    database_url: String,
}

impl From<MigrateOpts> for migrate::MigrationOpts {
    fn from(opts: MigrateOpts) -> Self {
        Self {
            database_url: opts.database_url,
        }
    }
}

#[derive(Args)]
struct ServeOpts {
    #[clap(flatten)]
    database: DatabaseOpts,

    /// Address to listen on.
    #[clap(long = "bind-address", default_value = "0.0.0.0:8000", env = "BIND_ADDRESS")]
    bind_address: SocketAddr,

    /// Origins allowed to make cross-origin requests. Any origin is allowed
    /// if none are given.
    #[clap(long = "cors-allowed-origin", env = "CORS_ALLOWED_ORIGINS", use_value_delimiter = true)]
    cors_allowed_origins: Vec<String>,

    /// Secret key for signing session tokens.
    ///
    /// If this is changed, existing session tokens will become invalid.
    /// Generate with: openssl rand -base64 32
    #[clap(long = "jwt-secret", env = "JWT_SECRET")]
    jwt_secret: String,

    /// The number of minutes an issued session token stays valid.
    #[clap(
        long = "token-lifetime",
        default_value = "1440",
        env = "TOKEN_LIFETIME",
        value_parser = clap::value_parser!(u32).range(1..)
    )]
    token_lifetime: u32,

    /// Directory uploaded photos are stored in.
    #[clap(long = "storage-dir", default_value = "./uploads", env = "STORAGE_DIR")]
    storage_dir: PathBuf,

    /// Base URL the storage directory is served from.
    #[clap(
        long = "storage-public-url",
        default_value = "http://localhost:8000/uploads",
        env = "STORAGE_PUBLIC_URL"
    )]
    storage_public_url: String,
}

impl From<ServeOpts> for server::Options {
    fn from(opts: ServeOpts) -> Self {
        Self {
            bind_address: opts.bind_address,
            cors_allowed_origins: opts.cors_allowed_origins,
            database_pool_size: opts.database.database_pool_size,
            database_timeout_seconds: opts.database.database_timeout,
            database_url: opts.database.database_url,
            jwt_secret: opts.jwt_secret,
            token_lifetime_minutes: opts.token_lifetime,
            storage_dir: opts.storage_dir,
            storage_public_url: opts.storage_public_url,
        }
    }
}

#[derive(Args)]
struct CreateAdminOpts {
    #[clap(flatten)]
    database: DatabaseOpts,

    #[clap(long = "first-name")]
    first_name: String,

    #[clap(long = "last-name")]
    last_name: String,

    #[clap(long)]
    username: String,

    #[clap(long)]
    email: String,

    /// The administrator's password.
    #[clap(long, env = "ADMIN_PASSWORD")]
    password: String,
}

async fn create_admin(opts: CreateAdminOpts) -> anyhow::Result<()> {
    let connection = server::connect_database(
        &opts.database.database_url,
        opts.database.database_pool_size,
        opts.database.database_timeout,
    )
    .await?;

    let users = UserService::new(Repositories::postgres(connection).users);
    let user = users
        .create_admin(NewUserData {
            first_name: opts.first_name,
            last_name: opts.last_name,
            username: opts.username,
            email: opts.email,
            password: opts.password,
        })
        .await
        .map_err(|error| anyhow!("Failed to create administrator: {}", error))?;

    info!(user_id = user.id, username = %user.username, "Created administrator.");

    Ok(())
}

pub async fn run_with_sys_args() -> anyhow::Result<()> {
    use tracing_subscriber::prelude::*;

    let cli = Cli::parse();

    let sentry_config = cli.sentry_dsn.map(|dsn| {
        debug!("Enabled sentry.");

        let release_name = option_env!("VERGEN_GIT_SHA")
            .map(Cow::from)
            .or_else(|| sentry::release_name!());

        sentry::init((
            dsn,
            sentry::ClientOptions {
                release: release_name,
                ..Default::default()
            },
        ))
    });

    let sentry_tracing_layer = if sentry_config.is_some() {
        Some(sentry_tracing::layer())
    } else {
        None
    };

    let fmt_layer = tracing_subscriber::fmt::layer().with_filter(EnvFilter::from_default_env());

    tracing_subscriber::registry()
        .with(fmt_layer)
        .with(sentry_tracing_layer)
        .init();

    match cli.command {
        Commands::Migrate(opts) => migrate::run_migrations(opts.into()).await,
        Commands::Serve(opts) => {
            let migrate_opts = MigrateOpts {
                database_url: opts.database.database_url.clone(),
            };

            migrate::run_migrations(migrate_opts.into()).await?;

            server::serve(opts.into()).await
        }
        Commands::CreateAdmin(opts) => {
            let migrate_opts = MigrateOpts {
                database_url: opts.database.database_url.clone(),
            };

            migrate::run_migrations(migrate_opts.into()).await?;

            create_admin(opts).await
        }
    }
}

#[cfg(test)]
mod test {
    use clap::CommandFactory;

    use super::*;

    fn serve_args(token_lifetime: &str) -> Vec<&str> {
        vec![
            "ledger-books-api",
            "serve",
            "--database-url",
            "postgres://localhost/ledger",
            "--jwt-secret",
            "secret",
            "--token-lifetime",
            token_lifetime,
        ]
    }

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn token_lifetime_must_be_positive() {
        assert!(Cli::try_parse_from(serve_args("0")).is_err());
        assert!(Cli::try_parse_from(serve_args("-30")).is_err());
        assert!(Cli::try_parse_from(serve_args("99999999999")).is_err());

        let cli = Cli::try_parse_from(serve_args("60")).unwrap();
        match cli.command {
            Commands::Serve(opts) => assert_eq!(60, opts.token_lifetime),
            _ => panic!("expected the serve command"),
        }
    }
}
