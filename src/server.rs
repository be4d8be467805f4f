use std::{net::SocketAddr, path::PathBuf, sync::Arc, time::Duration};

use anyhow::Context;
use axum::{extract::FromRef, http::HeaderValue, Router};
use sqlx::postgres::PgPoolOptions;
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    services::ServeDir,
    trace::TraceLayer,
};
use tracing::info;

use crate::{
    authentication::{self, JwtKeys},
    database::PostgresConnection,
    identities::{self, services::UserService},
    ledger::{self, services::LedgerService},
    places::{self, services::PlaceService},
    repos::{
        DynAccountRepo, DynCategoryRepo, DynCurrencyRepo, DynPlaceRepo, DynTransactionRepo,
        DynUserRepo, MemoryStore,
    },
    storage::{DynObjectStorage, LocalObjectStorage},
};

pub struct Options {
    pub bind_address: SocketAddr,
    pub cors_allowed_origins: Vec<String>,

    pub database_pool_size: u32,
    pub database_timeout_seconds: u8,
    pub database_url: String,

    pub jwt_secret: String,
    pub token_lifetime_minutes: u32,

    pub storage_dir: PathBuf,
    pub storage_public_url: String,
}

/// The set of repositories backing the application's services.
#[derive(Clone)]
pub struct Repositories {
    pub accounts: DynAccountRepo,
    pub categories: DynCategoryRepo,
    pub currencies: DynCurrencyRepo,
    pub places: DynPlaceRepo,
    pub transactions: DynTransactionRepo,
    pub users: DynUserRepo,
}

impl Repositories {
    pub fn postgres(connection: PostgresConnection) -> Self {
        Self {
            accounts: Arc::new(connection.clone()),
            categories: Arc::new(connection.clone()),
            currencies: Arc::new(connection.clone()),
            places: Arc::new(connection.clone()),
            transactions: Arc::new(connection.clone()),
            users: Arc::new(connection),
        }
    }

    pub fn in_memory(store: MemoryStore) -> Self {
        Self {
            accounts: Arc::new(store.clone()),
            categories: Arc::new(store.clone()),
            currencies: Arc::new(store.clone()),
            places: Arc::new(store.clone()),
            transactions: Arc::new(store.clone()),
            users: Arc::new(store),
        }
    }
}

#[derive(Clone)]
pub struct AppState {
    jwt_keys: JwtKeys,
    ledger_service: LedgerService,
    place_service: PlaceService,
    user_service: UserService,
}

impl AppState {
    pub fn new(repos: Repositories, storage: DynObjectStorage, jwt_keys: JwtKeys) -> Self {
        Self {
            jwt_keys,
            ledger_service: LedgerService::new(
                repos.accounts,
                repos.categories,
                repos.currencies,
                repos.transactions,
            ),
            place_service: PlaceService::new(repos.places, storage),
            user_service: UserService::new(repos.users),
        }
    }
}

/// Build the application's router.
pub fn app(state: AppState) -> Router {
    Router::new()
        .merge(authentication::http::routes())
        .merge(identities::http::routes())
        .merge(ledger::http::routes())
        .merge(places::http::routes())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// The path component of the URL stored objects are served from.
fn uploads_path(public_url: &str) -> anyhow::Result<String> {
    let without_scheme = match public_url.split_once("://") {
        Some((_, rest)) => rest,
        None => public_url,
    };
    let path = without_scheme
        .find('/')
        .map(|start| without_scheme[start..].trim_end_matches('/'))
        .unwrap_or_default();

    if path.is_empty() {
        Err(anyhow::anyhow!(
            "The storage public URL {:?} must include a path to serve uploads from.",
            public_url
        ))
    } else {
        Ok(path.to_owned())
    }
}

/// Serve the files of a storage directory under the path of its public URL.
pub fn serve_uploads(
    app: Router,
    public_url: &str,
    storage_dir: PathBuf,
) -> anyhow::Result<Router> {
    let path = uploads_path(public_url)?;

    info!(%path, dir = ?storage_dir, "Serving uploads.");

    Ok(app.nest_service(&path, ServeDir::new(storage_dir)))
}

fn cors_layer(allowed_origins: &[String]) -> anyhow::Result<CorsLayer> {
    let allow_origin = if allowed_origins.is_empty() {
        AllowOrigin::from(Any)
    } else {
        let origins = allowed_origins
            .iter()
            .map(|origin| {
                HeaderValue::from_str(origin)
                    .with_context(|| format!("Invalid CORS origin: {}", origin))
            })
            .collect::<anyhow::Result<Vec<_>>>()?;

        AllowOrigin::list(origins)
    };

    Ok(CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods(Any)
        .allow_headers(Any))
}

/// Open the application's database pool.
pub async fn connect_database(
    database_url: &str,
    pool_size: u32,
    timeout_seconds: u8,
) -> anyhow::Result<PostgresConnection> {
    let pool = PgPoolOptions::new()
        .max_connections(pool_size)
        .acquire_timeout(Duration::from_secs(timeout_seconds.into()))
        .connect(database_url)
        .await
        .context("Failed to connect to the database.")?;

    Ok(PostgresConnection::new(pool))
}

pub async fn serve(opts: Options) -> anyhow::Result<()> {
    let connection = connect_database(
        &opts.database_url,
        opts.database_pool_size,
        opts.database_timeout_seconds,
    )
    .await?;

    let storage: DynObjectStorage = Arc::new(LocalObjectStorage::new(
        opts.storage_dir.clone(),
        opts.storage_public_url.clone(),
    ));
    let jwt_keys = JwtKeys::from_secret(
        opts.jwt_secret.as_bytes(),
        chrono::Duration::minutes(opts.token_lifetime_minutes.into()),
    );

    let state = AppState::new(Repositories::postgres(connection), storage, jwt_keys);
    let app = serve_uploads(app(state), &opts.storage_public_url, opts.storage_dir)?
        .layer(cors_layer(&opts.cors_allowed_origins)?);

    info!(address = %opts.bind_address, "Starting server.");

    axum::Server::bind(&opts.bind_address)
        .serve(app.into_make_service())
        .await?;

    Ok(())
}

impl FromRef<AppState> for JwtKeys {
    fn from_ref(state: &AppState) -> Self {
        state.jwt_keys.clone()
    }
}

impl FromRef<AppState> for LedgerService {
    fn from_ref(state: &AppState) -> Self {
        state.ledger_service.clone()
    }
}

impl FromRef<AppState> for PlaceService {
    fn from_ref(state: &AppState) -> Self {
        state.place_service.clone()
    }
}

impl FromRef<AppState> for UserService {
    fn from_ref(state: &AppState) -> Self {
        state.user_service.clone()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn cors_origins_must_be_header_values() {
        assert!(cors_layer(&[]).is_ok());
        assert!(cors_layer(&["https://books.example.com".to_owned()]).is_ok());
        assert!(cors_layer(&["bad\norigin".to_owned()]).is_err());
    }

    #[test]
    fn uploads_are_served_under_the_public_url_path() {
        assert_eq!(
            "/uploads",
            uploads_path("http://localhost:8000/uploads/").unwrap()
        );
        assert_eq!(
            "/media/photos",
            uploads_path("https://books.example.com/media/photos").unwrap()
        );
        assert_eq!("/uploads", uploads_path("/uploads").unwrap());
        assert!(uploads_path("https://cdn.example.com").is_err());
        assert!(uploads_path("https://cdn.example.com/").is_err());
    }
}
