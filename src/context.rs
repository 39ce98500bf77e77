/// Shared application context
///
/// One clone-able bundle of configuration, the database pool, and every
/// service manager, handed to the router as axum state.

use crate::{
    account::AccountManager,
    autofill::MetadataFetcher,
    config::ServerConfig,
    db::{create_pool, run_migrations, DatabaseOptions},
    error::ApiResult,
    gifting::{ContributionLedger, ReservationManager},
    identity::GoogleTokenVerifier,
    realtime::RoomRegistry,
    wishlist::WishlistManager,
};
use sqlx::SqlitePool;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppContext {
    pub config: Arc<ServerConfig>,
    pub db: SqlitePool,
    pub accounts: Arc<AccountManager>,
    pub wishlists: Arc<WishlistManager>,
    pub contributions: Arc<ContributionLedger>,
    pub reservations: Arc<ReservationManager>,
    pub rooms: Arc<RoomRegistry>,
    /// Unset when Google login is not configured
    pub google: Option<Arc<GoogleTokenVerifier>>,
    pub autofill: Arc<MetadataFetcher>,
}

impl AppContext {
    /// Initialize storage and wire up all services
    pub async fn new(config: ServerConfig) -> ApiResult<Self> {
        let config = Arc::new(config);

        let db = create_pool(&config.storage.database, DatabaseOptions::default()).await?;
        run_migrations(&db).await?;

        Ok(Self::assemble(config, db))
    }

    fn assemble(config: Arc<ServerConfig>, db: SqlitePool) -> Self {
        let rooms = Arc::new(RoomRegistry::new());

        let accounts = Arc::new(AccountManager::new(db.clone(), config.clone()));
        let wishlists = Arc::new(WishlistManager::new(db.clone(), rooms.clone()));
        let contributions = Arc::new(ContributionLedger::new(db.clone(), rooms.clone()));
        let reservations = Arc::new(ReservationManager::new(db.clone(), rooms.clone()));

        let google = config
            .auth
            .google_client_id
            .clone()
            .map(|client_id| Arc::new(GoogleTokenVerifier::new(client_id)));

        let autofill = Arc::new(MetadataFetcher::new(&config.autofill));

        Self {
            config,
            db,
            accounts,
            wishlists,
            contributions,
            reservations,
            rooms,
            google,
            autofill,
        }
    }

    #[cfg(test)]
    pub(crate) async fn for_tests() -> Self {
        let config = Arc::new(crate::config::test_config());
        let db = crate::db::test_support::memory_pool().await;
        Self::assemble(config, db)
    }
}
