use std::sync::Arc;

use motusdao_database::DbPool;

use crate::chain::AssignmentRegistry;
use crate::config::AppConfig;

#[derive(Clone)]
pub struct AppState {
    pub db_pool: DbPool,
    /// Present only when the contract mirror is configured; every
    /// on-chain write is skipped otherwise.
    pub registry: Option<Arc<AssignmentRegistry>>,
    pub config: AppConfig,
}
