use std::sync::Arc;

use sqlx::PgPool;

use crate::breaker::CircuitBreaker;
use crate::clients::{CoreSubmitter, CvCustomizer};
use crate::config::Config;

pub type SharedState = Arc<AppState>;

pub struct AppState {
    pub pool: PgPool,
    pub config: Config,
    pub ai: Arc<dyn CvCustomizer>,
    pub core: Arc<dyn CoreSubmitter>,
    /// One breaker for the Core dependency, shared by all workers.
    pub breaker: CircuitBreaker,
}
