use std::sync::Arc;

use axum::extract::FromRef;
use sea_orm::DatabaseConnection;

use crate::config::Config;
use crate::scheduling::{HttpSuggestionSource, SchedulerError, SuggestionSource};

/// Shared handles passed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub db: DatabaseConnection,
    pub config: Arc<Config>,
    pub scheduler: Option<Arc<dyn SuggestionSource>>,
}

impl AppState {
    /// Build the state, wiring the HTTP scheduler when `BAKERY_SCHEDULER_URL` is set.
    ///
    /// # Errors
    ///
    /// Fails when the scheduler HTTP client cannot be built.
    pub fn new(db: DatabaseConnection, config: Config) -> Result<Self, SchedulerError> {
        let scheduler = match &config.scheduler_url {
            Some(url) => {
                let source = HttpSuggestionSource::new(url.clone(), config.scheduler_timeout)?;
                Some(Arc::new(source) as Arc<dyn SuggestionSource>)
            }
            None => None,
        };
        Ok(Self {
            db,
            config: Arc::new(config),
            scheduler,
        })
    }

    #[must_use]
    pub fn with_scheduler(mut self, scheduler: Arc<dyn SuggestionSource>) -> Self {
        self.scheduler = Some(scheduler);
        self
    }
}

impl FromRef<AppState> for DatabaseConnection {
    fn from_ref(state: &AppState) -> Self {
        state.db.clone()
    }
}
