use std::sync::Arc;

use crate::config::Config;
use crate::db::RequestStore;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn RequestStore>,
    pub config: Config,
}

impl AppState {
    pub fn new(store: Arc<dyn RequestStore>, config: Config) -> Self {
        Self { store, config }
    }
}
