use crate::storage::{IncidentStore, Pool};

#[derive(Clone)]
pub struct AppState {
    pub store: IncidentStore,
}

impl AppState {
    pub fn new(pool: Pool) -> Self {
        Self {
            store: IncidentStore::new(pool),
        }
    }
}
