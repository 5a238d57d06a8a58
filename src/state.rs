use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::db::database::Database;
use crate::wizard::machine::Wizard;

/// One wizard per user. The outer map lock is held only to fetch the slot;
/// holding the slot's own lock serializes that user's events while other
/// users run concurrently.
type WizardSlot = Arc<tokio::sync::Mutex<Wizard>>;

#[derive(Clone)]
pub struct AppState {
    pub db: Database,
    wizards: Arc<Mutex<HashMap<i64, WizardSlot>>>,
}

impl AppState {
    pub fn new(db: Database) -> Self {
        AppState {
            db,
            wizards: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub fn wizard_slot(&self, user_id: i64) -> WizardSlot {
        self.wizards.lock().entry(user_id).or_default().clone()
    }
}
