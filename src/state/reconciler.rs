// Persisted state reconciler
// Bridges in-memory app state and the durable local store. Loads are
// best-effort and never fail the caller; saves write the full state through
// on every mutation.

use super::{AppState, Language, DEFAULT_ACCENT_COLOR};
use crate::store::{LocalStore, APP_STATE_KEY, THEME_COLOR_KEY, USER_NAME_KEY};
use chrono::Utc;
use std::sync::Arc;
use tracing::{debug, warn};

/// Loads and saves the persisted app state
pub struct StateReconciler {
    store: Arc<dyn LocalStore>,
}

impl StateReconciler {
    pub fn new(store: Arc<dyn LocalStore>) -> Self {
        Self { store }
    }

    /// Load the persisted state, merging recognized fields over defaults.
    /// Absent or malformed data falls back to defaults and never fails.
    pub fn load(&self) -> AppState {
        let blob = match self.store.get(APP_STATE_KEY) {
            Ok(Some(blob)) => blob,
            Ok(None) => {
                debug!("No persisted app state, starting from defaults");
                return AppState::default();
            }
            Err(e) => {
                warn!("Failed to read persisted app state: {}", e);
                return AppState::default();
            }
        };

        match serde_json::from_str::<AppState>(&blob) {
            Ok(state) => state,
            Err(e) => {
                warn!("Malformed persisted app state, using defaults: {}", e);
                AppState::default()
            }
        }
    }

    /// Serialize the full state and write it unconditionally.
    /// Store failures are absorbed and logged; nothing here is fatal.
    pub fn save(&self, state: &AppState) {
        let blob = match serde_json::to_string(state) {
            Ok(blob) => blob,
            Err(e) => {
                warn!("Failed to serialize app state: {}", e);
                return;
            }
        };

        if let Err(e) = self.store.set(APP_STATE_KEY, &blob) {
            warn!("Failed to persist app state: {}", e);
        }
    }

    /// Selected accent color, or the default when unset/unreadable
    pub fn load_accent_color(&self) -> String {
        match self.store.get(THEME_COLOR_KEY) {
            Ok(Some(color)) => color,
            Ok(None) => DEFAULT_ACCENT_COLOR.to_string(),
            Err(e) => {
                warn!("Failed to read accent color: {}", e);
                DEFAULT_ACCENT_COLOR.to_string()
            }
        }
    }

    pub fn save_accent_color(&self, color: &str) {
        if let Err(e) = self.store.set(THEME_COLOR_KEY, color) {
            warn!("Failed to persist accent color: {}", e);
        }
    }

    /// Display name, empty when unset
    pub fn load_display_name(&self) -> String {
        match self.store.get(USER_NAME_KEY) {
            Ok(Some(name)) => name,
            Ok(None) => String::new(),
            Err(e) => {
                warn!("Failed to read display name: {}", e);
                String::new()
            }
        }
    }

    pub fn save_display_name(&self, name: &str) {
        if let Err(e) = self.store.set(USER_NAME_KEY, name) {
            warn!("Failed to persist display name: {}", e);
        }
    }
}

/// In-memory state with write-through persistence on every mutation
pub struct StateHandle {
    state: AppState,
    reconciler: StateReconciler,
}

impl StateHandle {
    /// Load persisted state (or defaults) into a live handle
    pub fn load(store: Arc<dyn LocalStore>) -> Self {
        let reconciler = StateReconciler::new(store);
        let state = reconciler.load();
        Self { state, reconciler }
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    /// Add or remove a recipe from favorites
    pub fn toggle_favorite(&mut self, recipe_id: &str) {
        if let Some(pos) = self.state.favorites.iter().position(|id| id == recipe_id) {
            self.state.favorites.remove(pos);
        } else {
            self.state.favorites.push(recipe_id.to_string());
        }
        self.reconciler.save(&self.state);
    }

    pub fn is_favorite(&self, recipe_id: &str) -> bool {
        self.state.favorites.iter().any(|id| id == recipe_id)
    }

    /// Stamp the current instant as the protocol start for a recipe
    pub fn start_cycle(&mut self, recipe_id: &str) {
        self.state
            .cycle_start_dates
            .insert(recipe_id.to_string(), Utc::now().to_rfc3339());
        self.reconciler.save(&self.state);
    }

    pub fn set_language(&mut self, language: Language) {
        self.state.language = language;
        self.reconciler.save(&self.state);
    }

    /// Record a prepared tea in the running counters
    pub fn record_tea(&mut self, recipe_id: &str) {
        self.state.tea_count += 1;
        self.state.last_tea_date = Some(Utc::now().to_rfc3339());
        self.state.history.push(recipe_id.to_string());
        *self
            .state
            .daily_doses
            .entry(recipe_id.to_string())
            .or_insert(0) += 1;
        self.reconciler.save(&self.state);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use std::collections::HashMap;

    fn memory_store() -> Arc<dyn LocalStore> {
        Arc::new(MemoryStore::new())
    }

    #[test]
    fn test_load_returns_defaults_when_absent() {
        let reconciler = StateReconciler::new(memory_store());

        assert_eq!(reconciler.load(), AppState::default());
    }

    #[test]
    fn test_load_never_fails_on_malformed_blob() {
        let store = memory_store();
        store.set(APP_STATE_KEY, "{not json").unwrap();

        let reconciler = StateReconciler::new(store);
        let state = reconciler.load();

        assert_eq!(state, AppState::default());
        assert!(state.favorites.is_empty());
        assert!(state.cycle_start_dates.is_empty());
    }

    #[test]
    fn test_save_load_roundtrip() {
        let store = memory_store();
        let reconciler = StateReconciler::new(store);

        let mut state = AppState::default();
        state.tea_count = 12;
        state.favorites = vec!["cha-03".to_string(), "cha-17".to_string()];
        state.language = Language::PtPt;
        state.streak = 4;
        state
            .cycle_start_dates
            .insert("cha-03".to_string(), "2024-01-15T08:30:00Z".to_string());
        state.daily_doses = HashMap::from([("cha-03".to_string(), 2)]);
        state.weekly_checkins = vec![true, true, false, false, false, false, false];

        reconciler.save(&state);
        let loaded = reconciler.load();

        assert_eq!(loaded, state);
    }

    #[test]
    fn test_partial_blob_keeps_defaults_for_missing_fields() {
        let store = memory_store();
        store
            .set(APP_STATE_KEY, r#"{"favorites":["cha-01"]}"#)
            .unwrap();

        let reconciler = StateReconciler::new(store);
        let state = reconciler.load();

        assert_eq!(state.favorites, vec!["cha-01".to_string()]);
        assert_eq!(state.language, Language::PtBr);
        assert_eq!(state.weekly_checkins.len(), 7);
    }

    #[test]
    fn test_accent_color_defaults() {
        let reconciler = StateReconciler::new(memory_store());

        assert_eq!(reconciler.load_accent_color(), DEFAULT_ACCENT_COLOR);

        reconciler.save_accent_color("#1E3A8A");
        assert_eq!(reconciler.load_accent_color(), "#1E3A8A");
    }

    #[test]
    fn test_display_name_roundtrip() {
        let reconciler = StateReconciler::new(memory_store());

        assert_eq!(reconciler.load_display_name(), "");

        reconciler.save_display_name("Maria");
        assert_eq!(reconciler.load_display_name(), "Maria");
    }

    #[test]
    fn test_toggle_favorite_writes_through() {
        let store = memory_store();
        let mut handle = StateHandle::load(store.clone());

        handle.toggle_favorite("cha-05");
        assert!(handle.is_favorite("cha-05"));

        // A fresh handle over the same store sees the mutation
        let reloaded = StateHandle::load(store.clone());
        assert!(reloaded.is_favorite("cha-05"));

        handle.toggle_favorite("cha-05");
        assert!(!handle.is_favorite("cha-05"));

        let reloaded = StateHandle::load(store);
        assert!(!reloaded.is_favorite("cha-05"));
    }

    #[test]
    fn test_start_cycle_stamps_current_instant() {
        let store = memory_store();
        let mut handle = StateHandle::load(store.clone());

        let before = Utc::now();
        handle.start_cycle("cha-09");

        let reloaded = StateHandle::load(store);
        let stamp = reloaded
            .state()
            .cycle_start_dates
            .get("cha-09")
            .expect("cycle start persisted");
        let parsed = chrono::DateTime::parse_from_rfc3339(stamp).unwrap();
        assert!(parsed.timestamp() >= before.timestamp());
    }

    #[test]
    fn test_record_tea_updates_counters() {
        let store = memory_store();
        let mut handle = StateHandle::load(store.clone());

        handle.record_tea("cha-02");
        handle.record_tea("cha-02");

        let reloaded = StateHandle::load(store);
        assert_eq!(reloaded.state().tea_count, 2);
        assert_eq!(reloaded.state().history.len(), 2);
        assert_eq!(reloaded.state().daily_doses.get("cha-02"), Some(&2));
        assert!(reloaded.state().last_tea_date.is_some());
    }
}
