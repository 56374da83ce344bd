// Persisted app state types and reconciliation

pub mod reconciler;

pub use reconciler::{StateHandle, StateReconciler};

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Display language for the app
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum Language {
    #[serde(rename = "pt-BR")]
    PtBr,
    #[serde(rename = "pt-PT")]
    PtPt,
    #[serde(rename = "es")]
    Es,
    #[serde(rename = "en")]
    En,
}

impl Default for Language {
    fn default() -> Self {
        Language::PtBr
    }
}

/// User progress and preferences persisted locally as a single JSON blob.
/// Field names match the stored format, so blobs written by earlier versions
/// of the app load without migration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct AppState {
    /// Total teas prepared
    pub tea_count: u32,
    /// RFC 3339 timestamp of the last prepared tea
    pub last_tea_date: Option<String>,
    /// Recipe ids in preparation order
    pub history: Vec<String>,
    /// Favorited recipe ids
    pub favorites: Vec<String>,
    /// Consecutive-day streak
    pub streak: u32,
    /// Doses taken today, per recipe id
    pub daily_doses: HashMap<String, u32>,
    /// One flag per weekday
    pub weekly_checkins: Vec<bool>,
    /// Protocol start instants, recipe id -> RFC 3339 timestamp
    pub cycle_start_dates: HashMap<String, String>,
    /// Selected display language
    pub language: Language,
}

impl Default for AppState {
    fn default() -> Self {
        Self {
            tea_count: 0,
            last_tea_date: None,
            history: Vec::new(),
            favorites: Vec::new(),
            streak: 0,
            daily_doses: HashMap::new(),
            weekly_checkins: vec![false; 7],
            cycle_start_dates: HashMap::new(),
            language: Language::default(),
        }
    }
}

/// Default accent color (deep moss green)
pub const DEFAULT_ACCENT_COLOR: &str = "#064E3B";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_state() {
        let state = AppState::default();

        assert_eq!(state.tea_count, 0);
        assert!(state.favorites.is_empty());
        assert!(state.cycle_start_dates.is_empty());
        assert_eq!(state.weekly_checkins.len(), 7);
        assert_eq!(state.language, Language::PtBr);
    }

    #[test]
    fn test_serializes_with_camel_case_keys() {
        let state = AppState::default();
        let json = serde_json::to_string(&state).unwrap();

        assert!(json.contains("\"cycleStartDates\""));
        assert!(json.contains("\"weeklyCheckins\""));
        assert!(json.contains("\"pt-BR\""));
    }

    #[test]
    fn test_missing_fields_fall_back_to_defaults() {
        // Only a subset of fields present, as an older blob might have
        let json = r#"{"favorites":["cha-01"],"language":"es"}"#;
        let state: AppState = serde_json::from_str(json).unwrap();

        assert_eq!(state.favorites, vec!["cha-01".to_string()]);
        assert_eq!(state.language, Language::Es);
        assert_eq!(state.tea_count, 0);
        assert_eq!(state.weekly_checkins.len(), 7);
    }

    #[test]
    fn test_unknown_fields_are_ignored() {
        let json = r#"{"favorites":[],"someFutureField":42}"#;
        let state: AppState = serde_json::from_str(json).unwrap();

        assert!(state.favorites.is_empty());
    }
}
