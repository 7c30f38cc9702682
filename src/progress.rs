//! Player progress record
//!
//! Unlocked/completed levels, best times, total score and achievements,
//! plus lifetime statistics aggregated from simulation events. Persisted
//! to LocalStorage.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::sim::GameEvent;

/// Lifetime counters
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Statistics {
    pub jumps: u64,
    pub crystals_collected: u64,
    pub enemies_stomped: u64,
    pub deaths: u64,
    pub secrets_found: u64,
    pub power_ups_collected: u64,
    pub levels_completed: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PlayerProgress {
    pub user_id: Option<String>,
    /// Sorted, no duplicates
    pub unlocked_levels: Vec<u32>,
    pub completed_levels: Vec<u32>,
    /// Best (lowest) completion time per level, in milliseconds
    pub best_times: BTreeMap<u32, u64>,
    pub total_score: u64,
    pub achievements: Vec<String>,
    pub statistics: Statistics,
}

impl Default for PlayerProgress {
    fn default() -> Self {
        Self {
            user_id: None,
            unlocked_levels: vec![0],
            completed_levels: Vec::new(),
            best_times: BTreeMap::new(),
            total_score: 0,
            achievements: Vec::new(),
            statistics: Statistics::default(),
        }
    }
}

/// Insert into a sorted vec unless already present
fn insert_sorted(list: &mut Vec<u32>, value: u32) {
    if let Err(pos) = list.binary_search(&value) {
        list.insert(pos, value);
    }
}

impl PlayerProgress {
    /// LocalStorage key (used only in wasm32)
    #[allow(dead_code)]
    const STORAGE_KEY: &'static str = "chrono_platformer_progress";

    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_unlocked(&self, level: u32) -> bool {
        self.unlocked_levels.binary_search(&level).is_ok()
    }

    pub fn is_completed(&self, level: u32) -> bool {
        self.completed_levels.binary_search(&level).is_ok()
    }

    pub fn best_time(&self, level: u32) -> Option<u64> {
        self.best_times.get(&level).copied()
    }

    /// Record a finished level. Returns true if `time_ms` is a new best.
    pub fn record_level_complete(
        &mut self,
        level: u32,
        time_ms: u64,
        score: u64,
        badges: &[String],
    ) -> bool {
        insert_sorted(&mut self.completed_levels, level);
        insert_sorted(&mut self.unlocked_levels, level + 1);
        self.total_score += score;
        self.statistics.levels_completed += 1;

        for badge in badges {
            if !self.achievements.contains(badge) {
                log::info!("Achievement unlocked: {}", badge);
                self.achievements.push(badge.clone());
            }
        }

        let best = self.best_times.entry(level).or_insert(time_ms);
        let improved = time_ms <= *best;
        if improved {
            *best = time_ms;
        }
        improved
    }

    /// Fold one simulation event into the statistics
    pub fn apply_event(&mut self, event: &GameEvent) {
        let stats = &mut self.statistics;
        match event {
            GameEvent::Jumped { .. } => stats.jumps += 1,
            GameEvent::CrystalCollected { .. } => stats.crystals_collected += 1,
            GameEvent::EnemyStomped { .. } => stats.enemies_stomped += 1,
            GameEvent::Died { .. } => stats.deaths += 1,
            GameEvent::SecretFound { .. } => stats.secrets_found += 1,
            GameEvent::PowerUpCollected { .. } => stats.power_ups_collected += 1,
            _ => {}
        }
    }

    /// Load progress from LocalStorage (WASM only)
    #[cfg(target_arch = "wasm32")]
    pub fn load() -> Self {
        let storage = web_sys::window()
            .and_then(|w| w.local_storage().ok())
            .flatten();

        if let Some(storage) = storage {
            if let Ok(Some(json)) = storage.get_item(Self::STORAGE_KEY) {
                if let Ok(progress) = serde_json::from_str::<PlayerProgress>(&json) {
                    log::info!(
                        "Loaded progress ({} levels completed)",
                        progress.completed_levels.len()
                    );
                    return progress;
                }
            }
        }

        log::info!("No saved progress, starting fresh");
        Self::new()
    }

    /// Save progress to LocalStorage (WASM only)
    #[cfg(target_arch = "wasm32")]
    pub fn save(&self) {
        let storage = web_sys::window()
            .and_then(|w| w.local_storage().ok())
            .flatten();

        if let Some(storage) = storage {
            if let Ok(json) = serde_json::to_string(self) {
                let _ = storage.set_item(Self::STORAGE_KEY, &json);
                log::info!("Progress saved");
            }
        }
    }

    /// Native stubs
    #[cfg(not(target_arch = "wasm32"))]
    pub fn load() -> Self {
        Self::new()
    }

    #[cfg(not(target_arch = "wasm32"))]
    pub fn save(&self) {
        // No-op for native
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::DeathCause;
    use glam::Vec2;

    #[test]
    fn test_first_level_unlocked_by_default() {
        let p = PlayerProgress::new();
        assert!(p.is_unlocked(0));
        assert!(!p.is_unlocked(1));
    }

    #[test]
    fn test_record_completion_unlocks_next() {
        let mut p = PlayerProgress::new();
        assert!(p.record_level_complete(0, 42_000, 500, &[]));
        assert!(p.is_completed(0));
        assert!(p.is_unlocked(1));
        assert_eq!(p.total_score, 500);
        assert_eq!(p.best_time(0), Some(42_000));
    }

    #[test]
    fn test_best_time_keeps_lowest() {
        let mut p = PlayerProgress::new();
        p.record_level_complete(2, 30_000, 0, &[]);
        assert!(!p.record_level_complete(2, 35_000, 0, &[]));
        assert_eq!(p.best_time(2), Some(30_000));
        assert!(p.record_level_complete(2, 25_000, 0, &[]));
        assert_eq!(p.best_time(2), Some(25_000));
        assert_eq!(p.completed_levels, vec![2]);
    }

    #[test]
    fn test_badges_merge_without_duplicates() {
        let mut p = PlayerProgress::new();
        let badges = vec!["Perfectionist".to_string(), "Survivor".to_string()];
        p.record_level_complete(0, 1000, 0, &badges);
        p.record_level_complete(1, 1000, 0, &badges[..1]);
        assert_eq!(p.achievements, badges);
    }

    #[test]
    fn test_apply_event_counts() {
        let mut p = PlayerProgress::new();
        p.apply_event(&GameEvent::Jumped {
            pos: Vec2::ZERO,
            jump_number: 1,
        });
        p.apply_event(&GameEvent::Died {
            cause: DeathCause::OutOfBounds,
        });
        p.apply_event(&GameEvent::KeyCollected);
        assert_eq!(p.statistics.jumps, 1);
        assert_eq!(p.statistics.deaths, 1);
        assert_eq!(p.statistics.crystals_collected, 0);
    }

    #[test]
    fn test_json_shape() {
        let mut p = PlayerProgress::new();
        p.record_level_complete(0, 1234, 10, &[]);
        let json = serde_json::to_string(&p).unwrap();
        assert!(json.contains("\"bestTimes\":{\"0\":1234}"));
        assert!(json.contains("\"unlockedLevels\":[0,1]"));
        let back: PlayerProgress = serde_json::from_str(&json).unwrap();
        assert_eq!(back, p);
    }
}
