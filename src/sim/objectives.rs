//! Per-level objectives and achievements
//!
//! The tracker is rebuilt for every level attempt. Counters are fed from
//! game events; completion is re-evaluated on every [`ObjectiveTracker::update`]
//! until nothing changes, so composite objectives do not depend on the order
//! in which their dependencies complete. Completion is write-once.

use serde::{Deserialize, Serialize};

use super::event::{EventSink, GameEvent};

/// Objective behavior
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ObjectiveKind {
    CollectAllCrystals,
    TimeTrial,
    NoDeath,
    FindSecrets,
    AirTime,
    PerfectRun,
}

impl ObjectiveKind {
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "collect_all_crystals" => Some(ObjectiveKind::CollectAllCrystals),
            "time_trial" => Some(ObjectiveKind::TimeTrial),
            "no_death" => Some(ObjectiveKind::NoDeath),
            "find_secrets" => Some(ObjectiveKind::FindSecrets),
            "air_time" => Some(ObjectiveKind::AirTime),
            "perfect_run" => Some(ObjectiveKind::PerfectRun),
            _ => None,
        }
    }

    /// Can only complete once the level is finished
    pub fn is_finish_gated(self) -> bool {
        matches!(
            self,
            ObjectiveKind::NoDeath | ObjectiveKind::TimeTrial | ObjectiveKind::AirTime
        )
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reward {
    #[serde(default)]
    pub score: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub badge: Option<String>,
}

/// Custom objective entry in level JSON
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectiveDescriptor {
    pub id: String,
    /// Kept as text so unknown kinds can be skipped instead of failing the load
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub target_value: f64,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub dependencies: Vec<String>,
    #[serde(default)]
    pub reward: Reward,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Objective {
    pub id: String,
    pub kind: ObjectiveKind,
    pub title: String,
    pub description: String,
    pub target_value: f64,
    pub current_value: f64,
    pub is_completed: bool,
    /// Level time at completion
    pub completed_at_ms: Option<u64>,
    pub dependencies: Vec<String>,
    pub reward: Reward,
}

impl Objective {
    fn new(
        id: &str,
        kind: ObjectiveKind,
        title: &str,
        description: String,
        target_value: f64,
        reward: Reward,
    ) -> Self {
        Self {
            id: id.to_string(),
            kind,
            title: title.to_string(),
            description,
            target_value,
            current_value: 0.0,
            is_completed: false,
            completed_at_ms: None,
            dependencies: Vec::new(),
            reward,
        }
    }

    /// Completion fraction for progress bars
    pub fn progress(&self) -> f64 {
        if self.is_completed {
            return 1.0;
        }
        match self.kind {
            ObjectiveKind::CollectAllCrystals | ObjectiveKind::FindSecrets
                if self.target_value > 0.0 =>
            {
                (self.current_value / self.target_value).min(1.0)
            }
            ObjectiveKind::AirTime if self.target_value > 0.0 => {
                (self.current_value / self.target_value).min(1.0)
            }
            _ => 0.0,
        }
    }
}

/// What a level offers, used to pick the standard objectives
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LevelMeta {
    pub total_crystals: u32,
    pub total_secrets: u32,
    pub time_trial_target_ms: Option<u64>,
    /// Moving platforms or springs present
    pub has_jump_challenge: bool,
    pub custom: Vec<ObjectiveDescriptor>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct LevelStats {
    pub crystals_collected: u32,
    pub total_crystals: u32,
    pub time_elapsed_ms: f64,
    pub death_count: u32,
    pub secrets_found: u32,
    pub total_secrets: u32,
    pub air_time_ms: f64,
    pub level_finished: bool,
}

impl LevelStats {
    /// Fraction of level time spent airborne
    pub fn air_ratio(&self) -> f64 {
        if self.time_elapsed_ms <= 0.0 {
            0.0
        } else {
            self.air_time_ms / self.time_elapsed_ms
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ObjectiveTracker {
    objectives: Vec<Objective>,
    stats: LevelStats,
}

impl ObjectiveTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reset and build the objective set for a level
    pub fn initialize(&mut self, meta: &LevelMeta) {
        self.objectives.clear();
        self.stats = LevelStats {
            total_crystals: meta.total_crystals,
            total_secrets: meta.total_secrets,
            ..LevelStats::default()
        };

        if meta.total_crystals > 0 {
            self.add(Objective::new(
                "collect_all_crystals",
                ObjectiveKind::CollectAllCrystals,
                "Collector",
                format!("Collect all crystals ({})", meta.total_crystals),
                meta.total_crystals as f64,
                Reward {
                    score: meta.total_crystals as u64 * 100,
                    badge: Some("crystal_collector".into()),
                },
            ));
        }

        self.add(Objective::new(
            "no_death",
            ObjectiveKind::NoDeath,
            "Survivor",
            "Finish the level without dying".into(),
            0.0,
            Reward {
                score: 500,
                badge: Some("survivor".into()),
            },
        ));

        if meta.total_secrets > 0 {
            self.add(Objective::new(
                "find_secrets",
                ObjectiveKind::FindSecrets,
                "Explorer",
                format!("Find all secret areas ({})", meta.total_secrets),
                meta.total_secrets as f64,
                Reward {
                    score: meta.total_secrets as u64 * 200,
                    badge: Some("explorer".into()),
                },
            ));
        }

        if let Some(target) = meta.time_trial_target_ms {
            self.add(Objective::new(
                "time_trial",
                ObjectiveKind::TimeTrial,
                "Speedrunner",
                format!("Finish within {}", crate::format_time(target)),
                target as f64,
                Reward {
                    score: 1000,
                    badge: Some("speedrunner".into()),
                },
            ));
        }

        if meta.has_jump_challenge {
            self.add(Objective::new(
                "air_time",
                ObjectiveKind::AirTime,
                "High Flyer",
                "Spend 80% of the level in the air".into(),
                0.8,
                Reward {
                    score: 800,
                    badge: Some("air_master".into()),
                },
            ));
        }

        let mut perfect = Objective::new(
            "perfect_run",
            ObjectiveKind::PerfectRun,
            "Perfectionist",
            "All crystals, no deaths".into(),
            1.0,
            Reward {
                score: 2000,
                badge: Some("perfectionist".into()),
            },
        );
        perfect.dependencies = vec!["collect_all_crystals".into(), "no_death".into()];
        self.add(perfect);

        for custom in &meta.custom {
            match ObjectiveKind::parse(&custom.kind) {
                Some(kind) => {
                    let mut objective = Objective::new(
                        &custom.id,
                        kind,
                        custom.title.as_deref().unwrap_or(&custom.id),
                        custom.description.clone().unwrap_or_default(),
                        custom.target_value,
                        custom.reward.clone(),
                    );
                    objective.dependencies = custom.dependencies.clone();
                    self.add(objective);
                }
                None => log::warn!(
                    "Skipping objective {} with unknown type {}",
                    custom.id,
                    custom.kind
                ),
            }
        }

        log::info!("Objectives initialized: {}", self.objectives.len());
    }

    /// Insert or replace by id (insertion order kept for new ids)
    pub fn add(&mut self, objective: Objective) {
        match self.objectives.iter_mut().find(|o| o.id == objective.id) {
            Some(existing) => *existing = objective,
            None => self.objectives.push(objective),
        }
    }

    pub fn on_crystal_collected(&mut self) {
        self.stats.crystals_collected += 1;
    }

    pub fn on_player_death(&mut self) {
        self.stats.death_count += 1;
    }

    pub fn on_secret_found(&mut self) {
        self.stats.secrets_found += 1;
    }

    /// Record the finish time; finish-gated objectives can now complete
    pub fn on_level_finished(&mut self, time_ms: f64) {
        self.stats.level_finished = true;
        self.stats.time_elapsed_ms = time_ms;
    }

    /// Advance timers and re-evaluate every objective
    pub fn update(&mut self, raw_dt_ms: f32, airborne: bool, events: &mut impl EventSink) {
        if !self.stats.level_finished {
            self.stats.time_elapsed_ms += raw_dt_ms as f64;
            if airborne {
                self.stats.air_time_ms += raw_dt_ms as f64;
            }
        }
        self.check_progress(events);
    }

    /// Re-evaluate until stable; returns ids completed by this call
    pub fn check_progress(&mut self, events: &mut impl EventSink) -> Vec<String> {
        let mut newly = Vec::new();
        loop {
            let mut changed = false;
            for i in 0..self.objectives.len() {
                let value = self.current_value(&self.objectives[i]);
                let done =
                    !self.objectives[i].is_completed && self.is_satisfied(&self.objectives[i]);
                let objective = &mut self.objectives[i];
                objective.current_value = value;
                if done {
                    objective.is_completed = true;
                    objective.completed_at_ms = Some(self.stats.time_elapsed_ms as u64);
                    log::info!("Objective completed: {}", objective.id);
                    events.emit(GameEvent::ObjectiveCompleted {
                        id: objective.id.clone(),
                        reward_score: objective.reward.score,
                    });
                    newly.push(objective.id.clone());
                    changed = true;
                }
            }
            if !changed {
                break;
            }
        }
        newly
    }

    fn current_value(&self, objective: &Objective) -> f64 {
        let stats = &self.stats;
        match objective.kind {
            ObjectiveKind::CollectAllCrystals => stats.crystals_collected as f64,
            ObjectiveKind::FindSecrets => stats.secrets_found as f64,
            ObjectiveKind::NoDeath => stats.death_count as f64,
            ObjectiveKind::TimeTrial => stats.time_elapsed_ms,
            ObjectiveKind::AirTime => stats.air_ratio(),
            ObjectiveKind::PerfectRun => objective
                .dependencies
                .iter()
                .filter(|id| self.is_completed(id))
                .count() as f64,
        }
    }

    fn is_satisfied(&self, objective: &Objective) -> bool {
        let stats = &self.stats;
        if objective.kind.is_finish_gated() && !stats.level_finished {
            return false;
        }
        match objective.kind {
            ObjectiveKind::CollectAllCrystals => {
                stats.crystals_collected as f64 >= objective.target_value
            }
            ObjectiveKind::FindSecrets => stats.secrets_found as f64 >= objective.target_value,
            ObjectiveKind::NoDeath => stats.death_count == 0,
            ObjectiveKind::TimeTrial => stats.time_elapsed_ms <= objective.target_value,
            ObjectiveKind::AirTime => stats.air_ratio() >= objective.target_value,
            ObjectiveKind::PerfectRun => {
                !objective.dependencies.is_empty()
                    && objective.dependencies.iter().all(|id| self.is_completed(id))
            }
        }
    }

    pub fn is_completed(&self, id: &str) -> bool {
        self.get(id).is_some_and(|o| o.is_completed)
    }

    pub fn get(&self, id: &str) -> Option<&Objective> {
        self.objectives.iter().find(|o| o.id == id)
    }

    pub fn objectives(&self) -> &[Objective] {
        &self.objectives
    }

    pub fn completed(&self) -> impl Iterator<Item = &Objective> {
        self.objectives.iter().filter(|o| o.is_completed)
    }

    pub fn stats(&self) -> &LevelStats {
        &self.stats
    }

    /// Percentage of objectives completed, 0..=100
    pub fn overall_progress(&self) -> f64 {
        if self.objectives.is_empty() {
            return 0.0;
        }
        self.completed().count() as f64 / self.objectives.len() as f64 * 100.0
    }

    /// Rewards of completed objectives plus a progress bonus
    pub fn final_score(&self) -> u64 {
        let rewards: u64 = self.completed().map(|o| o.reward.score).sum();
        rewards + (self.overall_progress() * 10.0).floor() as u64
    }

    pub fn earned_badges(&self) -> Vec<String> {
        self.completed()
            .filter_map(|o| o.reward.badge.clone())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn meta(crystals: u32, secrets: u32) -> LevelMeta {
        LevelMeta {
            total_crystals: crystals,
            total_secrets: secrets,
            ..LevelMeta::default()
        }
    }

    fn ids(tracker: &ObjectiveTracker) -> Vec<&str> {
        tracker.objectives().iter().map(|o| o.id.as_str()).collect()
    }

    #[test]
    fn test_standard_set() {
        let mut tracker = ObjectiveTracker::new();
        tracker.initialize(&LevelMeta {
            total_crystals: 3,
            total_secrets: 1,
            time_trial_target_ms: Some(60_000),
            has_jump_challenge: true,
            custom: Vec::new(),
        });
        assert_eq!(
            ids(&tracker),
            vec![
                "collect_all_crystals",
                "no_death",
                "find_secrets",
                "time_trial",
                "air_time",
                "perfect_run"
            ]
        );
        assert_eq!(tracker.get("collect_all_crystals").unwrap().reward.score, 300);

        tracker.initialize(&meta(0, 0));
        assert_eq!(ids(&tracker), vec!["no_death", "perfect_run"]);
    }

    #[test]
    fn test_no_death_waits_for_finish() {
        let mut tracker = ObjectiveTracker::new();
        tracker.initialize(&meta(0, 0));
        let mut events = Vec::new();
        tracker.update(16.0, false, &mut events);
        assert!(!tracker.is_completed("no_death"));

        tracker.on_level_finished(16.0);
        tracker.update(16.0, false, &mut events);
        assert!(tracker.is_completed("no_death"));
        assert!(events.contains(&GameEvent::ObjectiveCompleted {
            id: "no_death".into(),
            reward_score: 500
        }));
    }

    #[test]
    fn test_perfect_run_completes_in_same_update_as_dependencies() {
        let mut tracker = ObjectiveTracker::new();
        tracker.initialize(&meta(1, 0));
        let mut events = Vec::new();
        tracker.on_crystal_collected();
        tracker.on_level_finished(5000.0);
        tracker.update(0.0, false, &mut events);
        assert!(tracker.is_completed("collect_all_crystals"));
        assert!(tracker.is_completed("no_death"));
        assert!(tracker.is_completed("perfect_run"));
        assert_eq!(events.len(), 3);
    }

    #[test]
    fn test_composite_order_independent() {
        // Composite listed before its dependency
        let mut tracker = ObjectiveTracker::new();
        tracker.initialize(&LevelMeta {
            custom: vec![
                ObjectiveDescriptor {
                    id: "combo".into(),
                    kind: "perfect_run".into(),
                    title: None,
                    description: None,
                    target_value: 1.0,
                    dependencies: vec!["secrets_2".into()],
                    reward: Reward::default(),
                },
                ObjectiveDescriptor {
                    id: "secrets_2".into(),
                    kind: "find_secrets".into(),
                    title: None,
                    description: None,
                    target_value: 2.0,
                    dependencies: Vec::new(),
                    reward: Reward::default(),
                },
            ],
            ..LevelMeta::default()
        });
        let mut events = Vec::new();
        tracker.on_secret_found();
        tracker.on_secret_found();
        tracker.update(16.0, false, &mut events);
        assert!(tracker.is_completed("secrets_2"));
        assert!(tracker.is_completed("combo"));
    }

    #[test]
    fn test_unknown_custom_kind_skipped() {
        let mut tracker = ObjectiveTracker::new();
        tracker.initialize(&LevelMeta {
            custom: vec![ObjectiveDescriptor {
                id: "weird".into(),
                kind: "juggle".into(),
                title: None,
                description: None,
                target_value: 1.0,
                dependencies: Vec::new(),
                reward: Reward::default(),
            }],
            ..LevelMeta::default()
        });
        assert!(tracker.get("weird").is_none());
    }

    #[test]
    fn test_time_trial_and_air_time() {
        let mut tracker = ObjectiveTracker::new();
        tracker.initialize(&LevelMeta {
            time_trial_target_ms: Some(1000),
            has_jump_challenge: true,
            ..LevelMeta::default()
        });
        let mut events = Vec::new();
        for _ in 0..50 {
            tracker.update(16.0, true, &mut events);
        }
        tracker.on_level_finished(tracker.stats().time_elapsed_ms);
        tracker.update(16.0, true, &mut events);
        assert!(tracker.is_completed("time_trial"));
        assert!(tracker.is_completed("air_time"));
        assert_eq!(tracker.stats().time_elapsed_ms, 800.0);
    }

    #[test]
    fn test_final_score_and_badges() {
        let mut tracker = ObjectiveTracker::new();
        tracker.initialize(&meta(2, 0));
        let mut events = Vec::new();
        tracker.on_player_death();
        tracker.on_crystal_collected();
        tracker.on_crystal_collected();
        tracker.on_level_finished(1000.0);
        tracker.update(0.0, false, &mut events);
        // Only the crystal objective: 200 + floor(1/3 * 100 * 10)
        assert_eq!(tracker.final_score(), 200 + 333);
        assert_eq!(tracker.earned_badges(), vec!["crystal_collector".to_string()]);
    }

    #[test]
    fn test_custom_objective_json() {
        let json = r#"{"id":"fast","type":"time_trial","targetValue":30000,
            "reward":{"score":50,"badge":"quick"}}"#;
        let d: ObjectiveDescriptor = serde_json::from_str(json).unwrap();
        assert_eq!(d.kind, "time_trial");
        assert_eq!(d.target_value, 30000.0);
        assert_eq!(d.reward.badge.as_deref(), Some("quick"));
    }

    proptest! {
        #[test]
        fn prop_completion_is_monotonic(ops in proptest::collection::vec(0u8..5, 1..80)) {
            let mut tracker = ObjectiveTracker::new();
            tracker.initialize(&LevelMeta {
                total_crystals: 3,
                total_secrets: 2,
                time_trial_target_ms: Some(500),
                has_jump_challenge: true,
                custom: Vec::new(),
            });
            let mut events = Vec::new();
            let mut seen: Vec<String> = Vec::new();
            for op in ops {
                match op {
                    0 => tracker.on_crystal_collected(),
                    1 => tracker.on_player_death(),
                    2 => tracker.on_secret_found(),
                    3 => tracker.on_level_finished(tracker.stats().time_elapsed_ms),
                    _ => {}
                }
                tracker.update(16.0, op % 2 == 0, &mut events);
                for id in &seen {
                    prop_assert!(tracker.is_completed(id));
                }
                seen = tracker.completed().map(|o| o.id.clone()).collect();
            }
        }
    }
}
