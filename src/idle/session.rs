//! One running game: state, timers, persistence and the control flow that
//! ties them together.
//!
//! Every player action goes through `GameSession`, which applies the
//! mutation, re-checks achievements, then either saves immediately or marks
//! the session dirty for the next autosave.

use rand::rngs::SmallRng;

use super::achievements::{expedition_achievements, AchievementEvaluator};
use super::config::GameConfig;
use super::error::{ActionError, ScheduleError};
use super::logic;
use super::missions::{
    MissionHook, MissionId, MissionRewards, MissionSnapshot, MissionTracker, MISSION_CATALOG,
};
use super::save::{PersistenceCodec, SaveRecord, SaveStore, SAVE_VERSION};
use super::scheduler::{EventSnapshot, ScheduledEventQueue};
use super::state::{MessageLog, ProgressionState};
use crate::time::GameClock;

/// Everything scheduled callbacks may touch.
pub struct GameWorld {
    pub progression: ProgressionState,
    pub missions: MissionTracker,
    pub achievements: AchievementEvaluator,
    pub log: MessageLog,
}

impl GameWorld {
    pub fn new(progression: ProgressionState) -> Self {
        let mut achievements = AchievementEvaluator::with_builtins();
        for achievement in expedition_achievements() {
            achievements.register(achievement);
        }
        Self {
            progression,
            missions: MissionTracker::new(),
            achievements,
            log: MessageLog::default(),
        }
    }

    /// Complete an active mission and tell the player. Returns false if the
    /// mission is not active.
    pub fn complete_mission(
        &mut self,
        id: MissionId,
        queue: &mut ScheduledEventQueue<GameWorld>,
    ) -> bool {
        let name = self.missions.name_of(id).map(str::to_owned);
        if !self.missions.complete(id, queue, &mut self.progression) {
            return false;
        }
        self.log.push(
            format!("Mission complete: {}", name.unwrap_or_else(|| id.to_string())),
            true,
        );
        true
    }

    /// Evaluate achievements and log each new unlock. Returns the new ids.
    pub fn check_achievements(&mut self) -> Vec<String> {
        let unlocked = self.achievements.evaluate(&self.progression);
        for id in &unlocked {
            if let Some(achievement) = self.achievements.get(id) {
                self.log
                    .push(format!("Achievement unlocked: {}", achievement.name), true);
            }
        }
        unlocked
    }
}

pub struct GameSession {
    world: GameWorld,
    scheduler: ScheduledEventQueue<GameWorld>,
    clock: GameClock,
    store: Box<dyn SaveStore>,
    codec: PersistenceCodec,
    config: GameConfig,
    rng: SmallRng,
    /// Unsaved changes since the last successful write.
    dirty: bool,
    initialized: bool,
}

impl GameSession {
    pub fn new(config: GameConfig, store: Box<dyn SaveStore>, rng: SmallRng) -> Self {
        Self {
            world: GameWorld::new(ProgressionState::from_config(&config)),
            scheduler: ScheduledEventQueue::new(),
            clock: GameClock::new(&config),
            store,
            codec: PersistenceCodec::new(config.storage_key.clone()),
            config,
            rng,
            dirty: false,
            initialized: false,
        }
    }

    /// Load the save (first call only) and arm the tick and autosave timers.
    /// Calling again only re-arms the timers.
    pub fn init(&mut self) {
        if !self.initialized {
            self.load();
            self.initialized = true;
        }
        self.clock.start();
    }

    /// Stop the timers and flush unsaved changes. `init` starts them again.
    pub fn shutdown(&mut self) {
        self.clock.stop();
        if self.dirty {
            self.save();
        }
    }

    /// Replace the current state with the stored one. Returns false when
    /// there was nothing usable to load; the current state is kept then.
    pub fn load(&mut self) -> bool {
        let fresh = ProgressionState::from_config(&self.config);
        let Some(loaded) = self.codec.load(self.store.as_ref(), fresh) else {
            return false;
        };
        // Older formats are rewritten by the next save.
        let outdated = loaded.version != Some(SAVE_VERSION);

        self.world.progression = loaded.progression;
        self.world.achievements.restore(&loaded.achievements);
        let finished = self.world.missions.restore(
            loaded.missions,
            &mut self.scheduler,
            &mut self.world.progression,
        );
        for mission in &finished {
            self.world.log.push(
                format!(
                    "Mission complete while away: {} ({})",
                    mission.name,
                    mission.rewards.describe()
                ),
                true,
            );
        }
        let unlocked = self.world.check_achievements();
        if outdated || !finished.is_empty() || !unlocked.is_empty() {
            self.dirty = true;
        }
        true
    }

    /// Write the full snapshot. A failed write is logged and leaves the
    /// session dirty so the next autosave retries.
    pub fn save(&mut self) -> bool {
        let record = SaveRecord::capture(
            &self.world.progression,
            self.world.achievements.serialize(),
            self.world.missions.serialize(&self.scheduler),
        );
        match self.codec.save(self.store.as_mut(), &record) {
            Ok(()) => {
                self.dirty = false;
                true
            }
            Err(e) => {
                log::warn!("save failed: {e}");
                false
            }
        }
    }

    /// Periodic save. Skips the write when nothing changed.
    pub fn autosave(&mut self) -> bool {
        if !self.dirty {
            log::debug!("autosave skipped, nothing changed");
            return false;
        }
        self.save()
    }

    pub fn click(&mut self) -> f64 {
        let gained = logic::click(&mut self.world.progression);
        self.after_mutation(false);
        gained
    }

    pub fn buy_multiplier(&mut self) -> Result<(), ActionError> {
        let result = logic::buy_multiplier(&mut self.world.progression);
        match &result {
            Ok(()) => {
                let multiplier = self.world.progression.multiplier;
                self.world
                    .log
                    .push(format!("Multiplier upgraded to x{multiplier}"), false);
                self.after_mutation(true);
            }
            Err(e) => self.reject(e),
        }
        result
    }

    pub fn buy_passive_upgrade(&mut self) -> Result<(), ActionError> {
        let result = logic::buy_passive_upgrade(&mut self.world.progression);
        match &result {
            Ok(()) => {
                let level = self.world.progression.passive_level;
                self.world
                    .log
                    .push(format!("Passive income upgraded to level {level}"), false);
                self.after_mutation(true);
            }
            Err(e) => self.reject(e),
        }
        result
    }

    pub fn find_gems(&mut self) -> u64 {
        let found = logic::find_gems(
            &mut self.world.progression,
            &mut self.rng,
            self.config.gem_find_range.clone(),
        );
        self.world.log.push(format!("Found {found} gems!"), false);
        self.after_mutation(true);
        found
    }

    #[cfg(test)]
    pub fn add_inventory_item(&mut self, item: impl Into<String>) {
        let item = item.into();
        self.world.log.push(format!("Obtained {item}"), false);
        logic::add_inventory_item(&mut self.world.progression, item);
        self.after_mutation(true);
    }

    pub fn start_mission(
        &mut self,
        name: impl Into<String>,
        duration: f64,
        rewards: MissionRewards,
        on_complete: Option<MissionHook>,
    ) -> Result<MissionId, ScheduleError> {
        let name = name.into();
        let id = self.world.missions.start(
            &mut self.scheduler,
            name.clone(),
            duration,
            rewards,
            on_complete,
        )?;
        self.world
            .log
            .push(format!("Mission started: {name} ({duration}s)"), false);
        self.after_mutation(true);
        Ok(id)
    }

    /// Start the `index`-th mission of [`MISSION_CATALOG`].
    pub fn start_catalog_mission(&mut self, index: usize) -> Option<MissionId> {
        let template = MISSION_CATALOG.get(index)?;
        match self.start_mission(template.name, template.duration, template.rewards(), None) {
            Ok(id) => Some(id),
            Err(e) => {
                log::warn!("could not start {}: {e}", template.name);
                None
            }
        }
    }

    /// One passive tick: accrue one second of income, then advance the
    /// event queue by one second.
    pub fn tick(&mut self) {
        logic::apply_passive_tick(&mut self.world.progression);
        let fired = self.scheduler.advance(1.0, &mut self.world);
        if !fired.is_empty() {
            log::debug!("{} events fired this tick", fired.len());
        }
        self.after_mutation(false);
    }

    pub fn tick_n(&mut self, n: u32) {
        for _ in 0..n {
            self.tick();
        }
    }

    /// Drive the clock from a frame timestamp (ms).
    pub fn frame(&mut self, now_ms: f64) {
        let fires = self.clock.frame(now_ms);
        self.tick_n(fires.ticks);
        if fires.autosaves > 0 {
            self.autosave();
        }
    }

    fn after_mutation(&mut self, save_now: bool) {
        self.world.check_achievements();
        self.dirty = true;
        if save_now {
            self.save();
        }
    }

    fn reject(&mut self, err: &ActionError) {
        log::info!("{err}");
        self.world.log.push(format!("Not enough score! ({err})"), true);
    }

    pub fn progression(&self) -> &ProgressionState {
        &self.world.progression
    }

    pub fn achievements(&self) -> &AchievementEvaluator {
        &self.world.achievements
    }

    pub fn messages(&self) -> &MessageLog {
        &self.world.log
    }

    /// Active missions with live remaining time.
    pub fn active_missions(&self) -> Vec<MissionSnapshot> {
        self.world.missions.serialize(&self.scheduler)
    }

    pub fn pending_events(&self) -> Vec<EventSnapshot> {
        self.scheduler.snapshot()
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use rand::SeedableRng;

    use super::*;
    use crate::idle::error::PersistenceError;
    use crate::idle::save::MemoryStore;

    /// Store handle the test keeps after moving a clone into a session.
    #[derive(Clone, Default)]
    struct SharedStore(Rc<RefCell<MemoryStore>>);

    impl SaveStore for SharedStore {
        fn get(&self, key: &str) -> Result<Option<String>, PersistenceError> {
            self.0.borrow().get(key)
        }

        fn set(&mut self, key: &str, value: &str) -> Result<(), PersistenceError> {
            self.0.borrow_mut().set(key, value)
        }
    }

    impl SharedStore {
        fn raw(&self) -> Option<String> {
            self.0
                .borrow()
                .get(&GameConfig::default().storage_key)
                .unwrap()
        }

        fn put(&self, json: &str) {
            self.0
                .borrow_mut()
                .set(&GameConfig::default().storage_key, json)
                .unwrap();
        }
    }

    struct ReadOnlyStore;

    impl SaveStore for ReadOnlyStore {
        fn get(&self, _key: &str) -> Result<Option<String>, PersistenceError> {
            Ok(None)
        }

        fn set(&mut self, _key: &str, _value: &str) -> Result<(), PersistenceError> {
            Err(PersistenceError::Write("read-only".into()))
        }
    }

    fn session_with(store: &SharedStore) -> GameSession {
        GameSession::new(
            GameConfig::default(),
            Box::new(store.clone()),
            SmallRng::seed_from_u64(42),
        )
    }

    fn started(store: &SharedStore) -> GameSession {
        let mut session = session_with(store);
        session.init();
        session
    }

    #[test]
    fn ten_clicks_buy_multiplier_then_fail() {
        let store = SharedStore::default();
        let mut session = started(&store);
        for _ in 0..10 {
            session.click();
        }
        assert!((session.progression().score - 10.0).abs() < f64::EPSILON);

        session.buy_multiplier().unwrap();
        let state = session.progression().clone();
        assert!((state.score - 0.0).abs() < f64::EPSILON);
        assert_eq!(state.multiplier, 2);
        assert!((state.multiplier_cost - 15.0).abs() < f64::EPSILON);

        assert!(matches!(
            session.buy_multiplier(),
            Err(ActionError::InsufficientFunds { .. })
        ));
        assert_eq!(session.progression(), &state);
        let last = session.messages().last().unwrap();
        assert!(last.is_important);
        assert!(last.text.starts_with("Not enough score"));
    }

    #[test]
    fn scout_mission_pays_out_after_five_ticks() {
        let store = SharedStore::default();
        let mut session = started(&store);
        session
            .start_mission(
                "scout",
                5.0,
                MissionRewards {
                    gems: Some(3),
                    ..MissionRewards::default()
                },
                None,
            )
            .unwrap();

        session.tick_n(4);
        assert_eq!(session.active_missions().len(), 1);
        assert_eq!(session.progression().gems, 0);

        session.tick();
        assert!(session.active_missions().is_empty());
        assert_eq!(session.progression().gems, 3);
        assert!(session
            .messages()
            .entries()
            .iter()
            .any(|e| e.text == "Mission complete: scout"));
    }

    #[test]
    fn tick_accrues_passive_income() {
        let store = SharedStore::default();
        let mut session = started(&store);
        session.tick_n(10);
        // Base multiplier alone gives 0.1/s.
        assert!((session.progression().score - 1.0).abs() < 1e-9);
    }

    #[test]
    fn achievements_unlock_on_actions_and_are_logged_once() {
        let store = SharedStore::default();
        let mut session = started(&store);
        session.click();
        session.click();
        assert!(session.achievements().get("first_click").unwrap().unlocked);
        let notices = session
            .messages()
            .entries()
            .iter()
            .filter(|e| e.text == "Achievement unlocked: First Click")
            .count();
        assert_eq!(notices, 1);
    }

    #[test]
    fn achievement_unlocks_from_passive_income_alone() {
        let store = SharedStore::default();
        let mut session = started(&store);
        session.tick_n(9);
        assert!(!session.achievements().get("first_click").unwrap().unlocked);
        session.tick_n(2);
        assert!(session.achievements().get("first_click").unwrap().unlocked);
    }

    #[test]
    fn purchases_save_immediately_clicks_wait_for_autosave() {
        let store = SharedStore::default();
        let mut session = started(&store);
        session.click();
        assert!(store.raw().is_none());
        assert!(session.is_dirty());

        assert!(session.autosave());
        assert!(store.raw().is_some());
        assert!(!session.is_dirty());
        assert!(!session.autosave());

        for _ in 0..9 {
            session.click();
        }
        session.buy_multiplier().unwrap();
        assert!(!session.is_dirty());
        assert!(store.raw().unwrap().contains("\"multiplier\":2"));
    }

    #[test]
    fn find_gems_saves_and_stays_in_range() {
        let store = SharedStore::default();
        let mut session = started(&store);
        let found = session.find_gems();
        assert!((1..=5).contains(&found));
        assert_eq!(session.progression().gems, found);
        assert!(!session.is_dirty());
    }

    #[test]
    fn save_load_roundtrip_restores_missions_with_remaining_time() {
        let store = SharedStore::default();
        {
            let mut session = started(&store);
            for _ in 0..150 {
                session.click();
            }
            session.buy_multiplier().unwrap();
            session.add_inventory_item("Lantern");
            session.start_catalog_mission(1).unwrap();
            session.tick_n(12);
            session.shutdown();
        }

        let mut restored = started(&store);
        let state = restored.progression();
        assert_eq!(state.multiplier, 2);
        assert_eq!(state.inventory, vec!["Lantern"]);
        assert!(restored.achievements().get("score_100").unwrap().unlocked);
        assert!(restored.achievements().get("first_multiplier").unwrap().unlocked);

        let missions = restored.active_missions();
        assert_eq!(missions.len(), 1);
        assert_eq!(missions[0].name, "Raid the old mine");
        assert!((missions[0].time_remaining - 18.0).abs() < 1e-9);

        let gems_before = restored.progression().gems;
        restored.tick_n(17);
        assert_eq!(restored.progression().gems, gems_before);
        restored.tick();
        assert_eq!(restored.progression().gems, gems_before + 5);
    }

    #[test]
    fn shutdown_flushes_clicks_made_since_the_last_autosave() {
        let store = SharedStore::default();
        {
            let mut session = started(&store);
            for _ in 0..25 {
                session.click();
            }
            session.frame(0.0);
            for second in 1..=29 {
                session.frame(second as f64 * 1_000.0);
            }
            assert!(store.raw().is_none());
            session.shutdown();
            assert!(!session.is_dirty());
        }

        let restored = started(&store);
        assert!((restored.progression().score - 27.9).abs() < 1e-9);
    }

    #[test]
    fn shutdown_on_a_clean_session_writes_nothing() {
        let store = SharedStore::default();
        let mut session = started(&store);
        session.shutdown();
        assert!(store.raw().is_none());
    }

    #[test]
    fn missions_that_unlock_expedition_achievements() {
        let store = SharedStore::default();
        let mut session = started(&store);
        session
            .start_mission(
                "haul",
                1.0,
                MissionRewards {
                    gems: Some(10),
                    items: vec!["Old map".into()],
                    ..MissionRewards::default()
                },
                None,
            )
            .unwrap();
        session.tick();
        assert!(session.achievements().get("gem_collector").unwrap().unlocked);
        assert!(session.achievements().get("treasure_hunter").unwrap().unlocked);
    }

    #[test]
    fn init_twice_loads_once_and_schedules_once() {
        let store = SharedStore::default();
        {
            let mut session = started(&store);
            session.start_catalog_mission(0).unwrap();
        }

        let mut session = started(&store);
        session.click();
        session.init();
        assert!((session.progression().score - 1.0).abs() < f64::EPSILON);
        assert_eq!(session.active_missions().len(), 1);
        assert_eq!(session.pending_events().len(), 1);
    }

    #[test]
    fn expired_mission_in_save_completes_on_load() {
        let store = SharedStore::default();
        store.put(
            r#"{"version":1,"score":0,"activeMissions":[
                {"id":"mission_4","name":"Scout the ridge","duration":5,"timeRemaining":0,
                 "rewards":{"gems":3}}
            ]}"#,
        );
        let mut session = started(&store);
        assert_eq!(session.progression().gems, 3);
        assert!(session.active_missions().is_empty());
        assert!(session.is_dirty());

        // New missions never reuse a loaded id.
        let id = session.start_catalog_mission(0).unwrap();
        assert_eq!(id, MissionId::new(5));
    }

    #[test]
    fn unversioned_save_is_rewritten_by_the_next_autosave() {
        let store = SharedStore::default();
        store.put(r#"{"score":42,"multiplier":3}"#);
        let mut session = started(&store);
        assert_eq!(session.progression().multiplier, 3);
        assert!(session.is_dirty());
        assert!(session.autosave());
        assert!(store.raw().unwrap().contains("\"version\":1"));
    }

    #[test]
    fn malformed_save_starts_fresh() {
        let store = SharedStore::default();
        store.put("this is not json");
        let session = started(&store);
        assert_eq!(session.progression(), &ProgressionState::new());
    }

    #[test]
    fn frames_drive_ticks_and_autosave() {
        let store = SharedStore::default();
        let mut session = started(&store);
        session.frame(0.0);
        for second in 1..=30 {
            session.frame(second as f64 * 1_000.0);
        }
        assert!((session.progression().score - 3.0).abs() < 1e-9);
        assert!(store.raw().is_some());
        assert!(!session.is_dirty());
    }

    #[test]
    fn stopped_clock_ignores_frames() {
        let store = SharedStore::default();
        let mut session = started(&store);
        session.shutdown();
        session.frame(0.0);
        session.frame(1_000.0);
        assert!((session.progression().score - 0.0).abs() < f64::EPSILON);
    }

    #[test]
    fn failed_writes_keep_session_running() {
        let mut session = GameSession::new(
            GameConfig::default(),
            Box::new(ReadOnlyStore),
            SmallRng::seed_from_u64(1),
        );
        session.init();
        session.find_gems();
        assert!(session.is_dirty());
        assert!(!session.save());
        session.click();
        assert!(session.progression().gems >= 1);
    }

    #[test]
    fn catalog_index_out_of_range() {
        let store = SharedStore::default();
        let mut session = started(&store);
        assert!(session.start_catalog_mission(99).is_none());
    }

    #[test]
    fn invalid_mission_duration_is_rejected() {
        let store = SharedStore::default();
        let mut session = started(&store);
        assert_eq!(
            session.start_mission("bad", -1.0, MissionRewards::default(), None),
            Err(ScheduleError::InvalidDuration(-1.0))
        );
        assert!(session.pending_events().is_empty());
    }

    #[test]
    fn mission_hook_can_add_items() {
        let store = SharedStore::default();
        let mut session = started(&store);
        session
            .start_mission(
                "dig",
                2.0,
                MissionRewards::default(),
                Some(Box::new(|_: &MissionSnapshot, state: &mut ProgressionState| {
                    logic::add_inventory_item(state, "Fossil");
                })),
            )
            .unwrap();
        session.tick_n(2);
        assert_eq!(session.progression().inventory, vec!["Fossil"]);
    }
}
