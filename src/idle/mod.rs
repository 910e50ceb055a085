//! Idle Clicker: an incremental game with upgrades, gems, timed missions
//! and achievements.

pub mod achievements;
pub mod actions;
pub mod config;
pub mod error;
pub mod logic;
pub mod missions;
pub mod render;
pub mod save;
pub mod scheduler;
pub mod session;
pub mod state;

use std::cell::RefCell;
use std::rc::Rc;

use ratzilla::ratatui::layout::Rect;
use ratzilla::ratatui::Frame;

use crate::input::{ClickState, InputEvent};

use actions::*;
use missions::MISSION_CATALOG;
use session::GameSession;

pub struct IdleGame {
    pub session: GameSession,
}

impl IdleGame {
    /// Wrap a session and start it (load + timers).
    pub fn new(mut session: GameSession) -> Self {
        session.init();
        Self { session }
    }

    /// Handle an input event. Returns true if the event was consumed.
    pub fn handle_input(&mut self, event: &InputEvent) -> bool {
        match event {
            InputEvent::Key(c) => match key_action(*c) {
                Some(action) => self.dispatch(action),
                None => false,
            },
            InputEvent::Click(action) => self.dispatch(*action),
        }
    }

    fn dispatch(&mut self, action: u16) -> bool {
        match action {
            CLICK => {
                self.session.click();
            }
            // Failures are reported through the message log.
            BUY_MULTIPLIER => {
                let _ = self.session.buy_multiplier();
            }
            BUY_PASSIVE => {
                let _ = self.session.buy_passive_upgrade();
            }
            FIND_GEMS => {
                self.session.find_gems();
            }
            SAVE_NOW => {
                self.session.save();
            }
            id if id >= START_MISSION_BASE => {
                let index = (id - START_MISSION_BASE) as usize;
                if index >= MISSION_CATALOG.len() {
                    return false;
                }
                self.session.start_catalog_mission(index);
            }
            _ => return false,
        }
        true
    }

    /// The page is being hidden or unloaded: stop the timers and flush.
    pub fn suspend(&mut self) {
        self.session.shutdown();
    }

    /// The page came back from the back/forward cache.
    pub fn resume(&mut self) {
        self.session.init();
    }

    /// Advance the clock to a frame timestamp (ms).
    pub fn frame(&mut self, now_ms: f64) {
        self.session.frame(now_ms);
    }

    pub fn render(&self, f: &mut Frame, area: Rect, click_state: &Rc<RefCell<ClickState>>) {
        render::render(&self.session, f, area, click_state);
    }
}

fn key_action(key: char) -> Option<u16> {
    match key.to_ascii_lowercase() {
        'c' | ' ' => Some(CLICK),
        'm' => Some(BUY_MULTIPLIER),
        'p' => Some(BUY_PASSIVE),
        'g' => Some(FIND_GEMS),
        's' => Some(SAVE_NOW),
        d @ '1'..='9' => d.to_digit(10).map(|n| START_MISSION_BASE + n as u16 - 1),
        _ => None,
    }
}
