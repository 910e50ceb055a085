//! Action IDs for click targets, registered during render and dispatched via
//! `InputEvent::Click`.

pub const CLICK: u16 = 0;
pub const BUY_MULTIPLIER: u16 = 1;
pub const BUY_PASSIVE: u16 = 2;
pub const FIND_GEMS: u16 = 3;
pub const SAVE_NOW: u16 = 4;

// ── Mission catalog (base + catalog index) ──────────────
pub const START_MISSION_BASE: u16 = 100;
