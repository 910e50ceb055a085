//! Input plumbing: event type, click targets and pixel to cell conversion.

use ratzilla::ratatui::layout::Rect;

/// Keyboard and pointer input, normalized.
#[derive(Debug, Clone, PartialEq)]
pub enum InputEvent {
    Key(char),
    /// Click or tap on a registered target, by action ID.
    Click(u16),
}

/// Screen region (in terminal cells) bound to an action.
#[derive(Debug, Clone)]
pub struct ClickTarget {
    pub rect: Rect,
    pub action_id: u16,
}

/// Targets registered by the last render, shared with the mouse handler.
pub struct ClickState {
    pub targets: Vec<ClickTarget>,
    pub terminal_cols: u16,
    pub terminal_rows: u16,
}

impl ClickState {
    pub fn new() -> Self {
        Self {
            targets: Vec::new(),
            terminal_cols: 0,
            terminal_rows: 0,
        }
    }

    /// Start a new frame: remember the terminal size and drop old targets.
    pub fn begin_frame(&mut self, cols: u16, rows: u16) {
        self.terminal_cols = cols;
        self.terminal_rows = rows;
        self.targets.clear();
    }

    pub fn add_click_target(&mut self, rect: Rect, action_id: u16) {
        self.targets.push(ClickTarget { rect, action_id });
    }

    /// Full-width target on one row of `area`. Rows outside `area` are ignored.
    pub fn add_row_target(&mut self, area: Rect, row: u16, action_id: u16) {
        if row >= area.y && row < area.y + area.height {
            self.add_click_target(Rect::new(area.x, row, area.width, 1), action_id);
        }
    }

    /// Action under a cell. Later targets sit on top of earlier ones.
    pub fn hit_test(&self, col: u16, row: u16) -> Option<u16> {
        self.targets.iter().rev().find_map(|t| {
            let r = &t.rect;
            let inside = col >= r.x && col < r.x + r.width && row >= r.y && row < r.y + r.height;
            inside.then_some(t.action_id)
        })
    }

    /// Hit-test a click given in pixels relative to the grid's top-left
    /// corner, for a grid of `grid_width` x `grid_height` pixels.
    pub fn hit_test_pixels(
        &self,
        click_x: f64,
        click_y: f64,
        grid_width: f64,
        grid_height: f64,
    ) -> Option<u16> {
        let col = pixel_to_cell(click_x, grid_width, self.terminal_cols)?;
        let row = pixel_to_cell(click_y, grid_height, self.terminal_rows)?;
        self.hit_test(col, row)
    }
}

impl Default for ClickState {
    fn default() -> Self {
        Self::new()
    }
}

/// Screens narrower than this stack panels vertically.
pub fn is_narrow_layout(width: u16) -> bool {
    width < 60
}

/// Map a pixel offset along one axis to a cell index. `None` outside the
/// grid or when the grid has no size.
pub fn pixel_to_cell(offset: f64, extent: f64, cells: u16) -> Option<u16> {
    if extent <= 0.0 || cells == 0 || offset < 0.0 {
        return None;
    }
    let cell = (offset / (extent / cells as f64)) as u16;
    (cell < cells).then_some(cell)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hit_test_rows() {
        let mut cs = ClickState::new();
        cs.add_click_target(Rect::new(0, 10, 80, 1), 1);
        cs.add_click_target(Rect::new(0, 11, 80, 1), 2);

        assert_eq!(cs.hit_test(5, 10), Some(1));
        assert_eq!(cs.hit_test(5, 11), Some(2));
        assert_eq!(cs.hit_test(5, 9), None);
        assert_eq!(cs.hit_test(5, 12), None);
    }

    #[test]
    fn hit_test_columns() {
        let mut cs = ClickState::new();
        cs.add_click_target(Rect::new(0, 5, 10, 1), 1);
        cs.add_click_target(Rect::new(10, 5, 10, 1), 2);

        assert_eq!(cs.hit_test(9, 5), Some(1));
        assert_eq!(cs.hit_test(10, 5), Some(2));
        assert_eq!(cs.hit_test(20, 5), None);
    }

    #[test]
    fn later_target_wins_on_overlap() {
        let mut cs = ClickState::new();
        cs.add_click_target(Rect::new(0, 5, 80, 1), 1);
        cs.add_click_target(Rect::new(5, 5, 10, 1), 2);

        assert_eq!(cs.hit_test(7, 5), Some(2));
        assert_eq!(cs.hit_test(20, 5), Some(1));
    }

    #[test]
    fn row_target_must_be_inside_area() {
        let mut cs = ClickState::new();
        let area = Rect::new(5, 10, 30, 5);
        cs.add_row_target(area, 9, 1);
        cs.add_row_target(area, 15, 2);
        assert!(cs.targets.is_empty());

        cs.add_row_target(area, 12, 3);
        assert_eq!(cs.hit_test(5, 12), Some(3));
        assert_eq!(cs.hit_test(4, 12), None);
    }

    #[test]
    fn begin_frame_resets_targets() {
        let mut cs = ClickState::new();
        cs.add_click_target(Rect::new(0, 1, 80, 1), 1);
        cs.begin_frame(100, 40);
        assert!(cs.targets.is_empty());
        assert_eq!((cs.terminal_cols, cs.terminal_rows), (100, 40));
    }

    #[test]
    fn narrow_layout_threshold() {
        assert!(is_narrow_layout(59));
        assert!(!is_narrow_layout(60));
    }

    #[test]
    fn pixel_to_cell_bounds() {
        assert_eq!(pixel_to_cell(0.0, 450.0, 30), Some(0));
        assert_eq!(pixel_to_cell(14.9, 450.0, 30), Some(0));
        assert_eq!(pixel_to_cell(15.0, 450.0, 30), Some(1));
        assert_eq!(pixel_to_cell(449.0, 450.0, 30), Some(29));
        assert_eq!(pixel_to_cell(450.0, 450.0, 30), None);
        assert_eq!(pixel_to_cell(-1.0, 450.0, 30), None);
        assert_eq!(pixel_to_cell(10.0, 0.0, 30), None);
        assert_eq!(pixel_to_cell(10.0, 450.0, 0), None);
    }

    #[test]
    fn tap_in_cell_center_hits_that_row() {
        let mut cs = ClickState::new();
        cs.begin_frame(37, 50);
        cs.add_click_target(Rect::new(0, 9, 37, 1), 1);
        cs.add_click_target(Rect::new(0, 10, 37, 1), 2);

        let cell_h = 15.0;
        let grid_h = 50.0 * cell_h;
        let grid_w = 37.0 * 8.0;
        assert_eq!(cs.hit_test_pixels(4.0, 9.5 * cell_h, grid_w, grid_h), Some(1));
        assert_eq!(cs.hit_test_pixels(4.0, 10.5 * cell_h, grid_w, grid_h), Some(2));
        assert_eq!(cs.hit_test_pixels(4.0, 11.5 * cell_h, grid_w, grid_h), None);
    }
}
