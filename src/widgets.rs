//! Clickable line lists for bordered panels.
//!
//! A panel builds its lines through [`ClickableList`], marking the ones that
//! act as buttons. After layout, the list registers one click target per
//! visual row of each button line, so targets always follow the text.

use ratzilla::ratatui::layout::Rect;
use ratzilla::ratatui::text::Line;
use ratzilla::ratatui::widgets::Block;

use crate::input::ClickState;

/// Lines paired with the action IDs of the clickable ones.
///
/// ```ignore
/// let mut cl = ClickableList::new();
/// cl.push(Line::from("Score: 120"));
/// cl.push_clickable(Line::from(" [M] Buy multiplier"), BUY_MULTIPLIER);
/// cl.register_targets_with_block(area, &block, &mut cs, 0, false);
/// f.render_widget(Paragraph::new(cl.into_lines()).block(block), area);
/// ```
pub struct ClickableList<'a> {
    lines: Vec<Line<'a>>,
    /// `(line index, action id)`.
    actions: Vec<(usize, u16)>,
}

impl<'a> ClickableList<'a> {
    pub fn new() -> Self {
        Self {
            lines: Vec::new(),
            actions: Vec::new(),
        }
    }

    pub fn push(&mut self, line: Line<'a>) {
        self.lines.push(line);
    }

    /// Add a line that triggers `action_id` when clicked.
    pub fn push_clickable(&mut self, line: Line<'a>, action_id: u16) {
        self.actions.push((self.lines.len(), action_id));
        self.lines.push(line);
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn into_lines(self) -> Vec<Line<'a>> {
        self.lines
    }

    /// Register targets for content drawn inside `area`.
    ///
    /// `top_offset`/`bottom_offset` are the rows taken by borders, `scroll`
    /// is the vertical scroll in visual rows. With `wrap_width == 0` every
    /// line is one row; otherwise lines wider than `wrap_width` span several
    /// rows and every one of them is clickable.
    pub fn register_targets(
        &self,
        area: Rect,
        cs: &mut ClickState,
        top_offset: u16,
        bottom_offset: u16,
        scroll: u16,
        wrap_width: u16,
    ) {
        let content_top = area.y + top_offset;
        let content_end = (area.y + area.height).saturating_sub(bottom_offset);

        // Visual row where each line starts, plus one trailing entry.
        let mut starts = Vec::with_capacity(self.lines.len() + 1);
        let mut row: u16 = 0;
        for line in &self.lines {
            starts.push(row);
            row = row.saturating_add(visual_height(line, wrap_width));
        }
        starts.push(row);

        for &(idx, action_id) in &self.actions {
            for visual in starts[idx]..starts[idx + 1] {
                if visual < scroll {
                    continue;
                }
                let screen_row = content_top + (visual - scroll);
                if screen_row >= content_end {
                    break;
                }
                cs.add_row_target(area, screen_row, action_id);
            }
        }
    }

    /// [`register_targets`](Self::register_targets) with border offsets
    /// taken from the block the list is rendered in.
    pub fn register_targets_with_block(
        &self,
        area: Rect,
        block: &Block,
        cs: &mut ClickState,
        scroll: u16,
        wrap: bool,
    ) {
        let inner = block.inner(area);
        let top = inner.y - area.y;
        let bottom = (area.y + area.height).saturating_sub(inner.y + inner.height);
        let wrap_width = if wrap { inner.width } else { 0 };
        self.register_targets(area, cs, top, bottom, scroll, wrap_width);
    }
}

impl Default for ClickableList<'_> {
    fn default() -> Self {
        Self::new()
    }
}

fn visual_height(line: &Line, wrap_width: u16) -> u16 {
    let width = line.width();
    if wrap_width == 0 || width <= wrap_width as usize {
        1
    } else {
        width.div_ceil(wrap_width as usize) as u16
    }
}
