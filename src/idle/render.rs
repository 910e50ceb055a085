//! Idle Clicker rendering. Read-only over the session.

use std::cell::RefCell;
use std::rc::Rc;

use ratzilla::ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratzilla::ratatui::style::{Color, Modifier, Style};
use ratzilla::ratatui::text::{Line, Span};
use ratzilla::ratatui::widgets::{Block, Borders, Gauge, Paragraph, Wrap};
use ratzilla::ratatui::Frame;

use crate::input::{is_narrow_layout, ClickState};
use crate::widgets::ClickableList;

use super::actions::*;
use super::logic::format_number;
use super::missions::{MissionSnapshot, MISSION_CATALOG};
use super::session::GameSession;
use super::state::ProgressionState;

pub fn render(
    session: &GameSession,
    f: &mut Frame,
    area: Rect,
    click_state: &Rc<RefCell<ClickState>>,
) {
    let narrow = is_narrow_layout(area.width);
    let borders = if narrow {
        Borders::TOP | Borders::BOTTOM
    } else {
        Borders::ALL
    };

    // Log panel on the right when wide enough.
    let (main_area, log_area) = if area.width >= 90 {
        let cols = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(60), Constraint::Percentage(40)])
            .split(area);
        (cols[0], Some(cols[1]))
    } else {
        (area, None)
    };

    let missions = session.active_missions();
    let mission_rows = (missions.len() as u16).max(1) + MISSION_CATALOG.len() as u16 + 3;

    let mut constraints = vec![
        Constraint::Length(6),
        Constraint::Length(7),
        Constraint::Length(mission_rows),
        Constraint::Min(4),
    ];
    if log_area.is_none() {
        constraints.push(Constraint::Length(6));
    }
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints(constraints)
        .split(main_area);

    render_stats(session.progression(), f, chunks[0], borders);
    render_actions(session.progression(), session.is_dirty(), f, chunks[1], borders, click_state);
    let queued = session.pending_events().len();
    render_missions(&missions, queued, f, chunks[2], borders, click_state);
    render_achievements(session, f, chunks[3], borders);
    match log_area {
        Some(log_area) => render_log(session, f, log_area, Borders::ALL),
        None => render_log(session, f, chunks[4], borders),
    }
}

fn panel(title: &str, borders: Borders, color: Color) -> Block<'static> {
    Block::default()
        .borders(borders)
        .border_style(Style::default().fg(color))
        .title(format!(" {title} "))
}

fn render_stats(state: &ProgressionState, f: &mut Frame, area: Rect, borders: Borders) {
    let label = Style::default().fg(Color::DarkGray);
    let lines = vec![
        Line::from(vec![
            Span::styled(" Score ", label),
            Span::styled(
                format_number(state.score),
                Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
            ),
            Span::styled(format!("  (+{:.1}/s)", state.passive_income_rate), label),
        ]),
        Line::from(vec![
            Span::styled(" Click ", label),
            Span::styled(format!("x{}", state.multiplier), Style::default().fg(Color::White)),
            Span::styled("  Passive lv ", label),
            Span::styled(state.passive_level.to_string(), Style::default().fg(Color::White)),
        ]),
        Line::from(vec![
            Span::styled(" Gems ", label),
            Span::styled(state.gems.to_string(), Style::default().fg(Color::Magenta)),
        ]),
        Line::from(vec![
            Span::styled(" Items ", label),
            Span::styled(inventory_summary(&state.inventory), Style::default().fg(Color::Cyan)),
        ]),
    ];
    let widget = Paragraph::new(lines)
        .block(panel("Idle Clicker", borders, Color::Yellow))
        .wrap(Wrap { trim: true });
    f.render_widget(widget, area);
}

fn inventory_summary(items: &[String]) -> String {
    match items {
        [] => "none".into(),
        [.., last] if items.len() > 3 => format!("{} items, latest {last}", items.len()),
        _ => items.join(", "),
    }
}

fn render_actions(
    state: &ProgressionState,
    unsaved: bool,
    f: &mut Frame,
    area: Rect,
    borders: Borders,
    click_state: &Rc<RefCell<ClickState>>,
) {
    let mut cl = ClickableList::new();
    cl.push_clickable(
        button_line("C", "Click!", format!("+{}", state.multiplier), true),
        CLICK,
    );
    cl.push_clickable(
        button_line(
            "M",
            "Buy multiplier",
            format!("cost {}", format_number(state.multiplier_cost)),
            state.can_afford(state.multiplier_cost),
        ),
        BUY_MULTIPLIER,
    );
    cl.push_clickable(
        button_line(
            "P",
            "Buy passive income",
            format!("cost {}", format_number(state.passive_upgrade_cost)),
            state.can_afford(state.passive_upgrade_cost),
        ),
        BUY_PASSIVE,
    );
    cl.push_clickable(button_line("G", "Find gems", "free".into(), true), FIND_GEMS);
    let save_detail = if unsaved { "unsaved changes" } else { "saved" };
    cl.push_clickable(button_line("S", "Save now", save_detail.into(), true), SAVE_NOW);

    let block = panel("Actions", borders, Color::Green);
    let mut cs = click_state.borrow_mut();
    cl.register_targets_with_block(area, &block, &mut cs, 0, false);
    drop(cs);
    f.render_widget(Paragraph::new(cl.into_lines()).block(block), area);
}

fn button_line(key: &str, label: &str, detail: String, enabled: bool) -> Line<'static> {
    let (key_color, text_color) = if enabled {
        (Color::Cyan, Color::White)
    } else {
        (Color::DarkGray, Color::DarkGray)
    };
    Line::from(vec![
        Span::styled(
            format!(" [{key}] "),
            Style::default().fg(key_color).add_modifier(Modifier::BOLD),
        ),
        Span::styled(label.to_string(), Style::default().fg(text_color)),
        Span::styled(format!("  {detail}"), Style::default().fg(Color::DarkGray)),
    ])
}

fn render_missions(
    missions: &[MissionSnapshot],
    queued: usize,
    f: &mut Frame,
    area: Rect,
    borders: Borders,
    click_state: &Rc<RefCell<ClickState>>,
) {
    let mut cl = ClickableList::new();
    for (i, template) in MISSION_CATALOG.iter().enumerate() {
        cl.push_clickable(
            button_line(
                &(i + 1).to_string(),
                template.name,
                format!("{}s, {}", template.duration, template.rewards().describe()),
                true,
            ),
            START_MISSION_BASE + i as u16,
        );
    }
    cl.push(Line::from(""));
    if missions.is_empty() {
        cl.push(Line::from(Span::styled(
            " No missions under way",
            Style::default().fg(Color::DarkGray),
        )));
    }
    for mission in missions {
        cl.push(Line::from(vec![
            Span::styled(" ▸ ", Style::default().fg(Color::Blue)),
            Span::styled(mission.name.clone(), Style::default().fg(Color::White)),
            Span::styled(
                format!("  {:.0}s left", mission.time_remaining.ceil()),
                Style::default().fg(Color::Yellow),
            ),
        ]));
    }

    let title = if queued > 0 {
        format!("Missions ({queued} under way)")
    } else {
        "Missions".to_string()
    };
    let block = panel(&title, borders, Color::Blue);
    let mut cs = click_state.borrow_mut();
    cl.register_targets_with_block(area, &block, &mut cs, 0, false);
    drop(cs);
    f.render_widget(Paragraph::new(cl.into_lines()).block(block), area);
}

fn render_achievements(session: &GameSession, f: &mut Frame, area: Rect, borders: Borders) {
    let achievements = session.achievements();
    let total = achievements.all().len();
    let unlocked = achievements.unlocked_count();

    let block = panel("Achievements", borders, Color::Magenta);
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(1), Constraint::Min(1)])
        .split(block.inner(area));
    f.render_widget(block, area);

    let ratio = if total > 0 {
        unlocked as f64 / total as f64
    } else {
        0.0
    };
    f.render_widget(
        Gauge::default()
            .gauge_style(Style::default().fg(Color::Magenta))
            .ratio(ratio)
            .label(format!("{unlocked}/{total}")),
        chunks[0],
    );

    let lines: Vec<Line> = achievements
        .all()
        .iter()
        .map(|a| {
            if a.unlocked {
                Line::from(vec![
                    Span::styled(" ★ ", Style::default().fg(Color::Yellow)),
                    Span::styled(
                        a.name.as_str(),
                        Style::default().fg(Color::White).add_modifier(Modifier::BOLD),
                    ),
                ])
            } else {
                Line::from(vec![
                    Span::styled(" ☆ ", Style::default().fg(Color::DarkGray)),
                    Span::styled(a.description.as_str(), Style::default().fg(Color::DarkGray)),
                ])
            }
        })
        .collect();
    f.render_widget(Paragraph::new(lines).wrap(Wrap { trim: false }), chunks[1]);
}

fn render_log(session: &GameSession, f: &mut Frame, area: Rect, borders: Borders) {
    let visible = area.height.saturating_sub(2) as usize;
    // Newest first.
    let lines: Vec<Line> = session
        .messages()
        .entries()
        .iter()
        .rev()
        .take(visible)
        .enumerate()
        .map(|(i, entry)| {
            let style = match (entry.is_important, i < 3) {
                (true, true) => Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
                (true, false) => Style::default().fg(Color::Yellow),
                (false, true) => Style::default().fg(Color::White),
                (false, false) => Style::default().fg(Color::DarkGray),
            };
            Line::from(Span::styled(format!(" {}", entry.text), style))
        })
        .collect();
    let widget = Paragraph::new(lines)
        .block(panel("Log", borders, Color::DarkGray))
        .wrap(Wrap { trim: false });
    f.render_widget(widget, area);
}
