use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::Line,
    widgets::{Block, Borders, Clear, List, ListItem, Paragraph, Wrap},
    Frame,
};
use std::time::Duration;

use crate::app::App;
use crate::modules::celebration::is_celebration;
use crate::modules::dom::{Document, ElementId};
use crate::modules::notifications::{is_close_control, is_notification, is_permanent, Kind, NotificationManager, Phase};

const TOAST_WIDTH: u16 = 44;
const TOAST_HEIGHT: u16 = 3;
const CELEBRATION_WIDTH: u16 = 56;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placement {
    Page,
    Toast,
    Celebration,
}

/// Screen area owned by one notification.
#[derive(Debug, Clone, Copy)]
pub struct Region {
    pub id: ElementId,
    pub rect: Rect,
    pub close: Option<(ElementId, Rect)>,
    pub placement: Placement,
}

/// Result of a pointer hit: the notification and the element under the
/// pointer (the notification itself or its close control).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Hit {
    pub owner: ElementId,
    pub target: ElementId,
}

struct Areas {
    title: Rect,
    page: Rect,
    history: Rect,
    status: Rect,
}

fn split(area: Rect) -> Areas {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(3), Constraint::Min(0), Constraint::Length(4)])
        .split(area);
    let main = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(65), Constraint::Percentage(35)])
        .split(chunks[1]);
    Areas { title: chunks[0], page: main[0], history: main[1], status: chunks[2] }
}

fn placement(doc: &Document, id: ElementId) -> Placement {
    match doc.get(id) {
        Some(el) if is_celebration(el) => Placement::Celebration,
        Some(el) if el.style("position") == Some("fixed") => Placement::Toast,
        _ => Placement::Page,
    }
}

fn collapsed(doc: &Document, id: ElementId) -> bool {
    doc.get(id).and_then(|e| e.style("max-height")) == Some("0")
}

/// Lays out every top-level notification. Later regions are drawn on top.
pub fn layout(manager: &NotificationManager, area: Rect) -> Vec<Region> {
    let doc = manager.document();
    let page = split(area).page;
    let inner = Rect { x: page.x + 1, y: page.y + 1, width: page.width.saturating_sub(2), height: page.height.saturating_sub(2) };

    let top_level: Vec<ElementId> = doc
        .query_all(is_notification)
        .into_iter()
        .filter(|id| !doc.ancestors(*id).any(|a| doc.get(a).is_some_and(is_notification)))
        .collect();

    let mut regions = Vec::new();
    let mut flow_y = inner.y;
    let mut toast_y = area.y + 1;
    for id in top_level.iter().copied() {
        let kind = placement(doc, id);
        let height = if collapsed(doc, id) { 1 } else { TOAST_HEIGHT };
        let rect = match kind {
            Placement::Page => {
                if flow_y + height > inner.bottom() {
                    continue;
                }
                let r = Rect { x: inner.x, y: flow_y, width: inner.width, height };
                flow_y += height;
                r
            }
            Placement::Toast => {
                let width = TOAST_WIDTH.min(area.width);
                if toast_y + height > area.bottom() {
                    continue;
                }
                let r = Rect { x: area.right().saturating_sub(width + 1), y: toast_y, width, height };
                toast_y += height;
                r
            }
            Placement::Celebration => {
                let width = CELEBRATION_WIDTH.min(area.width);
                Rect { x: area.x + (area.width - width) / 2, y: area.y, width, height: height.min(area.height) }
            }
        };
        let close = doc
            .descendants(id)
            .into_iter()
            .find(|d| doc.get(*d).is_some_and(is_close_control))
            .filter(|_| rect.height > 1 && rect.width > 6)
            .map(|c| (c, Rect { x: rect.right() - 4, y: rect.y, width: 3, height: 1 }));
        regions.push(Region { id, rect, close, placement: kind });
    }
    regions.sort_by_key(|r| match r.placement {
        Placement::Page => 0,
        Placement::Toast => 1,
        Placement::Celebration => 2,
    });
    regions
}

fn within(r: Rect, column: u16, row: u16) -> bool {
    column >= r.x && column < r.right() && row >= r.y && row < r.bottom()
}

/// Topmost notification under the pointer, using the last drawn viewport.
pub fn hit_test(app: &App, column: u16, row: u16) -> Option<Hit> {
    layout(&app.manager, app.viewport).into_iter().rev().find_map(|region| {
        if let Some((close, rect)) = region.close {
            if within(rect, column, row) {
                return Some(Hit { owner: region.id, target: close });
            }
        }
        within(region.rect, column, row).then_some(Hit { owner: region.id, target: region.id })
    })
}

pub fn draw(f: &mut Frame, app: &App) {
    let areas = split(f.area());
    draw_title(f, app, areas.title);
    draw_page(f, areas.page);
    draw_history(f, app, areas.history);
    draw_status(f, app, areas.status);

    for region in layout(&app.manager, f.area()) {
        draw_notification(f, app, &region);
    }

    if app.show_help {
        draw_help_popup(f);
    }
}

fn draw_title(f: &mut Frame, app: &App, area: Rect) {
    let time_str = chrono::Local::now().format("%H:%M:%S").to_string();
    let header = format!(
        "herald | {} | active: {} | timers: {} | auto-dismiss: {:.1}s",
        time_str,
        app.manager.active_count(),
        app.manager.pending_timers(),
        app.config.dismiss_after.as_secs_f32()
    );
    let title = Paragraph::new(header)
        .style(Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD))
        .block(Block::default().borders(Borders::ALL));
    f.render_widget(title, area);
}

fn draw_page(f: &mut Frame, area: Rect) {
    let page = Block::default().title("Dashboard").borders(Borders::ALL);
    f.render_widget(page, area);
}

fn kind_color(kind: Kind) -> Color {
    match kind {
        Kind::Success => Color::Green,
        Kind::Error => Color::Red,
        Kind::Warning => Color::Yellow,
        Kind::Info => Color::Cyan,
        Kind::Primary => Color::Blue,
    }
}

/// Visible message text: everything except icon glyph elements.
fn message_text(doc: &Document, id: ElementId) -> String {
    doc.descendants(id)
        .into_iter()
        .filter_map(|d| doc.get(d))
        .filter(|e| e.tag != "i")
        .map(|e| e.text.trim())
        .filter(|t| !t.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

fn remaining(app: &App, id: ElementId) -> Option<Duration> {
    app.manager.deadline(id).map(|d| d.saturating_sub(app.manager.now()))
}

fn draw_notification(f: &mut Frame, app: &App, region: &Region) {
    let doc = app.manager.document();
    let Some(el) = doc.get(region.id) else { return };
    let kind = Kind::of(el).unwrap_or(Kind::Info);
    let color = if region.placement == Placement::Celebration { Color::Magenta } else { kind_color(kind) };
    let fading = app.manager.phase(region.id) == Some(Phase::FadingOut);

    let mut border = Style::default().fg(color);
    if app.manager.is_paused(region.id) {
        border = border.add_modifier(Modifier::BOLD);
    }
    if fading {
        border = Style::default().fg(Color::DarkGray).add_modifier(Modifier::DIM);
    }

    let icon = if region.placement == Placement::Celebration { crate::modules::celebration::TROPHY } else { kind.icon() };
    let badge = if is_permanent(el) {
        " 📌".to_string()
    } else if app.manager.is_paused(region.id) {
        " ⏸".to_string()
    } else {
        remaining(app, region.id).map(|r| format!(" {:.1}s", r.as_secs_f32())).unwrap_or_default()
    };

    let mut block = Block::default()
        .borders(Borders::ALL)
        .border_style(border)
        .title(format!(" {} {}{} ", icon, kind.label(), badge));
    if region.close.is_some() {
        block = block.title(Line::from(" ✕ ").alignment(Alignment::Right));
    }

    f.render_widget(Clear, region.rect);
    if region.rect.height <= 1 {
        f.render_widget(Paragraph::new(message_text(doc, region.id)).style(border), region.rect);
        return;
    }
    let text_style = if fading { border } else { Style::default() };
    let body = Paragraph::new(message_text(doc, region.id))
        .style(text_style)
        .block(block)
        .wrap(Wrap { trim: true });
    f.render_widget(body, region.rect);
}

fn draw_history(f: &mut Frame, app: &App, area: Rect) {
    let items: Vec<ListItem> = app
        .history
        .entries
        .iter()
        .map(|n| {
            ListItem::new(format!("{} [{}] {}", n.kind.icon(), n.timestamp.format("%H:%M:%S"), n.message))
                .style(Style::default().fg(kind_color(n.kind)))
        })
        .collect();

    if items.is_empty() {
        let empty = Paragraph::new("Nothing dismissed yet")
            .block(Block::default().title("Dismissed").borders(Borders::ALL));
        f.render_widget(empty, area);
    } else {
        let list = List::new(items).block(Block::default().title("Dismissed").borders(Borders::ALL));
        f.render_widget(list, area);
    }
}

fn draw_status(f: &mut Frame, app: &App, area: Rect) {
    let help_text = "q: Quit | 1-5: Notify | n: Background | a/p: Celebrate | x: Extend | +/-: Interval | Esc: Dismiss all | ?: Help";
    let status = Paragraph::new(vec![Line::from(app.status_message.as_str()), Line::from(help_text)])
        .block(Block::default().borders(Borders::ALL));
    f.render_widget(status, area);
}

fn centered_rect(percent_x: u16, percent_y: u16, r: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(r);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(popup_layout[1])[1]
}

fn draw_help_popup(f: &mut Frame) {
    let area = centered_rect(60, 60, f.area());
    let help = "herald Help\n\nKeys:\n  1-5: success / error / warning / info / primary notification\n  n: Insert a background job notice (picked up automatically)\n  a: Celebrate analysis completion\n  p: Celebrate next podium entry\n  x: Extend newest notification\n  +/-: Longer/shorter auto-dismiss (saved to config)\n  Esc: Dismiss all notifications\n  ?: Toggle this help\n  q: Quit\n\nMouse:\n  Hover pauses a notification, leaving restarts its countdown\n  Click dismisses it, ✕ closes it at once\n  Click elsewhere dismisses non-flash notifications";

    let paragraph = Paragraph::new(help)
        .block(
            Block::default()
                .title("Help")
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::Cyan)),
        )
        .wrap(Wrap { trim: false });

    f.render_widget(Clear, area);
    f.render_widget(paragraph, area);
}
