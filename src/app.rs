use anyhow::Result;
use crossterm::event::{
    Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers, MouseButton, MouseEvent, MouseEventKind,
};
use ratatui::layout::Rect;
use std::time::{Duration, Instant};
use tracing::{info, warn};

use crate::config::Config;
use crate::modules::{
    celebration,
    dom::{Document, Element, ElementId},
    flash::FlashMessageHandler,
    history::DismissalHistory,
    notifications::{is_notification, Kind, LifecycleEvent, ManagerConfig, NotificationManager},
    toolkit::NativeAlerts,
};
use crate::ui;

const INTERVAL_STEP: Duration = Duration::from_millis(500);
const MIN_INTERVAL: Duration = Duration::from_millis(500);

pub struct App {
    pub config: Config,
    pub manager: NotificationManager,
    pub history: DismissalHistory,
    pub status_message: String,
    pub show_help: bool,
    /// Notification currently under the pointer.
    pub hovered: Option<ElementId>,
    /// Frame area of the last draw, used for mouse hit testing.
    pub viewport: Rect,
    started: Instant,
    podium_cursor: usize,
    background_jobs: usize,
}

impl App {
    pub fn new(config: Config) -> Result<Self> {
        let doc = render_page(&config);
        let mut manager = NotificationManager::new(config.manager_config(), doc);
        if config.native_dismiss {
            manager = manager.with_toolkit(Box::new(NativeAlerts::default()));
        }

        let flashes = FlashMessageHandler::process(&mut manager);
        manager.process_existing();
        manager.observe_insertions();
        info!(flashes, path = ?config.path(), "page initialised");

        Ok(Self {
            status_message: format!("{} flash message(s) on page. Press '?' for help", flashes),
            config,
            manager,
            history: DismissalHistory::new(),
            show_help: false,
            hovered: None,
            viewport: Rect::default(),
            started: Instant::now(),
            podium_cursor: 0,
            background_jobs: 0,
        })
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    /// One loop turn: the manager observes insertions and fires due timers,
    /// then lifecycle events are folded into the history.
    pub fn tick(&mut self) {
        self.tick_at(self.elapsed());
    }

    fn tick_at(&mut self, now: Duration) {
        self.manager.tick(now);
        self.drain_events();
    }

    /// Dispatches one terminal event read at `now`. The clock catches up
    /// first, so intervals scheduled by the input start from the moment it
    /// arrived. Returns true when the user asked to quit.
    pub fn handle_event(&mut self, event: Event, now: Duration) -> bool {
        self.tick_at(now);
        match event {
            Event::Key(KeyEvent { code, modifiers, kind, .. }) => {
                if kind != KeyEventKind::Press {
                    return false;
                }
                match code {
                    KeyCode::Char('q') => return true,
                    KeyCode::Char('c') if modifiers.contains(KeyModifiers::CONTROL) => return true,
                    KeyCode::Char('?') => self.show_help = !self.show_help,
                    KeyCode::Char('1') => self.show(Kind::Success),
                    KeyCode::Char('2') => self.show(Kind::Error),
                    KeyCode::Char('3') => self.show(Kind::Warning),
                    KeyCode::Char('4') => self.show(Kind::Info),
                    KeyCode::Char('5') => self.show(Kind::Primary),
                    KeyCode::Char('n') => self.insert_background_notice(),
                    KeyCode::Char('a') => self.celebrate_analysis(),
                    KeyCode::Char('p') => self.celebrate_podium(),
                    KeyCode::Char('x') => self.extend_newest(),
                    KeyCode::Char('+') | KeyCode::Char('=') => self.adjust_interval(true),
                    KeyCode::Char('-') => self.adjust_interval(false),
                    KeyCode::Esc => self.dismiss_all(),
                    _ => {}
                }
            }
            Event::Mouse(MouseEvent { kind, column, row, .. }) => match kind {
                MouseEventKind::Moved | MouseEventKind::Drag(_) => self.mouse_moved(column, row),
                MouseEventKind::Down(MouseButton::Left) => self.mouse_clicked(column, row),
                _ => {}
            },
            _ => {}
        }
        false
    }

    fn drain_events(&mut self) {
        for event in self.manager.take_events() {
            match event {
                LifecycleEvent::Removed { id, kind, text } => {
                    if self.hovered == Some(id) {
                        self.hovered = None;
                    }
                    self.history.push(text, kind);
                }
                LifecycleEvent::Paused(id) => {
                    self.status_message = format!("Paused {} while hovered", id);
                }
                _ => {}
            }
        }
    }

    pub fn show(&mut self, kind: Kind) {
        let message = match kind {
            Kind::Success => "Saved!",
            Kind::Error => "Upload failed, please retry",
            Kind::Warning => "Storage is almost full",
            Kind::Info => "A new report is available",
            Kind::Primary => "You have a new follower",
        };
        if let Some(id) = self.manager.show_transient(message, kind, None) {
            self.status_message = format!("Showing {} notification {}", kind.label(), id);
        }
    }

    /// Stands in for unrelated page code inserting markup; the manager only
    /// learns about it through insertion observation.
    pub fn insert_background_notice(&mut self) {
        self.background_jobs += 1;
        let job = self.background_jobs;
        let doc = self.manager.document_mut();
        let wrapper = doc.create(Element::new("section").with_class("job-feed"));
        doc.append(
            wrapper,
            Element::new("div")
                .with_class("notification")
                .with_attr("data-kind", "info")
                .with_text(format!("Background job #{} finished", job)),
        );
        let body = doc.body();
        doc.append_child(body, wrapper);
        self.status_message = format!("Inserted background job #{}", job);
    }

    pub fn celebrate_analysis(&mut self) {
        celebration::analysis_complete(&mut self.manager);
    }

    pub fn celebrate_podium(&mut self) {
        if self.config.podium.is_empty() {
            self.status_message = "No podium entries configured".to_string();
            return;
        }
        let entry = self.config.podium[self.podium_cursor % self.config.podium.len()].clone();
        self.podium_cursor += 1;
        celebration::podium(&mut self.manager, &entry);
    }

    /// Extends the most recently created notification that still has a
    /// pending dismissal.
    pub fn extend_newest(&mut self) {
        let newest = self
            .manager
            .document()
            .query_all(|_| true)
            .into_iter()
            .filter(|id| self.manager.has_timer(*id))
            .max();
        match newest {
            Some(id) => {
                self.manager.extend(id, self.config.extend);
                self.status_message = format!("Extended {} by {:.1}s", id, self.config.extend.as_secs_f32());
            }
            None => self.status_message = "Nothing to extend".to_string(),
        }
    }

    pub fn dismiss_all(&mut self) {
        self.manager.dismiss_all();
        self.status_message = "Dismissed all notifications".to_string();
    }

    pub fn adjust_interval(&mut self, longer: bool) {
        let current = self.config.dismiss_after;
        self.config.dismiss_after = if longer {
            current + INTERVAL_STEP
        } else {
            current.saturating_sub(INTERVAL_STEP).max(MIN_INTERVAL)
        };
        self.manager.set_config(ManagerConfig { dismiss_after: self.config.dismiss_after, fade: self.config.fade });
        self.status_message = format!("Auto-dismiss after {:.1}s", self.config.dismiss_after.as_secs_f32());
        if let Err(e) = self.config.save() {
            self.report_error("Saving config failed", e);
        }
    }

    pub fn mouse_moved(&mut self, column: u16, row: u16) {
        let over = ui::hit_test(self, column, row).map(|hit| hit.owner);
        if over == self.hovered {
            return;
        }
        if let Some(previous) = self.hovered.take() {
            for id in self.covered(previous) {
                self.manager.pointer_leave(id);
            }
        }
        if let Some(owner) = over {
            for id in self.covered(owner) {
                self.manager.pointer_enter(id);
            }
        }
        self.hovered = over;
    }

    /// A region draws its owner's whole subtree, so the pointer is over every
    /// notification nested in it too.
    fn covered(&self, owner: ElementId) -> Vec<ElementId> {
        let doc = self.manager.document();
        doc.descendants(owner)
            .into_iter()
            .filter(|id| doc.get(*id).is_some_and(is_notification))
            .collect()
    }

    pub fn mouse_clicked(&mut self, column: u16, row: u16) {
        let target = ui::hit_test(self, column, row).map(|hit| hit.target);
        self.manager.click(target);
    }

    pub fn report_error(&mut self, context: &str, err: anyhow::Error) {
        warn!(error = %err, "{}", context);
        self.status_message = format!("{}: {}", context, err);
    }
}

/// Initial server-rendered page: flash messages from the config plus some
/// ordinary content.
fn render_page(config: &Config) -> Document {
    let mut doc = Document::new();
    let body = doc.body();
    let Some(main) = doc.append(body, Element::new("main").with_class("container")) else {
        return doc;
    };
    for flash in &config.flash {
        let mut el = Element::new("div")
            .with_class("alert fade show")
            .with_attr("role", "alert")
            .with_text(flash.message.as_str());
        if let Some(kind) = flash.category.as_deref().and_then(Kind::parse) {
            el = el.with_class(kind.style_class());
        }
        if flash.permanent {
            el = el.with_class("alert-permanent");
        }
        doc.append(main, el);
    }
    doc.append(main, Element::new("p").with_text("Dashboard content"));
    doc
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::FlashConfig;
    use crate::modules::notifications::Phase;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    fn app_with(flash: Vec<FlashConfig>) -> (App, TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let mut cfg = Config::load_from(dir.path().join("config.toml")).unwrap();
        cfg.flash = flash;
        (App::new(cfg).unwrap(), dir)
    }

    fn flash(message: &str, permanent: bool) -> FlashConfig {
        FlashConfig { message: message.into(), category: None, permanent }
    }

    fn notifications(app: &App) -> Vec<ElementId> {
        app.manager.document().query_all(is_notification)
    }

    #[test]
    fn flash_messages_are_enrolled_on_startup() {
        let (app, _dir) = app_with(vec![flash("Welcome!", false), flash("Read me", true)]);
        let ids = notifications(&app);
        assert_eq!(ids.len(), 2);
        assert!(app.manager.is_enrolled(ids[0]));
        assert!(!app.manager.is_enrolled(ids[1]));
        assert!(app.manager.document().get(ids[0]).unwrap().has_class("alert-success"));
    }

    #[test]
    fn cancel_key_leaves_only_permanent_active() {
        let (mut app, _dir) = app_with(vec![flash("Pinned", true)]);
        app.show(Kind::Success);
        app.show(Kind::Error);
        app.insert_background_notice();
        app.manager.tick(Duration::ZERO);
        assert_eq!(app.manager.active_count(), 4);

        app.dismiss_all();

        assert_eq!(app.manager.active_count(), 1);
        let pinned = notifications(&app)
            .into_iter()
            .find(|id| app.manager.document().get(*id).unwrap().has_class("alert-permanent"))
            .unwrap();
        assert_eq!(app.manager.phase(pinned), Some(Phase::Active));
    }

    #[test]
    fn removals_land_in_history() {
        let (mut app, _dir) = app_with(Vec::new());
        app.show(Kind::Warning);
        app.manager.tick(Duration::from_secs(10));
        app.drain_events();
        assert_eq!(app.history.entries.len(), 1);
        assert_eq!(app.history.entries[0].kind, Kind::Warning);
        assert!(app.history.entries[0].message.contains("Storage is almost full"));
    }

    #[test]
    fn interval_adjustment_is_persisted_and_clamped() {
        let (mut app, _dir) = app_with(Vec::new());
        for _ in 0..20 {
            app.adjust_interval(false);
        }
        assert_eq!(app.config.dismiss_after, MIN_INTERVAL);
        assert_eq!(app.manager.config().dismiss_after, MIN_INTERVAL);

        let reloaded = Config::load_from(app.config.path.clone()).unwrap();
        assert_eq!(reloaded.dismiss_after, MIN_INTERVAL);
    }

    #[test]
    fn podium_cycles_entries() {
        let (mut app, _dir) = app_with(Vec::new());
        app.celebrate_podium();
        app.celebrate_podium();
        let banners = app.manager.document().query_all(celebration::is_celebration);
        assert_eq!(banners.len(), 1);
        assert!(app.manager.document().text_content(banners[0]).contains("grace"));
    }

    #[test]
    fn extend_targets_newest_pending_notification() {
        let (mut app, _dir) = app_with(Vec::new());
        app.show(Kind::Info);
        app.show(Kind::Primary);
        let ids = notifications(&app);
        app.extend_newest();
        assert_eq!(app.manager.deadline(ids[1]), Some(app.config.extend));
        assert_eq!(app.manager.deadline(ids[0]), Some(app.config.dismiss_after));
    }

    fn key(c: char) -> Event {
        Event::Key(KeyEvent::new(KeyCode::Char(c), KeyModifiers::NONE))
    }

    #[test]
    fn input_is_handled_against_the_arrival_time() {
        let (mut app, _dir) = app_with(Vec::new());
        let arrived = Duration::from_millis(1040);

        assert!(!app.handle_event(key('4'), arrived));

        let id = notifications(&app)[0];
        assert_eq!(app.manager.now(), arrived);
        assert_eq!(app.manager.deadline(id), Some(arrived + app.config.dismiss_after));
        assert!(app.handle_event(key('q'), arrived));
    }

    #[test]
    fn hovering_a_region_pauses_nested_notifications() {
        let (mut app, _dir) = app_with(Vec::new());
        app.viewport = Rect::new(0, 0, 120, 40);
        let doc = app.manager.document_mut();
        let body = doc.body();
        let outer = doc.append(body, Element::new("div").with_class("notification").with_text("outer")).unwrap();
        let inner = doc.append(outer, Element::new("div").with_class("alert").with_text("inner")).unwrap();
        app.tick_at(Duration::ZERO);

        let region = ui::layout(&app.manager, app.viewport).into_iter().find(|r| r.id == outer).unwrap();
        app.mouse_moved(region.rect.x + 1, region.rect.y + 1);
        assert!(app.manager.is_paused(outer));
        assert!(app.manager.is_paused(inner));

        app.tick_at(Duration::from_secs(10));
        assert_eq!(app.manager.phase(inner), Some(Phase::Active));

        app.mouse_moved(0, 0);
        assert!(!app.manager.is_paused(outer));
        assert!(!app.manager.is_paused(inner));
        assert_eq!(app.manager.deadline(inner), Some(Duration::from_secs(13)));
    }
}
