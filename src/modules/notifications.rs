use std::collections::HashMap;
use std::time::Duration;

use tracing::debug;

use super::dom::{Document, Element, ElementId};
use super::timers::{TimerId, TimerQueue};
use super::toolkit::AlertToolkit;

pub const DEFAULT_DISMISS_AFTER: Duration = Duration::from_millis(3000);
pub const DEFAULT_FADE: Duration = Duration::from_millis(500);
pub const DEFAULT_EXTEND: Duration = Duration::from_millis(2000);

const NOTIFICATION_CLASSES: [&str; 3] = ["alert", "notification", "alert-modern"];
const PERMANENT_CLASSES: [&str; 2] = ["alert-permanent", "permanent"];

pub fn is_notification(el: &Element) -> bool {
    NOTIFICATION_CLASSES.iter().any(|c| el.has_class(c)) || el.attr("data-auto-dismiss") == Some("true")
}

pub fn is_permanent(el: &Element) -> bool {
    PERMANENT_CLASSES.iter().any(|c| el.has_class(c)) || el.has_attr("data-no-auto-dismiss")
}

pub fn is_close_control(el: &Element) -> bool {
    el.has_class("btn-close")
}

/// Server-rendered flash messages carry `role="alert"`.
pub fn is_flash(el: &Element) -> bool {
    el.has_class("alert") && el.attr("role") == Some("alert")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Kind {
    Success,
    Error,
    Warning,
    Info,
    Primary,
}

impl Kind {
    pub fn label(self) -> &'static str {
        match self {
            Kind::Success => "success",
            Kind::Error => "error",
            Kind::Warning => "warning",
            Kind::Info => "info",
            Kind::Primary => "primary",
        }
    }

    pub fn icon(self) -> &'static str {
        match self {
            Kind::Success => "✔",
            Kind::Error => "✖",
            Kind::Warning => "⚠",
            Kind::Info => "ℹ",
            Kind::Primary => "🔔",
        }
    }

    pub fn style_class(self) -> &'static str {
        match self {
            Kind::Success => "alert-success",
            Kind::Error => "alert-danger",
            Kind::Warning => "alert-warning",
            Kind::Info => "alert-info",
            Kind::Primary => "alert-primary",
        }
    }

    pub fn from_style_class(class: &str) -> Option<Kind> {
        Kind::parse(class.strip_prefix("alert-")?)
    }

    pub fn parse(name: &str) -> Option<Kind> {
        match name.trim().to_ascii_lowercase().as_str() {
            "success" => Some(Kind::Success),
            "error" | "danger" => Some(Kind::Error),
            "warning" => Some(Kind::Warning),
            "info" => Some(Kind::Info),
            "primary" => Some(Kind::Primary),
            _ => None,
        }
    }

    /// Kind carried by an element's style markers, if any.
    pub fn of(el: &Element) -> Option<Kind> {
        el.attr("data-kind")
            .and_then(Kind::parse)
            .or_else(|| el.classes().find_map(Kind::from_style_class))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Active,
    FadingOut,
    Removed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LifecycleEvent {
    Enrolled(ElementId),
    Paused(ElementId),
    Resumed(ElementId),
    Extended(ElementId),
    FadingOut(ElementId),
    Removed { id: ElementId, kind: Kind, text: String },
}

#[derive(Debug, Clone, Copy)]
pub struct ManagerConfig {
    pub dismiss_after: Duration,
    pub fade: Duration,
}

impl Default for ManagerConfig {
    fn default() -> Self {
        Self { dismiss_after: DEFAULT_DISMISS_AFTER, fade: DEFAULT_FADE }
    }
}

#[derive(Debug, Clone, Copy)]
enum Task {
    Dismiss(ElementId),
    Detach(ElementId),
}

#[derive(Debug)]
struct Tracked {
    /// Enrolled notifications have hover/click handlers; manually dismissed
    /// permanent ones do not.
    interactive: bool,
    interval: Duration,
    timer: Option<TimerId>,
    paused: bool,
    phase: Phase,
}

/// Owns the page's display tree and the auto-dismiss contract of every
/// notification in it.
pub struct NotificationManager {
    config: ManagerConfig,
    doc: Document,
    timers: TimerQueue<Task>,
    tracked: HashMap<ElementId, Tracked>,
    toolkit: Option<Box<dyn AlertToolkit>>,
    events: Vec<LifecycleEvent>,
}

impl NotificationManager {
    pub fn new(config: ManagerConfig, doc: Document) -> Self {
        Self {
            config,
            doc,
            timers: TimerQueue::new(),
            tracked: HashMap::new(),
            toolkit: None,
            events: Vec::new(),
        }
    }

    pub fn with_toolkit(mut self, toolkit: Box<dyn AlertToolkit>) -> Self {
        self.toolkit = Some(toolkit);
        self
    }

    pub fn config(&self) -> ManagerConfig {
        self.config
    }

    /// Applies to notifications enrolled from now on.
    pub fn set_config(&mut self, config: ManagerConfig) {
        self.config = config;
    }

    pub fn document(&self) -> &Document {
        &self.doc
    }

    /// Page code mutates the tree through here; insertions are picked up on
    /// the next [`tick`](Self::tick).
    pub fn document_mut(&mut self) -> &mut Document {
        &mut self.doc
    }

    pub fn now(&self) -> Duration {
        self.timers.now()
    }

    /// Initial page load: adds missing close controls to alerts and enrolls
    /// every notification already in the tree.
    pub fn process_existing(&mut self) {
        let alerts = self.doc.query_all(|e| e.has_class("alert") && !e.has_class("alert-permanent"));
        for id in alerts {
            self.ensure_close_control(id);
        }
        for id in self.doc.query_all(is_notification) {
            self.enroll(id);
        }
    }

    /// Enrolls every notification inside subtrees inserted since the last
    /// call, the inserted roots included.
    pub fn observe_insertions(&mut self) {
        for root in self.doc.take_insertions() {
            for id in self.doc.descendants(root) {
                if self.doc.get(id).is_some_and(is_notification) {
                    self.enroll(id);
                }
            }
        }
    }

    /// One event-loop turn: enroll new insertions, then fire every timer due
    /// by `now`.
    pub fn tick(&mut self, now: Duration) {
        self.observe_insertions();
        self.advance(now);
    }

    pub fn advance(&mut self, now: Duration) {
        while let Some((timer, task)) = self.timers.pop_due(now) {
            match task {
                Task::Dismiss(id) => {
                    let owned = self.tracked.get_mut(&id).is_some_and(|t| {
                        let fired = t.timer == Some(timer);
                        if fired {
                            t.timer = None;
                        }
                        fired
                    });
                    if owned {
                        self.dismiss(id);
                    }
                }
                Task::Detach(id) => self.detach(id),
            }
        }
        self.timers.set_now(now);
    }

    pub fn enroll(&mut self, id: ElementId) {
        self.enroll_with(id, None);
    }

    pub fn enroll_with(&mut self, id: ElementId, duration: Option<Duration>) {
        if id == self.doc.body() || self.tracked.contains_key(&id) || !self.doc.is_attached(id) {
            return;
        }
        let Some(el) = self.doc.get(id) else { return };
        if is_permanent(el) {
            return;
        }
        let interval = duration
            .or_else(|| {
                el.attr("data-duration")
                    .and_then(|v| v.trim().parse::<u64>().ok())
                    .filter(|ms| *ms > 0)
                    .map(Duration::from_millis)
            })
            .unwrap_or(self.config.dismiss_after);

        self.ensure_close_control(id);
        let transition = format!("all {}s ease-in-out", self.config.fade.as_secs_f32());
        if let Some(el) = self.doc.get_mut(id) {
            el.set_style("transition", transition);
        }

        let timer = self.timers.schedule(interval, Task::Dismiss(id));
        self.tracked.insert(
            id,
            Tracked { interactive: true, interval, timer: Some(timer), paused: false, phase: Phase::Active },
        );
        debug!(%id, interval_ms = interval.as_millis() as u64, "enrolled notification");
        self.events.push(LifecycleEvent::Enrolled(id));
    }

    pub fn dismiss(&mut self, id: ElementId) {
        if id == self.doc.body() {
            return;
        }
        if !self.doc.is_attached(id) {
            self.forget(id);
            return;
        }
        let interval = self.config.dismiss_after;
        let tracked = self.tracked.entry(id).or_insert(Tracked {
            interactive: false,
            interval,
            timer: None,
            paused: false,
            phase: Phase::Active,
        });
        if tracked.phase != Phase::Active {
            return;
        }
        if let Some(timer) = tracked.timer.take() {
            self.timers.cancel(timer);
        }
        tracked.phase = Phase::FadingOut;
        tracked.paused = false;

        if let Some(el) = self.doc.get_mut(id) {
            el.set_style("opacity", "0");
            el.set_style("transform", "translateY(-20px)");
            el.set_style("max-height", "0");
            el.set_style("margin", "0");
            el.set_style("padding", "0");
            el.set_style("overflow", "hidden");
        }
        self.timers.schedule(self.config.fade, Task::Detach(id));
        debug!(%id, "notification fading out");
        self.events.push(LifecycleEvent::FadingOut(id));
    }

    /// Dismisses every enrolled, non-permanent notification still active.
    pub fn dismiss_all(&mut self) {
        for id in self.active_enrolled() {
            self.dismiss(id);
        }
    }

    /// Outside-click dismissal: every notification in the tree except
    /// server-rendered flash messages, permanent ones included.
    pub fn dismiss_custom(&mut self) {
        for id in self.doc.query_all(is_notification) {
            if !self.doc.get(id).is_some_and(is_flash) {
                self.dismiss(id);
            }
        }
    }

    pub fn extend(&mut self, id: ElementId, additional: Duration) {
        let Some(tracked) = self.tracked.get_mut(&id) else { return };
        let Some(timer) = tracked.timer.take() else { return };
        self.timers.cancel(timer);
        tracked.timer = Some(self.timers.schedule(additional, Task::Dismiss(id)));
        debug!(%id, additional_ms = additional.as_millis() as u64, "extended notification");
        self.events.push(LifecycleEvent::Extended(id));
    }

    /// Builds a notification, appends it to the body at the top-right corner
    /// and enrolls it.
    pub fn show_transient(&mut self, message: &str, kind: Kind, duration: Option<Duration>) -> Option<ElementId> {
        let body = self.doc.body();
        let shell = Element::new("div")
            .with_class("alert alert-modern fade-in-up")
            .with_class(kind.style_class())
            .with_attr("data-kind", kind.label())
            .with_style("position", "fixed")
            .with_style("top", "20px")
            .with_style("right", "20px")
            .with_style("z-index", "1060")
            .with_style("min-width", "300px")
            .with_style("max-width", "500px");
        let id = self.doc.create(shell);
        let row = self.doc.append(id, Element::new("div").with_class("d-flex align-items-center"))?;
        self.doc.append(row, Element::new("i").with_class("icon me-3").with_text(kind.icon()));
        self.doc.append(row, Element::new("div").with_class("flex-grow-1").with_text(message));
        self.doc.append(
            row,
            Element::new("button")
                .with_class("btn-close btn-close-white ms-3")
                .with_attr("data-bs-dismiss", "alert"),
        );
        self.doc.append_child(body, id);
        self.enroll_with(id, duration);
        Some(id)
    }

    /// Pointer entered `target`. Every enrolled notification containing it
    /// pauses, as the pointer is over all of them at once.
    pub fn pointer_enter(&mut self, target: ElementId) {
        for id in self.enrolled_chain(target) {
            self.pause(id);
        }
    }

    pub fn pointer_leave(&mut self, target: ElementId) {
        for id in self.enrolled_chain(target) {
            self.resume(id);
        }
    }

    fn pause(&mut self, id: ElementId) {
        let Some(tracked) = self.tracked.get_mut(&id) else { return };
        if tracked.phase != Phase::Active || tracked.paused {
            return;
        }
        if let Some(timer) = tracked.timer.take() {
            self.timers.cancel(timer);
        }
        tracked.paused = true;
        debug!(%id, "notification paused");
        self.events.push(LifecycleEvent::Paused(id));
    }

    fn resume(&mut self, id: ElementId) {
        let Some(tracked) = self.tracked.get_mut(&id) else { return };
        if !tracked.paused {
            return;
        }
        tracked.paused = false;
        if tracked.phase == Phase::Active {
            tracked.timer = Some(self.timers.schedule(tracked.interval, Task::Dismiss(id)));
            debug!(%id, "notification resumed");
            self.events.push(LifecycleEvent::Resumed(id));
        }
    }

    /// Document-level click routing. `None` means the click hit nothing in
    /// the tree, which counts as outside every notification.
    ///
    /// Close controls close the alert they belong to. Any other click inside
    /// notifications dismisses every enrolled one containing the target.
    pub fn click(&mut self, target: Option<ElementId>) {
        let Some(target) = target.filter(|t| self.doc.closest(*t, is_notification).is_some()) else {
            self.dismiss_custom();
            return;
        };
        let owner_of_control = self
            .doc
            .closest(target, is_close_control)
            .and_then(|c| self.doc.closest(c, is_notification));
        if let Some(owner) = owner_of_control {
            self.close(owner);
            return;
        }
        for id in self.enrolled_chain(target) {
            self.dismiss(id);
        }
    }

    /// Close-control path: the toolkit closes the alert straight away, no
    /// fade. Works for permanent alerts too.
    pub fn close(&mut self, id: ElementId) {
        if id == self.doc.body() || !self.doc.is_attached(id) {
            return;
        }
        if let Some(timer) = self.tracked.get_mut(&id).and_then(|t| t.timer.take()) {
            self.timers.cancel(timer);
        }
        self.detach(id);
    }

    /// `None` for elements that are not notifications in the tree. Ids no
    /// longer in the tree report `Removed`.
    pub fn phase(&self, id: ElementId) -> Option<Phase> {
        if !self.doc.is_attached(id) {
            let gone = self.doc.get(id).is_none() && self.doc.issued(id);
            return gone.then_some(Phase::Removed);
        }
        if let Some(t) = self.tracked.get(&id) {
            return Some(t.phase);
        }
        self.doc.get(id).filter(|e| is_notification(e)).map(|_| Phase::Active)
    }

    pub fn is_enrolled(&self, id: ElementId) -> bool {
        self.tracked.get(&id).is_some_and(|t| t.interactive)
    }

    pub fn is_paused(&self, id: ElementId) -> bool {
        self.tracked.get(&id).is_some_and(|t| t.paused)
    }

    pub fn has_timer(&self, id: ElementId) -> bool {
        self.tracked.get(&id).and_then(|t| t.timer).is_some_and(|t| self.timers.is_pending(t))
    }

    pub fn deadline(&self, id: ElementId) -> Option<Duration> {
        self.tracked.get(&id).and_then(|t| t.timer).and_then(|t| self.timers.deadline(t))
    }

    pub fn interval(&self, id: ElementId) -> Option<Duration> {
        self.tracked.get(&id).map(|t| t.interval)
    }

    /// Notifications currently in the tree and not fading, permanent ones
    /// included.
    pub fn active_count(&self) -> usize {
        self.doc
            .query_all(is_notification)
            .into_iter()
            .filter(|id| self.phase(*id) == Some(Phase::Active))
            .count()
    }

    pub fn pending_timers(&self) -> usize {
        self.timers.len()
    }

    pub fn take_events(&mut self) -> Vec<LifecycleEvent> {
        std::mem::take(&mut self.events)
    }

    fn active_enrolled(&self) -> Vec<ElementId> {
        let mut ids: Vec<ElementId> = self
            .tracked
            .iter()
            .filter(|(_, t)| t.interactive && t.phase == Phase::Active)
            .map(|(id, _)| *id)
            .collect();
        ids.sort();
        ids
    }

    /// Enrolled notifications containing `target`, innermost first.
    fn enrolled_chain(&self, target: ElementId) -> Vec<ElementId> {
        std::iter::once(target)
            .chain(self.doc.ancestors(target))
            .filter(|id| self.is_enrolled(*id))
            .collect()
    }

    fn ensure_close_control(&mut self, id: ElementId) {
        let Some(el) = self.doc.get(id) else { return };
        if !el.has_class("alert") {
            return;
        }
        let modern = el.has_class("alert-modern");
        let has_close = self
            .doc
            .descendants(id)
            .into_iter()
            .skip(1)
            .any(|d| self.doc.get(d).is_some_and(is_close_control));
        if has_close {
            return;
        }
        let mut button = Element::new("button")
            .with_class("btn-close btn-close-white")
            .with_attr("data-bs-dismiss", "alert")
            .with_attr("aria-label", "Close");
        if modern {
            button = button
                .with_style("position", "absolute")
                .with_style("top", "1rem")
                .with_style("right", "1rem");
            if let Some(el) = self.doc.get_mut(id) {
                el.set_style("position", "relative");
                el.set_style("padding-right", "3rem");
            }
        }
        self.doc.append(id, button);
    }

    fn detach(&mut self, id: ElementId) {
        let snapshot = self.doc.get(id).map(|el| (Kind::of(el).unwrap_or(Kind::Info), self.doc.text_content(id)));
        // Nested notifications leave the tree together with this one.
        for nested in self.doc.descendants(id).into_iter().skip(1) {
            self.forget(nested);
        }
        if self.doc.is_attached(id) {
            match self.toolkit.as_mut() {
                Some(toolkit) => toolkit.close(&mut self.doc, id),
                None => {
                    self.doc.remove(id);
                }
            }
            if self.doc.get(id).is_some() {
                self.doc.remove(id);
            }
        }
        self.forget(id);
        if let Some((kind, text)) = snapshot {
            debug!(%id, "notification removed");
            self.events.push(LifecycleEvent::Removed { id, kind, text });
        }
    }

    /// Drops bookkeeping and any pending timer for `id`.
    fn forget(&mut self, id: ElementId) {
        if let Some(timer) = self.tracked.remove(&id).and_then(|t| t.timer) {
            self.timers.cancel(timer);
        }
    }
}
