use super::dom::{Element, ElementId};
use super::notifications::NotificationManager;

pub const TROPHY: &str = "🏆";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PodiumEntry {
    pub user: String,
    pub points: u32,
}

pub fn is_celebration(el: &Element) -> bool {
    el.has_class("celebration-message")
}

/// Shows a celebration banner at the top center. Only one is on screen at a
/// time; earlier ones are removed outright. The banner carries the
/// `alert-modern` marker, so it is enrolled on the next loop turn like any
/// other inserted notification.
pub fn celebrate(manager: &mut NotificationManager, message: &str) -> ElementId {
    for stale in manager.document().query_all(is_celebration) {
        manager.close(stale);
    }
    let body = manager.document().body();
    let banner = Element::new("div")
        .with_class("celebration-message alert-modern position-fixed")
        .with_attr("data-kind", "success")
        .with_style("top", "20px")
        .with_style("left", "50%")
        .with_style("z-index", "10000");
    let id = manager.document_mut().create(banner);
    manager.document_mut().append(id, Element::new("i").with_class("trophy me-2").with_text(TROPHY));
    manager.document_mut().append(id, Element::new("span").with_text(message));
    manager.document_mut().append_child(body, id);
    tracing::info!(%id, message, "celebration");
    id
}

pub fn analysis_complete(manager: &mut NotificationManager) -> ElementId {
    celebrate(manager, "Analysis complete! 🎉")
}

pub fn podium(manager: &mut NotificationManager, entry: &PodiumEntry) -> ElementId {
    celebrate(manager, &format!("{} - {} points! 🎉", entry.user, entry.points))
}
