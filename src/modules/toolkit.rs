use super::dom::{Document, ElementId};

/// Native alert dismissal provided by the UI toolkit. When installed, the
/// notification manager hands final removal over to it instead of detaching
/// the element itself.
pub trait AlertToolkit {
    fn close(&mut self, doc: &mut Document, id: ElementId);
}

/// Default toolkit: mirrors a toolkit alert close by dropping the `show`
/// state, flagging the element as closed and detaching it.
#[derive(Debug, Default)]
pub struct NativeAlerts {
    pub closed: usize,
}

impl AlertToolkit for NativeAlerts {
    fn close(&mut self, doc: &mut Document, id: ElementId) {
        let Some(el) = doc.get_mut(id) else { return };
        el.remove_class("show");
        el.set_attr("data-closed", "true");
        if doc.remove(id) {
            self.closed += 1;
            tracing::trace!(%id, closed = self.closed, "toolkit closed alert");
        }
    }
}
