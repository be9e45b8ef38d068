use tracing::debug;

use super::dom::Element;
use super::notifications::{is_flash, Kind, NotificationManager};

const SUCCESS_TERMS: [&str; 3] = ["success", "thank you", "welcome"];
const FAILURE_TERMS: [&str; 3] = ["error", "invalid", "failed"];
const WARNING_TERMS: [&str; 2] = ["warning", "attention"];

/// Guesses a kind from message text. Success terms win over failure terms,
/// which win over warning terms; anything else is informational.
pub fn classify_text(text: &str) -> Kind {
    let text = text.to_lowercase();
    let hit = |terms: &[&str]| terms.iter().any(|t| text.contains(t));
    if hit(&SUCCESS_TERMS) {
        Kind::Success
    } else if hit(&FAILURE_TERMS) {
        Kind::Error
    } else if hit(&WARNING_TERMS) {
        Kind::Warning
    } else {
        Kind::Info
    }
}

/// Explicit style markers first, text heuristic as a fallback.
pub fn infer_kind(el: &Element, text: &str) -> Kind {
    Kind::of(el).unwrap_or_else(|| classify_text(text))
}

/// Brings server-rendered flash messages under the manager's control.
pub struct FlashMessageHandler;

impl FlashMessageHandler {
    /// Styles every flash message by category and enrolls it. Returns how
    /// many were processed.
    pub fn process(manager: &mut NotificationManager) -> usize {
        let flashes = manager.document().query_all(is_flash);
        for &id in &flashes {
            let text = manager.document().text_content(id);
            let Some(el) = manager.document_mut().get_mut(id) else { continue };
            let kind = infer_kind(el, &text);
            el.add_class(kind.style_class());
            el.add_class("alert-modern");
            debug!(%id, kind = kind.label(), "flash message categorised");
            manager.enroll(id);
        }
        flashes.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modules::dom::Document;
    use crate::modules::notifications::{ManagerConfig, Phase};
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    #[rstest]
    #[case("Invalid credentials", Kind::Error)]
    #[case("Login FAILED, try again", Kind::Error)]
    #[case("Welcome back!", Kind::Success)]
    #[case("Thank you for your feedback", Kind::Success)]
    #[case("Attention: maintenance tonight", Kind::Warning)]
    #[case("Your profile was updated", Kind::Info)]
    #[case("Success despite an error earlier", Kind::Success)]
    fn text_classification(#[case] text: &str, #[case] expected: Kind) {
        assert_eq!(classify_text(text), expected);
    }

    #[test]
    fn explicit_marker_beats_text() {
        let el = Element::new("div").with_class("alert alert-warning");
        assert_eq!(infer_kind(&el, "Invalid credentials"), Kind::Warning);
    }

    #[test]
    fn modern_marker_is_not_a_category() {
        let el = Element::new("div").with_class("alert alert-modern");
        assert_eq!(infer_kind(&el, "Invalid credentials"), Kind::Error);
    }

    #[test]
    fn process_styles_and_enrolls_flash_messages() {
        let mut doc = Document::new();
        let body = doc.body();
        let flash = doc
            .append(body, Element::new("div").with_class("alert").with_attr("role", "alert").with_text("Invalid credentials"))
            .unwrap();
        let other = doc.append(body, Element::new("div").with_class("alert").with_text("not flash")).unwrap();
        let mut m = NotificationManager::new(ManagerConfig::default(), doc);

        assert_eq!(FlashMessageHandler::process(&mut m), 1);

        let el = m.document().get(flash).unwrap();
        assert!(el.has_class("alert-danger"));
        assert!(el.has_class("alert-modern"));
        assert!(m.is_enrolled(flash));
        assert!(!m.is_enrolled(other));
        assert_eq!(m.phase(flash), Some(Phase::Active));
    }
}
