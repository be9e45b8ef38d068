use std::collections::{BTreeMap, HashMap};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ElementId(u64);

impl fmt::Display for ElementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A node of the display tree. Built detached with the `with_*` helpers and
/// then handed to [`Document::append`].
#[derive(Debug, Clone, Default)]
pub struct Element {
    pub tag: String,
    classes: Vec<String>,
    attributes: BTreeMap<String, String>,
    style: BTreeMap<String, String>,
    pub text: String,
    children: Vec<ElementId>,
    parent: Option<ElementId>,
}

impl Element {
    pub fn new(tag: impl Into<String>) -> Self {
        Self { tag: tag.into(), ..Default::default() }
    }

    pub fn with_class(mut self, class: &str) -> Self {
        for c in class.split_whitespace() {
            self.add_class(c);
        }
        self
    }

    pub fn with_attr(mut self, name: &str, value: impl Into<String>) -> Self {
        self.attributes.insert(name.to_string(), value.into());
        self
    }

    pub fn with_style(mut self, property: &str, value: impl Into<String>) -> Self {
        self.style.insert(property.to_string(), value.into());
        self
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = text.into();
        self
    }

    pub fn has_class(&self, class: &str) -> bool {
        self.classes.iter().any(|c| c == class)
    }

    pub fn add_class(&mut self, class: &str) {
        if !self.has_class(class) {
            self.classes.push(class.to_string());
        }
    }

    pub fn remove_class(&mut self, class: &str) {
        self.classes.retain(|c| c != class);
    }

    pub fn classes(&self) -> impl Iterator<Item = &str> {
        self.classes.iter().map(String::as_str)
    }

    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }

    pub fn has_attr(&self, name: &str) -> bool {
        self.attributes.contains_key(name)
    }

    pub fn set_attr(&mut self, name: &str, value: impl Into<String>) {
        self.attributes.insert(name.to_string(), value.into());
    }

    pub fn style(&self, property: &str) -> Option<&str> {
        self.style.get(property).map(String::as_str)
    }

    pub fn set_style(&mut self, property: &str, value: impl Into<String>) {
        self.style.insert(property.to_string(), value.into());
    }

    pub fn children(&self) -> &[ElementId] {
        &self.children
    }

    pub fn parent(&self) -> Option<ElementId> {
        self.parent
    }
}

/// Arena-backed display tree rooted at `body`.
///
/// Every subtree appended under an attached parent is recorded as an
/// insertion; observers drain them with [`Document::take_insertions`].
/// Removing an element drops its whole subtree from the arena, so stale ids
/// simply stop resolving.
#[derive(Debug)]
pub struct Document {
    elements: HashMap<ElementId, Element>,
    body: ElementId,
    next_id: u64,
    insertions: Vec<ElementId>,
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    pub fn new() -> Self {
        let body = ElementId(0);
        let mut elements = HashMap::new();
        elements.insert(body, Element::new("body"));
        Self { elements, body, next_id: 1, insertions: Vec::new() }
    }

    pub fn body(&self) -> ElementId {
        self.body
    }

    pub fn get(&self, id: ElementId) -> Option<&Element> {
        self.elements.get(&id)
    }

    pub fn get_mut(&mut self, id: ElementId) -> Option<&mut Element> {
        self.elements.get_mut(&id)
    }

    /// Creates a detached element. It becomes visible once appended.
    pub fn create(&mut self, mut element: Element) -> ElementId {
        let id = ElementId(self.next_id);
        self.next_id += 1;
        element.children.clear();
        element.parent = None;
        self.elements.insert(id, element);
        id
    }

    /// Creates `element` and appends it to `parent` in one step.
    pub fn append(&mut self, parent: ElementId, element: Element) -> Option<ElementId> {
        if !self.elements.contains_key(&parent) {
            return None;
        }
        let id = self.create(element);
        self.append_child(parent, id);
        Some(id)
    }

    /// Moves `child` under `parent`. Returns false when either id is unknown
    /// or the move would create a cycle.
    pub fn append_child(&mut self, parent: ElementId, child: ElementId) -> bool {
        if parent == child
            || !self.elements.contains_key(&parent)
            || !self.elements.contains_key(&child)
            || self.ancestors(parent).any(|a| a == child)
        {
            return false;
        }
        self.unlink(child);
        if let Some(p) = self.elements.get_mut(&parent) {
            p.children.push(child);
        }
        if let Some(c) = self.elements.get_mut(&child) {
            c.parent = Some(parent);
        }
        if self.is_attached(child) {
            self.insertions.push(child);
        }
        true
    }

    /// Detaches `id` and drops it with all of its descendants.
    pub fn remove(&mut self, id: ElementId) -> bool {
        if id == self.body || !self.elements.contains_key(&id) {
            return false;
        }
        self.unlink(id);
        for dead in self.descendants(id) {
            self.elements.remove(&dead);
        }
        true
    }

    pub fn is_attached(&self, id: ElementId) -> bool {
        id == self.body || self.ancestors(id).any(|a| a == self.body)
    }

    /// True for every id this document ever handed out, removed ones included.
    /// Ids are never reused.
    pub fn issued(&self, id: ElementId) -> bool {
        id.0 < self.next_id
    }

    pub fn ancestors(&self, id: ElementId) -> impl Iterator<Item = ElementId> + '_ {
        std::iter::successors(self.elements.get(&id).and_then(|e| e.parent), move |p| {
            self.elements.get(p).and_then(|e| e.parent)
        })
    }

    /// `id` followed by all of its descendants in document order.
    pub fn descendants(&self, id: ElementId) -> Vec<ElementId> {
        let mut out = Vec::new();
        if !self.elements.contains_key(&id) {
            return out;
        }
        let mut stack = vec![id];
        while let Some(next) = stack.pop() {
            out.push(next);
            if let Some(e) = self.elements.get(&next) {
                stack.extend(e.children.iter().rev().copied());
            }
        }
        out
    }

    /// Attached elements below the body matching `pred`, in document order.
    pub fn query_all(&self, pred: impl Fn(&Element) -> bool) -> Vec<ElementId> {
        self.descendants(self.body)
            .into_iter()
            .skip(1)
            .filter(|id| self.elements.get(id).is_some_and(&pred))
            .collect()
    }

    /// Nearest inclusive ancestor of `id` matching `pred`.
    pub fn closest(&self, id: ElementId, pred: impl Fn(&Element) -> bool) -> Option<ElementId> {
        std::iter::once(id)
            .chain(self.ancestors(id))
            .find(|a| self.elements.get(a).is_some_and(&pred))
    }

    /// Concatenated text of `id` and its descendants, space separated.
    pub fn text_content(&self, id: ElementId) -> String {
        self.descendants(id)
            .into_iter()
            .filter_map(|d| self.elements.get(&d))
            .map(|e| e.text.trim())
            .filter(|t| !t.is_empty())
            .collect::<Vec<_>>()
            .join(" ")
    }

    pub fn take_insertions(&mut self) -> Vec<ElementId> {
        std::mem::take(&mut self.insertions)
    }

    fn unlink(&mut self, id: ElementId) {
        let parent = self.elements.get_mut(&id).and_then(|e| e.parent.take());
        if let Some(p) = parent.and_then(|p| self.elements.get_mut(&p)) {
            p.children.retain(|c| *c != id);
        }
    }
}
