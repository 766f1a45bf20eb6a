/// Notifications the editor sends to its host.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum EditorEvent {
    Focus,
    Blur,
    /// A render was applied and the caret recomputed.
    Update { generation: u64 },
    /// Raw text typed by the user was turned into nodes.
    InputCommitted(String),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EventKind {
    Focus,
    Blur,
    Update,
    InputCommitted,
}

impl EditorEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            EditorEvent::Focus => EventKind::Focus,
            EditorEvent::Blur => EventKind::Blur,
            EditorEvent::Update { .. } => EventKind::Update,
            EditorEvent::InputCommitted(_) => EventKind::InputCommitted,
        }
    }
}

type Listener = Box<dyn FnMut(&EditorEvent)>;

#[derive(Default)]
pub(crate) struct Listeners {
    entries: Vec<(EventKind, Listener)>,
}

impl Listeners {
    pub(crate) fn add(&mut self, kind: EventKind, listener: Listener) {
        self.entries.push((kind, listener));
    }

    pub(crate) fn emit(&mut self, event: &EditorEvent) {
        let kind = event.kind();
        for (wanted, listener) in &mut self.entries {
            if *wanted == kind {
                listener(event);
            }
        }
    }

    pub(crate) fn clear(&mut self) {
        self.entries.clear();
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }
}
