use std::collections::HashMap;
use std::time::Duration;

use crate::editor::kind::{NodeKind, Placement};

/// Per-kind insertion placement, falling back to each kind's default.
#[derive(Clone, Debug, Default)]
pub struct PlacementRules {
    overrides: HashMap<NodeKind, Placement>,
}

impl PlacementRules {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, kind: NodeKind, placement: Placement) -> Self {
        self.overrides.insert(kind, placement);
        self
    }

    pub fn set(&mut self, kind: NodeKind, placement: Placement) {
        self.overrides.insert(kind, placement);
    }

    pub fn placement(&self, kind: NodeKind) -> Placement {
        self.overrides
            .get(&kind)
            .copied()
            .unwrap_or_else(|| kind.default_placement())
    }
}

/// Editor configuration
#[derive(Clone, Debug)]
pub struct EditorConfig {
    /// Time between caret visibility toggles
    pub blink_interval: Duration,

    /// How long the caret stays solid after the last interaction
    pub quiet_period: Duration,

    /// Text shown while the document is empty
    pub placeholder: String,

    /// Where inserted nodes land for each kind of caret target
    pub placement: PlacementRules,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            blink_interval: Duration::from_millis(530),
            quiet_period: Duration::from_millis(600),
            placeholder: "Type math here".to_string(),
            placement: PlacementRules::default(),
        }
    }
}

impl EditorConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_placeholder(mut self, placeholder: &str) -> Self {
        self.placeholder = placeholder.to_string();
        self
    }

    pub fn with_blink(mut self, interval: Duration, quiet_period: Duration) -> Self {
        self.blink_interval = interval;
        self.quiet_period = quiet_period;
        self
    }

    pub fn with_placement(mut self, placement: PlacementRules) -> Self {
        self.placement = placement;
        self
    }
}
