//! Bridge between the editor and an external typesetter.
//!
//! Every update serializes the tree with one marker per node, stamps the job
//! with a generation number and remembers which marker stands for which
//! node. When the typesetter reports back, the result is only applied if it
//! belongs to the most recent generation; anything older is dropped. The
//! rendered boxes are then walked and matched back to nodes through their
//! markers to build the [`GeometryMap`].

use std::collections::HashMap;

use ratatui::{layout::Rect, text::Line};

use crate::editor::markup::{MarkerRef, render_markup};
use crate::editor::tree::{MathTree, NodeId};
use crate::error::{EditorError, TypesetError};

/// One typesetting request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TypesetJob {
    pub generation: u64,
    pub markup: String,
}

/// A finished request, successful or not.
#[derive(Clone, Debug)]
pub struct TypesetOutcome {
    pub generation: u64,
    pub result: Result<RenderedMath, TypesetError>,
}

/// Element of the typesetter's visual output.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RenderedBox {
    pub tag: String,
    /// Value of the `data-mark` attribute the element was produced from.
    pub marker: Option<usize>,
    pub area: Rect,
    pub children: Vec<RenderedBox>,
}

/// Visual output of one job: the box tree plus the glyphs to draw.
#[derive(Clone, Debug)]
pub struct RenderedMath {
    pub root: RenderedBox,
    pub lines: Vec<Line<'static>>,
}

/// Contract of the external renderer.
///
/// Jobs complete asynchronously: `submit` only queues, and finished work is
/// collected through `poll_finished`, in whatever order the renderer
/// produced it.
pub trait Typesetter {
    fn start(&mut self) -> Result<(), TypesetError> {
        Ok(())
    }

    fn submit(&mut self, job: TypesetJob);

    fn poll_finished(&mut self) -> Vec<TypesetOutcome>;
}

/// Node rectangles from the most recently applied render.
#[derive(Clone, Debug, Default)]
pub struct GeometryMap {
    generation: u64,
    document: Option<Rect>,
    rects: HashMap<NodeId, Rect>,
}

impl GeometryMap {
    /// Generation of the render this map was built from (0 = never rendered).
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Area covered by the whole document, placeholder included.
    pub fn document_area(&self) -> Option<Rect> {
        self.document
    }

    pub fn rect(&self, id: NodeId) -> Option<Rect> {
        self.rects.get(&id).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (NodeId, Rect)> + '_ {
        self.rects.iter().map(|(&id, &rect)| (id, rect))
    }

    pub fn len(&self) -> usize {
        self.rects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rects.is_empty()
    }

    fn build(generation: u64, root: &RenderedBox, markers: &HashMap<usize, NodeId>) -> Self {
        let mut map = Self {
            generation,
            document: Some(root.area),
            rects: HashMap::new(),
        };
        let mut stack = vec![root];
        while let Some(rendered) = stack.pop() {
            if let Some(node) = rendered.marker.and_then(|marker| markers.get(&marker)) {
                map.rects.insert(*node, rendered.area);
            }
            stack.extend(rendered.children.iter());
        }
        map
    }
}

struct PendingRender {
    generation: u64,
    markers: HashMap<usize, NodeId>,
}

pub struct RendererBridge {
    typesetter: Box<dyn Typesetter>,
    issued: u64,
    pending: Option<PendingRender>,
    geometry: GeometryMap,
    lines: Vec<Line<'static>>,
    alive: bool,
}

impl RendererBridge {
    /// Start the typesetter. Fails when it cannot come up.
    pub fn new(mut typesetter: Box<dyn Typesetter>) -> Result<Self, EditorError> {
        typesetter.start().map_err(EditorError::from)?;
        Ok(Self {
            typesetter,
            issued: 0,
            pending: None,
            geometry: GeometryMap::default(),
            lines: Vec::new(),
            alive: true,
        })
    }

    /// Submit the current tree for typesetting and return the generation
    /// stamped on the job. Any older job still in flight is superseded.
    pub fn update(&mut self, tree: &MathTree, placeholder: &str) -> u64 {
        if !self.alive {
            return self.issued;
        }
        self.issued += 1;
        let generation = self.issued;
        let (markup, markers) = render_markup(tree, placeholder);
        if let Some(previous) = self.pending.as_ref() {
            tracing::trace!(
                target: "mathpad::render",
                superseded = previous.generation,
                generation,
                "superseding in-flight render"
            );
        }
        self.pending = Some(PendingRender {
            generation,
            markers: markers
                .into_iter()
                .map(|MarkerRef { id, node }| (id, node))
                .collect(),
        });
        self.typesetter.submit(TypesetJob { generation, markup });
        generation
    }

    /// Collect finished jobs. Returns the generation that was applied, if
    /// any result was current.
    pub fn poll(&mut self) -> Option<u64> {
        if !self.alive {
            return None;
        }
        let mut applied = None;
        for outcome in self.typesetter.poll_finished() {
            let is_current = self
                .pending
                .as_ref()
                .is_some_and(|pending| pending.generation == outcome.generation);
            if !is_current {
                tracing::debug!(
                    target: "mathpad::render",
                    generation = outcome.generation,
                    latest = self.issued,
                    "dropping stale render"
                );
                continue;
            }
            let Some(pending) = self.pending.take() else {
                continue;
            };
            match outcome.result {
                Ok(rendered) => {
                    self.geometry =
                        GeometryMap::build(pending.generation, &rendered.root, &pending.markers);
                    self.lines = rendered.lines;
                    applied = Some(pending.generation);
                    tracing::trace!(
                        target: "mathpad::render",
                        generation = pending.generation,
                        nodes = self.geometry.len(),
                        "geometry rebuilt"
                    );
                }
                Err(err) => {
                    tracing::warn!(
                        target: "mathpad::render",
                        generation = pending.generation,
                        error = %err,
                        "render failed; keeping previous geometry"
                    );
                }
            }
        }
        applied
    }

    pub fn geometry(&self) -> &GeometryMap {
        &self.geometry
    }

    /// Glyph lines of the last applied render.
    pub fn lines(&self) -> &[Line<'static>] {
        &self.lines
    }

    pub fn latest_generation(&self) -> u64 {
        self.issued
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Whether the geometry belongs to the last submitted tree. False while
    /// a render is in flight and after the latest one failed.
    pub fn is_current(&self) -> bool {
        self.pending.is_none() && self.geometry.generation() == self.issued
    }

    pub fn is_alive(&self) -> bool {
        self.alive
    }

    /// Stop honoring results. Jobs still in flight resolve into nothing.
    pub fn shutdown(&mut self) {
        self.alive = false;
        self.pending = None;
    }
}

impl std::fmt::Debug for RendererBridge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RendererBridge")
            .field("issued", &self.issued)
            .field("pending", &self.pending.as_ref().map(|p| p.generation))
            .field("geometry", &self.geometry.generation())
            .field("alive", &self.alive)
            .finish()
    }
}
