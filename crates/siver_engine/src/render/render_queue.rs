//! # Render Queue System
//!
//! Collects the drawables of one frame and orders them for submission.
//!
//! ## Architecture
//!
//! - **RenderElement**: One drawable: primitive, material, world matrix and camera depth
//! - **RenderQueue**: Reusable list of elements sorted by depth
//! - **RenderQueues**: The opaque / alpha-test / transparent triple a pipeline owns
//!
//! Opaque and alpha-test queues sort near to far so early depth rejection
//! kicks in; the transparent queue sorts far to near for correct blending.
//! Queues are cleared, not reallocated, between frames.

use std::cmp::Ordering;
use std::rc::Rc;

use serde::{Deserialize, Serialize};

use crate::foundation::math::Mat4;
use crate::render::batching::sprite_batcher::SpriteQuad;
use crate::render::material::Material;
use crate::render::mesh::Mesh;
use crate::scene::{Layer, NodeId};

/// Queue an element is classified into
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QueueType {
    /// Opaque geometry
    Opaque,
    /// Alpha-tested geometry
    AlphaTest,
    /// Blended geometry
    Transparent,
}

/// Band constants used to classify material render-queue values
///
/// A value goes to the transparent queue when it is above the midpoint of
/// the alpha-test and transparent constants, to the alpha-test queue when it
/// is above the midpoint of the opaque and alpha-test constants, and to the
/// opaque queue otherwise.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct QueueBands {
    /// Opaque constant
    pub opaque: i32,
    /// Alpha-test constant
    pub alpha_test: i32,
    /// Transparent constant
    pub transparent: i32,
}

impl Default for QueueBands {
    fn default() -> Self {
        Self {
            opaque: 1000,
            alpha_test: 2000,
            transparent: 3000,
        }
    }
}

impl QueueBands {
    /// Classify a render-queue value
    pub const fn classify(&self, render_queue: i32) -> QueueType {
        let value = render_queue as i64;
        if value > midpoint(self.alpha_test, self.transparent) {
            QueueType::Transparent
        } else if value > midpoint(self.opaque, self.alpha_test) {
            QueueType::AlphaTest
        } else {
            QueueType::Opaque
        }
    }
}

/// Floor of the mean, widened so constants near `i32::MAX` cannot overflow
const fn midpoint(a: i32, b: i32) -> i64 {
    (a as i64 + b as i64) >> 1
}

/// Sort direction of a queue
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DepthOrder {
    /// Ascending camera depth
    NearToFar,
    /// Descending camera depth
    FarToNear,
}

impl DepthOrder {
    /// Compare two depths; NaN compares equal to everything
    pub fn compare(self, a: f32, b: f32) -> Ordering {
        let ordering = a.partial_cmp(&b).unwrap_or(Ordering::Equal);
        match self {
            Self::NearToFar => ordering,
            Self::FarToNear => ordering.reverse(),
        }
    }
}

/// Geometry of a render element
#[derive(Debug, Clone)]
pub enum ElementPrimitive {
    /// One sub-mesh of an uploaded mesh
    Mesh {
        /// Mesh
        mesh: Rc<Mesh>,
        /// Sub-mesh index
        sub_mesh: usize,
    },
    /// A quad merged into batched draws
    Sprite(SpriteQuad),
}

impl ElementPrimitive {
    /// Whether the element is drawn through the batcher
    pub const fn is_batchable(&self) -> bool {
        matches!(self, Self::Sprite(_))
    }
}

/// One drawable of a frame
#[derive(Debug, Clone)]
pub struct RenderElement {
    /// Geometry
    pub primitive: ElementPrimitive,
    /// Material it draws with unless a pass replaces it
    pub material: Rc<Material>,
    /// World matrix of the owning node
    pub world_matrix: Mat4,
    /// Camera-space depth (distance along the view direction)
    pub depth: f32,
    /// Layer bits of the owning node
    pub layer: Layer,
    /// Queue the element was classified into
    pub queue: QueueType,
    /// Owning node
    pub node: Option<NodeId>,
}

/// Reusable, depth-sorted list of render elements
#[derive(Debug)]
pub struct RenderQueue {
    elements: Vec<RenderElement>,
    order: DepthOrder,
}

impl RenderQueue {
    /// Create an empty queue
    pub const fn new(order: DepthOrder) -> Self {
        Self {
            elements: Vec::new(),
            order,
        }
    }

    /// Create a queue with pre-allocated capacity
    pub fn with_capacity(order: DepthOrder, capacity: usize) -> Self {
        Self {
            elements: Vec::with_capacity(capacity),
            order,
        }
    }

    /// Sort direction
    pub const fn order(&self) -> DepthOrder {
        self.order
    }

    /// Remove all elements, keeping the allocation
    pub fn clear(&mut self) {
        self.elements.clear();
    }

    /// Append an element
    pub fn push_element(&mut self, element: RenderElement) {
        self.elements.push(element);
    }

    /// Stable sort by depth in the queue's direction
    pub fn sort(&mut self) {
        let order = self.order;
        self.elements.sort_by(|a, b| order.compare(a.depth, b.depth));
    }

    /// Elements in current order
    pub fn elements(&self) -> &[RenderElement] {
        &self.elements
    }

    /// Number of elements
    pub fn len(&self) -> usize {
        self.elements.len()
    }

    /// Whether the queue is empty
    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    /// Allocated element capacity
    pub fn capacity(&self) -> usize {
        self.elements.capacity()
    }
}

/// The three queues of a pipeline
#[derive(Debug)]
pub struct RenderQueues {
    /// Opaque queue, near to far
    pub opaque: RenderQueue,
    /// Alpha-test queue, near to far
    pub alpha_test: RenderQueue,
    /// Transparent queue, far to near
    pub transparent: RenderQueue,
    bands: QueueBands,
}

impl RenderQueues {
    /// Create empty queues
    pub fn new(bands: QueueBands, capacity: usize) -> Self {
        Self {
            opaque: RenderQueue::with_capacity(DepthOrder::NearToFar, capacity),
            alpha_test: RenderQueue::with_capacity(DepthOrder::NearToFar, capacity),
            transparent: RenderQueue::with_capacity(DepthOrder::FarToNear, capacity),
            bands,
        }
    }

    /// Classification bands
    pub const fn bands(&self) -> &QueueBands {
        &self.bands
    }

    /// Clear every queue
    pub fn clear(&mut self) {
        self.opaque.clear();
        self.alpha_test.clear();
        self.transparent.clear();
    }

    /// Classify an element by its material and append it to that queue
    pub fn push_element(&mut self, mut element: RenderElement) -> QueueType {
        let queue = self.bands.classify(element.material.render_queue);
        element.queue = queue;
        self.queue_mut(queue).push_element(element);
        queue
    }

    /// Sort every queue
    pub fn sort(&mut self) {
        self.opaque.sort();
        self.alpha_test.sort();
        self.transparent.sort();
    }

    /// Queue of a type
    pub const fn queue(&self, queue: QueueType) -> &RenderQueue {
        match queue {
            QueueType::Opaque => &self.opaque,
            QueueType::AlphaTest => &self.alpha_test,
            QueueType::Transparent => &self.transparent,
        }
    }

    fn queue_mut(&mut self, queue: QueueType) -> &mut RenderQueue {
        match queue {
            QueueType::Opaque => &mut self.opaque,
            QueueType::AlphaTest => &mut self.alpha_test,
            QueueType::Transparent => &mut self.transparent,
        }
    }

    /// Total number of elements
    pub fn len(&self) -> usize {
        self.opaque.len() + self.alpha_test.len() + self.transparent.len()
    }

    /// Whether every queue is empty
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
