//! # Batching
//!
//! Merges consecutive compatible elements of a sorted queue into one draw.
//!
//! ## Architecture
//!
//! - **Batcher**: Describes a vertex layout, decides compatibility and writes vertices
//! - **BatchAccumulator**: Walks elements in queue order and flushes one draw per run
//!
//! A run ends when the batcher rejects the next element, when the vertex
//! budget would overflow, or when the caller flushes (a non-batchable
//! element or the end of the queue). Batching never reorders elements.

pub mod sprite_batcher;

pub use sprite_batcher::{SpriteBatcher, SpriteMaskMode, SpriteQuad};

/// Component type of a vertex attribute
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VertexFormat {
    /// Two floats
    Float2,
    /// Three floats
    Float3,
    /// Four floats
    Float4,
}

impl VertexFormat {
    /// Size in bytes
    pub const fn size(self) -> usize {
        match self {
            Self::Float2 => 8,
            Self::Float3 => 12,
            Self::Float4 => 16,
        }
    }
}

/// One attribute of an interleaved vertex
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VertexAttribute {
    /// Semantic name, e.g. `POSITION`
    pub semantic: &'static str,
    /// Component type
    pub format: VertexFormat,
    /// Byte offset inside the vertex
    pub offset: usize,
}

/// Interleaved vertex layout
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VertexLayout {
    attributes: Vec<VertexAttribute>,
    stride: usize,
}

impl VertexLayout {
    /// Build a tightly packed layout from attributes in order
    pub fn packed(attributes: &[(&'static str, VertexFormat)]) -> Self {
        let mut offset = 0;
        let attributes = attributes
            .iter()
            .map(|&(semantic, format)| {
                let attribute = VertexAttribute { semantic, format, offset };
                offset += format.size();
                attribute
            })
            .collect();
        Self { attributes, stride: offset }
    }

    /// Attributes in order
    pub fn attributes(&self) -> &[VertexAttribute] {
        &self.attributes
    }

    /// Bytes per vertex
    pub const fn stride(&self) -> usize {
        self.stride
    }

    /// Floats per vertex
    pub const fn floats_per_vertex(&self) -> usize {
        self.stride / 4
    }

    /// Attribute by semantic
    pub fn attribute(&self, semantic: &str) -> Option<&VertexAttribute> {
        self.attributes.iter().find(|attribute| attribute.semantic == semantic)
    }
}

/// Strategy for merging elements into batched draws
pub trait Batcher {
    /// Element type the batcher consumes
    type Element;

    /// Layout of the vertices written by [`Batcher::write_vertices`]
    fn vertex_layout(&self) -> &VertexLayout;

    /// Vertices one element contributes
    fn vertex_count(&self, element: &Self::Element) -> usize;

    /// Whether `current` may join the run that ends with `previous`
    fn can_batch(&self, previous: &Self::Element, current: &Self::Element) -> bool;

    /// Append an element's vertices and indices
    ///
    /// `vertex_offset` is the number of vertices already in the run; the
    /// returned value is the offset after this element.
    fn write_vertices(
        &self,
        element: &Self::Element,
        vertices: &mut Vec<f32>,
        indices: &mut Vec<u16>,
        vertex_offset: usize,
    ) -> usize;
}

/// A completed run handed to the draw callback
#[derive(Debug)]
pub struct BatchFlush<'a, E> {
    /// First element of the run; its material and texture apply to all
    pub first: &'a E,
    /// Number of elements in the run
    pub element_count: usize,
    /// Vertex layout
    pub layout: &'a VertexLayout,
    /// Interleaved vertex floats
    pub vertices: &'a [f32],
    /// Number of vertices
    pub vertex_count: usize,
    /// Triangle-list indices
    pub indices: &'a [u16],
}

/// Accumulates consecutive compatible elements
///
/// Elements are referenced by index into the slice passed to every call,
/// which must be the same queue for the whole run.
pub struct BatchAccumulator<B: Batcher> {
    batcher: B,
    max_vertices: usize,
    members: Vec<usize>,
    vertices: Vec<f32>,
    indices: Vec<u16>,
    vertex_count: usize,
    flushes: usize,
}

impl<B: Batcher> BatchAccumulator<B> {
    /// Create an accumulator with a per-draw vertex budget
    pub fn new(batcher: B, max_vertices: usize) -> Self {
        // u16 indices cap a run at 65536 vertices
        let max_vertices = max_vertices.clamp(1, usize::from(u16::MAX) + 1);
        Self {
            batcher,
            max_vertices,
            members: Vec::new(),
            vertices: Vec::new(),
            indices: Vec::new(),
            vertex_count: 0,
            flushes: 0,
        }
    }

    /// The batcher
    pub const fn batcher(&self) -> &B {
        &self.batcher
    }

    /// Vertex budget per draw
    pub const fn max_vertices(&self) -> usize {
        self.max_vertices
    }

    /// Elements waiting in the current run
    pub fn pending(&self) -> usize {
        self.members.len()
    }

    /// Number of draws flushed so far
    pub const fn flush_count(&self) -> usize {
        self.flushes
    }

    /// Add `elements[index]` to the run, flushing first if it cannot join
    pub fn push<F>(&mut self, elements: &[B::Element], index: usize, sink: &mut F)
    where
        F: FnMut(BatchFlush<'_, B::Element>),
    {
        let Some(element) = elements.get(index) else {
            return;
        };
        let needed = self.batcher.vertex_count(element);
        if let Some(&last) = self.members.last() {
            let compatible = elements
                .get(last)
                .is_some_and(|previous| self.batcher.can_batch(previous, element));
            if !compatible || self.vertex_count + needed > self.max_vertices {
                self.flush(elements, sink);
            }
        }

        self.vertex_count = self.batcher.write_vertices(
            element,
            &mut self.vertices,
            &mut self.indices,
            self.vertex_count,
        );
        self.members.push(index);
    }

    /// Emit the current run, if any
    pub fn flush<F>(&mut self, elements: &[B::Element], sink: &mut F)
    where
        F: FnMut(BatchFlush<'_, B::Element>),
    {
        let Some(first) = self.members.first().and_then(|&index| elements.get(index)) else {
            self.reset();
            return;
        };
        sink(BatchFlush {
            first,
            element_count: self.members.len(),
            layout: self.batcher.vertex_layout(),
            vertices: &self.vertices,
            vertex_count: self.vertex_count,
            indices: &self.indices,
        });
        self.flushes += 1;
        self.reset();
    }

    /// Drop the current run without drawing it
    pub fn reset(&mut self) {
        self.members.clear();
        self.vertices.clear();
        self.indices.clear();
        self.vertex_count = 0;
    }
}
