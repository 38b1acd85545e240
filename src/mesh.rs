// Copyright © 2018 Cormac O'Brien
//
// Permission is hereby granted, free of charge, to any person obtaining a copy of this software
// and associated documentation files (the "Software"), to deal in the Software without
// restriction, including without limitation the rights to use, copy, modify, merge, publish,
// distribute, sublicense, and/or sell copies of the Software, and to permit persons to whom the
// Software is furnished to do so, subject to the following conditions:
//
// The above copyright notice and this permission notice shall be included in all copies or
// substantial portions of the Software.
//
// THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF ANY KIND, EXPRESS OR IMPLIED, INCLUDING
// BUT NOT LIMITED TO THE WARRANTIES OF MERCHANTABILITY, FITNESS FOR A PARTICULAR PURPOSE AND
// NONINFRINGEMENT. IN NO EVENT SHALL THE AUTHORS OR COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM,
// DAMAGES OR OTHER LIABILITY, WHETHER IN AN ACTION OF CONTRACT, TORT OR OTHERWISE, ARISING FROM,
// OUT OF OR IN CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER DEALINGS IN THE SOFTWARE.

//! Indexed mesh output shared by the BSP, MAP and MDL builders.
//!
//! Vertices are deduplicated by exact equality of every field (compared bit-for-bit, with
//! negative zero folded into zero), so two vertices produced by the same computation share one
//! vertex buffer entry. Index buffers are split into per-texture draw ranges.

use std::{collections::HashMap, hash::Hash};

/// Index value that ends the current triangle fan within a draw range.
pub const PRIMITIVE_RESTART: u32 = 0xFFFF_FFFF;

/// A type that can be deduplicated in a `VertexTable`.
pub trait VertexKey: Copy {
    type Key: Hash + Eq;

    fn key(&self) -> Self::Key;
}

// Adding positive zero folds -0.0 into 0.0, so keys agree with float equality.
fn bits(value: f32) -> u32 {
    (value + 0.0).to_bits()
}

/// A vertex of brush geometry (BSP faces and MAP brushes).
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct BrushVertex {
    pub position: [f32; 3],
    pub texcoord: [f32; 2],
}

impl VertexKey for BrushVertex {
    type Key = [u32; 5];

    fn key(&self) -> [u32; 5] {
        let [x, y, z] = self.position;
        let [s, t] = self.texcoord;
        [bits(x), bits(y), bits(z), bits(s), bits(t)]
    }
}

/// A vertex of studio model geometry.
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct ModelVertex {
    pub position: [f32; 3],
    pub texcoord: [f32; 2],
    pub color: [f32; 4],
}

impl VertexKey for ModelVertex {
    type Key = [u32; 9];

    fn key(&self) -> [u32; 9] {
        let [x, y, z] = self.position;
        let [s, t] = self.texcoord;
        let [r, g, b, a] = self.color;
        [
            bits(x),
            bits(y),
            bits(z),
            bits(s),
            bits(t),
            bits(r),
            bits(g),
            bits(b),
            bits(a),
        ]
    }
}

/// A deduplicating vertex buffer.
#[derive(Debug)]
pub struct VertexTable<V>
where
    V: VertexKey,
{
    vertices: Vec<V>,
    lookup: HashMap<V::Key, u32>,
}

impl<V> VertexTable<V>
where
    V: VertexKey,
{
    pub fn new() -> VertexTable<V> {
        VertexTable {
            vertices: Vec::new(),
            lookup: HashMap::new(),
        }
    }

    /// Returns the index of `vertex`, appending it if no identical vertex exists yet.
    pub fn push(&mut self, vertex: V) -> u32 {
        let vertices = &mut self.vertices;
        *self.lookup.entry(vertex.key()).or_insert_with(|| {
            let id = vertices.len() as u32;
            debug_assert!(id != PRIMITIVE_RESTART);
            vertices.push(vertex);
            id
        })
    }

    pub fn len(&self) -> usize {
        self.vertices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }

    pub fn vertices(&self) -> &[V] {
        &self.vertices
    }

    pub fn into_vertices(self) -> Vec<V> {
        self.vertices
    }
}

/// A contiguous slice of an index buffer drawn with a single texture.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct DrawRange {
    /// Index of the texture in the owning asset's texture list.
    pub texture: usize,
    pub index_offset: usize,
    pub index_count: usize,
}

/// A vertex buffer plus an index buffer partitioned into per-texture draw ranges.
#[derive(Debug)]
pub struct IndexedMesh<V> {
    pub vertices: Vec<V>,
    pub indices: Vec<u32>,
    pub ranges: Vec<DrawRange>,
}

impl<V> IndexedMesh<V> {
    /// Returns the indices belonging to the given draw range.
    pub fn range_indices(&self, range: &DrawRange) -> &[u32] {
        &self.indices[range.index_offset..range.index_offset + range.index_count]
    }
}

/// Assembles an `IndexedMesh` one draw range at a time.
pub struct MeshBuilder<V>
where
    V: VertexKey,
{
    table: VertexTable<V>,
    indices: Vec<u32>,
    ranges: Vec<DrawRange>,
    range_start: Option<(usize, usize)>,
}

impl<V> MeshBuilder<V>
where
    V: VertexKey,
{
    pub fn new() -> MeshBuilder<V> {
        MeshBuilder {
            table: VertexTable::new(),
            indices: Vec::new(),
            ranges: Vec::new(),
            range_start: None,
        }
    }

    /// Starts a new draw range for `texture`, closing the current one if it is still open.
    pub fn begin_range(&mut self, texture: usize) {
        self.end_range();
        self.range_start = Some((texture, self.indices.len()));
    }

    /// Closes the current draw range. Empty ranges are dropped.
    pub fn end_range(&mut self) {
        if let Some((texture, index_offset)) = self.range_start.take() {
            let index_count = self.indices.len() - index_offset;
            if index_count > 0 {
                self.ranges.push(DrawRange {
                    texture,
                    index_offset,
                    index_count,
                });
            }
        }
    }

    /// Deduplicates `vertex` and appends its index to the current range.
    pub fn push_vertex(&mut self, vertex: V) -> u32 {
        let id = self.table.push(vertex);
        self.indices.push(id);
        id
    }

    /// Appends a whole triangle fan followed by the primitive restart sentinel.
    pub fn push_fan<I>(&mut self, vertices: I)
    where
        I: IntoIterator<Item = V>,
    {
        for v in vertices {
            self.push_vertex(v);
        }
        self.indices.push(PRIMITIVE_RESTART);
    }

    pub fn build(mut self) -> IndexedMesh<V> {
        self.end_range();
        IndexedMesh {
            vertices: self.table.into_vertices(),
            indices: self.indices,
            ranges: self.ranges,
        }
    }
}
