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

//! Half-Life BSP (version 30) file and data structure handling.
//!
//! # File Format
//!
//! The BSP file header consists of the file format version number, stored as an `i32`, followed
//! by a directory of 15 "lumps". Each lump is a 32-bit offset into the file data and a 32-bit size
//! in bytes. Lumps appear in a fixed order: entities, planes, textures, vertices, visibility,
//! nodes, texinfo, faces, lighting, clipnodes, leaves, marksurfaces, edges, surfedges and models.
//!
//! ## Entities
//!
//! Lump 0 holds the level entity data as NUL-terminated text made of `{ "key" "value" ... }`
//! blocks. See `parse::entities`.
//!
//! ## Textures
//!
//! The textures are preceded by a 32-bit integer count and a list of 32-bit integer offsets. The
//! offsets are given in bytes from the beginning of the texture lump; an offset of `-1` marks an
//! unused slot.
//!
//! Each texture is a 16-byte name, a 32-bit width and height, and 4 mipmap offsets relative to
//! the start of the texture. Most textures store zero offsets and no pixels: their data lives in
//! the WAD files listed by the worldspawn entity. Textures that do embed their pixels follow the
//! last mipmap with a 16-bit color count and a 256-color palette.
//!
//! ## Nodes
//!
//! Nodes are stored with a 32-bit integer plane ID denoting which plane splits the node. This is
//! followed by two 16-bit integers which point to the children in front and back of the plane. If
//! the high bit is set, the bitwise negation of the ID points to a leaf; if not, it points to
//! another internal node. The value `0xFFFF` means there is no child.
//!
//! ## Edges
//!
//! The edges are stored as a pair of 16-bit integer vertex IDs. Faces refer to them through the
//! surfedge list, whose signed entries give both the edge ID and the direction in which the face
//! boundary traverses it: positive entries run from the first vertex to the second, negative
//! entries the other way around.

mod load;
mod mesh;

use std::fmt;

use crate::{
    entity::Entity,
    error::FormatError,
    math::Axis,
    texture::MipTex,
};

use cgmath::Vector3;

pub use self::{
    load::{load, load_file},
    mesh::{build_meshes, resolve_textures, BspMeshes, BspModelMesh},
};

pub const VERSION: i32 = 30;

pub const MAX_HULLS: usize = 4;
pub const MAX_LIGHTSTYLES: usize = 4;
pub const NUM_AMBIENTS: usize = 4;

/// Node child value meaning "no child".
pub const NO_CHILD: u16 = 0xFFFF;

#[derive(Clone, Debug, PartialEq)]
pub struct BspPlane {
    pub normal: Vector3<f32>,
    pub dist: f32,

    /// The world axis this plane is perpendicular to, if any.
    pub axis: Option<Axis>,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum BspRenderNodeChild {
    Node(usize),
    Leaf(usize),
    Empty,
}

impl BspRenderNodeChild {
    pub fn from_u16(child: u16) -> BspRenderNodeChild {
        match child {
            NO_CHILD => BspRenderNodeChild::Empty,
            c if c & 0x8000 != 0 => BspRenderNodeChild::Leaf((!c) as usize),
            c => BspRenderNodeChild::Node(c as usize),
        }
    }
}

#[derive(Clone, Debug)]
pub struct BspRenderNode {
    pub plane_id: usize,
    pub children: [BspRenderNodeChild; 2],
    pub min: [i16; 3],
    pub max: [i16; 3],
    pub face_id: usize,
    pub face_count: usize,
}

#[derive(Clone, Debug)]
pub struct BspTexInfo {
    pub s_vector: Vector3<f32>,
    pub s_offset: f32,
    pub t_vector: Vector3<f32>,
    pub t_offset: f32,
    pub tex_id: usize,

    /// Set for sky and liquid surfaces, which are not lightmapped.
    pub special: bool,
}

impl BspTexInfo {
    /// Returns the unnormalized texture coordinates of `point`.
    pub fn project(&self, point: Vector3<f32>) -> [f32; 2] {
        [
            point.x * self.s_vector.x
                + point.y * self.s_vector.y
                + point.z * self.s_vector.z
                + self.s_offset,
            point.x * self.t_vector.x
                + point.y * self.t_vector.y
                + point.z * self.t_vector.z
                + self.t_offset,
        ]
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum BspFaceSide {
    Front,
    Back,
}

#[derive(Clone, Debug)]
pub struct BspFace {
    pub plane_id: usize,
    pub side: BspFaceSide,
    pub edge_id: usize,
    pub edge_count: usize,
    pub texinfo_id: usize,
    pub light_styles: [u8; MAX_LIGHTSTYLES],
    pub lightmap_id: Option<usize>,
}

/// The contents of a leaf in the BSP tree, stored negated in the file.
#[derive(Copy, Clone, Debug, Eq, FromPrimitive, PartialEq)]
pub enum BspLeafContents {
    Empty = 1,
    Solid = 2,
    Water = 3,
    Slime = 4,
    Lava = 5,
    Sky = 6,
    Origin = 7,
    Clip = 8,
    Current0 = 9,
    Current90 = 10,
    Current180 = 11,
    Current270 = 12,
    CurrentUp = 13,
    CurrentDown = 14,
    Translucent = 15,
    Ladder = 16,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum BspCollisionNodeChild {
    Node(usize),
    Contents(BspLeafContents),
}

#[derive(Clone, Debug)]
pub struct BspCollisionNode {
    pub plane_id: usize,
    pub children: [BspCollisionNodeChild; 2],
}

#[derive(Clone, Debug)]
pub struct BspLeaf {
    pub contents: BspLeafContents,
    pub vis_offset: Option<usize>,
    pub min: [i16; 3],
    pub max: [i16; 3],
    pub facelist_id: usize,
    pub facelist_count: usize,
    pub sounds: [u8; NUM_AMBIENTS],
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct BspEdge {
    pub vertex_ids: [u16; 2],
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum BspEdgeDirection {
    Forward = 0,
    Backward = 1,
}

/// A surfedge: an edge ID together with the direction the face boundary runs along it.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct BspEdgeIndex {
    pub direction: BspEdgeDirection,
    pub index: usize,
}

impl BspEdgeIndex {
    pub fn from_i32(surfedge: i32) -> BspEdgeIndex {
        if surfedge < 0 {
            BspEdgeIndex {
                direction: BspEdgeDirection::Backward,
                index: (surfedge as i64).abs() as usize,
            }
        } else {
            BspEdgeIndex {
                direction: BspEdgeDirection::Forward,
                index: surfedge as usize,
            }
        }
    }

    /// Returns the edge's vertex IDs in the order the face boundary visits them.
    pub fn directed(&self, edge: &BspEdge) -> [u16; 2] {
        let from = edge.vertex_ids[self.direction as usize];
        let to = edge.vertex_ids[1 - self.direction as usize];
        [from, to]
    }
}

#[derive(Clone, Debug)]
pub struct BspModel {
    pub min: Vector3<f32>,
    pub max: Vector3<f32>,
    pub origin: Vector3<f32>,

    /// Root of the render tree followed by the roots of the collision hulls.
    pub head_nodes: [i32; MAX_HULLS],
    pub leaf_count: usize,
    pub face_id: usize,
    pub face_count: usize,
}

/// The decoded contents of a BSP file.
///
/// Records refer to each other by index into the arrays held here. Indices are checked when the
/// records are used, not when they are decoded.
pub struct BspData {
    pub(crate) entities: Vec<Entity>,
    pub(crate) planes: Box<[BspPlane]>,
    pub(crate) textures: Box<[MipTex]>,
    pub(crate) vertices: Box<[Vector3<f32>]>,
    pub(crate) visibility: Box<[u8]>,
    pub(crate) render_nodes: Box<[BspRenderNode]>,
    pub(crate) texinfo: Box<[BspTexInfo]>,
    pub(crate) faces: Box<[BspFace]>,
    pub(crate) lightmaps: Box<[u8]>,
    pub(crate) collision_nodes: Box<[BspCollisionNode]>,
    pub(crate) leaves: Box<[BspLeaf]>,
    pub(crate) facelist: Box<[usize]>,
    pub(crate) edges: Box<[BspEdge]>,
    pub(crate) edgelist: Box<[BspEdgeIndex]>,
    pub(crate) models: Box<[BspModel]>,
}

impl fmt::Debug for BspData {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("BspData")
            .field("entities", &self.entities.len())
            .field("planes", &self.planes.len())
            .field("textures", &self.textures.len())
            .field("vertices", &self.vertices.len())
            .field("render_nodes", &self.render_nodes.len())
            .field("faces", &self.faces.len())
            .field("leaves", &self.leaves.len())
            .field("models", &self.models.len())
            .finish()
    }
}

fn checked<'a, T>(items: &'a [T], id: usize, what: &str) -> Result<&'a T, FormatError> {
    items
        .get(id)
        .ok_or_else(|| FormatError::bad_reference(what, id as i64, items.len()))
}

fn checked_range<'a, T>(
    items: &'a [T],
    start: usize,
    count: usize,
    what: &str,
) -> Result<&'a [T], FormatError> {
    match start.checked_add(count) {
        Some(end) if end <= items.len() => Ok(&items[start..end]),
        _ => Err(FormatError::bad_reference(
            what,
            start as i64 + count as i64 - 1,
            items.len(),
        )),
    }
}

impl BspData {
    pub fn entities(&self) -> &[Entity] {
        &self.entities
    }

    pub fn planes(&self) -> &[BspPlane] {
        &self.planes
    }

    pub fn textures(&self) -> &[MipTex] {
        &self.textures
    }

    pub fn vertices(&self) -> &[Vector3<f32>] {
        &self.vertices
    }

    pub fn visibility(&self) -> &[u8] {
        &self.visibility
    }

    pub fn render_nodes(&self) -> &[BspRenderNode] {
        &self.render_nodes
    }

    pub fn texinfo(&self) -> &[BspTexInfo] {
        &self.texinfo
    }

    pub fn faces(&self) -> &[BspFace] {
        &self.faces
    }

    pub fn lightmaps(&self) -> &[u8] {
        &self.lightmaps
    }

    pub fn collision_nodes(&self) -> &[BspCollisionNode] {
        &self.collision_nodes
    }

    pub fn leaves(&self) -> &[BspLeaf] {
        &self.leaves
    }

    pub fn facelist(&self) -> &[usize] {
        &self.facelist
    }

    pub fn edges(&self) -> &[BspEdge] {
        &self.edges
    }

    pub fn edgelist(&self) -> &[BspEdgeIndex] {
        &self.edgelist
    }

    pub fn models(&self) -> &[BspModel] {
        &self.models
    }

    /// Returns the texinfo of the given face.
    pub fn face_texinfo(&self, face_id: usize) -> Result<&BspTexInfo, FormatError> {
        let face = checked(&self.faces, face_id, "face")?;
        checked(&self.texinfo, face.texinfo_id, "texinfo")
    }

    /// Returns the vertex IDs of the given surfedge in traversal order.
    pub fn surfedge_vertices(&self, edgelist_id: usize) -> Result<[u16; 2], FormatError> {
        let surfedge = checked(&self.edgelist, edgelist_id, "surfedge")?;
        let edge = checked(&self.edges, surfedge.index, "edge")?;
        Ok(surfedge.directed(edge))
    }

    /// Returns the vertices of a face in counter-clockwise order.
    ///
    /// Face boundaries are stored clockwise, so the surfedges are walked backwards and each
    /// contributes the vertex its traversal ends on.
    pub fn face_vertices(&self, face_id: usize) -> Result<Vec<Vector3<f32>>, FormatError> {
        let face = checked(&self.faces, face_id, "face")?;
        checked_range(&self.edgelist, face.edge_id, face.edge_count, "surfedge")?;

        let mut vertices = Vec::with_capacity(face.edge_count);
        for edgelist_id in (face.edge_id..face.edge_id + face.edge_count).rev() {
            let [_, to] = self.surfedge_vertices(edgelist_id)?;
            vertices.push(*checked(&self.vertices, to as usize, "vertex")?);
        }

        Ok(vertices)
    }
}
