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

//! Half-Life studio model (`IDST`, version 10) file and data structure handling.
//!
//! # File Format
//!
//! The file begins with a 244-byte header holding the magic number, the version, the model name,
//! its bounds and a series of `(count, offset)` pairs locating the record tables in the rest of
//! the file. All offsets are relative to the start of the file.
//!
//! ## Textures
//!
//! Each texture record is a 64-byte name, a flag word, a width, a height and the offset of its
//! pixel data. The pixels are `width * height` palette indices followed directly by a 256-color
//! RGB palette. Models compiled with `$externaltextures` store no textures at all; they are kept
//! in a sibling file whose name ends in `t.mdl` instead, which is loaded by `load_with`.
//!
//! ## Skins
//!
//! The skin table is a `families x skinref` array of 16-bit texture indices. Meshes refer to
//! their texture by skinref, which the selected skin family maps to a texture.
//!
//! ## Geometry
//!
//! Body parts hold alternative submodels. Each submodel has a vertex table, a parallel table of
//! bone indices, and a list of meshes. A mesh is drawn by a stream of triangle commands: a signed
//! 16-bit count followed by that many `(vertex, normal, s, t)` tuples. A positive count starts a
//! triangle strip, a negative one a triangle fan, and zero ends the stream.

mod load;
mod mesh;

use std::fmt;

use crate::{
    palette::{self, Palette},
    texture::Texture,
};

use cgmath::Vector3;

pub use self::{
    load::{fallback_texture_path, load, load_file, load_with},
    mesh::{build_meshes, MdlMeshOptions, MdlMeshes, MdlSubmodelMesh},
};

pub const MAGIC: u32 = 0x5453_4449; // "IDST"
pub const VERSION: i32 = 10;

bitflags! {
    pub struct TextureFlags: u32 {
        const FLAT_SHADE = 0x0001;
        const CHROME     = 0x0002;
        const FULLBRIGHT = 0x0004;
        const NO_MIPS    = 0x0008;
        const ALPHA      = 0x0010;
        const ADDITIVE   = 0x0020;
        const MASKED     = 0x0040;
    }
}

/// The location of a record table within the file.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct MdlTable {
    pub count: usize,
    pub offset: usize,
}

#[derive(Clone, Debug)]
pub struct MdlHeader {
    pub magic: u32,
    pub version: i32,
    pub name: String,

    /// The file size recorded by the compiler.
    pub length: usize,

    pub eye_position: Vector3<f32>,

    /// Ideal movement hull.
    pub min: Vector3<f32>,
    pub max: Vector3<f32>,

    /// Clipping bounding box.
    pub bbox_min: Vector3<f32>,
    pub bbox_max: Vector3<f32>,

    pub flags: i32,

    pub bones: MdlTable,
    pub bone_controllers: MdlTable,
    pub hitboxes: MdlTable,
    pub sequences: MdlTable,
    pub sequence_groups: MdlTable,
    pub textures: MdlTable,
    pub texture_data_offset: usize,
    pub skin_ref_count: usize,
    pub skin_family_count: usize,
    pub skin_offset: usize,
    pub body_parts: MdlTable,
    pub attachments: MdlTable,
    pub sound_table: i32,
    pub sound_offset: i32,
    pub sound_groups: MdlTable,
    pub transitions: MdlTable,
}

#[derive(Clone, Debug)]
pub struct MdlBone {
    pub name: String,

    /// The parent bone, which always precedes this one. `None` for root bones.
    pub parent: Option<usize>,

    pub flags: i32,
    pub controllers: [i32; 6],

    /// Default position (`[0..3]`) and Euler rotation in radians (`[3..6]`).
    pub value: [f32; 6],
    pub scale: [f32; 6],
}

#[derive(Clone)]
pub struct MdlTexture {
    pub name: String,
    pub flags: TextureFlags,
    pub width: u32,
    pub height: u32,
    pub indices: Vec<u8>,
    pub palette: Palette,
}

impl MdlTexture {
    /// Converts this texture's palette indices to RGBA.
    pub fn to_texture(&self) -> Texture {
        Texture {
            name: self.name.clone(),
            width: self.width,
            height: self.height,
            mipmaps: vec![palette::depalettize(&self.indices, &self.palette)],
        }
    }
}

impl fmt::Debug for MdlTexture {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("MdlTexture")
            .field("name", &self.name)
            .field("flags", &self.flags)
            .field("width", &self.width)
            .field("height", &self.height)
            .finish()
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct TriVertex {
    pub vertex: usize,
    pub normal: usize,
    pub s: i16,
    pub t: i16,
}

/// A single triangle command.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum TriCmd {
    Fan(Vec<TriVertex>),
    Strip(Vec<TriVertex>),
}

impl TriCmd {
    pub fn vertices(&self) -> &[TriVertex] {
        match *self {
            TriCmd::Fan(ref v) | TriCmd::Strip(ref v) => v,
        }
    }

    /// Returns the triangles described by this command as triples of positions in `vertices()`.
    ///
    /// Fan triangles are `(0, i + 1, i)`. Strip triangles alternate between `(i, i + 1, i + 2)`
    /// and `(i, i + 2, i + 1)` so that every triangle keeps the same facing.
    pub fn triangles(&self) -> Vec<[usize; 3]> {
        let n = self.vertices().len();
        if n < 3 {
            return Vec::new();
        }

        match *self {
            TriCmd::Fan(_) => (1..n - 1).map(|i| [0, i + 1, i]).collect(),
            TriCmd::Strip(_) => (0..n - 2)
                .map(|i| {
                    if i % 2 == 1 {
                        [i, i + 2, i + 1]
                    } else {
                        [i, i + 1, i + 2]
                    }
                })
                .collect(),
        }
    }
}

#[derive(Clone, Debug)]
pub struct MdlMesh {
    pub skin_ref: usize,

    /// The triangle count recorded by the compiler.
    pub triangle_count: usize,
    pub commands: Vec<TriCmd>,
}

#[derive(Clone, Debug)]
pub struct MdlSubmodel {
    pub name: String,
    pub kind: i32,
    pub bounding_radius: f32,
    pub vertices: Vec<Vector3<f32>>,

    /// The bone each vertex is attached to.
    pub vertex_bones: Vec<usize>,
    pub normals: Vec<Vector3<f32>>,
    pub meshes: Vec<MdlMesh>,
}

#[derive(Clone, Debug)]
pub struct MdlBodyPart {
    pub name: String,
    pub base: i32,
    pub models: Vec<MdlSubmodel>,
}

#[derive(Debug)]
pub struct MdlModel {
    pub(crate) header: MdlHeader,
    pub(crate) bones: Vec<MdlBone>,
    pub(crate) textures: Vec<MdlTexture>,
    pub(crate) skin_ref_count: usize,
    pub(crate) skins: Vec<Vec<usize>>,
    pub(crate) body_parts: Vec<MdlBodyPart>,
}

impl MdlModel {
    pub fn header(&self) -> &MdlHeader {
        &self.header
    }

    pub fn name(&self) -> &str {
        &self.header.name
    }

    pub fn bones(&self) -> &[MdlBone] {
        &self.bones
    }

    pub fn textures(&self) -> &[MdlTexture] {
        &self.textures
    }

    /// Returns the skin families. Each family maps every skinref to a texture index.
    pub fn skins(&self) -> &[Vec<usize>] {
        &self.skins
    }

    pub fn skin_ref_count(&self) -> usize {
        self.skin_ref_count
    }

    pub fn body_parts(&self) -> &[MdlBodyPart] {
        &self.body_parts
    }

    /// Returns the texture index a mesh with the given skinref uses in the given skin family.
    ///
    /// Without a skin table, skinrefs index the textures directly. Unknown families fall back to
    /// family 0.
    pub fn skin_texture(&self, family: usize, skin_ref: usize) -> Option<usize> {
        let texture_id = match self.skins.get(family).or_else(|| self.skins.first()) {
            Some(row) => *row.get(skin_ref)?,
            None => skin_ref,
        };

        if texture_id < self.textures.len() {
            Some(texture_id)
        } else {
            None
        }
    }
}
