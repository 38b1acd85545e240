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

//! MAP source files: entities made of convex brushes.
//!
//! A brush is stored as the intersection of half-spaces. Each half-space is written as three
//! points on its boundary plane followed by texture alignment parameters, either in the classic
//! Quake form:
//!
//! ```text
//! ( -64 -64 -16 ) ( -64 -63 -16 ) ( -64 -64 -15 ) WALL01 0 0 0 1 1
//! ```
//!
//! or in the Valve 220 form, which spells out the texture axes:
//!
//! ```text
//! ( -64 -64 -16 ) ( -64 -63 -16 ) ( -64 -64 -15 ) WALL01 [ 0 1 0 0 ] [ 0 0 -1 0 ] 0 1 1
//! ```

pub mod brush;
pub mod mesh;

use std::{fs, io::Read, path::Path};

use crate::{
    entity::{self, Entity},
    error::FormatError,
    math::Hyperplane,
    parse,
};

use cgmath::Vector3;
use failure::Error;

pub use self::{
    brush::{brush_faces, BrushFace},
    mesh::{build_meshes, MapMesh},
};

/// Parameters for brush reconstruction.
#[derive(Clone, Debug)]
pub struct BrushOptions {
    /// Tolerance for the half-space and on-plane tests.
    pub epsilon: f64,

    /// Whether brush corners are rounded to the nearest integer coordinate.
    pub snap_to_integer: bool,
}

impl Default for BrushOptions {
    fn default() -> BrushOptions {
        BrushOptions {
            epsilon: 1e-4,
            snap_to_integer: true,
        }
    }
}

/// How a plane's texture is projected onto it.
#[derive(Clone, Debug, PartialEq)]
pub enum TextureAxes {
    /// Axes are chosen from the world axis most closely aligned with the plane normal.
    Standard { offset: [f64; 2] },

    /// Axes are given explicitly.
    Valve {
        s: Vector3<f64>,
        s_offset: f64,
        t: Vector3<f64>,
        t_offset: f64,
    },
}

#[derive(Clone, Debug, PartialEq)]
pub struct BrushPlane {
    pub points: [Vector3<f64>; 3],
    pub texture: String,
    pub axes: TextureAxes,
    pub rotation: f64,
    pub scale: [f64; 2],
}

impl BrushPlane {
    /// Returns the plane through this plane's three defining points, or `None` if they are
    /// collinear.
    pub fn hyperplane(&self) -> Option<Hyperplane> {
        Hyperplane::from_points(self.points[0], self.points[1], self.points[2])
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Brush {
    pub planes: Vec<BrushPlane>,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct MapEntity {
    pub attributes: Entity,
    pub brushes: Vec<Brush>,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Map {
    pub entities: Vec<MapEntity>,
}

impl Map {
    pub fn worldspawn(&self) -> Option<&MapEntity> {
        self.entities
            .iter()
            .find(|e| e.attributes.classname() == Some("worldspawn"))
    }

    /// Returns the WAD file names listed by the worldspawn entity.
    pub fn wad_list(&self) -> Vec<String> {
        match self.worldspawn() {
            Some(w) => entity::wad_list(&w.attributes),
            None => Vec::new(),
        }
    }

    pub fn brush_count(&self) -> usize {
        self.entities.iter().map(|e| e.brushes.len()).sum()
    }
}

/// Parses the text of a MAP file.
pub fn load(text: &str) -> Result<Map, FormatError> {
    let entities = parse::map::map_entities(text)?;
    let map = Map { entities };
    debug!(
        "Loaded map with {} entities and {} brushes",
        map.entities.len(),
        map.brush_count()
    );
    Ok(map)
}

pub fn load_file<P>(path: P) -> Result<Map, Error>
where
    P: AsRef<Path>,
{
    let mut text = String::new();
    fs::File::open(path)?.read_to_string(&mut text)?;
    Ok(load(&text)?)
}
