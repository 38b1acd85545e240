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

use std::{
    fs,
    io::{Cursor, Read},
    path::Path,
};

use crate::{
    bsp::{
        BspCollisionNode, BspCollisionNodeChild, BspData, BspEdge, BspEdgeIndex, BspFace,
        BspFaceSide, BspLeaf, BspLeafContents, BspModel, BspPlane, BspRenderNode,
        BspRenderNodeChild, BspTexInfo, MAX_HULLS, MAX_LIGHTSTYLES, NUM_AMBIENTS, VERSION,
    },
    error::{FormatError, FormatErrorKind},
    lump::{self, Lump},
    math::Axis,
    parse,
    texture::{self, MipTex},
    util,
};

use byteorder::{LittleEndian, ReadBytesExt};
use failure::Error;
use num::FromPrimitive;

const MAX_MODELS: usize = 400;
const MAX_LEAVES: usize = 8192;

const MAX_ENTSTRING: usize = 128 * 1024;
const MAX_PLANES: usize = 32767;
const MAX_RENDER_NODES: usize = 32767;
const MAX_COLLISION_NODES: usize = 32767;
const MAX_VERTICES: usize = 65535;
const MAX_FACES: usize = 65535;
const MAX_FACELIST: usize = 65535;
const MAX_TEXINFO: usize = 8192;
const MAX_EDGES: usize = 256000;
const MAX_EDGELIST: usize = 512000;
const MAX_TEXTURES: usize = 512;
const MAX_TEXTURE_LUMP: usize = 0x200000;
const MAX_LIGHTMAP: usize = 0x200000;
const MAX_VISLIST: usize = 0x200000;

const PLANE_SIZE: usize = 20;
const RENDER_NODE_SIZE: usize = 24;
const LEAF_SIZE: usize = 28;
const TEXINFO_SIZE: usize = 40;
const FACE_SIZE: usize = 20;
const COLLISION_NODE_SIZE: usize = 8;
const FACELIST_SIZE: usize = 2;
const EDGE_SIZE: usize = 4;
const EDGELIST_SIZE: usize = 4;
const MODEL_SIZE: usize = 64;
const VERTEX_SIZE: usize = 12;

pub(crate) const HEADER_SIZE: usize = 4 + 8 * BspLumpId::Count as usize;

#[derive(Copy, Clone, Debug)]
pub(crate) enum BspLumpId {
    Entities = 0,
    Planes = 1,
    Textures = 2,
    Vertices = 3,
    Visibility = 4,
    RenderNodes = 5,
    TextureInfo = 6,
    Faces = 7,
    Lightmaps = 8,
    CollisionNodes = 9,
    Leaves = 10,
    FaceList = 11,
    Edges = 12,
    EdgeList = 13,
    Models = 14,
    Count = 15,
}

const LUMP_IDS: [BspLumpId; BspLumpId::Count as usize] = [
    BspLumpId::Entities,
    BspLumpId::Planes,
    BspLumpId::Textures,
    BspLumpId::Vertices,
    BspLumpId::Visibility,
    BspLumpId::RenderNodes,
    BspLumpId::TextureInfo,
    BspLumpId::Faces,
    BspLumpId::Lightmaps,
    BspLumpId::CollisionNodes,
    BspLumpId::Leaves,
    BspLumpId::FaceList,
    BspLumpId::Edges,
    BspLumpId::EdgeList,
    BspLumpId::Models,
];

fn read_bounds<R>(reader: &mut R) -> Result<([i16; 3], [i16; 3]), FormatError>
where
    R: ReadBytesExt,
{
    let mut bounds = [0i16; 6];
    for b in bounds.iter_mut() {
        *b = reader.read_i16::<LittleEndian>()?;
    }

    Ok((
        [bounds[0], bounds[1], bounds[2]],
        [bounds[3], bounds[4], bounds[5]],
    ))
}

fn load_plane<R>(reader: &mut R) -> Result<BspPlane, FormatError>
where
    R: ReadBytesExt,
{
    let normal = util::read_vector(reader)?;
    let dist = reader.read_f32::<LittleEndian>()?;
    let axis = Axis::from_i32(reader.read_i32::<LittleEndian>()?);

    Ok(BspPlane { normal, dist, axis })
}

fn load_render_node<R>(reader: &mut R) -> Result<BspRenderNode, FormatError>
where
    R: ReadBytesExt,
{
    let plane_id = util::non_negative(reader.read_i32::<LittleEndian>()? as i64, "plane id")?;

    let front = BspRenderNodeChild::from_u16(reader.read_u16::<LittleEndian>()?);
    let back = BspRenderNodeChild::from_u16(reader.read_u16::<LittleEndian>()?);
    let (min, max) = read_bounds(reader)?;

    let face_id = reader.read_u16::<LittleEndian>()? as usize;
    let face_count = reader.read_u16::<LittleEndian>()? as usize;

    Ok(BspRenderNode {
        plane_id,
        children: [front, back],
        min,
        max,
        face_id,
        face_count,
    })
}

fn load_texinfo<R>(reader: &mut R) -> Result<BspTexInfo, FormatError>
where
    R: ReadBytesExt,
{
    let s_vector = util::read_vector(reader)?;
    let s_offset = reader.read_f32::<LittleEndian>()?;
    let t_vector = util::read_vector(reader)?;
    let t_offset = reader.read_f32::<LittleEndian>()?;

    let tex_id = util::non_negative(reader.read_i32::<LittleEndian>()? as i64, "texture id")?;
    let special = reader.read_i32::<LittleEndian>()? & 1 != 0;

    Ok(BspTexInfo {
        s_vector,
        s_offset,
        t_vector,
        t_offset,
        tex_id,
        special,
    })
}

fn load_face<R>(reader: &mut R) -> Result<BspFace, FormatError>
where
    R: ReadBytesExt,
{
    let plane_id = reader.read_u16::<LittleEndian>()? as usize;

    let side = match reader.read_i16::<LittleEndian>()? {
        0 => BspFaceSide::Front,
        1 => BspFaceSide::Back,
        s => return Err(FormatError::malformed(format!("face side {}", s))),
    };

    let edge_id = util::non_negative(reader.read_i32::<LittleEndian>()? as i64, "surfedge id")?;
    let edge_count =
        util::non_negative(reader.read_i16::<LittleEndian>()? as i64, "surfedge count")?;
    let texinfo_id = util::non_negative(reader.read_i16::<LittleEndian>()? as i64, "texinfo id")?;

    let mut light_styles = [0u8; MAX_LIGHTSTYLES];
    reader.read_exact(&mut light_styles)?;

    let lightmap_id = match reader.read_i32::<LittleEndian>()? {
        o if o < 0 => None,
        o => Some(o as usize),
    };

    Ok(BspFace {
        plane_id,
        side,
        edge_id,
        edge_count,
        texinfo_id,
        light_styles,
        lightmap_id,
    })
}

fn load_contents(value: i32) -> Result<BspLeafContents, FormatError> {
    BspLeafContents::from_i32(-value)
        .ok_or_else(|| FormatError::malformed(format!("leaf contents {}", value)))
}

fn load_collision_node<R>(reader: &mut R) -> Result<BspCollisionNode, FormatError>
where
    R: ReadBytesExt,
{
    let plane_id = util::non_negative(reader.read_i32::<LittleEndian>()? as i64, "plane id")?;

    let mut children = [BspCollisionNodeChild::Node(0); 2];
    for child in children.iter_mut() {
        *child = match reader.read_i16::<LittleEndian>()? {
            c if c < 0 => BspCollisionNodeChild::Contents(load_contents(c as i32)?),
            c => BspCollisionNodeChild::Node(c as usize),
        };
    }

    Ok(BspCollisionNode { plane_id, children })
}

fn load_leaf<R>(reader: &mut R) -> Result<BspLeaf, FormatError>
where
    R: ReadBytesExt,
{
    let contents = load_contents(reader.read_i32::<LittleEndian>()?)?;

    let vis_offset = match reader.read_i32::<LittleEndian>()? {
        o if o < 0 => None,
        o => Some(o as usize),
    };

    let (min, max) = read_bounds(reader)?;

    let facelist_id = reader.read_u16::<LittleEndian>()? as usize;
    let facelist_count = reader.read_u16::<LittleEndian>()? as usize;

    let mut sounds = [0u8; NUM_AMBIENTS];
    reader.read_exact(&mut sounds)?;

    Ok(BspLeaf {
        contents,
        vis_offset,
        min,
        max,
        facelist_id,
        facelist_count,
        sounds,
    })
}

fn load_model<R>(reader: &mut R) -> Result<BspModel, FormatError>
where
    R: ReadBytesExt,
{
    let min = util::read_vector(reader)?;
    let max = util::read_vector(reader)?;
    let origin = util::read_vector(reader)?;

    let mut head_nodes = [0i32; MAX_HULLS];
    for h in head_nodes.iter_mut() {
        *h = reader.read_i32::<LittleEndian>()?;
    }

    let leaf_count = util::non_negative(reader.read_i32::<LittleEndian>()? as i64, "leaf count")?;
    let face_id = util::non_negative(reader.read_i32::<LittleEndian>()? as i64, "face id")?;
    let face_count = util::non_negative(reader.read_i32::<LittleEndian>()? as i64, "face count")?;

    Ok(BspModel {
        min,
        max,
        origin,
        head_nodes,
        leaf_count,
        face_id,
        face_count,
    })
}

fn load_textures(data: &[u8]) -> Result<Vec<MipTex>, FormatError> {
    if data.is_empty() {
        return Ok(Vec::new());
    }

    let mut reader = Cursor::new(data);
    let count = reader.read_u32::<LittleEndian>()? as usize;
    lump::check_limit("Textures", count, MAX_TEXTURES)?;

    let mut offsets = Vec::with_capacity(count);
    for _ in 0..count {
        offsets.push(reader.read_i32::<LittleEndian>()?);
    }

    let mut textures = Vec::with_capacity(count);
    for (i, ofs) in offsets.into_iter().enumerate() {
        if ofs < 0 {
            debug!("Texture slot {} is unused", i);
            textures.push(MipTex {
                name: String::new(),
                width: 0,
                height: 0,
                mipmaps: Vec::new(),
                palette: None,
            });
            continue;
        }

        let miptex_data = data.get(ofs as usize..).ok_or_else(|| {
            FormatError::truncated(format!("texture {} at offset {}", i, ofs))
        })?;
        let miptex = texture::read_miptex(miptex_data, false)?;
        debug!(
            "Texture {: >3}: {: <16} {}x{}{}",
            i,
            miptex.name,
            miptex.width,
            miptex.height,
            if miptex.has_pixels() { " (embedded)" } else { "" }
        );
        textures.push(miptex);
    }

    Ok(textures)
}

/// Decodes a BSP file.
///
/// The entity lump is parsed and every record lump is decoded. Lumps must be whole numbers of
/// records, lie within `data` and stay within the engine's limits.
pub fn load(data: &[u8]) -> Result<BspData, FormatError> {
    let mut reader = Cursor::new(util::slice_at(data, 0, HEADER_SIZE, "BSP header")?);

    let version = reader.read_i32::<LittleEndian>()?;
    if version != VERSION {
        return Err(FormatErrorKind::UnsupportedVersion {
            found: version,
            expected: VERSION,
        }
        .into());
    }

    let mut lumps = Vec::with_capacity(BspLumpId::Count as usize);
    for id in LUMP_IDS.iter() {
        let lump = Lump::read(&mut reader)?;

        debug!(
            "{: <14} Offset = 0x{:>08x} | Size = 0x{:>08x}",
            format!("{:?}:", id),
            lump.offset,
            lump.size
        );

        lumps.push(lump);
    }

    let lump_at = |id: BspLumpId| &lumps[id as usize];

    let ent_lump = lump_at(BspLumpId::Entities);
    lump::check_limit("Entity data", ent_lump.size, MAX_ENTSTRING)?;
    let ent_data = util::cstring_prefix(ent_lump.data(data, "Entities")?);
    let entities = parse::entities(&String::from_utf8_lossy(ent_data))?;

    let planes = lump::read_records(
        data,
        lump_at(BspLumpId::Planes),
        "Planes",
        PLANE_SIZE,
        MAX_PLANES,
        |r| load_plane(r),
    )?;

    let tex_lump = lump_at(BspLumpId::Textures);
    lump::check_limit("Texture data", tex_lump.size, MAX_TEXTURE_LUMP)?;
    let textures = load_textures(tex_lump.data(data, "Textures")?)?;

    let vertices = lump::read_records(
        data,
        lump_at(BspLumpId::Vertices),
        "Vertices",
        VERTEX_SIZE,
        MAX_VERTICES,
        |r| util::read_vector(r),
    )?;

    let vis_lump = lump_at(BspLumpId::Visibility);
    lump::check_limit("Visibility data", vis_lump.size, MAX_VISLIST)?;
    let visibility = vis_lump.data(data, "Visibility")?;

    let render_nodes = lump::read_records(
        data,
        lump_at(BspLumpId::RenderNodes),
        "Nodes",
        RENDER_NODE_SIZE,
        MAX_RENDER_NODES,
        |r| load_render_node(r),
    )?;

    let texinfo = lump::read_records(
        data,
        lump_at(BspLumpId::TextureInfo),
        "Texinfo",
        TEXINFO_SIZE,
        MAX_TEXINFO,
        |r| load_texinfo(r),
    )?;

    let faces = lump::read_records(
        data,
        lump_at(BspLumpId::Faces),
        "Faces",
        FACE_SIZE,
        MAX_FACES,
        |r| load_face(r),
    )?;

    let light_lump = lump_at(BspLumpId::Lightmaps);
    lump::check_limit("Lighting data", light_lump.size, MAX_LIGHTMAP)?;
    let lightmaps = light_lump.data(data, "Lighting")?;

    let collision_nodes = lump::read_records(
        data,
        lump_at(BspLumpId::CollisionNodes),
        "Clipnodes",
        COLLISION_NODE_SIZE,
        MAX_COLLISION_NODES,
        |r| load_collision_node(r),
    )?;

    let leaves = lump::read_records(
        data,
        lump_at(BspLumpId::Leaves),
        "Leaves",
        LEAF_SIZE,
        MAX_LEAVES,
        |r| load_leaf(r),
    )?;

    let facelist = lump::read_records(
        data,
        lump_at(BspLumpId::FaceList),
        "Marksurfaces",
        FACELIST_SIZE,
        MAX_FACELIST,
        |r| Ok(r.read_u16::<LittleEndian>()? as usize),
    )?;

    let edges = lump::read_records(
        data,
        lump_at(BspLumpId::Edges),
        "Edges",
        EDGE_SIZE,
        MAX_EDGES,
        |r| {
            Ok(BspEdge {
                vertex_ids: [
                    r.read_u16::<LittleEndian>()?,
                    r.read_u16::<LittleEndian>()?,
                ],
            })
        },
    )?;

    let edgelist = lump::read_records(
        data,
        lump_at(BspLumpId::EdgeList),
        "Surfedges",
        EDGELIST_SIZE,
        MAX_EDGELIST,
        |r| Ok(BspEdgeIndex::from_i32(r.read_i32::<LittleEndian>()?)),
    )?;

    let models = lump::read_records(
        data,
        lump_at(BspLumpId::Models),
        "Models",
        MODEL_SIZE,
        MAX_MODELS,
        |r| load_model(r),
    )?;

    if models.is_empty() {
        return Err(FormatError::malformed(
            "no brush models (need at least 1 for the world)",
        ));
    }

    Ok(BspData {
        entities,
        planes: planes.into_boxed_slice(),
        textures: textures.into_boxed_slice(),
        vertices: vertices.into_boxed_slice(),
        visibility: visibility.to_vec().into_boxed_slice(),
        render_nodes: render_nodes.into_boxed_slice(),
        texinfo: texinfo.into_boxed_slice(),
        faces: faces.into_boxed_slice(),
        lightmaps: lightmaps.to_vec().into_boxed_slice(),
        collision_nodes: collision_nodes.into_boxed_slice(),
        leaves: leaves.into_boxed_slice(),
        facelist: facelist.into_boxed_slice(),
        edges: edges.into_boxed_slice(),
        edgelist: edgelist.into_boxed_slice(),
        models: models.into_boxed_slice(),
    })
}

pub fn load_file<P>(path: P) -> Result<BspData, Error>
where
    P: AsRef<Path>,
{
    let mut data = Vec::new();
    fs::File::open(path)?.read_to_end(&mut data)?;
    Ok(load(&data)?)
}

#[cfg(test)]
pub(crate) mod test {
    use super::*;
    use crate::texture::test::miptex_bytes;
    use byteorder::WriteBytesExt;
    use std::io::Write;

    /// Raw lump contents from which a BSP file is assembled.
    #[derive(Default)]
    pub struct BspFixture {
        pub version: i32,
        pub lumps: Vec<Vec<u8>>,
    }

    impl BspFixture {
        pub fn new() -> BspFixture {
            BspFixture {
                version: VERSION,
                lumps: vec![Vec::new(); BspLumpId::Count as usize],
            }
        }

        pub fn lump(&mut self, id: BspLumpId) -> &mut Vec<u8> {
            &mut self.lumps[id as usize]
        }

        pub fn plane(&mut self, normal: [f32; 3], dist: f32, kind: i32) {
            let l = self.lump(BspLumpId::Planes);
            for c in normal.iter() {
                l.write_f32::<LittleEndian>(*c).unwrap();
            }
            l.write_f32::<LittleEndian>(dist).unwrap();
            l.write_i32::<LittleEndian>(kind).unwrap();
        }

        pub fn vertex(&mut self, v: [f32; 3]) {
            let l = self.lump(BspLumpId::Vertices);
            for c in v.iter() {
                l.write_f32::<LittleEndian>(*c).unwrap();
            }
        }

        pub fn node(&mut self, plane: i32, children: [u16; 2], face_id: u16, face_count: u16) {
            let l = self.lump(BspLumpId::RenderNodes);
            l.write_i32::<LittleEndian>(plane).unwrap();
            l.write_u16::<LittleEndian>(children[0]).unwrap();
            l.write_u16::<LittleEndian>(children[1]).unwrap();
            for b in [-8i16, -8, -8, 8, 8, 8].iter() {
                l.write_i16::<LittleEndian>(*b).unwrap();
            }
            l.write_u16::<LittleEndian>(face_id).unwrap();
            l.write_u16::<LittleEndian>(face_count).unwrap();
        }

        pub fn texinfo(&mut self, s: [f32; 4], t: [f32; 4], tex_id: i32) {
            let l = self.lump(BspLumpId::TextureInfo);
            for c in s.iter().chain(t.iter()) {
                l.write_f32::<LittleEndian>(*c).unwrap();
            }
            l.write_i32::<LittleEndian>(tex_id).unwrap();
            l.write_i32::<LittleEndian>(0).unwrap();
        }

        pub fn face(&mut self, edge_id: i32, edge_count: i16, texinfo: i16) {
            let l = self.lump(BspLumpId::Faces);
            l.write_u16::<LittleEndian>(0).unwrap();
            l.write_i16::<LittleEndian>(0).unwrap();
            l.write_i32::<LittleEndian>(edge_id).unwrap();
            l.write_i16::<LittleEndian>(edge_count).unwrap();
            l.write_i16::<LittleEndian>(texinfo).unwrap();
            l.write_all(&[0, 255, 255, 255]).unwrap();
            l.write_i32::<LittleEndian>(-1).unwrap();
        }

        pub fn leaf(&mut self, contents: i32, facelist_id: u16, facelist_count: u16) {
            let l = self.lump(BspLumpId::Leaves);
            l.write_i32::<LittleEndian>(contents).unwrap();
            l.write_i32::<LittleEndian>(-1).unwrap();
            for b in [-8i16, -8, -8, 8, 8, 8].iter() {
                l.write_i16::<LittleEndian>(*b).unwrap();
            }
            l.write_u16::<LittleEndian>(facelist_id).unwrap();
            l.write_u16::<LittleEndian>(facelist_count).unwrap();
            l.write_all(&[0; NUM_AMBIENTS]).unwrap();
        }

        pub fn marksurface(&mut self, face: u16) {
            self.lump(BspLumpId::FaceList)
                .write_u16::<LittleEndian>(face)
                .unwrap();
        }

        pub fn edge(&mut self, a: u16, b: u16) {
            let l = self.lump(BspLumpId::Edges);
            l.write_u16::<LittleEndian>(a).unwrap();
            l.write_u16::<LittleEndian>(b).unwrap();
        }

        pub fn surfedge(&mut self, surfedge: i32) {
            self.lump(BspLumpId::EdgeList)
                .write_i32::<LittleEndian>(surfedge)
                .unwrap();
        }

        pub fn model(&mut self, head_node: i32, face_id: i32, face_count: i32) {
            let l = self.lump(BspLumpId::Models);
            for c in [-8.0f32, -8.0, -8.0, 8.0, 8.0, 8.0, 0.0, 0.0, 0.0].iter() {
                l.write_f32::<LittleEndian>(*c).unwrap();
            }
            for h in [head_node, 0, 0, 0].iter() {
                l.write_i32::<LittleEndian>(*h).unwrap();
            }
            l.write_i32::<LittleEndian>(1).unwrap();
            l.write_i32::<LittleEndian>(face_id).unwrap();
            l.write_i32::<LittleEndian>(face_count).unwrap();
        }

        pub fn textures(&mut self, miptexes: &[Vec<u8>]) {
            let l = self.lump(BspLumpId::Textures);
            l.write_u32::<LittleEndian>(miptexes.len() as u32).unwrap();
            let mut ofs = 4 + 4 * miptexes.len();
            for m in miptexes {
                l.write_i32::<LittleEndian>(ofs as i32).unwrap();
                ofs += m.len();
            }
            for m in miptexes {
                l.write_all(m).unwrap();
            }
        }

        pub fn build(&self) -> Vec<u8> {
            let mut out = Vec::new();
            out.write_i32::<LittleEndian>(self.version).unwrap();

            let mut ofs = HEADER_SIZE;
            for l in self.lumps.iter() {
                out.write_u32::<LittleEndian>(ofs as u32).unwrap();
                out.write_u32::<LittleEndian>(l.len() as u32).unwrap();
                ofs += l.len();
            }

            for l in self.lumps.iter() {
                out.write_all(l).unwrap();
            }

            out
        }
    }

    /// A single 16x16 square face in the z = 0 plane, reachable from the world model through one
    /// empty leaf.
    ///
    /// With `reversed_edges`, every edge is stored back to front and referenced by a negative
    /// surfedge, which describes the same boundary.
    pub fn square_bsp(reversed_edges: bool) -> BspFixture {
        let mut bsp = BspFixture::new();
        bsp.lump(BspLumpId::Entities)
            .extend_from_slice(b"{\n\"classname\" \"worldspawn\"\n\"wad\" \"test.wad\"\n}\n\0");

        bsp.plane([0.0, 0.0, 1.0], 0.0, 2);

        bsp.vertex([0.0, 0.0, 0.0]);
        bsp.vertex([16.0, 0.0, 0.0]);
        bsp.vertex([16.0, 16.0, 0.0]);
        bsp.vertex([0.0, 16.0, 0.0]);

        // edge 0 can't be referenced with a negative sign
        bsp.edge(0, 0);
        for i in 0..4u16 {
            let (a, b) = (i, (i + 1) % 4);
            if reversed_edges {
                bsp.edge(b, a);
                bsp.surfedge(-(i as i32 + 1));
            } else {
                bsp.edge(a, b);
                bsp.surfedge(i as i32 + 1);
            }
        }

        let mut external = miptex_bytes("square", 16, 16, 0, false);
        external.truncate(40);
        for b in external[24..].iter_mut() {
            *b = 0;
        }
        bsp.textures(&[external]);

        bsp.texinfo([1.0, 0.0, 0.0, 0.0], [0.0, 1.0, 0.0, 0.0], 0);
        bsp.face(0, 4, 0);

        bsp.leaf(-2, 0, 0);
        bsp.leaf(-1, 0, 1);
        bsp.marksurface(0);

        bsp.node(0, [!1u16, 0xFFFF], 0, 1);
        bsp.model(0, 0, 1);

        bsp
    }

    #[test]
    fn test_record_counts() {
        let fixture = square_bsp(false);
        let bsp = load(&fixture.build()).unwrap();

        let counts = [
            (BspLumpId::Planes, bsp.planes().len(), PLANE_SIZE),
            (BspLumpId::Vertices, bsp.vertices().len(), VERTEX_SIZE),
            (BspLumpId::RenderNodes, bsp.render_nodes().len(), RENDER_NODE_SIZE),
            (BspLumpId::TextureInfo, bsp.texinfo().len(), TEXINFO_SIZE),
            (BspLumpId::Faces, bsp.faces().len(), FACE_SIZE),
            (BspLumpId::Leaves, bsp.leaves().len(), LEAF_SIZE),
            (BspLumpId::FaceList, bsp.facelist().len(), FACELIST_SIZE),
            (BspLumpId::Edges, bsp.edges().len(), EDGE_SIZE),
            (BspLumpId::EdgeList, bsp.edgelist().len(), EDGELIST_SIZE),
            (BspLumpId::Models, bsp.models().len(), MODEL_SIZE),
        ];

        for (id, count, size) in counts.iter() {
            assert_eq!(*count, fixture.lumps[*id as usize].len() / size, "{:?}", id);
        }

        assert_eq!(bsp.vertices().len(), 4);
        assert_eq!(bsp.edges().len(), 5);
        assert_eq!(bsp.planes()[0].axis, Some(Axis::Z));
        assert_eq!(bsp.leaves()[0].contents, BspLeafContents::Solid);
        assert_eq!(bsp.leaves()[1].contents, BspLeafContents::Empty);
        assert_eq!(bsp.leaves()[1].vis_offset, None);
        assert_eq!(
            bsp.render_nodes()[0].children,
            [BspRenderNodeChild::Leaf(1), BspRenderNodeChild::Empty]
        );
        assert_eq!(bsp.faces()[0].lightmap_id, None);
        assert_eq!(bsp.textures()[0].name, "square");
        assert!(!bsp.textures()[0].has_pixels());
        assert_eq!(bsp.entities()[0].get("wad"), Some("test.wad"));
    }

    #[test]
    fn test_version_gate() {
        let mut fixture = square_bsp(false);
        for version in [29, 31, -30, 0].iter() {
            fixture.version = *version;
            match load(&fixture.build()).unwrap_err().kind() {
                FormatErrorKind::UnsupportedVersion { found, expected } => {
                    assert_eq!(found, *version);
                    assert_eq!(expected, 30);
                }
                k => panic!("unexpected kind {:?}", k),
            }
        }
    }

    #[test]
    fn test_misaligned_lump() {
        let mut fixture = square_bsp(false);
        fixture.lump(BspLumpId::Planes).push(0);
        match load(&fixture.build()).unwrap_err().kind() {
            FormatErrorKind::MisalignedLump {
                size, record_size, ..
            } => {
                assert_eq!(size, 21);
                assert_eq!(record_size, PLANE_SIZE);
            }
            k => panic!("unexpected kind {:?}", k),
        }
    }

    #[test]
    fn test_truncated_file() {
        let data = square_bsp(false).build();
        match load(&data[..data.len() - 1]).unwrap_err().kind() {
            FormatErrorKind::Truncated { .. } => (),
            k => panic!("unexpected kind {:?}", k),
        }

        match load(&data[..HEADER_SIZE - 4]).unwrap_err().kind() {
            FormatErrorKind::Truncated { .. } => (),
            k => panic!("unexpected kind {:?}", k),
        }
    }

    #[test]
    fn test_texture_limit() {
        let mut fixture = square_bsp(false);
        let l = fixture.lump(BspLumpId::Textures);
        l.clear();
        l.write_u32::<LittleEndian>(MAX_TEXTURES as u32 + 1).unwrap();
        match load(&fixture.build()).unwrap_err().kind() {
            FormatErrorKind::LimitExceeded { count, max, .. } => {
                assert_eq!(count, 513);
                assert_eq!(max, 512);
            }
            k => panic!("unexpected kind {:?}", k),
        }
    }

    #[test]
    fn test_unused_texture_slot() {
        let mut fixture = square_bsp(false);
        let l = fixture.lump(BspLumpId::Textures);
        l.clear();
        l.write_u32::<LittleEndian>(2).unwrap();
        l.write_i32::<LittleEndian>(-1).unwrap();
        l.write_i32::<LittleEndian>(12).unwrap();
        l.extend(miptex_bytes("lit", 16, 16, 1, true));

        let bsp = load(&fixture.build()).unwrap();
        assert_eq!(bsp.textures().len(), 2);
        assert_eq!(bsp.textures()[0].name, "");
        assert!(bsp.textures()[1].has_pixels());
        assert!(bsp.textures()[1].palette.is_some());
    }

    #[test]
    fn test_bad_leaf_contents() {
        let mut fixture = square_bsp(false);
        fixture.lump(BspLumpId::Leaves)[0] = 0xE0;
        match load(&fixture.build()).unwrap_err().kind() {
            FormatErrorKind::Malformed { .. } => (),
            k => panic!("unexpected kind {:?}", k),
        }
    }
}
