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
    io::{self, Cursor, Read},
    path::{Path, PathBuf},
};

use crate::{
    error::FormatError,
    lump::{self, Lump},
    mdl::{
        MdlBodyPart, MdlBone, MdlHeader, MdlMesh, MdlModel, MdlSubmodel, MdlTable, MdlTexture,
        TextureFlags, TriCmd, TriVertex, MAGIC, VERSION,
    },
    palette::{Palette, PALETTE_SIZE},
    util,
};

use byteorder::{LittleEndian, ReadBytesExt};
use failure::{Error, ResultExt};

pub(crate) const HEADER_SIZE: usize = 244;
pub(crate) const BONE_SIZE: usize = 112;
pub(crate) const TEXTURE_SIZE: usize = 80;
pub(crate) const BODY_PART_SIZE: usize = 76;
pub(crate) const MODEL_SIZE: usize = 112;
pub(crate) const MESH_SIZE: usize = 20;
const VERTEX_SIZE: usize = 12;

const NAME_SIZE: usize = 64;
const BONE_NAME_SIZE: usize = 32;

const MAX_BONES: usize = 128;
const MAX_TEXTURES: usize = 100;
const MAX_SKIN_FAMILIES: usize = 100;
const MAX_SKIN_REFS: usize = 100;
const MAX_BODY_PARTS: usize = 32;
const MAX_MODELS: usize = 32;
const MAX_MESHES: usize = 256;
const MAX_VERTICES: usize = 2048;
const MAX_TRIANGLES: usize = 20000;
const MAX_TEXTURE_DIM: u32 = 4096;

fn read_usize<R>(reader: &mut R, what: &str) -> Result<usize, FormatError>
where
    R: ReadBytesExt,
{
    util::non_negative(reader.read_i32::<LittleEndian>()? as i64, what)
}

/// Reads a `(count, offset)` pair.
fn read_table<R>(reader: &mut R, name: &str) -> Result<MdlTable, FormatError>
where
    R: ReadBytesExt,
{
    let count = read_usize(reader, &format!("{} count", name))?;
    let offset = read_usize(reader, &format!("{} offset", name))?;
    Ok(MdlTable { count, offset })
}

/// Reads every record of a table through `lump::read_records`.
fn read_table_records<T, F>(
    data: &[u8],
    table: &MdlTable,
    name: &str,
    record_size: usize,
    max: usize,
    read: F,
) -> Result<Vec<T>, FormatError>
where
    F: FnMut(&mut Cursor<&[u8]>) -> Result<T, FormatError>,
{
    lump::check_limit(name, table.count, max)?;
    let lump = Lump {
        offset: table.offset,
        size: table.count * record_size,
    };
    lump::read_records(data, &lump, name, record_size, max, read)
}

fn load_header(data: &[u8]) -> Result<MdlHeader, FormatError> {
    let mut reader = Cursor::new(util::slice_at(data, 0, HEADER_SIZE, "MDL header")?);

    let magic = reader.read_u32::<LittleEndian>()?;
    let version = reader.read_i32::<LittleEndian>()?;
    let name = util::read_fixed_name(&mut reader, NAME_SIZE)?;
    let length = read_usize(&mut reader, "file length")?;

    let eye_position = util::read_vector(&mut reader)?;
    let min = util::read_vector(&mut reader)?;
    let max = util::read_vector(&mut reader)?;
    let bbox_min = util::read_vector(&mut reader)?;
    let bbox_max = util::read_vector(&mut reader)?;
    let flags = reader.read_i32::<LittleEndian>()?;

    let bones = read_table(&mut reader, "bone")?;
    let bone_controllers = read_table(&mut reader, "bone controller")?;
    let hitboxes = read_table(&mut reader, "hitbox")?;
    let sequences = read_table(&mut reader, "sequence")?;
    let sequence_groups = read_table(&mut reader, "sequence group")?;
    let textures = read_table(&mut reader, "texture")?;
    let texture_data_offset = read_usize(&mut reader, "texture data offset")?;
    let skin_ref_count = read_usize(&mut reader, "skinref count")?;
    let skin_family_count = read_usize(&mut reader, "skin family count")?;
    let skin_offset = read_usize(&mut reader, "skin offset")?;
    let body_parts = read_table(&mut reader, "body part")?;
    let attachments = read_table(&mut reader, "attachment")?;
    let sound_table = reader.read_i32::<LittleEndian>()?;
    let sound_offset = reader.read_i32::<LittleEndian>()?;
    let sound_groups = read_table(&mut reader, "sound group")?;
    let transitions = read_table(&mut reader, "transition")?;

    Ok(MdlHeader {
        magic,
        version,
        name,
        length,
        eye_position,
        min,
        max,
        bbox_min,
        bbox_max,
        flags,
        bones,
        bone_controllers,
        hitboxes,
        sequences,
        sequence_groups,
        textures,
        texture_data_offset,
        skin_ref_count,
        skin_family_count,
        skin_offset,
        body_parts,
        attachments,
        sound_table,
        sound_offset,
        sound_groups,
        transitions,
    })
}

fn load_bone<R>(reader: &mut R) -> Result<MdlBone, FormatError>
where
    R: ReadBytesExt,
{
    let name = util::read_fixed_name(reader, BONE_NAME_SIZE)?;
    let parent = match reader.read_i32::<LittleEndian>()? {
        -1 => None,
        p => Some(util::non_negative(p as i64, "parent bone")?),
    };
    let flags = reader.read_i32::<LittleEndian>()?;

    let mut controllers = [0i32; 6];
    for c in controllers.iter_mut() {
        *c = reader.read_i32::<LittleEndian>()?;
    }

    let mut value = [0f32; 6];
    for v in value.iter_mut() {
        *v = reader.read_f32::<LittleEndian>()?;
    }

    let mut scale = [0f32; 6];
    for s in scale.iter_mut() {
        *s = reader.read_f32::<LittleEndian>()?;
    }

    Ok(MdlBone {
        name,
        parent,
        flags,
        controllers,
        value,
        scale,
    })
}

fn load_bones(data: &[u8], table: &MdlTable) -> Result<Vec<MdlBone>, FormatError> {
    let bones = read_table_records(data, table, "Bones", BONE_SIZE, MAX_BONES, |r| load_bone(r))?;

    for (i, bone) in bones.iter().enumerate() {
        if let Some(p) = bone.parent {
            if p >= i {
                return Err(FormatError::malformed(format!(
                    "bone {} ({}) has parent {}, which doesn't precede it",
                    i, bone.name, p
                )));
            }
        }
    }

    Ok(bones)
}

struct TextureRecord {
    name: String,
    flags: u32,
    width: u32,
    height: u32,
    offset: usize,
}

fn load_texture_record<R>(reader: &mut R) -> Result<TextureRecord, FormatError>
where
    R: ReadBytesExt,
{
    let name = util::read_fixed_name(reader, NAME_SIZE)?;
    let flags = reader.read_u32::<LittleEndian>()?;
    let width = reader.read_u32::<LittleEndian>()?;
    let height = reader.read_u32::<LittleEndian>()?;
    let offset = read_usize(reader, "texture data offset")?;

    Ok(TextureRecord {
        name,
        flags,
        width,
        height,
        offset,
    })
}

fn load_textures(data: &[u8], table: &MdlTable) -> Result<Vec<MdlTexture>, FormatError> {
    let records = read_table_records(
        data,
        table,
        "Textures",
        TEXTURE_SIZE,
        MAX_TEXTURES,
        |r| load_texture_record(r),
    )?;

    let mut textures = Vec::with_capacity(records.len());
    for record in records {
        if record.width > MAX_TEXTURE_DIM || record.height > MAX_TEXTURE_DIM {
            return Err(FormatError::malformed(format!(
                "texture {} has dimensions {}x{}",
                record.name, record.width, record.height
            )));
        }

        let pixel_count = record.width as usize * record.height as usize;
        let indices = util::slice_at(
            data,
            record.offset,
            pixel_count,
            &format!("pixels of {}", record.name),
        )?;
        let palette = Palette::new(util::slice_at(
            data,
            record.offset + pixel_count,
            PALETTE_SIZE,
            &format!("palette of {}", record.name),
        )?)?;

        let flags = TextureFlags::from_bits_truncate(record.flags);
        debug!(
            "Texture {: <20} {}x{} {:?}",
            record.name, record.width, record.height, flags
        );

        textures.push(MdlTexture {
            name: record.name,
            flags,
            width: record.width,
            height: record.height,
            indices: indices.to_vec(),
            palette,
        });
    }

    Ok(textures)
}

fn load_skins(data: &[u8], header: &MdlHeader) -> Result<Vec<Vec<usize>>, FormatError> {
    if header.skin_family_count == 0 || header.skin_ref_count == 0 {
        return Ok(Vec::new());
    }

    lump::check_limit("Skin families", header.skin_family_count, MAX_SKIN_FAMILIES)?;
    lump::check_limit("Skin references", header.skin_ref_count, MAX_SKIN_REFS)?;

    let size = header.skin_family_count * header.skin_ref_count * 2;
    let mut reader = Cursor::new(util::slice_at(data, header.skin_offset, size, "skin table")?);

    let mut skins = Vec::with_capacity(header.skin_family_count);
    for _ in 0..header.skin_family_count {
        let mut family = Vec::with_capacity(header.skin_ref_count);
        for _ in 0..header.skin_ref_count {
            family.push(util::non_negative(
                reader.read_i16::<LittleEndian>()? as i64,
                "skin texture",
            )?);
        }
        skins.push(family);
    }

    Ok(skins)
}

/// Reads a triangle command stream up to its zero terminator.
fn load_commands(
    data: &[u8],
    offset: usize,
    vertex_count: usize,
    normal_count: usize,
) -> Result<Vec<TriCmd>, FormatError> {
    let stream = data
        .get(offset..)
        .ok_or_else(|| FormatError::truncated(format!("triangle commands at offset {}", offset)))?;
    let mut reader = Cursor::new(stream);

    let mut commands = Vec::new();
    let mut total = 0;
    loop {
        let count = reader.read_i16::<LittleEndian>()? as i32;
        if count == 0 {
            break;
        }

        let len = count.abs() as usize;
        total += len;
        lump::check_limit("Triangle command vertices", total, MAX_TRIANGLES * 3)?;

        let mut vertices = Vec::with_capacity(len);
        for _ in 0..len {
            let vertex = util::non_negative(reader.read_i16::<LittleEndian>()? as i64, "vertex")?;
            let normal = util::non_negative(reader.read_i16::<LittleEndian>()? as i64, "normal")?;
            let s = reader.read_i16::<LittleEndian>()?;
            let t = reader.read_i16::<LittleEndian>()?;

            if vertex >= vertex_count {
                return Err(FormatError::bad_reference("vertex", vertex as i64, vertex_count));
            }

            if normal >= normal_count {
                return Err(FormatError::bad_reference("normal", normal as i64, normal_count));
            }

            vertices.push(TriVertex {
                vertex,
                normal,
                s,
                t,
            });
        }

        commands.push(if count < 0 {
            TriCmd::Fan(vertices)
        } else {
            TriCmd::Strip(vertices)
        });
    }

    Ok(commands)
}

struct MeshRecord {
    triangle_count: usize,
    command_offset: usize,
    skin_ref: usize,
}

fn load_mesh_record<R>(reader: &mut R) -> Result<MeshRecord, FormatError>
where
    R: ReadBytesExt,
{
    let triangle_count = read_usize(reader, "triangle count")?;
    let command_offset = read_usize(reader, "triangle command offset")?;
    let skin_ref = read_usize(reader, "skinref")?;

    // per-mesh normal range, unused since normals are indexed per submodel
    reader.read_i32::<LittleEndian>()?;
    reader.read_i32::<LittleEndian>()?;

    Ok(MeshRecord {
        triangle_count,
        command_offset,
        skin_ref,
    })
}

struct SubmodelRecord {
    name: String,
    kind: i32,
    bounding_radius: f32,
    meshes: MdlTable,
    vertices: MdlTable,
    vertex_info_offset: usize,
    normals: MdlTable,
}

fn load_submodel_record<R>(reader: &mut R) -> Result<SubmodelRecord, FormatError>
where
    R: ReadBytesExt,
{
    let name = util::read_fixed_name(reader, NAME_SIZE)?;
    let kind = reader.read_i32::<LittleEndian>()?;
    let bounding_radius = reader.read_f32::<LittleEndian>()?;
    let meshes = read_table(reader, "mesh")?;

    let vertex_count = read_usize(reader, "vertex count")?;
    let vertex_info_offset = read_usize(reader, "vertex info offset")?;
    let vertex_offset = read_usize(reader, "vertex offset")?;

    let normal_count = read_usize(reader, "normal count")?;
    let _normal_info_offset = read_usize(reader, "normal info offset")?;
    let normal_offset = read_usize(reader, "normal offset")?;

    // vertex groups are never written by the compiler
    let _groups = read_table(reader, "vertex group")?;

    Ok(SubmodelRecord {
        name,
        kind,
        bounding_radius,
        meshes,
        vertices: MdlTable {
            count: vertex_count,
            offset: vertex_offset,
        },
        vertex_info_offset,
        normals: MdlTable {
            count: normal_count,
            offset: normal_offset,
        },
    })
}

fn load_submodel(
    data: &[u8],
    record: SubmodelRecord,
    bone_count: usize,
) -> Result<MdlSubmodel, FormatError> {
    let vertices = read_table_records(
        data,
        &record.vertices,
        "Vertices",
        VERTEX_SIZE,
        MAX_VERTICES,
        |r| util::read_vector(r),
    )?;

    let vertex_bones: Vec<usize> = util::slice_at(
        data,
        record.vertex_info_offset,
        vertices.len(),
        &format!("vertex bones of {}", record.name),
    )?
    .iter()
    .map(|b| *b as usize)
    .collect();

    if let Some(bone) = vertex_bones.iter().find(|b| **b >= bone_count) {
        return Err(FormatError::bad_reference("bone", *bone as i64, bone_count));
    }

    let normals = read_table_records(
        data,
        &record.normals,
        "Normals",
        VERTEX_SIZE,
        MAX_VERTICES,
        |r| util::read_vector(r),
    )?;

    let mesh_records = read_table_records(
        data,
        &record.meshes,
        "Meshes",
        MESH_SIZE,
        MAX_MESHES,
        |r| load_mesh_record(r),
    )?;

    let mut meshes = Vec::with_capacity(mesh_records.len());
    for mesh in mesh_records {
        let commands = load_commands(data, mesh.command_offset, vertices.len(), normals.len())?;
        meshes.push(MdlMesh {
            skin_ref: mesh.skin_ref,
            triangle_count: mesh.triangle_count,
            commands,
        });
    }

    Ok(MdlSubmodel {
        name: record.name,
        kind: record.kind,
        bounding_radius: record.bounding_radius,
        vertices,
        vertex_bones,
        normals,
        meshes,
    })
}

struct BodyPartRecord {
    name: String,
    base: i32,
    models: MdlTable,
}

fn load_body_part_record<R>(reader: &mut R) -> Result<BodyPartRecord, FormatError>
where
    R: ReadBytesExt,
{
    let name = util::read_fixed_name(reader, NAME_SIZE)?;
    let model_count = read_usize(reader, "model count")?;
    let base = reader.read_i32::<LittleEndian>()?;
    let model_offset = read_usize(reader, "model offset")?;

    Ok(BodyPartRecord {
        name,
        base,
        models: MdlTable {
            count: model_count,
            offset: model_offset,
        },
    })
}

fn load_body_parts(
    data: &[u8],
    table: &MdlTable,
    bone_count: usize,
) -> Result<Vec<MdlBodyPart>, FormatError> {
    let records = read_table_records(
        data,
        table,
        "Body parts",
        BODY_PART_SIZE,
        MAX_BODY_PARTS,
        |r| load_body_part_record(r),
    )?;

    let mut body_parts = Vec::with_capacity(records.len());
    for record in records {
        let submodel_records = read_table_records(
            data,
            &record.models,
            "Models",
            MODEL_SIZE,
            MAX_MODELS,
            |r| load_submodel_record(r),
        )?;

        let mut models = Vec::with_capacity(submodel_records.len());
        for submodel in submodel_records {
            models.push(load_submodel(data, submodel, bone_count)?);
        }

        body_parts.push(MdlBodyPart {
            name: record.name,
            base: record.base,
            models,
        });
    }

    Ok(body_parts)
}

/// Decodes a studio model.
///
/// A wrong magic number or version is logged but doesn't stop decoding. Record tables must lie
/// within `data` and stay within the engine's limits, and all vertex and bone references must be
/// in range.
pub fn load(data: &[u8]) -> Result<MdlModel, FormatError> {
    let header = load_header(data)?;

    if header.magic != MAGIC {
        warn!(
            "Bad MDL magic number (found 0x{:08x}, expected 0x{:08x})",
            header.magic, MAGIC
        );
    }

    if header.version != VERSION {
        warn!(
            "Unexpected MDL version (found {}, expected {})",
            header.version, VERSION
        );
    }

    let bones = load_bones(data, &header.bones)?;
    let textures = load_textures(data, &header.textures)?;
    let skins = load_skins(data, &header)?;
    let body_parts = load_body_parts(data, &header.body_parts, bones.len())?;

    debug!(
        "Model {}: {} bones, {} textures, {} skin families, {} body parts",
        header.name,
        bones.len(),
        textures.len(),
        skins.len(),
        body_parts.len()
    );

    let skin_ref_count = if skins.is_empty() {
        0
    } else {
        header.skin_ref_count
    };

    Ok(MdlModel {
        header,
        bones,
        textures,
        skin_ref_count,
        skins,
        body_parts,
    })
}

/// Returns the path of the texture file belonging to the model at `path`.
///
/// The last four characters (normally `.mdl`) are replaced with `t.mdl`, so `foo.mdl` becomes
/// `foot.mdl`.
pub fn fallback_texture_path<P>(path: P) -> PathBuf
where
    P: AsRef<Path>,
{
    let path = path.as_ref().to_string_lossy();
    let stem = match path.char_indices().rev().nth(3) {
        Some((i, _)) => &path[..i],
        None => "",
    };

    PathBuf::from(format!("{}t.mdl", stem))
}

/// Loads the model at `path`, reading files through `read`.
///
/// If the model has no textures of its own, they are loaded from the file named by
/// `fallback_texture_path` and merged in, along with that file's skin table when the model has
/// none. The texture file is loaded by the same rule, so a textureless texture file falls back
/// again, and a missing file anywhere along the chain is an error naming that file.
pub fn load_with<P, F>(path: P, mut read: F) -> Result<MdlModel, Error>
where
    P: AsRef<Path>,
    F: FnMut(&Path) -> io::Result<Vec<u8>>,
{
    load_with_reader(path.as_ref(), &mut read)
}

fn load_with_reader(
    path: &Path,
    read: &mut dyn FnMut(&Path) -> io::Result<Vec<u8>>,
) -> Result<MdlModel, Error> {
    let data = read(path).with_context(|_| format!("Failed to read {}", path.display()))?;
    let mut model = load(&data).with_context(|_| format!("Failed to load {}", path.display()))?;

    if model.textures.is_empty() {
        let texture_path = fallback_texture_path(path);
        info!(
            "{} has no textures, loading them from {}",
            path.display(),
            texture_path.display()
        );

        let texture_model = load_with_reader(&texture_path, read)?;
        model.textures = texture_model.textures;
        if model.skins.is_empty() {
            model.skins = texture_model.skins;
            model.skin_ref_count = texture_model.skin_ref_count;
        }
    }

    Ok(model)
}

pub fn load_file<P>(path: P) -> Result<MdlModel, Error>
where
    P: AsRef<Path>,
{
    load_with(path, |p| {
        let mut data = Vec::new();
        fs::File::open(p)?.read_to_end(&mut data)?;
        Ok(data)
    })
}
