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

//! Mip-mapped textures, the missing-texture placeholder and name-based texture resolution.

use std::{io::Cursor, rc::Rc};

use crate::{
    error::{FormatError, TextureNotFound},
    palette::{self, Palette, PALETTE_COLORS},
    util,
};

use byteorder::{LittleEndian, ReadBytesExt};

pub const MIPLEVELS: usize = 4;
pub const TEX_NAME_MAX: usize = 16;

// name + width + height + 4 mip offsets
const MIPTEX_HEADER_SIZE: usize = TEX_NAME_MAX + 4 + 4 + 4 * MIPLEVELS;
const MAX_TEXTURE_DIM: u32 = 4096;

const MISSING_SIZE: u32 = 16;
const MISSING_COLORS: [[u8; 4]; 2] = [[0xFF, 0x00, 0xFF, 0xFF], [0x00, 0x00, 0x00, 0xFF]];

lazy_static! {
    static ref MISSING_TEXTURE: Texture = {
        let mipmaps = (0..MIPLEVELS)
            .map(|level| {
                let size = MISSING_SIZE >> level;
                let half = size / 2;
                let mut rgba = Vec::with_capacity((size * size * 4) as usize);
                for y in 0..size {
                    for x in 0..size {
                        let cell = ((x / half) + (y / half)) as usize % 2;
                        rgba.extend_from_slice(&MISSING_COLORS[cell]);
                    }
                }
                rgba
            })
            .collect();

        Texture {
            name: String::new(),
            width: MISSING_SIZE,
            height: MISSING_SIZE,
            mipmaps,
        }
    };
}

/// A decoded RGBA texture with its mip chain.
#[derive(Clone, Debug, PartialEq)]
pub struct Texture {
    pub name: String,
    pub width: u32,
    pub height: u32,

    /// RGBA pixels for each mip level, largest first.
    pub mipmaps: Vec<Vec<u8>>,
}

impl Texture {
    /// Returns whether this texture has the dimensions and contents of the missing-texture
    /// placeholder.
    pub fn is_placeholder(&self) -> bool {
        self.width == MISSING_TEXTURE.width
            && self.height == MISSING_TEXTURE.height
            && self.mipmaps == MISSING_TEXTURE.mipmaps
    }
}

/// Returns the magenta and black checkerboard used wherever a texture can't be found.
///
/// The placeholder is 16x16 with four mip levels, each of which is a 2x2 checkerboard.
pub fn missing_texture() -> &'static Texture {
    &MISSING_TEXTURE
}

/// Returns a copy of the placeholder carrying the given texture name.
pub fn named_missing_texture<S>(name: S) -> Texture
where
    S: Into<String>,
{
    Texture {
        name: name.into(),
        ..MISSING_TEXTURE.clone()
    }
}

/// A paletted texture as stored in BSP texture lumps and WAD `0x43` lumps.
#[derive(Clone, Debug)]
pub struct MipTex {
    pub name: String,
    pub width: u32,
    pub height: u32,

    /// Palette indices for each mip level. Empty if the record carries no pixel data.
    pub mipmaps: Vec<Vec<u8>>,

    /// The palette following the last mip level, if present.
    pub palette: Option<Palette>,
}

impl MipTex {
    /// Returns whether this record embeds its own pixel data.
    pub fn has_pixels(&self) -> bool {
        !self.mipmaps.is_empty()
    }

    /// Depalettizes every mip level with the embedded palette.
    pub fn to_texture(&self) -> Option<Texture> {
        let palette = self.palette.as_ref()?;
        if !self.has_pixels() {
            return None;
        }

        Some(Texture {
            name: self.name.clone(),
            width: self.width,
            height: self.height,
            mipmaps: palette::depalettize_mipmaps(&self.mipmaps, palette),
        })
    }
}

/// Returns the number of pixels in the given mip level.
pub fn mip_size(width: u32, height: u32, level: usize) -> usize {
    (width as usize >> level) * (height as usize >> level)
}

/// Reads a miptex record from `data`, which starts at the record header.
///
/// All four mip offsets are relative to the start of the record. A record whose mip offsets are
/// all zero refers to a texture stored externally and is returned without pixels. If
/// `require_palette` is set, the `u16` color count and the palette following the last mip level
/// must be present; otherwise they are decoded only if the record has room for them.
pub fn read_miptex(data: &[u8], require_palette: bool) -> Result<MipTex, FormatError> {
    let header = util::slice_at(data, 0, MIPTEX_HEADER_SIZE, "miptex header")?;
    let mut reader = Cursor::new(header);

    let name = util::read_fixed_name(&mut reader, TEX_NAME_MAX)?;
    let width = reader.read_u32::<LittleEndian>()?;
    let height = reader.read_u32::<LittleEndian>()?;

    if width > MAX_TEXTURE_DIM || height > MAX_TEXTURE_DIM {
        return Err(FormatError::malformed(format!(
            "texture {} has dimensions {}x{}",
            name, width, height
        )));
    }

    let mut mip_offsets = [0usize; MIPLEVELS];
    for m in 0..MIPLEVELS {
        mip_offsets[m] = reader.read_u32::<LittleEndian>()? as usize;
    }

    if mip_offsets.iter().all(|o| *o == 0) {
        if require_palette {
            return Err(FormatError::malformed(format!(
                "texture {} has no pixel data",
                name
            )));
        }

        return Ok(MipTex {
            name,
            width,
            height,
            mipmaps: Vec::new(),
            palette: None,
        });
    }

    let mut mipmaps = Vec::with_capacity(MIPLEVELS);
    for m in 0..MIPLEVELS {
        let what = format!("mip level {} of {}", m, name);
        let mip = util::slice_at(data, mip_offsets[m], mip_size(width, height, m), &what)?;
        mipmaps.push(mip.to_vec());
    }

    let palette_ofs = mip_offsets[MIPLEVELS - 1] + mip_size(width, height, MIPLEVELS - 1);
    let palette = if require_palette || palette_ofs < data.len() {
        let mut reader = Cursor::new(util::slice_at(
            data,
            palette_ofs,
            2,
            &format!("palette size of {}", name),
        )?);
        let color_count = reader.read_u16::<LittleEndian>()? as usize;
        if color_count > PALETTE_COLORS {
            return Err(FormatError::malformed(format!(
                "texture {} has {} palette colors",
                name, color_count
            )));
        }

        let mut rest = util::slice_at(data, palette_ofs + 2, palette::PALETTE_SIZE, "palette")?;
        Some(Palette::load(&mut rest)?)
    } else {
        None
    };

    Ok(MipTex {
        name,
        width,
        height,
        mipmaps,
        palette,
    })
}

/// Looks up textures by name.
pub trait TextureResolver {
    fn resolve(&mut self, name: &str) -> Result<Rc<Texture>, TextureNotFound>;
}

impl<F> TextureResolver for F
where
    F: FnMut(&str) -> Result<Rc<Texture>, TextureNotFound>,
{
    fn resolve(&mut self, name: &str) -> Result<Rc<Texture>, TextureNotFound> {
        self(name)
    }
}

/// Resolves `name`, substituting the placeholder if no source has it.
pub fn resolve_or_missing(resolver: &mut dyn TextureResolver, name: &str) -> Rc<Texture> {
    match resolver.resolve(name) {
        Ok(t) => t,
        Err(e) => {
            warn!("{}, using placeholder", e);
            Rc::new(named_missing_texture(name))
        }
    }
}
