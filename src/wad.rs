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

//! WAD2/WAD3 texture archives.

use std::{
    collections::HashMap,
    fs,
    io::{Cursor, Read, Seek, SeekFrom},
    path::Path,
    rc::Rc,
};

use crate::{
    entity::{self, Entity},
    error::{FormatError, FormatErrorKind, TextureNotFound},
    texture::{self, MipTex, Texture, TextureResolver, TEX_NAME_MAX},
    util,
};

use byteorder::{LittleEndian, ReadBytesExt};
use failure::Error;

// see definition of lumpinfo_t in wad.h
const LUMPINFO_SIZE: usize = 32;
const HEADER_SIZE: usize = 12;
const MAX_LUMPS: usize = 65536;

const MAGIC_WAD2: u32 = 'W' as u32 | ('A' as u32) << 8 | ('D' as u32) << 16 | ('2' as u32) << 24;
const MAGIC_WAD3: u32 = 'W' as u32 | ('A' as u32) << 8 | ('D' as u32) << 16 | ('3' as u32) << 24;

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum WadVersion {
    Wad2,
    Wad3,
}

/// The type tag of a WAD directory entry.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum WadLumpKind {
    Palette,
    Pic,
    MipTex,
    Font,
    Other(u8),
}

impl WadLumpKind {
    pub fn from_u8(kind: u8) -> WadLumpKind {
        match kind {
            0x40 => WadLumpKind::Palette,
            0x42 => WadLumpKind::Pic,
            0x43 => WadLumpKind::MipTex,
            0x46 => WadLumpKind::Font,
            k => WadLumpKind::Other(k),
        }
    }
}

#[derive(Clone, Debug)]
pub struct WadEntry {
    pub name: String,
    pub offset: usize,
    pub disk_size: usize,
    pub size: usize,
    pub kind: WadLumpKind,
    pub compression: u8,
}

impl WadEntry {
    /// Compares `name` against this entry's name the way the engine does: case-sensitively, up
    /// to the first 16 bytes.
    pub fn name_matches(&self, name: &str) -> bool {
        let a = self.name.as_bytes();
        let b = name.as_bytes();
        a[..a.len().min(TEX_NAME_MAX)] == b[..b.len().min(TEX_NAME_MAX)]
    }
}

/// A decoded WAD directory together with the archive's bytes.
///
/// Lumps are only interpreted on request. Texture lumps are decoded by `read_texture`; every
/// other lump type is available as raw bytes through `lump_data`.
#[derive(Debug)]
pub struct Wad {
    version: WadVersion,
    entries: Vec<WadEntry>,
    data: Box<[u8]>,
}

impl Wad {
    pub fn load(data: &[u8]) -> Result<Wad, FormatError> {
        let mut reader = Cursor::new(util::slice_at(data, 0, HEADER_SIZE, "WAD header")?);

        let version = match reader.read_u32::<LittleEndian>()? {
            MAGIC_WAD2 => WadVersion::Wad2,
            MAGIC_WAD3 => WadVersion::Wad3,
            found => return Err(FormatErrorKind::BadMagic { found }.into()),
        };

        let lump_count = reader.read_i32::<LittleEndian>()?;
        let dir_ofs = reader.read_i32::<LittleEndian>()?;
        if lump_count < 0 || dir_ofs < 0 {
            return Err(FormatError::malformed(format!(
                "WAD directory has {} entries at offset {}",
                lump_count, dir_ofs
            )));
        }

        let lump_count = lump_count as usize;
        if lump_count > MAX_LUMPS {
            return Err(FormatErrorKind::LimitExceeded {
                what: String::from("WAD lumps"),
                count: lump_count,
                max: MAX_LUMPS,
            }
            .into());
        }

        debug!(
            "{:?} with {} lumps, directory at {}",
            version, lump_count, dir_ofs
        );

        let mut reader = Cursor::new(data);
        reader.seek(SeekFrom::Start(dir_ofs as u64))?;
        util::slice_at(
            data,
            dir_ofs as usize,
            lump_count * LUMPINFO_SIZE,
            "WAD directory",
        )?;

        let mut entries = Vec::with_capacity(lump_count);
        for _ in 0..lump_count {
            let offset = reader.read_i32::<LittleEndian>()?;
            let disk_size = reader.read_i32::<LittleEndian>()?;
            let size = reader.read_i32::<LittleEndian>()?;
            let kind = WadLumpKind::from_u8(reader.read_u8()?);
            let compression = reader.read_u8()?;
            let _pad = reader.read_u16::<LittleEndian>()?;
            let name = util::read_fixed_name(&mut reader, TEX_NAME_MAX)?;

            if offset < 0 || disk_size < 0 || size < 0 {
                return Err(FormatError::malformed(format!(
                    "WAD entry {} has offset {}, size {}",
                    name, offset, disk_size
                )));
            }

            util::slice_at(data, offset as usize, disk_size as usize, &name)?;

            entries.push(WadEntry {
                name,
                offset: offset as usize,
                disk_size: disk_size as usize,
                size: size as usize,
                kind,
                compression,
            });
        }

        Ok(Wad {
            version,
            entries,
            data: data.to_vec().into_boxed_slice(),
        })
    }

    pub fn load_file<P>(path: P) -> Result<Wad, Error>
    where
        P: AsRef<Path>,
    {
        let mut data = Vec::new();
        fs::File::open(path)?.read_to_end(&mut data)?;
        Ok(Wad::load(&data)?)
    }

    pub fn version(&self) -> WadVersion {
        self.version
    }

    pub fn entries(&self) -> &[WadEntry] {
        &self.entries
    }

    /// Returns the raw bytes of a directory entry.
    pub fn lump_data(&self, entry: &WadEntry) -> &[u8] {
        &self.data[entry.offset..entry.offset + entry.disk_size]
    }

    /// Finds the first texture entry with the given name. No lump data is examined.
    pub fn find_texture(&self, name: &str) -> Option<&WadEntry> {
        self.entries
            .iter()
            .find(|e| e.kind == WadLumpKind::MipTex && e.name_matches(name))
    }

    /// Decodes a texture lump, including its palette.
    pub fn read_texture(&self, entry: &WadEntry) -> Result<MipTex, FormatError> {
        if entry.kind != WadLumpKind::MipTex {
            return Err(FormatError::malformed(format!(
                "WAD entry {} is a {:?} lump",
                entry.name, entry.kind
            )));
        }

        if entry.compression != 0 {
            return Err(FormatError::malformed(format!(
                "WAD entry {} uses compression type {}",
                entry.name, entry.compression
            )));
        }

        texture::read_miptex(self.lump_data(entry), true)
    }

    /// Finds and decodes the texture with the given name.
    pub fn texture(&self, name: &str) -> Option<Result<MipTex, FormatError>> {
        self.find_texture(name).map(|e| self.read_texture(e))
    }
}

/// An ordered set of WADs searched for textures, plus the textures decoded from them so far.
///
/// Lookups scan the WADs in the order they were added and decode only the first lump whose name
/// matches. Decoded textures are kept for the lifetime of the cache.
#[derive(Debug, Default)]
pub struct WadCache {
    wads: Vec<(String, Wad)>,
    textures: HashMap<String, Rc<Texture>>,
    decoded: usize,
}

impl WadCache {
    pub fn new() -> WadCache {
        WadCache::default()
    }

    pub fn add_wad<S>(&mut self, name: S, wad: Wad)
    where
        S: Into<String>,
    {
        self.wads.push((name.into(), wad));
    }

    pub fn wad_names(&self) -> impl Iterator<Item = &str> {
        self.wads.iter().map(|(n, _)| n.as_str())
    }

    pub fn len(&self) -> usize {
        self.wads.len()
    }

    pub fn is_empty(&self) -> bool {
        self.wads.is_empty()
    }

    /// Loads each WAD named in `names` through `read`.
    ///
    /// WADs that can't be read or decoded are logged and skipped. Returns the number of WADs
    /// added.
    pub fn load_wad_list<S, F>(&mut self, names: &[S], mut read: F) -> usize
    where
        S: AsRef<str>,
        F: FnMut(&str) -> Result<Vec<u8>, Error>,
    {
        let mut added = 0;
        for name in names {
            let name = name.as_ref();
            let wad = read(name).and_then(|data| Wad::load(&data).map_err(Error::from));
            match wad {
                Ok(w) => {
                    debug!("Loaded {} ({} lumps)", name, w.entries().len());
                    self.add_wad(name, w);
                    added += 1;
                }
                Err(e) => warn!("Couldn't load {}: {}", name, e),
            }
        }

        added
    }

    /// Loads the WADs listed in the `"wad"` key of `worldspawn`.
    pub fn load_worldspawn_wads<F>(&mut self, worldspawn: &Entity, read: F) -> usize
    where
        F: FnMut(&str) -> Result<Vec<u8>, Error>,
    {
        let names = entity::wad_list(worldspawn);
        self.load_wad_list(&names, read)
    }

    /// Returns the number of texture lumps decoded so far, including ones that failed to decode.
    pub fn decoded_count(&self) -> usize {
        self.decoded
    }

    /// Returns the named texture, decoding it on first use.
    pub fn lookup(&mut self, name: &str) -> Result<Rc<Texture>, TextureNotFound> {
        if let Some(t) = self.textures.get(name) {
            return Ok(t.clone());
        }

        let not_found = || TextureNotFound {
            name: name.to_owned(),
        };

        let (wad_name, wad, entry) = self
            .wads
            .iter()
            .find_map(|(n, w)| w.find_texture(name).map(|e| (n, w, e)))
            .ok_or_else(not_found)?;

        self.decoded += 1;
        let texture = match wad.read_texture(entry) {
            Ok(miptex) => miptex.to_texture().ok_or_else(not_found)?,
            Err(e) => {
                warn!("Texture {} in {} is corrupt: {}", name, wad_name, e);
                return Err(not_found());
            }
        };

        let texture = Rc::new(texture);
        self.textures.insert(name.to_owned(), texture.clone());
        Ok(texture)
    }
}

impl TextureResolver for WadCache {
    fn resolve(&mut self, name: &str) -> Result<Rc<Texture>, TextureNotFound> {
        self.lookup(name)
    }
}
