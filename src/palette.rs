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

//! 8-bit palette translation.

use std::io::Read;

use crate::{error::FormatError, util};

pub const PALETTE_COLORS: usize = 256;
pub const PALETTE_SIZE: usize = PALETTE_COLORS * 3;

/// A 256-entry RGB color table.
#[derive(Clone)]
pub struct Palette {
    rgb: [[u8; 3]; PALETTE_COLORS],
}

impl Palette {
    /// Builds a palette from 768 bytes of packed RGB triples.
    pub fn new(data: &[u8]) -> Result<Palette, FormatError> {
        let data = util::slice_at(data, 0, PALETTE_SIZE, "palette")?;

        let mut rgb = [[0; 3]; PALETTE_COLORS];
        for color in 0..PALETTE_COLORS {
            for component in 0..3 {
                rgb[color][component] = data[color * 3 + component];
            }
        }

        Ok(Palette { rgb })
    }

    /// Reads 768 bytes of packed RGB triples from `reader`.
    pub fn load<R>(reader: &mut R) -> Result<Palette, FormatError>
    where
        R: Read,
    {
        let mut data = [0u8; PALETTE_SIZE];
        reader.read_exact(&mut data)?;
        Palette::new(&data)
    }

    /// Returns the RGB value of the given palette entry.
    pub fn color(&self, index: u8) -> [u8; 3] {
        self.rgb[index as usize]
    }

    /// Translates a set of indices into a list of RGBA values.
    ///
    /// Every index byte becomes that entry's RGB value with a fixed alpha of `0xFF`. Since the
    /// palette always holds 256 entries, every possible index is valid.
    pub fn translate(&self, indices: &[u8]) -> Vec<u8> {
        let mut rgba = Vec::with_capacity(indices.len() * 4);
        for index in indices {
            rgba.extend_from_slice(&self.rgb[*index as usize]);
            rgba.push(0xFF);
        }

        rgba
    }
}

impl std::fmt::Debug for Palette {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "Palette {{ .. }}")
    }
}

/// Translates `indices` through `palette` into RGBA.
pub fn depalettize(indices: &[u8], palette: &Palette) -> Vec<u8> {
    palette.translate(indices)
}

/// Translates each mip level independently.
pub fn depalettize_mipmaps<M>(mipmaps: &[M], palette: &Palette) -> Vec<Vec<u8>>
where
    M: AsRef<[u8]>,
{
    mipmaps
        .iter()
        .map(|mip| palette.translate(mip.as_ref()))
        .collect()
}

#[cfg(test)]
pub(crate) mod test {
    use super::*;

    /// A palette where entry `i` is `(i, 255 - i, i / 2)`.
    pub fn gradient_palette() -> Palette {
        let mut data = Vec::with_capacity(PALETTE_SIZE);
        for i in 0..PALETTE_COLORS {
            data.push(i as u8);
            data.push(255 - i as u8);
            data.push((i / 2) as u8);
        }
        Palette::new(&data).unwrap()
    }

    #[test]
    fn test_translate() {
        let palette = gradient_palette();
        let indices = [0u8, 7, 255, 7];
        let rgba = depalettize(&indices, &palette);
        assert_eq!(rgba.len(), indices.len() * 4);

        for (i, index) in indices.iter().enumerate() {
            let c = palette.color(*index);
            assert_eq!(&rgba[i * 4..i * 4 + 4], &[c[0], c[1], c[2], 0xFF]);
        }
    }

    #[test]
    fn test_mipmaps_are_independent() {
        let palette = gradient_palette();
        let mips = vec![vec![1u8; 64], vec![2u8; 16], vec![3u8; 4], vec![4u8; 1]];
        let rgba = depalettize_mipmaps(&mips, &palette);

        assert_eq!(rgba.len(), 4);
        for (level, mip) in mips.iter().enumerate() {
            assert_eq!(rgba[level].len(), mip.len() * 4);
            let c = palette.color(level as u8 + 1);
            for px in rgba[level].chunks(4) {
                assert_eq!(px, &[c[0], c[1], c[2], 0xFF]);
            }
        }
    }

    #[test]
    fn test_short_palette() {
        assert!(Palette::new(&[0u8; 100]).is_err());
    }
}
