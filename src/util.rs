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

use std::io::Read;

use crate::error::FormatError;

use byteorder::{LittleEndian, ReadBytesExt};
use cgmath::Vector3;

/// Read a fixed-length, NUL-padded name field and convert it into a `String`.
///
/// Everything from the first zero byte onward is discarded. Names that use bytes outside of
/// UTF-8 are converted lossily.
pub fn read_fixed_name<R>(src: &mut R, len: usize) -> Result<String, FormatError>
where
    R: Read,
{
    let mut bytes = vec![0u8; len];
    src.read_exact(&mut bytes)?;
    Ok(fixed_name(&bytes))
}

/// Convert a NUL-padded name field into a `String`.
pub fn fixed_name(bytes: &[u8]) -> String {
    let len = bytes.iter().position(|b| *b == 0).unwrap_or(bytes.len());
    String::from_utf8_lossy(&bytes[..len]).into_owned()
}

/// Returns the text preceding the first zero byte of `bytes`.
pub fn cstring_prefix(bytes: &[u8]) -> &[u8] {
    match bytes.iter().position(|b| *b == 0) {
        Some(n) => &bytes[..n],
        None => bytes,
    }
}

/// Returns `data[offset..offset + len]`, or a truncation error naming `what`.
pub fn slice_at<'a>(
    data: &'a [u8],
    offset: usize,
    len: usize,
    what: &str,
) -> Result<&'a [u8], FormatError> {
    match offset.checked_add(len) {
        Some(end) if end <= data.len() => Ok(&data[offset..end]),
        _ => Err(FormatError::truncated(format!(
            "{} ({} bytes at offset {}, only {} available)",
            what,
            len,
            offset,
            data.len()
        ))),
    }
}

/// Converts a signed count, index or offset read from a file into a `usize`.
pub fn non_negative(value: i64, what: &str) -> Result<usize, FormatError> {
    if value < 0 {
        return Err(FormatError::malformed(format!("negative {} ({})", what, value)));
    }

    Ok(value as usize)
}

/// Reads three little-endian `f32`s.
pub fn read_vector<R>(reader: &mut R) -> Result<Vector3<f32>, FormatError>
where
    R: ReadBytesExt,
{
    Ok(Vector3::new(
        reader.read_f32::<LittleEndian>()?,
        reader.read_f32::<LittleEndian>()?,
        reader.read_f32::<LittleEndian>()?,
    ))
}
