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

//! Fixed-record lump reading shared by the binary decoders.
//!
//! A lump is a contiguous `(offset, size)` region of a file holding either a raw blob or an array
//! of fixed-size records. Every lump is read with a single bounded slice of the file data.

use std::io::{Cursor, Read};

use crate::{
    error::{FormatError, FormatErrorKind},
    util,
};

use byteorder::{LittleEndian, ReadBytesExt};

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct Lump {
    pub offset: usize,
    pub size: usize,
}

impl Lump {
    /// Reads a lump directory entry stored as a pair of little-endian `u32`s.
    pub fn read<R>(reader: &mut R) -> Result<Lump, FormatError>
    where
        R: Read,
    {
        let offset = reader.read_u32::<LittleEndian>()? as usize;
        let size = reader.read_u32::<LittleEndian>()? as usize;
        Ok(Lump { offset, size })
    }

    /// Returns the bytes of this lump, or a truncation error if it extends past `data`.
    pub fn data<'a>(&self, data: &'a [u8], name: &str) -> Result<&'a [u8], FormatError> {
        util::slice_at(data, self.offset, self.size, &format!("{} lump", name))
    }

    /// Returns the number of `record_size` records in this lump.
    pub fn record_count(&self, name: &str, record_size: usize) -> Result<usize, FormatError> {
        if self.size % record_size != 0 {
            return Err(FormatErrorKind::MisalignedLump {
                lump: name.to_owned(),
                size: self.size,
                record_size,
            }
            .into());
        }

        Ok(self.size / record_size)
    }
}

/// Fails with `LimitExceeded` if `count` is greater than `max`.
pub fn check_limit(what: &str, count: usize, max: usize) -> Result<(), FormatError> {
    if count > max {
        return Err(FormatErrorKind::LimitExceeded {
            what: what.to_owned(),
            count,
            max,
        }
        .into());
    }

    Ok(())
}

/// Reads every record of a fixed-record lump.
///
/// The lump must be a whole number of records, must lie within `data`, and must not hold more
/// than `max` records. `read` is handed a cursor positioned at the start of each record in turn
/// and has to consume exactly `record_size` bytes.
pub fn read_records<T, F>(
    data: &[u8],
    lump: &Lump,
    name: &str,
    record_size: usize,
    max: usize,
    mut read: F,
) -> Result<Vec<T>, FormatError>
where
    F: FnMut(&mut Cursor<&[u8]>) -> Result<T, FormatError>,
{
    let count = lump.record_count(name, record_size)?;
    check_limit(name, count, max)?;
    let bytes = lump.data(data, name)?;

    debug!("{: <14} {} records", format!("{}:", name), count);

    let mut reader = Cursor::new(bytes);
    let mut records = Vec::with_capacity(count);
    for i in 0..count {
        let start = (i * record_size) as u64;
        reader.set_position(start);
        records.push(read(&mut reader)?);

        if reader.position() != start + record_size as u64 {
            return Err(FormatError::malformed(format!(
                "{} record {} read misaligned",
                name, i
            )));
        }
    }

    Ok(records)
}

#[cfg(test)]
mod test {
    use super::*;

    fn u16_lump(data: &[u8], lump: &Lump, max: usize) -> Result<Vec<u16>, FormatError> {
        read_records(data, lump, "Test", 2, max, |r| Ok(r.read_u16::<LittleEndian>()?))
    }

    #[test]
    fn test_record_count() {
        let data = [0u8, 0, 1, 0, 2, 0, 3, 0];
        let lump = Lump { offset: 2, size: 6 };
        assert_eq!(u16_lump(&data, &lump, 16).unwrap(), vec![1, 2, 3]);
    }

    #[test]
    fn test_misaligned_lump() {
        let data = [0u8; 8];
        let lump = Lump { offset: 0, size: 5 };
        match u16_lump(&data, &lump, 16).unwrap_err().kind() {
            FormatErrorKind::MisalignedLump {
                size, record_size, ..
            } => {
                assert_eq!(size, 5);
                assert_eq!(record_size, 2);
            }
            k => panic!("unexpected kind {:?}", k),
        }
    }

    #[test]
    fn test_lump_out_of_bounds() {
        let data = [0u8; 8];
        let lump = Lump { offset: 4, size: 6 };
        match u16_lump(&data, &lump, 16).unwrap_err().kind() {
            FormatErrorKind::Truncated { .. } => (),
            k => panic!("unexpected kind {:?}", k),
        }
    }

    #[test]
    fn test_limit_exceeded() {
        let data = [0u8; 8];
        let lump = Lump { offset: 0, size: 8 };
        match u16_lump(&data, &lump, 3).unwrap_err().kind() {
            FormatErrorKind::LimitExceeded { count, max, .. } => {
                assert_eq!(count, 4);
                assert_eq!(max, 3);
            }
            k => panic!("unexpected kind {:?}", k),
        }
    }

    #[test]
    fn test_short_record_read_is_malformed() {
        let data = [0u8; 8];
        let lump = Lump { offset: 0, size: 8 };
        let result = read_records(&data, &lump, "Test", 4, 16, |r| {
            Ok(r.read_u16::<LittleEndian>()?)
        });
        match result.unwrap_err().kind() {
            FormatErrorKind::Malformed { .. } => (),
            k => panic!("unexpected kind {:?}", k),
        }
    }
}
