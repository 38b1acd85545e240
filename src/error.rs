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
    convert::From,
    fmt::{self, Display},
    io,
};

use failure::{Backtrace, Context, Fail};

/// An error encountered while decoding one of the supported asset formats.
///
/// Decoding errors are fatal for the file being loaded: no partially decoded data is ever
/// returned alongside one.
#[derive(Debug)]
pub struct FormatError {
    inner: Context<FormatErrorKind>,
}

impl FormatError {
    pub fn kind(&self) -> FormatErrorKind {
        self.inner.get_context().clone()
    }

    pub(crate) fn truncated<S>(what: S) -> FormatError
    where
        S: Into<String>,
    {
        FormatErrorKind::Truncated { what: what.into() }.into()
    }

    pub(crate) fn malformed<S>(what: S) -> FormatError
    where
        S: Into<String>,
    {
        FormatErrorKind::Malformed { what: what.into() }.into()
    }

    pub(crate) fn bad_reference<S>(what: S, index: i64, count: usize) -> FormatError
    where
        S: Into<String>,
    {
        FormatErrorKind::BadReference {
            what: what.into(),
            index,
            count,
        }
        .into()
    }
}

impl From<FormatErrorKind> for FormatError {
    fn from(kind: FormatErrorKind) -> Self {
        FormatError {
            inner: Context::new(kind),
        }
    }
}

impl From<Context<FormatErrorKind>> for FormatError {
    fn from(inner: Context<FormatErrorKind>) -> Self {
        FormatError { inner }
    }
}

impl From<io::Error> for FormatError {
    fn from(io_error: io::Error) -> Self {
        match io_error.kind() {
            io::ErrorKind::UnexpectedEof => io_error
                .context(FormatErrorKind::Truncated {
                    what: String::from("unexpected end of data"),
                })
                .into(),
            _ => io_error.context(FormatErrorKind::Io).into(),
        }
    }
}

impl Fail for FormatError {
    fn cause(&self) -> Option<&dyn Fail> {
        self.inner.cause()
    }

    fn backtrace(&self) -> Option<&Backtrace> {
        self.inner.backtrace()
    }
}

impl Display for FormatError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        Display::fmt(&self.inner, f)
    }
}

#[derive(Clone, Eq, PartialEq, Debug, Fail)]
pub enum FormatErrorKind {
    #[fail(display = "Unsupported version (found {}, expected {})", found, expected)]
    UnsupportedVersion { found: i32, expected: i32 },
    #[fail(display = "Bad magic number (found {:#010x})", found)]
    BadMagic { found: u32 },
    #[fail(
        display = "{} lump size {} is not a multiple of the record size {}",
        lump, size, record_size
    )]
    MisalignedLump {
        lump: String,
        size: usize,
        record_size: usize,
    },
    #[fail(display = "Truncated data: {}", what)]
    Truncated { what: String },
    #[fail(display = "{} count {} exceeds the limit of {}", what, count, max)]
    LimitExceeded {
        what: String,
        count: usize,
        max: usize,
    },
    #[fail(display = "Bad {} reference {} (only {} available)", what, index, count)]
    BadReference {
        what: String,
        index: i64,
        count: usize,
    },
    #[fail(display = "Malformed data: {}", what)]
    Malformed { what: String },
    #[fail(display = "I/O error")]
    Io,
}

/// A brush whose planes do not enclose a usable convex solid.
///
/// Callers are expected to skip the brush and keep loading the rest of the map.
#[derive(Clone, Debug, Eq, PartialEq, Fail)]
pub enum DegenerateBrushError {
    #[fail(display = "brush has {} planes, at least 4 are needed", _0)]
    TooFewPlanes(usize),
    #[fail(display = "plane {} has collinear defining points", _0)]
    DegeneratePlane(usize),
    #[fail(display = "brush planes enclose no volume")]
    NoVolume,
    #[fail(display = "brush produced only {} polygons", _0)]
    TooFewFaces(usize),
}

/// A texture name that could not be found in any of the searched sources.
#[derive(Clone, Debug, Eq, PartialEq, Fail)]
#[fail(display = "Texture not found: {}", name)]
pub struct TextureNotFound {
    pub name: String,
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_eof_is_truncated() {
        let err: FormatError = io::Error::new(io::ErrorKind::UnexpectedEof, "eof").into();
        match err.kind() {
            FormatErrorKind::Truncated { .. } => (),
            k => panic!("unexpected kind {:?}", k),
        }
    }

    #[test]
    fn test_other_io_is_io() {
        let err: FormatError = io::Error::new(io::ErrorKind::NotFound, "missing").into();
        assert_eq!(err.kind(), FormatErrorKind::Io);
        assert!(err.cause().is_some());
    }
}
