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

//! Half-Life asset decoding and mesh reconstruction.
//!
//! This crate reads the binary BSP (v30), MDL (`IDST`) and WAD (`WAD2`/`WAD3`) formats as well as
//! the textual MAP format, and turns their geometry into deduplicated, indexed vertex data ready
//! to be handed to a renderer.

#![deny(unused_must_use)]

#[macro_use]
extern crate bitflags;
extern crate byteorder;
extern crate cgmath;
#[cfg(test)]
extern crate env_logger;
#[macro_use]
extern crate failure;
#[macro_use]
extern crate lazy_static;
#[macro_use]
extern crate log;
extern crate nom;
extern crate num;
#[macro_use]
extern crate num_derive;

pub mod bsp;
pub mod entity;
pub mod error;
pub mod lump;
pub mod map;
pub mod math;
pub mod mdl;
pub mod mesh;
pub mod palette;
pub mod parse;
pub mod texture;
pub mod util;
pub mod wad;

pub use crate::error::{DegenerateBrushError, FormatError, FormatErrorKind, TextureNotFound};
