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

//! Text formats: BSP entity lumps and MAP source files.

pub mod entities;
pub mod map;

use crate::error::FormatError;

use nom::{
    branch::alt,
    bytes::complete::{tag, take_while_m_n},
    character::complete::{char, multispace1, not_line_ending, space0},
    combinator::{map_res, recognize, value},
    multi::many0,
    number::complete::recognize_float,
    sequence::{delimited, pair, preceded},
    IResult,
};

pub use self::entities::entities;

/// Longest quoted token accepted before the closing quote is considered missing.
pub const MAX_TOKEN: usize = 1024;

// // comment until end of line
pub fn comment(input: &str) -> IResult<&str, &str> {
    recognize(pair(tag("//"), not_line_ending))(input)
}

/// Skips any run of whitespace and `//` comments.
pub fn skip_space(input: &str) -> IResult<&str, ()> {
    value((), many0(alt((multispace1, comment))))(input)
}

fn string_contents(input: &str) -> IResult<&str, &str> {
    take_while_m_n(0, MAX_TOKEN, |c: char| c != '"')(input)
}

// "text", no escapes
pub fn quoted(input: &str) -> IResult<&str, &str> {
    delimited(char('"'), string_contents, char('"'))(input)
}

pub fn float(input: &str) -> IResult<&str, f64> {
    map_res(recognize_float, |s: &str| s.parse::<f64>())(input)
}

/// Wraps a token parser so that it may be preceded by spaces or tabs, but not line breaks.
pub fn spaced<'a, O, F>(f: F) -> impl Fn(&'a str) -> IResult<&'a str, O>
where
    F: Fn(&'a str) -> IResult<&'a str, O>,
{
    preceded(space0, f)
}

/// Returns the 1-based line on which `rest` begins within `src`.
pub(crate) fn line_number(src: &str, rest: &str) -> usize {
    let consumed = src.len().saturating_sub(rest.len());
    src[..consumed].matches('\n').count() + 1
}

pub(crate) fn malformed_at(src: &str, rest: &str, what: &str) -> FormatError {
    FormatError::malformed(format!("{} on line {}", what, line_number(src, rest)))
}

pub(crate) fn truncated_at(src: &str, rest: &str, what: &str) -> FormatError {
    FormatError::truncated(format!("{} on line {}", what, line_number(src, rest)))
}

pub(crate) fn skip(input: &str) -> &str {
    match skip_space(input) {
        Ok((rest, ())) => rest,
        Err(_) => input,
    }
}

/// Reads a quoted token, telling an unclosed string apart from an unexpected token.
pub(crate) fn quoted_token<'a>(
    src: &str,
    input: &'a str,
) -> Result<(&'a str, &'a str), FormatError> {
    match quoted(input) {
        Ok(r) => Ok(r),
        Err(_) if input.starts_with('"') => Err(truncated_at(src, input, "unterminated string")),
        Err(_) => Err(malformed_at(src, input, "expected quoted string")),
    }
}

/// Reads a `"key" "value"` pair.
pub(crate) fn key_value<'a>(
    src: &str,
    input: &'a str,
) -> Result<(&'a str, (&'a str, &'a str)), FormatError> {
    let (rest, key) = quoted_token(src, input)?;
    let rest = skip(rest);
    if rest.is_empty() {
        return Err(truncated_at(src, rest, "missing value"));
    }

    let (rest, value) = quoted_token(src, rest)?;
    Ok((rest, (key, value)))
}
