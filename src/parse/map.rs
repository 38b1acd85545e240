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

use crate::{
    entity::Entity,
    error::FormatError,
    map::{Brush, BrushPlane, MapEntity, TextureAxes},
    parse::{float, key_value, malformed_at, skip, spaced, truncated_at},
};

use cgmath::Vector3;
use nom::{
    branch::alt,
    bytes::complete::take_while1,
    character::complete::{char, multispace0},
    combinator::map,
    multi::many0,
    sequence::{delimited, preceded, terminated, tuple},
    IResult,
};

fn ws_float(input: &str) -> IResult<&str, f64> {
    preceded(multispace0, float)(input)
}

// ( x y z )
pub fn point(input: &str) -> IResult<&str, Vector3<f64>> {
    map(
        delimited(
            char('('),
            tuple((ws_float, ws_float, ws_float)),
            preceded(multispace0, char(')')),
        ),
        |(x, y, z)| Vector3::new(x, y, z),
    )(input)
}

pub fn texture_name(input: &str) -> IResult<&str, &str> {
    take_while1(|c: char| !c.is_whitespace())(input)
}

// [ x y z offset ]
fn valve_axis(input: &str) -> IResult<&str, (Vector3<f64>, f64)> {
    map(
        delimited(
            char('['),
            tuple((ws_float, ws_float, ws_float, ws_float)),
            preceded(multispace0, char(']')),
        ),
        |(x, y, z, ofs)| (Vector3::new(x, y, z), ofs),
    )(input)
}

fn valve_axes(input: &str) -> IResult<&str, TextureAxes> {
    map(
        tuple((valve_axis, spaced(valve_axis))),
        |((s, s_offset), (t, t_offset))| TextureAxes::Valve {
            s,
            s_offset,
            t,
            t_offset,
        },
    )(input)
}

fn standard_axes(input: &str) -> IResult<&str, TextureAxes> {
    map(tuple((float, spaced(float))), |(x, y)| TextureAxes::Standard {
        offset: [x, y],
    })(input)
}

/// Parses one plane line of a brush.
///
/// Numbers following the scale, such as the surface flags written by some editors, are
/// skipped.
pub fn brush_plane(input: &str) -> IResult<&str, BrushPlane> {
    map(
        terminated(
            tuple((
                point,
                spaced(point),
                spaced(point),
                spaced(texture_name),
                spaced(alt((valve_axes, standard_axes))),
                spaced(float),
                spaced(float),
                spaced(float),
            )),
            many0(spaced(float)),
        ),
        |(a, b, c, texture, axes, rotation, sx, sy)| BrushPlane {
            points: [a, b, c],
            texture: texture.to_owned(),
            axes,
            rotation,
            scale: [sx, sy],
        },
    )(input)
}

/// Parses the text of a MAP file into its entities.
pub fn map_entities(src: &str) -> Result<Vec<MapEntity>, FormatError> {
    let mut entities = Vec::new();
    let mut input = skip(src);
    while !input.is_empty() {
        let (rest, entity) = map_entity(src, input)?;
        entities.push(entity);
        input = skip(rest);
    }

    Ok(entities)
}

fn map_entity<'a>(src: &str, input: &'a str) -> Result<(&'a str, MapEntity), FormatError> {
    if !input.starts_with('{') {
        return Err(malformed_at(src, input, "expected '{'"));
    }

    let mut attributes = Entity::new();
    let mut brushes = Vec::new();
    let mut input = skip(&input[1..]);
    loop {
        if input.is_empty() {
            return Err(truncated_at(src, input, "unterminated entity"));
        }

        if input.starts_with('}') {
            let entity = MapEntity {
                attributes,
                brushes,
            };
            return Ok((&input[1..], entity));
        }

        if input.starts_with('{') {
            let (rest, brush) = brush(src, input)?;
            brushes.push(brush);
            input = skip(rest);
        } else {
            let (rest, (key, value)) = key_value(src, input)?;
            attributes.insert(key, value);
            input = skip(rest);
        }
    }
}

fn brush<'a>(src: &str, input: &'a str) -> Result<(&'a str, Brush), FormatError> {
    let mut planes = Vec::new();
    let mut input = skip(&input[1..]);
    loop {
        if input.is_empty() {
            return Err(truncated_at(src, input, "unterminated brush"));
        }

        if input.starts_with('}') {
            return Ok((&input[1..], Brush { planes }));
        }

        match brush_plane(input) {
            Ok((rest, plane)) => {
                planes.push(plane);
                input = skip(rest);
            }
            Err(_) => return Err(malformed_at(src, input, "bad brush plane")),
        }
    }
}
