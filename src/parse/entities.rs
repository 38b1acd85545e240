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

//! The entity lump text format.
//!
//! ```text
//! {
//! "classname" "worldspawn"
//! "wad" "\half-life\valve\halflife.wad"
//! }
//! {
//! "classname" "info_player_start"
//! "origin" "0 0 36"
//! }
//! ```

use crate::{
    entity::Entity,
    error::FormatError,
    parse::{key_value, malformed_at, skip, truncated_at},
};

/// Parses the text of an entity lump.
///
/// Parsing stops at the first NUL character, if any. Blocks are returned in file order.
pub fn entities(text: &str) -> Result<Vec<Entity>, FormatError> {
    let src = match text.find('\0') {
        Some(n) => &text[..n],
        None => text,
    };

    let mut entities = Vec::new();
    let mut input = skip(src);
    while !input.is_empty() {
        let (rest, entity) = entity(src, input)?;
        entities.push(entity);
        input = skip(rest);
    }

    debug!("Parsed {} entities", entities.len());
    Ok(entities)
}

fn entity<'a>(src: &str, input: &'a str) -> Result<(&'a str, Entity), FormatError> {
    if !input.starts_with('{') {
        return Err(malformed_at(src, input, "expected '{'"));
    }

    let mut entity = Entity::new();
    let mut input = skip(&input[1..]);
    loop {
        if input.is_empty() {
            return Err(truncated_at(src, input, "unterminated entity"));
        }

        if input.starts_with('}') {
            return Ok((&input[1..], entity));
        }

        let (rest, (key, value)) = key_value(src, input)?;
        entity.insert(key, value);
        input = skip(rest);
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::error::FormatErrorKind;

    #[test]
    fn test_entities() {
        let text = "{\n\"classname\" \"worldspawn\"\n\"wad\" \"a.wad;b.wad\"\n}\n\
                    {\n\"classname\" \"light\"\n\"_light\" \"255 255 255 200\"\n}\n\0garbage";
        let ents = entities(text).unwrap();
        assert_eq!(ents.len(), 2);
        assert_eq!(ents[0].classname(), Some("worldspawn"));
        assert_eq!(ents[0].get("wad"), Some("a.wad;b.wad"));
        assert_eq!(ents[1].get("_light"), Some("255 255 255 200"));
    }

    #[test]
    fn test_empty() {
        assert!(entities("").unwrap().is_empty());
        assert!(entities(" \n\0{").unwrap().is_empty());
        assert!(entities("{}").unwrap()[0].is_empty());
    }

    #[test]
    fn test_unterminated_block() {
        match entities("{\n\"classname\" \"worldspawn\"\n").unwrap_err().kind() {
            FormatErrorKind::Truncated { what } => assert!(what.contains("line 3")),
            k => panic!("unexpected kind {:?}", k),
        }
    }

    #[test]
    fn test_unterminated_string() {
        match entities("{\n\"classname\" \"worldspawn\n}\n").unwrap_err().kind() {
            FormatErrorKind::Truncated { .. } => (),
            k => panic!("unexpected kind {:?}", k),
        }
    }

    #[test]
    fn test_stray_token() {
        match entities("{\nclassname worldspawn\n}").unwrap_err().kind() {
            FormatErrorKind::Malformed { what } => assert!(what.contains("line 2")),
            k => panic!("unexpected kind {:?}", k),
        }
    }
}
