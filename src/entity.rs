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

//! Key/value entities from BSP entity lumps and MAP files.

use std::collections::HashMap;

/// A single `{ "key" "value" ... }` block.
///
/// Duplicate keys keep the last value.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Entity {
    attributes: HashMap<String, String>,
}

impl Entity {
    pub fn new() -> Entity {
        Entity::default()
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.attributes.get(key).map(|s| s.as_str())
    }

    pub fn insert<K, V>(&mut self, key: K, value: V) -> Option<String>
    where
        K: Into<String>,
        V: Into<String>,
    {
        self.attributes.insert(key.into(), value.into())
    }

    pub fn classname(&self) -> Option<&str> {
        self.get("classname")
    }

    pub fn attributes(&self) -> &HashMap<String, String> {
        &self.attributes
    }

    pub fn len(&self) -> usize {
        self.attributes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.attributes.is_empty()
    }
}

impl<K, V> std::iter::FromIterator<(K, V)> for Entity
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I>(iter: I) -> Entity
    where
        I: IntoIterator<Item = (K, V)>,
    {
        Entity {
            attributes: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

/// Returns the first entity whose classname is `worldspawn`.
pub fn worldspawn(entities: &[Entity]) -> Option<&Entity> {
    entities
        .iter()
        .find(|e| e.classname() == Some("worldspawn"))
}

/// Returns the file names listed in an entity's `"wad"` key.
///
/// The value is a `;`-separated list of paths as written by the map compiler, usually absolute
/// paths on the machine that built the map. Only the final path component of each entry is
/// kept.
pub fn wad_list(entity: &Entity) -> Vec<String> {
    let value = match entity.get("wad") {
        Some(v) => v,
        None => return Vec::new(),
    };

    value
        .split(';')
        .map(|path| {
            let path = path.trim();
            match path.rfind(|c| c == '/' || c == '\\') {
                Some(sep) => &path[sep + 1..],
                None => path,
            }
        })
        .filter(|name| !name.is_empty())
        .map(String::from)
        .collect()
}
