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

use std::{collections::HashMap, rc::Rc};

use crate::{
    map::{brush, BrushFace, BrushOptions, BrushPlane, Map},
    mesh::{BrushVertex, IndexedMesh, MeshBuilder},
    texture::{self, Texture, TextureResolver},
};

/// The renderable geometry of one map entity.
#[derive(Debug)]
pub struct MapMesh {
    /// Index of the source entity in `Map::entities`.
    pub entity: usize,

    /// Textures referenced by the draw ranges of `mesh`.
    pub textures: Vec<Rc<Texture>>,

    pub mesh: IndexedMesh<BrushVertex>,
}

/// Builds one mesh for every entity that has at least one usable brush.
///
/// Brushes that fail to reconstruct are logged and left out. Within an entity, faces are grouped
/// by texture name in order of first use, and each face becomes a triangle fan followed by the
/// primitive restart index.
pub fn build_meshes(
    map: &Map,
    resolver: &mut dyn TextureResolver,
    options: &BrushOptions,
) -> Vec<MapMesh> {
    let mut resolved: HashMap<String, Rc<Texture>> = HashMap::new();
    let mut meshes = Vec::new();

    for (entity_id, entity) in map.entities.iter().enumerate() {
        if entity.brushes.is_empty() {
            continue;
        }

        let mut groups: Vec<(&str, Vec<(&BrushPlane, BrushFace)>)> = Vec::new();
        for (brush_id, b) in entity.brushes.iter().enumerate() {
            let faces = match brush::brush_faces(b, options) {
                Ok(f) => f,
                Err(e) => {
                    warn!(
                        "Skipping brush {} of entity {}: {}",
                        brush_id, entity_id, e
                    );
                    continue;
                }
            };

            for face in faces {
                let plane = &b.planes[face.plane];
                match groups.iter_mut().find(|g| g.0 == plane.texture) {
                    Some(g) => g.1.push((plane, face)),
                    None => groups.push((plane.texture.as_str(), vec![(plane, face)])),
                }
            }
        }

        if groups.is_empty() {
            continue;
        }

        let mut builder = MeshBuilder::new();
        let mut textures = Vec::with_capacity(groups.len());
        for (texture_id, (name, faces)) in groups.into_iter().enumerate() {
            let tex = match resolved.get(name) {
                Some(t) => t.clone(),
                None => {
                    let t = texture::resolve_or_missing(resolver, name);
                    resolved.insert(name.to_owned(), t.clone());
                    t
                }
            };

            builder.begin_range(texture_id);
            for (plane, face) in faces {
                let vectors = plane.texture_vectors(face.normal);
                builder.push_fan(face.points.iter().map(|p| {
                    let st = vectors.texcoord(*p, tex.width, tex.height);
                    BrushVertex {
                        position: [p.x as f32, p.y as f32, p.z as f32],
                        texcoord: [st[0] as f32, st[1] as f32],
                    }
                }));
            }

            textures.push(tex);
        }

        let mesh = builder.build();
        debug!(
            "Entity {}: {} vertices, {} indices, {} textures",
            entity_id,
            mesh.vertices.len(),
            mesh.indices.len(),
            textures.len()
        );

        meshes.push(MapMesh {
            entity: entity_id,
            textures,
            mesh,
        });
    }

    meshes
}
