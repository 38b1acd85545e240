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

//! Per-model indexed meshes built from the BSP tree.

use std::{
    collections::{BTreeMap, HashSet},
    rc::Rc,
};

use crate::{
    bsp::{checked, checked_range, BspData, BspLeafContents, BspRenderNodeChild},
    error::FormatError,
    mesh::{BrushVertex, IndexedMesh, MeshBuilder},
    texture::{self, Texture, TextureResolver},
};

/// The renderable geometry of one BSP model.
#[derive(Debug)]
pub struct BspModelMesh {
    /// Index of the source model. Model 0 is the world.
    pub model: usize,

    /// Draw ranges refer to `BspMeshes::textures` by index.
    pub mesh: IndexedMesh<BrushVertex>,
}

#[derive(Debug)]
pub struct BspMeshes {
    /// One texture per BSP texture slot, in the same order.
    pub textures: Vec<Rc<Texture>>,
    pub models: Vec<BspModelMesh>,
}

/// Produces an RGBA texture for every texture slot of `bsp`.
///
/// Textures that embed their own pixels and palette are converted directly. All others are
/// looked up by name through `resolver`, and names it can't find are replaced with the
/// missing-texture placeholder.
pub fn resolve_textures(bsp: &BspData, resolver: &mut dyn TextureResolver) -> Vec<Rc<Texture>> {
    bsp.textures()
        .iter()
        .enumerate()
        .map(|(i, miptex)| {
            if let Some(t) = miptex.to_texture() {
                return Rc::new(t);
            }

            if miptex.name.is_empty() {
                debug!("Texture slot {} is unused, using placeholder", i);
                return Rc::new(texture::named_missing_texture(""));
            }

            texture::resolve_or_missing(resolver, &miptex.name)
        })
        .collect()
}

/// Collects the faces reachable from a model's render tree, in traversal order.
fn model_faces(bsp: &BspData, model_id: usize) -> Result<Vec<usize>, FormatError> {
    let model = checked(bsp.models(), model_id, "model")?;
    let nodes = bsp.render_nodes();

    let root = model.head_nodes[0];
    if root < 0 || root as usize >= nodes.len() {
        return Err(FormatError::bad_reference("node", root as i64, nodes.len()));
    }

    let mut faces = Vec::new();
    let mut seen_faces = HashSet::new();
    let mut seen_nodes = HashSet::new();
    let mut stack = vec![BspRenderNodeChild::Node(root as usize)];

    while let Some(child) = stack.pop() {
        match child {
            BspRenderNodeChild::Node(node_id) => {
                if !seen_nodes.insert(node_id) {
                    continue;
                }

                let node = checked(nodes, node_id, "node")?;

                // push back first so the front child is visited first
                stack.push(node.children[1]);
                stack.push(node.children[0]);
            }

            BspRenderNodeChild::Leaf(leaf_id) => {
                let leaf = checked(bsp.leaves(), leaf_id, "leaf")?;
                if leaf.contents == BspLeafContents::Solid {
                    continue;
                }

                let marks = checked_range(
                    bsp.facelist(),
                    leaf.facelist_id,
                    leaf.facelist_count,
                    "marksurface",
                )?;

                for face_id in marks {
                    checked(bsp.faces(), *face_id, "face")?;
                    if seen_faces.insert(*face_id) {
                        faces.push(*face_id);
                    }
                }
            }

            BspRenderNodeChild::Empty => (),
        }
    }

    if faces.is_empty() {
        // brush entity models have no marksurfaces of their own
        checked_range(bsp.faces(), model.face_id, model.face_count, "face")?;
        faces.extend(model.face_id..model.face_id + model.face_count);
    }

    Ok(faces)
}

fn build_model_mesh(
    bsp: &BspData,
    model_id: usize,
    textures: &[Rc<Texture>],
) -> Result<IndexedMesh<BrushVertex>, FormatError> {
    let faces = model_faces(bsp, model_id)?;

    let mut groups: BTreeMap<usize, Vec<usize>> = BTreeMap::new();
    for face_id in faces {
        let tex_id = bsp.face_texinfo(face_id)?.tex_id;
        checked(bsp.textures(), tex_id, "texture")?;
        groups.entry(tex_id).or_insert_with(Vec::new).push(face_id);
    }

    let mut builder = MeshBuilder::new();
    for (tex_id, face_ids) in groups {
        let miptex = &bsp.textures()[tex_id];
        let (width, height) = match (miptex.width, miptex.height, textures.get(tex_id)) {
            (w, h, _) if w > 0 && h > 0 => (w, h),
            (_, _, Some(t)) => (t.width.max(1), t.height.max(1)),
            _ => (1, 1),
        };

        builder.begin_range(tex_id);
        for face_id in face_ids {
            let texinfo = bsp.face_texinfo(face_id)?;
            let vertices = bsp.face_vertices(face_id)?;

            builder.push_fan(vertices.into_iter().map(|v| {
                let st = texinfo.project(v);
                BrushVertex {
                    position: v.into(),
                    texcoord: [st[0] / width as f32, st[1] / height as f32],
                }
            }));
        }
    }

    Ok(builder.build())
}

/// Builds one indexed mesh per model of `bsp`.
///
/// Each model's faces are gathered by walking its render tree down to the leaves and following
/// their marksurfaces. Faces are grouped by texture in texture index order; each face becomes one
/// triangle fan terminated by the primitive restart index. Out-of-range indices anywhere along
/// the way are reported as `BadReference`.
pub fn build_meshes(
    bsp: &BspData,
    resolver: &mut dyn TextureResolver,
) -> Result<BspMeshes, FormatError> {
    let textures = resolve_textures(bsp, resolver);

    let mut models = Vec::with_capacity(bsp.models().len());
    for model_id in 0..bsp.models().len() {
        let mesh = build_model_mesh(bsp, model_id, &textures)?;
        debug!(
            "Model {}: {} vertices, {} indices, {} draw ranges",
            model_id,
            mesh.vertices.len(),
            mesh.indices.len(),
            mesh.ranges.len()
        );
        models.push(BspModelMesh {
            model: model_id,
            mesh,
        });
    }

    Ok(BspMeshes { textures, models })
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{
        bsp::load::{
            load,
            test::{square_bsp, BspFixture},
            BspLumpId,
        },
        error::{FormatErrorKind, TextureNotFound},
        mesh::{DrawRange, PRIMITIVE_RESTART},
    };
    use byteorder::{LittleEndian, WriteBytesExt};

    fn resolve_square(name: &str) -> Result<Rc<Texture>, TextureNotFound> {
        if name != "square" {
            return Err(TextureNotFound {
                name: name.to_owned(),
            });
        }

        Ok(Rc::new(Texture {
            name: name.to_owned(),
            width: 16,
            height: 16,
            mipmaps: vec![vec![0xFF; 16 * 16 * 4]],
        }))
    }

    fn build(fixture: &BspFixture) -> Result<BspMeshes, FormatError> {
        let bsp = load(&fixture.build()).unwrap();
        let mut resolver = resolve_square;
        build_meshes(&bsp, &mut resolver)
    }

    #[test]
    fn test_square_face() {
        let meshes = build(&square_bsp(false)).unwrap();
        assert_eq!(meshes.textures.len(), 1);
        assert!(!meshes.textures[0].is_placeholder());
        assert_eq!(meshes.models.len(), 1);

        let mesh = &meshes.models[0].mesh;
        assert_eq!(mesh.vertices.len(), 4);
        assert_eq!(mesh.indices.len(), 5);
        assert_eq!(mesh.indices[4], PRIMITIVE_RESTART);
        assert_eq!(
            mesh.ranges,
            vec![DrawRange {
                texture: 0,
                index_offset: 0,
                index_count: 5,
            }]
        );

        // the boundary is stored 0-1-2-3, so the surfedge walk yields it back to front
        let positions: Vec<[f32; 3]> = mesh.indices[..4]
            .iter()
            .map(|i| mesh.vertices[*i as usize].position)
            .collect();
        assert_eq!(
            positions,
            vec![
                [0.0, 0.0, 0.0],
                [0.0, 16.0, 0.0],
                [16.0, 16.0, 0.0],
                [16.0, 0.0, 0.0],
            ]
        );

        for v in mesh.vertices.iter() {
            assert_eq!(v.texcoord, [v.position[0] / 16.0, v.position[1] / 16.0]);
        }
    }

    #[test]
    fn test_surfedge_sign_winding() {
        let forward = build(&square_bsp(false)).unwrap();
        let backward = build(&square_bsp(true)).unwrap();

        let positions = |m: &BspMeshes| -> Vec<[f32; 3]> {
            let mesh = &m.models[0].mesh;
            mesh.indices[..4]
                .iter()
                .map(|i| mesh.vertices[*i as usize].position)
                .collect()
        };

        assert_eq!(positions(&forward), positions(&backward));
    }

    #[test]
    fn test_missing_texture() {
        let _ = env_logger::try_init();

        let bsp = load(&square_bsp(false).build()).unwrap();
        let mut resolver = |name: &str| -> Result<Rc<Texture>, TextureNotFound> {
            Err(TextureNotFound {
                name: name.to_owned(),
            })
        };
        let meshes = build_meshes(&bsp, &mut resolver).unwrap();
        assert!(meshes.textures[0].is_placeholder());
        assert_eq!(meshes.models[0].mesh.indices.len(), 5);
    }

    #[test]
    fn test_bad_surfedge() {
        let mut fixture = square_bsp(false);
        let l = fixture.lump(BspLumpId::EdgeList);
        l.truncate(12);
        l.write_i32::<LittleEndian>(99).unwrap();

        match build(&fixture).unwrap_err().kind() {
            FormatErrorKind::BadReference { what, index, count } => {
                assert_eq!(what, "edge");
                assert_eq!(index, 99);
                assert_eq!(count, 5);
            }
            k => panic!("unexpected kind {:?}", k),
        }
    }

    #[test]
    fn test_bad_texinfo() {
        let mut fixture = square_bsp(false);
        fixture.lump(BspLumpId::Faces).clear();
        fixture.face(0, 4, 3);

        match build(&fixture).unwrap_err().kind() {
            FormatErrorKind::BadReference { what, .. } => assert_eq!(what, "texinfo"),
            k => panic!("unexpected kind {:?}", k),
        }
    }

    #[test]
    fn test_submodel_face_range() {
        let mut fixture = square_bsp(false);

        // a second model whose tree only reaches the solid leaf
        fixture.node(0, [!0u16, 0xFFFF], 0, 1);
        fixture.model(1, 0, 1);

        let meshes = build(&fixture).unwrap();
        assert_eq!(meshes.models.len(), 2);
        assert_eq!(meshes.models[1].mesh.indices.len(), 5);
    }
}
