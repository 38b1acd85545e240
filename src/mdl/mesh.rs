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

use std::rc::Rc;

use crate::{
    mdl::{MdlBone, MdlModel, MdlSubmodel, TriVertex},
    mesh::{IndexedMesh, MeshBuilder, ModelVertex},
    texture::{self, Texture},
};

use cgmath::{Matrix4, Rad, Vector3};

const WHITE: [f32; 4] = [1.0, 1.0, 1.0, 1.0];

#[derive(Clone, Debug)]
pub struct MdlMeshOptions {
    /// The row of the skin table used to map skinrefs to textures.
    pub skin_family: usize,

    /// Whether to move vertices from bone space into the model's default pose.
    pub apply_bind_pose: bool,
}

impl Default for MdlMeshOptions {
    fn default() -> MdlMeshOptions {
        MdlMeshOptions {
            skin_family: 0,
            apply_bind_pose: true,
        }
    }
}

/// The triangle list of one submodel.
#[derive(Debug)]
pub struct MdlSubmodelMesh {
    pub body_part: usize,
    pub model: usize,

    /// Draw ranges refer to `MdlMeshes::textures` by index.
    pub mesh: IndexedMesh<ModelVertex>,
}

#[derive(Debug)]
pub struct MdlMeshes {
    /// The model's textures in file order, followed by the missing-texture placeholder if any
    /// mesh needed it.
    pub textures: Vec<Rc<Texture>>,
    pub models: Vec<MdlSubmodelMesh>,
}

/// Computes the default pose of every bone in model space.
fn bind_pose(bones: &[MdlBone]) -> Vec<Matrix4<f32>> {
    let mut transforms: Vec<Matrix4<f32>> = Vec::with_capacity(bones.len());

    for bone in bones {
        let v = &bone.value;
        let local = Matrix4::from_translation(Vector3::new(v[0], v[1], v[2]))
            * Matrix4::from_angle_z(Rad(v[5]))
            * Matrix4::from_angle_y(Rad(v[4]))
            * Matrix4::from_angle_x(Rad(v[3]));

        let transform = match bone.parent.and_then(|p| transforms.get(p)) {
            Some(parent) => *parent * local,
            None => local,
        };
        transforms.push(transform);
    }

    transforms
}

fn submodel_positions(submodel: &MdlSubmodel, transforms: &[Matrix4<f32>]) -> Vec<Vector3<f32>> {
    submodel
        .vertices
        .iter()
        .enumerate()
        .map(|(i, v)| {
            match submodel.vertex_bones.get(i).and_then(|b| transforms.get(*b)) {
                Some(m) => (*m * v.extend(1.0)).truncate(),
                None => *v,
            }
        })
        .collect()
}

/// Builds a triangle list for every submodel of every body part.
///
/// Each mesh becomes one draw range for the texture its skinref selects in
/// `options.skin_family`. Meshes whose skinref doesn't resolve are drawn with the placeholder
/// texture. Texture coordinates are the command's integer `s`/`t` divided by the texture size.
pub fn build_meshes(model: &MdlModel, options: &MdlMeshOptions) -> MdlMeshes {
    let mut textures: Vec<Rc<Texture>> = model
        .textures()
        .iter()
        .map(|t| Rc::new(t.to_texture()))
        .collect();
    let mut placeholder = None;

    let transforms = if options.apply_bind_pose {
        bind_pose(model.bones())
    } else {
        Vec::new()
    };

    let mut models = Vec::new();
    for (body_part_id, body_part) in model.body_parts().iter().enumerate() {
        for (model_id, submodel) in body_part.models.iter().enumerate() {
            let positions = submodel_positions(submodel, &transforms);
            let mut builder = MeshBuilder::new();

            for mesh in submodel.meshes.iter() {
                let texture_id = match model.skin_texture(options.skin_family, mesh.skin_ref) {
                    Some(t) => t,
                    None => {
                        warn!(
                            "{}: no texture for skinref {} in skin family {}",
                            submodel.name, mesh.skin_ref, options.skin_family
                        );
                        *placeholder.get_or_insert_with(|| {
                            textures.push(Rc::new(texture::named_missing_texture("")));
                            textures.len() - 1
                        })
                    }
                };

                let width = textures[texture_id].width.max(1) as f32;
                let height = textures[texture_id].height.max(1) as f32;
                let vertex = |tv: &TriVertex| {
                    positions.get(tv.vertex).map(|p| ModelVertex {
                        position: (*p).into(),
                        texcoord: [tv.s as f32 / width, tv.t as f32 / height],
                        color: WHITE,
                    })
                };

                builder.begin_range(texture_id);
                for cmd in mesh.commands.iter() {
                    let cmd_vertices = cmd.vertices();
                    for triangle in cmd.triangles() {
                        let corners: Option<Vec<ModelVertex>> =
                            triangle.iter().map(|k| vertex(&cmd_vertices[*k])).collect();

                        match corners {
                            Some(corners) => {
                                for c in corners {
                                    builder.push_vertex(c);
                                }
                            }
                            None => debug!("{}: skipping triangle {:?}", submodel.name, triangle),
                        }
                    }
                }
            }

            let mesh = builder.build();
            debug!(
                "Submodel {}: {} vertices, {} indices, {} draw ranges",
                submodel.name,
                mesh.vertices.len(),
                mesh.indices.len(),
                mesh.ranges.len()
            );

            models.push(MdlSubmodelMesh {
                body_part: body_part_id,
                model: model_id,
                mesh,
            });
        }
    }

    MdlMeshes { textures, models }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::mdl::load::{
        load,
        test::{fan, quad_mdl, FixtureSubmodel, FixtureTexture, MdlFixture},
    };
    use std::f32::consts::FRAC_PI_2;

    fn build(fixture: &MdlFixture, options: &MdlMeshOptions) -> MdlMeshes {
        build_meshes(&load(&fixture.build()).unwrap(), options)
    }

    fn close(a: [f32; 3], b: [f32; 3]) -> bool {
        a.iter().zip(b.iter()).all(|(x, y)| (x - y).abs() < 1e-5)
    }

    fn single_vertex_mdl(bones: Vec<([f32; 6], i32)>, vertex: [f32; 3], bone: u8) -> MdlFixture {
        let mut fixture = quad_mdl();
        fixture.bones = bones;
        fixture.body_parts = vec![vec![FixtureSubmodel {
            vertices: vec![vertex, vertex, vertex],
            bones: vec![bone; 3],
            meshes: vec![(0, fan(&[(0, 0, 0), (1, 8, 0), (2, 0, 8)]))],
        }]];
        fixture
    }

    #[test]
    fn test_quad_strip() {
        let meshes = build(&quad_mdl(), &MdlMeshOptions::default());
        assert_eq!(meshes.textures.len(), 1);
        assert_eq!(meshes.textures[0].mipmaps[0].len(), 8 * 8 * 4);
        assert_eq!(&meshes.textures[0].mipmaps[0][..4], &[3, 252, 1, 255]);

        assert_eq!(meshes.models.len(), 1);
        let mesh = &meshes.models[0].mesh;
        assert_eq!(mesh.vertices.len(), 4);
        assert_eq!(mesh.indices, vec![0, 1, 2, 1, 3, 2]);
        assert_eq!(mesh.ranges.len(), 1);
        assert_eq!(mesh.ranges[0].texture, 0);
        assert_eq!(mesh.ranges[0].index_count, 6);

        for v in mesh.vertices.iter() {
            assert_eq!(v.color, WHITE);
            assert_eq!(v.texcoord, [v.position[0], v.position[1]]);
        }
    }

    #[test]
    fn test_fan_winding() {
        let mut fixture = quad_mdl();
        fixture.body_parts[0][0].meshes[0].1 =
            fan(&[(0, 0, 0), (1, 8, 0), (3, 8, 8), (2, 0, 8)]);

        let meshes = build(&fixture, &MdlMeshOptions::default());
        let mesh = &meshes.models[0].mesh;

        let positions: Vec<[f32; 3]> = mesh
            .indices
            .iter()
            .map(|i| mesh.vertices[*i as usize].position)
            .collect();
        assert_eq!(
            positions,
            vec![
                [0.0, 0.0, 0.0],
                [1.0, 1.0, 0.0],
                [1.0, 0.0, 0.0],
                [0.0, 0.0, 0.0],
                [0.0, 1.0, 0.0],
                [1.0, 1.0, 0.0],
            ]
        );
    }

    #[test]
    fn test_bind_pose() {
        let bones = vec![([10.0, 0.0, 0.0, 0.0, 0.0, FRAC_PI_2], -1)];
        let fixture = single_vertex_mdl(bones, [1.0, 0.0, 0.0], 0);

        let posed = build(&fixture, &MdlMeshOptions::default());
        assert!(close(
            posed.models[0].mesh.vertices[0].position,
            [10.0, 1.0, 0.0]
        ));

        let unposed = build(
            &fixture,
            &MdlMeshOptions {
                apply_bind_pose: false,
                ..Default::default()
            },
        );
        assert_eq!(unposed.models[0].mesh.vertices[0].position, [1.0, 0.0, 0.0]);
    }

    #[test]
    fn test_bone_chain() {
        let bones = vec![
            ([0.0, 0.0, 5.0, 0.0, 0.0, 0.0], -1),
            ([1.0, 0.0, 0.0, 0.0, 0.0, 0.0], 0),
        ];
        let fixture = single_vertex_mdl(bones, [0.0, 0.0, 0.0], 1);

        let meshes = build(&fixture, &MdlMeshOptions::default());
        let mesh = &meshes.models[0].mesh;
        assert!(close(mesh.vertices[0].position, [1.0, 0.0, 5.0]));
    }

    #[test]
    fn test_skin_families() {
        let mut fixture = quad_mdl();
        fixture.textures.push(FixtureTexture {
            name: "quad_alt.bmp",
            width: 8,
            height: 8,
            fill: 4,
        });
        fixture.skins = vec![vec![0], vec![1]];

        for (family, texture) in [(0, 0), (1, 1), (7, 0)].iter() {
            let options = MdlMeshOptions {
                skin_family: *family,
                ..Default::default()
            };
            let meshes = build(&fixture, &options);
            assert_eq!(meshes.models[0].mesh.ranges[0].texture, *texture);
        }
    }

    #[test]
    fn test_missing_skin() {
        let _ = env_logger::try_init();

        let mut fixture = quad_mdl();
        fixture.body_parts[0][0].meshes[0].0 = 3;

        let meshes = build(&fixture, &MdlMeshOptions::default());
        assert_eq!(meshes.textures.len(), 2);
        assert!(meshes.textures[1].is_placeholder());
        assert_eq!(meshes.models[0].mesh.ranges[0].texture, 1);
        assert_eq!(meshes.models[0].mesh.indices.len(), 6);
    }
}
