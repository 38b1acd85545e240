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

//! Polygon reconstruction for convex brushes.
//!
//! Corners are found by intersecting every combination of three planes and keeping the
//! intersections that lie inside all of the brush's half-spaces. Each plane's polygon is then the
//! set of corners lying on it, sorted counter-clockwise as seen from outside the brush.

use std::cmp::Ordering;

use crate::{
    error::DegenerateBrushError,
    map::{Brush, BrushOptions, BrushPlane, TextureAxes},
    math::{self, Hyperplane},
};

use cgmath::{InnerSpace, Vector3, Zero};

// normal, s axis, t axis
const BASE_AXES: [[[f64; 3]; 3]; 6] = [
    [[0.0, 0.0, 1.0], [1.0, 0.0, 0.0], [0.0, -1.0, 0.0]],  // floor
    [[0.0, 0.0, -1.0], [1.0, 0.0, 0.0], [0.0, -1.0, 0.0]], // ceiling
    [[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, -1.0]],  // west wall
    [[-1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, -1.0]], // east wall
    [[0.0, 1.0, 0.0], [1.0, 0.0, 0.0], [0.0, 0.0, -1.0]],  // south wall
    [[0.0, -1.0, 0.0], [1.0, 0.0, 0.0], [0.0, 0.0, -1.0]], // north wall
];

/// One polygon of a reconstructed brush.
#[derive(Clone, Debug)]
pub struct BrushFace {
    /// Index of the defining plane within the brush.
    pub plane: usize,

    /// Outward-facing unit normal.
    pub normal: Vector3<f64>,

    /// Corners in counter-clockwise order as seen from outside the brush.
    pub points: Vec<Vector3<f64>>,
}

/// World-space texture projection for one brush plane.
#[derive(Clone, Debug, PartialEq)]
pub struct TextureVectors {
    pub s: Vector3<f64>,
    pub s_offset: f64,
    pub t: Vector3<f64>,
    pub t_offset: f64,
}

impl TextureVectors {
    /// Projects `point` onto the texture axes and normalizes by the texture size.
    pub fn texcoord(&self, point: Vector3<f64>, width: u32, height: u32) -> [f64; 2] {
        let w = width.max(1) as f64;
        let h = height.max(1) as f64;
        [
            (point.dot(self.s) + self.s_offset) / w,
            (point.dot(self.t) + self.t_offset) / h,
        ]
    }
}

impl BrushPlane {
    /// Computes the scaled texture axes and offsets for a plane with the given normal.
    pub fn texture_vectors(&self, normal: Vector3<f64>) -> TextureVectors {
        let (s, s_offset, t, t_offset) = match self.axes {
            TextureAxes::Standard { offset } => {
                let (s, t) = standard_axes(normal, self.rotation);
                (s, offset[0], t, offset[1])
            }

            TextureAxes::Valve {
                s,
                s_offset,
                t,
                t_offset,
            } => (s, s_offset, t, t_offset),
        };

        let scale = |v: f64| if v == 0.0 { 1.0 } else { v };
        TextureVectors {
            s: s / scale(self.scale[0]),
            s_offset,
            t: t / scale(self.scale[1]),
            t_offset,
        }
    }
}

/// Selects the base texture axes for a plane and applies `rotation` (in degrees).
///
/// The base axes are those of the first world-aligned plane whose normal is closest to
/// `normal`.
pub fn standard_axes(normal: Vector3<f64>, rotation: f64) -> (Vector3<f64>, Vector3<f64>) {
    let mut best = 0;
    let mut best_dot = 0.0;
    for (i, axes) in BASE_AXES.iter().enumerate() {
        let dot = normal.dot(Vector3::from(axes[0]));
        if dot > best_dot {
            best = i;
            best_dot = dot;
        }
    }

    let mut s = BASE_AXES[best][1];
    let mut t = BASE_AXES[best][2];

    let (sin, cos) = match rotation {
        r if r == 0.0 => (0.0, 1.0),
        r if r == 90.0 => (1.0, 0.0),
        r if r == 180.0 => (0.0, -1.0),
        r if r == 270.0 => (-1.0, 0.0),
        r => r.to_radians().sin_cos(),
    };

    let sv = s.iter().position(|c| *c != 0.0).unwrap_or(0);
    let tv = t.iter().position(|c| *c != 0.0).unwrap_or(0);

    for v in [&mut s, &mut t].iter_mut() {
        let ns = cos * v[sv] - sin * v[tv];
        let nt = sin * v[sv] + cos * v[tv];
        v[sv] = ns;
        v[tv] = nt;
    }

    (Vector3::from(s), Vector3::from(t))
}

struct Corner {
    position: Vector3<f64>,
    planes: Vec<usize>,
}

fn same_point(a: Vector3<f64>, b: Vector3<f64>, epsilon: f64) -> bool {
    (a.x - b.x).abs() <= epsilon && (a.y - b.y).abs() <= epsilon && (a.z - b.z).abs() <= epsilon
}

fn enumerate_corners(planes: &[Hyperplane], options: &BrushOptions) -> Vec<Corner> {
    let eps = options.epsilon;
    let mut corners: Vec<Corner> = Vec::new();

    for i in 0..planes.len() {
        for j in i + 1..planes.len() {
            for k in j + 1..planes.len() {
                let p = match Hyperplane::intersect3(&planes[i], &planes[j], &planes[k]) {
                    Some(p) => p,
                    None => continue,
                };

                if planes.iter().any(|plane| plane.point_dist(p) > eps) {
                    continue;
                }

                let position = if options.snap_to_integer {
                    math::round_vector(p)
                } else {
                    p
                };

                // membership is decided on the exact solution, before snapping
                let on: Vec<usize> = planes
                    .iter()
                    .enumerate()
                    .filter(|(_, plane)| plane.point_dist(p).abs() <= eps)
                    .map(|(id, _)| id)
                    .collect();

                match corners
                    .iter_mut()
                    .find(|c| same_point(c.position, position, eps))
                {
                    Some(corner) => {
                        for id in on {
                            if !corner.planes.contains(&id) {
                                corner.planes.push(id);
                            }
                        }
                    }

                    None => corners.push(Corner {
                        position,
                        planes: on,
                    }),
                }
            }
        }
    }

    corners
}

/// Sorts coplanar points counter-clockwise as seen from the side `normal` points to.
///
/// Points are ordered by decreasing angle around their centroid in the basis
/// `S = normalize(b - a)`, `T = S × normal`. Points whose angles agree within `epsilon` are
/// ordered by distance from the centroid.
pub fn wind_ccw(
    plane: &BrushPlane,
    normal: Vector3<f64>,
    points: Vec<Vector3<f64>>,
    epsilon: f64,
) -> Vec<Vector3<f64>> {
    if points.is_empty() {
        return points;
    }

    let s = (plane.points[1] - plane.points[0]).normalize();
    let t = s.cross(normal);
    let centroid = points.iter().fold(Vector3::zero(), |acc, p| acc + *p) / points.len() as f64;

    let mut keyed: Vec<(f64, f64, Vector3<f64>)> = points
        .into_iter()
        .map(|p| {
            let d = p - centroid;
            (d.dot(t).atan2(d.dot(s)), d.magnitude(), p)
        })
        .collect();

    keyed.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(Ordering::Equal));

    // order runs of equal angles by distance
    let mut start = 0;
    while start < keyed.len() {
        let mut end = start + 1;
        while end < keyed.len() && (keyed[start].0 - keyed[end].0).abs() <= epsilon {
            end += 1;
        }

        keyed[start..end].sort_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(Ordering::Equal));
        start = end;
    }

    keyed.into_iter().map(|(_, _, p)| p).collect()
}

/// Reconstructs the polygons of a convex brush from its planes.
pub fn brush_faces(
    brush: &Brush,
    options: &BrushOptions,
) -> Result<Vec<BrushFace>, DegenerateBrushError> {
    let plane_count = brush.planes.len();
    if plane_count < 4 {
        return Err(DegenerateBrushError::TooFewPlanes(plane_count));
    }

    let mut planes = Vec::with_capacity(plane_count);
    for (i, plane) in brush.planes.iter().enumerate() {
        match plane.hyperplane() {
            Some(h) => planes.push(h),
            None => return Err(DegenerateBrushError::DegeneratePlane(i)),
        }
    }

    let corners = enumerate_corners(&planes, options);
    if corners.len() < 4 {
        return Err(DegenerateBrushError::NoVolume);
    }

    let eps = options.epsilon;
    let mut faces: Vec<BrushFace> = Vec::new();
    for (i, plane) in planes.iter().enumerate() {
        let duplicate = planes[..i].iter().any(|p| {
            (p.normal() - plane.normal()).magnitude() <= eps
                && (p.dist() - plane.dist()).abs() <= eps
        });
        if duplicate {
            debug!("Skipping duplicate brush plane {}", i);
            continue;
        }

        let points: Vec<Vector3<f64>> = corners
            .iter()
            .filter(|c| c.planes.contains(&i))
            .map(|c| c.position)
            .collect();

        if points.len() < 3 {
            debug!("Skipping brush plane {} with {} corners", i, points.len());
            continue;
        }

        faces.push(BrushFace {
            plane: i,
            normal: plane.normal(),
            points: wind_ccw(&brush.planes[i], plane.normal(), points, eps),
        });
    }

    if faces.len() < 4 {
        return Err(DegenerateBrushError::TooFewFaces(faces.len()));
    }

    Ok(faces)
}

#[cfg(test)]
pub(crate) mod test {
    use super::*;

    fn v(x: f64, y: f64, z: f64) -> Vector3<f64> {
        Vector3::new(x, y, z)
    }

    pub fn plane(a: Vector3<f64>, b: Vector3<f64>, c: Vector3<f64>, texture: &str) -> BrushPlane {
        BrushPlane {
            points: [a, b, c],
            texture: texture.to_owned(),
            axes: TextureAxes::Standard { offset: [0.0, 0.0] },
            rotation: 0.0,
            scale: [1.0, 1.0],
        }
    }

    /// The box from (-64, -64, -16) to (64, 64, 16).
    pub fn box_brush() -> Brush {
        Brush {
            planes: vec![
                plane(v(-64.0, -64.0, -16.0), v(-64.0, -63.0, -16.0), v(-64.0, -64.0, -15.0), "west"),
                plane(v(64.0, 64.0, 16.0), v(64.0, 64.0, 17.0), v(64.0, 65.0, 16.0), "east"),
                plane(v(-64.0, -64.0, -16.0), v(-64.0, -64.0, -15.0), v(-63.0, -64.0, -16.0), "south"),
                plane(v(64.0, 64.0, 16.0), v(65.0, 64.0, 16.0), v(64.0, 64.0, 17.0), "north"),
                plane(v(-64.0, -64.0, -16.0), v(-63.0, -64.0, -16.0), v(-64.0, -63.0, -16.0), "floor"),
                plane(v(64.0, 64.0, 16.0), v(64.0, 65.0, 16.0), v(65.0, 64.0, 16.0), "ceiling"),
            ],
        }
    }

    // box with the +X and +Y sides replaced by the plane x + y = 0
    fn wedge_brush() -> Brush {
        let mut brush = box_brush();
        brush.planes.remove(3);
        brush.planes.remove(1);
        brush.planes.push(plane(v(0.0, 0.0, 16.0), v(0.0, 0.0, 0.0), v(64.0, -64.0, 0.0), "slope"));
        brush
    }

    fn assert_ccw(face: &BrushFace) {
        let n = face.points.len();
        for i in 0..n {
            let p0 = face.points[i];
            let p1 = face.points[(i + 1) % n];
            let p2 = face.points[(i + 2) % n];
            let turn = (p1 - p0).cross(p2 - p1).dot(face.normal);
            assert!(turn > 0.0, "face {} turns clockwise at {}", face.plane, i);
        }
    }

    #[test]
    fn test_box_closure() {
        let brush = box_brush();
        let faces = brush_faces(&brush, &BrushOptions::default()).unwrap();
        assert_eq!(faces.len(), 6);

        let planes: Vec<Hyperplane> = brush.planes.iter().map(|p| p.hyperplane().unwrap()).collect();
        for face in faces.iter() {
            assert_eq!(face.points.len(), 4);
            for p in face.points.iter() {
                assert_eq!(p.x.abs(), 64.0);
                assert_eq!(p.y.abs(), 64.0);
                assert_eq!(p.z.abs(), 16.0);
                let on = planes.iter().filter(|h| h.point_dist(*p).abs() < 1e-4).count();
                assert!(on >= 3);
            }
            assert_ccw(face);
        }
    }

    #[test]
    fn test_outward_normals() {
        let faces = brush_faces(&box_brush(), &BrushOptions::default()).unwrap();
        let floor = faces.iter().find(|f| f.plane == 4).unwrap();
        assert_eq!(floor.normal, v(0.0, 0.0, -1.0));
        let east = faces.iter().find(|f| f.plane == 1).unwrap();
        assert_eq!(east.normal, v(1.0, 0.0, 0.0));
    }

    #[test]
    fn test_wedge() {
        let faces = brush_faces(&wedge_brush(), &BrushOptions::default()).unwrap();
        assert_eq!(faces.len(), 5);

        let triangles = faces.iter().filter(|f| f.points.len() == 3).count();
        assert_eq!(triangles, 2);
        for face in faces.iter() {
            assert_ccw(face);
        }

        let slope = faces.iter().find(|f| f.plane == 4).unwrap();
        assert_eq!(slope.points.len(), 4);
        for p in slope.points.iter() {
            assert!((p.x + p.y).abs() < 1e-9);
        }
    }

    #[test]
    fn test_unsnapped() {
        let options = BrushOptions {
            snap_to_integer: false,
            ..BrushOptions::default()
        };
        let faces = brush_faces(&wedge_brush(), &options).unwrap();
        assert_eq!(faces.len(), 5);
    }

    #[test]
    fn test_too_few_planes() {
        let mut brush = box_brush();
        brush.planes.truncate(3);
        assert_eq!(
            brush_faces(&brush, &BrushOptions::default()).unwrap_err(),
            DegenerateBrushError::TooFewPlanes(3)
        );
    }

    #[test]
    fn test_degenerate_plane() {
        let mut brush = box_brush();
        brush.planes[2] = plane(v(0.0, 0.0, 0.0), v(1.0, 1.0, 1.0), v(2.0, 2.0, 2.0), "line");
        assert_eq!(
            brush_faces(&brush, &BrushOptions::default()).unwrap_err(),
            DegenerateBrushError::DegeneratePlane(2)
        );
    }

    #[test]
    fn test_parallel_planes() {
        // four side walls and no floor or ceiling
        let mut brush = box_brush();
        brush.planes.truncate(4);
        assert_eq!(
            brush_faces(&brush, &BrushOptions::default()).unwrap_err(),
            DegenerateBrushError::NoVolume
        );
    }

    #[test]
    fn test_empty_intersection() {
        // ceiling below the floor
        let mut brush = box_brush();
        brush.planes[5] = plane(v(64.0, 64.0, -32.0), v(64.0, 65.0, -32.0), v(65.0, 64.0, -32.0), "low");
        assert_eq!(
            brush_faces(&brush, &BrushOptions::default()).unwrap_err(),
            DegenerateBrushError::NoVolume
        );
    }

    #[test]
    fn test_duplicate_plane() {
        let mut brush = box_brush();
        let floor = brush.planes[4].clone();
        brush.planes.push(floor);
        let faces = brush_faces(&brush, &BrushOptions::default()).unwrap();
        assert_eq!(faces.len(), 6);
    }

    #[test]
    fn test_standard_texcoords() {
        let brush = box_brush();
        let floor = &brush.planes[4];
        let vectors = floor.texture_vectors(v(0.0, 0.0, -1.0));
        assert_eq!(vectors.s, v(1.0, 0.0, 0.0));
        assert_eq!(vectors.t, v(0.0, -1.0, 0.0));
        assert_eq!(vectors.texcoord(v(64.0, -64.0, -16.0), 64, 64), [1.0, 1.0]);

        let mut shifted = floor.clone();
        shifted.axes = TextureAxes::Standard { offset: [32.0, 0.0] };
        shifted.scale = [2.0, 0.0];
        let vectors = shifted.texture_vectors(v(0.0, 0.0, -1.0));
        assert_eq!(vectors.texcoord(v(64.0, -64.0, -16.0), 64, 64), [1.0, 1.0]);
    }

    #[test]
    fn test_rotated_axes() {
        let (s, t) = standard_axes(v(0.0, 0.0, 1.0), 90.0);
        assert_eq!(s, v(0.0, 1.0, 0.0));
        assert_eq!(t, v(1.0, 0.0, 0.0));

        let (s, t) = standard_axes(v(0.0, 0.0, 1.0), 45.0);
        assert!((s.magnitude() - 1.0).abs() < 1e-12);
        assert!(s.dot(t).abs() < 1e-12);
    }

    #[test]
    fn test_valve_texcoords() {
        let mut p = box_brush().planes[0].clone();
        p.axes = TextureAxes::Valve {
            s: v(0.0, 1.0, 0.0),
            s_offset: 8.0,
            t: v(0.0, 0.0, -1.0),
            t_offset: 0.0,
        };
        p.rotation = 45.0;
        let vectors = p.texture_vectors(v(-1.0, 0.0, 0.0));
        assert_eq!(vectors.texcoord(v(-64.0, 24.0, -16.0), 32, 16), [1.0, 1.0]);
    }
}
