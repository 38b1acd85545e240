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

use std::ops::Neg;

use cgmath::{InnerSpace, Vector3};

/// Determinants smaller than this are treated as singular when intersecting planes.
const SINGULAR_EPSILON: f64 = 1e-9;

#[derive(Copy, Clone, Debug, Eq, PartialEq, FromPrimitive)]
pub enum Axis {
    X = 0,
    Y = 1,
    Z = 2,
}

#[derive(Copy, Clone, Debug, PartialEq)]
pub enum HyperplaneSide {
    Positive = 0,
    Negative = 1,
}

impl Neg for HyperplaneSide {
    type Output = HyperplaneSide;

    fn neg(self) -> Self::Output {
        match self {
            HyperplaneSide::Positive => HyperplaneSide::Negative,
            HyperplaneSide::Negative => HyperplaneSide::Positive,
        }
    }
}

impl HyperplaneSide {
    pub fn from_dist(dist: f64) -> HyperplaneSide {
        if dist >= 0.0 {
            HyperplaneSide::Positive
        } else {
            HyperplaneSide::Negative
        }
    }
}

/// A plane in point-normal form: the set of points `p` for which `normal · p == dist`.
#[derive(Clone, Debug, PartialEq)]
pub struct Hyperplane {
    normal: Vector3<f64>,
    dist: f64,
}

impl Neg for Hyperplane {
    type Output = Self;

    fn neg(self) -> Self::Output {
        Hyperplane {
            normal: -self.normal,
            dist: -self.dist,
        }
    }
}

impl Hyperplane {
    /// Creates a new hyperplane aligned along the given normal, `dist` units away from the origin.
    pub fn new(normal: Vector3<f64>, dist: f64) -> Hyperplane {
        Hyperplane {
            normal: normal.normalize(),
            dist,
        }
    }

    /// Creates the hyperplane passing through three points.
    ///
    /// The normal is `(a - b) × (c - b)`, which points out of a brush whose faces are listed with
    /// the usual MAP point order. Returns `None` if the points are collinear.
    pub fn from_points(a: Vector3<f64>, b: Vector3<f64>, c: Vector3<f64>) -> Option<Hyperplane> {
        let normal = (a - b).cross(c - b);
        let len = normal.magnitude();
        if len < SINGULAR_EPSILON {
            return None;
        }

        let normal = normal / len;
        Some(Hyperplane {
            normal,
            dist: normal.dot(a),
        })
    }

    /// Returns the surface normal of this plane.
    pub fn normal(&self) -> Vector3<f64> {
        self.normal
    }

    pub fn dist(&self) -> f64 {
        self.dist
    }

    /// Calculates the signed distance between this hyperplane and the given point.
    ///
    /// Points in front of the plane have a positive distance.
    pub fn point_dist(&self, point: Vector3<f64>) -> f64 {
        point.dot(self.normal) - self.dist
    }

    /// Calculates which side of this hyperplane the given point belongs to.
    ///
    /// Points with a distance of 0.0 are considered to be on the positive side.
    pub fn point_side(&self, point: Vector3<f64>) -> HyperplaneSide {
        HyperplaneSide::from_dist(self.point_dist(point))
    }

    /// Finds the single point shared by three planes.
    ///
    /// This solves the system `n_i · x = d_i` with the closed form of Cramer's rule. Returns
    /// `None` when the determinant vanishes, i.e. when two of the planes are parallel or all three
    /// share a common line.
    pub fn intersect3(p0: &Hyperplane, p1: &Hyperplane, p2: &Hyperplane) -> Option<Vector3<f64>> {
        let n12 = p1.normal.cross(p2.normal);
        let det = p0.normal.dot(n12);
        if det.abs() < SINGULAR_EPSILON {
            return None;
        }

        let n20 = p2.normal.cross(p0.normal);
        let n01 = p0.normal.cross(p1.normal);
        Some((n12 * p0.dist + n20 * p1.dist + n01 * p2.dist) / det)
    }
}

/// Rounds each component of `v` to the nearest integer.
pub fn round_vector(v: Vector3<f64>) -> Vector3<f64> {
    Vector3::new(v.x.round(), v.y.round(), v.z.round())
}
