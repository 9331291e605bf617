#![warn(missing_docs)]

//! Ear-clipping triangulation for polygonal shape faces.
//!
//! Faces in shape source may list any number of points. Renderers and mesh
//! exporters want triangles, so faces with more than three points are split
//! into `N - 2` triangles whose corners are drawn from the original ring.

mod error;

pub use error::TriangulationError;

use nalgebra::{Point3 as NPoint3, Vector3};

/// A point in 3D space.
pub type Point3 = NPoint3<f64>;

/// A vector in 3D space.
pub type Vec3 = Vector3<f64>;

/// Triangle as three positions into the input ring.
pub type Triangle = [usize; 3];

/// Below this, a normal or a cross product counts as zero.
const EPSILON: f64 = 1e-9;

/// Which ring order produced a triangulation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Winding {
    /// The ring as given.
    Forward,
    /// The ring reversed.
    Reversed,
}

/// Triangulate a planar ring whose winding agrees with `normal`.
///
/// Returns `ring.len() - 2` triangles. Each triangle lists ring positions in
/// the order the ear was clipped (previous, tip, next). A zero `normal` is
/// replaced by the polygon's own Newell normal.
pub fn triangulate(ring: &[Point3], normal: Vec3) -> Result<Vec<Triangle>, TriangulationError> {
    let n = ring.len();
    if n < 3 {
        return Err(TriangulationError::TooFewPoints(n));
    }

    let normal = if normal.norm() > EPSILON {
        normal
    } else {
        let newell = newell_normal(ring);
        if newell.norm() <= EPSILON {
            return Err(TriangulationError::DegenerateNormal);
        }
        newell
    };

    let project = projector(&normal);
    let flat: Vec<(f64, f64)> = ring.iter().map(&project).collect();

    let mut remaining: Vec<usize> = (0..n).collect();
    let mut triangles = Vec::with_capacity(n - 2);

    while remaining.len() > 3 {
        let m = remaining.len();
        let mut clipped = None;

        for i in 0..m {
            let prev = (i + m - 1) % m;
            let next = (i + 1) % m;

            let a = &ring[remaining[prev]];
            let b = &ring[remaining[i]];
            let c = &ring[remaining[next]];

            // Convex and wound the same way as the face.
            let turn = (b - a).cross(&(c - b));
            if turn.dot(&normal) <= EPSILON {
                continue;
            }

            let (fa, fb, fc) = (
                flat[remaining[prev]],
                flat[remaining[i]],
                flat[remaining[next]],
            );
            let blocked = (0..m)
                .filter(|&j| j != prev && j != i && j != next)
                .any(|j| point_in_triangle_2d(flat[remaining[j]], fa, fb, fc));
            if blocked {
                continue;
            }

            triangles.push([remaining[prev], remaining[i], remaining[next]]);
            clipped = Some(i);
            break;
        }

        match clipped {
            Some(i) => {
                remaining.remove(i);
            }
            None => {
                return Err(TriangulationError::NoEar {
                    remaining: remaining.len(),
                })
            }
        }
    }

    let (a, b, c) = (&ring[remaining[0]], &ring[remaining[1]], &ring[remaining[2]]);
    if (b - a).cross(&(c - b)).dot(&normal) <= EPSILON {
        return Err(TriangulationError::NoEar { remaining: 3 });
    }
    triangles.push([remaining[0], remaining[1], remaining[2]]);
    Ok(triangles)
}

/// Triangulate, retrying once with the ring reversed.
///
/// Triangle positions always refer to the ring as given.
pub fn triangulate_either_winding(
    ring: &[Point3],
    normal: Vec3,
) -> Result<(Vec<Triangle>, Winding), TriangulationError> {
    match triangulate(ring, normal) {
        Ok(tris) => Ok((tris, Winding::Forward)),
        Err(TriangulationError::NoEar { .. }) => {
            let reversed: Vec<Point3> = ring.iter().rev().copied().collect();
            let last = ring.len() - 1;
            let tris = triangulate(&reversed, normal)?
                .into_iter()
                .map(|t| [last - t[0], last - t[1], last - t[2]])
                .collect();
            Ok((tris, Winding::Reversed))
        }
        Err(e) => Err(e),
    }
}

/// Newell's method: robust normal of a (possibly non-convex) ring.
pub fn newell_normal(ring: &[Point3]) -> Vec3 {
    let mut n = Vec3::zeros();
    for (i, cur) in ring.iter().enumerate() {
        let next = &ring[(i + 1) % ring.len()];
        n.x += (cur.y - next.y) * (cur.z + next.z);
        n.y += (cur.z - next.z) * (cur.x + next.x);
        n.z += (cur.x - next.x) * (cur.y + next.y);
    }
    n
}

/// Drop the axis the normal is most aligned with.
fn projector(normal: &Vec3) -> impl Fn(&Point3) -> (f64, f64) {
    let (ax, ay, az) = (normal.x.abs(), normal.y.abs(), normal.z.abs());
    let drop = if ax >= ay && ax >= az {
        0
    } else if ay >= az {
        1
    } else {
        2
    };
    move |p: &Point3| match drop {
        0 => (p.y, p.z),
        1 => (p.z, p.x),
        _ => (p.x, p.y),
    }
}

/// Check if a point is strictly inside a triangle in 2D using barycentric
/// coordinates.
fn point_in_triangle_2d(p: (f64, f64), a: (f64, f64), b: (f64, f64), c: (f64, f64)) -> bool {
    let v0 = (c.0 - a.0, c.1 - a.1);
    let v1 = (b.0 - a.0, b.1 - a.1);
    let v2 = (p.0 - a.0, p.1 - a.1);

    let dot00 = v0.0 * v0.0 + v0.1 * v0.1;
    let dot01 = v0.0 * v1.0 + v0.1 * v1.1;
    let dot02 = v0.0 * v2.0 + v0.1 * v2.1;
    let dot11 = v1.0 * v1.0 + v1.1 * v1.1;
    let dot12 = v1.0 * v2.0 + v1.1 * v2.1;

    let denom = dot00 * dot11 - dot01 * dot01;
    if denom.abs() < EPSILON {
        return false;
    }
    let inv_denom = 1.0 / denom;
    let u = (dot11 * dot02 - dot01 * dot12) * inv_denom;
    let v = (dot00 * dot12 - dot01 * dot02) * inv_denom;

    let eps = 1e-10;
    u > eps && v > eps && (u + v) < 1.0 - eps
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn ring(coords: &[(f64, f64)]) -> Vec<Point3> {
        coords.iter().map(|&(x, y)| Point3::new(x, y, 0.0)).collect()
    }

    fn area(ring: &[Point3], tris: &[Triangle]) -> f64 {
        tris.iter()
            .map(|t| {
                let (a, b, c) = (ring[t[0]], ring[t[1]], ring[t[2]]);
                (b - a).cross(&(c - a)).norm() / 2.0
            })
            .sum()
    }

    fn pentagon() -> Vec<Point3> {
        ring(&[(0.0, 0.0), (4.0, 0.0), (5.0, 3.0), (2.0, 5.0), (-1.0, 3.0)])
    }

    #[test]
    fn test_convex_pentagon() {
        let pts = pentagon();
        let tris = triangulate(&pts, Vec3::z()).unwrap();
        assert_eq!(tris.len(), 3);
        for t in &tris {
            assert!(t.iter().all(|&i| i < 5), "{t:?}");
            assert_ne!(t[0], t[1]);
            assert_ne!(t[1], t[2]);
        }
        assert_relative_eq!(area(&pts, &tris), 21.0, epsilon = 1e-9);
    }

    #[test]
    fn test_wrong_winding_fails_then_retry_succeeds() {
        let mut pts = pentagon();
        pts.reverse();
        assert!(matches!(
            triangulate(&pts, Vec3::z()),
            Err(TriangulationError::NoEar { .. })
        ));

        let (tris, winding) = triangulate_either_winding(&pts, Vec3::z()).unwrap();
        assert_eq!(winding, Winding::Reversed);
        assert_eq!(tris.len(), 3);
        assert_relative_eq!(area(&pts, &tris), 21.0, epsilon = 1e-9);
    }

    #[test]
    fn test_concave_l_shape() {
        let pts = ring(&[
            (0.0, 0.0),
            (2.0, 0.0),
            (2.0, 1.0),
            (1.0, 1.0),
            (1.0, 2.0),
            (0.0, 2.0),
        ]);
        let tris = triangulate(&pts, Vec3::z()).unwrap();
        assert_eq!(tris.len(), 4);
        assert_relative_eq!(area(&pts, &tris), 3.0, epsilon = 1e-9);
    }

    #[test]
    fn test_zero_normal_uses_newell() {
        let pts = pentagon();
        let tris = triangulate(&pts, Vec3::zeros()).unwrap();
        assert_eq!(tris.len(), 3);
    }

    #[test]
    fn test_vertical_face() {
        let pts = vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(0.0, 4.0, 0.0),
            Point3::new(0.0, 4.0, 4.0),
            Point3::new(0.0, 0.0, 4.0),
        ];
        let tris = triangulate(&pts, Vec3::x()).unwrap();
        assert_eq!(tris.len(), 2);
    }

    #[test]
    fn test_degenerate() {
        assert_eq!(
            triangulate(&ring(&[(0.0, 0.0), (1.0, 0.0)]), Vec3::z()),
            Err(TriangulationError::TooFewPoints(2))
        );
        let collinear = ring(&[(0.0, 0.0), (1.0, 0.0), (2.0, 0.0), (3.0, 0.0)]);
        assert_eq!(
            triangulate(&collinear, Vec3::zeros()),
            Err(TriangulationError::DegenerateNormal)
        );
    }

    #[test]
    fn test_newell_normal_direction() {
        let n = newell_normal(&pentagon());
        assert!(n.z > 0.0);
        assert_relative_eq!(n.x, 0.0);
        assert_relative_eq!(n.y, 0.0);
    }
}
