//! Reconstructed shape data.

use std::collections::BTreeMap;

use serde::Serialize;
use shapeasm_tessellate::Point3;

/// A vertex position with the index it was assigned in its shape or frame.
///
/// X and Y are stored sign-inverted relative to the source values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Point {
    /// Sequence index referenced by faces.
    pub index: usize,
    /// X (negated from source).
    pub x: i64,
    /// Y (negated from source).
    pub y: i64,
    /// Z (as in source).
    pub z: i64,
}

impl Point {
    /// Build a point from source coordinates, inverting X and Y. Returns
    /// `None` when X or Y is `i64::MIN`.
    pub fn from_source(index: usize, x: i64, y: i64, z: i64) -> Option<Self> {
        Some(Self {
            index,
            x: x.checked_neg()?,
            y: y.checked_neg()?,
            z,
        })
    }

    /// Position as a floating-point 3D point.
    pub fn position(&self) -> Point3 {
        Point3::new(self.x as f64, self.y as f64, self.z as f64)
    }
}

/// One corner of a face.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FaceRef {
    /// Index of the referenced point.
    pub point: usize,
    /// Position of this corner within the face (or within its triangle,
    /// once triangulated).
    pub position: usize,
}

/// A face: ordered corners, a normal, and a color.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Face {
    /// Corners. When `triangulated`, every 3 consecutive refs are a triangle.
    pub refs: Vec<FaceRef>,
    /// Face normal (X and Y inverted like point positions).
    pub normal: [i64; 3],
    /// Color / material index.
    pub color: i64,
    /// Face id as written in source.
    pub id: i64,
    /// Whether `refs` is a flat triangle list.
    pub triangulated: bool,
}

impl Face {
    /// Create a face from a ring of point indices.
    pub fn from_ring(points: &[usize], normal: [i64; 3], color: i64, id: i64) -> Self {
        Self {
            refs: points
                .iter()
                .enumerate()
                .map(|(position, &point)| FaceRef { point, position })
                .collect(),
            normal,
            color,
            id,
            triangulated: points.len() == 3,
        }
    }

    /// A two-point face, drawn as a line.
    pub fn is_line(&self) -> bool {
        self.refs.len() == 2
    }

    /// Referenced point indices in corner order.
    pub fn point_indices(&self) -> Vec<usize> {
        self.refs.iter().map(|r| r.point).collect()
    }

    /// Triangles as point-index triples; empty unless triangulated.
    pub fn triangles(&self) -> impl Iterator<Item = [usize; 3]> + '_ {
        let refs: &[FaceRef] = if self.triangulated { &self.refs } else { &[] };
        refs.chunks_exact(3)
            .map(|t| [t[0].point, t[1].point, t[2].point])
    }
}

/// An animation keyframe with its own point list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Frame {
    /// Frame name (label without the leading `.`).
    pub name: String,
    /// Points in push order.
    pub points: Vec<Point>,
}

impl Frame {
    /// Create an empty frame.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            points: Vec::new(),
        }
    }
}

/// One entry of a BSP jump table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BspEntry {
    /// Entry id.
    pub id: i64,
    /// Label of the face list for this node.
    pub faces_ptr: String,
    /// Label jumped to from this node.
    pub jump_ptr: String,
}

/// Header metadata of a shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ShapeHeader {
    /// Display name.
    pub name: String,
    /// Name made unique across the file by the post-pass.
    pub unique_name: String,
    /// Label of the shape's point data.
    pub point_ptr: String,
    /// Label of the shape's face data.
    pub face_ptr: String,
    /// Label written on the header line itself.
    pub inline_label: Option<String>,
    /// Name of the shape whose data this one reuses.
    pub points_to: Option<String>,
    /// Size shift hint for the renderer.
    pub size_shift: i64,
    /// Byte offset of the header line.
    pub source_offset: usize,
    /// Line number of the header line.
    pub source_line: usize,
}

impl ShapeHeader {
    /// Whether two headers point at the same point and face data.
    pub fn same_data(&self, other: &ShapeHeader) -> bool {
        self.point_ptr == other.point_ptr && self.face_ptr == other.face_ptr
    }
}

/// Largest absolute coordinate seen on each axis.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Extents {
    /// Max |x|.
    pub x: i64,
    /// Max |y|.
    pub y: i64,
    /// Max |z|.
    pub z: i64,
}

impl Extents {
    /// Grow to include `p`.
    pub fn include(&mut self, p: &Point) {
        self.x = self.x.max(p.x.saturating_abs());
        self.y = self.y.max(p.y.saturating_abs());
        self.z = self.z.max(p.z.saturating_abs());
    }
}

/// A reconstructed shape.
///
/// Two shapes compare equal when their headers point at the same data.
#[derive(Debug, Clone, Serialize)]
pub struct Shape {
    /// Header metadata.
    pub header: ShapeHeader,
    /// Points outside any frame.
    pub points: Vec<Point>,
    /// Keyframes in the order they were opened.
    pub frames: Vec<Frame>,
    /// Faces in source order.
    pub faces: Vec<Face>,
    /// BSP jump table keyed by entry id.
    pub bsp: BTreeMap<i64, BspEntry>,
    /// Running bounding extents.
    pub extents: Extents,
}

impl Shape {
    /// Create an empty shape for `header`.
    pub fn new(header: ShapeHeader) -> Self {
        Self {
            header,
            points: Vec::new(),
            frames: Vec::new(),
            faces: Vec::new(),
            bsp: BTreeMap::new(),
            extents: Extents::default(),
        }
    }

    /// Display name.
    pub fn name(&self) -> &str {
        &self.header.name
    }

    /// Frame by name.
    pub fn frame(&self, name: &str) -> Option<&Frame> {
        self.frames.iter().find(|f| f.name == name)
    }

    /// Point with `index`, looking in the base points first and then in the
    /// first frame that has it.
    pub fn point(&self, index: usize) -> Option<&Point> {
        self.points
            .iter()
            .find(|p| p.index == index)
            .or_else(|| {
                self.frames
                    .iter()
                    .find_map(|f| f.points.iter().find(|p| p.index == index))
            })
    }

    /// Replace this shape's geometry with a deep copy of `other`'s.
    pub fn copy_geometry_from(&mut self, other: &Shape) {
        self.points = other.points.clone();
        self.frames = other.frames.clone();
        self.faces = other.faces.clone();
        self.bsp = other.bsp.clone();
        self.extents = other.extents;
    }
}

impl PartialEq for Shape {
    fn eq(&self, other: &Self) -> bool {
        self.header.same_data(&other.header)
    }
}

impl Eq for Shape {}

#[cfg(test)]
mod tests {
    use super::*;

    fn header(name: &str, points: &str, faces: &str) -> ShapeHeader {
        ShapeHeader {
            name: name.into(),
            unique_name: name.into(),
            point_ptr: points.into(),
            face_ptr: faces.into(),
            inline_label: None,
            points_to: None,
            size_shift: 0,
            source_offset: 0,
            source_line: 0,
        }
    }

    #[test]
    fn test_point_inverts_x_and_y() {
        let p = Point::from_source(0, 1, 2, 3).unwrap();
        assert_eq!((p.x, p.y, p.z), (-1, -2, 3));
        assert!(Point::from_source(0, i64::MIN, 0, 0).is_none());
        assert!(Point::from_source(0, 0, i64::MIN, 0).is_none());
        let far = Point::from_source(0, i64::MAX, 0, i64::MIN).unwrap();
        assert_eq!(far.x, -i64::MAX);
    }

    #[test]
    fn test_extents_track_absolute_max() {
        let mut e = Extents::default();
        e.include(&Point::from_source(0, 5, -7, 2).unwrap());
        e.include(&Point::from_source(1, -3, 1, -9).unwrap());
        assert_eq!(e, Extents { x: 5, y: 7, z: 9 });
        e.include(&Point::from_source(2, 0, 0, i64::MIN).unwrap());
        assert_eq!(e.z, i64::MAX);
    }

    #[test]
    fn test_face_triangles() {
        let tri = Face::from_ring(&[4, 5, 6], [0, 0, 1], 2, 0);
        assert!(tri.triangulated);
        assert_eq!(tri.triangles().collect::<Vec<_>>(), vec![[4, 5, 6]]);

        let quad = Face::from_ring(&[0, 1, 2, 3], [0, 0, 1], 2, 0);
        assert!(!quad.triangulated);
        assert_eq!(quad.triangles().count(), 0);

        assert!(Face::from_ring(&[0, 1], [0, 0, 0], 1, 0).is_line());
    }

    #[test]
    fn test_shape_equality_uses_pointers() {
        let a = Shape::new(header("a", "pts", "fcs"));
        let b = Shape::new(header("b", "pts", "fcs"));
        let c = Shape::new(header("a", "pts", "other"));
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_point_lookup_falls_back_to_frames() {
        let mut s = Shape::new(header("a", "p", "f"));
        s.points.push(Point::from_source(0, 1, 1, 1).unwrap());
        let mut frame = Frame::new("f1");
        frame.points.push(Point::from_source(1, 2, 2, 2).unwrap());
        s.frames.push(frame);
        assert_eq!(s.point(1).map(|p| p.z), Some(2));
        assert!(s.point(9).is_none());
    }
}
