//! Chunk-by-chunk shape reconstruction.

use std::sync::atomic::{AtomicBool, Ordering};

use shapeasm_expr::Resolver;
use shapeasm_source::{Chunk, ChunkKind};
use shapeasm_tessellate::{triangulate_either_winding, Triangle, Vec3, Winding};
use tracing::{debug, info, warn};

use crate::context::{ImportContext, ShapeContext};
use crate::error::{ImportError, Result};
use crate::face::{FaceRecognizer, MacroFaceRecognizer, RawFace};
use crate::header::{HeaderRecognizer, MacroHeaderRecognizer};
use crate::instruction::Instruction;
use crate::model::{BspEntry, Face, FaceRef, Point, Shape};
use crate::postpass::{dereference_blanks, fix_duplicate_names};
use crate::shape_file::ShapeFile;

/// Interprets classified chunks into shapes.
///
/// Errors raised by a chunk are written to the error log and reset the
/// interpretation state; the import carries on with the next chunk.
pub struct Importer<'r> {
    resolver: Resolver<'r>,
    headers: Box<dyn HeaderRecognizer + 'r>,
    faces: Box<dyn FaceRecognizer + 'r>,
    cancel: Option<&'r AtomicBool>,
}

impl<'r> Importer<'r> {
    /// Importer using `resolver` for parameter expressions and the default
    /// header and face recognizers.
    pub fn new(resolver: Resolver<'r>) -> Self {
        Self {
            resolver,
            headers: Box::new(MacroHeaderRecognizer::default()),
            faces: Box::new(MacroFaceRecognizer),
            cancel: None,
        }
    }

    /// Replace the header recognizer.
    pub fn with_header_recognizer(mut self, recognizer: impl HeaderRecognizer + 'r) -> Self {
        self.headers = Box::new(recognizer);
        self
    }

    /// Replace the face recognizer.
    pub fn with_face_recognizer(mut self, recognizer: impl FaceRecognizer + 'r) -> Self {
        self.faces = Box::new(recognizer);
        self
    }

    /// Stop at the next chunk once `flag` is set.
    pub fn with_cancel(mut self, flag: &'r AtomicBool) -> Self {
        self.cancel = Some(flag);
        self
    }

    fn cancelled(&self) -> bool {
        self.cancel.is_some_and(|c| c.load(Ordering::Relaxed))
    }

    /// Interpret `chunks` in order and run the post-pass.
    pub fn import<'c>(&self, chunks: impl IntoIterator<Item = &'c Chunk>) -> ShapeFile {
        let mut file = ShapeFile::new();
        let mut blanks = Vec::new();
        let mut ctx = ImportContext::new();

        for chunk in chunks {
            if self.cancelled() {
                warn!(at = %chunk.describe(), "import cancelled");
                file.log_line(format!("import cancelled before {}", chunk.describe()));
                break;
            }
            if let Err(e) = self.process(chunk, &mut ctx, &mut file, &mut blanks) {
                warn!(chunk = %chunk.describe(), error = %e, "chunk failed, resetting");
                file.log_block(&ctx.describe(), &chunk.describe(), ctx.frame_index(), &e.to_string());
                ctx.reset();
            }
        }

        if let Some(open) = ctx.take_open_shape() {
            debug!(shape = open.name(), "unterminated shape kept as blank");
            blanks.push(open);
        }

        file.blanks = dereference_blanks(&mut file.shapes, blanks);
        fix_duplicate_names(&mut file.shapes);

        info!(
            shapes = file.shapes.len(),
            blanks = file.blanks.len(),
            declared = file.declared_names.len(),
            errors = file.has_errors(),
            "import finished"
        );
        file
    }

    fn process(
        &self,
        chunk: &Chunk,
        ctx: &mut ImportContext,
        file: &mut ShapeFile,
        blanks: &mut Vec<Shape>,
    ) -> Result<()> {
        if chunk.kind() != ChunkKind::Line {
            return Ok(());
        }

        if let Some(header) = self.headers.recognize(chunk, &self.resolver)? {
            debug!(shape = %header.name, line = chunk.line_number(), "shape header");
            file.declared_names.insert(header.name.clone());
            if let Some(previous) = ctx.open(header) {
                debug!(shape = previous.name(), "shape left open, kept as blank");
                blanks.push(previous);
            }
            return Ok(());
        }

        // Lines before the first header belong to no shape.
        let Some(shape) = ctx.shape_mut() else {
            return Ok(());
        };
        if let Some(label) = chunk.label() {
            shape.observe_label(label);
        }
        let Some(inv) = chunk.invocation() else {
            return Ok(());
        };

        if let Some(raw) = self.faces.recognize(inv, &self.resolver)? {
            let face = self.build_face(shape.shape(), raw, file);
            shape.push_face(face);
            return Ok(());
        }

        let instruction = Instruction::decode(inv);
        if instruction == Instruction::EndShape {
            if let Some(done) = ctx.end_shape() {
                debug!(shape = done.name(), points = done.points.len(), faces = done.faces.len(), "shape finished");
                file.shapes.push(done);
            }
            return Ok(());
        }

        let Some(shape) = ctx.shape_mut() else {
            return Ok(());
        };
        self.execute(shape, inv.name(), instruction)
    }

    fn execute(&self, shape: &mut ShapeContext, name: &str, instruction: Instruction<'_>) -> Result<()> {
        match instruction {
            Instruction::BspInit { end_label } => {
                let label = end_label.ok_or_else(|| ImportError::missing_parameter(name, 0))?;
                shape.begin_bsp_region(label);
            }
            Instruction::Bsp { id, faces, jump } => {
                let id = self.eval(id)?;
                shape.push_bsp(BspEntry {
                    id,
                    faces_ptr: faces.to_string(),
                    jump_ptr: jump.to_string(),
                });
            }
            Instruction::Frames { count } => {
                let n = self.eval(count)?;
                shape.begin_frames_region(usize::try_from(n).unwrap_or(0));
            }
            Instruction::Points(mode) => shape.begin_points_region(mode),
            Instruction::JumpTab { label } => {
                let label = label.ok_or_else(|| ImportError::missing_parameter(name, 0))?;
                shape.jump_table(label);
            }
            Instruction::Jump { label } => {
                let label = label.ok_or_else(|| ImportError::missing_parameter(name, 0))?;
                shape.jump(label);
            }
            Instruction::FacesEnd => shape.lock_faces(),
            Instruction::EndPoints => shape.end_points_region(),
            Instruction::Point { kind, x, y, z } => {
                let (x, y, z) = (self.eval(x)?, self.eval(y)?, self.eval(z)?);
                shape.push_point(name, kind, x, y, z)?;
            }
            Instruction::EndShape | Instruction::Other => {}
        }
        Ok(())
    }

    fn eval(&self, text: &str) -> Result<i64> {
        self.resolver
            .resolve(text)
            .map_err(|e| ImportError::expression(text, e))
    }

    /// Turn a parsed face into a model face, triangulating rings of more
    /// than three points. Failures are logged and leave the ring as is.
    fn build_face(&self, shape: &Shape, raw: RawFace, file: &mut ShapeFile) -> Face {
        let mut face = Face::from_ring(&raw.points, raw.normal, raw.color, raw.id);
        if raw.points.len() <= 3 {
            return face;
        }

        match triangulate_ring(shape, &raw) {
            Ok((triangles, winding)) => {
                if winding == Winding::Reversed {
                    debug!(shape = shape.name(), face = raw.id, "triangulated with reversed winding");
                }
                face.refs = triangles
                    .iter()
                    .flat_map(|tri| {
                        tri.iter().enumerate().map(|(position, &i)| FaceRef {
                            point: raw.points[i],
                            position,
                        })
                    })
                    .collect();
                face.triangulated = true;
            }
            Err(e) => {
                warn!(shape = shape.name(), face = raw.id, error = %e, "face kept untriangulated");
                file.log_line(format!(
                    "triangulation failure: shape {} face {} points {:?}: {e}",
                    shape.name(),
                    raw.id,
                    raw.points
                ));
            }
        }
        face
    }
}

fn triangulate_ring(shape: &Shape, raw: &RawFace) -> Result<(Vec<Triangle>, Winding)> {
    let ring = raw
        .points
        .iter()
        .map(|&index| {
            shape
                .point(index)
                .map(Point::position)
                .ok_or(ImportError::MissingPoint { index })
        })
        .collect::<Result<Vec<_>>>()?;
    let [nx, ny, nz] = raw.normal;
    let normal = Vec3::new(nx as f64, ny as f64, nz as f64);
    Ok(triangulate_either_winding(&ring, normal)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use shapeasm_expr::ConstantTable;
    use shapeasm_source::{classify_source, FileId, TextEncoding};

    fn chunks(src: &str) -> Vec<Chunk> {
        classify_source(src.as_bytes(), FileId(0), TextEncoding::Utf8)
            .unwrap()
            .chunks
    }

    fn import(src: &str) -> ShapeFile {
        Importer::new(Resolver::plain()).import(&chunks(src))
    }

    const SHIP: &str = "\
; a small ship
ship shapehdr ship_p,2,ship_f
\tpointsb
\tpb 0,0,0
\tpb 10,0,0
\tpb 10,10,0
\tfend
\tendpoints
\tface3 5,0,0,0,64,0,1,2
\tendshape
";

    #[test]
    fn test_minimal_ship() {
        let file = import(SHIP);
        assert_eq!(file.shapes.len(), 1, "{}", file.error_log);
        let ship = &file.shapes[0];
        assert_eq!(ship.name(), "ship");
        assert_eq!(ship.points.len(), 3);
        assert_eq!(ship.faces.len(), 1);
        assert!(ship.faces[0].triangulated);
        assert_eq!(ship.faces[0].point_indices(), vec![0, 1, 2]);
        assert_eq!(ship.points[1].x, -10);
        assert!(file.error_log.is_empty());
        assert!(file.blanks.is_empty());
        assert!(file.declared_names.contains("ship"));
    }

    #[test]
    fn test_pb_negates_x_and_y() {
        let file = import("s shapehdr p,0,f\n\tpointsb\n\tpb 1,2,3\n\tendshape\n");
        let p = file.shapes[0].points[0];
        assert_eq!((p.x, p.y, p.z), (-1, -2, 3));
    }

    #[test]
    fn test_constants_resolve_in_points() {
        let mut table = ConstantTable::new();
        table.define("RADIUS", "10");
        let tables = [table];
        let file = Importer::new(Resolver::new(&tables))
            .import(&chunks("s shapehdr p,0,f\n\tpointsw\n\tpw RADIUS,-RADIUS,$1F\n\tendshape\n"));
        let p = file.shapes[0].points[0];
        assert_eq!((p.x, p.y, p.z), (-10, 10, 31));
    }

    #[test]
    fn test_error_logged_and_context_reset() {
        let src = "\
a shapehdr a_p,0,a_f
\tpb 1,2,3
\tpointsb
\tpb 1,1,1
\tendshape
b shapehdr b_p,0,b_f
\tpointsb
\tpb 4,5,6
\tendshape
";
        let file = import(src);
        assert!(file.error_log.contains("=== import error ==="));
        assert!(file.error_log.contains("not in a points region"), "{}", file.error_log);
        assert!(file.error_log.contains("frame: 0"));
        // The failing shape is dropped; lines up to the next header are ignored.
        assert_eq!(file.shapes.len(), 1);
        assert_eq!(file.shapes[0].name(), "b");
        assert_eq!(file.shapes[0].points.len(), 1);
        assert!(file.declared_names.contains("a"));
        assert_eq!(file.missing_declarations(), vec!["a"]);
    }

    #[test]
    fn test_extreme_values_logged_not_fatal() {
        let src = "\
a shapehdr a_p,0,a_f
\tpointsb
\tpb -9223372036854775808,0,0
b shapehdr b_p,0,b_f
\tpointsb
\tpby2 0,9223372036854775807,0
c shapehdr c_p,0,c_f
\tface 1,0,-9223372036854775808,0,1,0,0
d shapehdr d_p,0,d_f
\tpointsb
\tpb 1,2,3
\tendshape
";
        let file = import(src);
        assert_eq!(file.error_log.matches("=== import error ===").count(), 3, "{}", file.error_log);
        assert!(file.error_log.contains("out of range"), "{}", file.error_log);
        assert_eq!(file.shapes.len(), 1);
        assert_eq!(file.shapes[0].name(), "d");
        assert_eq!(file.shapes[0].points.len(), 1);
    }

    #[test]
    fn test_custom_face_recognizer() {
        struct Quads;
        impl FaceRecognizer for Quads {
            fn recognize(&self, inv: &shapeasm_source::MacroInvocation, _: &Resolver<'_>) -> Result<Option<RawFace>> {
                Ok(inv.is("quad").then(|| RawFace {
                    color: 9,
                    id: 0,
                    normal: [0, 0, 1],
                    points: vec![0, 1],
                }))
            }
        }

        let src = "s shapehdr p,0,f\n\tquad\n\tface 1,0,0,0,1,0,1\n\tendshape\n";
        let file = Importer::new(Resolver::plain())
            .with_face_recognizer(Quads)
            .import(&chunks(src));
        let faces = &file.shapes[0].faces;
        assert_eq!(faces.len(), 1);
        assert_eq!(faces[0].color, 9);
        assert!(faces[0].is_line());
    }

    #[test]
    fn test_mirrored_points() {
        let file = import("m shapehdr p,0,f\n\tpointsxb\n\tpb 3,1,2\n\tendshape\n");
        let pts = &file.shapes[0].points;
        assert_eq!(pts.len(), 2);
        assert_eq!((pts[0].x, pts[1].x), (-3, 3));
        assert_eq!((pts[0].index, pts[1].index), (0, 1));
    }

    #[test]
    fn test_pentagon_face_triangulated() {
        let src = "\
pent shapehdr p,0,f
\tpointsw
\tpw 0,0,0
\tpw -4,0,0
\tpw -5,-3,0
\tpw -2,-5,0
\tpw 1,-3,0
\tendpoints
\tface5 1,0,0,0,1,0,1,2,3,4
\tendshape
";
        let file = import(src);
        assert!(file.error_log.is_empty(), "{}", file.error_log);
        let face = &file.shapes[0].faces[0];
        assert!(face.triangulated);
        let tris: Vec<[usize; 3]> = face.triangles().collect();
        assert_eq!(tris.len(), 3);
        assert!(tris.iter().flatten().all(|i| *i < 5));
        assert!(face.refs.chunks(3).all(|t| t.iter().map(|r| r.position).eq(0..3)));
    }

    #[test]
    fn test_untriangulable_face_logged() {
        let src = "\
flat shapehdr p,0,f
\tpointsb
\tpb 0,0,0
\tpb 1,0,0
\tpb 2,0,0
\tpb 3,0,0
\tface4 1,0,0,0,1,0,1,2,3
\tendshape
";
        let file = import(src);
        assert_eq!(file.shapes.len(), 1);
        let face = &file.shapes[0].faces[0];
        assert!(!face.triangulated);
        assert_eq!(face.refs.len(), 4);
        assert!(file.error_log.contains("triangulation failure"), "{}", file.error_log);
    }

    #[test]
    fn test_face_with_undefined_point_is_kept() {
        let src = "q shapehdr p,0,f\n\tpointsb\n\tpb 0,0,0\n\tface4 1,0,0,0,1,0,1,2,3\n\tendshape\n";
        let file = import(src);
        assert_eq!(file.shapes[0].faces.len(), 1);
        assert!(file.error_log.contains("undefined point 1"), "{}", file.error_log);
    }

    #[test]
    fn test_blank_header_resolved() {
        let src = format!("{SHIP}ship2 shapehdr ship_p,2,ship_f\n");
        let file = import(&src);
        assert_eq!(file.shapes.len(), 2);
        assert!(file.blanks.is_empty());
        let (a, b) = (&file.shapes[0], &file.shapes[1]);
        assert_eq!(b.name(), "ship2");
        assert_eq!(b.points, a.points);
        assert_eq!(b.faces, a.faces);
    }

    #[test]
    fn test_header_alias_before_data() {
        let src = format!("alias shapehdr ship_p,2,ship_f\n{SHIP}orphan shapehdr x,0,y\n");
        let file = import(&src);
        assert_eq!(file.shapes.len(), 2);
        assert_eq!(file.shapes[1].name(), "alias");
        assert_eq!(file.shapes[1].points.len(), 3);
        assert_eq!(file.blanks.len(), 1);
        assert_eq!(file.blanks[0].name(), "orphan");
    }

    #[test]
    fn test_duplicate_names_fixed() {
        let src = "\
BOX shapehdr a,0,a
\tendshape
BOX shapehdr b,0,b
\tendshape
BOX shapehdr c,0,c
\tendshape
";
        let file = import(src);
        let mut names: Vec<&str> = file.shapes.iter().map(|s| s.header.unique_name.as_str()).collect();
        names.sort_unstable();
        assert_eq!(names, vec!["BOX", "BOX(1)", "BOX(2)"]);
        assert!(file.shape("BOX(2)").is_some());
    }

    #[test]
    fn test_frames_replay_from_baseline() {
        let src = "\
anim shapehdr p,0,f
\tpointsb
\tpb 1,0,0
\tframes 2
\tjumptab .open
\tjumptab .closed
\tpb 2,0,0
.open
\tpb 3,0,0
\tpb 4,0,0
\tjump .done
.closed
\tpb 5,0,0
\tpb 6,0,0
.done
\tendpoints
\tendshape
";
        let file = import(src);
        assert!(file.error_log.is_empty(), "{}", file.error_log);
        let shape = &file.shapes[0];
        assert_eq!(shape.points.len(), 1);
        let open = shape.frame("open").unwrap();
        let closed = shape.frame("closed").unwrap();
        let indices = |f: &crate::model::Frame| f.points.iter().map(|p| p.index).collect::<Vec<_>>();
        assert_eq!(indices(open), vec![1, 2, 3]);
        assert_eq!(indices(closed), vec![1, 2, 3]);
        assert_eq!(open.points[1].x, -3);
        assert_eq!(closed.points[2].x, -6);
    }

    #[test]
    fn test_cancelled_import_stops() {
        let flag = AtomicBool::new(true);
        let file = Importer::new(Resolver::plain())
            .with_cancel(&flag)
            .import(&chunks(SHIP));
        assert!(file.shapes.is_empty());
        assert!(file.error_log.contains("import cancelled"));
    }

    #[test]
    fn test_lines_outside_shapes_ignored() {
        let file = import("\tpointsb\n\tpb 1,2,3\n\tendshape\n");
        assert!(file.shapes.is_empty());
        assert!(file.error_log.is_empty());
    }
}
