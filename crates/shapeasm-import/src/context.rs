//! Mutable interpretation state for one file.
//!
//! [`ImportContext`] is either idle or has a shape open. Everything that
//! touches a shape lives on [`ShapeContext`], which only exists while a shape
//! is open, so "no current shape" never has to be checked at runtime.

use tracing::debug;

use crate::error::{ImportError, Result};
use crate::instruction::{PointKind, PointMode};
use crate::model::{BspEntry, Face, Frame, Point, Shape, ShapeHeader};

/// Interpretation state for one file's pass.
#[derive(Debug, Default)]
pub struct ImportContext {
    session: Session,
}

#[derive(Debug, Default)]
enum Session {
    #[default]
    Idle,
    ShapeOpen(Box<ShapeContext>),
}

impl ImportContext {
    /// Create an idle context.
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a new shape with fresh per-shape state. Returns the shape that
    /// was still open, if any.
    pub fn open(&mut self, header: ShapeHeader) -> Option<Shape> {
        let previous = self.take_open_shape();
        self.session = Session::ShapeOpen(Box::new(ShapeContext::new(header)));
        previous
    }

    /// Close the open shape normally.
    pub fn end_shape(&mut self) -> Option<Shape> {
        self.take_open_shape()
    }

    /// Remove and return the open shape, leaving the context idle.
    pub fn take_open_shape(&mut self) -> Option<Shape> {
        match std::mem::take(&mut self.session) {
            Session::Idle => None,
            Session::ShapeOpen(ctx) => Some(ctx.into_shape()),
        }
    }

    /// Drop all state, including any partially built shape.
    pub fn reset(&mut self) {
        self.session = Session::Idle;
    }

    /// Open shape state, if a shape is open.
    pub fn shape(&self) -> Option<&ShapeContext> {
        match &self.session {
            Session::ShapeOpen(ctx) => Some(ctx),
            Session::Idle => None,
        }
    }

    /// Mutable open shape state, if a shape is open.
    pub fn shape_mut(&mut self) -> Option<&mut ShapeContext> {
        match &mut self.session {
            Session::ShapeOpen(ctx) => Some(ctx),
            Session::Idle => None,
        }
    }

    /// Current frame index (0 when idle).
    pub fn frame_index(&self) -> usize {
        self.shape().map(ShapeContext::frame_index).unwrap_or(0)
    }

    /// Short description of the open shape for diagnostics.
    pub fn describe(&self) -> String {
        match self.shape() {
            Some(ctx) => {
                let h = &ctx.shape.header;
                format!(
                    "{} (points {}, faces {}, line {})",
                    h.name, h.point_ptr, h.face_ptr, h.source_line
                )
            }
            None => "(none)".to_string(),
        }
    }
}

/// Frame bookkeeping for an animated points region.
#[derive(Debug, Default)]
struct FrameCursor {
    active: bool,
    expected: usize,
    current: usize,
    baseline: usize,
    opened: usize,
    region_start: usize,
    writing: Option<usize>,
    end_label: Option<String>,
}

/// State of the shape being built.
#[derive(Debug)]
pub struct ShapeContext {
    shape: Shape,
    point_mode: PointMode,
    next_index: usize,
    frames: FrameCursor,
    faces_locked: bool,
    bsp_end: Option<String>,
}

fn frame_name(label: &str) -> &str {
    label.trim().trim_start_matches('.')
}

impl ShapeContext {
    fn new(header: ShapeHeader) -> Self {
        Self {
            shape: Shape::new(header),
            point_mode: PointMode::None,
            next_index: 0,
            frames: FrameCursor::default(),
            faces_locked: false,
            bsp_end: None,
        }
    }

    /// The shape built so far.
    pub fn shape(&self) -> &Shape {
        &self.shape
    }

    /// Finish building.
    pub fn into_shape(self) -> Shape {
        self.shape
    }

    /// Active points mode.
    pub fn point_mode(&self) -> PointMode {
        self.point_mode
    }

    /// Index the next pushed point will get.
    pub fn next_index(&self) -> usize {
        self.next_index
    }

    /// Index of the frame currently being defined.
    pub fn frame_index(&self) -> usize {
        self.frames.current
    }

    /// Name of the frame points are currently written to.
    pub fn writing_frame(&self) -> Option<&str> {
        self.frames
            .writing
            .map(|i| self.shape.frames[i].name.as_str())
    }

    /// Whether `fend` has been seen.
    pub fn faces_locked(&self) -> bool {
        self.faces_locked
    }

    /// Whether a BSP region is open.
    pub fn bsp_active(&self) -> bool {
        self.bsp_end.is_some()
    }

    /// `pointsb` / `pointsw` / `pointsxb` / `pointsxw`.
    pub fn begin_points_region(&mut self, mode: PointMode) {
        self.point_mode = mode;
    }

    /// `endpoints`.
    pub fn end_points_region(&mut self) {
        self.point_mode = PointMode::None;
    }

    /// `fend`: relaxes the point width check from here on.
    pub fn lock_faces(&mut self) {
        self.faces_locked = true;
    }

    /// `frames <n>`: start a region of `expected` frames replayed from the
    /// current point index.
    pub fn begin_frames_region(&mut self, expected: usize) {
        self.frames = FrameCursor {
            active: expected > 0,
            expected,
            current: 0,
            baseline: self.next_index,
            opened: 0,
            region_start: self.shape.frames.len(),
            writing: None,
            end_label: None,
        };
    }

    /// `jumptab <label>`: bind an existing frame, or declare a new one while
    /// the frames region still expects more.
    pub fn jump_table(&mut self, label: &str) {
        if self.begin_frame_data_define(label) {
            return;
        }
        let f = &self.frames;
        if f.active && f.opened < f.expected {
            self.shape.frames.push(Frame::new(frame_name(label)));
            self.frames.opened += 1;
        } else {
            debug!(label, "jumptab outside a frames region ignored");
        }
    }

    /// Bind the frame named `label` so pushes go to it. Returns `false` when
    /// the shape has no such frame.
    pub fn begin_frame_data_define(&mut self, label: &str) -> bool {
        let name = frame_name(label);
        match self.shape.frames.iter().position(|f| f.name == name) {
            Some(idx) => {
                self.frames.writing = Some(idx);
                true
            }
            None => false,
        }
    }

    /// `jump <label>`: remember the frame-end label and advance.
    pub fn jump(&mut self, label: &str) {
        self.frames.end_label = Some(frame_name(label).to_string());
        self.return_from_frame_data_region();
    }

    /// Advance to the next frame: rewind the point index to the baseline
    /// and unbind the writing frame.
    pub fn return_from_frame_data_region(&mut self) {
        let f = &mut self.frames;
        if !f.active {
            return;
        }
        f.current += 1;
        f.writing = None;
        self.next_index = f.baseline;
        if f.current >= f.expected {
            f.active = false;
        }
    }

    /// React to a label defined on a code line.
    pub fn observe_label(&mut self, label: &str) {
        let name = frame_name(label);

        if self.bsp_end.as_deref() == Some(name) {
            self.bsp_end = None;
        }

        if !self.frames.active {
            return;
        }
        let region = &self.shape.frames[self.frames.region_start..];
        if region.iter().any(|f| f.name == name) {
            if self.frames.writing.is_some() {
                self.return_from_frame_data_region();
            }
            self.begin_frame_data_define(name);
        } else if self.frames.writing.is_some()
            && self.frames.end_label.as_deref() == Some(name)
        {
            self.return_from_frame_data_region();
        }
    }

    /// `bspinit <label>`.
    pub fn begin_bsp_region(&mut self, end_label: &str) {
        self.bsp_end = Some(frame_name(end_label).to_string());
    }

    /// `bsp <id>,<faces>,<jump>`.
    ///
    /// Entries are accepted but not recorded; shipped shape data relies on
    /// the table staying empty.
    pub fn push_bsp(&mut self, entry: BspEntry) {
        if !RECORD_BSP_ENTRIES {
            return;
        }
        self.shape.bsp.insert(entry.id, entry);
    }

    /// Create a point `offset` places after the next index without storing
    /// it.
    fn make_point(&self, instruction: &str, offset: usize, x: i64, y: i64, z: i64) -> Result<Point> {
        Point::from_source(self.next_index + offset, x, y, z).ok_or_else(|| {
            let value = if x == i64::MIN { x } else { y };
            ImportError::out_of_range(instruction, value)
        })
    }

    /// Push a point (two when mirroring). Returns how many were emitted.
    pub fn push_point(
        &mut self,
        instruction: &str,
        kind: PointKind,
        x: i64,
        y: i64,
        z: i64,
    ) -> Result<usize> {
        let width = self
            .point_mode
            .width()
            .ok_or_else(|| ImportError::NotInPointsMode {
                instruction: instruction.to_string(),
            })?;
        if width != kind.width() && !self.faces_locked {
            return Err(ImportError::PointWidthMismatch {
                instruction: instruction.to_string(),
                mode: self.point_mode,
            });
        }

        let (x, y, z) = kind
            .scale(x, y, z)
            .ok_or_else(|| ImportError::out_of_range(instruction, y))?;
        let stride = self.point_mode.stride();

        // Build every copy before storing any, so a failure leaves the shape
        // untouched.
        let points = (0..stride)
            .map(|copy| {
                let x = if copy == 0 {
                    x
                } else {
                    x.checked_neg()
                        .ok_or_else(|| ImportError::out_of_range(instruction, x))?
                };
                self.make_point(instruction, copy, x, y, z)
            })
            .collect::<Result<Vec<_>>>()?;

        for point in points {
            self.shape.extents.include(&point);
            self.emit(point);
        }
        Ok(stride)
    }

    fn emit(&mut self, point: Point) {
        if let Some(idx) = self.frames.writing {
            self.shape.frames[idx].points.push(point);
            self.next_index += 1;
        } else if self.frames.active && self.frames.opened > 0 {
            // Shared by every frame of the region; most recently opened first.
            for frame in self.shape.frames[self.frames.region_start..]
                .iter_mut()
                .rev()
            {
                frame.points.push(point);
            }
            self.next_index += 1;
            self.frames.baseline = self.next_index;
        } else {
            self.shape.points.push(point);
            self.next_index += 1;
        }
    }

    /// Append a face.
    pub fn push_face(&mut self, face: Face) {
        self.shape.faces.push(face);
    }
}

const RECORD_BSP_ENTRIES: bool = false;
