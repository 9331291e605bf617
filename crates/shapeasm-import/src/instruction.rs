//! The closed set of shape-building macros.

use serde::Serialize;
use shapeasm_source::MacroInvocation;

/// Storage width of point coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Width {
    /// Byte coordinates.
    Narrow,
    /// Word coordinates.
    Wide,
}

/// Active points region.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum PointMode {
    /// Not inside a points region.
    #[default]
    None,
    /// `pointsb`: one point per push.
    Narrow,
    /// `pointsw`: one point per push.
    Wide,
    /// `pointsxb`: each push also emits the X-mirrored point.
    NarrowMirrored,
    /// `pointsxw`: each push also emits the X-mirrored point.
    WideMirrored,
}

impl PointMode {
    /// Coordinate width, or `None` outside a points region.
    pub fn width(self) -> Option<Width> {
        match self {
            PointMode::None => None,
            PointMode::Narrow | PointMode::NarrowMirrored => Some(Width::Narrow),
            PointMode::Wide | PointMode::WideMirrored => Some(Width::Wide),
        }
    }

    /// Points emitted per push.
    pub fn stride(self) -> usize {
        match self {
            PointMode::NarrowMirrored | PointMode::WideMirrored => 2,
            _ => 1,
        }
    }
}

/// Variant of a point-push macro.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointKind {
    /// `pb x,y,z`
    Byte,
    /// `pw x,y,z`
    Word,
    /// `pbd2 x,y,z`: coordinates halved.
    ByteHalved,
    /// `pby2 x,y,z`: Y doubled.
    ByteDoubleY,
}

impl PointKind {
    /// Width class the macro belongs to.
    pub fn width(self) -> Width {
        match self {
            PointKind::Word => Width::Wide,
            _ => Width::Narrow,
        }
    }

    /// Apply the macro's scaling to source coordinates. Returns `None` if
    /// doubling Y overflows.
    pub fn scale(self, x: i64, y: i64, z: i64) -> Option<(i64, i64, i64)> {
        match self {
            PointKind::Byte | PointKind::Word => Some((x, y, z)),
            PointKind::ByteHalved => Some((x / 2, y / 2, z / 2)),
            PointKind::ByteDoubleY => Some((x, y.checked_mul(2)?, z)),
        }
    }
}

/// A decoded shape-building macro. Parameters stay as raw text until the
/// instruction is executed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Instruction<'a> {
    /// `bspinit <endLabel>`
    BspInit {
        /// Label that ends the BSP region.
        end_label: Option<&'a str>,
    },
    /// `bsp <id>,<facesPtr>,<jumpPtr>`
    Bsp {
        /// Entry id text.
        id: &'a str,
        /// Face-list label.
        faces: &'a str,
        /// Jump label.
        jump: &'a str,
    },
    /// `frames <n>`
    Frames {
        /// Expected frame count text.
        count: &'a str,
    },
    /// `pointsb` / `pointsw` / `pointsxb` / `pointsxw`
    Points(PointMode),
    /// `jumptab <label>`
    JumpTab {
        /// Frame label.
        label: Option<&'a str>,
    },
    /// `jump <label>`
    Jump {
        /// Frame-end label.
        label: Option<&'a str>,
    },
    /// `fend`
    FacesEnd,
    /// `endpoints`
    EndPoints,
    /// `endshape`
    EndShape,
    /// `pb` / `pw` / `pbd2` / `pby2`
    Point {
        /// Which push macro.
        kind: PointKind,
        /// X text.
        x: &'a str,
        /// Y text.
        y: &'a str,
        /// Z text.
        z: &'a str,
    },
    /// Any other macro; ignored.
    Other,
}

impl<'a> Instruction<'a> {
    /// Decode an invocation by its (case-insensitive) name.
    pub fn decode(inv: &'a MacroInvocation) -> Self {
        let point = move |kind| Instruction::Point {
            kind,
            x: inv.param_text(0),
            y: inv.param_text(1),
            z: inv.param_text(2),
        };
        let label = move || inv.param(0).map(|p| p.raw());

        match inv.name().to_ascii_lowercase().as_str() {
            "bspinit" => Instruction::BspInit { end_label: label() },
            "bsp" => Instruction::Bsp {
                id: inv.param_text(0),
                faces: inv.param_text(1),
                jump: inv.param_text(2),
            },
            "frames" => Instruction::Frames {
                count: inv.param_text(0),
            },
            "pointsb" => Instruction::Points(PointMode::Narrow),
            "pointsw" => Instruction::Points(PointMode::Wide),
            "pointsxb" => Instruction::Points(PointMode::NarrowMirrored),
            "pointsxw" => Instruction::Points(PointMode::WideMirrored),
            "jumptab" => Instruction::JumpTab { label: label() },
            "jump" => Instruction::Jump { label: label() },
            "fend" => Instruction::FacesEnd,
            "endpoints" => Instruction::EndPoints,
            "endshape" => Instruction::EndShape,
            "pb" => point(PointKind::Byte),
            "pw" => point(PointKind::Word),
            "pbd2" => point(PointKind::ByteHalved),
            "pby2" => point(PointKind::ByteDoubleY),
            _ => Instruction::Other,
        }
    }
}
