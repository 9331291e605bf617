#![warn(missing_docs)]

//! Shape reconstruction from macro-driven assembly source.
//!
//! Walks classified source chunk by chunk, interpreting the shape-building
//! macros (`pointsb`, `pb`, `frames`, `jumptab`, `face4`, `endshape`, ...)
//! into [`Shape`]s with points, animation frames and triangulated faces.
//! Header lines that alias another shape's data are resolved after the pass,
//! and duplicate names are made unique.
//!
//! # Example
//!
//! ```
//! use shapeasm_expr::ConstantTable;
//! use shapeasm_import::{import_source, ImportConfig};
//! use shapeasm_source::FileId;
//!
//! let src = b"ship shapehdr ship_p,2,ship_f\n\tpointsb\n\tpb 1,2,3\n\tendshape\n";
//! let file = import_source(src, FileId(0), &ImportConfig::default(), ConstantTable::new()).unwrap();
//! assert_eq!(file.shapes[0].points[0].x, -1);
//! ```

mod config;
mod context;
mod error;
mod face;
mod header;
mod instruction;
mod interpreter;
mod model;
mod postpass;
mod shape_file;

use std::path::Path;

use shapeasm_expr::{ConstantTable, ConstantsContext};
use shapeasm_source::{classify_file, classify_source, harvest_constants, FileId};
use tracing::debug;

pub use config::ImportConfig;
pub use context::{ImportContext, ShapeContext};
pub use error::{ImportError, Result};
pub use face::{FaceRecognizer, MacroFaceRecognizer, RawFace};
pub use header::{HeaderRecognizer, MacroHeaderRecognizer, DEFAULT_HEADER_MACRO};
pub use instruction::{Instruction, PointKind, PointMode, Width};
pub use interpreter::Importer;
pub use model::{BspEntry, Extents, Face, FaceRef, Frame, Point, Shape, ShapeHeader};
pub use postpass::{dereference_blanks, fix_duplicate_names};
pub use shape_file::ShapeFile;

/// Import shapes from an in-memory source file.
///
/// `constants` stays active for the whole pass.
pub fn import_source(
    data: &[u8],
    file: FileId,
    config: &ImportConfig,
    constants: ConstantTable,
) -> Result<ShapeFile> {
    let classified = classify_source(data, file, config.encoding)?;

    let mut constants_ctx = ConstantsContext::new().with_max_passes(config.max_substitution_passes);
    let scope = constants_ctx.begin(constants);
    let importer = Importer::new(scope.resolver())
        .with_header_recognizer(MacroHeaderRecognizer::new(config.header_macro.as_str()));
    Ok(importer.import(&classified.chunks))
}

/// Import shapes from a file on disk, harvesting constants from the
/// configured include files first.
pub fn import_file(path: impl AsRef<Path>, config: &ImportConfig) -> Result<ShapeFile> {
    let mut constants = ConstantTable::new();
    for (id, include) in (1..).zip(&config.includes) {
        let classified = classify_file(include, FileId(id), config.encoding)?;
        let harvested = harvest_constants(&classified.chunks);
        debug!(include = %include.display(), constants = harvested.len(), "harvested include");
        constants.merge(&harvested);
    }

    let data = std::fs::read(path)?;
    import_source(&data, FileId(0), config, constants)
}
