//! Named-constant harvesting from include files.

use shapeasm_expr::ConstantTable;

use crate::chunk::{Chunk, ChunkKind};

const DEFINING_DIRECTIVES: [&str; 3] = ["equ", "=", "set"];

/// Collect `NAME equ VALUE`, `NAME = VALUE` and `NAME set VALUE`
/// definitions. Later definitions win.
pub fn harvest_constants<'a>(chunks: impl IntoIterator<Item = &'a Chunk>) -> ConstantTable {
    let mut table = ConstantTable::new();
    for chunk in chunks {
        if chunk.kind() != ChunkKind::Line {
            continue;
        }
        let Some(label) = chunk.label() else {
            continue;
        };
        match chunk.invocation() {
            Some(inv) if DEFINING_DIRECTIVES.iter().any(|d| inv.is(d)) => {
                table.define(label, inv.params_joined().trim());
            }
            // `NAME=VALUE` with no spaces lands entirely in the label.
            None => {
                if let Some((name, value)) = label.split_once('=') {
                    if !name.is_empty() {
                        table.define(name, value.trim());
                    }
                }
            }
            _ => {}
        }
    }
    table
}
