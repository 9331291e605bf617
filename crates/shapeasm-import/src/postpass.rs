//! Blank dereferencing and duplicate-name fix-up.

use std::collections::HashSet;

use tracing::{debug, warn};

use crate::model::Shape;

/// Resolve blanks against the finished shapes.
///
/// A blank takes a deep copy of the first shape whose point and face
/// pointers match its own and is appended to `shapes`. When both share a
/// display name the blank's `points_to` names the match. Blanks with no
/// match are returned.
pub fn dereference_blanks(shapes: &mut Vec<Shape>, blanks: Vec<Shape>) -> Vec<Shape> {
    let mut unresolved = Vec::new();
    let mut resolved = Vec::new();

    for mut blank in blanks {
        match shapes.iter().find(|s| s.header.same_data(&blank.header)) {
            Some(source) => {
                blank.copy_geometry_from(source);
                if source.header.name == blank.header.name {
                    blank.header.points_to = Some(source.header.name.clone());
                }
                debug!(blank = blank.name(), source = source.name(), "blank resolved");
                resolved.push(blank);
            }
            None => {
                warn!(
                    blank = blank.name(),
                    points = %blank.header.point_ptr,
                    faces = %blank.header.face_ptr,
                    "blank shape has no matching data"
                );
                unresolved.push(blank);
            }
        }
    }

    shapes.extend(resolved);
    unresolved
}

/// Make every `unique_name` distinct.
///
/// The first occurrence of a name keeps it; later ones become `NAME(1)`,
/// `NAME(2)`, ... in order, skipping candidates already in use.
pub fn fix_duplicate_names(shapes: &mut [Shape]) {
    let mut taken: HashSet<String> = shapes.iter().map(|s| s.header.unique_name.clone()).collect();
    let mut seen: HashSet<String> = HashSet::new();

    for shape in shapes.iter_mut() {
        let name = shape.header.unique_name.clone();
        if seen.insert(name.clone()) {
            continue;
        }
        let mut n = 1;
        let renamed = loop {
            let candidate = format!("{name}({n})");
            if !taken.contains(&candidate) {
                break candidate;
            }
            n += 1;
        };
        debug!(from = %name, to = %renamed, "renamed duplicate shape");
        taken.insert(renamed.clone());
        seen.insert(renamed.clone());
        shape.header.unique_name = renamed;
    }
}
