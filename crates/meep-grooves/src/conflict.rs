//! Resolution of vertical conflicts between lines
//!
//! Two lines sharing part of their x-range conflict when they are closer
//! vertically than their clearances allow:
//!
//! - closer than the hard clearances (`space_*`): the blocks would overlap,
//!   which is fatal;
//! - closer than the soft clearances (`weak_space_*`): the padding between
//!   them is shrunk.
//!
//! Padding can only be adjusted over a common x-range, so overhanging parts
//! are cut off into new lines first:
//!
//! ```text
//!    ------        ------        ------     ------
//!    ------      ----------    -----          -----
//!    split       cut lower     cut left     cut right
//! ```
//!
//! Every cut or split restarts the scan; the loop ends at the first scan
//! that changes nothing.

use nalgebra::Point2;
use tracing::debug;

use crate::element::{normalize_skip, Element, ElementId, Endpoint, Line, TOLERANCE};
use crate::error::{GenError, GenResult};
use crate::placement::Layout;

/// What a scan found to do next
#[derive(Debug, Clone, Copy, PartialEq)]
enum Action {
    Cut {
        line: ElementId,
        x: f64,
    },
    Split {
        upper: ElementId,
        lower: ElementId,
        distance: f64,
    },
}

fn is_disjoint(a: &Line, b: &Line) -> bool {
    let (a_min, a_max) = a.x_range();
    let (b_min, b_max) = b.x_range();
    a_max <= b_min || a_min >= b_max
}

/// Find the first conflicting pair and decide how to treat it
fn next_action(elements: &[Element]) -> GenResult<Option<Action>> {
    let lines: Vec<(ElementId, &Line)> = elements
        .iter()
        .enumerate()
        .filter_map(|(i, e)| e.as_line().map(|line| (ElementId(i), line)))
        .collect();

    for (i, &(id_a, a)) in lines.iter().enumerate() {
        for &(id_b, b) in &lines[i + 1..] {
            if is_disjoint(a, b) {
                continue;
            }
            let ((up_id, up), (low_id, low)) = if a.y() > b.y() {
                ((id_a, a), (id_b, b))
            } else {
                ((id_b, b), (id_a, a))
            };
            let distance = up.y() - low.y();

            if distance < low.clearance.space_up + up.clearance.space_down {
                return Err(GenError::StrongConflict {
                    upper: up.y(),
                    lower: low.y(),
                });
            }
            if distance >= up.clearance.weak_space_down + low.clearance.weak_space_up - TOLERANCE {
                continue;
            }

            let (up_min, up_max) = up.x_range();
            let (low_min, low_max) = low.x_range();
            let action = if up_min < low_min - TOLERANCE {
                Action::Cut {
                    line: up_id,
                    x: low_min,
                }
            } else if low_min < up_min - TOLERANCE {
                Action::Cut {
                    line: low_id,
                    x: up_min,
                }
            } else if low_max > up_max + TOLERANCE {
                Action::Cut {
                    line: low_id,
                    x: up_max,
                }
            } else if up_max > low_max + TOLERANCE {
                Action::Cut {
                    line: up_id,
                    x: low_max,
                }
            } else {
                Action::Split {
                    upper: up_id,
                    lower: low_id,
                    distance,
                }
            };
            return Ok(Some(action));
        }
    }
    Ok(None)
}

/// Cut `line` at `x`. The line keeps the left part; the returned fragment
/// continues the groove pattern from `x` to the old end.
pub fn cut_line(line: &mut Line, x: f64, parent: ElementId) -> GenResult<Line> {
    if line.end.x() < line.start.x() {
        return Err(GenError::LineEndsOrder {
            start: line.start.x(),
            end: line.end.x(),
        });
    }

    let period = line.property.grooves.period;
    let len_partial = period * (1.0 - line.skip);
    let len_cut = x - line.start.x();
    let past_partial = len_cut - len_partial;
    let skip = if past_partial < 0.0 {
        // still inside the first, incomplete period
        1.0 + past_partial / period
    } else {
        past_partial.rem_euclid(period) / period
    };

    let y = line.end.y();
    let fragment = Line {
        id: None,
        comment: None,
        start: Endpoint::at(Point2::new(x, y)),
        end: line.end.clone(),
        property: line.property.clone(),
        skip: normalize_skip(skip),
        clearance: line.clearance,
        elevation: line.elevation,
        parent: Some(parent),
    };
    line.end = Endpoint::at(Point2::new(x, y));
    Ok(fragment)
}

/// Run the scan to its fixed point; returns the number of lines cut
pub fn settle_conflicts(layout: &mut Layout) -> GenResult<usize> {
    let mut cuts = 0;
    let mut passes = 0;
    loop {
        passes += 1;
        let Some(action) = next_action(layout.elements())? else {
            break;
        };
        match action {
            Action::Cut { line, x } => {
                let fragment = match layout
                    .elements_mut()
                    .get_mut(line.index())
                    .and_then(Element::as_line_mut)
                {
                    Some(target) => cut_line(target, x, line)?,
                    None => break,
                };
                let handle = layout.push_fragment(fragment);
                debug!(line = line.index(), fragment = handle.index(), x, "line cut");
                cuts += 1;
            }
            Action::Split {
                upper,
                lower,
                distance,
            } => split_padding(layout, upper, lower, distance),
        }
    }
    debug!(passes, cuts, "conflicts settled");
    Ok(cuts)
}

/// Share the gap of an aligned pair: each side gets half of the distance.
/// When half would eat into one line's hard clearance, each line keeps its
/// hard clearance and gets half of the remaining slack instead.
fn split_padding(layout: &mut Layout, upper: ElementId, lower: ElementId, distance: f64) {
    let elements = layout.elements_mut();
    let (Some(up), Some(low)) = (
        elements[upper.index()].as_line(),
        elements[lower.index()].as_line(),
    ) else {
        return;
    };
    let half = distance / 2.0;
    let (weak_down, weak_up) =
        if half >= up.clearance.space_down && half >= low.clearance.space_up {
            (half, half)
        } else {
            let slack = distance - up.clearance.space_down - low.clearance.space_up;
            (
                up.clearance.space_down + slack / 2.0,
                low.clearance.space_up + slack / 2.0,
            )
        };

    if let Some(up) = elements[upper.index()].as_line_mut() {
        up.clearance.weak_space_down = weak_down;
    }
    if let Some(low) = elements[lower.index()].as_line_mut() {
        low.clearance.weak_space_up = weak_up;
    }
    debug!(
        upper = upper.index(),
        lower = lower.index(),
        weak_down,
        weak_up,
        "padding split"
    );
}
