//! Periodic segmentation of lines into flat and grooved pieces
//!
//! A period is a flat part followed by a groove. `skip` says how far into
//! the first period the line begins, so a line may open with a partial flat
//! or directly inside a groove.

use crate::element::{Connector, Line, TOLERANCE};
use crate::material::Medium;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SegmentKind {
    Flat,
    Groove,
}

/// Piece of a line between `x0` and `x1`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Segment {
    pub kind: SegmentKind,
    pub x0: f64,
    pub x1: f64,
}

impl Segment {
    pub fn length(&self) -> f64 {
        self.x1 - self.x0
    }
}

/// Walks along a line; every piece is truncated to what is left of it
struct Cursor {
    x: f64,
    rest: f64,
    out: Vec<Segment>,
}

impl Cursor {
    fn advance(&mut self, kind: SegmentKind, len: f64) {
        let len = len.min(self.rest);
        if len > TOLERANCE {
            self.out.push(Segment {
                kind,
                x0: self.x,
                x1: self.x + len,
            });
        }
        self.x += len;
        self.rest -= len;
    }
}

/// Decompose a line into flat and groove segments, left to right
pub fn segments(line: &Line) -> Vec<Segment> {
    let grooves = &line.property.grooves;
    let period = grooves.period;
    let len_groove = grooves.width;
    let len_flat = period - len_groove;

    let mut cur = Cursor {
        x: line.x_range().0,
        rest: line.length(),
        out: Vec::new(),
    };

    // 1. the incomplete first period
    let mut start_left = period * (1.0 - line.skip);
    let start_flat = start_left - len_groove;
    if start_flat > 0.0 {
        if cur.rest < start_flat {
            // short line that doesn't reach the first groove
            cur.advance(SegmentKind::Flat, cur.rest);
            return cur.out;
        }
        cur.advance(SegmentKind::Flat, start_flat);
        start_left -= start_flat;
    }
    if cur.rest < start_left {
        cur.advance(SegmentKind::Groove, cur.rest);
        return cur.out;
    }
    cur.advance(SegmentKind::Groove, start_left);

    // 2. whole periods
    let whole = (cur.rest / period).floor() as usize;
    for _ in 0..whole {
        cur.advance(SegmentKind::Flat, len_flat);
        cur.advance(SegmentKind::Groove, len_groove);
    }

    // 3. the tail
    if cur.rest > len_flat {
        cur.advance(SegmentKind::Flat, len_flat);
        cur.advance(SegmentKind::Groove, cur.rest);
    } else {
        cur.advance(SegmentKind::Flat, cur.rest);
    }
    cur.out
}

/// Rectangular block of one material
#[derive(Debug, Clone, PartialEq)]
pub struct Block {
    pub medium: Medium,
    pub x0: f64,
    pub x1: f64,
    pub y0: f64,
    pub y1: f64,
    /// Extent in z; `None` means unbounded (planar simulation)
    pub z_size: Option<f64>,
}

impl Block {
    pub fn center(&self) -> (f64, f64) {
        ((self.x0 + self.x1) / 2.0, (self.y0 + self.y1) / 2.0)
    }

    pub fn size(&self) -> (f64, f64) {
        (self.x1 - self.x0, self.y1 - self.y0)
    }
}

/// The up / in / down blocks covering one segment
pub fn layer_blocks(line: &Line, segment: &Segment) -> [Block; 3] {
    let props = &line.property;
    let y = line.y();
    let half = 0.5 * props.width;
    let depth = match segment.kind {
        SegmentKind::Flat => 0.0,
        SegmentKind::Groove => props.grooves.depth,
    };
    let block = |medium: &Medium, y0: f64, y1: f64| Block {
        medium: medium.clone(),
        x0: segment.x0,
        x1: segment.x1,
        y0,
        y1,
        z_size: line.elevation,
    };
    [
        block(
            &props.materials.up,
            y + half + depth,
            y + line.clearance.weak_space_up,
        ),
        block(&props.materials.inner, y - half - depth, y + half + depth),
        block(
            &props.materials.down,
            y - line.clearance.weak_space_down,
            y - half - depth,
        ),
    ]
}

/// Dielectric channel of a connector between two metal caps.
///
/// The channel rises from the start line to the end line. The start cap sits
/// below it and the end cap above it, each as tall as the attached line's
/// padding plus groove depth and made of that line's upper material.
pub fn connector_blocks(con: &Connector, start_line: &Line, end_line: &Line) -> [Block; 3] {
    let x = con.start.x();
    let half = 0.5 * con.property.width;
    let (y_start, y_end) = (con.start.y(), con.end.y());

    let block = |medium: &Medium, y0: f64, y1: f64| Block {
        medium: medium.clone(),
        x0: x - half,
        x1: x + half,
        y0,
        y1,
        z_size: con.elevation,
    };
    let reach = |line: &Line| line.property.padding + line.property.grooves.depth;
    [
        block(&start_line.property.materials.up, y_start - reach(start_line), y_start),
        block(&con.property.materials.inner, y_start, y_end),
        block(&end_line.property.materials.up, y_end, y_end + reach(end_line)),
    ]
}
