//! Resolved element model
//!
//! Lines and connectors live in one append-only list owned by the
//! [`Layout`](crate::placement::Layout); they are addressed by [`ElementId`].
//! Sources, flux points and transients are positioned against that list
//! but never stored in it.

use nalgebra::{Point2, Vector2};

use crate::description::{
    ConnectorProperty, FluxProperty, LineProperty, PointName, SourceProperty,
};

/// When a float is considered zero
pub const TOLERANCE: f64 = 1e-6;

/// Stable handle into the element list
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ElementId(pub(crate) usize);

impl ElementId {
    pub fn index(self) -> usize {
        self.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElementKind {
    Line,
    Connector,
}

/// Back-reference recorded on a point attached to another element
#[derive(Debug, Clone, PartialEq)]
pub struct Attachment {
    pub target: ElementId,
    pub kind: ElementKind,
    pub point: PointName,
    /// Width of the target element
    pub width: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Endpoint {
    pub pos: Point2<f64>,
    pub attachment: Option<Attachment>,
    /// Something is attached to the right of this point; the junction needs a metal patch
    pub right_attachment: bool,
    /// Something is attached to the left of this point
    pub left_attachment: bool,
}

impl Endpoint {
    pub fn at(pos: Point2<f64>) -> Self {
        Self {
            pos,
            attachment: None,
            right_attachment: false,
            left_attachment: false,
        }
    }

    pub fn x(&self) -> f64 {
        self.pos.x
    }

    pub fn y(&self) -> f64 {
        self.pos.y
    }
}

/// Vertical clearances of a line.
///
/// `space_*` is the absolute minimum, `weak_space_*` what the line would
/// like to have once padding is included.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Clearance {
    pub space_up: f64,
    pub space_down: f64,
    pub weak_space_up: f64,
    pub weak_space_down: f64,
}

impl Clearance {
    pub fn from_property(property: &LineProperty) -> Self {
        let hard = property.width / 2.0 + property.grooves.depth;
        Self {
            space_up: hard,
            space_down: hard,
            weak_space_up: hard + property.padding,
            weak_space_down: hard + property.padding,
        }
    }
}

/// Horizontal grooved waveguide segment
#[derive(Debug, Clone, PartialEq)]
pub struct Line {
    pub id: Option<String>,
    pub comment: Option<String>,
    pub start: Endpoint,
    pub end: Endpoint,
    pub property: LineProperty,
    /// Fraction of a groove period skipped at the start, in [0, 1)
    pub skip: f64,
    pub clearance: Clearance,
    /// Slab half-extent in z; `None` for planar structures
    pub elevation: Option<f64>,
    /// Line this one was cut from
    pub parent: Option<ElementId>,
}

impl Line {
    pub fn y(&self) -> f64 {
        self.start.y()
    }

    pub fn length(&self) -> f64 {
        (self.end.pos - self.start.pos).norm()
    }

    /// `(min x, max x)`
    pub fn x_range(&self) -> (f64, f64) {
        let (a, b) = (self.start.x(), self.end.x());
        if a < b {
            (a, b)
        } else {
            (b, a)
        }
    }
}

/// Vertical junction between two lines
#[derive(Debug, Clone, PartialEq)]
pub struct Connector {
    pub id: Option<String>,
    pub comment: Option<String>,
    pub start: Endpoint,
    pub end: Endpoint,
    pub property: ConnectorProperty,
    pub elevation: Option<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Element {
    Line(Line),
    Connector(Connector),
}

impl Element {
    pub fn id(&self) -> Option<&str> {
        match self {
            Element::Line(line) => line.id.as_deref(),
            Element::Connector(con) => con.id.as_deref(),
        }
    }

    pub fn comment(&self) -> Option<&str> {
        match self {
            Element::Line(line) => line.comment.as_deref(),
            Element::Connector(con) => con.comment.as_deref(),
        }
    }

    pub fn kind(&self) -> ElementKind {
        match self {
            Element::Line(_) => ElementKind::Line,
            Element::Connector(_) => ElementKind::Connector,
        }
    }

    pub fn width(&self) -> f64 {
        match self {
            Element::Line(line) => line.property.width,
            Element::Connector(con) => con.property.width,
        }
    }

    pub fn point(&self, name: PointName) -> &Endpoint {
        let (start, end) = match self {
            Element::Line(line) => (&line.start, &line.end),
            Element::Connector(con) => (&con.start, &con.end),
        };
        match name {
            PointName::Start => start,
            PointName::End => end,
        }
    }

    pub fn point_mut(&mut self, name: PointName) -> &mut Endpoint {
        let (start, end) = match self {
            Element::Line(line) => (&mut line.start, &mut line.end),
            Element::Connector(con) => (&mut con.start, &mut con.end),
        };
        match name {
            PointName::Start => start,
            PointName::End => end,
        }
    }

    pub fn as_line(&self) -> Option<&Line> {
        match self {
            Element::Line(line) => Some(line),
            Element::Connector(_) => None,
        }
    }

    pub fn as_line_mut(&mut self) -> Option<&mut Line> {
        match self {
            Element::Line(line) => Some(line),
            Element::Connector(_) => None,
        }
    }

    pub fn as_connector(&self) -> Option<&Connector> {
        match self {
            Element::Connector(con) => Some(con),
            Element::Line(_) => None,
        }
    }

    /// Shift both ends
    pub fn translate(&mut self, shift: &Vector2<f64>) {
        self.point_mut(PointName::Start).pos += *shift;
        self.point_mut(PointName::End).pos += *shift;
    }
}

/// Keep only the fraction of a period; values within [`TOLERANCE`] of 0 or 1 become 0
pub fn normalize_skip(skip: f64) -> f64 {
    let fraction = skip.rem_euclid(1.0);
    if fraction.abs() < TOLERANCE || (fraction - 1.0).abs() < TOLERANCE {
        0.0
    } else {
        fraction
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Source {
    pub comment: Option<String>,
    pub position: Point2<f64>,
    /// Aperture in y
    pub width: f64,
    pub property: SourceProperty,
}

/// Spectral observer
#[derive(Debug, Clone, PartialEq)]
pub struct FluxPoint {
    pub comment: Option<String>,
    pub position: Point2<f64>,
    pub width: f64,
    pub property: FluxProperty,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TransientScope {
    Global,
    Local { position: Point2<f64> },
}

/// Field snapshot request
#[derive(Debug, Clone, PartialEq)]
pub struct Transient {
    pub comment: Option<String>,
    pub component: String,
    pub field: String,
    /// Sampling interval
    pub interval: f64,
    pub scope: TransientScope,
}
