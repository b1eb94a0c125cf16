//! Placement of lines and connectors
//!
//! [`Layout`] owns the element list for one translation run. Elements are
//! added in declaration order with absolute coordinates, the assembly is
//! centered once everything is in, and the conflict resolver may then
//! append fragments. Nothing is ever removed.

use nalgebra::{Point2, Vector2};
use tracing::{debug, info};

use crate::description::{ConnectorSpec, LineProperty, LineSpec, PointName};
use crate::element::{
    normalize_skip, Clearance, Connector, Element, ElementId, ElementKind, Endpoint, Line,
    TOLERANCE,
};
use crate::error::{GenError, GenResult};
use crate::resolve::{IdIndex, OwnStart, Resolver};

/// Axis-aligned extent of the structure
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub min: Point2<f64>,
    pub max: Point2<f64>,
}

impl Bounds {
    pub fn zero() -> Self {
        Self {
            min: Point2::origin(),
            max: Point2::origin(),
        }
    }

    pub fn center(&self) -> Point2<f64> {
        nalgebra::center(&self.min, &self.max)
    }

    pub fn width(&self) -> f64 {
        self.max.x - self.min.x
    }

    pub fn height(&self) -> f64 {
        self.max.y - self.min.y
    }

    /// Strict containment; points on the boundary are outside
    pub fn contains(&self, pt: &Point2<f64>) -> bool {
        self.min.x < pt.x && pt.x < self.max.x && self.min.y < pt.y && pt.y < self.max.y
    }

    fn include(&mut self, lo: Point2<f64>, hi: Point2<f64>) {
        self.min = self.min.inf(&lo);
        self.max = self.max.sup(&hi);
    }
}

#[derive(Debug, Clone)]
pub struct Layout {
    elements: Vec<Element>,
    index: IdIndex,
    bounds: Bounds,
    /// Slab thickness tagged onto every element as its elevation
    z_extent: Option<f64>,
}

impl Default for Layout {
    fn default() -> Self {
        Self::new(None)
    }
}

impl Layout {
    pub fn new(z_extent: Option<f64>) -> Self {
        Self {
            elements: Vec::new(),
            index: IdIndex::new(),
            bounds: Bounds::zero(),
            z_extent,
        }
    }

    pub fn elements(&self) -> &[Element] {
        &self.elements
    }

    pub(crate) fn elements_mut(&mut self) -> &mut Vec<Element> {
        &mut self.elements
    }

    pub fn get(&self, handle: ElementId) -> Option<&Element> {
        self.elements.get(handle.index())
    }

    pub fn find(&self, id: &str) -> Option<ElementId> {
        self.index.get(id)
    }

    pub fn lines(&self) -> impl Iterator<Item = (ElementId, &Line)> {
        self.elements
            .iter()
            .enumerate()
            .filter_map(|(i, e)| e.as_line().map(|line| (ElementId(i), line)))
    }

    pub fn resolver(&self) -> Resolver<'_> {
        Resolver::new(&self.elements, &self.index)
    }

    pub fn limits(&self) -> &Bounds {
        &self.bounds
    }

    pub fn is_inside(&self, x: f64, y: f64) -> bool {
        self.bounds.contains(&Point2::new(x, y))
    }

    fn check_id(&self, id: Option<&str>) -> GenResult<()> {
        match id {
            Some(id) if self.index.contains(id) => Err(GenError::DuplicateId(id.to_string())),
            _ => Ok(()),
        }
    }

    fn push(&mut self, element: Element) -> GenResult<ElementId> {
        let handle = ElementId(self.elements.len());
        if let Some(id) = element.id() {
            self.index.register(id, handle)?;
        }
        self.elements.push(element);
        Ok(handle)
    }

    /// Append a fragment produced by cutting a line
    pub(crate) fn push_fragment(&mut self, line: Line) -> ElementId {
        let handle = ElementId(self.elements.len());
        self.elements.push(Element::Line(line));
        handle
    }

    fn mark(&mut self, handle: ElementId, point: PointName, right: bool) {
        if let Some(target) = self.elements.get_mut(handle.index()) {
            let endpoint = target.point_mut(point);
            if right {
                endpoint.right_attachment = true;
            } else {
                endpoint.left_attachment = true;
            }
        }
    }

    pub fn add_line(&mut self, spec: &LineSpec) -> GenResult<ElementId> {
        self.check_id(spec.id.as_deref())?;
        validate_property(&spec.property)?;
        let width = spec.property.width;

        let resolver = self.resolver();
        let mut start = resolver.line_point(&spec.start, Point2::origin(), None)?;
        if let Some(att) = &start.attachment {
            if att.kind == ElementKind::Connector {
                // the line starts inside the connector, flush with its cap
                start.pos.x += 0.5 * att.width;
                start.pos.y += 0.5 * width * vertical_sign(att.point);
            }
        }

        let mut end = match spec.end.periods {
            Some(periods) => {
                if let Some(dir) = &spec.end.direction {
                    debug!(x = dir.x, y = dir.y, "line direction ignored, using +x");
                }
                let shift = Vector2::new(spec.end.x.unwrap_or(0.0), spec.end.y.unwrap_or(0.0)).norm();
                let x = start.pos.x + shift + periods * spec.property.grooves.period;
                crate::resolve::Resolved {
                    pos: Point2::new(x, start.pos.y),
                    attachment: None,
                }
            }
            None => {
                let own = OwnStart {
                    id: spec.id.as_deref(),
                    pos: start.pos,
                };
                resolver.line_point(&spec.end, start.pos, Some(own))?
            }
        };
        if let Some(att) = &end.attachment {
            if att.kind == ElementKind::Connector {
                end.pos.x -= 0.5 * att.width;
                end.pos.y += 0.5 * width * vertical_sign(att.point);
            }
        }

        if end.pos.x < start.pos.x - TOLERANCE {
            return Err(GenError::LineEndsOrder {
                start: start.pos.x,
                end: end.pos.x,
            });
        }
        if (end.pos.y - start.pos.y).abs() > TOLERANCE {
            return Err(GenError::DiagonalLine {
                start: start.pos.y,
                end: end.pos.y,
            });
        }

        if let Some(att) = &start.attachment {
            self.mark(att.target, att.point, true);
        }
        if let Some(att) = &end.attachment {
            self.mark(att.target, att.point, false);
        }

        let line = Line {
            id: spec.id.clone(),
            comment: spec.comment.clone(),
            start: Endpoint {
                attachment: start.attachment,
                ..Endpoint::at(start.pos)
            },
            end: Endpoint {
                attachment: end.attachment,
                ..Endpoint::at(end.pos)
            },
            property: spec.property.clone(),
            skip: normalize_skip(spec.start.skip.unwrap_or(0.0)),
            clearance: Clearance::from_property(&spec.property),
            elevation: self.z_extent,
            parent: None,
        };
        info!(
            id = line.id.as_deref().unwrap_or("-"),
            "line ({}, {})-({}, {})",
            line.start.x(),
            line.start.y(),
            line.end.x(),
            line.end.y()
        );
        self.push(Element::Line(line))
    }

    pub fn add_connector(&mut self, spec: &ConnectorSpec) -> GenResult<ElementId> {
        self.check_id(spec.id.as_deref())?;
        let (Some(start_id), Some(end_id)) = (&spec.start.attached_to, &spec.end.attached_to)
        else {
            return Err(GenError::DetachedConnector);
        };

        let resolver = self.resolver();
        let start = resolver.attach(start_id, spec.start.point)?;
        let end = resolver.attach(end_id, spec.end.point)?;
        let (Some(start_att), Some(end_att)) = (start.attachment, end.attachment) else {
            return Err(GenError::DetachedConnector);
        };
        if start_att.kind != ElementKind::Line || end_att.kind != ElementKind::Line {
            return Err(GenError::DetachedConnector);
        }

        // the channel spans from the bottom of the start line to the top of the end line
        let x = start.pos.x + 0.5 * spec.property.width;
        let y_start = start.pos.y - 0.5 * start_att.width;
        let y_end = end.pos.y + 0.5 * end_att.width;
        if start.pos.y > end.pos.y + TOLERANCE {
            return Err(GenError::ConnectorOrder {
                start: start.pos.y,
                end: end.pos.y,
            });
        }

        self.mark(start_att.target, start_att.point, true);
        self.mark(end_att.target, end_att.point, true);

        let connector = Connector {
            id: spec.id.clone(),
            comment: spec.comment.clone(),
            start: Endpoint {
                attachment: Some(start_att),
                ..Endpoint::at(Point2::new(x, y_start))
            },
            end: Endpoint {
                attachment: Some(end_att),
                ..Endpoint::at(Point2::new(x, y_end))
            },
            property: spec.property.clone(),
            elevation: self.z_extent,
        };
        info!(
            id = connector.id.as_deref().unwrap_or("-"),
            "connector at x = {} from y = {} to y = {}", x, y_start, y_end
        );
        self.push(Element::Connector(connector))
    }

    fn set_limits(&mut self) {
        let mut lines = self.elements.iter().filter_map(Element::as_line);
        let Some(first) = lines.next() else {
            self.bounds = Bounds::zero();
            return;
        };
        let mut bounds = Bounds {
            min: first.start.pos,
            max: first.start.pos,
        };
        for line in std::iter::once(first).chain(lines) {
            let (x_min, x_max) = line.x_range();
            let y_min = line.start.y().min(line.end.y()) - line.clearance.weak_space_down;
            let y_max = line.start.y().max(line.end.y()) + line.clearance.weak_space_up;
            bounds.include(Point2::new(x_min, y_min), Point2::new(x_max, y_max));
        }
        self.bounds = bounds;
    }

    /// Move the assembly so that its bounding box is centered at the origin
    pub fn set_center(&mut self) {
        self.set_limits();

        let shift = -self.bounds.center().coords;
        for element in &mut self.elements {
            element.translate(&shift);
        }
        self.bounds.min += shift;
        self.bounds.max += shift;
        info!(
            "the elements are confined within (X: {}, {}) (Y: {}, {})",
            self.bounds.min.x, self.bounds.max.x, self.bounds.min.y, self.bounds.max.y
        );
    }
}

/// Offset direction of a line attached to a connector end
fn vertical_sign(point: PointName) -> f64 {
    match point {
        PointName::End => -1.0,
        PointName::Start => 1.0,
    }
}

fn validate_property(property: &LineProperty) -> GenResult<()> {
    let grooves = &property.grooves;
    if !(grooves.period > 0.0) {
        return Err(GenError::InvalidProperty(format!(
            "groove period must be positive, got {}",
            grooves.period
        )));
    }
    if grooves.width < 0.0 || grooves.width > grooves.period {
        return Err(GenError::InvalidProperty(format!(
            "groove width {} does not fit into period {}",
            grooves.width, grooves.period
        )));
    }
    if property.width < 0.0 || grooves.depth < 0.0 || property.padding < 0.0 {
        return Err(GenError::InvalidProperty(
            "width, depth and padding must not be negative".to_string(),
        ));
    }
    Ok(())
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::description::{
        ConnectorMaterials, ConnectorProperty, Grooves, LineMaterials, PointSpec,
    };
    use crate::material::Medium;

    pub(crate) fn property() -> LineProperty {
        LineProperty {
            width: 4.0,
            padding: 1.0,
            grooves: Grooves {
                period: 10.0,
                width: 2.0,
                depth: 1.0,
            },
            materials: LineMaterials {
                up: Medium::Metal {
                    epsilon: 1.0,
                    conductivity: 1e6,
                },
                inner: Medium::air(),
                down: Medium::Metal {
                    epsilon: 1.0,
                    conductivity: 1e6,
                },
            },
        }
    }

    pub(crate) fn absolute(x: f64, y: f64) -> PointSpec {
        PointSpec {
            x: Some(x),
            y: Some(y),
            ..Default::default()
        }
    }

    pub(crate) fn line_spec(id: &str, x0: f64, x1: f64, y: f64) -> LineSpec {
        LineSpec {
            id: Some(id.to_string()),
            comment: None,
            start: absolute(x0, y),
            end: absolute(x1, y),
            property: property(),
        }
    }

    fn attached(id: &str, point: PointName) -> PointSpec {
        PointSpec {
            attached_to: Some(id.to_string()),
            point,
            ..Default::default()
        }
    }

    fn connector_spec(from: &str, to: &str) -> ConnectorSpec {
        ConnectorSpec {
            id: Some("c".to_string()),
            comment: None,
            start: attached(from, PointName::End),
            end: attached(to, PointName::Start),
            property: ConnectorProperty {
                width: 2.0,
                materials: ConnectorMaterials {
                    inner: Medium::air(),
                },
            },
        }
    }

    #[test]
    fn test_add_line_computes_clearances() {
        let mut layout = Layout::default();
        let handle = layout.add_line(&line_spec("a", 0.0, 30.0, 0.0)).unwrap();
        let line = layout.get(handle).and_then(Element::as_line).unwrap();
        assert_eq!(line.clearance.space_up, 3.0);
        assert_eq!(line.clearance.space_down, 3.0);
        assert_eq!(line.clearance.weak_space_up, 4.0);
        assert_eq!(line.clearance.weak_space_down, 4.0);
        assert_eq!(line.skip, 0.0);
        assert_eq!(line.elevation, None);
        assert_eq!(layout.find("a"), Some(handle));
    }

    #[test]
    fn test_periods_end_ignores_direction() {
        let mut layout = Layout::new(Some(0.5));
        let mut spec = line_spec("a", 2.0, 0.0, 1.0);
        spec.end = PointSpec {
            x: Some(3.0),
            y: Some(4.0),
            periods: Some(2.0),
            direction: Some(crate::description::Direction { x: 0.0, y: 1.0 }),
            ..Default::default()
        };
        spec.start.skip = Some(1.5);
        let handle = layout.add_line(&spec).unwrap();
        let line = layout.get(handle).and_then(Element::as_line).unwrap();
        assert_eq!(line.end.pos, Point2::new(2.0 + 5.0 + 20.0, 1.0));
        assert_eq!(line.skip, 0.5);
        assert_eq!(line.elevation, Some(0.5));
    }

    #[test]
    fn test_relative_end_on_own_start() {
        let mut layout = Layout::default();
        let mut spec = line_spec("a", 5.0, 0.0, 2.0);
        spec.end = PointSpec {
            x: Some(12.0),
            reference: Some("a".to_string()),
            ..Default::default()
        };
        let handle = layout.add_line(&spec).unwrap();
        let line = layout.get(handle).and_then(Element::as_line).unwrap();
        assert_eq!(line.end.pos, Point2::new(17.0, 2.0));
    }

    #[test]
    fn test_reference_must_be_declared_earlier() {
        let mut layout = Layout::default();
        let mut first = line_spec("a", 0.0, 10.0, 0.0);
        first.start = PointSpec {
            reference: Some("b".to_string()),
            ..Default::default()
        };
        assert!(matches!(
            layout.add_line(&first),
            Err(GenError::UnresolvedReference(id)) if id == "b"
        ));

        layout.add_line(&line_spec("b", 0.0, 10.0, 0.0)).unwrap();
        let mut second = line_spec("c", 0.0, 10.0, 0.0);
        second.start = PointSpec {
            x: Some(1.0),
            y: Some(20.0),
            reference: Some("b".to_string()),
            point: PointName::End,
            ..Default::default()
        };
        second.end = PointSpec {
            x: Some(10.0),
            reference: Some("c".to_string()),
            ..Default::default()
        };
        let handle = layout.add_line(&second).unwrap();
        let line = layout.get(handle).and_then(Element::as_line).unwrap();
        assert_eq!(line.start.pos, Point2::new(11.0, 20.0));
        assert_eq!(line.end.pos, Point2::new(21.0, 20.0));
    }

    #[test]
    fn test_line_ends_out_of_order() {
        let mut layout = Layout::default();
        assert!(matches!(
            layout.add_line(&line_spec("a", 10.0, 0.0, 0.0)),
            Err(GenError::LineEndsOrder { .. })
        ));
    }

    #[test]
    fn test_diagonal_line_rejected() {
        let mut layout = Layout::default();
        let mut spec = line_spec("a", 0.0, 10.0, 0.0);
        spec.end = absolute(10.0, 3.0);
        assert!(matches!(
            layout.add_line(&spec),
            Err(GenError::DiagonalLine { .. })
        ));
    }

    #[test]
    fn test_duplicate_id() {
        let mut layout = Layout::default();
        layout.add_line(&line_spec("a", 0.0, 10.0, 0.0)).unwrap();
        assert!(matches!(
            layout.add_line(&line_spec("a", 0.0, 10.0, 20.0)),
            Err(GenError::DuplicateId(_))
        ));
    }

    #[test]
    fn test_connector_requires_attachments() {
        let mut layout = Layout::default();
        layout.add_line(&line_spec("a", 0.0, 10.0, 0.0)).unwrap();
        let mut spec = connector_spec("a", "a");
        spec.end = absolute(10.0, 20.0);
        assert!(matches!(
            layout.add_connector(&spec),
            Err(GenError::DetachedConnector)
        ));
    }

    #[test]
    fn test_connector_spans_both_channels() {
        let mut layout = Layout::default();
        layout.add_line(&line_spec("low", 0.0, 10.0, 0.0)).unwrap();
        layout.add_line(&line_spec("high", 0.0, 10.0, 20.0)).unwrap();
        let handle = layout.add_connector(&connector_spec("low", "high")).unwrap();
        let con = layout.get(handle).and_then(Element::as_connector).unwrap();
        assert_eq!(con.start.pos, Point2::new(11.0, -2.0));
        assert_eq!(con.end.pos, Point2::new(11.0, 22.0));
        assert_eq!(con.elevation, None);

        let low = layout.get(ElementId(0)).unwrap();
        assert!(low.point(PointName::End).right_attachment);
        let high = layout.get(ElementId(1)).unwrap();
        assert!(high.point(PointName::Start).right_attachment);
    }

    #[test]
    fn test_connector_cannot_descend() {
        let mut layout = Layout::default();
        layout.add_line(&line_spec("low", 0.0, 10.0, 0.0)).unwrap();
        layout.add_line(&line_spec("high", 0.0, 10.0, 20.0)).unwrap();
        let err = layout.add_connector(&connector_spec("high", "low")).unwrap_err();
        assert!(matches!(
            err,
            GenError::ConnectorOrder { start, end } if start == 20.0 && end == 0.0
        ));
        assert_eq!(err.code(), 16);
        // nothing was added or marked
        assert_eq!(layout.elements().len(), 2);
        let high = layout.get(ElementId(1)).unwrap();
        assert!(!high.point(PointName::End).right_attachment);
    }

    #[test]
    fn test_line_attached_to_connector() {
        let mut layout = Layout::default();
        layout.add_line(&line_spec("low", 0.0, 10.0, 0.0)).unwrap();
        layout.add_line(&line_spec("high", 0.0, 10.0, 20.0)).unwrap();
        layout.add_connector(&connector_spec("low", "high")).unwrap();

        let spec = LineSpec {
            id: Some("out".to_string()),
            comment: None,
            start: attached("c", PointName::End),
            end: PointSpec {
                periods: Some(1.0),
                ..Default::default()
            },
            property: property(),
        };
        let handle = layout.add_line(&spec).unwrap();
        let line = layout.get(handle).and_then(Element::as_line).unwrap();
        // connector top is at y = 22, x = 11, half width 1
        assert_eq!(line.start.pos, Point2::new(12.0, 20.0));
        assert_eq!(line.end.pos, Point2::new(22.0, 20.0));
        let con = layout.find("c").and_then(|h| layout.get(h)).unwrap();
        assert!(con.point(PointName::End).right_attachment);
    }

    #[test]
    fn test_set_center() {
        let mut layout = Layout::default();
        layout.add_line(&line_spec("a", 10.0, 40.0, 5.0)).unwrap();
        layout.add_line(&line_spec("b", 0.0, 20.0, 25.0)).unwrap();
        layout.set_center();

        let bounds = *layout.limits();
        assert!((bounds.min.x + bounds.max.x).abs() < 1e-9);
        assert!((bounds.min.y + bounds.max.y).abs() < 1e-9);
        assert_eq!(bounds.width(), 40.0);
        // y from 5 - 4 to 25 + 4
        assert_eq!(bounds.height(), 28.0);

        let a = layout.get(ElementId(0)).and_then(Element::as_line).unwrap();
        assert_eq!(a.start.pos, Point2::new(-10.0, -10.0));
        assert!(layout.is_inside(0.0, 0.0));
        assert!(!layout.is_inside(20.0, 0.0));
    }

    #[test]
    fn test_set_center_ignores_connectors() {
        let mut layout = Layout::default();
        layout.add_line(&line_spec("low", 0.0, 10.0, 0.0)).unwrap();
        layout.add_line(&line_spec("high", 0.0, 10.0, 20.0)).unwrap();
        layout.add_connector(&connector_spec("low", "high")).unwrap();
        layout.set_center();
        // the connector sits at x = 11 before centering, outside the lines
        assert_eq!(layout.limits().width(), 10.0);
        let con = layout.find("c").and_then(|h| layout.get(h)).unwrap();
        assert_eq!(con.point(PointName::Start).pos.x, 6.0);
    }

    #[test]
    fn test_empty_layout_has_zero_bounds() {
        let mut layout = Layout::default();
        layout.set_center();
        assert_eq!(*layout.limits(), Bounds::zero());
        assert!(!layout.is_inside(0.0, 0.0));
    }

    #[test]
    fn test_invalid_period() {
        let mut layout = Layout::default();
        let mut spec = line_spec("a", 0.0, 10.0, 0.0);
        spec.property.grooves.period = 0.0;
        assert!(matches!(
            layout.add_line(&spec),
            Err(GenError::InvalidProperty(_))
        ));
    }
}
