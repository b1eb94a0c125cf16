//! Resolution of relative (`ref`) and attached (`attached_to`) points
//!
//! Lookups only see elements that are already placed. A description can
//! therefore only refer backwards; the one exception is a line end that
//! refers to the start of the line being added.

use std::collections::HashMap;

use nalgebra::{Point2, Vector2};

use crate::description::{PointName, PointSpec, PositionSpec};
use crate::element::{Attachment, Element, ElementId};
use crate::error::{GenError, GenResult};

/// Symbolic id → handle of every named element placed so far
#[derive(Debug, Clone, Default)]
pub struct IdIndex {
    map: HashMap<String, ElementId>,
}

impl IdIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.map.contains_key(id)
    }

    pub fn get(&self, id: &str) -> Option<ElementId> {
        self.map.get(id).copied()
    }

    pub fn register(&mut self, id: &str, handle: ElementId) -> GenResult<()> {
        if self.map.contains_key(id) {
            return Err(GenError::DuplicateId(id.to_string()));
        }
        self.map.insert(id.to_string(), handle);
        Ok(())
    }
}

/// Start of the line currently being added, for self-referencing end points
#[derive(Debug, Clone, Copy)]
pub struct OwnStart<'s> {
    pub id: Option<&'s str>,
    pub pos: Point2<f64>,
}

/// A resolved point
#[derive(Debug, Clone, PartialEq)]
pub struct Resolved {
    pub pos: Point2<f64>,
    pub attachment: Option<Attachment>,
}

pub struct Resolver<'a> {
    elements: &'a [Element],
    index: &'a IdIndex,
}

impl<'a> Resolver<'a> {
    pub fn new(elements: &'a [Element], index: &'a IdIndex) -> Self {
        Self { elements, index }
    }

    pub fn lookup(&self, id: &str) -> GenResult<(ElementId, &'a Element)> {
        let handle = self
            .index
            .get(id)
            .ok_or_else(|| GenError::UnresolvedReference(id.to_string()))?;
        let element = self
            .elements
            .get(handle.index())
            .ok_or_else(|| GenError::UnresolvedReference(id.to_string()))?;
        Ok((handle, element))
    }

    /// The target's point shifted by `offset`
    pub fn relative(&self, id: &str, point: PointName, offset: Vector2<f64>) -> GenResult<Point2<f64>> {
        let (_, target) = self.lookup(id)?;
        Ok(target.point(point).pos + offset)
    }

    /// Exactly the target's point, plus the back-reference
    pub fn attach(&self, id: &str, point: PointName) -> GenResult<Resolved> {
        let (handle, target) = self.lookup(id)?;
        Ok(Resolved {
            pos: target.point(point).pos,
            attachment: Some(Attachment {
                target: handle,
                kind: target.kind(),
                point,
                width: target.width(),
            }),
        })
    }

    /// Resolve a line or connector point.
    ///
    /// Absolute coordinates the point leaves out are taken from `fallback`.
    /// An attachment takes precedence over a relative reference.
    pub fn line_point(
        &self,
        spec: &PointSpec,
        fallback: Point2<f64>,
        own: Option<OwnStart<'_>>,
    ) -> GenResult<Resolved> {
        if let Some(target) = &spec.attached_to {
            return self.attach(target, spec.point);
        }

        if let Some(target) = &spec.reference {
            let offset = Vector2::new(spec.x.unwrap_or(0.0), spec.y.unwrap_or(0.0));
            let pos = match own {
                Some(own) if own.id == Some(target.as_str()) => {
                    if spec.point != PointName::Start {
                        return Err(GenError::UnresolvedReference(target.clone()));
                    }
                    own.pos + offset
                }
                _ => self.relative(target, spec.point, offset)?,
            };
            return Ok(Resolved {
                pos,
                attachment: None,
            });
        }

        Ok(Resolved {
            pos: Point2::new(
                spec.x.unwrap_or(fallback.x),
                spec.y.unwrap_or(fallback.y),
            ),
            attachment: None,
        })
    }

    /// Position and aperture of a source, observer or local transient.
    /// A relative aperture is scaled by the referenced element's width.
    pub fn position(&self, spec: &PositionSpec) -> GenResult<(Point2<f64>, f64)> {
        let offset = Vector2::new(spec.x, spec.y);
        match &spec.reference {
            Some(target) => {
                let (_, element) = self.lookup(target)?;
                Ok((
                    element.point(spec.point).pos + offset,
                    spec.width * element.width(),
                ))
            }
            None => Ok((Point2::from(offset), spec.width)),
        }
    }
}
