//! Scene assembly: one fully resolved translation run
//!
//! Builds the layout from the description, centers and settles it, then
//! places sources, flux points and transients in the centered frame.

use nalgebra::Point2;
use tracing::info;

use crate::conflict::settle_conflicts;
use crate::description::{Description, ElementRecord, TimeKind};
use crate::element::{FluxPoint, Source, Transient, TransientScope};
use crate::error::{Diagnostics, GenResult, WarningKind};
use crate::placement::Layout;
use crate::TranslationConfig;

/// How the simulation is stopped; chosen once per run
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RunControl {
    /// Short fixed run that only renders the structure
    StructureOnly,
    /// Run until the fields decay at the given point
    Decay { x: f64, y: f64 },
    Fixed,
}

#[derive(Debug, Clone)]
pub struct Scene {
    pub layout: Layout,
    pub sources: Vec<Source>,
    pub fluxes: Vec<FluxPoint>,
    pub transients: Vec<Transient>,
    pub run: RunControl,
    pub duration: f64,
    pub resolution: f64,
    pub complex: bool,
    /// Margin around the structure
    pub overshot: f64,
    /// Slab thickness for three-dimensional cells
    pub thickness: Option<f64>,
    pub comment: Option<String>,
    /// Number of line cuts made while settling conflicts
    pub cuts: usize,
    pub diagnostics: Diagnostics,
}

impl Scene {
    /// Resolve a description into a placed, conflict-free scene
    pub fn build(desc: &Description, config: &TranslationConfig) -> GenResult<Self> {
        desc.check_version()?;
        let mut diagnostics = Diagnostics::new();

        let thickness = desc.geometry.z_direction.as_ref().map(|z| z.size);
        let mut layout = Layout::new(thickness);
        if desc.geometry.elements.is_empty() {
            diagnostics.warn(WarningKind::NoElements, "The list of elements is empty!");
        }
        for record in &desc.geometry.elements {
            match record {
                ElementRecord::Line(spec) => layout.add_line(spec)?,
                ElementRecord::Connector(spec) => layout.add_connector(spec)?,
            };
        }
        layout.set_center();
        let cuts = settle_conflicts(&mut layout)?;

        let resolver = layout.resolver();

        if desc.sources.is_empty() {
            diagnostics.warn(WarningKind::NoSources, "The list of sources is empty!");
        }
        let mut sources = Vec::with_capacity(desc.sources.len());
        for record in &desc.sources {
            let spec = &record.source;
            let (position, width) = resolver.position(&spec.position)?;
            if !layout.is_inside(position.x, position.y) {
                diagnostics.warn(
                    WarningKind::SourceOutside,
                    format!("The source at ({}, {}) is outside the structure", position.x, position.y),
                );
            }
            info!(x = position.x, y = position.y, "source placed");
            sources.push(Source {
                comment: spec.comment.clone(),
                position,
                width,
                property: spec.property.clone(),
            });
        }

        let spectral = &desc.collectors.spectral;
        if spectral.is_empty() {
            diagnostics.warn(WarningKind::NoObservers, "The list of flux points is empty!");
        }
        let mut fluxes = Vec::with_capacity(spectral.len());
        for record in spectral {
            let spec = &record.flux;
            let (position, width) = resolver.position(&spec.position)?;
            if !layout.is_inside(position.x, position.y) {
                diagnostics.warn(
                    WarningKind::ObserverOutside,
                    format!("The flux point at ({}, {}) is outside the structure", position.x, position.y),
                );
            }
            info!(x = position.x, y = position.y, "flux point placed");
            fluxes.push(FluxPoint {
                comment: spec.comment.clone(),
                position,
                width,
                property: spec.property.clone(),
            });
        }

        let mut transients = Vec::new();
        if let Some(snapshot) = &desc.controls.snapshot {
            transients.push(Transient {
                comment: None,
                component: snapshot.component.clone(),
                field: snapshot.field.clone(),
                interval: snapshot.resolution.unwrap_or(config.snapshot_interval),
                scope: TransientScope::Global,
            });
        }
        for record in &desc.collectors.temporal {
            let spec = &record.transient;
            let scope = match &spec.position {
                None => TransientScope::Global,
                Some(pos) => {
                    let (position, _) = resolver.position(pos)?;
                    if !layout.is_inside(position.x, position.y) {
                        diagnostics.warn(
                            WarningKind::TransientOutside,
                            format!(
                                "The transient at ({}, {}) is outside the structure",
                                position.x, position.y
                            ),
                        );
                    }
                    TransientScope::Local { position }
                }
            };
            transients.push(Transient {
                comment: spec.comment.clone(),
                component: spec.component.clone(),
                field: spec.field.clone(),
                interval: spec.resolution.unwrap_or(config.snapshot_interval),
                scope,
            });
        }

        let controls = &desc.controls;
        let (run, duration) = if config.structure_only || controls.time.structure_only {
            (RunControl::StructureOnly, config.structure_only_duration)
        } else {
            match controls.time.kind {
                TimeKind::Decay => {
                    let at = fluxes
                        .first()
                        .map(|f| f.position)
                        .unwrap_or_else(Point2::origin);
                    (RunControl::Decay { x: at.x, y: at.y }, controls.time.duration)
                }
                TimeKind::Fixed => (RunControl::Fixed, controls.time.duration),
            }
        };

        Ok(Self {
            layout,
            sources,
            fluxes,
            transients,
            run,
            duration,
            resolution: controls.resolution,
            complex: controls.complex,
            overshot: desc.geometry.overshot,
            thickness,
            comment: desc.comment.clone(),
            cuts,
            diagnostics,
        })
    }
}
