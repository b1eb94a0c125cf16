//! MEEP control-file emitter
//!
//! The program is built line by line: pieces are appended to the current
//! line with [`ControlFile::form`] and the line is closed with
//! [`ControlFile::push`]. All text comes from [`Templates`]; the emitter
//! only supplies values.

use std::io::Write;
use std::path::Path;

use minijinja::Value;
use tempfile::NamedTempFile;
use tracing::info;

use crate::description::{PointName, SourceKind};
use crate::element::{Connector, Element, Endpoint, Line, TransientScope};
use crate::error::{GenError, GenResult};
use crate::scene::{RunControl, Scene};
use crate::segment::{connector_blocks, layer_blocks, segments, Block};
use crate::template::Templates;
use crate::TranslationConfig;

/// Output buffer of one control file
pub struct ControlFile<'t> {
    templates: &'t Templates,
    lines: Vec<String>,
    current: String,
    flux_names: Vec<usize>,
    steps: String,
}

impl<'t> ControlFile<'t> {
    pub fn new(templates: &'t Templates) -> Self {
        Self {
            templates,
            lines: Vec::new(),
            current: String::new(),
            flux_names: Vec::new(),
            steps: String::new(),
        }
    }

    /// Append a rendered template to the current line
    pub fn form(&mut self, name: &str, args: &[Value]) -> GenResult<()> {
        let piece = self.templates.render(name, args)?;
        self.current.push_str(&piece);
        Ok(())
    }

    /// Close the current line
    pub fn push(&mut self) {
        self.lines.push(std::mem::take(&mut self.current));
    }

    /// A template on a line of its own
    pub fn add(&mut self, name: &str, args: &[Value]) -> GenResult<()> {
        self.form(name, args)?;
        self.push();
        Ok(())
    }

    pub fn add_comment(&mut self, text: &str) -> GenResult<()> {
        self.add("comment", &[Value::from(text)])
    }

    pub fn header(&mut self, input_name: &str, comment: Option<&str>) -> GenResult<()> {
        let intro = self.templates.render("intro", &[])?;
        self.add_comment(&intro)?;
        let stamp = chrono::Local::now().format("%Y/%m/%d %H:%M").to_string();
        let generated = self.templates.render("generated", &[Value::from(stamp)])?;
        self.add_comment(&generated)?;
        let base = self.templates.render("base", &[Value::from(input_name)])?;
        self.add_comment(&base)?;
        if let Some(comment) = comment {
            self.add_comment(comment)?;
        }
        Ok(())
    }

    /// Computational cell around the centered structure
    pub fn cell(&mut self, scene: &Scene) -> GenResult<()> {
        let s = scene.overshot;
        let (width, height) = if scene.layout.elements().is_empty() {
            info!("Empty structure is generated");
            (2.0 * s, 2.0 * s)
        } else {
            let limits = scene.layout.limits();
            (limits.width(), limits.height() + 2.0 * s)
        };
        match scene.thickness {
            Some(t) => self.add(
                "geometry_3d",
                &[width.into(), height.into(), (t + 2.0 * s).into()],
            ),
            None => self.add("geometry", &[width.into(), height.into()]),
        }
    }

    pub fn block(&mut self, block: &Block) -> GenResult<()> {
        let (cx, cy) = block.center();
        let (sx, sy) = block.size();
        self.form("block_head", &[])?;
        match block.z_size {
            Some(sz) => self.form(
                "block_position_3d",
                &[cx.into(), cy.into(), sx.into(), sy.into(), sz.into()],
            )?,
            None => self.form(
                "block_position",
                &[cx.into(), cy.into(), sx.into(), sy.into()],
            )?,
        }
        let (material, values) = block.medium.block_template();
        let values: Vec<Value> = values.into_iter().map(Value::from).collect();
        self.form(material, &values)?;
        self.form("block_tail", &[])?;
        self.push();
        Ok(())
    }

    fn line(&mut self, line: &Line) -> GenResult<()> {
        for segment in segments(line) {
            for block in layer_blocks(line, &segment) {
                self.block(&block)?;
            }
        }
        Ok(())
    }

    fn connector(&mut self, scene: &Scene, con: &Connector) -> GenResult<()> {
        let attached = |endpoint: &Endpoint| {
            endpoint
                .attachment
                .as_ref()
                .and_then(|a| scene.layout.get(a.target))
                .and_then(Element::as_line)
                .ok_or(GenError::DetachedConnector)
        };
        let start_line = attached(&con.start)?;
        let end_line = attached(&con.end)?;
        for block in connector_blocks(con, start_line, end_line) {
            self.block(&block)?;
        }
        Ok(())
    }

    /// Every element in list order: declared elements, then fragments
    pub fn geometry(&mut self, scene: &Scene) -> GenResult<()> {
        self.add("geometry_head", &[])?;
        for element in scene.layout.elements() {
            if let Some(comment) = element.comment() {
                self.add_comment(comment)?;
            }
            let start = element.point(PointName::Start).pos;
            let end = element.point(PointName::End).pos;
            info!(
                "Adding {:?}: ({}, {})-({}, {})",
                element.kind(),
                start.x,
                start.y,
                end.x,
                end.y
            );
            match element {
                Element::Line(line) => self.line(line)?,
                Element::Connector(con) => self.connector(scene, con)?,
            }
        }
        self.add("geometry_tail", &[])
    }

    /// Sources are apertures of zero extent in x
    pub fn sources(&mut self, scene: &Scene) -> GenResult<()> {
        self.add("sources_head", &[])?;
        for source in &scene.sources {
            info!(
                "Adding source: ({}, {})",
                source.position.x, source.position.y
            );
            if let Some(comment) = &source.comment {
                self.add_comment(comment)?;
            }
            let props = &source.property;
            self.form("source_head", &[])?;
            self.form("source_component", &[Value::from(props.component.as_str())])?;
            self.form(
                "source_position",
                &[
                    source.position.x.into(),
                    source.position.y.into(),
                    0.0.into(),
                    source.width.into(),
                ],
            )?;
            let profile = match props.kind {
                SourceKind::Pulse => "source_pulse",
                SourceKind::Continuous => "source_continuous",
            };
            self.form(profile, &[props.center.into(), props.width.into()])?;
            self.form("source_tail", &[])?;
            self.push();
        }
        self.add("sources_tail", &[])
    }

    pub fn controls(&mut self, scene: &Scene) -> GenResult<()> {
        self.add("pml", &[])?;
        self.add("resolution", &[scene.resolution.into()])?;
        if scene.complex {
            self.add("complex", &[])?;
        }
        Ok(())
    }

    /// Flux regions, numbered from 0 in declaration order
    pub fn fluxes(&mut self, scene: &Scene) -> GenResult<()> {
        for (counter, flux) in scene.fluxes.iter().enumerate() {
            info!(
                "Adding flux collector: {} at ({}, {})",
                counter, flux.position.x, flux.position.y
            );
            if let Some(comment) = &flux.comment {
                self.add_comment(comment)?;
            }
            let props = &flux.property;
            self.form("flux_head", &[counter.into()])?;
            self.form(
                "flux_prop",
                &[props.center.into(), props.width.into(), props.resolution.into()],
            )?;
            self.form(
                "flux_position",
                &[
                    flux.position.x.into(),
                    flux.position.y.into(),
                    0.0.into(),
                    flux.width.into(),
                ],
            )?;
            self.form("flux_tail", &[])?;
            self.push();
            self.flux_names.push(counter);
        }
        Ok(())
    }

    /// Step functions `transient<k>`, later handed to the run control
    pub fn transients(&mut self, scene: &Scene) -> GenResult<()> {
        for (k, transient) in scene.transients.iter().enumerate() {
            let name = format!("transient{}", k);
            let field = transient.field.as_str();
            let component = transient.component.as_str();
            if let Some(comment) = &transient.comment {
                self.add_comment(comment)?;
            }
            self.form("function_head", &[Value::from(name.as_str())])?;
            match &transient.scope {
                TransientScope::Global => self.form(
                    "snapshot_global",
                    &[
                        Value::from(format!("{}{}", field, component)),
                        transient.interval.into(),
                        field.into(),
                        component.into(),
                    ],
                )?,
                TransientScope::Local { position } => self.form(
                    "snapshot_local",
                    &[
                        Value::from(format!("{}{}-{}", field, component, k)),
                        transient.interval.into(),
                        field.into(),
                        component.into(),
                        position.x.into(),
                        position.y.into(),
                    ],
                )?,
            }
            self.form("function_tail", &[])?;
            self.push();

            let step = self
                .templates
                .render("function_ref", &[Value::from(name.as_str())])?;
            self.steps.push_str(&step);
        }
        Ok(())
    }

    pub fn run_control(&mut self, scene: &Scene) -> GenResult<()> {
        let steps = Value::from(self.steps.as_str());
        match scene.run {
            RunControl::Decay { x, y } => self.add(
                "time_decay",
                &[steps, scene.duration.into(), x.into(), y.into()],
            ),
            RunControl::StructureOnly | RunControl::Fixed => {
                self.add("time_fixed", &[scene.duration.into(), steps])
            }
        }
    }

    pub fn finalize_fluxes(&mut self) -> GenResult<()> {
        self.form("fluxes_head", &[])?;
        for counter in self.flux_names.clone() {
            self.form("flux_ref", &[counter.into()])?;
        }
        self.form("fluxes_tail", &[])?;
        self.push();
        Ok(())
    }

    /// The finished program, one template line per text line
    pub fn text(&self) -> String {
        let mut out = String::new();
        for line in &self.lines {
            out.push_str(line);
            out.push('\n');
        }
        out
    }
}

/// Emit the complete control program for a settled scene
pub fn generate_ctl(
    scene: &Scene,
    templates: &Templates,
    config: &TranslationConfig,
) -> GenResult<String> {
    let mut ctl = ControlFile::new(templates);
    ctl.header(&config.input_name, scene.comment.as_deref())?;
    ctl.cell(scene)?;
    ctl.geometry(scene)?;
    ctl.sources(scene)?;
    ctl.controls(scene)?;
    ctl.fluxes(scene)?;
    ctl.transients(scene)?;
    ctl.run_control(scene)?;
    ctl.finalize_fluxes()?;
    Ok(ctl.text())
}

/// Write through a temporary file in the destination directory so a failed
/// run never leaves a partial control file behind
pub fn write_atomic(path: &Path, text: &str) -> GenResult<()> {
    let dir = match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    };
    let mut file = NamedTempFile::new_in(dir)?;
    file.write_all(text.as_bytes())?;
    file.persist(path).map_err(|e| GenError::Io(e.error))?;
    info!("The output is written to: {}", path.display());
    Ok(())
}
