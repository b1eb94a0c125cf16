//! meep-grooves: Generate MEEP control files for periodic grooved waveguides
//!
//! This crate provides:
//! - Parsing of the YAML/JSON meta-configuration of a structure
//! - Placement of lines and connectors with reference resolution
//! - Conflict resolution between neighbouring lines (cutting and padding)
//! - Periodic segmentation of lines into flat and grooved blocks
//! - Template-driven emission of MEEP Scheme control files
//!
//! Lengths are in MEEP's normalized units throughout; the description is
//! expected to use them already.

pub mod conflict;
pub mod control;
pub mod description;
pub mod element;
pub mod error;
pub mod material;
pub mod placement;
pub mod resolve;
pub mod scene;
pub mod segment;
pub mod template;

pub use control::{generate_ctl, write_atomic, ControlFile};
pub use description::{Description, FORMAT_VERSION};
pub use element::{Connector, Element, ElementId, Line, TOLERANCE};
pub use error::{Diagnostics, GenError, GenResult, Warning, WarningKind};
pub use material::Medium;
pub use placement::{Bounds, Layout};
pub use scene::{RunControl, Scene};
pub use template::Templates;

/// Output of a translation run
#[derive(Debug, Clone)]
pub struct Translation {
    /// Text of the control program
    pub ctl: String,
    pub diagnostics: Diagnostics,
    /// Where the description asks the program to be written, if anywhere
    pub ctl_file: Option<String>,
}

/// Main entry point: resolve a description and emit its control program
pub fn translate(
    desc: &Description,
    templates: &Templates,
    config: &TranslationConfig,
) -> GenResult<Translation> {
    let scene = Scene::build(desc, config)?;
    let ctl = generate_ctl(&scene, templates, config)?;
    Ok(Translation {
        ctl,
        diagnostics: scene.diagnostics,
        ctl_file: desc.output.as_ref().and_then(|o| o.ctl_file.clone()),
    })
}

/// Configuration for the translation process
#[derive(Debug, Clone)]
pub struct TranslationConfig {
    /// Name of the description file, quoted in the output header
    pub input_name: String,
    /// Force a short structure-only run regardless of the description
    pub structure_only: bool,
    /// Sampling interval of snapshots that don't give one
    pub snapshot_interval: f64,
    /// Duration of a structure-only run
    pub structure_only_duration: f64,
}

impl Default for TranslationConfig {
    fn default() -> Self {
        Self {
            input_name: "gen.yaml".to_string(),
            structure_only: false,
            snapshot_interval: 0.6,
            structure_only_duration: 0.1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::tests::{separated, SEPARATED};
    use pretty_assertions::assert_eq;

    fn run(desc: &Description) -> GenResult<Translation> {
        let templates = Templates::builtin()?;
        translate(desc, &templates, &TranslationConfig::default())
    }

    #[test]
    fn test_separated_translation() {
        let out = run(&separated()).unwrap();
        assert!(out.diagnostics.is_empty());
        assert_eq!(out.ctl_file, None);
        assert_eq!(
            out.ctl.lines().filter(|l| l.contains("(make block ")).count(),
            36
        );
    }

    #[test]
    fn test_strong_conflict_aborts() {
        let text = SEPARATED.replace("start: {x: 0, y: 20}", "start: {x: 0, y: 3}");
        let desc = Description::from_yaml_str(&text).unwrap();
        let err = run(&desc).unwrap_err();
        assert!(matches!(err, GenError::StrongConflict { .. }), "{:?}", err);
        assert_eq!(err.code(), 20);
    }

    #[test]
    fn test_soft_conflict_is_settled() {
        // 7 apart with overhangs: cut into aligned pairs, then padding is split
        let mut desc = separated();
        if let description::ElementRecord::Line(b) = &mut desc.geometry.elements[1] {
            b.start.x = Some(10.0);
            b.start.y = Some(7.0);
            b.end.x = Some(50.0);
        }
        desc.collectors.temporal.clear();
        let scene = Scene::build(&desc, &TranslationConfig::default()).unwrap();
        assert_eq!(scene.cuts, 2);
        assert_eq!(scene.layout.elements().len(), 4);
        let templates = Templates::builtin().unwrap();
        let ctl = generate_ctl(&scene, &templates, &TranslationConfig::default()).unwrap();
        // cutting keeps the segment count: 6 + 8 before, 2 + 4 + 4 + 4 after
        assert_eq!(ctl.lines().filter(|l| l.contains("(make block ")).count(), 42);
        // fragments carry no comment
        assert_eq!(ctl.matches("; lower guide").count(), 1);
    }

    #[test]
    fn test_connector_between_lines() {
        let text = SEPARATED.replace(
            "Sources:",
            r#"    - connector:
        comment: riser
        start: {attached_to: a, point: end}
        end: {attached_to: b, point: end}
        property:
          width: 2
          materials:
            in: {medium: dielectric, epsilon: 2.25}
Sources:"#,
        );
        let out = run(&Description::from_yaml_str(&text).unwrap()).unwrap();
        let blocks: Vec<&str> = out
            .ctl
            .lines()
            .filter(|l| l.contains("(make block "))
            .collect();
        assert_eq!(blocks.len(), 39);
        // centered: a ends at (15, -10), b at (15, 10)
        assert!(blocks[36].contains("(center 16.0 -13.0) (size 2.0 2.0 infinity)"));
        assert!(blocks[37].contains("(center 16.0 0.0) (size 2.0 24.0 infinity)"));
        assert!(blocks[37].contains("(epsilon 2.25)"));
        assert!(blocks[38].contains("(center 16.0 13.0) (size 2.0 2.0 infinity)"));
        assert!(out.ctl.contains("; riser\n"));
    }

    #[test]
    fn test_descending_connector_is_rejected() {
        let text = SEPARATED.replace(
            "Sources:",
            r#"    - connector:
        start: {attached_to: b, point: end}
        end: {attached_to: a, point: end}
        property:
          width: 2
          materials:
            in: {medium: dielectric}
Sources:"#,
        );
        let err = run(&Description::from_yaml_str(&text).unwrap()).unwrap_err();
        assert_eq!(err.code(), 16);
    }

    #[test]
    fn test_json_description() {
        let line = |id: &str, y: f64| {
            serde_json::json!({"line": {
                "id": id,
                "start": {"x": 0, "y": y},
                "end": {"x": 30},
                "property": {
                    "width": 4,
                    "padding": 1,
                    "grooves": {"period": 10, "width": 2, "depth": 1},
                    "materials": {
                        "up": {"medium": "metal", "conductivity": 1000000},
                        "in": {"medium": "dielectric"},
                        "down": {"medium": "metal", "conductivity": 1000000}
                    }
                }
            }})
        };
        let text = serde_json::json!({
            "version": "3.0",
            "Geometry": {"overshot": 2, "elements": [line("a", 0.0), line("b", 20.0)]},
            "Sources": [{"source": {
                "position": {"ref": "a", "point": "start", "x": 1, "y": 0, "width": 0.5},
                "property": {"component": "Ez", "type": "pulse", "center": 0.15, "width": 0.1}
            }}],
            "Collectors": {"spectral": [{"flux": {
                "position": {"x": 10, "y": 0, "width": 3},
                "property": {"center": 0.15, "width": 0.1, "resolution": 100}
            }}]},
            "Controls": {"resolution": 10, "time": {"type": "decay", "duration": 200}}
        })
        .to_string();
        let desc = Description::from_json_str(&text).unwrap();
        assert!(matches!(
            desc.geometry.elements[1],
            description::ElementRecord::Line(_)
        ));
        let out = run(&desc).unwrap();
        assert!(out.diagnostics.is_empty(), "{:?}", out.diagnostics);
        assert_eq!(
            out.ctl.lines().filter(|l| l.contains("(make block ")).count(),
            36
        );

        let strong = text.replace(r#""y":20.0"#, r#""y":3.0"#);
        assert_ne!(strong, text);
        let err = run(&Description::from_json_str(&strong).unwrap()).unwrap_err();
        assert_eq!(err.code(), 20);
    }

    #[test]
    fn test_detached_connector() {
        let text = SEPARATED.replace(
            "Sources:",
            r#"    - connector:
        start: {x: 0, y: 0}
        end: {attached_to: a, point: end}
        property:
          width: 2
          materials:
            in: {medium: dielectric}
Sources:"#,
        );
        let err = run(&Description::from_yaml_str(&text).unwrap()).unwrap_err();
        assert_eq!(err.code(), 12);
    }

    #[test]
    fn test_output_file_from_description() {
        let mut desc = separated();
        desc.output = Some(description::OutputSection {
            ctl_file: Some("grooves.ctl".to_string()),
        });
        let out = run(&desc).unwrap();
        assert_eq!(out.ctl_file.as_deref(), Some("grooves.ctl"));
    }
}
