//! Input tree types matching the meta-configuration format
//!
//! The description is read from YAML (or JSON) and mirrors its layout
//! section by section. Nothing here is resolved: points may still be
//! relative to, or attached to, other elements.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{GenError, GenResult};
use crate::material::Medium;

/// Description format version understood by this engine
pub const FORMAT_VERSION: &str = "3.0";

/// Top-level description
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Description {
    pub version: String,
    /// Free text copied into the output header
    #[serde(default)]
    pub comment: Option<String>,
    #[serde(rename = "Output", default)]
    pub output: Option<OutputSection>,
    #[serde(rename = "Geometry")]
    pub geometry: GeometrySection,
    #[serde(rename = "Sources", default)]
    pub sources: Vec<SourceRecord>,
    #[serde(rename = "Collectors", default)]
    pub collectors: CollectorsSection,
    #[serde(rename = "Controls")]
    pub controls: ControlsSection,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputSection {
    pub ctl_file: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeometrySection {
    /// Entries are single-key maps, `{line: ...}` or `{connector: ...}`
    #[serde(default, with = "serde_yaml::with::singleton_map_recursive")]
    pub elements: Vec<ElementRecord>,
    /// Margin added around the structure in y
    #[serde(default)]
    pub overshot: f64,
    #[serde(rename = "Z_direction", default)]
    pub z_direction: Option<ZDirection>,
}

/// Slab thickness; absent for purely planar structures
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ZDirection {
    pub size: f64,
}

/// One entry of `Geometry.elements`: `{line: ...}` or `{connector: ...}`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ElementRecord {
    Line(LineSpec),
    Connector(ConnectorSpec),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LineSpec {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub comment: Option<String>,
    pub start: PointSpec,
    pub end: PointSpec,
    pub property: LineProperty,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectorSpec {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub comment: Option<String>,
    pub start: PointSpec,
    pub end: PointSpec,
    pub property: ConnectorProperty,
}

/// Which end of an element a reference points at
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PointName {
    #[default]
    Start,
    End,
}

/// A possibly unresolved point.
///
/// `x`/`y` are absolute coordinates, or offsets when `ref` is given.
/// `attached_to` makes the point coincide with the target's point.
/// `periods` (end points only) places the point a whole number of
/// groove periods to the right of the start.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PointSpec {
    #[serde(default)]
    pub x: Option<f64>,
    #[serde(default)]
    pub y: Option<f64>,
    #[serde(rename = "ref", default)]
    pub reference: Option<String>,
    #[serde(default)]
    pub attached_to: Option<String>,
    #[serde(default)]
    pub point: PointName,
    #[serde(default)]
    pub skip: Option<f64>,
    #[serde(default)]
    pub periods: Option<f64>,
    /// Accepted but not interpreted: period-based ends always run along +x
    #[serde(default)]
    pub direction: Option<Direction>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Direction {
    pub x: f64,
    pub y: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineProperty {
    pub width: f64,
    #[serde(default)]
    pub padding: f64,
    pub grooves: Grooves,
    pub materials: LineMaterials,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Grooves {
    pub period: f64,
    pub width: f64,
    pub depth: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineMaterials {
    pub up: Medium,
    #[serde(rename = "in")]
    pub inner: Medium,
    pub down: Medium,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConnectorProperty {
    pub width: f64,
    pub materials: ConnectorMaterials,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConnectorMaterials {
    #[serde(rename = "in")]
    pub inner: Medium,
}

/// Position of a source, observer or local transient
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PositionSpec {
    #[serde(default)]
    pub x: f64,
    #[serde(default)]
    pub y: f64,
    /// Aperture; relative to the referenced element's width when `ref` is set
    #[serde(default)]
    pub width: f64,
    #[serde(rename = "ref", default)]
    pub reference: Option<String>,
    #[serde(default)]
    pub point: PointName,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceRecord {
    pub source: SourceSpec,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceSpec {
    #[serde(default)]
    pub comment: Option<String>,
    pub position: PositionSpec,
    pub property: SourceProperty,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceProperty {
    /// Field component, e.g. `Ez`
    pub component: String,
    #[serde(rename = "type")]
    pub kind: SourceKind,
    pub center: f64,
    pub width: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    Pulse,
    Continuous,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CollectorsSection {
    #[serde(default)]
    pub spectral: Vec<FluxRecord>,
    #[serde(default)]
    pub temporal: Vec<TransientRecord>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FluxRecord {
    pub flux: FluxSpec,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FluxSpec {
    #[serde(default)]
    pub comment: Option<String>,
    pub position: PositionSpec,
    pub property: FluxProperty,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FluxProperty {
    pub center: f64,
    pub width: f64,
    /// Number of frequency points
    pub resolution: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransientRecord {
    pub transient: TransientSpec,
}

/// Field snapshot request; local when a position is given
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransientSpec {
    #[serde(default)]
    pub comment: Option<String>,
    pub component: String,
    #[serde(default = "default_field")]
    pub field: String,
    /// Sampling interval
    #[serde(default)]
    pub resolution: Option<f64>,
    #[serde(default)]
    pub position: Option<PositionSpec>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ControlsSection {
    pub resolution: f64,
    pub time: TimeSection,
    #[serde(default)]
    pub complex: bool,
    /// Legacy single global snapshot
    #[serde(default)]
    pub snapshot: Option<SnapshotSpec>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapshotSpec {
    pub component: String,
    #[serde(default = "default_field")]
    pub field: String,
    #[serde(default)]
    pub resolution: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimeSection {
    #[serde(rename = "type")]
    pub kind: TimeKind,
    #[serde(default)]
    pub duration: f64,
    #[serde(default)]
    pub structure_only: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeKind {
    Decay,
    Fixed,
}

fn default_field() -> String {
    "e".to_string()
}

impl Description {
    pub fn from_yaml_str(s: &str) -> GenResult<Self> {
        Ok(serde_yaml::from_str(s)?)
    }

    pub fn from_json_str(s: &str) -> GenResult<Self> {
        Ok(serde_json::from_str(s)?)
    }

    /// Load a description, choosing the format by file extension
    pub fn load(path: impl AsRef<Path>) -> GenResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        match path.extension().and_then(|e| e.to_str()) {
            Some("json") => Self::from_json_str(&text),
            _ => Self::from_yaml_str(&text),
        }
    }

    /// Refuse descriptions written for another major version
    pub fn check_version(&self) -> GenResult<()> {
        check_version(&self.version, FORMAT_VERSION)
    }
}

fn parse_version(v: &str) -> GenResult<Vec<u32>> {
    let trimmed = v.trim();
    if trimmed.is_empty() {
        return Err(GenError::MalformedVersion(v.to_string()));
    }
    trimmed
        .split('.')
        .map(|part| {
            part.parse::<u32>()
                .map_err(|_| GenError::MalformedVersion(v.to_string()))
        })
        .collect()
}

/// Accepts an exact match or a shared major component
pub fn check_version(found: &str, supported: &str) -> GenResult<()> {
    let found_parts = parse_version(found)?;
    let supported_parts = parse_version(supported)?;
    if found.trim() == supported || found_parts[0] == supported_parts[0] {
        Ok(())
    } else {
        Err(GenError::UnsupportedVersion {
            found: found.to_string(),
            supported: supported.to_string(),
        })
    }
}
