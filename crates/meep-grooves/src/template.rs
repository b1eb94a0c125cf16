//! Named text templates for the control-file emitter
//!
//! Templates come from a YAML resource with a `Header` and a `Code`
//! section. Each template is rendered with `minijinja`; its positional
//! values are bound to `args`, so `{{ args[0] }}` is the first slot.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use minijinja::{context, Environment, UndefinedBehavior, Value};
use serde::Deserialize;

use crate::error::{GenError, GenResult};

/// Resource shipped with the crate
pub const DEFAULT_RESOURCE: &str = include_str!("../resources/gen.rc");

/// Every template the emitter uses, with the number of values it takes
const SLOTS: &[(&str, usize)] = &[
    ("intro", 0),
    ("generated", 1),
    ("base", 1),
    ("comment", 1),
    ("geometry", 2),
    ("geometry_3d", 3),
    ("geometry_head", 0),
    ("geometry_tail", 0),
    ("block_head", 0),
    ("block_position", 4),
    ("block_position_3d", 5),
    ("block_metal", 2),
    ("block_dielectric", 1),
    ("block_tail", 0),
    ("sources_head", 0),
    ("sources_tail", 0),
    ("source_head", 0),
    ("source_component", 1),
    ("source_position", 4),
    ("source_pulse", 2),
    ("source_continuous", 2),
    ("source_tail", 0),
    ("pml", 0),
    ("resolution", 1),
    ("complex", 0),
    ("flux_head", 1),
    ("flux_prop", 3),
    ("flux_position", 4),
    ("flux_tail", 0),
    ("flux_ref", 1),
    ("fluxes_head", 0),
    ("fluxes_tail", 0),
    ("function_head", 1),
    ("function_tail", 0),
    ("function_ref", 1),
    ("snapshot_global", 4),
    ("snapshot_local", 6),
    ("time_decay", 4),
    ("time_fixed", 2),
];

#[derive(Debug, Deserialize)]
struct ResourceFile {
    #[serde(rename = "Header", default)]
    header: HashMap<String, String>,
    #[serde(rename = "Code", default)]
    code: HashMap<String, String>,
}

/// Checked set of templates
pub struct Templates {
    sources: HashMap<String, String>,
    env: Environment<'static>,
}

impl std::fmt::Debug for Templates {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Templates")
            .field("templates", &self.sources.len())
            .finish()
    }
}

impl Templates {
    /// Parse a resource and make sure every template the emitter needs is there
    pub fn from_yaml_str(text: &str) -> GenResult<Self> {
        let file: ResourceFile = serde_yaml::from_str(text)
            .map_err(|e| GenError::Resource(format!("cannot parse resource: {}", e)))?;

        let mut sources = file.header;
        for (name, body) in file.code {
            if sources.insert(name.clone(), body).is_some() {
                return Err(GenError::Resource(format!(
                    "template '{}' is defined in both sections",
                    name
                )));
            }
        }

        let missing: Vec<&str> = SLOTS
            .iter()
            .map(|(name, _)| *name)
            .filter(|name| !sources.contains_key(*name))
            .collect();
        if !missing.is_empty() {
            return Err(GenError::Resource(format!(
                "missing templates: {}",
                missing.join(", ")
            )));
        }

        let mut env = Environment::new();
        env.set_undefined_behavior(UndefinedBehavior::Strict);
        Ok(Self { sources, env })
    }

    pub fn load(path: &Path) -> GenResult<Self> {
        let text = fs::read_to_string(path).map_err(|e| {
            GenError::Resource(format!("cannot read {}: {}", path.display(), e))
        })?;
        Self::from_yaml_str(&text)
    }

    pub fn builtin() -> GenResult<Self> {
        Self::from_yaml_str(DEFAULT_RESOURCE)
    }

    /// Render `name` with exactly as many values as it declares
    pub fn render(&self, name: &str, args: &[Value]) -> GenResult<String> {
        let expected = SLOTS
            .iter()
            .find(|(n, _)| *n == name)
            .map(|(_, k)| *k)
            .ok_or_else(|| GenError::Resource(format!("unknown template '{}'", name)))?;
        if args.len() != expected {
            return Err(GenError::Resource(format!(
                "template '{}' takes {} values, {} given",
                name,
                expected,
                args.len()
            )));
        }
        let source = self
            .sources
            .get(name)
            .ok_or_else(|| GenError::Resource(format!("missing template '{}'", name)))?;
        self.env
            .render_str(source, context! { args => args })
            .map_err(|source| GenError::Template {
                name: name.to_string(),
                source,
            })
    }
}
