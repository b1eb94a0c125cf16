//! Block materials and their mapping onto control-file templates

use serde::{Deserialize, Serialize};

/// Medium filling one block of a waveguide layer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "medium", rename_all = "lowercase")]
pub enum Medium {
    /// Lossy conductor. Conductivity is in MEEP's normalized units.
    Metal {
        #[serde(default = "unit_epsilon")]
        epsilon: f64,
        conductivity: f64,
    },
    Dielectric {
        #[serde(default = "unit_epsilon")]
        epsilon: f64,
    },
}

fn unit_epsilon() -> f64 {
    1.0
}

impl Medium {
    /// Vacuum / air
    pub fn air() -> Self {
        Medium::Dielectric { epsilon: 1.0 }
    }

    pub fn is_metal(&self) -> bool {
        matches!(self, Medium::Metal { .. })
    }

    pub fn epsilon(&self) -> f64 {
        match self {
            Medium::Metal { epsilon, .. } | Medium::Dielectric { epsilon } => *epsilon,
        }
    }

    /// Name of the block material template and its slot values
    pub fn block_template(&self) -> (&'static str, Vec<f64>) {
        match self {
            Medium::Metal {
                epsilon,
                conductivity,
            } => ("block_metal", vec![*epsilon, *conductivity]),
            Medium::Dielectric { epsilon } => ("block_dielectric", vec![*epsilon]),
        }
    }
}

impl Default for Medium {
    fn default() -> Self {
        Self::air()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metal_template() {
        let metal = Medium::Metal {
            epsilon: 1.0,
            conductivity: 1e6,
        };
        assert!(metal.is_metal());
        assert_eq!(metal.block_template(), ("block_metal", vec![1.0, 1e6]));
    }

    #[test]
    fn test_dielectric_defaults_to_unit_epsilon() {
        let medium: Medium = serde_json::from_str(r#"{"medium": "dielectric"}"#).unwrap();
        assert_eq!(medium, Medium::air());
        assert_eq!(medium.epsilon(), 1.0);
        assert_eq!(medium.block_template().0, "block_dielectric");
    }
}
