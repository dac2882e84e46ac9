//! Parameter profiles and the identity -> profile table.
//!
//! Per-image tuning is data, not control flow: a [`ProfileTable`] holds a
//! default [`ParameterProfile`], partial overrides keyed by image identity,
//! and a separate identity -> final-variant selection. Tables are loaded
//! from YAML; [`ProfileTable::default`] carries the stock tuning.

use std::collections::HashMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{EnhanceError, Result};
use crate::filters::TileGrid;
use crate::pipeline::Variant;

/// Concrete engine parameters for one image.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParameterProfile {
    pub gamma: f32,
    pub clahe_clip: f32,
    pub unsharp_sigma: f32,
    pub unsharp_strength: f32,
    pub use_log: bool,
}

impl Default for ParameterProfile {
    fn default() -> Self {
        Self {
            gamma: 0.5,
            clahe_clip: 3.0,
            unsharp_sigma: 2.0,
            unsharp_strength: 1.5,
            use_log: false,
        }
    }
}

impl ParameterProfile {
    /// Reject values the engines would refuse.
    pub fn validate(&self) -> Result<()> {
        let positive = [
            ("gamma", self.gamma),
            ("clahe_clip", self.clahe_clip),
            ("unsharp_sigma", self.unsharp_sigma),
        ];
        for (name, value) in positive {
            if !(value > 0.0 && value.is_finite()) {
                return Err(EnhanceError::invalid(name, value, "must be a finite value > 0"));
            }
        }
        if !(self.unsharp_strength >= 0.0 && self.unsharp_strength.is_finite()) {
            return Err(EnhanceError::invalid(
                "unsharp_strength",
                self.unsharp_strength,
                "must be a finite value >= 0",
            ));
        }
        Ok(())
    }
}

/// Partial profile; unset fields inherit from the table defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProfileOverride {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gamma: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub clahe_clip: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unsharp_sigma: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unsharp_strength: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub use_log: Option<bool>,
}

impl ProfileOverride {
    pub fn apply(&self, base: ParameterProfile) -> ParameterProfile {
        ParameterProfile {
            gamma: self.gamma.unwrap_or(base.gamma),
            clahe_clip: self.clahe_clip.unwrap_or(base.clahe_clip),
            unsharp_sigma: self.unsharp_sigma.unwrap_or(base.unsharp_sigma),
            unsharp_strength: self.unsharp_strength.unwrap_or(base.unsharp_strength),
            use_log: self.use_log.unwrap_or(base.use_log),
        }
    }
}

/// Which variant is emitted as the final comparison for each identity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinalSelection {
    #[serde(default = "default_final_variant")]
    pub default: Variant,
    #[serde(default)]
    pub overrides: HashMap<String, Variant>,
}

fn default_final_variant() -> Variant {
    Variant::Intensity
}

impl Default for FinalSelection {
    fn default() -> Self {
        Self {
            default: default_final_variant(),
            overrides: HashMap::new(),
        }
    }
}

/// Identity-keyed parameter configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfileTable {
    #[serde(default)]
    pub defaults: ParameterProfile,

    #[serde(default)]
    pub overrides: HashMap<String, ProfileOverride>,

    #[serde(default)]
    pub final_variant: FinalSelection,

    #[serde(default)]
    pub tile_grid: TileGrid,
}

impl Default for ProfileTable {
    /// Stock tuning: log transform and strong local contrast for the
    /// darkest images (1, 3), a stronger gamma for 4, and CLAHE as the
    /// final comparison for 2.
    fn default() -> Self {
        let strong_log = ProfileOverride {
            use_log: Some(true),
            clahe_clip: Some(8.0),
            unsharp_strength: Some(3.0),
            ..Default::default()
        };
        let strong_gamma = ProfileOverride {
            gamma: Some(0.3),
            clahe_clip: Some(5.0),
            unsharp_strength: Some(2.0),
            ..Default::default()
        };

        let overrides = HashMap::from([
            ("1".to_string(), strong_log.clone()),
            ("3".to_string(), strong_log),
            ("4".to_string(), strong_gamma),
        ]);

        Self {
            defaults: ParameterProfile::default(),
            overrides,
            final_variant: FinalSelection {
                default: Variant::Intensity,
                overrides: HashMap::from([("2".to_string(), Variant::Clahe)]),
            },
            tile_grid: TileGrid::default(),
        }
    }
}

impl ProfileTable {
    /// Parse and validate a YAML table.
    pub fn from_yaml_str(content: &str) -> Result<Self> {
        let table: Self = serde_yaml::from_str(content)?;
        table.validate()?;
        Ok(table)
    }

    /// Read, parse and validate a YAML table from disk.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|source| EnhanceError::ConfigRead {
            path: path.to_path_buf(),
            source,
        })?;
        let table = Self::from_yaml_str(&content)?;
        tracing::info!(
            path = %path.display(),
            overrides = table.overrides.len(),
            "Loaded profile table"
        );
        Ok(table)
    }

    /// Check that every resolvable profile is usable by the engines.
    pub fn validate(&self) -> Result<()> {
        self.defaults
            .validate()
            .map_err(|e| EnhanceError::Config(format!("defaults: {e}")))?;
        for (identity, partial) in &self.overrides {
            partial
                .apply(self.defaults)
                .validate()
                .map_err(|e| EnhanceError::Config(format!("override for {identity}: {e}")))?;
        }
        self.tile_grid
            .validate()
            .map_err(|e| EnhanceError::Config(e.to_string()))
    }

    /// Profile for an identity: its override applied on the defaults, or
    /// the defaults when the identity has none.
    pub fn resolve_profile(&self, identity: &str) -> ParameterProfile {
        match self.overrides.get(identity) {
            Some(partial) => partial.apply(self.defaults),
            None => self.defaults,
        }
    }

    /// Variant used for the final comparison of an identity.
    pub fn final_variant(&self, identity: &str) -> Variant {
        self.final_variant
            .overrides
            .get(identity)
            .copied()
            .unwrap_or(self.final_variant.default)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_3_uses_log_profile() {
        let table = ProfileTable::default();
        let profile = table.resolve_profile("3");
        assert!(profile.use_log);
        assert_eq!(profile.clahe_clip, 8.0);
        assert_eq!(profile.unsharp_strength, 3.0);
        assert_eq!(profile.gamma, 0.5);
        assert_eq!(profile.unsharp_sigma, 2.0);
    }

    #[test]
    fn test_identity_4_profile() {
        let profile = ProfileTable::default().resolve_profile("4");
        assert_eq!(profile.gamma, 0.3);
        assert_eq!(profile.clahe_clip, 5.0);
        assert_eq!(profile.unsharp_strength, 2.0);
        assert!(!profile.use_log);
    }

    #[test]
    fn test_unknown_identity_gets_defaults() {
        let table = ProfileTable::default();
        assert_eq!(table.resolve_profile("9"), ParameterProfile::default());
        assert_eq!(table.resolve_profile("2"), ParameterProfile::default());
    }

    #[test]
    fn test_final_variant_selection() {
        let table = ProfileTable::default();
        assert_eq!(table.final_variant("2"), Variant::Clahe);
        assert_eq!(table.final_variant("1"), Variant::Intensity);
        assert_eq!(table.final_variant("anything"), Variant::Intensity);
    }

    #[test]
    fn test_yaml_partial_overrides() {
        let yaml = r#"
defaults:
  gamma: 0.6
overrides:
  "a":
    use_log: true
final_variant:
  default: sharpen
  overrides:
    "b": he
tile_grid:
  cols: 4
  rows: 2
"#;
        let table = ProfileTable::from_yaml_str(yaml).unwrap();
        assert_eq!(table.defaults.gamma, 0.6);
        assert_eq!(table.defaults.clahe_clip, 3.0);

        let a = table.resolve_profile("a");
        assert!(a.use_log);
        assert_eq!(a.gamma, 0.6);
        assert_eq!(table.resolve_profile("1"), table.defaults);

        assert_eq!(table.final_variant("b"), Variant::GlobalEqualization);
        assert_eq!(table.final_variant("c"), Variant::Sharpen);
        assert_eq!(table.tile_grid, TileGrid::new(4, 2));
    }

    #[test]
    fn test_yaml_empty_document_uses_plain_defaults() {
        let table = ProfileTable::from_yaml_str("{}").unwrap();
        assert!(table.overrides.is_empty());
        assert_eq!(table.final_variant("2"), Variant::Intensity);
        assert_eq!(table.tile_grid, TileGrid::default());
    }

    #[test]
    fn test_yaml_rejects_invalid_values() {
        let yaml = "overrides:\n  \"x\":\n    gamma: -1.0\n";
        let err = ProfileTable::from_yaml_str(yaml).unwrap_err();
        assert!(matches!(err, EnhanceError::Config(_)));
        assert!(err.to_string().contains("override for x"));

        let yaml = "tile_grid:\n  cols: 0\n  rows: 8\n";
        assert!(ProfileTable::from_yaml_str(yaml).is_err());
    }

    #[test]
    fn test_yaml_rejects_unknown_override_field() {
        let yaml = "overrides:\n  \"x\":\n    gama: 0.4\n";
        assert!(matches!(
            ProfileTable::from_yaml_str(yaml),
            Err(EnhanceError::ConfigParse(_))
        ));
    }

    #[test]
    fn test_default_table_is_valid() {
        ProfileTable::default().validate().unwrap();
    }
}
