//! Domain data model: grades, components, spec windows, and blend cases.
//!
//! All values cross this boundary in display units (RON, MON, RVP). The
//! internal blending indices used by the constraint matrix are produced by
//! [`SpecBounds::from_case`] and [`transform::convert_component_properties`]
//! and never appear in a serialized case.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::AppError;

pub mod defaults;
pub mod transform;

/// Interned name type for grades, components, and properties.
pub type Symbol = string_cache::DefaultAtom;

/// Display-unit property columns reported for a blend, in fixed order.
pub const DISPLAY_PROPERTIES: [&str; 12] = [
    "SPG", "SUL", "RON", "MON", "RVP", "E70", "E10", "E15", "ARO", "BEN", "OXY", "OLEFIN",
];

fn default_property_list() -> Vec<Symbol> {
    DISPLAY_PROPERTIES.iter().map(|p| Symbol::from(*p)).collect()
}

/// A product grade with its volume window and selling price.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Grade {
    pub name: Symbol,
    pub min_volume: f64,
    pub max_volume: f64,
    pub price: f64,
}

/// A blendstock with its supply limits and display-unit property vector.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Component {
    pub name: Symbol,
    /// Human-readable description carried alongside the short name.
    #[serde(default)]
    pub tag: String,
    /// Cost multiplier relative to the base grade's selling price.
    pub factor: f64,
    pub availability: f64,
    /// Minimum total usage across all grades; `0.0` means no floor.
    #[serde(default)]
    pub min_usage: f64,
    pub properties: HashMap<Symbol, f64>,
}

fn unbounded() -> f64 {
    f64::INFINITY
}

fn is_unbounded(value: &f64) -> bool {
    value.is_infinite()
}

fn is_zero(value: &f64) -> bool {
    *value == 0.0
}

/// A spec window for one property. Sentinels: `min == 0.0` means no lower
/// bound, `max == +inf` means no upper bound; either is omitted from the
/// serialized form.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PropertyBounds {
    #[serde(default, skip_serializing_if = "is_zero")]
    pub min: f64,
    #[serde(default = "unbounded", skip_serializing_if = "is_unbounded")]
    pub max: f64,
}

impl PropertyBounds {
    /// The all-sentinel window: no constraint on either side.
    pub const FREE: PropertyBounds = PropertyBounds {
        min: 0.0,
        max: f64::INFINITY,
    };

    pub fn min_is_active(&self) -> bool {
        self.min > 0.0 && self.min.is_finite()
    }

    pub fn max_is_active(&self) -> bool {
        self.max.is_finite()
    }
}

impl Default for PropertyBounds {
    fn default() -> Self {
        Self::FREE
    }
}

/// One complete optimization input, immutable for the duration of a run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlendCase {
    pub grades: Vec<Grade>,
    pub components: Vec<Component>,
    /// Display-unit property columns, in reporting order.
    #[serde(default = "default_property_list")]
    pub properties: Vec<Symbol>,
    /// Display-unit spec windows: property name -> grade name -> window.
    #[serde(default)]
    pub specs: HashMap<Symbol, HashMap<Symbol, PropertyBounds>>,
}

impl BlendCase {
    /// Read and validate a case from a JSON file.
    pub fn load(path: &Path) -> Result<BlendCase> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("failed to read case file {}", path.display()))?;
        let case: BlendCase = serde_json::from_str(&text)
            .with_context(|| format!("failed to parse case file {}", path.display()))?;
        case.validate()?;
        Ok(case)
    }

    /// Write the case as pretty-printed JSON.
    pub fn save(&self, path: &Path) -> Result<()> {
        let text = serde_json::to_string_pretty(self).context("failed to serialize case")?;
        fs::write(path, text)
            .with_context(|| format!("failed to write case file {}", path.display()))?;
        Ok(())
    }

    /// Reject inputs that would make model construction meaningless.
    /// Infeasible-but-well-formed cases pass; infeasibility is a solve
    /// outcome, not an input error.
    pub fn validate(&self) -> Result<(), AppError> {
        if self.components.is_empty() {
            return Err(AppError::NoComponents);
        }
        if self.grades.is_empty() {
            return Err(AppError::NoGrades);
        }

        for grade in &self.grades {
            if !grade.min_volume.is_finite()
                || grade.max_volume.is_nan()
                || !grade.price.is_finite()
            {
                return Err(AppError::NonFiniteNumber(format!("grade {}", grade.name)));
            }
            if grade.min_volume > grade.max_volume {
                return Err(AppError::InvalidVolumeWindow(grade.name.to_string()));
            }
        }

        for component in &self.components {
            if !component.factor.is_finite()
                || component.availability.is_nan()
                || !component.min_usage.is_finite()
            {
                return Err(AppError::NonFiniteNumber(format!(
                    "component {}",
                    component.name
                )));
            }
            for (property, value) in &component.properties {
                if !value.is_finite() {
                    return Err(AppError::NonFiniteNumber(format!(
                        "component {} property {}",
                        component.name, property
                    )));
                }
            }
        }

        for (property, grades) in &self.specs {
            for (grade, bounds) in grades {
                if bounds.min.is_nan() || bounds.max.is_nan() || bounds.min.is_infinite() {
                    return Err(AppError::NonFiniteNumber(format!(
                        "spec {} for grade {}",
                        property, grade
                    )));
                }
            }
        }

        Ok(())
    }

    /// Selling price of the base grade, the reference for component costs.
    pub fn base_price(&self) -> f64 {
        self.grades[0].price
    }

    /// Per-barrel cost of a component, derived from its cost factor.
    pub fn component_cost(&self, component: &Component) -> f64 {
        component.factor * self.base_price()
    }

    /// The property columns mapped to the internal names used by the
    /// constraint matrix, preserving order.
    pub fn internal_properties(&self) -> Vec<Symbol> {
        self.properties
            .iter()
            .map(|p| Symbol::from(transform::internal_name(p.as_ref())))
            .collect()
    }

    /// The display-unit spec window for one (property, grade), `FREE` when
    /// absent.
    pub fn display_bounds(&self, property: &Symbol, grade: &Symbol) -> PropertyBounds {
        self.specs
            .get(property)
            .and_then(|grades| grades.get(grade))
            .copied()
            .unwrap_or(PropertyBounds::FREE)
    }
}

/// Which side of a spec window a bound lives on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BoundSide {
    Min,
    Max,
}

impl std::fmt::Display for BoundSide {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BoundSide::Min => write!(f, "min"),
            BoundSide::Max => write!(f, "max"),
        }
    }
}

/// Identifies one bound of one property's spec window. The property name is
/// the display-unit name.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BoundKey {
    pub property: Symbol,
    pub side: BoundSide,
}

/// Flattened `(property, grade) -> window` lookup in internal units,
/// produced once per run from a case's display-unit specs.
#[derive(Debug, Clone, PartialEq)]
pub struct SpecBounds {
    bounds: HashMap<(Symbol, Symbol), PropertyBounds>,
}

impl SpecBounds {
    /// Convert a case's display-unit specs into internal units. Properties
    /// with a nonlinear transform are re-keyed to their index name; linear
    /// properties keep theirs.
    pub fn from_case(case: &BlendCase) -> SpecBounds {
        let mut bounds = HashMap::new();
        for (property, grades) in &case.specs {
            let internal = Symbol::from(transform::internal_name(property.as_ref()));
            for (grade, window) in grades {
                bounds.insert(
                    (internal.clone(), grade.clone()),
                    transform::convert_bounds(property.as_ref(), window),
                );
            }
        }
        SpecBounds { bounds }
    }

    /// The internal-unit window for one (internal property, grade), `FREE`
    /// when absent.
    pub fn get(&self, property: &Symbol, grade: &Symbol) -> PropertyBounds {
        self.bounds
            .get(&(property.clone(), grade.clone()))
            .copied()
            .unwrap_or(PropertyBounds::FREE)
    }

    /// A copy with one bound of one grade's window reset to its sentinel,
    /// removing it from the constraint matrix.
    pub fn without_bound(&self, grade: &Symbol, key: &BoundKey) -> SpecBounds {
        let internal = Symbol::from(transform::internal_name(key.property.as_ref()));
        let mut bounds = self.bounds.clone();
        let entry = bounds
            .entry((internal, grade.clone()))
            .or_insert(PropertyBounds::FREE);
        match key.side {
            BoundSide::Min => entry.min = 0.0,
            BoundSide::Max => entry.max = f64::INFINITY,
        }
        SpecBounds { bounds }
    }

    /// Active (non-sentinel) bounds for one grade, in the case's fixed
    /// property order, keyed by display name and valued in display units.
    pub fn active_bounds(&self, case: &BlendCase, grade: &Symbol) -> Vec<(BoundKey, f64)> {
        let mut active = Vec::new();
        for internal in case.internal_properties() {
            let display = Symbol::from(transform::display_name(internal.as_ref()));
            let window = self.get(&internal, grade);
            if window.min_is_active() {
                active.push((
                    BoundKey {
                        property: display.clone(),
                        side: BoundSide::Min,
                    },
                    transform::to_display(internal.as_ref(), window.min),
                ));
            }
            if window.max_is_active() {
                active.push((
                    BoundKey {
                        property: display,
                        side: BoundSide::Max,
                    },
                    transform::to_display(internal.as_ref(), window.max),
                ));
            }
        }
        active
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tiny_case() -> BlendCase {
        let mut properties = HashMap::new();
        properties.insert(Symbol::from("SUL"), 5.0);
        properties.insert(Symbol::from("RON"), 92.0);
        let mut specs: HashMap<Symbol, HashMap<Symbol, PropertyBounds>> = HashMap::new();
        specs
            .entry(Symbol::from("SUL"))
            .or_default()
            .insert(Symbol::from("G"), PropertyBounds { min: 0.0, max: 10.0 });
        specs
            .entry(Symbol::from("RON"))
            .or_default()
            .insert(
                Symbol::from("G"),
                PropertyBounds {
                    min: 91.0,
                    max: f64::INFINITY,
                },
            );
        BlendCase {
            grades: vec![Grade {
                name: Symbol::from("G"),
                min_volume: 10.0,
                max_volume: 100.0,
                price: 100.0,
            }],
            components: vec![Component {
                name: Symbol::from("X"),
                tag: String::new(),
                factor: 0.9,
                availability: 1000.0,
                min_usage: 0.0,
                properties,
            }],
            properties: vec![Symbol::from("SUL"), Symbol::from("RON")],
            specs,
        }
    }

    #[test]
    fn test_validate_accepts_well_formed_case() {
        assert!(tiny_case().validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_empty_components() {
        let mut case = tiny_case();
        case.components.clear();
        assert!(matches!(case.validate(), Err(AppError::NoComponents)));
    }

    #[test]
    fn test_validate_rejects_inverted_volume_window() {
        let mut case = tiny_case();
        case.grades[0].min_volume = 200.0;
        assert!(matches!(
            case.validate(),
            Err(AppError::InvalidVolumeWindow(_))
        ));
    }

    #[test]
    fn test_validate_rejects_nan_property() {
        let mut case = tiny_case();
        case.components[0]
            .properties
            .insert(Symbol::from("SPG"), f64::NAN);
        assert!(matches!(case.validate(), Err(AppError::NonFiniteNumber(_))));
    }

    #[test]
    fn test_component_cost_tracks_base_price() {
        let case = tiny_case();
        assert!((case.component_cost(&case.components[0]) - 90.0).abs() < 1e-9);
    }

    #[test]
    fn test_spec_bounds_rekeys_transformed_properties() {
        let case = tiny_case();
        let specs = SpecBounds::from_case(&case);
        let grade = Symbol::from("G");

        let roi = specs.get(&Symbol::from("ROI"), &grade);
        assert!((roi.min - transform::roi_from_ron(91.0)).abs() < 1e-9);
        assert!(!roi.max.is_finite());

        // The display name no longer appears in the internal lookup
        let ron = specs.get(&Symbol::from("RON"), &grade);
        assert_eq!(ron, PropertyBounds::FREE);
    }

    #[test]
    fn test_active_bounds_skip_sentinels() {
        let case = tiny_case();
        let specs = SpecBounds::from_case(&case);
        let active = specs.active_bounds(&case, &Symbol::from("G"));

        // SUL max and RON min only; the sentinel sides never show up
        assert_eq!(active.len(), 2);
        assert_eq!(active[0].0.property, Symbol::from("SUL"));
        assert_eq!(active[0].0.side, BoundSide::Max);
        assert_eq!(active[1].0.property, Symbol::from("RON"));
        assert_eq!(active[1].0.side, BoundSide::Min);
        assert!((active[1].1 - 91.0).abs() < 1e-6);
    }

    #[test]
    fn test_without_bound_resets_to_sentinel() {
        let case = tiny_case();
        let specs = SpecBounds::from_case(&case);
        let grade = Symbol::from("G");
        let relaxed = specs.without_bound(
            &grade,
            &BoundKey {
                property: Symbol::from("RON"),
                side: BoundSide::Min,
            },
        );
        assert_eq!(relaxed.get(&Symbol::from("ROI"), &grade), PropertyBounds::FREE);
        // Untouched windows are preserved
        assert_eq!(
            relaxed.get(&Symbol::from("SUL"), &grade),
            specs.get(&Symbol::from("SUL"), &grade)
        );
    }

    #[test]
    fn test_case_json_round_trip() {
        let case = tiny_case();
        let json = serde_json::to_string(&case).unwrap();
        let back: BlendCase = serde_json::from_str(&json).unwrap();
        assert_eq!(back.grades[0].name, case.grades[0].name);
        assert_eq!(
            back.display_bounds(&Symbol::from("RON"), &Symbol::from("G")),
            case.display_bounds(&Symbol::from("RON"), &Symbol::from("G"))
        );
        // Unbounded max survives the omitted-field encoding
        assert!(
            back.display_bounds(&Symbol::from("RON"), &Symbol::from("G"))
                .max
                .is_infinite()
        );
    }
}
