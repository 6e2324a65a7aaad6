//! Property transform layer.
//!
//! Octane numbers and vapor pressure do not blend linearly by volume. The
//! standard refinery workaround maps them into blending indices (ROI, MOI,
//! RVI) that do, runs the LP on the indices, and maps volume-weighted
//! averages back for display. The forward octane transforms are piecewise
//! (linear below 85, exponential at and above) with a small jump at the
//! seam; the inverses switch branches at an index of 96.5, so values inside
//! the seam gap invert through the linear branch.

use std::collections::HashMap;

use crate::blend::{PropertyBounds, Symbol};

/// Research octane number to its blending index.
pub fn roi_from_ron(ron: f64) -> f64 {
    if ron < 85.0 {
        ron + 11.5
    } else {
        (0.0135 * ron + 3.42).exp()
    }
}

/// Motor octane number to its blending index. Same shape as ROI.
pub fn moi_from_mon(mon: f64) -> f64 {
    if mon < 85.0 {
        mon + 11.5
    } else {
        (0.0135 * mon + 3.42).exp()
    }
}

/// Reid vapor pressure to its blending index.
pub fn rvi_from_rvp(rvp: f64) -> f64 {
    (rvp * 14.5).powf(1.25)
}

/// Blending index back to research octane number.
pub fn ron_from_roi(roi: f64) -> f64 {
    if roi > 96.5 {
        (roi.ln() - 3.42) / 0.0135
    } else {
        roi - 11.5
    }
}

/// Blending index back to motor octane number.
pub fn mon_from_moi(moi: f64) -> f64 {
    if moi > 96.5 {
        (moi.ln() - 3.42) / 0.0135
    } else {
        moi - 11.5
    }
}

/// Blending index back to Reid vapor pressure.
pub fn rvp_from_rvi(rvi: f64) -> f64 {
    rvi.powf(1.0 / 1.25) / 14.5
}

/// Map a display property name to the name used in the constraint matrix.
/// Identity for properties that blend linearly as-is.
pub fn internal_name(property: &str) -> &str {
    match property {
        "RON" => "ROI",
        "MON" => "MOI",
        "RVP" => "RVI",
        other => other,
    }
}

/// Inverse of [`internal_name`].
pub fn display_name(property: &str) -> &str {
    match property {
        "ROI" => "RON",
        "MOI" => "MON",
        "RVI" => "RVP",
        other => other,
    }
}

/// Forward transform for a display-unit value, identity for linear
/// properties.
pub fn to_internal(property: &str, value: f64) -> f64 {
    match property {
        "RON" => roi_from_ron(value),
        "MON" => moi_from_mon(value),
        "RVP" => rvi_from_rvp(value),
        _ => value,
    }
}

/// Inverse transform for an internal-unit value, identity for linear
/// properties. `property` is the internal name.
pub fn to_display(property: &str, value: f64) -> f64 {
    match property {
        "ROI" => ron_from_roi(value),
        "MOI" => mon_from_moi(value),
        "RVI" => rvp_from_rvi(value),
        _ => value,
    }
}

/// Append internal blending indices to a component property map. The
/// display-unit originals are retained; properties without a transform are
/// untouched.
pub fn convert_component_properties(properties: &HashMap<Symbol, f64>) -> HashMap<Symbol, f64> {
    let mut converted = properties.clone();
    if let Some(&ron) = properties.get(&Symbol::from("RON")) {
        converted.insert(Symbol::from("ROI"), roi_from_ron(ron));
    }
    if let Some(&mon) = properties.get(&Symbol::from("MON")) {
        converted.insert(Symbol::from("MOI"), moi_from_mon(mon));
    }
    if let Some(&rvp) = properties.get(&Symbol::from("RVP")) {
        converted.insert(Symbol::from("RVI"), rvi_from_rvp(rvp));
    }
    converted
}

/// Convert a display-unit spec window to internal units.
///
/// Sentinel bounds pass through untouched: a min of exactly `0.0` means "no
/// lower bound" and an infinite max means "no upper bound"; transforming
/// either would manufacture a constraint the user never asked for.
pub fn convert_bounds(property: &str, bounds: &PropertyBounds) -> PropertyBounds {
    let min = if bounds.min != 0.0 && bounds.min.is_finite() {
        to_internal(property, bounds.min)
    } else {
        bounds.min
    };
    let max = if bounds.max.is_finite() {
        to_internal(property, bounds.max)
    } else {
        bounds.max
    };
    PropertyBounds { min, max }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_branch_selection_at_the_seam() {
        // Linear branch right below 85, exponential at 85
        assert!((roi_from_ron(84.999) - 96.499).abs() < 1e-9);
        assert!((roi_from_ron(85.0) - (0.0135f64 * 85.0 + 3.42).exp()).abs() < 1e-9);
        assert_eq!(roi_from_ron(85.0), moi_from_mon(85.0));
    }

    #[test]
    fn test_octane_round_trip_both_branches() {
        // Values between 85 and ~85.16 land in the seam gap and do not
        // round-trip; everything else does
        for ron in [0.5, 10.0, 50.0, 84.9, 86.0, 91.0, 98.0, 128.0, 150.0, 200.0] {
            let there_and_back = ron_from_roi(roi_from_ron(ron));
            assert!(
                (there_and_back - ron).abs() < 1e-6,
                "RON {} round-tripped to {}",
                ron,
                there_and_back
            );
        }
    }

    #[test]
    fn test_rvp_round_trip() {
        for rvp in [0.01, 0.139, 0.7, 1.329, 4.347, 20.0] {
            let there_and_back = rvp_from_rvi(rvi_from_rvp(rvp));
            assert!((there_and_back - rvp).abs() < 1e-6);
        }
    }

    #[test]
    fn test_transforms_are_increasing() {
        let mut prev = roi_from_ron(0.0);
        for i in 1..=400 {
            let next = roi_from_ron(i as f64 * 0.5);
            assert!(next > prev);
            prev = next;
        }
    }

    #[test]
    fn test_name_mapping_is_a_bijection() {
        for prop in ["SPG", "SUL", "RON", "MON", "RVP", "E70", "ARO", "OXY"] {
            assert_eq!(display_name(internal_name(prop)), prop);
        }
    }

    #[test]
    fn test_convert_bounds_transforms_active_bounds() {
        let bounds = PropertyBounds {
            min: 91.0,
            max: 98.0,
        };
        let converted = convert_bounds("RON", &bounds);
        assert!((converted.min - roi_from_ron(91.0)).abs() < 1e-9);
        assert!((converted.max - roi_from_ron(98.0)).abs() < 1e-9);
    }

    #[test]
    fn test_convert_bounds_sentinel_bypass() {
        let free = PropertyBounds {
            min: 0.0,
            max: f64::INFINITY,
        };
        let converted = convert_bounds("RON", &free);
        assert_eq!(converted.min, 0.0);
        assert!(converted.max.is_infinite());

        // One sentinel, one active bound: only the active one moves
        let floor_only = PropertyBounds {
            min: 95.0,
            max: f64::INFINITY,
        };
        let converted = convert_bounds("RON", &floor_only);
        assert!((converted.min - roi_from_ron(95.0)).abs() < 1e-9);
        assert!(converted.max.is_infinite());
    }

    #[test]
    fn test_component_conversion_is_additive() {
        let mut props = HashMap::new();
        props.insert(Symbol::from("RON"), 93.8);
        props.insert(Symbol::from("RVP"), 3.191);
        props.insert(Symbol::from("SPG"), 0.5844);

        let converted = convert_component_properties(&props);
        assert_eq!(converted.len(), 5);
        assert!((converted[&Symbol::from("RON")] - 93.8).abs() < 1e-12);
        assert!((converted[&Symbol::from("ROI")] - roi_from_ron(93.8)).abs() < 1e-12);
        assert!((converted[&Symbol::from("RVI")] - rvi_from_rvp(3.191)).abs() < 1e-12);
        assert!(!converted.contains_key(&Symbol::from("MOI")));
    }
}
