//! The documented default blending case: three gasoline grades, nine
//! refinery blendstocks, and the standard spec slate. Written out by the
//! `template` subcommand as a starting point for user cases.

use std::collections::HashMap;

use crate::blend::{BlendCase, Component, Grade, PropertyBounds, Symbol, DISPLAY_PROPERTIES};

fn component(name: &str, tag: &str, factor: f64, values: [f64; 12]) -> Component {
    let properties: HashMap<Symbol, f64> = DISPLAY_PROPERTIES
        .iter()
        .zip(values)
        .map(|(p, v)| (Symbol::from(*p), v))
        .collect();
    Component {
        name: Symbol::from(name),
        tag: tag.to_string(),
        factor,
        availability: 1_000_000.0,
        min_usage: 0.0,
        properties,
    }
}

fn window(min: f64, max: f64) -> PropertyBounds {
    PropertyBounds { min, max }
}

/// The default case. Property columns per component are in
/// [`DISPLAY_PROPERTIES`] order:
/// SPG, SUL, RON, MON, RVP, E70, E10, E15, ARO, BEN, OXY, OLEFIN.
pub fn default_case() -> BlendCase {
    let grades = vec![
        Grade {
            name: Symbol::from("Regular"),
            min_volume: 4000.0,
            max_volume: 400_000.0,
            price: 100.0,
        },
        Grade {
            name: Symbol::from("Premium"),
            min_volume: 0.0,
            max_volume: 400_000.0,
            price: 110.0,
        },
        Grade {
            name: Symbol::from("Super Premium"),
            min_volume: 0.0,
            max_volume: 4000.0,
            price: 200.0,
        },
    ];

    let components = vec![
        component(
            "C4B",
            "Alkyl Butane",
            1.3,
            [
                0.5844, 0.0001, 93.8, 89.6, 3.191, 100.0, 100.0, 100.0, 0.0, 0.0, 0.0, 0.0,
            ],
        ),
        component(
            "IS1",
            "Isomerate",
            1.25,
            [
                0.661, 0.5, 88.56, 86.15, 0.839, 92.0, 100.0, 100.0, 0.0, 0.0, 0.0, 0.0,
            ],
        ),
        component(
            "RFL",
            "Reformate",
            1.05,
            [
                0.819, 0.0, 97.0, 86.15, 0.139, 0.001, 4.0, 72.25, 61.8, 0.4384, 0.0, 0.7756,
            ],
        ),
        component(
            "F5X",
            "Mixed RFC",
            0.7,
            [
                0.6447, 10.0, 94.6, 89.65, 1.31, 100.0, 100.0, 100.0, 0.0, 1.16, 0.0, 57.7,
            ],
        ),
        component(
            "RCG",
            "FCC Gasoline",
            0.9,
            [
                0.7856, 20.0, 94.43, 82.44, 0.21, 8.8548, 36.4, 67.3, 50.4, 1.7183, 0.0, 19.67,
            ],
        ),
        component(
            "IC4",
            "DIB IC4",
            0.9,
            [
                0.5633, 10.0, 100.05, 97.54, 4.347, 100.0, 100.0, 100.0, 0.0, 0.0, 0.0, 0.0,
            ],
        ),
        component(
            "HBY",
            "SHIP C4",
            0.75,
            [
                0.5936, 10.0, 98.2, 89.0, 3.674, 100.0, 100.0, 100.0, 0.0, 0.0, 0.0, 60.8,
            ],
        ),
        component(
            "AKK",
            "Alkylate",
            0.7,
            [
                0.7032, 0.0001, 76.13, 92.0, 0.403, 10.0, 35.0, 100.0, 0.0, 0.0, 0.0, 0.0,
            ],
        ),
        component(
            "ETH",
            "Ethanol",
            0.75,
            [
                0.791, 1.0, 128.0, 100.0, 1.329, 50.0, 100.0, 100.0, 0.0, 0.0, 34.78, 0.0,
            ],
        ),
    ];

    let grade_names = ["Regular", "Premium", "Super Premium"];
    let mut specs: HashMap<Symbol, HashMap<Symbol, PropertyBounds>> = HashMap::new();

    // Windows shared by every grade
    let shared: [(&str, PropertyBounds); 10] = [
        ("SPG", window(0.72, 0.78)),
        ("SUL", window(0.0, 10.0)),
        ("RVP", window(0.0, 0.7)),
        ("E70", window(22.0, 48.0)),
        ("E10", window(44.0, 70.0)),
        ("E15", window(76.0, f64::INFINITY)),
        ("ARO", window(0.0, 35.0)),
        ("BEN", window(0.0, 1.0)),
        ("OXY", window(0.0, 2.7)),
        ("OLEFIN", window(0.0, 15.0)),
    ];
    for (property, bounds) in shared {
        let per_grade = specs.entry(Symbol::from(property)).or_default();
        for grade in grade_names {
            per_grade.insert(Symbol::from(grade), bounds);
        }
    }

    // Octane floors climb with the grade
    let ron_map = specs.entry(Symbol::from("RON")).or_default();
    for (grade, min) in grade_names.iter().zip([91.0, 95.0, 98.0]) {
        ron_map.insert(Symbol::from(*grade), window(min, f64::INFINITY));
    }
    let mon_map = specs.entry(Symbol::from("MON")).or_default();
    for (grade, min) in grade_names.iter().zip([82.0, 86.0, 89.0]) {
        mon_map.insert(Symbol::from(*grade), window(min, f64::INFINITY));
    }

    BlendCase {
        grades,
        components,
        properties: DISPLAY_PROPERTIES.iter().map(|p| Symbol::from(*p)).collect(),
        specs,
    }
}
