//! Infeasibility diagnosis engine.
//!
//! Given a grade whose isolated model is infeasible, this module works out
//! which spec bounds are responsible and what the smallest corrective
//! relaxations look like. The protocol:
//!
//! 1. Confirm infeasibility on a fresh base model.
//! 2. Screen each active bound alone: rebuild with that one bound omitted;
//!    the bound is critical iff the probe solves.
//! 3. If no single bound is critical, fall back to unordered pairs and take
//!    the first pair (in fixed order) whose joint omission solves.
//! 4. For each critical bound, binary-search the minimal relaxation and
//!    re-solve at it to report volume, profit, and achieved properties.
//! 5. With more than one critical bound, walk a fixed grid of paired
//!    relaxations and keep the three cheapest workable combinations.
//!
//! Probes run on the bundled solver regardless of what the main solve used,
//! and are parallelized with deterministic, order-stable aggregation. All
//! relaxation deltas are in display units.

use anyhow::Result;
use itertools::Itertools;
use ordered_float::OrderedFloat;
use rayon::prelude::*;
use tracing::{debug, info};

use crate::blend::{BlendCase, BoundKey, BoundSide, PropertyBounds, SpecBounds, Symbol};
use crate::lp_solver::{SolveStatus, SolverConfig};
use crate::model::{achieved_properties, solve_grade};

/// Grid of paired relaxation amounts tried in step 5, in display units.
const RELAX_GRID: [f64; 7] = [0.05, 0.1, 0.2, 0.5, 1.0, 2.0, 3.0];

/// Outcome of diagnosing one grade.
#[derive(Debug, Clone, PartialEq)]
pub enum Diagnosis {
    /// The grade solved on re-check; there is nothing to analyze.
    ActuallyFeasible,
    /// Not even pairwise bound omission restores feasibility; the case
    /// requires significant specification changes.
    Inconclusive,
    Analysis(DiagnosisReport),
}

/// One active spec bound, described in display units.
#[derive(Debug, Clone, PartialEq)]
pub struct BoundDetail {
    pub key: BoundKey,
    /// The bound value, display units.
    pub value: f64,
    /// What the property comes out at when the bound is dropped and the
    /// rest of the model is optimized.
    pub achieved_without: Option<f64>,
}

impl BoundDetail {
    pub fn describe(&self) -> String {
        match self.key.side {
            BoundSide::Min => format!("{} >= {:.3}", self.key.property, self.value),
            BoundSide::Max => format!("{} <= {:.3}", self.key.property, self.value),
        }
    }
}

/// Blend outcome at a relaxed spec.
#[derive(Debug, Clone, PartialEq)]
pub struct RelaxedOutcome {
    pub total_volume: f64,
    pub profit: f64,
    /// (property, achieved display value, original display spec window).
    pub achieved: Vec<(Symbol, f64, PropertyBounds)>,
}

/// A single-bound feasibility path: relax one bound by `delta`.
#[derive(Debug, Clone, PartialEq)]
pub struct RelaxationPath {
    pub bound: BoundDetail,
    /// Minimal relaxation found, display units.
    pub delta: f64,
    /// The bound after relaxation, display units.
    pub relaxed_value: f64,
    pub outcome: RelaxedOutcome,
}

/// A two-bound feasibility path from the combination grid.
#[derive(Debug, Clone, PartialEq)]
pub struct CombinationPath {
    pub bounds: [BoundDetail; 2],
    pub deltas: [f64; 2],
    pub relaxed_values: [f64; 2],
    pub total_volume: f64,
    pub profit: f64,
}

impl CombinationPath {
    pub fn total_relaxation(&self) -> f64 {
        self.deltas.iter().sum()
    }
}

/// Full analysis for one infeasible grade.
#[derive(Debug, Clone, PartialEq)]
pub struct DiagnosisReport {
    pub grade: Symbol,
    /// True when the critical set came from the pairwise fallback.
    pub via_pair: bool,
    pub critical: Vec<BoundDetail>,
    /// Sorted by relaxation ascending; the first entry is the
    /// recommendation, the next two are alternatives.
    pub paths: Vec<RelaxationPath>,
    /// At most three, ranked by total relaxation ascending.
    pub combinations: Vec<CombinationPath>,
}

#[derive(Debug, Clone)]
struct BoundShift {
    key: BoundKey,
    delta: f64,
}

/// Specs with display-unit shifts applied before internal conversion. A min
/// shifted to zero becomes the sentinel and drops out of the matrix, exactly
/// like an omission; an infinite max stays infinite.
fn shifted_specs(case: &BlendCase, grade: &Symbol, shifts: &[BoundShift]) -> SpecBounds {
    let mut shifted = case.clone();
    for shift in shifts {
        let window = shifted
            .specs
            .entry(shift.key.property.clone())
            .or_default()
            .entry(grade.clone())
            .or_insert(PropertyBounds::FREE);
        match shift.key.side {
            BoundSide::Min => window.min = (window.min - shift.delta).max(0.0),
            BoundSide::Max => {
                if window.max.is_finite() {
                    window.max += shift.delta;
                }
            }
        }
    }
    SpecBounds::from_case(&shifted)
}

/// Binary-search seed range for a relaxation delta, keyed by the property
/// name as it appears in the spec.
fn seed_range(property: &str) -> (f64, f64) {
    match property {
        "SPG" => (0.001, 0.1),
        "RON" | "MON" | "RVP" => (0.01, 10.0),
        "E70" | "E10" | "E15" | "ARO" | "OLEFIN" => (0.1, 20.0),
        _ => (0.001, 50.0),
    }
}

/// Achieved display value of one property for a solved probe.
fn achieved_value(case: &BlendCase, volumes: &[f64], property: &Symbol) -> Option<f64> {
    achieved_properties(case, volumes)
        .into_iter()
        .find(|(p, _)| p == property)
        .map(|(_, v)| v)
}

/// Achieved display vector with each property's original spec window.
fn achieved_with_windows(
    case: &BlendCase,
    grade: &Symbol,
    volumes: &[f64],
) -> Vec<(Symbol, f64, PropertyBounds)> {
    achieved_properties(case, volumes)
        .into_iter()
        .map(|(property, value)| {
            let window = case.display_bounds(&property, grade);
            (property, value, window)
        })
        .collect()
}

/// Minimal relaxation of one bound that restores feasibility, or `None`.
///
/// 25 bisection iterations, converged when the bracket closes below 1e-4.
/// If the seeded ceiling is itself infeasible the bracket is widened
/// geometrically first; a critical bound always clears once fully relaxed,
/// so the widening terminates.
fn minimal_relaxation(
    case: &BlendCase,
    grade_idx: usize,
    grade: &Symbol,
    key: &BoundKey,
    config: &SolverConfig,
) -> Result<Option<f64>> {
    let feasible_at = |delta: f64| -> Result<bool> {
        let relaxed = shifted_specs(
            case,
            grade,
            &[BoundShift {
                key: key.clone(),
                delta,
            }],
        );
        let outcome = solve_grade(case, grade_idx, &relaxed, config)?;
        Ok(outcome.status == SolveStatus::Optimal)
    };

    let (mut lo, mut hi) = seed_range(key.property.as_ref());
    let mut ceiling_ok = feasible_at(hi)?;
    let mut widenings = 0;
    while !ceiling_ok && widenings < 8 {
        lo = hi;
        hi *= 2.0;
        widenings += 1;
        ceiling_ok = feasible_at(hi)?;
    }
    if !ceiling_ok {
        return Ok(None);
    }

    let mut best = hi;
    for _ in 0..25 {
        let mid = (lo + hi) / 2.0;
        if feasible_at(mid)? {
            best = mid;
            hi = mid;
        } else {
            lo = mid;
        }
        if hi - lo < 0.0001 {
            break;
        }
    }
    Ok(Some(best))
}

/// Diagnose one infeasible grade. `specs` are the internal-unit bounds the
/// failed solve used.
pub fn diagnose_grade(
    case: &BlendCase,
    grade_idx: usize,
    specs: &SpecBounds,
) -> Result<Diagnosis> {
    let grade = case.grades[grade_idx].name.clone();
    let config = SolverConfig::bundled();

    // Step 1: confirm on a fresh model
    let base = solve_grade(case, grade_idx, specs, &config)?;
    if base.status == SolveStatus::Optimal {
        return Ok(Diagnosis::ActuallyFeasible);
    }
    info!(grade = %grade, "grade confirmed infeasible, screening spec bounds");

    let active = specs.active_bounds(case, &grade);

    // Step 2: single-bound omission screening, order-stable across threads
    let screened = active
        .par_iter()
        .map(|(key, value)| -> Result<Option<BoundDetail>> {
            let relaxed = specs.without_bound(&grade, key);
            let outcome = solve_grade(case, grade_idx, &relaxed, &config)?;
            if outcome.status != SolveStatus::Optimal {
                return Ok(None);
            }
            debug!(bound = %key.property, side = %key.side, "bound is critical");
            Ok(Some(BoundDetail {
                key: key.clone(),
                value: *value,
                achieved_without: achieved_value(case, &outcome.volumes, &key.property),
            }))
        })
        .collect::<Result<Vec<_>>>()?;
    let mut critical: Vec<BoundDetail> = screened.into_iter().flatten().collect();

    // Step 3: pairwise fallback, first feasible pair in fixed order wins
    let mut via_pair = false;
    if critical.is_empty() {
        let pairs: Vec<_> = active.iter().cloned().tuple_combinations::<(_, _)>().collect();
        let first_pair = pairs
            .par_iter()
            .find_map_first(|((key_a, value_a), (key_b, value_b))| {
                let relaxed = specs
                    .without_bound(&grade, key_a)
                    .without_bound(&grade, key_b);
                match solve_grade(case, grade_idx, &relaxed, &config) {
                    Err(e) => Some(Err(e)),
                    Ok(outcome) if outcome.status == SolveStatus::Optimal => {
                        Some(Ok([(key_a.clone(), *value_a), (key_b.clone(), *value_b)]))
                    }
                    Ok(_) => None,
                }
            })
            .transpose()?;

        match first_pair {
            Some(pair) => {
                via_pair = true;
                critical = pair
                    .into_iter()
                    .map(|(key, value)| BoundDetail {
                        key,
                        value,
                        achieved_without: None,
                    })
                    .collect();
            }
            None => {
                info!(grade = %grade, "pairwise omission failed, diagnosis inconclusive");
                return Ok(Diagnosis::Inconclusive);
            }
        }
    }

    // Step 4: minimal relaxation per critical bound
    let paths = critical
        .par_iter()
        .map(|detail| -> Result<Option<RelaxationPath>> {
            let Some(delta) =
                minimal_relaxation(case, grade_idx, &grade, &detail.key, &config)?
            else {
                return Ok(None);
            };
            let relaxed = shifted_specs(
                case,
                &grade,
                &[BoundShift {
                    key: detail.key.clone(),
                    delta,
                }],
            );
            let outcome = solve_grade(case, grade_idx, &relaxed, &config)?;
            if outcome.status != SolveStatus::Optimal {
                return Ok(None);
            }
            let total_volume: f64 = outcome.volumes.iter().sum();
            let relaxed_value = match detail.key.side {
                BoundSide::Min => (detail.value - delta).max(0.0),
                BoundSide::Max => detail.value + delta,
            };
            Ok(Some(RelaxationPath {
                bound: detail.clone(),
                delta,
                relaxed_value,
                outcome: RelaxedOutcome {
                    total_volume,
                    profit: outcome.objective,
                    achieved: achieved_with_windows(case, &grade, &outcome.volumes),
                },
            }))
        })
        .collect::<Result<Vec<_>>>()?;
    let mut paths: Vec<RelaxationPath> = paths.into_iter().flatten().collect();
    paths.sort_by_key(|p| OrderedFloat(p.delta));

    // Step 5: paired relaxations over the fixed grid
    let mut combinations = Vec::new();
    if critical.len() > 1 {
        let pairs: Vec<_> = critical
            .iter()
            .cloned()
            .tuple_combinations::<(_, _)>()
            .collect();
        let found = pairs
            .par_iter()
            .map(|(a, b)| -> Result<Option<CombinationPath>> {
                for delta_a in RELAX_GRID {
                    for delta_b in RELAX_GRID {
                        let relaxed = shifted_specs(
                            case,
                            &grade,
                            &[
                                BoundShift {
                                    key: a.key.clone(),
                                    delta: delta_a,
                                },
                                BoundShift {
                                    key: b.key.clone(),
                                    delta: delta_b,
                                },
                            ],
                        );
                        let outcome = solve_grade(case, grade_idx, &relaxed, &config)?;
                        if outcome.status == SolveStatus::Optimal {
                            let relaxed_value = |detail: &BoundDetail, delta: f64| match detail
                                .key
                                .side
                            {
                                BoundSide::Min => (detail.value - delta).max(0.0),
                                BoundSide::Max => detail.value + delta,
                            };
                            return Ok(Some(CombinationPath {
                                relaxed_values: [
                                    relaxed_value(a, delta_a),
                                    relaxed_value(b, delta_b),
                                ],
                                bounds: [a.clone(), b.clone()],
                                deltas: [delta_a, delta_b],
                                total_volume: outcome.volumes.iter().sum(),
                                profit: outcome.objective,
                            }));
                        }
                    }
                }
                Ok(None)
            })
            .collect::<Result<Vec<_>>>()?;
        combinations = found.into_iter().flatten().collect::<Vec<_>>();
        combinations.sort_by_key(|c| OrderedFloat(c.total_relaxation()));
        combinations.truncate(3);
    }

    Ok(Diagnosis::Analysis(DiagnosisReport {
        grade,
        via_pair,
        critical,
        paths,
        combinations,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blend::{Component, Grade};
    use std::collections::HashMap;

    fn grade(name: &str, min: f64, max: f64, price: f64) -> Grade {
        Grade {
            name: Symbol::from(name),
            min_volume: min,
            max_volume: max,
            price,
        }
    }

    fn component(name: &str, availability: f64, props: &[(&str, f64)]) -> Component {
        Component {
            name: Symbol::from(name),
            tag: String::new(),
            factor: 0.1,
            availability,
            min_usage: 0.0,
            properties: props.iter().map(|(p, v)| (Symbol::from(*p), *v)).collect(),
        }
    }

    fn case_with_specs(
        grades: Vec<Grade>,
        components: Vec<Component>,
        properties: &[&str],
        entries: &[(&str, &str, f64, f64)],
    ) -> BlendCase {
        let mut specs: HashMap<Symbol, HashMap<Symbol, PropertyBounds>> = HashMap::new();
        for (property, grade, min, max) in entries {
            specs
                .entry(Symbol::from(*property))
                .or_default()
                .insert(Symbol::from(*grade), PropertyBounds { min: *min, max: *max });
        }
        BlendCase {
            grades,
            components,
            properties: properties.iter().map(|p| Symbol::from(*p)).collect(),
            specs,
        }
    }

    #[cfg(feature = "coin_cbc")]
    #[test]
    fn test_feasible_grade_short_circuits() {
        let case = case_with_specs(
            vec![grade("G", 10.0, 100.0, 10.0)],
            vec![component("X", 1000.0, &[("SUL", 1.0)])],
            &["SUL"],
            &[("SUL", "G", 0.0, 5.0)],
        );
        let specs = SpecBounds::from_case(&case);
        let diagnosis = diagnose_grade(&case, 0, &specs).unwrap();
        assert_eq!(diagnosis, Diagnosis::ActuallyFeasible);
    }

    #[cfg(feature = "coin_cbc")]
    #[test]
    fn test_single_tight_bound_is_sole_critical() {
        // Cleanest achievable SUL is 1.0 (pure Y); the ceiling of 0.5 is
        // unreachable on its own.
        let case = case_with_specs(
            vec![grade("G", 50.0, 100.0, 10.0)],
            vec![
                component("X", 1000.0, &[("SUL", 5.0)]),
                component("Y", 1000.0, &[("SUL", 1.0)]),
            ],
            &["SUL"],
            &[("SUL", "G", 0.0, 0.5)],
        );
        let specs = SpecBounds::from_case(&case);

        let Diagnosis::Analysis(report) = diagnose_grade(&case, 0, &specs).unwrap() else {
            panic!("expected an analysis");
        };
        assert!(!report.via_pair);
        assert_eq!(report.critical.len(), 1);
        assert_eq!(report.critical[0].key.property, Symbol::from("SUL"));
        assert_eq!(report.critical[0].key.side, BoundSide::Max);
        assert!((report.critical[0].value - 0.5).abs() < 1e-9);

        // Minimal relaxation lands just above 0.5, lifting the ceiling to
        // the achievable 1.0
        assert_eq!(report.paths.len(), 1);
        let path = &report.paths[0];
        assert!(path.delta > 0.49 && path.delta < 0.51, "delta = {}", path.delta);
        assert!((path.relaxed_value - 1.0).abs() < 0.01);
        assert!(path.outcome.total_volume > 0.0);
        // Only one critical bound, so no combination grid
        assert!(report.combinations.is_empty());
    }

    #[cfg(feature = "coin_cbc")]
    #[test]
    fn test_pairwise_fallback_and_combinations() {
        // Volume must be exactly 100 and each component is capped at 50, so
        // both floors of 6 (achievable average 5) are jointly responsible;
        // dropping either one alone leaves the other unsatisfiable.
        let case = case_with_specs(
            vec![grade("G", 100.0, 100.0, 10.0)],
            vec![
                component("X", 50.0, &[("A", 10.0)]),
                component("Y", 50.0, &[("B", 10.0)]),
            ],
            &["A", "B"],
            &[("A", "G", 6.0, f64::INFINITY), ("B", "G", 6.0, f64::INFINITY)],
        );
        let specs = SpecBounds::from_case(&case);

        let Diagnosis::Analysis(report) = diagnose_grade(&case, 0, &specs).unwrap() else {
            panic!("expected an analysis");
        };
        assert!(report.via_pair);
        assert_eq!(report.critical.len(), 2);
        assert_eq!(report.critical[0].key.property, Symbol::from("A"));
        assert_eq!(report.critical[1].key.property, Symbol::from("B"));

        // Relaxing one floor alone never helps, so there are no single
        // paths; the grid finds 1.0 + 1.0 as the first workable combination
        assert!(report.paths.is_empty());
        assert_eq!(report.combinations.len(), 1);
        let combo = &report.combinations[0];
        assert_eq!(combo.deltas, [1.0, 1.0]);
        assert!((combo.total_volume - 100.0).abs() < 1e-6);
    }

    #[cfg(feature = "coin_cbc")]
    #[test]
    fn test_inconclusive_when_pairs_cannot_help() {
        // Volume floor above total availability: no spec omission can fix a
        // supply shortfall, but both bounds stay active so screening runs.
        let case = case_with_specs(
            vec![grade("G", 200.0, 300.0, 10.0)],
            vec![
                component("X", 50.0, &[("A", 10.0)]),
                component("Y", 50.0, &[("B", 10.0)]),
            ],
            &["A", "B"],
            &[("A", "G", 6.0, f64::INFINITY), ("B", "G", 6.0, f64::INFINITY)],
        );
        let specs = SpecBounds::from_case(&case);
        let diagnosis = diagnose_grade(&case, 0, &specs).unwrap();
        assert_eq!(diagnosis, Diagnosis::Inconclusive);
    }

    #[cfg(feature = "coin_cbc")]
    #[test]
    fn test_diagnosis_is_deterministic() {
        let case = case_with_specs(
            vec![grade("G", 50.0, 100.0, 10.0)],
            vec![
                component("X", 1000.0, &[("SUL", 5.0), ("SPG", 0.60)]),
                component("Y", 1000.0, &[("SUL", 1.0), ("SPG", 0.65)]),
            ],
            &["SPG", "SUL"],
            &[("SUL", "G", 0.0, 0.5), ("SPG", "G", 0.7, 0.9)],
        );
        let specs = SpecBounds::from_case(&case);

        let first = diagnose_grade(&case, 0, &specs).unwrap();
        let second = diagnose_grade(&case, 0, &specs).unwrap();
        assert_eq!(first, second);
    }
}
