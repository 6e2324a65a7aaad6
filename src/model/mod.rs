//! Pure builders for the blending LP.
//!
//! Every function here builds into a caller-supplied branded builder and
//! never mutates a solved model; probe variants are produced by rebuilding
//! from scratch against a modified [`SpecBounds`]. Decision variables are one
//! non-negative continuous volume per (grade, component) pair.

use std::collections::HashMap;

use anyhow::Result;
use tracing::debug;

use crate::blend::{transform, BlendCase, SpecBounds, Symbol};
use crate::lp_model_builder;
use crate::lp_solver::{
    Constraint, LPModelBuilder, LinearExpression, OptimizationSense, SolveStatus, SolverConfig,
    VariableId, VariableType,
};

/// Decision variables of the combined multi-grade model, indexed
/// `[grade][component]` in case order.
pub struct BlendVars<Brand> {
    pub per_grade: Vec<Vec<VariableId<Brand>>>,
}

/// Decision variables of a single-grade model, indexed by component.
pub struct GradeVars<Brand> {
    pub volumes: Vec<VariableId<Brand>>,
}

/// Component property vectors in internal units, aligned with
/// `case.components`.
pub fn internal_component_properties(case: &BlendCase) -> Vec<HashMap<Symbol, f64>> {
    case.components
        .iter()
        .map(|c| transform::convert_component_properties(&c.properties))
        .collect()
}

fn total_volume<Brand>(vars: &[VariableId<Brand>]) -> LinearExpression<Brand> {
    let mut total = LinearExpression::new(0.0);
    for var in vars {
        total.add_term(1.0, *var);
    }
    total
}

/// Weighted property rows for one grade: for each active bound,
/// `sum(value_c * vol_c)` compared against `bound * total`.
fn add_property_rows<Brand>(
    builder: &mut LPModelBuilder<Brand>,
    grade_name: &Symbol,
    vars: &[VariableId<Brand>],
    properties: &[Symbol],
    component_props: &[HashMap<Symbol, f64>],
    specs: &SpecBounds,
    total: &LinearExpression<Brand>,
) {
    for property in properties {
        let window = specs.get(property, grade_name);
        if !window.min_is_active() && !window.max_is_active() {
            continue;
        }

        let mut weighted = LinearExpression::new(0.0);
        for (c, var) in vars.iter().enumerate() {
            let value = component_props[c].get(property).copied().unwrap_or(0.0);
            weighted.add_term(value, *var);
        }

        if window.min_is_active() {
            builder.add_constraint(Constraint::ge(
                weighted.clone() - window.min * total.clone(),
                0.0,
            ));
        }
        if window.max_is_active() {
            builder.add_constraint(Constraint::le(weighted - window.max * total.clone(), 0.0));
        }
    }
}

/// Build the combined multi-grade model: maximize total margin subject to
/// volume windows, pooled availability, usage floors, and property windows.
pub fn build_blend_model<Brand>(
    builder: &mut LPModelBuilder<Brand>,
    case: &BlendCase,
    specs: &SpecBounds,
) -> BlendVars<Brand> {
    let component_props = internal_component_properties(case);
    let properties = case.internal_properties();

    let per_grade: Vec<Vec<VariableId<Brand>>> = case
        .grades
        .iter()
        .map(|_| {
            case.components
                .iter()
                .map(|_| builder.add_variable(VariableType::Continuous, 0.0, f64::INFINITY))
                .collect()
        })
        .collect();

    let mut objective = LinearExpression::new(0.0);
    for (g, grade) in case.grades.iter().enumerate() {
        for (c, component) in case.components.iter().enumerate() {
            objective.add_term(grade.price - case.component_cost(component), per_grade[g][c]);
        }
    }
    builder.set_objective(objective, OptimizationSense::Maximize);

    for (g, grade) in case.grades.iter().enumerate() {
        let total = total_volume(&per_grade[g]);
        builder.add_constraint(Constraint::ge(total.clone(), grade.min_volume));
        if grade.max_volume.is_finite() {
            builder.add_constraint(Constraint::le(total.clone(), grade.max_volume));
        }
        add_property_rows(
            builder,
            &grade.name,
            &per_grade[g],
            &properties,
            &component_props,
            specs,
            &total,
        );
    }

    // Supply limits and usage floors pool across grades
    for (c, component) in case.components.iter().enumerate() {
        let mut used = LinearExpression::new(0.0);
        for grade_vars in &per_grade {
            used.add_term(1.0, grade_vars[c]);
        }
        if component.availability.is_finite() {
            builder.add_constraint(Constraint::le(used.clone(), component.availability));
        }
        if component.min_usage > 0.0 {
            builder.add_constraint(Constraint::ge(used, component.min_usage));
        }
    }

    BlendVars { per_grade }
}

/// Build an isolated single-grade model. Availability and usage floors apply
/// to this grade alone; cross-grade pool competition is deliberately ignored
/// when a grade is examined on its own.
pub fn build_grade_model<Brand>(
    builder: &mut LPModelBuilder<Brand>,
    case: &BlendCase,
    grade_idx: usize,
    specs: &SpecBounds,
) -> GradeVars<Brand> {
    let component_props = internal_component_properties(case);
    let properties = case.internal_properties();
    let grade = &case.grades[grade_idx];

    let volumes: Vec<VariableId<Brand>> = case
        .components
        .iter()
        .map(|_| builder.add_variable(VariableType::Continuous, 0.0, f64::INFINITY))
        .collect();

    let mut objective = LinearExpression::new(0.0);
    for (c, component) in case.components.iter().enumerate() {
        objective.add_term(grade.price - case.component_cost(component), volumes[c]);
    }
    builder.set_objective(objective, OptimizationSense::Maximize);

    let total = total_volume(&volumes);
    builder.add_constraint(Constraint::ge(total.clone(), grade.min_volume));
    if grade.max_volume.is_finite() {
        builder.add_constraint(Constraint::le(total.clone(), grade.max_volume));
    }

    for (c, component) in case.components.iter().enumerate() {
        if component.availability.is_finite() {
            builder.add_constraint(Constraint::le(volumes[c], component.availability));
        }
        if component.min_usage > 0.0 {
            builder.add_constraint(Constraint::ge(volumes[c], component.min_usage));
        }
    }

    add_property_rows(
        builder,
        &grade.name,
        &volumes,
        &properties,
        &component_props,
        specs,
        &total,
    );

    GradeVars { volumes }
}

/// Result of solving the combined model.
#[derive(Debug, Clone)]
pub struct CombinedOutcome {
    pub status: SolveStatus,
    pub objective: f64,
    /// Volumes indexed `[grade][component]`, zeros unless Optimal.
    pub volumes: Vec<Vec<f64>>,
}

/// Result of solving one isolated grade model.
#[derive(Debug, Clone, PartialEq)]
pub struct GradeOutcome {
    pub status: SolveStatus,
    pub objective: f64,
    /// Volumes by component, zeros unless Optimal.
    pub volumes: Vec<f64>,
}

/// Build and solve the combined multi-grade model.
pub fn solve_blend(
    case: &BlendCase,
    specs: &SpecBounds,
    config: &SolverConfig,
) -> Result<CombinedOutcome> {
    let mut builder = lp_model_builder!(CombinedBlendModel);
    let vars = build_blend_model(&mut builder, case, specs);
    debug!(
        variables = builder.num_variables(),
        constraints = builder.num_constraints(),
        "solving combined blend model"
    );
    let solution = builder.solve(config)?;

    let volumes = vars
        .per_grade
        .iter()
        .map(|grade_vars| {
            grade_vars
                .iter()
                .map(|v| solution.get_value(*v).unwrap_or(0.0))
                .collect()
        })
        .collect();

    Ok(CombinedOutcome {
        status: solution.status,
        objective: solution.objective_value,
        volumes,
    })
}

/// Build and solve one isolated grade model.
pub fn solve_grade(
    case: &BlendCase,
    grade_idx: usize,
    specs: &SpecBounds,
    config: &SolverConfig,
) -> Result<GradeOutcome> {
    let mut builder = lp_model_builder!(SingleGradeModel);
    let vars = build_grade_model(&mut builder, case, grade_idx, specs);
    let solution = builder.solve(config)?;

    let volumes = vars
        .volumes
        .iter()
        .map(|v| solution.get_value(*v).unwrap_or(0.0))
        .collect();

    Ok(GradeOutcome {
        status: solution.status,
        objective: solution.objective_value,
        volumes,
    })
}

/// Display-unit property vector achieved by a blend, in the case's
/// reporting order. Transformed properties are averaged in internal units
/// and mapped back through the inverse.
pub fn achieved_properties(case: &BlendCase, volumes: &[f64]) -> Vec<(Symbol, f64)> {
    let component_props = internal_component_properties(case);
    let total: f64 = volumes.iter().sum();

    case.properties
        .iter()
        .map(|display| {
            let internal = transform::internal_name(display.as_ref());
            let key = Symbol::from(internal);
            let weighted: f64 = volumes
                .iter()
                .zip(&component_props)
                .map(|(vol, props)| props.get(&key).copied().unwrap_or(0.0) * vol)
                .sum();
            let average = if total > 0.0 { weighted / total } else { 0.0 };
            let value = if internal != display.as_ref() {
                // An all-zero blend has no meaningful octane to report
                if average > 0.0 {
                    transform::to_display(internal, average)
                } else {
                    0.0
                }
            } else {
                average
            };
            (display.clone(), value)
        })
        .collect()
}
