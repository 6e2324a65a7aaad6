//! External GLPK backend driven through the `glpsol` command-line binary.
//!
//! The model file is a fixed generic MathProg matrix formulation; only the
//! data file changes between solves. Minimization is encoded through an
//! `obj_sense` multiplier so the template always maximizes. Any failure here
//! (binary missing, nonzero exit, unparsable output) surfaces as an `Err`,
//! which the caller treats as "solver unavailable" and retries on the
//! bundled backend.

use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::sync::atomic::{AtomicUsize, Ordering};

use anyhow::{Context, Result, bail};
use lazy_static::lazy_static;
use regex::Regex;

use crate::lp_solver::{
    ConstraintSense, LPModelBuilder, LPSolution, OptimizationSense, SolveStatus, VariableType,
};

/// Finite stand-ins for unbounded variables; MathProg has no infinity literal.
const GLPK_INFINITY: f64 = 1e15;

static MODEL_TEMPLATE: &str = "\
set VARS, default {};
set ROWS_LE, default {};
set ROWS_GE, default {};
set ROWS_EQ, default {};

param obj_sense, default 1;
param lb{VARS}, default 0;
param ub{VARS}, default 1e15;
param obj{VARS}, default 0;
param a_le{ROWS_LE, VARS}, default 0;
param a_ge{ROWS_GE, VARS}, default 0;
param a_eq{ROWS_EQ, VARS}, default 0;
param rhs_le{ROWS_LE}, default 0;
param rhs_ge{ROWS_GE}, default 0;
param rhs_eq{ROWS_EQ}, default 0;

var x{v in VARS}, >= lb[v], <= ub[v];

maximize total:
    obj_sense * sum{v in VARS} obj[v] * x[v];

s.t. c_le{r in ROWS_LE}:
    sum{v in VARS} a_le[r,v] * x[v] <= rhs_le[r];

s.t. c_ge{r in ROWS_GE}:
    sum{v in VARS} a_ge[r,v] * x[v] >= rhs_ge[r];

s.t. c_eq{r in ROWS_EQ}:
    sum{v in VARS} a_eq[r,v] * x[v] = rhs_eq[r];

solve;

end;
";

lazy_static! {
    static ref STATUS_RE: Regex = Regex::new(r"(?m)^Status:\s+(.+)$").unwrap();
    static ref OBJECTIVE_RE: Regex =
        Regex::new(r"(?m)^Objective:\s+\S+\s+=\s+(-?(?:\d+(?:\.\d+)?|\.\d+)(?:[eE][+-]?\d+)?)")
            .unwrap();
    static ref COLUMN_RE: Regex = Regex::new(
        r"(?m)^\s*\d+\s+x\[v(\d+)\]\s+\S+\s+(-?(?:\d+(?:\.\d+)?|\.\d+)(?:[eE][+-]?\d+)?)"
    )
    .unwrap();
}

// Scratch directories are named from the process id plus a monotonic counter,
// never from wall-clock time.
static SCRATCH_COUNTER: AtomicUsize = AtomicUsize::new(0);

fn scratch_dir() -> Result<PathBuf> {
    let seq = SCRATCH_COUNTER.fetch_add(1, Ordering::Relaxed);
    let dir = std::env::temp_dir().join(format!("blendopt-glpk-{}-{}", std::process::id(), seq));
    fs::create_dir_all(&dir)
        .with_context(|| format!("failed to create scratch directory {}", dir.display()))?;
    Ok(dir)
}

fn clamp_bound(value: f64) -> f64 {
    value.clamp(-GLPK_INFINITY, GLPK_INFINITY)
}

/// Render the MathProg data section for a model.
fn render_data<Brand>(builder: &LPModelBuilder<Brand>) -> String {
    // Coefficients aggregated per (row, variable) so repeated terms on the
    // same variable are legal in the data file.
    let mut le_rows: Vec<(usize, BTreeMap<usize, f64>, f64)> = Vec::new();
    let mut ge_rows: Vec<(usize, BTreeMap<usize, f64>, f64)> = Vec::new();
    let mut eq_rows: Vec<(usize, BTreeMap<usize, f64>, f64)> = Vec::new();

    for (idx, constraint) in builder.constraints.iter().enumerate() {
        let mut coeffs: BTreeMap<usize, f64> = BTreeMap::new();
        for term in &constraint.expression.terms {
            *coeffs.entry(term.variable.index()).or_insert(0.0) += term.coefficient;
        }
        let rhs = constraint.rhs - constraint.expression.constant;

        match constraint.sense {
            ConstraintSense::LessEqual => le_rows.push((idx, coeffs, rhs)),
            ConstraintSense::GreaterEqual => ge_rows.push((idx, coeffs, rhs)),
            // Strict inequality approximated the same way as the bundled backend
            ConstraintSense::Greater => ge_rows.push((idx, coeffs, rhs + 1e-10)),
            ConstraintSense::Equal => eq_rows.push((idx, coeffs, rhs)),
        }
    }

    let mut obj_coeffs: BTreeMap<usize, f64> = BTreeMap::new();
    let mut obj_sense = 1.0;
    if let Some(obj_info) = &builder.objective {
        for term in &obj_info.expression.terms {
            *obj_coeffs.entry(term.variable.index()).or_insert(0.0) += term.coefficient;
        }
        obj_sense = match obj_info.sense {
            OptimizationSense::Maximize => 1.0,
            OptimizationSense::Minimize => -1.0,
        };
    }

    let mut out = String::from("data;\n\n");

    if !builder.variables.is_empty() {
        out.push_str("set VARS :=");
        for idx in 0..builder.variables.len() {
            let _ = write!(out, " v{}", idx);
        }
        out.push_str(";\n");
    }
    for (name, rows) in [
        ("ROWS_LE", &le_rows),
        ("ROWS_GE", &ge_rows),
        ("ROWS_EQ", &eq_rows),
    ] {
        if !rows.is_empty() {
            let _ = write!(out, "set {} :=", name);
            for (idx, _, _) in rows {
                let _ = write!(out, " r{}", idx);
            }
            out.push_str(";\n");
        }
    }

    let _ = write!(out, "\nparam obj_sense := {};\n", obj_sense);

    if !builder.variables.is_empty() {
        out.push_str("\nparam lb :=\n");
        for (idx, var) in builder.variables.iter().enumerate() {
            let _ = writeln!(out, "  v{} {}", idx, clamp_bound(var.lower_bound));
        }
        out.push_str(";\n\nparam ub :=\n");
        for (idx, var) in builder.variables.iter().enumerate() {
            let _ = writeln!(out, "  v{} {}", idx, clamp_bound(var.upper_bound));
        }
        out.push_str(";\n");
    }

    if !obj_coeffs.is_empty() {
        out.push_str("\nparam obj :=\n");
        for (var, coeff) in &obj_coeffs {
            let _ = writeln!(out, "  v{} {}", var, coeff);
        }
        out.push_str(";\n");
    }

    for (matrix, rhs_name, rows) in [
        ("a_le", "rhs_le", &le_rows),
        ("a_ge", "rhs_ge", &ge_rows),
        ("a_eq", "rhs_eq", &eq_rows),
    ] {
        if rows.is_empty() {
            continue;
        }
        let _ = write!(out, "\nparam {} :=\n", matrix);
        for (row, coeffs, _) in rows {
            for (var, coeff) in coeffs {
                let _ = writeln!(out, "  [r{}, v{}] {}", row, var, coeff);
            }
        }
        out.push_str(";\n");
        let _ = write!(out, "\nparam {} :=\n", rhs_name);
        for (row, _, rhs) in rows {
            let _ = writeln!(out, "  r{} {}", row, rhs);
        }
        out.push_str(";\n");
    }

    out.push_str("\nend;\n");
    out
}

/// Parse the solution report written by `glpsol --output`.
///
/// Returns the status, the raw objective value as reported by GLPK, and the
/// per-variable activities.
fn parse_solution(report: &str, num_variables: usize) -> Result<(SolveStatus, f64, Vec<f64>)> {
    let status_line = STATUS_RE
        .captures(report)
        .map(|c| c[1].trim().to_string())
        .context("glpsol report has no Status line")?;

    let status = if status_line.contains("INFEASIBLE") {
        SolveStatus::Infeasible
    } else if status_line.contains("UNBOUNDED") {
        SolveStatus::Unbounded
    } else if status_line.contains("OPTIMAL") {
        SolveStatus::Optimal
    } else if status_line.contains("UNDEFINED") {
        SolveStatus::NotSolved
    } else {
        SolveStatus::Undefined
    };

    let mut variable_values = vec![0.0; num_variables];
    let mut objective = 0.0;

    if status == SolveStatus::Optimal {
        objective = OBJECTIVE_RE
            .captures(report)
            .context("glpsol report has no Objective line")?[1]
            .parse::<f64>()
            .context("failed to parse objective value from glpsol report")?;

        for caps in COLUMN_RE.captures_iter(report) {
            let idx: usize = caps[1].parse().context("bad column index in report")?;
            let value: f64 = caps[2].parse().context("bad column activity in report")?;
            if idx >= num_variables {
                bail!("glpsol report references unknown column x[v{}]", idx);
            }
            variable_values[idx] = value;
        }
    }

    Ok((status, objective, variable_values))
}

/// Solve an LP model by shelling out to `glpsol`.
pub fn solve_glpsol<Brand>(
    builder: &LPModelBuilder<Brand>,
    glpsol_path: Option<&Path>,
) -> Result<LPSolution<Brand>> {
    if builder
        .variables
        .iter()
        .any(|v| v.var_type != VariableType::Continuous)
    {
        bail!("glpsol backend only handles continuous variables");
    }

    let scratch = scratch_dir()?;
    let result = run_glpsol(builder, glpsol_path, &scratch);
    let _ = fs::remove_dir_all(&scratch);
    result
}

fn run_glpsol<Brand>(
    builder: &LPModelBuilder<Brand>,
    glpsol_path: Option<&Path>,
    scratch: &Path,
) -> Result<LPSolution<Brand>> {
    let model_path = scratch.join("model.mod");
    let data_path = scratch.join("data.dat");
    let report_path = scratch.join("solution.txt");

    fs::write(&model_path, MODEL_TEMPLATE).context("failed to write MathProg model file")?;
    fs::write(&data_path, render_data(builder)).context("failed to write MathProg data file")?;

    let binary = glpsol_path.unwrap_or_else(|| Path::new("glpsol"));
    let status = Command::new(binary)
        .arg("--math")
        .arg(&model_path)
        .arg("--data")
        .arg(&data_path)
        .arg("--output")
        .arg(&report_path)
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .with_context(|| format!("failed to launch {}", binary.display()))?;

    if !status.success() {
        bail!("{} exited with {}", binary.display(), status);
    }

    let report = fs::read_to_string(&report_path)
        .with_context(|| format!("glpsol produced no report at {}", report_path.display()))?;

    let (solve_status, raw_objective, variable_values) =
        parse_solution(&report, builder.variables.len())?;

    // Undo the obj_sense encoding and restore the constant term dropped from
    // the generated objective.
    let objective_value = if solve_status == SolveStatus::Optimal {
        let sense_mult = match builder.objective.as_ref().map(|o| o.sense) {
            Some(OptimizationSense::Minimize) => -1.0,
            _ => 1.0,
        };
        let constant = builder
            .objective
            .as_ref()
            .map(|o| o.expression.constant)
            .unwrap_or(0.0);
        raw_objective * sense_mult + constant
    } else {
        0.0
    };

    Ok(LPSolution {
        status: solve_status,
        objective_value,
        variable_values,
        _brand: std::marker::PhantomData,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lp_solver::OptimizationSense;
    use crate::{constraint, lp_model_builder};

    #[test]
    fn test_render_data_partitions_senses() {
        let mut builder = lp_model_builder!();
        let x = builder.add_variable(VariableType::Continuous, 0.0, 10.0);
        let y = builder.add_variable(VariableType::Continuous, 0.0, f64::INFINITY);

        builder.add_constraint(constraint!((x + y) <= 12.0));
        builder.add_constraint(constraint!((x - y) >= 0.0));
        builder.add_constraint(constraint!((y) == 3.0));
        builder.set_objective(x + 2.0 * y, OptimizationSense::Maximize);

        let data = render_data(&builder);
        assert!(data.contains("set VARS := v0 v1;"));
        assert!(data.contains("set ROWS_LE := r0;"));
        assert!(data.contains("set ROWS_GE := r1;"));
        assert!(data.contains("set ROWS_EQ := r2;"));
        assert!(data.contains("param obj_sense := 1;"));
        // Infinite upper bound clamped to the finite stand-in
        assert!(data.contains("v1 1000000000000000"));
        assert!(data.contains("[r1, v1] -1"));
    }

    #[test]
    fn test_render_data_aggregates_repeated_terms() {
        let mut builder = lp_model_builder!();
        let x = builder.add_variable(VariableType::Continuous, 0.0, 10.0);

        builder.add_constraint(constraint!((x + x) <= 4.0));
        builder.set_objective(x, OptimizationSense::Minimize);

        let data = render_data(&builder);
        assert!(data.contains("[r0, v0] 2"));
        assert!(data.contains("param obj_sense := -1;"));
    }

    #[test]
    fn test_parse_optimal_report() {
        let report = "\
Problem:    model
Rows:       2
Columns:    2
Non-zeros:  3
Status:     OPTIMAL
Objective:  total = 22 (MAXimum)

   No.   Row name   St   Activity     Lower bound   Upper bound    Marginal
------ ------------ -- ------------- ------------- ------------- -------------
     1 total        B             22
     2 c_le[r0]     NU            12                          12             2

   No. Column name  St   Activity     Lower bound   Upper bound    Marginal
------ ------------ -- ------------- ------------- ------------- -------------
     1 x[v0]        B              2             0            10
     2 x[v1]        NU            10             0            10         < eps
";
        let (status, objective, values) = parse_solution(report, 2).unwrap();
        assert_eq!(status, SolveStatus::Optimal);
        assert!((objective - 22.0).abs() < 1e-9);
        assert!((values[0] - 2.0).abs() < 1e-9);
        assert!((values[1] - 10.0).abs() < 1e-9);
    }

    #[test]
    fn test_parse_infeasible_report() {
        let report = "Status:     INFEASIBLE (FINAL)\n";
        let (status, _, values) = parse_solution(report, 3).unwrap();
        assert_eq!(status, SolveStatus::Infeasible);
        assert_eq!(values, vec![0.0, 0.0, 0.0]);
    }

    #[test]
    fn test_parse_report_without_status_fails() {
        assert!(parse_solution("garbage output\n", 1).is_err());
    }
}
