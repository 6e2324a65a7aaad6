//! Solve orchestrator and the `optimize` CLI command.
//!
//! The pipeline solves the combined multi-grade model first. When that does
//! not come back Optimal, each grade is re-solved in isolation; grades that
//! work alone report their blend, and grades that stay infeasible go to the
//! diagnosis engine. One bad grade never fails the run.

use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, ValueEnum};
use tracing::{info, warn};

use crate::blend::{BlendCase, Grade, SpecBounds, Symbol};
use crate::diagnose::{diagnose_grade, Diagnosis};
use crate::lp_solver::{SolveStatus, SolverBackend, SolverConfig};
use crate::model::{achieved_properties, solve_blend, solve_grade, CombinedOutcome};
use crate::report;

/// LP backend selectable from the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum SolverChoice {
    /// Bundled COIN-OR CBC solver
    Cbc,
    /// External GLPK `glpsol` binary
    Glpk,
}

impl std::fmt::Display for SolverChoice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SolverChoice::Cbc => write!(f, "cbc"),
            SolverChoice::Glpk => write!(f, "glpk"),
        }
    }
}

#[derive(Args, Debug)]
pub struct OptimizeArgs {
    /// Blend case JSON file
    pub case: PathBuf,

    /// Write the optimization report to this file instead of stdout
    #[arg(long)]
    pub report: Option<PathBuf>,

    /// Write the infeasibility analysis to this file instead of stdout
    #[arg(long)]
    pub infeasibility: Option<PathBuf>,

    /// LP solver backend
    #[arg(long, value_enum, default_value_t = SolverChoice::Cbc)]
    pub solver: SolverChoice,

    /// Path to the glpsol binary (resolved through PATH when omitted)
    #[arg(long)]
    pub glpsol_path: Option<PathBuf>,
}

/// A grade's blend when its model solved.
#[derive(Debug, Clone)]
pub struct SolvedGrade {
    /// Volumes by component, case order.
    pub volumes: Vec<f64>,
    pub total_volume: f64,
    pub total_cost: f64,
    pub total_revenue: f64,
    pub profit: f64,
    /// Achieved display-unit properties, case order.
    pub achieved: Vec<(Symbol, f64)>,
}

#[derive(Debug)]
pub enum GradeResult {
    Solved(SolvedGrade),
    Diagnosed(Diagnosis),
}

#[derive(Debug)]
pub struct GradeReport {
    pub grade: Grade,
    pub result: GradeResult,
}

/// Availability versus total usage across all solved grades.
#[derive(Debug, Clone)]
pub struct ComponentUsage {
    pub name: Symbol,
    pub available: f64,
    pub used: f64,
}

/// Everything the report assembler consumes.
#[derive(Debug)]
pub struct PipelineOutcome {
    pub solver_label: String,
    pub combined_status: SolveStatus,
    /// Combined objective when the multi-grade model solved.
    pub combined_profit: Option<f64>,
    pub grades: Vec<GradeReport>,
    pub component_usage: Vec<ComponentUsage>,
}

impl PipelineOutcome {
    pub fn has_diagnoses(&self) -> bool {
        self.grades
            .iter()
            .any(|g| matches!(g.result, GradeResult::Diagnosed(_)))
    }
}

fn backend_label(config: &SolverConfig) -> String {
    match config.backend {
        #[cfg(feature = "coin_cbc")]
        SolverBackend::CoinCbc => "CBC".to_string(),
        SolverBackend::Glpsol => "GLPK".to_string(),
    }
}

/// Solve the combined model on the requested backend, retrying on the
/// bundled one if an external backend is unavailable. The retry surfaces
/// only in the solver label.
fn solve_combined(
    case: &BlendCase,
    specs: &SpecBounds,
    config: &SolverConfig,
) -> Result<(CombinedOutcome, String)> {
    match solve_blend(case, specs, config) {
        Ok(outcome) => Ok((outcome, backend_label(config))),
        Err(err) => {
            let fallback = SolverConfig::bundled();
            if config.backend == fallback.backend {
                return Err(err);
            }
            warn!(error = %err, "solver backend failed, retrying on the bundled solver");
            let outcome = solve_blend(case, specs, &fallback)?;
            Ok((outcome, format!("{} (fallback)", backend_label(&fallback))))
        }
    }
}

fn solved_grade(case: &BlendCase, grade: &Grade, volumes: Vec<f64>) -> SolvedGrade {
    let total_volume: f64 = volumes.iter().sum();
    let total_cost: f64 = volumes
        .iter()
        .zip(&case.components)
        .map(|(vol, component)| case.component_cost(component) * vol)
        .sum();
    let total_revenue = grade.price * total_volume;
    SolvedGrade {
        achieved: achieved_properties(case, &volumes),
        profit: total_revenue - total_cost,
        total_volume,
        total_cost,
        total_revenue,
        volumes,
    }
}

/// Run the full pipeline for one case.
pub fn run_pipeline(case: &BlendCase, config: &SolverConfig) -> Result<PipelineOutcome> {
    let specs = SpecBounds::from_case(case);

    let (combined, solver_label) = solve_combined(case, &specs, config)?;

    let mut grades = Vec::with_capacity(case.grades.len());
    if combined.status == SolveStatus::Optimal {
        info!(profit = combined.objective, solver = %solver_label, "combined model optimal");
        for (g, grade) in case.grades.iter().enumerate() {
            grades.push(GradeReport {
                grade: grade.clone(),
                result: GradeResult::Solved(solved_grade(
                    case,
                    grade,
                    combined.volumes[g].clone(),
                )),
            });
        }
    } else {
        info!(status = %combined.status, "combined model did not solve, isolating grades");
        let probe_config = SolverConfig::bundled();
        for (g, grade) in case.grades.iter().enumerate() {
            let outcome = solve_grade(case, g, &specs, &probe_config)?;
            let result = if outcome.status == SolveStatus::Optimal {
                GradeResult::Solved(solved_grade(case, grade, outcome.volumes))
            } else {
                GradeResult::Diagnosed(diagnose_grade(case, g, &specs)?)
            };
            grades.push(GradeReport {
                grade: grade.clone(),
                result,
            });
        }
    }

    let component_usage = case
        .components
        .iter()
        .enumerate()
        .map(|(c, component)| {
            let used = grades
                .iter()
                .filter_map(|report| match &report.result {
                    GradeResult::Solved(solved) => Some(solved.volumes[c]),
                    GradeResult::Diagnosed(_) => None,
                })
                .sum();
            ComponentUsage {
                name: component.name.clone(),
                available: component.availability,
                used,
            }
        })
        .collect();

    Ok(PipelineOutcome {
        solver_label,
        combined_status: combined.status,
        combined_profit: (combined.status == SolveStatus::Optimal).then_some(combined.objective),
        grades,
        component_usage,
    })
}

/// Entry point for the `optimize` subcommand.
pub fn optimize_main(args: OptimizeArgs) -> Result<()> {
    let case = BlendCase::load(&args.case)?;
    let config = match args.solver {
        SolverChoice::Cbc => SolverConfig::bundled(),
        SolverChoice::Glpk => SolverConfig::glpsol(args.glpsol_path.clone()),
    };

    let outcome = run_pipeline(&case, &config)?;

    let report_text = report::render_result(&case, &outcome);
    match &args.report {
        Some(path) => fs::write(path, &report_text)
            .with_context(|| format!("failed to write report to {}", path.display()))?,
        None => print!("{}", report_text),
    }

    if let Some(analysis) = report::render_infeasibility(&outcome) {
        match &args.infeasibility {
            Some(path) => fs::write(path, &analysis).with_context(|| {
                format!("failed to write infeasibility analysis to {}", path.display())
            })?,
            None => print!("{}", analysis),
        }
    }

    Ok(())
}
