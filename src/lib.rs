//! Gasoline blending optimization library
//!
//! This library maximizes refinery blending profit by allocating blending
//! components across gasoline grades with a linear program, and explains
//! infeasible quality specifications when no allocation exists.
//!
//! # Overview
//!
//! A blending case describes the gasoline grades to produce (volume windows
//! and prices), the available components (costs, availability, measured
//! properties), and per-grade quality specifications. The optimizer builds a
//! single LP over every grade at once and maximizes total profit. When the
//! combined model is infeasible, each grade is re-solved in isolation and the
//! infeasible ones are handed to a diagnosis engine that identifies the
//! critical specification bounds and proposes minimal relaxations.
//!
//! # Main Workflows
//!
//! The library supports two main operations:
//!
//! 1. **Optimization** ([`optimize`]): Solve a blending case and render the
//!    blend recipes, achieved qualities, and component usage
//! 2. **Template Generation** ([`template_main`]): Write the built-in default
//!    case to a file as a starting point for new cases
//!
//! # Usage Example
//!
//! ```no_run
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! use blendopt::blend::BlendCase;
//! use blendopt::lp_solver::SolverConfig;
//! use blendopt::optimize::run_pipeline;
//! use std::path::Path;
//!
//! let case = BlendCase::load(Path::new("case.json"))?;
//! let outcome = run_pipeline(&case, &SolverConfig::bundled())?;
//! println!("status: {}", outcome.combined_status);
//! # Ok(())
//! # }
//! ```
//!
//! # Modules
//!
//! - **[`blend`]**: Case data model, validation, property-index transforms,
//!   and the built-in default case
//! - **[`model`]**: LP model construction and solving for combined and
//!   per-grade blending problems
//! - **[`diagnose`]**: Infeasibility diagnosis (critical bound screening,
//!   minimal relaxation search, combination solutions)
//! - **[`optimize`]**: The optimization pipeline and its command-line entry
//! - **[`report`]**: Plain-text report rendering
//! - **[`lp_solver`]**: Linear programming solver abstraction layer

use anyhow::{Context, Result};
use clap::Parser;
use std::{error::Error, fmt, path::PathBuf};
use tracing::info;

pub mod blend;
pub mod diagnose;
pub mod lp_solver;
pub mod model;
pub mod optimize;
pub mod report;

// Re-export the main functions for easy access
pub use blend::{BlendCase, Component, Grade, PropertyBounds, Symbol};
pub use optimize::{OptimizeArgs, optimize_main};

/// Application-level errors that can occur while validating a blending case.
#[derive(Debug, PartialEq, Eq)]
pub enum AppError {
    /// The case lists no blending components.
    NoComponents,
    /// The case lists no gasoline grades.
    NoGrades,
    /// A numeric field holds NaN where a finite value (or an allowed
    /// infinity) is required. The payload names the offending entry.
    NonFiniteNumber(String),
    /// A grade's minimum volume exceeds its maximum volume.
    InvalidVolumeWindow(String),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::NoComponents => write!(f, "Case defines no blending components"),
            AppError::NoGrades => write!(f, "Case defines no gasoline grades"),
            AppError::NonFiniteNumber(what) => {
                write!(f, "Non-finite number in {}", what)
            }
            AppError::InvalidVolumeWindow(grade) => {
                write!(f, "Grade {} has min volume above max volume", grade)
            }
        }
    }
}

impl Error for AppError {}

/// Arguments for the `template` subcommand.
#[derive(Debug, Parser)]
pub struct TemplateArgs {
    /// Output path for the generated case file
    pub output: PathBuf,
}

/// Writes the built-in default blending case to `args.output`.
pub fn template_main(args: TemplateArgs) -> Result<()> {
    let case = blend::defaults::default_case();
    case.save(&args.output)
        .with_context(|| format!("failed to write template to {}", args.output.display()))?;
    info!(path = %args.output.display(), "wrote default case template");
    Ok(())
}

/// Command-line interface arguments for the blending tools.
///
/// This enum defines the main commands available:
/// - `Optimize`: Solve a blending case and report the results
/// - `Template`: Generate a default case file to edit
#[derive(Debug, Parser)]
#[clap(
    name = "blendopt",
    about = "Gasoline blending profit optimization and infeasibility analysis"
)]
pub enum CLIArguments {
    /// Solve a blending case, rendering the optimization report and, when
    /// needed, the infeasibility analysis.
    Optimize(OptimizeArgs),
    /// Write the built-in default case as a JSON template.
    Template(TemplateArgs),
}
