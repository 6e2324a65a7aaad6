//! Linear Programming (LP) solver abstraction layer.
//!
//! This module provides a backend-agnostic way to build and solve LP models.
//! Two backends are supported: the bundled COIN-OR CBC solver (`coin_cbc`
//! feature, enabled by default) and an external GLPK `glpsol` binary driven
//! through generated MathProg model/data files.
//!
//! # Type Safety with Branded Types
//!
//! All core types (`VariableId`, `LinearExpression`, `Constraint`,
//! `LPModelBuilder`) carry a generic `Brand` type parameter:
//!
//! - Variables from one builder cannot be used with another builder
//! - Constraints are type-checked to only reference their builder's variables
//! - The brand is a zero-sized phantom type with no runtime cost
//!
//! Use the `lp_model_builder!()` macro to create builders with guaranteed
//! unique brands:
//!
//! ```rust
//! use blendopt::constraint;
//! use blendopt::lp_model_builder;
//! use blendopt::lp_solver::{OptimizationSense, VariableType};
//!
//! let mut builder = lp_model_builder!();
//! let x = builder.add_variable(VariableType::Continuous, 0.0, f64::INFINITY);
//! let y = builder.add_variable(VariableType::Continuous, 0.0, f64::INFINITY);
//!
//! builder.add_constraint(constraint!((x + y) <= 10.0));
//! builder.add_constraint(constraint!((2.0 * x - y) >= 0.0));
//! builder.set_objective(x + 2.0 * y, OptimizationSense::Maximize);
//! ```
//!
//! Variables and solutions use `Vec` storage; a `VariableId` is an index into
//! those vectors, so identifiers are monotonic per builder and never depend
//! on wall-clock time.

use std::marker::PhantomData;
use std::path::PathBuf;

use anyhow::Result;

/// Variable types supported by LP solvers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[allow(dead_code)]
pub enum VariableType {
    /// Continuous variable (can take any real value)
    Continuous,
    /// Integer variable (can only take integer values)
    Integer,
    /// Binary variable (can only take values 0 or 1)
    Binary,
}

/// Constraint sense for linear constraints
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConstraintSense {
    /// Less than or equal to (≤)
    LessEqual,
    /// Equal to (=)
    Equal,
    /// Greater than or equal to (≥)
    GreaterEqual,
    /// Strictly greater than (>)
    Greater,
}

/// Optimization direction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OptimizationSense {
    /// Minimize the objective function
    Minimize,
    /// Maximize the objective function
    Maximize,
}

/// Terminal status of a solve attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SolveStatus {
    /// Optimal solution found
    Optimal,
    /// Problem is infeasible (no solution exists)
    Infeasible,
    /// Problem is unbounded
    Unbounded,
    /// Solver finished without a conclusive status
    Undefined,
    /// Solver did not run to completion
    NotSolved,
}

impl std::fmt::Display for SolveStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            SolveStatus::Optimal => "Optimal",
            SolveStatus::Infeasible => "Infeasible",
            SolveStatus::Unbounded => "Unbounded",
            SolveStatus::Undefined => "Undefined",
            SolveStatus::NotSolved => "Not Solved",
        };
        write!(f, "{}", s)
    }
}

/// Available LP solver backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SolverBackend {
    /// Bundled COIN-OR CBC solver
    #[cfg(feature = "coin_cbc")]
    CoinCbc,
    /// External GLPK `glpsol` binary driven through MathProg files
    Glpsol,
}

/// Explicit solver selection, passed down from the orchestrator.
///
/// There is deliberately no process-wide solver state: every solve receives
/// its configuration as an argument.
#[derive(Debug, Clone)]
pub struct SolverConfig {
    pub backend: SolverBackend,
    /// Path to the `glpsol` binary; `None` resolves through `PATH`.
    pub glpsol_path: Option<PathBuf>,
}

impl SolverConfig {
    /// Configuration for the bundled backend, used for diagnostic probes and
    /// as the fallback when the external solver is unavailable.
    pub fn bundled() -> Self {
        #[cfg(feature = "coin_cbc")]
        {
            SolverConfig {
                backend: SolverBackend::CoinCbc,
                glpsol_path: None,
            }
        }
        #[cfg(not(feature = "coin_cbc"))]
        {
            SolverConfig {
                backend: SolverBackend::Glpsol,
                glpsol_path: None,
            }
        }
    }

    /// Configuration for the external GLPK backend.
    pub fn glpsol(path: Option<PathBuf>) -> Self {
        SolverConfig {
            backend: SolverBackend::Glpsol,
            glpsol_path: path,
        }
    }
}

/// A linear expression term: coefficient * variable
#[derive(Debug)]
pub struct LinearTerm<Brand> {
    pub coefficient: f64,
    pub variable: VariableId<Brand>,
}

// Manual impl to avoid requiring `Brand: Clone` (the brand is phantom)
impl<Brand> Clone for LinearTerm<Brand> {
    fn clone(&self) -> Self {
        Self {
            coefficient: self.coefficient,
            variable: self.variable,
        }
    }
}

/// A linear expression: sum of terms plus constant
#[derive(Debug)]
pub struct LinearExpression<Brand> {
    pub terms: Vec<LinearTerm<Brand>>,
    pub constant: f64,
}

// Manual impl to avoid requiring `Brand: Clone` (the brand is phantom)
impl<Brand> Clone for LinearExpression<Brand> {
    fn clone(&self) -> Self {
        Self {
            terms: self.terms.clone(),
            constant: self.constant,
        }
    }
}

impl<Brand> LinearExpression<Brand> {
    /// Create a new linear expression with a constant term
    pub fn new(constant: f64) -> Self {
        Self {
            terms: Vec::new(),
            constant,
        }
    }

    /// Add a term to the expression
    pub fn add_term(&mut self, coefficient: f64, variable: VariableId<Brand>) {
        self.terms.push(LinearTerm {
            coefficient,
            variable,
        });
    }

    /// Create a linear expression from a single variable
    pub fn from_variable(variable: VariableId<Brand>) -> Self {
        Self {
            terms: vec![LinearTerm {
                coefficient: 1.0,
                variable,
            }],
            constant: 0.0,
        }
    }
}

impl<Brand> From<VariableId<Brand>> for LinearExpression<Brand> {
    fn from(variable: VariableId<Brand>) -> Self {
        Self::from_variable(variable)
    }
}

/// Unique identifier for a variable in the LP model.
///
/// The `Brand` type parameter ensures that variables can only be used with
/// the builder that created them. This is enforced at compile time.
pub struct VariableId<Brand> {
    id: usize,
    _brand: PhantomData<fn() -> Brand>,
}

impl<Brand> VariableId<Brand> {
    pub(crate) fn index(&self) -> usize {
        self.id
    }
}

// Manual trait implementations that don't require Brand to implement anything
impl<Brand> std::fmt::Debug for VariableId<Brand> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VariableId").field("id", &self.id).finish()
    }
}

impl<Brand> Clone for VariableId<Brand> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<Brand> Copy for VariableId<Brand> {}

impl<Brand> PartialEq for VariableId<Brand> {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl<Brand> Eq for VariableId<Brand> {}

impl<Brand> std::hash::Hash for VariableId<Brand> {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

/// Unique identifier for a constraint in the LP model
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConstraintId(usize);

/// A linear constraint: `expression SENSE rhs`.
///
/// The `Brand` type parameter ensures constraints can only use variables from
/// the builder that will consume them.
#[derive(Debug, Clone)]
pub struct Constraint<Brand> {
    pub(crate) expression: LinearExpression<Brand>,
    pub(crate) sense: ConstraintSense,
    pub(crate) rhs: f64,
}

impl<Brand> Constraint<Brand> {
    /// Create a new constraint
    pub fn new(
        expression: impl Into<LinearExpression<Brand>>,
        sense: ConstraintSense,
        rhs: f64,
    ) -> Self {
        Self {
            expression: expression.into(),
            sense,
            rhs,
        }
    }

    /// Create an equality constraint: expression == rhs
    pub fn eq(expression: impl Into<LinearExpression<Brand>>, rhs: f64) -> Self {
        Self::new(expression, ConstraintSense::Equal, rhs)
    }

    /// Create a less-than-or-equal constraint: expression <= rhs
    pub fn le(expression: impl Into<LinearExpression<Brand>>, rhs: f64) -> Self {
        Self::new(expression, ConstraintSense::LessEqual, rhs)
    }

    /// Create a greater-than-or-equal constraint: expression >= rhs
    pub fn ge(expression: impl Into<LinearExpression<Brand>>, rhs: f64) -> Self {
        Self::new(expression, ConstraintSense::GreaterEqual, rhs)
    }

    /// Create a strictly-greater-than constraint: expression > rhs
    pub fn gt(expression: impl Into<LinearExpression<Brand>>, rhs: f64) -> Self {
        Self::new(expression, ConstraintSense::Greater, rhs)
    }
}

/// Variable information stored in the model
#[derive(Debug, Clone)]
pub(crate) struct VariableInfo {
    pub(crate) var_type: VariableType,
    pub(crate) lower_bound: f64,
    pub(crate) upper_bound: f64,
}

/// Objective function information
#[derive(Debug, Clone)]
pub(crate) struct ObjectiveInfo<Brand> {
    pub(crate) expression: LinearExpression<Brand>,
    pub(crate) sense: OptimizationSense,
}

/// Result of solving an LP model.
///
/// `objective_value` and the per-variable values are meaningful only when
/// `status == SolveStatus::Optimal`.
#[derive(Debug, Clone)]
pub struct LPSolution<Brand> {
    pub status: SolveStatus,
    pub objective_value: f64,
    pub(crate) variable_values: Vec<f64>,
    pub(crate) _brand: PhantomData<fn() -> Brand>,
}

impl<Brand> LPSolution<Brand> {
    /// Get the value of a variable from the solution
    pub fn get_value(&self, var_id: VariableId<Brand>) -> Option<f64> {
        self.variable_values.get(var_id.id).copied()
    }
}

/// Builder for LP models that can be solved by different backends.
///
/// Every builder starts empty; each `add_variable` call allocates a fresh
/// decision variable, so independently built models never share state.
pub struct LPModelBuilder<Brand> {
    pub(crate) variables: Vec<VariableInfo>,
    pub(crate) constraints: Vec<Constraint<Brand>>,
    pub(crate) objective: Option<ObjectiveInfo<Brand>>,
    _brand: PhantomData<fn() -> Brand>,
}

impl<Brand> LPModelBuilder<Brand> {
    /// Create a new LP model builder
    pub fn new() -> Self {
        Self {
            variables: Vec::new(),
            constraints: Vec::new(),
            objective: None,
            _brand: PhantomData,
        }
    }

    /// Add a variable to the model
    pub fn add_variable(
        &mut self,
        var_type: VariableType,
        lower_bound: f64,
        upper_bound: f64,
    ) -> VariableId<Brand> {
        let var_id = VariableId {
            id: self.variables.len(),
            _brand: PhantomData,
        };
        self.variables.push(VariableInfo {
            var_type,
            lower_bound,
            upper_bound,
        });
        var_id
    }

    /// Add a constraint to the model
    pub fn add_constraint(&mut self, constraint: Constraint<Brand>) -> ConstraintId {
        let constr_id = ConstraintId(self.constraints.len());
        self.constraints.push(constraint);
        constr_id
    }

    /// Set the objective function
    pub fn set_objective(
        &mut self,
        expression: impl Into<LinearExpression<Brand>>,
        sense: OptimizationSense,
    ) {
        self.objective = Some(ObjectiveInfo {
            expression: expression.into(),
            sense,
        });
    }

    pub fn num_variables(&self) -> usize {
        self.variables.len()
    }

    pub fn num_constraints(&self) -> usize {
        self.constraints.len()
    }

    /// Solve the model with the selected backend.
    ///
    /// The builder is not consumed; a failed external solve can be retried
    /// against the bundled backend with the same model.
    pub fn solve(&self, config: &SolverConfig) -> Result<LPSolution<Brand>> {
        match config.backend {
            #[cfg(feature = "coin_cbc")]
            SolverBackend::CoinCbc => crate::lp_solver::coin_cbc::solve_coin_cbc(self),

            SolverBackend::Glpsol => {
                crate::lp_solver::glpsol::solve_glpsol(self, config.glpsol_path.as_deref())
            }
        }
    }
}

impl<Brand> Default for LPModelBuilder<Brand> {
    fn default() -> Self {
        Self::new()
    }
}

// Macros for convenient syntax
pub mod macros;

// Operator overloading for linear expressions
pub mod ops;

pub mod glpsol;

pub mod output_suppression;

#[cfg(feature = "coin_cbc")]
pub mod coin_cbc;
