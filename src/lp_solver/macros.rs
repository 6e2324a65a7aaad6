//! Macros for the LP solver module.
//!
//! These provide convenient syntax for creating branded model builders and
//! constraints.

/// Create a new LP model builder with a unique brand.
///
/// Each macro invocation defines a fresh local brand type, so variables from
/// different builders cannot be mixed at compile time.
///
/// # Examples
///
/// ```rust
/// use blendopt::lp_model_builder;
/// use blendopt::lp_solver::VariableType;
///
/// // Anonymous brand (each call creates a unique anonymous type)
/// let mut builder = lp_model_builder!();
/// let x = builder.add_variable(VariableType::Continuous, 0.0, 10.0);
///
/// // Named brand (easier to identify in type errors)
/// let mut blend_model = lp_model_builder!(BlendModel);
/// let _v = blend_model.add_variable(VariableType::Continuous, 0.0, 100.0);
/// ```
#[macro_export]
macro_rules! lp_model_builder {
    // Named brand - user provides the brand name
    ($brand_name:ident) => {{
        struct $brand_name;
        $crate::lp_solver::LPModelBuilder::<$brand_name>::new()
    }};

    // Anonymous brand - `UniqueBrand` is defined locally within the `{{ ... }}`
    // block, so each invocation gets its own distinct type
    () => {{
        struct UniqueBrand;
        $crate::lp_solver::LPModelBuilder::<UniqueBrand>::new()
    }};
}

/// Create constraints using natural comparison syntax.
///
/// The left-hand side must be in parentheses.
///
/// # Examples
///
/// ```rust
/// use blendopt::constraint;
/// use blendopt::lp_model_builder;
/// use blendopt::lp_solver::VariableType;
///
/// let mut builder = lp_model_builder!();
/// let x = builder.add_variable(VariableType::Continuous, 0.0, 10.0);
/// let y = builder.add_variable(VariableType::Continuous, 0.0, 10.0);
///
/// builder.add_constraint(constraint!((x + y) == 10.0));
/// builder.add_constraint(constraint!((2.0 * x) <= 5.0));
/// builder.add_constraint(constraint!((x - y) >= 0.0));
/// builder.add_constraint(constraint!((x) > 1.0));
/// ```
#[macro_export]
macro_rules! constraint {
    (($lhs:expr) == $rhs:expr) => {
        $crate::lp_solver::Constraint::new(
            $lhs,
            $crate::lp_solver::ConstraintSense::Equal,
            $rhs as f64,
        )
    };
    (($lhs:expr) <= $rhs:expr) => {
        $crate::lp_solver::Constraint::new(
            $lhs,
            $crate::lp_solver::ConstraintSense::LessEqual,
            $rhs as f64,
        )
    };
    (($lhs:expr) >= $rhs:expr) => {
        $crate::lp_solver::Constraint::new(
            $lhs,
            $crate::lp_solver::ConstraintSense::GreaterEqual,
            $rhs as f64,
        )
    };
    (($lhs:expr) > $rhs:expr) => {
        $crate::lp_solver::Constraint::new(
            $lhs,
            $crate::lp_solver::ConstraintSense::Greater,
            $rhs as f64,
        )
    };
}
