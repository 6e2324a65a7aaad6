//! Bundled COIN-OR CBC backend.

use crate::lp_solver::output_suppression::GagHandle;
use crate::lp_solver::*;
use ::coin_cbc::{Model, Sense};

/// Round a floating-point number to a specified number of significant digits.
/// This is a workaround to mask floating point noise in CBC solutions.
fn round_to_sig_digits(value: f64, digits: u32) -> f64 {
    if value == 0.0 {
        return 0.0;
    }

    let magnitude = value.abs().log10().floor() as i32;
    let scale = 10_f64.powi(digits as i32 - magnitude - 1);
    (value * scale).round() / scale
}

/// Solve an LP model using Coin CBC
pub fn solve_coin_cbc<Brand>(builder: &LPModelBuilder<Brand>) -> Result<LPSolution<Brand>> {
    // Redirect CBC's verbose output away from the terminal
    let _gag_handle = GagHandle::stdout()?;
    let mut model = Model::default();

    // Columns indexed by VariableId order
    let mut cols = Vec::with_capacity(builder.variables.len());
    for var_info in &builder.variables {
        let col = match var_info.var_type {
            VariableType::Continuous => {
                let col = model.add_col();
                model.set_col_lower(col, var_info.lower_bound);
                model.set_col_upper(col, var_info.upper_bound);
                col
            }
            VariableType::Integer => {
                let col = model.add_integer();
                model.set_col_lower(col, var_info.lower_bound);
                model.set_col_upper(col, var_info.upper_bound);
                col
            }
            VariableType::Binary => model.add_binary(),
        };
        cols.push(col);
    }

    for constraint in &builder.constraints {
        let row = model.add_row();

        for term in &constraint.expression.terms {
            model.set_weight(row, cols[term.variable.index()], term.coefficient);
        }

        // Fold the expression's constant term into the right-hand side
        let rhs_adjusted = constraint.rhs - constraint.expression.constant;

        match constraint.sense {
            ConstraintSense::LessEqual => {
                model.set_row_upper(row, rhs_adjusted);
            }
            ConstraintSense::Equal => {
                model.set_row_equal(row, rhs_adjusted);
            }
            ConstraintSense::GreaterEqual => {
                model.set_row_lower(row, rhs_adjusted);
            }
            ConstraintSense::Greater => {
                // CBC doesn't support strict inequalities, use >= with small epsilon
                model.set_row_lower(row, rhs_adjusted + 1e-10);
            }
        }
    }

    if let Some(obj_info) = &builder.objective {
        for term in &obj_info.expression.terms {
            model.set_obj_coeff(cols[term.variable.index()], term.coefficient);
        }

        let sense = match obj_info.sense {
            OptimizationSense::Minimize => Sense::Minimize,
            OptimizationSense::Maximize => Sense::Maximize,
        };

        model.set_obj_sense(sense);
    }

    let solution = model.solve();

    let status = if solution.raw().is_proven_optimal() {
        SolveStatus::Optimal
    } else if solution.raw().is_proven_infeasible() {
        SolveStatus::Infeasible
    } else if solution.raw().is_continuous_unbounded() {
        SolveStatus::Unbounded
    } else {
        SolveStatus::Undefined
    };

    let mut variable_values = vec![0.0; builder.variables.len()];
    if status == SolveStatus::Optimal {
        for (idx, col) in cols.iter().enumerate() {
            variable_values[idx] = round_to_sig_digits(solution.col(*col), 8);
        }
    }

    let objective_value = if status == SolveStatus::Optimal {
        if let Some(obj_info) = &builder.objective {
            let mut obj_val = obj_info.expression.constant;
            for term in &obj_info.expression.terms {
                obj_val += term.coefficient * variable_values[term.variable.index()];
            }
            round_to_sig_digits(obj_val, 8)
        } else {
            0.0
        }
    } else {
        0.0
    };

    Ok(LPSolution {
        status,
        objective_value,
        variable_values,
        _brand: std::marker::PhantomData,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_to_sig_digits() {
        assert_eq!(round_to_sig_digits(0.0, 8), 0.0);
        assert!((round_to_sig_digits(123.456789123, 8) - 123.45679).abs() < 1e-9);
        assert!((round_to_sig_digits(0.000123456789, 3) - 0.000123).abs() < 1e-12);
        assert!((round_to_sig_digits(-98.7654321, 4) + 98.77).abs() < 1e-9);
    }
}
