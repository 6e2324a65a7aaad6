//! Report assembler.
//!
//! Renders the structured pipeline results as plain text with prettytable
//! tables. Nothing in here feeds back into the optimization; the assembler
//! only consumes [`PipelineOutcome`] and the case it came from.

use std::fmt::Write;

use prettytable::{format, row, Table};

use crate::blend::{BlendCase, PropertyBounds, Symbol};
use crate::diagnose::{BoundDetail, Diagnosis, DiagnosisReport};
use crate::lp_solver::SolveStatus;
use crate::optimize::{GradeResult, PipelineOutcome, SolvedGrade};

fn heading(out: &mut String, title: &str) {
    let _ = writeln!(out, "{}", "=".repeat(80));
    let _ = writeln!(out, "{}", title);
    let _ = writeln!(out, "{}", "=".repeat(80));
}

/// Concise numeric rendering for spec windows: integers without a decimal
/// point, unbounded sides as "inf".
fn concise(value: f64) -> String {
    if value.is_infinite() {
        "inf".to_string()
    } else if value == value.trunc() && value.abs() < 1e12 {
        format!("{}", value as i64)
    } else {
        format!("{}", value)
    }
}

fn window_string(window: &PropertyBounds) -> String {
    if window.max.is_infinite() {
        format!(">= {}", concise(window.min))
    } else if window.min == 0.0 {
        format!("<= {}", concise(window.max))
    } else {
        format!("{}-{}", concise(window.min), concise(window.max))
    }
}

fn new_table() -> Table {
    let mut table = Table::new();
    table.set_format(*format::consts::FORMAT_NO_LINESEP_WITH_TITLE);
    table
}

/// Render the main optimization report.
pub fn render_result(case: &BlendCase, outcome: &PipelineOutcome) -> String {
    let mut out = String::new();
    heading(&mut out, "GASOLINE BLENDING OPTIMIZATION REPORT");

    let _ = writeln!(out, "Overall Status: {}", outcome.combined_status);
    let _ = writeln!(out, "Solver Used: {}", outcome.solver_label);
    if let Some(profit) = outcome.combined_profit {
        let _ = writeln!(out, "Objective Value (Profit): {:.2}", profit);
    }
    let _ = writeln!(out);

    let _ = writeln!(out, "=== Gasoline Grade Overview ===");
    let mut overview = new_table();
    overview.set_titles(row!["GASOLINE", "MIN", "MAX", "PRICE"]);
    for grade in &case.grades {
        overview.add_row(row![
            grade.name,
            format!("{:.0}", grade.min_volume),
            concise(grade.max_volume),
            format!("{:.0}", grade.price),
        ]);
    }
    let _ = writeln!(out, "{}", overview);

    for report in &outcome.grades {
        let _ = writeln!(out, "{}", "=".repeat(60));
        let _ = writeln!(out, "{} GASOLINE", report.grade.name);
        let _ = writeln!(out, "{}", "=".repeat(60));
        let _ = writeln!(out, "Price: ${:.2}/bbl", report.grade.price);

        match &report.result {
            GradeResult::Solved(solved) => {
                let _ = writeln!(out, "Status: {}", SolveStatus::Optimal);
                render_solved_grade(&mut out, case, &report.grade.name, solved);
            }
            GradeResult::Diagnosed(_) => {
                let _ = writeln!(out, "Status: {}", SolveStatus::Infeasible);
                let _ = writeln!(out);
                let _ = writeln!(
                    out,
                    "INFEASIBILITY ANALYSIS: see the infeasibility analysis report"
                );
                let _ = writeln!(out);
            }
        }
    }

    let _ = writeln!(out, "=== Component Summary ===");
    let mut summary = new_table();
    summary.set_titles(row!["Component", "Available (bbl)", "Used (bbl)"]);
    for usage in &outcome.component_usage {
        summary.add_row(row![
            usage.name,
            concise(usage.available),
            format!("{:.2}", usage.used),
        ]);
    }
    let _ = writeln!(out, "{}", summary);

    out
}

fn render_solved_grade(out: &mut String, case: &BlendCase, grade: &Symbol, solved: &SolvedGrade) {
    let _ = writeln!(out);
    let _ = writeln!(out, "Total Volume: {:.2} bbl", solved.total_volume);
    let _ = writeln!(out, "Total Cost: ${:.2}", solved.total_cost);
    let _ = writeln!(out, "Total Revenue: ${:.2}", solved.total_revenue);
    let _ = writeln!(out, "Profit: ${:.2}", solved.profit);
    let _ = writeln!(out);

    let mut table = new_table();
    let mut titles = row!["Component", "Vol (bbl)", "Cost ($)"];
    for property in &case.properties {
        titles.add_cell(prettytable::Cell::new(property.as_ref()));
    }
    table.set_titles(titles);

    for (c, component) in case.components.iter().enumerate() {
        let mut cells = row![
            component.name,
            format!("{:.2}", solved.volumes[c]),
            format!("{:.2}", case.component_cost(component)),
        ];
        for property in &case.properties {
            let value = component.properties.get(property).copied().unwrap_or(0.0);
            cells.add_cell(prettytable::Cell::new(&format!("{:.4}", value)));
        }
        table.add_row(cells);
    }

    // TOTAL, achieved QUALITY, and the SPEC window for comparison
    let mut total_row = row![
        "TOTAL",
        format!("{:.2}", solved.total_volume),
        format!("{:.2}", solved.total_cost),
    ];
    for _ in &case.properties {
        total_row.add_cell(prettytable::Cell::new(""));
    }
    table.add_row(total_row);

    let mut quality_row = row!["QUALITY", "", ""];
    for (_, value) in &solved.achieved {
        quality_row.add_cell(prettytable::Cell::new(&format!("{:.4}", value)));
    }
    table.add_row(quality_row);

    let mut spec_row = row!["SPEC", "", ""];
    for property in &case.properties {
        let window = case.display_bounds(property, grade);
        spec_row.add_cell(prettytable::Cell::new(&window_string(&window)));
    }
    table.add_row(spec_row);

    let _ = writeln!(out, "{}", table);
}

/// Render the infeasibility analysis for every diagnosed grade, or `None`
/// when no grade needed one.
pub fn render_infeasibility(outcome: &PipelineOutcome) -> Option<String> {
    if !outcome.has_diagnoses() {
        return None;
    }

    let mut out = String::new();
    heading(&mut out, "GRADE INFEASIBILITY ANALYSIS REPORT");

    for report in &outcome.grades {
        let GradeResult::Diagnosed(diagnosis) = &report.result else {
            continue;
        };
        let _ = writeln!(out, "{} GASOLINE", report.grade.name);
        let _ = writeln!(out, "{}", "-".repeat(60));
        match diagnosis {
            Diagnosis::ActuallyFeasible => {
                let _ = writeln!(out, "Model solved on re-check; no analysis needed.");
            }
            Diagnosis::Inconclusive => {
                let _ = writeln!(
                    out,
                    "Not even pairwise constraint removal restores feasibility."
                );
                let _ = writeln!(
                    out,
                    "This problem may require significant specification changes."
                );
            }
            Diagnosis::Analysis(analysis) => render_diagnosis(&mut out, analysis),
        }
        let _ = writeln!(out);
        let _ = writeln!(out, "{}", "=".repeat(80));
        let _ = writeln!(out);
    }

    Some(out)
}

fn relax_line(bound: &BoundDetail, delta: f64, relaxed_value: f64) -> String {
    match bound.key.side {
        crate::blend::BoundSide::Min => format!(
            "Change {} from >= {:.4} to >= {:.4} (reduce minimum by {:.4})",
            bound.key.property, bound.value, relaxed_value, delta
        ),
        crate::blend::BoundSide::Max => format!(
            "Change {} from <= {:.4} to <= {:.4} (increase maximum by {:.4})",
            bound.key.property, bound.value, relaxed_value, delta
        ),
    }
}

fn render_diagnosis(out: &mut String, analysis: &DiagnosisReport) {
    let _ = writeln!(out, "1. CONFIRMED: model is infeasible as stated");
    let _ = writeln!(out);

    let _ = writeln!(out, "2. CRITICAL CONSTRAINT IDENTIFICATION");
    if analysis.via_pair {
        let _ = writeln!(out, "   No single bound removal restores feasibility.");
        let _ = writeln!(
            out,
            "   CRITICAL PAIR: {} AND {}",
            analysis.critical[0].describe(),
            analysis.critical[1].describe()
        );
    } else {
        for bound in &analysis.critical {
            let _ = writeln!(out, "   CRITICAL: {}", bound.describe());
            if let Some(achieved) = bound.achieved_without {
                let _ = writeln!(
                    out,
                    "       Without this constraint, {} = {:.3}",
                    bound.key.property, achieved
                );
            }
        }
    }
    let _ = writeln!(out);

    let _ = writeln!(out, "3. FEASIBILITY PATHS");
    if analysis.paths.is_empty() {
        let _ = writeln!(out, "   No single-bound relaxation restores feasibility.");
    }
    for (i, path) in analysis.paths.iter().enumerate() {
        let _ = writeln!(out, "PATH {}: RELAX {}", i + 1, path.bound.describe());
        let _ = writeln!(
            out,
            "   SOLUTION: {}",
            relax_line(&path.bound, path.delta, path.relaxed_value)
        );
        let _ = writeln!(
            out,
            "   RESULT: {:.0} bbl, Profit: ${:.2}",
            path.outcome.total_volume, path.outcome.profit
        );

        let _ = writeln!(out, "   ACHIEVED PROPERTIES:");
        let mut table = new_table();
        table.set_titles(row!["Property", "Achieved", "Spec"]);
        for (property, value, window) in &path.outcome.achieved {
            table.add_row(row![
                property,
                format!("{:.4}", value),
                window_string(window),
            ]);
        }
        let _ = writeln!(out, "{}", table);
    }
    let _ = writeln!(out);

    if !analysis.combinations.is_empty() {
        let _ = writeln!(out, "4. COMBINATION SOLUTIONS");
        let _ = writeln!(out, "   (smaller relaxations across two constraints)");
        for (i, combo) in analysis.combinations.iter().enumerate() {
            let _ = writeln!(out, "   COMBINATION {}:", i + 1);
            for k in 0..2 {
                let _ = writeln!(
                    out,
                    "   - {}",
                    relax_line(&combo.bounds[k], combo.deltas[k], combo.relaxed_values[k])
                );
            }
            let _ = writeln!(
                out,
                "   - Result: {:.0} bbl, Profit: ${:.2}",
                combo.total_volume, combo.profit
            );
            let _ = writeln!(out);
        }
    }

    let _ = writeln!(out, "5. FEASIBILITY SUMMARY & RECOMMENDATIONS");
    let _ = writeln!(out, "{}", "=".repeat(50));
    if !analysis.paths.is_empty() {
        let _ = writeln!(out, "Single constraint solutions, smallest relaxation first:");
        for (i, path) in analysis.paths.iter().enumerate() {
            let _ = writeln!(
                out,
                "{}. {} - relax by {:.4} (Profit: ${:.2})",
                i + 1,
                path.bound.describe(),
                path.delta,
                path.outcome.profit
            );
        }
        let recommended = &analysis.paths[0];
        let _ = writeln!(out);
        let _ = writeln!(out, "RECOMMENDED: {}", recommended.bound.describe());
        let _ = writeln!(
            out,
            "  Requires the smallest relaxation ({:.4}) with profit ${:.2}",
            recommended.delta, recommended.outcome.profit
        );
        if analysis.paths.len() > 1 {
            let _ = writeln!(out, "ALTERNATIVES:");
            for path in analysis.paths.iter().skip(1).take(2) {
                let _ = writeln!(
                    out,
                    "  - {} - relax by {:.4} (Profit: ${:.2})",
                    path.bound.describe(),
                    path.delta,
                    path.outcome.profit
                );
            }
        }
    }
    if let Some(best) = analysis.combinations.first() {
        let _ = writeln!(out, "BEST COMBINATION:");
        let _ = writeln!(
            out,
            "  Total relaxation {:.4}, Profit: ${:.2}",
            best.total_relaxation(),
            best.profit
        );
        for k in 0..2 {
            let _ = writeln!(
                out,
                "  - {}: relax by {:.4}",
                best.bounds[k].describe(),
                best.deltas[k]
            );
        }
    }
}
