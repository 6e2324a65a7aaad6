use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

use blendopt::blend::{BlendCase, Symbol, defaults::default_case};

// Helper function to write a case to a temporary file
fn write_case_file(case: &BlendCase) -> (TempDir, PathBuf) {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let file_path = temp_dir.path().join("case.json");
    case.save(&file_path).expect("Failed to write case file");
    (temp_dir, file_path)
}

#[test]
fn test_template_round_trip() {
    let case = default_case();
    let (_dir, path) = write_case_file(&case);

    let loaded = BlendCase::load(&path).expect("Failed to reload case");
    assert_eq!(loaded.grades.len(), case.grades.len());
    assert_eq!(loaded.components.len(), case.components.len());
    assert_eq!(loaded.properties, case.properties);

    // Unbounded spec sides survive the JSON round trip
    let sul = loaded.display_bounds(&Symbol::from("SUL"), &Symbol::from("Regular"));
    assert_eq!(sul.min, 0.0);
    assert_eq!(sul.max, 10.0);
    let e15 = loaded.display_bounds(&Symbol::from("E15"), &Symbol::from("Premium"));
    assert_eq!(e15.min, 76.0);
    assert!(e15.max.is_infinite());
}

#[test]
fn test_load_rejects_invalid_case() {
    let mut case = default_case();
    case.components.clear();
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let file_path = temp_dir.path().join("empty.json");
    fs::write(
        &file_path,
        serde_json::to_string(&case).expect("serialization failed"),
    )
    .expect("Failed to write case file");

    assert!(BlendCase::load(&file_path).is_err());
}

#[cfg(feature = "coin_cbc")]
mod pipeline_tests {
    use super::*;
    use blendopt::blend::{BoundSide, PropertyBounds};
    use blendopt::diagnose::Diagnosis;
    use blendopt::lp_solver::{SolveStatus, SolverConfig};
    use blendopt::optimize::{GradeResult, run_pipeline};

    /// The built-in default case solves to optimality and the blend respects
    /// every volume window and the pooled component availability.
    #[test]
    fn test_default_case_solves() {
        let case = default_case();
        let outcome =
            run_pipeline(&case, &SolverConfig::bundled()).expect("pipeline should not error");

        assert_eq!(outcome.combined_status, SolveStatus::Optimal);
        let profit = outcome.combined_profit.expect("optimal run reports profit");
        assert!(profit > 0.0);

        assert_eq!(outcome.grades.len(), case.grades.len());
        for (report, grade) in outcome.grades.iter().zip(&case.grades) {
            let GradeResult::Solved(solved) = &report.result else {
                panic!("grade {} should be solved", grade.name);
            };
            for &v in &solved.volumes {
                assert!(v >= -1e-6, "negative component volume in {}", grade.name);
            }
            assert!(solved.total_volume >= grade.min_volume - 1e-6);
            assert!(solved.total_volume <= grade.max_volume + 1e-6);
        }

        for usage in &outcome.component_usage {
            assert!(
                usage.used <= usage.available + 1e-6,
                "component {} over-used",
                usage.name
            );
        }
    }

    /// Two runs of the same case agree, at least to the cent.
    #[test]
    fn test_default_case_reproducible() {
        let case = default_case();
        let config = SolverConfig::bundled();
        let first = run_pipeline(&case, &config).expect("first run failed");
        let second = run_pipeline(&case, &config).expect("second run failed");

        let p1 = first.combined_profit.expect("first run not optimal");
        let p2 = second.combined_profit.expect("second run not optimal");
        assert!(
            (p1 - p2).abs() < 0.01,
            "profit drifted between runs: {} vs {}",
            p1,
            p2
        );
    }

    /// An unreachable RON floor on one grade leaves the others solvable and
    /// produces a diagnosis naming that floor as the sole critical bound.
    #[test]
    fn test_unreachable_octane_floor_is_diagnosed() {
        let mut case = default_case();
        let super_premium = Symbol::from("Super Premium");
        case.specs
            .get_mut(&Symbol::from("RON"))
            .expect("default case specs RON")
            .insert(
                super_premium.clone(),
                PropertyBounds {
                    min: 150.0,
                    max: f64::INFINITY,
                },
            );

        let outcome =
            run_pipeline(&case, &SolverConfig::bundled()).expect("pipeline should not error");
        assert_ne!(outcome.combined_status, SolveStatus::Optimal);

        let mut saw_diagnosis = false;
        for report in &outcome.grades {
            if report.grade.name != super_premium {
                assert!(
                    matches!(report.result, GradeResult::Solved(_)),
                    "grade {} should still solve",
                    report.grade.name
                );
                continue;
            }
            let GradeResult::Diagnosed(Diagnosis::Analysis(analysis)) = &report.result else {
                panic!("Super Premium should be diagnosed with an analysis");
            };
            saw_diagnosis = true;

            assert!(!analysis.via_pair);
            assert_eq!(analysis.critical.len(), 1);
            assert_eq!(analysis.critical[0].key.property, Symbol::from("RON"));
            assert_eq!(analysis.critical[0].key.side, BoundSide::Min);

            assert!(!analysis.paths.is_empty());
            let path = &analysis.paths[0];
            assert!(path.relaxed_value < 150.0);
            assert!(path.outcome.total_volume > 0.0);
        }
        assert!(saw_diagnosis);
    }

    /// Optimizing a case loaded from disk matches optimizing the in-memory
    /// original.
    #[test]
    fn test_pipeline_from_file_matches_in_memory() {
        let case = default_case();
        let (_dir, path) = write_case_file(&case);
        let loaded = BlendCase::load(&path).expect("Failed to reload case");

        let config = SolverConfig::bundled();
        let from_memory = run_pipeline(&case, &config).expect("in-memory run failed");
        let from_file = run_pipeline(&loaded, &config).expect("file run failed");

        let p1 = from_memory.combined_profit.expect("not optimal");
        let p2 = from_file.combined_profit.expect("not optimal");
        assert!((p1 - p2).abs() < 0.01);
    }
}
