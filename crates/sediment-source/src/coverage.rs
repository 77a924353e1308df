use std::path::Path;

/// What the coverage gap heuristic found for one file.
#[derive(Debug, Clone)]
pub struct CoverageEvidence {
    /// Normalized 0-100 gap score. Lower means better evidence of testing.
    pub raw_score: f64,
    /// Human-readable note on the evidence used.
    pub detail: String,
}

/// Estimate how untested a file is, without running anything.
///
/// An lcov report that mentions the file, or a co-located test file
/// following a common naming convention, counts as moderate evidence
/// (gap 30). No evidence at all is a high gap (80). Test files
/// themselves have no gap.
pub fn assess_coverage_gap(workspace: &Path, relative_path: &str) -> CoverageEvidence {
    if is_test_file(relative_path) {
        return CoverageEvidence {
            raw_score: 0.0,
            detail: "test file".to_string(),
        };
    }

    let lcov_path = workspace.join("coverage/lcov.info");
    if lcov_path.exists() {
        return lcov_evidence(&lcov_path, relative_path);
    }

    let path = Path::new(relative_path);
    let stem = path.file_stem().unwrap_or_default().to_string_lossy();
    let ext = path.extension().unwrap_or_default().to_string_lossy();
    let parent = path.parent().unwrap_or(Path::new(""));

    let candidates = [
        parent.join(format!("{stem}.test.{ext}")),
        parent.join(format!("{stem}.spec.{ext}")),
        parent.join(format!("test_{stem}.{ext}")),
        parent.join(format!("{stem}_test.{ext}")),
        Path::new("tests").join(format!("test_{stem}.{ext}")),
        Path::new("test").join(format!("{stem}_test.{ext}")),
        parent.join("__tests__").join(format!("{stem}.test.{ext}")),
    ];

    for candidate in &candidates {
        if workspace.join(candidate).exists() {
            return CoverageEvidence {
                raw_score: 30.0,
                detail: format!("tests at {}", candidate.display()),
            };
        }
    }

    CoverageEvidence {
        raw_score: 80.0,
        detail: "no test file found".to_string(),
    }
}

fn lcov_evidence(lcov_path: &Path, relative_path: &str) -> CoverageEvidence {
    if let Ok(content) = std::fs::read_to_string(lcov_path) {
        if content.contains(relative_path) {
            return CoverageEvidence {
                raw_score: 30.0,
                detail: "listed in coverage report".to_string(),
            };
        }
    }
    CoverageEvidence {
        raw_score: 80.0,
        detail: "absent from coverage report".to_string(),
    }
}

fn is_test_file(relative_path: &str) -> bool {
    let path = Path::new(relative_path);
    let stem = path.file_stem().unwrap_or_default().to_string_lossy();
    stem.ends_with(".test")
        || stem.ends_with(".spec")
        || stem.starts_with("test_")
        || stem.ends_with("_test")
        || relative_path
            .split('/')
            .any(|c| c == "tests" || c == "test" || c == "__tests__")
}
