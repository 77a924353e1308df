use std::path::Path;

/// Score how stale the recorded design decisions behind a file are.
///
/// Looks for a decision record named after the file, either under
/// `.sediment/adrs/` or sitting next to the file as `{stem}.adr.md`.
/// A record reviewed within 30 days scores 0, one untouched for more
/// than 180 days scores 100, with a linear ramp between. A record
/// without a parseable review date scores 50. Files with no record at
/// all are only penalized (50) when they are already smelly, on the
/// theory that messy code with no written rationale is where decisions
/// quietly rot.
pub fn compute_staleness(workspace: &Path, relative_path: &str, smell_raw: f64) -> f64 {
    let adrs_dir = workspace.join(".sediment/adrs");
    let file = Path::new(relative_path);
    let stem = file.file_stem().unwrap_or_default().to_string_lossy();
    let file_dir = workspace.join(file.parent().unwrap_or(Path::new("")));

    let candidates = [
        adrs_dir.join(format!("{stem}.adr.md")),
        adrs_dir.join(format!("{stem}.md")),
        file_dir.join(format!("{stem}.adr.md")),
    ];

    for adr_path in &candidates {
        if !adr_path.exists() {
            continue;
        }
        if let Ok(content) = std::fs::read_to_string(adr_path) {
            if let Some(days) = days_since_review(&content) {
                if days < 30 {
                    return 0.0;
                }
                if days > 180 {
                    return 100.0;
                }
                return ((days - 30) as f64 / 150.0 * 100.0).min(100.0);
            }
        }
        // Record exists but carries no review date
        return 50.0;
    }

    if smell_raw > 30.0 {
        return 50.0;
    }
    0.0
}

fn days_since_review(content: &str) -> Option<i64> {
    for line in content.lines() {
        let lowered = line.trim().to_lowercase();
        if lowered.starts_with("last_reviewed_at:")
            || lowered.starts_with("reviewed:")
            || lowered.starts_with("last-reviewed:")
        {
            let date_str = line.split(':').skip(1).collect::<Vec<&str>>().join(":");
            if let Ok(date) = chrono::NaiveDate::parse_from_str(date_str.trim(), "%Y-%m-%d") {
                let today = chrono::Utc::now().date_naive();
                return Some(today.signed_duration_since(date).num_days());
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn date_days_ago(days: i64) -> String {
        let date = chrono::Utc::now().date_naive() - chrono::Duration::days(days);
        date.format("%Y-%m-%d").to_string()
    }

    fn write_adr(root: &Path, name: &str, body: &str) {
        let dir = root.join(".sediment/adrs");
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join(name), body).unwrap();
    }

    #[test]
    fn recently_reviewed_record_scores_zero() {
        let dir = tempfile::tempdir().unwrap();
        write_adr(
            dir.path(),
            "engine.adr.md",
            &format!("last_reviewed_at: {}\n\nKeep the engine.\n", date_days_ago(10)),
        );
        assert_eq!(compute_staleness(dir.path(), "src/engine.rs", 0.0), 0.0);
    }

    #[test]
    fn old_record_saturates() {
        let dir = tempfile::tempdir().unwrap();
        write_adr(
            dir.path(),
            "engine.adr.md",
            &format!("reviewed: {}\n", date_days_ago(400)),
        );
        assert_eq!(compute_staleness(dir.path(), "src/engine.rs", 0.0), 100.0);
    }

    #[test]
    fn mid_range_review_interpolates() {
        let dir = tempfile::tempdir().unwrap();
        write_adr(
            dir.path(),
            "engine.md",
            &format!("last-reviewed: {}\n", date_days_ago(105)),
        );
        let score = compute_staleness(dir.path(), "src/engine.rs", 0.0);
        assert!((45.0..=55.0).contains(&score), "got {score}");
    }

    #[test]
    fn record_without_date_is_moderate() {
        let dir = tempfile::tempdir().unwrap();
        write_adr(dir.path(), "engine.adr.md", "Some rationale, no dates.\n");
        assert_eq!(compute_staleness(dir.path(), "src/engine.rs", 0.0), 50.0);
    }

    #[test]
    fn co_located_record_is_found() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        fs::create_dir_all(root.join("src")).unwrap();
        fs::write(
            root.join("src/engine.adr.md"),
            format!("last_reviewed_at: {}\n", date_days_ago(5)),
        )
        .unwrap();
        assert_eq!(compute_staleness(root, "src/engine.rs", 0.0), 0.0);
    }

    #[test]
    fn no_record_penalizes_only_smelly_files() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(compute_staleness(dir.path(), "src/clean.rs", 10.0), 0.0);
        assert_eq!(compute_staleness(dir.path(), "src/messy.rs", 45.0), 50.0);
    }
}
