use sediment_core::{FileScore, SupervisionStatus};

/// Margin a previously accepted file's composite may rise before the
/// acknowledgement flips to [`SupervisionStatus::Regressed`].
pub(crate) const REGRESSION_MARGIN: f64 = 1.0;

/// An unchanged mtime means the cached score is still valid.
pub(crate) fn is_unchanged(prior: &FileScore, last_modified: i64) -> bool {
    prior.last_modified == last_modified
}

/// Carry the prior acknowledgement onto a fresh score, flipping
/// `acceptable` to `regressed` when the composite rose by more than
/// [`REGRESSION_MARGIN`].
pub(crate) fn carry_supervision(prior: &FileScore, fresh: &mut FileScore) {
    fresh.supervision_status = prior.supervision_status;
    if prior.supervision_status == SupervisionStatus::Acceptable
        && fresh.composite_score > prior.composite_score + REGRESSION_MARGIN
    {
        fresh.supervision_status = SupervisionStatus::Regressed;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sediment_core::{ComponentScore, ScoreComponents};
    use std::path::PathBuf;

    fn make_score(raw: f64, status: SupervisionStatus) -> FileScore {
        let components = ScoreComponents::uniform(ComponentScore::new(raw, 0.125, vec![]));
        FileScore {
            path: PathBuf::from("/repo/a.rs"),
            relative_path: "a.rs".into(),
            composite_score: components.composite(),
            components,
            loc: 10,
            language: "rust".into(),
            last_modified: 1_700_000_000,
            supervision_status: status,
        }
    }

    #[test]
    fn unchanged_mtime_reuses_the_cached_score() {
        let prior = make_score(40.0, SupervisionStatus::None);
        assert!(is_unchanged(&prior, 1_700_000_000));
        assert!(!is_unchanged(&prior, 1_700_000_001));
    }

    #[test]
    fn acknowledgement_carries_onto_the_fresh_score() {
        let prior = make_score(40.0, SupervisionStatus::Acceptable);
        let mut fresh = make_score(40.5, SupervisionStatus::None);
        carry_supervision(&prior, &mut fresh);
        assert_eq!(fresh.supervision_status, SupervisionStatus::Acceptable);
    }

    #[test]
    fn rise_beyond_margin_regresses_an_accepted_file() {
        let prior = make_score(40.0, SupervisionStatus::Acceptable);
        let mut fresh = make_score(41.5, SupervisionStatus::None);
        carry_supervision(&prior, &mut fresh);
        assert_eq!(fresh.supervision_status, SupervisionStatus::Regressed);
    }

    #[test]
    fn rise_within_margin_keeps_the_acknowledgement() {
        let prior = make_score(40.0, SupervisionStatus::Acceptable);
        let mut fresh = make_score(41.0, SupervisionStatus::None);
        carry_supervision(&prior, &mut fresh);
        assert_eq!(fresh.supervision_status, SupervisionStatus::Acceptable);
    }

    #[test]
    fn improvement_keeps_the_acknowledgement() {
        let prior = make_score(60.0, SupervisionStatus::Acceptable);
        let mut fresh = make_score(30.0, SupervisionStatus::None);
        carry_supervision(&prior, &mut fresh);
        assert_eq!(fresh.supervision_status, SupervisionStatus::Acceptable);
    }

    #[test]
    fn unacknowledged_files_stay_unacknowledged() {
        let prior = make_score(40.0, SupervisionStatus::None);
        let mut fresh = make_score(90.0, SupervisionStatus::None);
        carry_supervision(&prior, &mut fresh);
        assert_eq!(fresh.supervision_status, SupervisionStatus::None);
    }

    #[test]
    fn regressed_status_is_sticky() {
        let prior = make_score(40.0, SupervisionStatus::Regressed);
        let mut fresh = make_score(10.0, SupervisionStatus::None);
        carry_supervision(&prior, &mut fresh);
        assert_eq!(fresh.supervision_status, SupervisionStatus::Regressed);
    }
}
