use std::collections::BTreeMap;

use serde::Serialize;
use tracing::info;

use crate::classify::Finding;
use crate::taxonomy::{MergeRecommendation, Severity};

/// Front-matter metadata for a review run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunMeta {
    pub command: String,
    pub scope: String,
    pub target: Option<String>,
    /// RFC 3339 completion timestamp.
    pub completed_at: String,
}

/// The final artifact of one review invocation. Created once, never mutated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Report {
    pub meta: RunMeta,
    pub findings: Vec<Finding>,
    pub counts_by_severity: BTreeMap<Severity, usize>,
    pub counts_by_category: BTreeMap<String, usize>,
    pub recommendation: MergeRecommendation,
    /// Non-fatal conditions surfaced to the consumer (e.g. skipped rules).
    pub warnings: Vec<String>,
}

/// Aggregate deduplicated findings into the final report.
pub fn synthesize(mut findings: Vec<Finding>, warnings: Vec<String>, meta: RunMeta) -> Report {
    let mut counts_by_severity: BTreeMap<Severity, usize> =
        Severity::ALL.iter().map(|s| (*s, 0)).collect();
    let mut counts_by_category: BTreeMap<String, usize> = BTreeMap::new();

    for finding in &findings {
        *counts_by_severity.entry(finding.severity).or_insert(0) += 1;
        *counts_by_category.entry(finding.category.clone()).or_insert(0) += 1;
    }

    let recommendation = recommend(&counts_by_severity, findings.len());

    // Rendering order only; counts and recommendation are already fixed.
    findings.sort_by(|a, b| {
        b.severity
            .cmp(&a.severity)
            .then(a.file.cmp(&b.file))
            .then(a.start_line.cmp(&b.start_line))
            .then(a.rule_id.cmp(&b.rule_id))
    });

    info!(
        findings = findings.len(),
        recommendation = %recommendation,
        "synthesized report"
    );

    Report {
        meta,
        findings,
        counts_by_severity,
        counts_by_category,
        recommendation,
        warnings,
    }
}

/// Decision table, evaluated top-down, first match wins.
fn recommend(counts: &BTreeMap<Severity, usize>, total: usize) -> MergeRecommendation {
    let at = |s: Severity| counts.get(&s).copied().unwrap_or(0);
    if at(Severity::Blocker) > 0 {
        MergeRecommendation::Block
    } else if at(Severity::High) > 0 {
        MergeRecommendation::RequestChanges
    } else if total > 0 {
        MergeRecommendation::ApproveWithComments
    } else {
        MergeRecommendation::Approve
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::taxonomy::Confidence;

    fn meta() -> RunMeta {
        RunMeta {
            command: "gander".to_string(),
            scope: "diff".to_string(),
            target: Some("main..HEAD".to_string()),
            completed_at: "2026-01-01T00:00:00Z".to_string(),
        }
    }

    fn finding(severity: Severity, category: &str, file: &str, start: u32) -> Finding {
        Finding {
            id: format!("r@{file}:{start}"),
            rule_id: "r".to_string(),
            category: category.to_string(),
            severity,
            confidence: Confidence::Med,
            file: file.to_string(),
            start_line: start,
            end_line: start,
            snippet: "s".to_string(),
            impact: "i".to_string(),
            remediation: None,
        }
    }

    #[test]
    fn test_empty_findings_approve() {
        let report = synthesize(Vec::new(), Vec::new(), meta());
        assert_eq!(report.recommendation, MergeRecommendation::Approve);
        assert!(report.findings.is_empty());
        assert_eq!(report.counts_by_severity.values().sum::<usize>(), 0);
    }

    #[test]
    fn test_blocker_forces_block() {
        let report = synthesize(
            vec![
                finding(Severity::Blocker, "Secrets", "a.rs", 1),
                finding(Severity::Nit, "Logging", "a.rs", 2),
            ],
            Vec::new(),
            meta(),
        );
        assert_eq!(report.recommendation, MergeRecommendation::Block);
    }

    #[test]
    fn test_high_without_blocker_requests_changes() {
        let report = synthesize(
            vec![finding(Severity::High, "Secrets", "a.rs", 1)],
            Vec::new(),
            meta(),
        );
        assert_eq!(report.recommendation, MergeRecommendation::RequestChanges);
    }

    #[test]
    fn test_med_low_approve_with_comments() {
        for severity in [Severity::Med, Severity::Low, Severity::Nit] {
            let report = synthesize(
                vec![finding(severity, "Logging", "a.rs", 1)],
                Vec::new(),
                meta(),
            );
            assert_eq!(
                report.recommendation,
                MergeRecommendation::ApproveWithComments,
                "for {severity}"
            );
        }
    }

    #[test]
    fn test_recommendation_law() {
        // BLOCKER present <=> BLOCK recommended.
        let with = synthesize(
            vec![finding(Severity::Blocker, "Secrets", "a.rs", 1)],
            Vec::new(),
            meta(),
        );
        assert_eq!(with.recommendation, MergeRecommendation::Block);

        let without = synthesize(
            vec![
                finding(Severity::High, "Secrets", "a.rs", 1),
                finding(Severity::Med, "Secrets", "a.rs", 5),
            ],
            Vec::new(),
            meta(),
        );
        assert_ne!(without.recommendation, MergeRecommendation::Block);
    }

    #[test]
    fn test_count_consistency() {
        let report = synthesize(
            vec![
                finding(Severity::High, "Secrets", "a.rs", 1),
                finding(Severity::High, "Secrets", "b.rs", 2),
                finding(Severity::Low, "Logging", "a.rs", 9),
            ],
            Vec::new(),
            meta(),
        );
        let total: usize = report.counts_by_severity.values().sum();
        assert_eq!(total, report.findings.len());
        assert_eq!(report.counts_by_severity[&Severity::High], 2);
        assert_eq!(report.counts_by_category["Secrets"], 2);
        assert_eq!(report.counts_by_category["Logging"], 1);
    }

    #[test]
    fn test_all_severity_tiers_present_in_counts() {
        let report = synthesize(Vec::new(), Vec::new(), meta());
        assert_eq!(report.counts_by_severity.len(), 5);
    }

    #[test]
    fn test_findings_ordered_severity_then_path_then_line() {
        let report = synthesize(
            vec![
                finding(Severity::Low, "Logging", "b.rs", 3),
                finding(Severity::Blocker, "Secrets", "z.rs", 9),
                finding(Severity::Low, "Logging", "a.rs", 7),
                finding(Severity::Low, "Logging", "a.rs", 2),
            ],
            Vec::new(),
            meta(),
        );
        let order: Vec<(&str, u32)> = report
            .findings
            .iter()
            .map(|f| (f.file.as_str(), f.start_line))
            .collect();
        assert_eq!(order, vec![("z.rs", 9), ("a.rs", 2), ("a.rs", 7), ("b.rs", 3)]);
    }

    #[test]
    fn test_ordering_does_not_affect_counts_or_recommendation() {
        let forward = vec![
            finding(Severity::High, "Secrets", "a.rs", 1),
            finding(Severity::Low, "Logging", "b.rs", 2),
        ];
        let mut reversed = forward.clone();
        reversed.reverse();

        let a = synthesize(forward, Vec::new(), meta());
        let b = synthesize(reversed, Vec::new(), meta());
        assert_eq!(a.counts_by_severity, b.counts_by_severity);
        assert_eq!(a.counts_by_category, b.counts_by_category);
        assert_eq!(a.recommendation, b.recommendation);
        assert_eq!(a.findings, b.findings);
    }

    #[test]
    fn test_warnings_carried_into_report() {
        let report = synthesize(
            Vec::new(),
            vec!["rule 'x' skipped: unknown category 'Y'".to_string()],
            meta(),
        );
        assert_eq!(report.warnings.len(), 1);
        assert_eq!(report.recommendation, MergeRecommendation::Approve);
    }

    #[test]
    fn test_report_serializes_to_json() {
        let report = synthesize(
            vec![finding(Severity::High, "Secrets", "a.rs", 1)],
            Vec::new(),
            meta(),
        );
        let json = serde_json::to_string_pretty(&report).unwrap();
        assert!(json.contains("\"recommendation\": \"request_changes\""));
        assert!(json.contains("\"high\": 1"));
    }
}
