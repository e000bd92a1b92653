use std::cmp::Ordering;
use std::collections::BTreeMap;

use tracing::debug;

use crate::classify::Finding;

/// Merge findings that share a rule and overlapping evidence ranges within
/// the same file. Idempotent: running twice on its own output is a no-op.
pub fn dedupe(findings: Vec<Finding>) -> Vec<Finding> {
    let before = findings.len();
    let mut groups: BTreeMap<(String, String), Vec<Finding>> = BTreeMap::new();
    for finding in findings {
        groups
            .entry((finding.file.clone(), finding.rule_id.clone()))
            .or_default()
            .push(finding);
    }

    let mut merged: Vec<Finding> = Vec::new();
    for (_, mut group) in groups {
        group.sort_by(|a, b| {
            a.start_line
                .cmp(&b.start_line)
                .then(a.end_line.cmp(&b.end_line))
        });

        let mut iter = group.into_iter();
        let first = match iter.next() {
            Some(f) => f,
            None => continue,
        };
        let mut winner = first.clone();
        let mut span = (first.start_line, first.end_line);

        for next in iter {
            if next.start_line <= span.1 {
                // Inclusive overlap: extend the cluster and re-elect the winner.
                span.1 = span.1.max(next.end_line);
                if prefer(&next, &winner) {
                    winner = next;
                }
            } else {
                merged.push(span_finding(winner, span));
                span = (next.start_line, next.end_line);
                winner = next;
            }
        }
        merged.push(span_finding(winner, span));
    }

    merged.sort_by(|a, b| {
        a.file
            .cmp(&b.file)
            .then(a.start_line.cmp(&b.start_line))
            .then(a.end_line.cmp(&b.end_line))
            .then(a.rule_id.cmp(&b.rule_id))
    });

    if merged.len() != before {
        debug!(before, after = merged.len(), "deduplicated findings");
    }
    merged
}

/// The merged finding keeps the winner's fields with the cluster's union range.
fn span_finding(mut finding: Finding, span: (u32, u32)) -> Finding {
    finding.start_line = span.0;
    finding.end_line = span.1;
    finding
}

/// True when `a` wins over `b`: wider range, then higher severity, then
/// higher confidence, then lower starting line.
fn prefer(a: &Finding, b: &Finding) -> bool {
    let width_a = a.end_line - a.start_line;
    let width_b = b.end_line - b.start_line;
    match width_a.cmp(&width_b) {
        Ordering::Greater => true,
        Ordering::Less => false,
        Ordering::Equal => match a.severity.cmp(&b.severity) {
            Ordering::Greater => true,
            Ordering::Less => false,
            Ordering::Equal => match a.confidence.cmp(&b.confidence) {
                Ordering::Greater => true,
                Ordering::Less => false,
                Ordering::Equal => a.start_line < b.start_line,
            },
        },
    }
}
