use std::collections::HashSet;

use serde::Serialize;
use tracing::debug;

use crate::error::{Error, Result};
use crate::matcher::Evidence;
use crate::rules::{Rule, RuleSet};
use crate::taxonomy::{Confidence, Severity};

/// A caller-declared invariant with the minimum severity any finding touching
/// it must carry. Matching is by keyword against rule category + description.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContextConstraint {
    pub statement: String,
    pub floor: Severity,
    keywords: Vec<String>,
}

impl ContextConstraint {
    pub fn new(statement: &str, floor: Severity) -> Self {
        Self {
            statement: statement.to_string(),
            floor,
            keywords: keywords_of(statement),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContextConstraints {
    constraints: Vec<ContextConstraint>,
}

impl ContextConstraints {
    /// Parse `STATEMENT=FLOOR` declarations (the CLI/config form).
    /// The floor is everything after the last `=`, so statements like
    /// `balance >= 0=blocker` parse as intended.
    pub fn parse(declarations: &[String]) -> Result<Self> {
        let mut constraints = Vec::new();
        for decl in declarations {
            let Some((statement, floor_str)) = decl.rsplit_once('=') else {
                return Err(Error::ConfigValidation(format!(
                    "context declaration '{decl}' must be STATEMENT=FLOOR"
                )));
            };
            let statement = statement.trim();
            let floor = Severity::parse(floor_str.trim()).ok_or_else(|| {
                Error::ConfigValidation(format!(
                    "unknown severity floor '{}' in context declaration '{decl}'",
                    floor_str.trim()
                ))
            })?;
            if statement.is_empty() {
                return Err(Error::ConfigValidation(format!(
                    "empty invariant statement in context declaration '{decl}'"
                )));
            }
            constraints.push(ContextConstraint::new(statement, floor));
        }
        Ok(Self { constraints })
    }

    pub fn is_empty(&self) -> bool {
        self.constraints.is_empty()
    }

    /// Highest declared floor whose keywords match the rule, if any.
    fn floor_for(&self, rule: &Rule) -> Option<&ContextConstraint> {
        let haystack: HashSet<String> =
            keywords_of(&format!("{} {}", rule.category, rule.description))
                .into_iter()
                .collect();
        self.constraints
            .iter()
            .filter(|c| c.keywords.iter().any(|k| haystack.contains(k)))
            .max_by_key(|c| c.floor)
    }
}

/// Lowercased word tokens of length >= 3; the unit of context matching.
fn keywords_of(statement: &str) -> Vec<String> {
    statement
        .to_lowercase()
        .split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|t| t.len() >= 3)
        .map(|t| t.to_string())
        .collect()
}

/// A classified conclusion derived from exactly one piece of evidence.
/// Immutable once emitted to the synthesizer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Finding {
    pub id: String,
    pub rule_id: String,
    pub category: String,
    pub severity: Severity,
    pub confidence: Confidence,
    pub file: String,
    pub start_line: u32,
    pub end_line: u32,
    pub snippet: String,
    pub impact: String,
    pub remediation: Option<String>,
}

/// Maps `(evidence, rule)` pairs into findings, resolving severity and
/// confidence against non-negotiable floors and context constraints.
pub struct FindingClassifier {
    taxonomy: HashSet<String>,
    context: ContextConstraints,
}

impl FindingClassifier {
    pub fn new(rulesets: &[RuleSet], context: ContextConstraints) -> Self {
        let taxonomy = rulesets
            .iter()
            .flat_map(|r| r.categories.iter().cloned())
            .collect();
        Self { taxonomy, context }
    }

    pub fn classify(&self, evidence: &Evidence, rule: &Rule) -> Result<Finding> {
        if !self.taxonomy.contains(&rule.category) {
            return Err(Error::UnknownCategory {
                rule_id: rule.id.clone(),
                category: rule.category.clone(),
            });
        }

        let mut impact = rule.description.clone();

        // Non-negotiable rules are pinned: the floor cannot be lowered, and
        // context cannot move the severity either way.
        let severity = if rule.non_negotiable {
            rule.pinned()
        } else {
            match self.context.floor_for(rule) {
                Some(constraint) if constraint.floor > rule.severity => {
                    debug!(
                        rule = %rule.id,
                        floor = %constraint.floor,
                        "severity escalated by declared invariant"
                    );
                    impact.push_str(&format!("; declared invariant: {}", constraint.statement));
                    constraint.floor
                }
                _ => rule.severity,
            }
        };

        let confidence = if evidence.heuristic {
            rule.confidence.downgraded()
        } else {
            rule.confidence
        };

        Ok(Finding {
            id: format!("{}@{}:{}", rule.id, evidence.file, evidence.start_line),
            rule_id: rule.id.clone(),
            category: rule.category.clone(),
            severity,
            confidence,
            file: evidence.file.clone(),
            start_line: evidence.start_line,
            end_line: evidence.end_line,
            snippet: evidence.snippet.clone(),
            impact,
            remediation: rule.remediation.clone(),
        })
    }
}
