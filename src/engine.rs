use std::collections::{HashMap, HashSet};

use chrono::{SecondsFormat, Utc};
use tracing::{info, warn};

use crate::classify::{ContextConstraints, Finding, FindingClassifier};
use crate::dedupe::dedupe;
use crate::error::{Error, Result};
use crate::matcher::EvidenceSource;
use crate::report::{Report, RunMeta, synthesize};
use crate::rules::{Rule, RuleSet};
use crate::scope::{ScopeKind, ScopeResolver};

/// Parameters of one review invocation.
#[derive(Debug, Clone)]
pub struct Invocation {
    pub scope: ScopeKind,
    pub target: Option<String>,
    pub filters: Vec<String>,
}

/// Wires the pipeline: resolve scope, collect evidence, classify, dedupe,
/// synthesize. Strictly sequential; each stage consumes the complete output
/// of its predecessor. One `Report` per invocation or a classified error,
/// never a partial report.
pub struct Engine {
    resolver: ScopeResolver,
    source: Box<dyn EvidenceSource>,
    rulesets: Vec<RuleSet>,
    classifier: FindingClassifier,
}

impl Engine {
    pub fn new(
        resolver: ScopeResolver,
        source: Box<dyn EvidenceSource>,
        rulesets: Vec<RuleSet>,
        context: ContextConstraints,
    ) -> Self {
        let classifier = FindingClassifier::new(&rulesets, context);
        Self {
            resolver,
            source,
            rulesets,
            classifier,
        }
    }

    pub fn run(&self, invocation: &Invocation) -> Result<Report> {
        let meta = || RunMeta {
            command: "gander".to_string(),
            scope: invocation.scope.as_str().to_string(),
            target: invocation.target.clone(),
            completed_at: Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
        };

        let changes = self.resolver.resolve(
            invocation.scope,
            invocation.target.as_deref(),
            &invocation.filters,
        )?;

        if changes.is_empty() {
            info!(scope = invocation.scope.as_str(), "empty change set, nothing to review");
            return Ok(synthesize(Vec::new(), Vec::new(), meta()));
        }

        let evidence = self.source.collect(&changes, &self.rulesets)?;

        let rule_index: HashMap<&str, &Rule> = self
            .rulesets
            .iter()
            .flat_map(|rs| rs.rules.iter())
            .map(|r| (r.id.as_str(), r))
            .collect();

        let mut findings: Vec<Finding> = Vec::new();
        let mut warnings: Vec<String> = Vec::new();
        let mut skipped_rules: HashSet<String> = HashSet::new();

        for item in &evidence {
            let Some(rule) = rule_index.get(item.rule_id.as_str()) else {
                if skipped_rules.insert(item.rule_id.clone()) {
                    warn!(rule = %item.rule_id, "evidence references unknown rule");
                    warnings.push(format!(
                        "evidence for unknown rule '{}' discarded",
                        item.rule_id
                    ));
                }
                continue;
            };

            match self.classifier.classify(item, rule) {
                Ok(finding) => findings.push(finding),
                Err(Error::UnknownCategory { rule_id, category }) => {
                    // Isolated per-rule failure: skip it, keep the run alive.
                    if skipped_rules.insert(rule_id.clone()) {
                        warn!(rule = %rule_id, category = %category, "skipping rule");
                        warnings.push(format!(
                            "rule '{rule_id}' skipped: unknown category '{category}'"
                        ));
                    }
                }
                Err(e) => return Err(e),
            }
        }

        let findings = dedupe(findings);
        Ok(synthesize(findings, warnings, meta()))
    }
}
