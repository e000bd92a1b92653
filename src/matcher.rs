use globset::GlobMatcher;
use regex::Regex;
use tracing::debug;

use crate::error::{Error, Result};
use crate::rules::{MatcherSpec, Rule, RuleSet};
use crate::scope::{ChangeSet, ChangedFile};

/// A located code excerpt matched by a rule. Line range is 1-based inclusive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Evidence {
    pub file: String,
    pub start_line: u32,
    pub end_line: u32,
    pub snippet: String,
    pub rule_id: String,
    /// Set when the matcher is partial/heuristic; the classifier downgrades
    /// confidence one step for such evidence.
    pub heuristic: bool,
}

/// The matcher contract: apply a ruleset to a change set and emit one
/// evidence record per match occurrence. Implementations must not fail the
/// run for individual rules that cannot match; total failure of the source
/// is `Error::EvidenceSourceUnavailable` and aborts the run.
pub trait EvidenceSource {
    fn collect(&self, changes: &ChangeSet, rulesets: &[RuleSet]) -> Result<Vec<Evidence>>;
}

enum CompiledKind {
    Regex(Regex),
    Substring { needle: String, case_insensitive: bool },
    PathGlob(GlobMatcher),
}

struct CompiledRule<'a> {
    rule: &'a Rule,
    kind: CompiledKind,
}

/// Built-in matcher: line-oriented regex/substring scanning plus path globs.
///
/// Diff-backed files are scanned over their added lines only; full-content
/// files over every line.
pub struct PatternMatcher;

impl PatternMatcher {
    pub fn new() -> Self {
        Self
    }

    fn compile<'a>(rulesets: &'a [RuleSet]) -> Result<Vec<CompiledRule<'a>>> {
        let mut compiled = Vec::new();
        for ruleset in rulesets {
            for rule in &ruleset.rules {
                let kind = match &rule.matcher {
                    MatcherSpec::Regex { pattern } => {
                        let re = Regex::new(pattern).map_err(|e| {
                            Error::RuleSet(format!("rule '{}': invalid regex: {e}", rule.id))
                        })?;
                        CompiledKind::Regex(re)
                    }
                    MatcherSpec::Substring {
                        needle,
                        case_insensitive,
                    } => CompiledKind::Substring {
                        needle: if *case_insensitive {
                            needle.to_lowercase()
                        } else {
                            needle.clone()
                        },
                        case_insensitive: *case_insensitive,
                    },
                    MatcherSpec::PathGlob { glob } => {
                        let matcher = globset::Glob::new(glob)
                            .map_err(|e| {
                                Error::RuleSet(format!("rule '{}': invalid glob: {e}", rule.id))
                            })?
                            .compile_matcher();
                        CompiledKind::PathGlob(matcher)
                    }
                };
                compiled.push(CompiledRule { rule, kind });
            }
        }
        Ok(compiled)
    }

    fn match_file(file: &ChangedFile, compiled: &CompiledRule<'_>, out: &mut Vec<Evidence>) {
        let rule = compiled.rule;
        match &compiled.kind {
            CompiledKind::PathGlob(matcher) => {
                if matcher.is_match(&file.path) {
                    out.push(Evidence {
                        file: file.path.clone(),
                        start_line: 1,
                        end_line: 1,
                        snippet: file.path.clone(),
                        rule_id: rule.id.clone(),
                        heuristic: rule.heuristic,
                    });
                }
            }
            CompiledKind::Regex(re) => {
                for (line_no, text) in file.scan_lines() {
                    for _ in re.find_iter(text) {
                        out.push(line_evidence(file, line_no, text, rule));
                    }
                }
            }
            CompiledKind::Substring {
                needle,
                case_insensitive,
            } => {
                for (line_no, text) in file.scan_lines() {
                    let haystack;
                    let text_ref = if *case_insensitive {
                        haystack = text.to_lowercase();
                        haystack.as_str()
                    } else {
                        text
                    };
                    let count = text_ref.matches(needle.as_str()).count();
                    for _ in 0..count {
                        out.push(line_evidence(file, line_no, text, rule));
                    }
                }
            }
        }
    }
}

impl Default for PatternMatcher {
    fn default() -> Self {
        Self::new()
    }
}

fn line_evidence(file: &ChangedFile, line_no: u32, text: &str, rule: &Rule) -> Evidence {
    Evidence {
        file: file.path.clone(),
        start_line: line_no,
        end_line: line_no,
        snippet: text.trim().to_string(),
        rule_id: rule.id.clone(),
        heuristic: rule.heuristic,
    }
}

impl EvidenceSource for PatternMatcher {
    fn collect(&self, changes: &ChangeSet, rulesets: &[RuleSet]) -> Result<Vec<Evidence>> {
        let compiled = Self::compile(rulesets)?;
        let mut evidence = Vec::new();
        for file in &changes.files {
            for rule in &compiled {
                Self::match_file(file, rule, &mut evidence);
            }
        }
        debug!(count = evidence.len(), "collected evidence");
        Ok(evidence)
    }
}
