use std::collections::HashSet;
use std::path::Path;

use serde::Deserialize;
use tracing::debug;

use crate::error::{Error, Result};
use crate::taxonomy::{Confidence, Severity};

const DEFAULT_SECRETS: &str = include_str!("default_rules/secrets.toml");
const DEFAULT_LOGGING: &str = include_str!("default_rules/logging.toml");
const DEFAULT_RELIABILITY: &str = include_str!("default_rules/reliability.toml");

fn default_ruleset(name: &str) -> Option<&'static str> {
    match name {
        "secrets" => Some(DEFAULT_SECRETS),
        "logging" => Some(DEFAULT_LOGGING),
        "reliability" => Some(DEFAULT_RELIABILITY),
        _ => None,
    }
}

const DEFAULT_RULESET_NAMES: &[&str] = &["secrets", "logging", "reliability"];

/// How a rule locates evidence in a changed file.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MatcherSpec {
    /// Line-oriented regular expression scan.
    Regex { pattern: String },
    /// Plain substring scan.
    Substring {
        needle: String,
        #[serde(default)]
        case_insensitive: bool,
    },
    /// Matches the file path itself; emits one evidence per matching file.
    PathGlob { glob: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Rule {
    pub id: String,
    pub category: String,
    pub description: String,
    pub severity: Severity,
    pub confidence: Confidence,
    pub matcher: MatcherSpec,
    #[serde(default)]
    pub non_negotiable: bool,
    /// Pinned severity floor for non-negotiable rules. Defaults to `severity`.
    #[serde(default)]
    pub pinned_floor: Option<Severity>,
    /// Heuristic matchers downgrade confidence one step at classification.
    #[serde(default)]
    pub heuristic: bool,
    #[serde(default)]
    pub remediation: Option<String>,
}

impl Rule {
    /// The severity a non-negotiable rule is pinned to.
    pub fn pinned(&self) -> Severity {
        self.pinned_floor.unwrap_or(self.severity)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RuleSet {
    pub name: String,
    /// Category taxonomy declared by this review domain.
    pub categories: Vec<String>,
    pub rules: Vec<Rule>,
}

/// Parse and validate a single ruleset from TOML.
pub fn parse_ruleset(content: &str) -> Result<RuleSet> {
    let ruleset: RuleSet =
        toml::from_str(content).map_err(|e| Error::RuleSet(format!("parse error: {e}")))?;
    validate(&ruleset)?;
    Ok(ruleset)
}

fn validate(ruleset: &RuleSet) -> Result<()> {
    if ruleset.name.is_empty() {
        return Err(Error::RuleSet("ruleset name must not be empty".to_string()));
    }
    if ruleset.categories.is_empty() {
        return Err(Error::RuleSet(format!(
            "ruleset '{}' declares no categories",
            ruleset.name
        )));
    }

    let mut seen: HashSet<&str> = HashSet::new();
    for rule in &ruleset.rules {
        if rule.id.is_empty() {
            return Err(Error::RuleSet(format!(
                "ruleset '{}' contains a rule with an empty id",
                ruleset.name
            )));
        }
        if !seen.insert(rule.id.as_str()) {
            return Err(Error::RuleSet(format!(
                "duplicate rule id '{}' in ruleset '{}'",
                rule.id, ruleset.name
            )));
        }

        match &rule.matcher {
            MatcherSpec::Regex { pattern } => {
                regex::Regex::new(pattern).map_err(|e| {
                    Error::RuleSet(format!("rule '{}': invalid regex: {e}", rule.id))
                })?;
            }
            MatcherSpec::Substring { needle, .. } => {
                if needle.is_empty() {
                    return Err(Error::RuleSet(format!(
                        "rule '{}': substring needle must not be empty",
                        rule.id
                    )));
                }
            }
            MatcherSpec::PathGlob { glob } => {
                globset::Glob::new(glob).map_err(|e| {
                    Error::RuleSet(format!("rule '{}': invalid glob: {e}", rule.id))
                })?;
            }
        }

        if rule.pinned_floor.is_some() && !rule.non_negotiable {
            return Err(Error::RuleSet(format!(
                "rule '{}': pinned_floor requires non_negotiable = true",
                rule.id
            )));
        }
        if let Some(floor) = rule.pinned_floor
            && floor < rule.severity
        {
            return Err(Error::RuleSet(format!(
                "rule '{}': pinned_floor ({floor}) is below default severity ({})",
                rule.id, rule.severity
            )));
        }
    }

    Ok(())
}

/// Ruleset catalog with embedded defaults and user overrides.
///
/// A file in `override_dir` whose stem matches a default ruleset name replaces
/// that default; any other `.toml` file is loaded in addition to the defaults.
pub struct RuleCatalog {
    override_dir: Option<String>,
}

impl RuleCatalog {
    pub fn new(override_dir: Option<String>) -> Self {
        Self { override_dir }
    }

    /// Load every ruleset: embedded defaults plus overrides/additions from disk.
    pub fn load_all(&self) -> Result<Vec<RuleSet>> {
        let mut rulesets: Vec<RuleSet> = Vec::new();
        let mut overridden: HashSet<String> = HashSet::new();

        if let Some(ref dir) = self.override_dir {
            let dir_path = Path::new(dir);
            if !dir_path.is_dir() {
                return Err(Error::RuleSet(format!("rules directory not found: {dir}")));
            }
            let mut entries: Vec<_> = std::fs::read_dir(dir_path)?
                .collect::<std::io::Result<Vec<_>>>()?
                .into_iter()
                .map(|e| e.path())
                .filter(|p| p.extension().is_some_and(|ext| ext == "toml"))
                .collect();
            entries.sort();

            for path in entries {
                let content = std::fs::read_to_string(&path)?;
                let ruleset = parse_ruleset(&content)
                    .map_err(|e| Error::RuleSet(format!("{}: {e}", path.display())))?;
                if let Some(stem) = path.file_stem().and_then(|s| s.to_str())
                    && DEFAULT_RULESET_NAMES.contains(&stem)
                {
                    overridden.insert(stem.to_string());
                }
                debug!(ruleset = %ruleset.name, rules = ruleset.rules.len(), "loaded ruleset");
                rulesets.push(ruleset);
            }
        }

        for name in DEFAULT_RULESET_NAMES {
            if overridden.contains(*name) {
                continue;
            }
            let content = default_ruleset(name)
                .ok_or_else(|| Error::RuleSet(format!("unknown default ruleset: {name}")))?;
            rulesets.push(parse_ruleset(content)?);
        }

        rulesets.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(rulesets)
    }
}
