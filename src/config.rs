use std::collections::BTreeMap;
use std::path::Path;

use serde::Deserialize;

use crate::cli::Cli;
use crate::error::{Error, Result};
use crate::scope::ScopeKind;
use crate::taxonomy::Severity;

const DEFAULT_CONFIG_PATH: &str = "gander.toml";

#[derive(Debug, Clone, Deserialize, Default, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct ConfigFile {
    pub scope: Option<String>,
    pub base_branch: Option<String>,
    pub rules_dir: Option<String>,
    pub report_dir: Option<String>,
    pub fail_on: Option<String>,
    /// Invariant statement -> severity floor.
    #[serde(default)]
    pub context: BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub scope: ScopeKind,
    pub target: Option<String>,
    pub filters: Vec<String>,
    /// Ref the `worktree` scope compares against; `HEAD` when unset.
    pub base_branch: Option<String>,
    pub rules_dir: Option<String>,
    pub report_dir: Option<String>,
    pub fail_on: Option<Severity>,
    /// `STATEMENT=FLOOR` declarations, config file entries first, CLI after.
    pub context: Vec<String>,
    pub no_save: bool,
}

impl Config {
    pub fn load(cli: &Cli) -> Result<Self> {
        let file_config = match cli.config {
            Some(ref path) => {
                let path = Path::new(path);
                if !path.exists() {
                    return Err(Error::ConfigNotFound(path.to_path_buf()));
                }
                parse_config(&std::fs::read_to_string(path)?)?
            }
            None => {
                let path = Path::new(DEFAULT_CONFIG_PATH);
                if path.exists() {
                    parse_config(&std::fs::read_to_string(path)?)?
                } else {
                    ConfigFile::default()
                }
            }
        };

        merge(file_config, cli)
    }
}

pub fn parse_config(content: &str) -> Result<ConfigFile> {
    let config: ConfigFile = toml::from_str(content)?;
    validate(&config)?;
    Ok(config)
}

fn validate(config: &ConfigFile) -> Result<()> {
    if let Some(ref scope) = config.scope
        && ScopeKind::parse(scope).is_none()
    {
        return Err(Error::ConfigValidation(format!(
            "unknown scope: {scope} (expected: pr, worktree, diff, file, repo)"
        )));
    }
    if let Some(ref fail_on) = config.fail_on
        && Severity::parse(fail_on).is_none()
    {
        return Err(Error::ConfigValidation(format!(
            "unknown fail_on severity: {fail_on} (expected: blocker, high, med, low, nit)"
        )));
    }
    for (statement, floor) in &config.context {
        if Severity::parse(floor).is_none() {
            return Err(Error::ConfigValidation(format!(
                "unknown severity floor '{floor}' for context invariant '{statement}'"
            )));
        }
    }
    Ok(())
}

pub fn merge(file: ConfigFile, cli: &Cli) -> Result<Config> {
    let scope_str = cli
        .scope
        .clone()
        .or(file.scope)
        .unwrap_or_else(|| "pr".to_string());
    let scope = ScopeKind::parse(&scope_str).ok_or_else(|| {
        Error::ConfigValidation(format!(
            "unknown scope: {scope_str} (expected: pr, worktree, diff, file, repo)"
        ))
    })?;

    let fail_on = match cli.fail_on.clone().or(file.fail_on) {
        Some(s) => Some(Severity::parse(&s).ok_or_else(|| {
            Error::ConfigValidation(format!(
                "unknown fail_on severity: {s} (expected: blocker, high, med, low, nit)"
            ))
        })?),
        None => None,
    };

    // File-declared invariants first, CLI declarations appended after.
    let mut context: Vec<String> = file
        .context
        .iter()
        .map(|(statement, floor)| format!("{statement}={floor}"))
        .collect();
    context.extend(cli.context.iter().cloned());

    Ok(Config {
        scope,
        target: cli.target.clone(),
        filters: cli.filters.clone(),
        base_branch: cli.base_branch.clone().or(file.base_branch),
        rules_dir: cli.rules.clone().or(file.rules_dir),
        report_dir: cli.output.clone().or(file.report_dir),
        fail_on,
        context,
        no_save: cli.no_save,
    })
}
