use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("config file not found: {0}")]
    ConfigNotFound(PathBuf),

    #[error("config parse error: {0}")]
    ConfigParse(#[from] toml::de::Error),

    #[error("config validation error: {0}")]
    ConfigValidation(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("scope '{scope}' requires a target: {reason}")]
    MissingTarget { scope: String, reason: String },

    #[error("invalid target for scope '{scope}': {reason}")]
    InvalidTargetFormat { scope: String, reason: String },

    #[error("file not found: {0}")]
    FileNotFound(PathBuf),

    #[error("rule '{rule_id}' references unknown category: {category}")]
    UnknownCategory { rule_id: String, category: String },

    #[error("evidence source unavailable: {0}")]
    EvidenceSourceUnavailable(String),

    #[error("ruleset error: {0}")]
    RuleSet(String),

    #[error("scope error: {0}")]
    Scope(String),

    #[error("render error: {0}")]
    Render(String),

    #[error("report sink error: {0}")]
    Sink(String),
}

pub type Result<T> = std::result::Result<T, Error>;
