use clap::{Parser, Subcommand};

/// Rule-driven review of code changes: classifies findings against a
/// severity taxonomy and synthesizes a merge recommendation.
#[derive(Parser, Debug, Clone)]
#[command(name = "gander", version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<CliCommand>,

    /// Review scope: pr, worktree, diff, file, or repo
    #[arg(long)]
    pub scope: Option<String>,

    /// Scope target: PR number (pr), ref range (diff), comma-separated paths (file)
    #[arg(long)]
    pub target: Option<String>,

    /// Ref the worktree scope compares against (default: HEAD)
    #[arg(long)]
    pub base_branch: Option<String>,

    /// Glob filter applied to the resolved file set (repeatable)
    #[arg(long = "filter")]
    pub filters: Vec<String>,

    /// Declared invariant with a severity floor, as STATEMENT=FLOOR (repeatable)
    #[arg(long = "context")]
    pub context: Vec<String>,

    /// Directory of ruleset TOML files overriding the built-in rulesets
    #[arg(long, global = true)]
    pub rules: Option<String>,

    /// Path to the config file (default: ./gander.toml)
    #[arg(long, global = true)]
    pub config: Option<String>,

    /// Report output directory (default: .gander/reports)
    #[arg(long)]
    pub output: Option<String>,

    /// Print the report without persisting it
    #[arg(long)]
    pub no_save: bool,

    /// Exit with status 3 when any finding is at or above this severity
    #[arg(long)]
    pub fail_on: Option<String>,
}

#[derive(Subcommand, Debug, Clone)]
pub enum CliCommand {
    /// Validate and list the active rulesets
    Rules,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_defaults() {
        let cli = Cli::parse_from(["gander"]);
        assert!(cli.command.is_none());
        assert!(cli.scope.is_none());
        assert!(cli.target.is_none());
        assert!(cli.filters.is_empty());
        assert!(!cli.no_save);
    }

    #[test]
    fn test_parse_review_flags() {
        let cli = Cli::parse_from([
            "gander",
            "--scope",
            "diff",
            "--target",
            "main..HEAD",
            "--base-branch",
            "develop",
            "--filter",
            "src/**/*.rs",
            "--filter",
            "!src/generated/**",
            "--context",
            "balance >= 0=blocker",
            "--fail-on",
            "high",
            "--no-save",
        ]);
        assert_eq!(cli.scope.as_deref(), Some("diff"));
        assert_eq!(cli.target.as_deref(), Some("main..HEAD"));
        assert_eq!(cli.base_branch.as_deref(), Some("develop"));
        assert_eq!(cli.filters.len(), 2);
        assert_eq!(cli.context, vec!["balance >= 0=blocker".to_string()]);
        assert_eq!(cli.fail_on.as_deref(), Some("high"));
        assert!(cli.no_save);
    }

    #[test]
    fn test_parse_rules_subcommand() {
        let cli = Cli::parse_from(["gander", "rules", "--rules", "/tmp/rules"]);
        assert!(matches!(cli.command, Some(CliCommand::Rules)));
        assert_eq!(cli.rules.as_deref(), Some("/tmp/rules"));
    }
}
