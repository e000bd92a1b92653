use std::path::PathBuf;

use clap::Parser;
use tracing::info;

use gander::classify::ContextConstraints;
use gander::cli::{Cli, CliCommand};
use gander::config::Config;
use gander::engine::{Engine, Invocation};
use gander::matcher::PatternMatcher;
use gander::render::render_markdown;
use gander::rules::RuleCatalog;
use gander::scope::ScopeResolver;
use gander::sink::ReportSink;

fn init_logging() {
    tracing_subscriber::fmt()
        .with_target(false)
        .with_timer(tracing_subscriber::fmt::time::SystemTime)
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_logging();

    let config = match Config::load(&cli) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("error: {e}");
            std::process::exit(1);
        }
    };

    info!(?config, "config loaded");

    let catalog = RuleCatalog::new(config.rules_dir.clone());
    let rulesets = match catalog.load_all() {
        Ok(r) => r,
        Err(e) => {
            eprintln!("error: {e}");
            std::process::exit(1);
        }
    };

    if let Some(CliCommand::Rules) = cli.command {
        for ruleset in &rulesets {
            println!("{} ({} rules)", ruleset.name, ruleset.rules.len());
            for rule in &ruleset.rules {
                println!("  {} [{}] {}", rule.id, rule.severity, rule.description);
            }
        }
        return;
    }

    let context = match ContextConstraints::parse(&config.context) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("error: {e}");
            std::process::exit(1);
        }
    };

    let repo_root = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
    let resolver =
        ScopeResolver::new(repo_root.clone()).base_branch(config.base_branch.clone());
    let engine = Engine::new(
        resolver,
        Box::new(PatternMatcher::new()),
        rulesets,
        context,
    );

    let invocation = Invocation {
        scope: config.scope,
        target: config.target.clone(),
        filters: config.filters.clone(),
    };

    let report = match engine.run(&invocation) {
        Ok(r) => r,
        Err(e) => {
            eprintln!("error: {e}");
            std::process::exit(1);
        }
    };

    let markdown = match render_markdown(&report) {
        Ok(md) => md,
        Err(e) => {
            eprintln!("error: {e}");
            std::process::exit(1);
        }
    };

    println!("{markdown}");

    if !config.no_save {
        let report_dir = config
            .report_dir
            .clone()
            .map(PathBuf::from)
            .unwrap_or_else(|| ReportSink::default_dir(&repo_root));
        let sink = ReportSink::new(report_dir);
        if let Err(e) = sink.write(&report, &markdown) {
            eprintln!("error: {e}");
            std::process::exit(1);
        }
    }

    if let Some(threshold) = config.fail_on
        && report.findings.iter().any(|f| f.severity >= threshold)
    {
        eprintln!("findings at or above {threshold} present");
        std::process::exit(3);
    }
}
