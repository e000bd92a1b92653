use std::path::{Path, PathBuf};
use std::process::Command;

use globset::{Glob, GlobSet, GlobSetBuilder};
use tracing::debug;

use crate::diff::{DiffHunk, parse_unified_diff};
use crate::error::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScopeKind {
    Pr,
    Worktree,
    Diff,
    File,
    Repo,
}

impl ScopeKind {
    pub fn parse(s: &str) -> Option<ScopeKind> {
        match s {
            "pr" => Some(ScopeKind::Pr),
            "worktree" => Some(ScopeKind::Worktree),
            "diff" => Some(ScopeKind::Diff),
            "file" => Some(ScopeKind::File),
            "repo" => Some(ScopeKind::Repo),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ScopeKind::Pr => "pr",
            ScopeKind::Worktree => "worktree",
            ScopeKind::Diff => "diff",
            ScopeKind::File => "file",
            ScopeKind::Repo => "repo",
        }
    }
}

/// One file selected for review, carrying either diff hunks (pr/worktree/diff
/// scopes) or the whole file (file/repo scopes).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangedFile {
    pub path: String,
    pub language: Option<String>,
    pub hunks: Option<Vec<DiffHunk>>,
    pub content: Option<String>,
}

impl ChangedFile {
    /// Lines the matcher should scan, as `(line_number, text)`.
    /// For diff-backed files these are added lines only.
    pub fn scan_lines(&self) -> Vec<(u32, &str)> {
        if let Some(ref hunks) = self.hunks {
            hunks
                .iter()
                .flat_map(|h| h.lines.iter().map(|(n, l)| (*n, l.as_str())))
                .collect()
        } else if let Some(ref content) = self.content {
            content
                .lines()
                .enumerate()
                .map(|(i, l)| (i as u32 + 1, l))
                .collect()
        } else {
            Vec::new()
        }
    }
}

/// The concrete, ordered set of files a review invocation operates on.
/// Produced once by the resolver and immutable afterwards.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChangeSet {
    pub files: Vec<ChangedFile>,
}

impl ChangeSet {
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

/// Abstraction over `git`/`gh` execution for testability.
pub trait GitClient {
    fn git(&self, args: &[&str]) -> Result<String>;
    fn gh(&self, args: &[&str]) -> Result<String>;
}

/// Real client shelling out in the repo root. Failures surface immediately;
/// retrying is the caller's decision, not this layer's.
pub struct DefaultGitClient {
    repo_root: PathBuf,
}

impl DefaultGitClient {
    pub fn new(repo_root: PathBuf) -> Self {
        Self { repo_root }
    }

    fn run(&self, program: &str, args: &[&str]) -> Result<String> {
        let output = Command::new(program)
            .args(args)
            .current_dir(&self.repo_root)
            .output()
            .map_err(|e| Error::Scope(format!("failed to run {program}: {e}")))?;

        if output.status.success() {
            String::from_utf8(output.stdout)
                .map_err(|e| Error::Scope(format!("invalid utf8 from {program}: {e}")))
        } else {
            let stderr = String::from_utf8_lossy(&output.stderr);
            Err(Error::Scope(format!("{program} failed: {}", stderr.trim())))
        }
    }
}

impl GitClient for DefaultGitClient {
    fn git(&self, args: &[&str]) -> Result<String> {
        self.run("git", args)
    }

    fn gh(&self, args: &[&str]) -> Result<String> {
        self.run("gh", args)
    }
}

/// Resolves `(scope, target, path filters)` into a `ChangeSet`.
pub struct ScopeResolver {
    repo_root: PathBuf,
    client: Box<dyn GitClient>,
    base_branch: Option<String>,
}

impl ScopeResolver {
    pub fn new(repo_root: PathBuf) -> Self {
        let client = Box::new(DefaultGitClient::new(repo_root.clone()));
        Self {
            repo_root,
            client,
            base_branch: None,
        }
    }

    pub fn with_client(repo_root: PathBuf, client: Box<dyn GitClient>) -> Self {
        Self {
            repo_root,
            client,
            base_branch: None,
        }
    }

    /// Ref the `worktree` scope diffs against. Defaults to `HEAD`.
    pub fn base_branch(mut self, base_branch: Option<String>) -> Self {
        self.base_branch = base_branch;
        self
    }

    pub fn resolve(
        &self,
        scope: ScopeKind,
        target: Option<&str>,
        filters: &[String],
    ) -> Result<ChangeSet> {
        let glob_set = build_filters(filters)?;

        let mut files = match scope {
            ScopeKind::Pr => {
                let target = require_target(scope, target, "a PR number or branch")?;
                let diff = self.client.gh(&["pr", "diff", target])?;
                diff_files(&diff)
            }
            ScopeKind::Worktree => {
                let base = self.base_branch.as_deref().unwrap_or("HEAD");
                let diff = self.client.git(&["diff", base])?;
                let mut files = diff_files(&diff);
                files.extend(self.untracked_files()?);
                files
            }
            ScopeKind::Diff => {
                let target = require_target(scope, target, "a ref range like main..HEAD")?;
                validate_ref_range(target)?;
                let diff = self.client.git(&["diff", target])?;
                diff_files(&diff)
            }
            ScopeKind::File => {
                let target = require_target(scope, target, "one or more paths (comma separated)")?;
                self.read_files(target)?
            }
            ScopeKind::Repo => self.tracked_files()?,
        };

        if let Some(ref set) = glob_set {
            files.retain(|f| set.is_match(&f.path));
        }

        debug!(scope = scope.as_str(), files = files.len(), "resolved change set");
        Ok(ChangeSet { files })
    }

    fn read_files(&self, target: &str) -> Result<Vec<ChangedFile>> {
        let mut files = Vec::new();
        for raw in target.split(',') {
            let path_str = raw.trim();
            if path_str.is_empty() {
                continue;
            }
            let path = Path::new(path_str);
            let full = if path.is_absolute() {
                path.to_path_buf()
            } else {
                self.repo_root.join(path)
            };
            if !full.is_file() {
                return Err(Error::FileNotFound(PathBuf::from(path_str)));
            }
            let content = std::fs::read_to_string(&full)?;
            files.push(full_content_file(path_str, content));
        }
        Ok(files)
    }

    fn tracked_files(&self) -> Result<Vec<ChangedFile>> {
        let listing = self.client.git(&["ls-files"])?;
        Ok(self.read_listing(&listing))
    }

    /// New files not yet staged are uncommitted changes too; they carry no
    /// diff, so they enter the change set as full content.
    fn untracked_files(&self) -> Result<Vec<ChangedFile>> {
        let listing = self
            .client
            .git(&["ls-files", "--others", "--exclude-standard"])?;
        Ok(self.read_listing(&listing))
    }

    fn read_listing(&self, listing: &str) -> Vec<ChangedFile> {
        let mut files = Vec::new();
        for path_str in listing.lines().filter(|l| !l.is_empty()) {
            let full = self.repo_root.join(path_str);
            match std::fs::read_to_string(&full) {
                Ok(content) => files.push(full_content_file(path_str, content)),
                Err(e) => {
                    // Binary or unreadable entries are not reviewable source.
                    debug!(path = path_str, error = %e, "skipping unreadable file");
                }
            }
        }
        files
    }
}

fn require_target<'a>(
    scope: ScopeKind,
    target: Option<&'a str>,
    what: &str,
) -> Result<&'a str> {
    match target {
        Some(t) if !t.trim().is_empty() => Ok(t),
        _ => Err(Error::MissingTarget {
            scope: scope.as_str().to_string(),
            reason: format!("expected {what}"),
        }),
    }
}

fn validate_ref_range(target: &str) -> Result<()> {
    let err = |reason: &str| {
        Err(Error::InvalidTargetFormat {
            scope: "diff".to_string(),
            reason: reason.to_string(),
        })
    };
    if target.chars().any(char::is_whitespace) {
        return err("ref range must not contain whitespace");
    }
    let Some((left, right)) = target.split_once("..") else {
        return err("expected 'ref1..ref2'");
    };
    let right = right.strip_prefix('.').unwrap_or(right);
    if left.is_empty() || right.is_empty() {
        return err("both sides of '..' must be non-empty");
    }
    Ok(())
}

fn build_filters(filters: &[String]) -> Result<Option<GlobSet>> {
    if filters.is_empty() {
        return Ok(None);
    }
    let mut builder = GlobSetBuilder::new();
    for pattern in filters {
        let glob = Glob::new(pattern)
            .map_err(|e| Error::Scope(format!("invalid path filter '{pattern}': {e}")))?;
        builder.add(glob);
    }
    let set = builder
        .build()
        .map_err(|e| Error::Scope(format!("failed to build path filters: {e}")))?;
    Ok(Some(set))
}

fn diff_files(diff: &str) -> Vec<ChangedFile> {
    parse_unified_diff(diff)
        .into_iter()
        .map(|f| ChangedFile {
            language: language_hint(&f.path),
            path: f.path,
            hunks: Some(f.hunks),
            content: None,
        })
        .collect()
}

fn full_content_file(path: &str, content: String) -> ChangedFile {
    ChangedFile {
        path: path.to_string(),
        language: language_hint(path),
        hunks: None,
        content: Some(content),
    }
}

fn language_hint(path: &str) -> Option<String> {
    let ext = Path::new(path).extension()?.to_str()?;
    let lang = match ext {
        "rs" => "rust",
        "py" => "python",
        "js" | "jsx" => "javascript",
        "ts" | "tsx" => "typescript",
        "go" => "go",
        "java" => "java",
        "rb" => "ruby",
        "c" | "h" => "c",
        "cc" | "cpp" | "hpp" => "cpp",
        "sh" | "bash" => "shell",
        "sql" => "sql",
        "toml" => "toml",
        "yml" | "yaml" => "yaml",
        "json" => "json",
        "md" => "markdown",
        _ => return None,
    };
    Some(lang.to_string())
}
