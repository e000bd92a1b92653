use tracing::debug;

/// A contiguous block of added lines from one hunk of a unified diff.
///
/// Line numbers refer to the post-change file and are 1-based inclusive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiffHunk {
    pub start: u32,
    pub end: u32,
    /// Added lines as `(line_number, text)`.
    pub lines: Vec<(u32, String)>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileDiff {
    pub path: String,
    pub hunks: Vec<DiffHunk>,
}

/// Parse `git diff` / `gh pr diff` unified output into per-file hunks.
///
/// Files are anchored on `diff --git` so that `+++`/`---` strings occurring
/// inside hunk bodies cannot be mistaken for headers. Deleted files
/// (`+++ /dev/null`) are dropped; a review has nothing to say about lines
/// that no longer exist.
pub fn parse_unified_diff(diff: &str) -> Vec<FileDiff> {
    let mut files: Vec<FileDiff> = Vec::new();
    let mut current: Option<FileDiff> = None;
    let mut hunk: Option<DiffHunk> = None;
    let mut new_line: u32 = 0;

    for line in diff.lines() {
        if line.starts_with("diff --git ") {
            flush_hunk(&mut current, &mut hunk);
            if let Some(file) = current.take() {
                push_file(&mut files, file);
            }
        } else if hunk.is_none()
            && let Some(rest) = line.strip_prefix("+++ ")
        {
            if rest == "/dev/null" {
                current = None;
            } else {
                let path = rest.strip_prefix("b/").unwrap_or(rest);
                current = Some(FileDiff {
                    path: path.to_string(),
                    hunks: Vec::new(),
                });
            }
        } else if line.starts_with("@@") && current.is_some() {
            flush_hunk(&mut current, &mut hunk);
            match parse_hunk_header(line) {
                Some(start) => {
                    new_line = start;
                    hunk = Some(DiffHunk {
                        start,
                        end: start,
                        lines: Vec::new(),
                    });
                }
                None => {
                    debug!(line, "skipping malformed hunk header");
                    hunk = None;
                }
            }
        } else if hunk.is_some() && current.is_some() {
            if let Some(added) = line.strip_prefix('+') {
                if let Some(ref mut h) = hunk {
                    h.lines.push((new_line, added.to_string()));
                    h.end = new_line;
                }
                new_line += 1;
            } else if !line.starts_with('-') && !line.starts_with('\\') {
                // Context line advances the post-change line counter.
                new_line += 1;
            }
        }
    }

    flush_hunk(&mut current, &mut hunk);
    if let Some(file) = current.take() {
        push_file(&mut files, file);
    }

    files
}

fn push_file(files: &mut Vec<FileDiff>, file: FileDiff) {
    if !file.hunks.is_empty() {
        files.push(file);
    }
}

fn flush_hunk(current: &mut Option<FileDiff>, hunk: &mut Option<DiffHunk>) {
    if let (Some(file), Some(h)) = (current.as_mut(), hunk.take())
        && !h.lines.is_empty()
    {
        file.hunks.push(h);
    }
}

/// Extract the new-file start line from `@@ -a,b +c,d @@`.
fn parse_hunk_header(line: &str) -> Option<u32> {
    let plus = line.split_whitespace().find(|tok| tok.starts_with('+'))?;
    let range = &plus[1..];
    let start = range.split(',').next()?;
    start.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "\
diff --git a/src/lib.rs b/src/lib.rs
index 111..222 100644
--- a/src/lib.rs
+++ b/src/lib.rs
@@ -1,4 +1,6 @@
 fn existing() {}
+fn added_one() {}
+fn added_two() {}
 fn also_existing() {}
@@ -10,2 +12,3 @@
 fn tail() {}
+fn added_three() {}
";

    #[test]
    fn test_parse_single_file_two_hunks() {
        let files = parse_unified_diff(SAMPLE);
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].path, "src/lib.rs");
        assert_eq!(files[0].hunks.len(), 2);
    }

    #[test]
    fn test_added_line_numbers() {
        let files = parse_unified_diff(SAMPLE);
        let first = &files[0].hunks[0];
        assert_eq!(
            first.lines,
            vec![
                (2, "fn added_one() {}".to_string()),
                (3, "fn added_two() {}".to_string()),
            ]
        );

        let second = &files[0].hunks[1];
        assert_eq!(second.lines, vec![(13, "fn added_three() {}".to_string())]);
    }

    #[test]
    fn test_deleted_file_skipped() {
        let diff = "\
diff --git a/gone.rs b/gone.rs
--- a/gone.rs
+++ /dev/null
@@ -1,2 +0,0 @@
-fn gone() {}
-fn also_gone() {}
";
        assert!(parse_unified_diff(diff).is_empty());
    }

    #[test]
    fn test_removed_lines_do_not_advance_counter() {
        let diff = "\
diff --git a/f.rs b/f.rs
--- a/f.rs
+++ b/f.rs
@@ -1,3 +1,2 @@
 keep
-removed
+replacement
";
        let files = parse_unified_diff(diff);
        assert_eq!(files[0].hunks[0].lines, vec![(2, "replacement".to_string())]);
    }

    #[test]
    fn test_hunk_without_count_suffix() {
        let diff = "\
diff --git a/f.rs b/f.rs
--- a/f.rs
+++ b/f.rs
@@ -1 +1 @@
-old
+new
";
        let files = parse_unified_diff(diff);
        assert_eq!(files[0].hunks[0].lines, vec![(1, "new".to_string())]);
    }

    #[test]
    fn test_new_file() {
        let diff = "\
diff --git a/fresh.rs b/fresh.rs
--- /dev/null
+++ b/fresh.rs
@@ -0,0 +1,2 @@
+line one
+line two
";
        let files = parse_unified_diff(diff);
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].path, "fresh.rs");
        assert_eq!(
            files[0].hunks[0].lines,
            vec![(1, "line one".to_string()), (2, "line two".to_string())]
        );
    }

    #[test]
    fn test_multiple_files() {
        let diff = "\
diff --git a/a.rs b/a.rs
--- a/a.rs
+++ b/a.rs
@@ -1 +1,2 @@
 keep
+added a
diff --git a/b.rs b/b.rs
--- a/b.rs
+++ b/b.rs
@@ -1 +1,2 @@
 keep
+added b
";
        let files = parse_unified_diff(diff);
        assert_eq!(files.len(), 2);
        assert_eq!(files[0].path, "a.rs");
        assert_eq!(files[0].hunks[0].lines, vec![(2, "added a".to_string())]);
        assert_eq!(files[1].path, "b.rs");
        assert_eq!(files[1].hunks[0].lines, vec![(2, "added b".to_string())]);
    }

    #[test]
    fn test_file_with_only_removals_dropped() {
        let diff = "\
diff --git a/f.rs b/f.rs
--- a/f.rs
+++ b/f.rs
@@ -1,2 +1 @@
 keep
-removed
";
        assert!(parse_unified_diff(diff).is_empty());
    }

    #[test]
    fn test_added_line_resembling_header_stays_in_hunk() {
        let diff = "\
diff --git a/f.rs b/f.rs
--- a/f.rs
+++ b/f.rs
@@ -1 +1,2 @@
 keep
+++ suspicious content
";
        let files = parse_unified_diff(diff);
        assert_eq!(
            files[0].hunks[0].lines,
            vec![(2, "++ suspicious content".to_string())]
        );
    }

    #[test]
    fn test_no_newline_marker_ignored() {
        let diff = "\
diff --git a/f.rs b/f.rs
--- a/f.rs
+++ b/f.rs
@@ -1 +1 @@
-old
+new
\\ No newline at end of file
";
        let files = parse_unified_diff(diff);
        assert_eq!(files[0].hunks[0].lines.len(), 1);
    }

    #[test]
    fn test_empty_input() {
        assert!(parse_unified_diff("").is_empty());
    }
}
