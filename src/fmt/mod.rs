//! Formatter runner: end-of-file normalization followed by user formatters.

use crate::data::FormatterRule;
use crate::git::{Git, GitError};
use globset::{Glob, GlobMatcher};
use std::collections::HashSet;
use std::path::Path;
use std::process::Command;

/// Name shown for the built-in end-of-file normalizer.
pub const EOF_FORMATTER: &str = "eof";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Ok,
    Failed,
    Skipped,
}

impl Outcome {
    pub fn glyph(self) -> &'static str {
        match self {
            Self::Ok => "✓",
            Self::Failed => "✗",
            Self::Skipped => "—",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormatRow {
    pub outcome: Outcome,
    pub path: String,
    pub formatter: String,
    pub exit_code: Option<i32>,
    pub note: String,
}

impl FormatRow {
    fn skipped_binary(path: &str) -> Self {
        Self {
            outcome: Outcome::Skipped,
            path: path.to_string(),
            formatter: "—".to_string(),
            exit_code: None,
            note: "skipped (binary)".to_string(),
        }
    }

    fn finished(path: &str, formatter: &str, exit_code: i32, note: String) -> Self {
        Self {
            outcome: if exit_code == 0 { Outcome::Ok } else { Outcome::Failed },
            path: path.to_string(),
            formatter: formatter.to_string(),
            exit_code: Some(exit_code),
            note,
        }
    }

    pub fn exit_label(&self) -> String {
        self.exit_code.map_or_else(|| "—".to_string(), |c| c.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormatReport {
    /// Nothing staged, modified or untracked.
    Clean,
    Rows(Vec<FormatRow>),
}

/// Strip trailing CR/LF and append one `\n`. `None` when no rewrite is needed.
pub fn normalize_eof(content: &[u8]) -> Option<Vec<u8>> {
    if content.is_empty() {
        return None;
    }
    let end = content
        .iter()
        .rposition(|b| *b != b'\n' && *b != b'\r')
        .map_or(0, |i| i + 1);
    let mut fixed = content[..end].to_vec();
    fixed.push(b'\n');
    (fixed != content).then_some(fixed)
}

/// Apply [`normalize_eof`] to a file in place. Returns whether it was rewritten.
pub fn fix_eof(path: &Path) -> std::io::Result<bool> {
    let content = std::fs::read(path)?;
    match normalize_eof(&content) {
        Some(fixed) => {
            std::fs::write(path, fixed)?;
            Ok(true)
        }
        None => Ok(false),
    }
}

struct CompiledRule<'a> {
    rule: &'a FormatterRule,
    matcher: Option<GlobMatcher>,
}

fn compile(rules: &[FormatterRule]) -> Vec<CompiledRule<'_>> {
    rules
        .iter()
        .map(|rule| {
            let matcher = match Glob::new(&rule.glob) {
                Ok(glob) => Some(glob.compile_matcher()),
                Err(e) => {
                    tracing::warn!("Formatter {} has an invalid glob {}: {}", rule.name, rule.glob, e);
                    None
                }
            };
            CompiledRule { rule, matcher }
        })
        .collect()
}

/// Run a formatter command through `sh -c`; returns the exit code and failure note.
fn run_shell(cmd: &str) -> (i32, String) {
    match Command::new("sh").args(["-c", cmd]).output() {
        Ok(output) if output.status.success() => (0, String::new()),
        Ok(output) => {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            let note = if stderr.is_empty() {
                String::from_utf8_lossy(&output.stdout).trim().to_string()
            } else {
                stderr
            };
            (output.status.code().unwrap_or(1), note)
        }
        Err(e) => (127, e.to_string()),
    }
}

/// Format `paths` (relative to `root`). Binary paths are reported and skipped.
pub fn format_paths(
    root: &Path,
    paths: &[String],
    binary: &HashSet<String>,
    rules: &[FormatterRule],
) -> Vec<FormatRow> {
    let compiled = compile(rules);
    let mut sorted = paths.to_vec();
    sorted.sort();
    sorted.dedup();

    let mut rows = Vec::new();
    for path in &sorted {
        if binary.contains(path) {
            rows.push(FormatRow::skipped_binary(path));
            continue;
        }
        let abs = root.join(path);
        rows.push(match fix_eof(&abs) {
            Ok(_) => FormatRow::finished(path, EOF_FORMATTER, 0, String::new()),
            Err(e) => FormatRow::finished(path, EOF_FORMATTER, 1, e.to_string()),
        });

        let basename = Path::new(path)
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.clone());
        for entry in &compiled {
            let Some(matcher) = &entry.matcher else { continue };
            if !matcher.is_match(&basename) {
                continue;
            }
            let cmd = entry.rule.command_for(&abs.to_string_lossy());
            tracing::debug!("Running formatter {}: {}", entry.rule.name, cmd);
            let (code, note) = run_shell(&cmd);
            rows.push(FormatRow::finished(path, &entry.rule.name, code, note));
        }
    }
    rows
}

/// Format every staged, modified and untracked path in the repository.
pub fn run_formatters(git: &Git, rules: &[FormatterRule]) -> Result<FormatReport, GitError> {
    let paths = git.file_statuses()?.changed_paths();
    if paths.is_empty() {
        return Ok(FormatReport::Clean);
    }
    let root = git.toplevel()?;
    let binary = Git::in_dir(&root).binary_paths(&paths)?;
    Ok(FormatReport::Rows(format_paths(&root, &paths, &binary, rules)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_normalize_eof() {
        assert_eq!(normalize_eof(b""), None);
        assert_eq!(normalize_eof(b"a\n"), None);
        assert_eq!(normalize_eof(b"a"), Some(b"a\n".to_vec()));
        assert_eq!(normalize_eof(b"a\r\n\n\r\n"), Some(b"a\n".to_vec()));
        assert_eq!(normalize_eof(b"\n\n"), Some(b"\n".to_vec()));
    }

    #[test]
    fn test_glyphs() {
        assert_eq!(Outcome::Ok.glyph(), "✓");
        assert_eq!(Outcome::Failed.glyph(), "✗");
        assert_eq!(Outcome::Skipped.glyph(), "—");
    }
}
