//! `jg fmt`: run the formatters, or manage them.

use super::{prompt, Context};
use crate::data::FormatterRule;
use crate::fmt::{run_formatters, FormatReport, FormatRow};
use anyhow::{bail, Context as _, Result};
use globset::Glob;
use unicode_width::UnicodeWidthStr;

pub fn run(ctx: &Context) -> Result<()> {
    match run_formatters(&ctx.git, &ctx.store.formatters())? {
        FormatReport::Clean => println!("Nothing to format — working tree clean."),
        FormatReport::Rows(rows) => print!("{}", render_report(&rows)),
    }
    Ok(())
}

fn pad(text: &str, width: usize) -> String {
    let fill = width.saturating_sub(text.width());
    format!("{text}{}", " ".repeat(fill))
}

/// Aligned plain-text table: glyph, File, Formatter, Exit, Note.
pub fn render_report(rows: &[FormatRow]) -> String {
    let header = ["", "File", "Formatter", "Exit"];
    let cells: Vec<[String; 4]> = rows
        .iter()
        .map(|r| {
            [
                r.outcome.glyph().to_string(),
                r.path.clone(),
                r.formatter.clone(),
                r.exit_label(),
            ]
        })
        .collect();

    let mut widths = header.map(UnicodeWidthStr::width);
    for row in &cells {
        for (w, cell) in widths.iter_mut().zip(row) {
            *w = (*w).max(cell.width());
        }
    }

    let line = |cols: [&str; 4], note: &str| {
        let mut out: Vec<String> = cols.iter().zip(widths).map(|(c, w)| pad(c, w)).collect();
        out.push(note.to_string());
        format!("{}\n", out.join(" ").trim_end())
    };

    let mut out = line(header, "Note");
    for (row, cell) in rows.iter().zip(&cells) {
        out.push_str(&line(
            [cell[0].as_str(), cell[1].as_str(), cell[2].as_str(), cell[3].as_str()],
            row.note.lines().next().unwrap_or_default(),
        ));
    }
    out
}

pub fn add(ctx: &mut Context, name: Option<String>) -> Result<()> {
    let mut formatters = ctx.store.formatters();
    let name = match name {
        Some(name) => name,
        None => prompt("Formatter name")?,
    };
    if formatters.iter().any(|f| f.name == name) {
        bail!("A formatter named '{name}' already exists. Delete it first with: jg fmt delete {name}");
    }
    let glob = prompt("File glob (e.g. *.hcl, *.tf)")?;
    Glob::new(&glob).with_context(|| format!("Invalid glob '{glob}'"))?;
    let cmd = prompt("Command (use {} for the filename, e.g. terragrunt hcl fmt {})")?;

    formatters.push(FormatterRule { name: name.clone(), glob, cmd });
    ctx.store.set_formatters(&formatters)?;
    println!("Added formatter '{name}'.");
    Ok(())
}

/// One block per formatter: name, glob, command.
pub fn render_list(formatters: &[FormatterRule], prefix: &str) -> String {
    formatters
        .iter()
        .map(|f| format!("{prefix}{}\n  glob:    {}\n  command: {}\n", f.name, f.glob, f.cmd))
        .collect()
}

pub fn list(ctx: &Context) -> Result<()> {
    let formatters = ctx.store.formatters();
    if formatters.is_empty() {
        println!("No formatters configured.");
    } else {
        print!("{}", render_list(&formatters, ""));
    }
    Ok(())
}

pub fn delete(ctx: &mut Context, name: &str) -> Result<()> {
    let mut formatters = ctx.store.formatters();
    let before = formatters.len();
    formatters.retain(|f| f.name != name);
    if formatters.len() == before {
        bail!("No formatter named '{name}'.");
    }
    ctx.store.set_formatters(&formatters)?;
    println!("Deleted formatter '{name}'.");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fmt::Outcome;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_render_report_aligns_columns() {
        let rows = vec![
            FormatRow {
                outcome: Outcome::Ok,
                path: "main.tf".into(),
                formatter: "eof".into(),
                exit_code: Some(0),
                note: String::new(),
            },
            FormatRow {
                outcome: Outcome::Failed,
                path: "modules/vpc.hcl".into(),
                formatter: "terragrunt".into(),
                exit_code: Some(1),
                note: "parse error\nmore".into(),
            },
        ];
        assert_eq!(
            render_report(&rows),
            "  File            Formatter  Exit Note\n\
             ✓ main.tf         eof        0\n\
             ✗ modules/vpc.hcl terragrunt 1    parse error\n"
        );
    }

    #[test]
    fn test_render_list() {
        let rules = vec![FormatterRule {
            name: "hcl".into(),
            glob: "*.hcl".into(),
            cmd: "terragrunt hcl fmt {}".into(),
        }];
        assert_eq!(
            render_list(&rules, "fmt  "),
            "fmt  hcl\n  glob:    *.hcl\n  command: terragrunt hcl fmt {}\n"
        );
    }
}
