//! Shell integration: `jg hook` and `jg setup`.
//!
//! The hook keeps `JG_TICKET` per shell. It is seeded from the state file
//! when a shell starts, refreshed after `jg set` and `jg branch --all`, and
//! set to empty by `jg clear` so the shell does not fall back to the file.

use super::{confirm, Context, Exit};
use crate::config::ConfigError;
use anyhow::{Context as _, Result};
use clap::ValueEnum;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Shell {
    Fish,
    Bash,
    Zsh,
}

const FISH_HOOK: &str = r#"# Seed JG_TICKET from the persisted default when this shell starts
if not set -q JG_TICKET
    set -l _jg_default (cat STATE_FILE 2>/dev/null)
    if test -n "$_jg_default"
        set -gx JG_TICKET $_jg_default
    end
end

function __jg_refresh
    set -l _jg_ticket (cat STATE_FILE 2>/dev/null)
    if test -n "$_jg_ticket"
        set -gx JG_TICKET $_jg_ticket
    end
end

function jg
    command jg $argv
    set -l _jg_exit $status
    switch "$argv[1]"
        case set
            __jg_refresh
        case branch
            # plain 'jg branch' never changes the state file
            if contains -- --all $argv
                __jg_refresh
            end
        case clear
            set -gx JG_TICKET ""
    end
    return $_jg_exit
end
"#;

const POSIX_HOOK: &str = r#"# Seed JG_TICKET from the persisted default when this shell starts
if [ -z "${JG_TICKET+x}" ]; then
    _jg_default=$(cat STATE_FILE 2>/dev/null)
    if [ -n "$_jg_default" ]; then
        export JG_TICKET="$_jg_default"
    fi
    unset _jg_default
fi

# Splice into your prompt:
#   bash: PS1='$(__jg_ps1)\$ '
#   zsh:  PROMPT='$(__jg_ps1)%% '
__jg_ps1() {
    [ -n "${JG_TICKET:-}" ] && printf '%s ' "$JG_TICKET"
}

__jg_refresh() {
    local _jg_ticket
    _jg_ticket=$(cat STATE_FILE 2>/dev/null)
    if [ -n "$_jg_ticket" ]; then
        export JG_TICKET="$_jg_ticket"
    fi
}

jg() {
    command jg "$@"
    local _jg_exit=$?
    case "$1" in
        set)
            __jg_refresh
            ;;
        branch)
            # plain 'jg branch' never changes the state file
            local _jg_arg
            for _jg_arg in "$@"; do
                if [ "$_jg_arg" = "--all" ]; then
                    __jg_refresh
                    break
                fi
            done
            ;;
        clear)
            export JG_TICKET=""
            ;;
    esac
    return $_jg_exit
}
"#;

/// Single-quote `text` for a POSIX or fish command line.
fn shell_quote(text: &str) -> String {
    format!("'{}'", text.replace('\'', r"'\''"))
}

/// The hook for `shell`, reading the ticket from `state_file`.
pub fn hook_script(shell: Shell, state_file: &Path) -> String {
    let template = match shell {
        Shell::Fish => FISH_HOOK,
        Shell::Bash | Shell::Zsh => POSIX_HOOK,
    };
    template.replace("STATE_FILE", &shell_quote(&state_file.to_string_lossy()))
}

pub fn hook(ctx: &Context, shell: Shell) -> Result<()> {
    print!("{}", hook_script(shell, ctx.tickets.state_file()));
    Ok(())
}

/// Tide prompt item showing the shell's ticket.
pub const TIDE_ITEM: &str = r#"function _tide_item_jg
    if test -n "$JG_TICKET"
        _tide_print_item jg $tide_jg_icon' ' $JG_TICKET
    end
end
"#;

fn tide_item_path() -> Result<PathBuf, ConfigError> {
    let home = dirs::home_dir().ok_or(ConfigError::NoHomeDir)?;
    Ok(home.join(".config").join("fish").join("functions").join("_tide_item_jg.fish"))
}

/// Install the fish/tide prompt item after confirmation.
pub fn setup() -> Result<()> {
    let path = tide_item_path()?;
    let question = if path.exists() {
        format!("{} already exists. Overwrite?", path.display())
    } else {
        format!("Create {}?", path.display())
    };
    if !confirm(&question, false)? {
        return Err(Exit::err("Aborted!"));
    }

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    std::fs::write(&path, TIDE_ITEM).with_context(|| format!("Failed to write {}", path.display()))?;
    println!("Wrote {}", path.display());
    println!();
    println!("To finish setup, run these in fish:");
    println!("  set -U tide_right_prompt_items $tide_right_prompt_items jg");
    println!("  set -U tide_jg_icon '󰔖'");
    println!("  set -U tide_jg_bg_color blue");
    println!("  set -U tide_jg_color white");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fish_hook_clears_with_empty_value() {
        let script = hook_script(Shell::Fish, Path::new("/home/u/.local/share/jira-git-helper/ticket"));
        assert!(script.contains("(cat '/home/u/.local/share/jira-git-helper/ticket' 2>/dev/null)"));
        assert!(script.contains("set -gx JG_TICKET \"\""));
        assert!(!script.contains("set -e JG_TICKET"));
        assert!(!script.contains("STATE_FILE"));
    }

    #[test]
    fn test_posix_hook_only_seeds_unset_variable() {
        let script = hook_script(Shell::Zsh, Path::new("/tmp/it's/ticket"));
        assert!(script.starts_with("# Seed JG_TICKET"));
        assert!(script.contains(r#"if [ -z "${JG_TICKET+x}" ]; then"#));
        assert!(script.contains(r"cat '/tmp/it'\''s/ticket'"));
        assert!(script.contains("export JG_TICKET=\"\""));
        assert_eq!(hook_script(Shell::Bash, Path::new("/t")), hook_script(Shell::Zsh, Path::new("/t")));
    }

    #[test]
    fn test_tide_item_hides_empty_ticket() {
        assert!(TIDE_ITEM.contains("test -n \"$JG_TICKET\""));
    }
}
