//! Browser, clipboard and channel helpers shared by commands and pickers.

use anyhow::{bail, Result};
use std::io::Write;
use std::process::{Command, Stdio};
use tokio::sync::mpsc;

/// Deliver a background result; a closed picker has dropped its receiver.
pub async fn send_or_log<T>(tx: &mpsc::Sender<T>, value: T, context: &str) {
    if let Err(e) = tx.send(value).await {
        tracing::debug!("Dropped {} result: {}", context, e);
    }
}

/// Open a URL in the default browser.
pub fn open_url(url: &str) -> Result<()> {
    let opener = if cfg!(target_os = "macos") { "open" } else { "xdg-open" };
    Command::new(opener)
        .arg(url)
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
        .or_else(|_| {
            // WSL
            Command::new("wslview").arg(url).spawn()
        })?;
    Ok(())
}

/// Clipboard utilities in preference order.
const CLIPBOARD_COMMANDS: [&[&str]; 3] = [
    &["pbcopy"],
    &["wl-copy"],
    &["xclip", "-selection", "clipboard"],
];

/// Copy text with the first clipboard utility that succeeds.
pub fn copy_to_clipboard(text: &str) -> Result<()> {
    for argv in CLIPBOARD_COMMANDS {
        let Ok(mut child) = Command::new(argv[0])
            .args(&argv[1..])
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
        else {
            continue;
        };
        if let Some(mut stdin) = child.stdin.take() {
            stdin.write_all(text.as_bytes())?;
        }
        if child.wait()?.success() {
            return Ok(());
        }
    }
    tracing::warn!("No clipboard utility available");
    bail!("No clipboard utility found (install pbcopy, wl-copy, or xclip)")
}
