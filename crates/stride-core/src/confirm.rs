use std::io::{self, BufRead, Write};

use tracing::debug;

use crate::config::Config;

/// Blocking yes/no prompt gating destructive operations. Honors the
/// `confirmation` config key so scripts can opt out.
#[tracing::instrument(skip(cfg))]
pub fn confirm(cfg: &Config, title: &str, message: &str) -> anyhow::Result<bool> {
    if !cfg.get_bool("confirmation").unwrap_or(true) {
        debug!("confirmation disabled by config");
        return Ok(true);
    }

    let stdin = io::stdin();
    let stdout = io::stdout();
    prompt(stdin.lock(), stdout.lock(), title, message)
}

fn prompt<R: BufRead, W: Write>(
    mut reader: R,
    mut writer: W,
    title: &str,
    message: &str,
) -> anyhow::Result<bool> {
    writeln!(writer, "{title}")?;
    write!(writer, "{message} (yes/no) ")?;
    writer.flush()?;

    let mut line = String::new();
    reader.read_line(&mut line)?;
    Ok(matches!(
        line.trim().to_ascii_lowercase().as_str(),
        "y" | "yes"
    ))
}
