//! Render command - print what ensure would apply

use console::style;
use std::path::Path;

use super::Session;
use crate::RunArgs;
use crate::error::{CliError, Result};

pub async fn run(args: &RunArgs, output: Option<&Path>) -> Result<()> {
    let session = Session::load(args)?;
    session.cancel_on_interrupt();

    let rendered = session.config.render(&session.input).await?;

    match output {
        Some(path) => {
            std::fs::write(path, &rendered).map_err(|e| CliError::Io {
                message: format!("{}: {}", path.display(), e),
            })?;
            eprintln!(
                "{} Wrote {}",
                style("✓").green().bold(),
                style(path.display()).cyan()
            );
        }
        None => print!("{}", rendered),
    }
    Ok(())
}
