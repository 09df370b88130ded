//! Ensure command - create or update everything a config describes

use console::style;
use std::time::Instant;

use super::Session;
use crate::RunArgs;
use crate::error::Result;

pub async fn run(args: &RunArgs) -> Result<()> {
    let session = Session::load(args)?;
    session.cancel_on_interrupt();

    println!(
        "{} Ensuring {}",
        style("→").blue().bold(),
        style(args.file.display()).cyan()
    );
    let started = Instant::now();
    session.config.ensure(&session.input).await?;

    println!(
        "{} Ensured {} in {:.1}s",
        style("✓").green().bold(),
        style(args.file.display()).cyan(),
        started.elapsed().as_secs_f64()
    );
    Ok(())
}
