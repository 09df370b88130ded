//! Teardown command - remove everything a config describes

use console::style;

use super::Session;
use crate::RunArgs;
use crate::error::Result;

pub async fn run(args: &RunArgs) -> Result<()> {
    let session = Session::load(args)?;
    session.cancel_on_interrupt();

    println!(
        "{} Tearing down {}",
        style("→").blue().bold(),
        style(args.file.display()).cyan()
    );
    session.config.teardown(&session.input).await?;

    println!(
        "{} Teardown of {} complete",
        style("✓").green().bold(),
        style(args.file.display()).cyan()
    );
    Ok(())
}
