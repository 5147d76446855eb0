//! `securevault reset`: overwrite the vault with an empty one.

use crate::cli::output;
use crate::cli::{confirm, sign_in, Cli};
use crate::errors::Result;

/// Execute the `reset` command.
///
/// Deliberately skips `load()`: this is how a corrupt vault is recovered.
pub async fn execute(cli: &Cli, force: bool) -> Result<()> {
    if !force {
        output::warning("This permanently erases every saved password for the account.");
        if !confirm("Reset the vault?")? {
            output::info("Cancelled.");
            return Ok(());
        }
    }

    let session = sign_in(cli).await?;
    let result = session.store.reset().await;
    session.finish(result).await?;

    output::success("Vault reset; it is now empty.");

    Ok(())
}
