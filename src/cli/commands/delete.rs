//! `securevault delete`: remove a credential from the vault.

use uuid::Uuid;

use crate::cli::output;
use crate::cli::{confirm, open_vault, Cli};
use crate::errors::Result;

/// Execute the `delete` command.
pub async fn execute(cli: &Cli, id: Uuid, force: bool) -> Result<()> {
    // Unless --force is set, ask for confirmation before deleting.
    if !force && !confirm(&format!("Delete credential {id}?"))? {
        output::info("Cancelled.");
        return Ok(());
    }

    let session = open_vault(cli).await?;
    let result = session.store.remove(id).await;
    session.finish(result).await?;

    output::success(&format!("Deleted credential {id}"));

    Ok(())
}
