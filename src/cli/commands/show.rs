//! `securevault show`: print one credential's password.

use uuid::Uuid;

use crate::cli::{open_vault, Cli};
use crate::errors::Result;

/// Execute the `show` command.
pub async fn execute(cli: &Cli, id: Uuid) -> Result<()> {
    let session = open_vault(cli).await?;
    let result = session.store.reveal(id).await;
    let secret = session.finish(result).await?;

    println!("{}", secret.expose());

    Ok(())
}
