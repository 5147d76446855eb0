//! `securevault list`: display all credentials in a table.

use uuid::Uuid;

use crate::cli::output;
use crate::cli::view::VaultView;
use crate::cli::{open_vault, Cli};
use crate::errors::Result;

/// Execute the `list` command.
pub async fn execute(cli: &Cli, reveal: &[Uuid]) -> Result<()> {
    let session = open_vault(cli).await?;
    let result = session.store.list().await;
    let email = session.store.principal().email.clone();
    let records = session.finish(result).await?;

    let mut view = VaultView::new(records);
    for id in reveal {
        if !view.is_visible(*id) {
            view.toggle(*id)?;
        }
    }

    output::info(&format!("{email}: {} saved password(s)", view.len()));
    output::print_credentials_table(&view.rows());

    Ok(())
}
