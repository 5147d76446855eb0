//! `securevault add`: store a new credential.

use std::io::{self, IsTerminal, Read};

use zeroize::Zeroizing;

use crate::cli::output;
use crate::cli::{open_vault, Cli};
use crate::errors::{Result, VaultError};
use crate::vault::{CredentialRecord, NewCredential, VaultStore};

/// Execute the `add` command.
pub async fn execute(cli: &Cli, website: &str, username: &str) -> Result<()> {
    let secret = read_secret(website)?;

    let candidate = NewCredential::new(website, username, secret.as_str());

    let session = open_vault(cli).await?;
    let result = save(&session.store, candidate).await;
    let (record, total) = session.finish(result).await?;

    output::success(&format!(
        "Saved password for {} ({} total)",
        record.host(),
        total
    ));
    output::tip(&format!("Id: {}", record.id));
    Ok(())
}

async fn save(store: &VaultStore, candidate: NewCredential) -> Result<(CredentialRecord, usize)> {
    let record = store.add(candidate).await?;
    let total = store.len().await?;
    Ok((record, total))
}

/// The website password, from piped stdin or a hidden prompt.
fn read_secret(website: &str) -> Result<Zeroizing<String>> {
    if !io::stdin().is_terminal() {
        let mut buf = Zeroizing::new(String::new());
        io::stdin().read_to_string(&mut *buf)?;
        let trimmed = buf.trim_end_matches(['\r', '\n']).len();
        buf.truncate(trimmed);
        return Ok(buf);
    }

    dialoguer::Password::new()
        .with_prompt(format!("Password for {website}"))
        .allow_empty_password(true)
        .interact()
        .map(Zeroizing::new)
        .map_err(|e| VaultError::CommandFailed(format!("input prompt: {e}")))
}
