//! `securevault register`: create an account and its empty vault.

use crate::cli::output;
use crate::cli::{build_gate, prompt_email, prompt_new_password, Cli, Session};
use crate::errors::Result;

/// Execute the `register` command.
pub async fn execute(cli: &Cli) -> Result<()> {
    let gate = build_gate(cli)?;
    let email = prompt_email(cli)?;
    let (password, confirmation) = prompt_new_password()?;

    let store = gate.sign_up(&email, &password, &confirmation).await?;
    let session = Session { gate, store };

    let result = session.store.load().await;
    session.finish(result).await?;

    output::success(&format!("Account created for {email}"));
    output::tip("Run `securevault add <WEBSITE> <USERNAME>` to save a password.");
    Ok(())
}
