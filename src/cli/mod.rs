//! CLI module: Clap argument parser, prompts, output helpers, and command
//! implementations.

pub mod commands;
pub mod output;
pub mod view;

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use uuid::Uuid;
use zeroize::Zeroizing;

use crate::config::Settings;
use crate::errors::{Result, VaultError};
use crate::identity::LocalIdentityProvider;
use crate::session::SessionGate;
use crate::storage::FileStorage;
use crate::vault::VaultStore;

/// Environment variable consulted before prompting for the account password.
pub const PASSWORD_ENV: &str = "SECUREVAULT_PASSWORD";

/// SecureVault CLI: encrypted per-account password vault.
#[derive(Parser)]
#[command(
    name = "securevault",
    about = "Encrypted per-account password vault",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Account email (prompted for when omitted)
    #[arg(long, env = "SECUREVAULT_EMAIL", global = true)]
    pub email: Option<String>,

    /// Data directory (default: .securevault, or `data_dir` from .securevault.toml)
    #[arg(long, global = true)]
    pub data_dir: Option<String>,
}

/// All available subcommands.
#[derive(clap::Subcommand)]
pub enum Commands {
    /// Create an account and its empty vault
    Register,

    /// Store a new website / username / password entry
    Add {
        /// Website URL (e.g. https://example.com)
        website: String,
        /// Username for the website
        username: String,
    },

    /// List stored credentials with passwords masked
    List {
        /// Show the password of these entries instead of masking it
        #[arg(long, value_name = "ID")]
        reveal: Vec<Uuid>,
    },

    /// Print one credential's password
    Show {
        /// Credential id (from `list`)
        id: Uuid,
    },

    /// Delete a credential
    Delete {
        /// Credential id (from `list`)
        id: Uuid,
        /// Skip confirmation prompt
        #[arg(short, long)]
        force: bool,
    },

    /// Erase every stored credential (recovers a corrupt vault)
    Reset {
        /// Skip confirmation prompt
        #[arg(short, long)]
        force: bool,
    },
}

// ---------------------------------------------------------------------------
// Shared helpers used by multiple commands
// ---------------------------------------------------------------------------

/// An open session: the gate and the vault it handed out.
pub struct Session {
    pub gate: SessionGate,
    pub store: Arc<VaultStore>,
}

impl Session {
    /// Sign out, then report the command's own error ahead of any
    /// sign-out failure.
    pub async fn finish<T>(self, result: Result<T>) -> Result<T> {
        let signed_out = self.gate.sign_out().await;
        let value = result?;
        signed_out?;
        Ok(value)
    }
}

/// Load settings from the working directory, applying `--data-dir`.
pub fn load_settings(cli: &Cli) -> Result<(PathBuf, Settings)> {
    let cwd = std::env::current_dir()?;
    let mut settings = Settings::load(&cwd)?;
    if let Some(dir) = &cli.data_dir {
        settings.data_dir = dir.clone();
    }
    Ok((cwd, settings))
}

/// Build a gate over the on-disk account directory and vault blobs.
pub fn build_gate(cli: &Cli) -> Result<SessionGate> {
    let (cwd, settings) = load_settings(cli)?;

    let provider = LocalIdentityProvider::open(
        settings.accounts_path(&cwd),
        settings.argon2_params(),
    )?;
    let storage = FileStorage::new(settings.data_path(&cwd));

    Ok(SessionGate::new(
        Arc::new(provider),
        Arc::new(storage),
        settings.gate_options(),
    ))
}

/// Sign in to an existing account. The returned vault is not loaded.
pub async fn sign_in(cli: &Cli) -> Result<Session> {
    let gate = build_gate(cli)?;
    let email = prompt_email(cli)?;
    let password = prompt_password()?;

    let store = gate.sign_in(&email, &password).await?;
    Ok(Session { gate, store })
}

/// Sign in and load the vault.
pub async fn open_vault(cli: &Cli) -> Result<Session> {
    let session = sign_in(cli).await?;
    if let Err(e) = session.store.load().await {
        return session.finish(Err(e)).await;
    }
    Ok(session)
}

/// The account email: `--email` / `SECUREVAULT_EMAIL`, else a prompt.
pub fn prompt_email(cli: &Cli) -> Result<String> {
    if let Some(email) = &cli.email {
        return Ok(email.clone());
    }

    dialoguer::Input::<String>::new()
        .with_prompt("Email")
        .interact_text()
        .map_err(|e| VaultError::CommandFailed(format!("email prompt: {e}")))
}

/// Get the account password, trying in order:
/// 1. `SECUREVAULT_PASSWORD` env var (CI/CD)
/// 2. Interactive prompt
///
/// Returns `Zeroizing<String>` so the password is wiped from memory on drop.
pub fn prompt_password() -> Result<Zeroizing<String>> {
    if let Some(pw) = password_from_env() {
        return Ok(pw);
    }

    let pw = dialoguer::Password::new()
        .with_prompt("Account password")
        .interact()
        .map_err(|e| VaultError::CommandFailed(format!("password prompt: {e}")))?;
    Ok(Zeroizing::new(pw))
}

/// Prompt for a new password and its confirmation (used by `register`).
///
/// Both are returned unchecked; the session gate compares them. With
/// `SECUREVAULT_PASSWORD` set, the variable serves as both.
pub fn prompt_new_password() -> Result<(Zeroizing<String>, Zeroizing<String>)> {
    if let Some(pw) = password_from_env() {
        let confirmation = pw.clone();
        return Ok((pw, confirmation));
    }

    let prompt = |text: &str| {
        dialoguer::Password::new()
            .with_prompt(text)
            .allow_empty_password(true)
            .interact()
            .map(Zeroizing::new)
            .map_err(|e| VaultError::CommandFailed(format!("password prompt: {e}")))
    };

    let password = prompt("Choose account password")?;
    let confirmation = prompt("Confirm account password")?;
    Ok((password, confirmation))
}

fn password_from_env() -> Option<Zeroizing<String>> {
    std::env::var(PASSWORD_ENV)
        .ok()
        .filter(|pw| !pw.is_empty())
        .map(Zeroizing::new)
}

/// Ask a yes/no question, defaulting to "no".
pub fn confirm(prompt: &str) -> Result<bool> {
    dialoguer::Confirm::new()
        .with_prompt(prompt)
        .default(false)
        .interact()
        .map_err(|e| VaultError::CommandFailed(format!("confirm prompt: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from([
            "securevault",
            "list",
            "--email",
            "a@b.co",
            "--data-dir",
            "/tmp/sv",
        ])
        .unwrap();
        assert_eq!(cli.email.as_deref(), Some("a@b.co"));
        assert_eq!(cli.data_dir.as_deref(), Some("/tmp/sv"));
        assert!(matches!(cli.command, Commands::List { ref reveal } if reveal.is_empty()));
    }

    #[test]
    fn reveal_accepts_repeated_ids() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let cli = Cli::try_parse_from([
            "securevault",
            "list",
            "--reveal",
            &a.to_string(),
            "--reveal",
            &b.to_string(),
        ])
        .unwrap();
        match cli.command {
            Commands::List { reveal } => assert_eq!(reveal, vec![a, b]),
            _ => panic!("expected list"),
        }
    }

    #[test]
    fn rejects_malformed_ids() {
        assert!(Cli::try_parse_from(["securevault", "show", "not-a-uuid"]).is_err());
    }
}
