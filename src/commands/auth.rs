//! Complete authentication of a created session

use std::io::Write;
use std::path::PathBuf;

use tracing::info;

use crate::error::{Error, Result};
use crate::session::{ensure_session_present, with_staged_session, Workspace};
use crate::telegram::{ApiCredentials, Connector, TelegramApi};

#[derive(Debug, Clone)]
pub struct AuthArgs {
    pub credentials: ApiCredentials,
    pub session: PathBuf,
    pub phone: String,
    pub auth_hash: String,
    pub auth_code: String,
    /// Two-step verification password, used only if the account asks for it.
    pub password: Option<String>,
}

pub async fn run<C: Connector>(
    connector: &C,
    workspace: &Workspace,
    args: &AuthArgs,
    out: &mut dyn Write,
) -> Result<()> {
    let _lock = workspace.lock()?;
    workspace.ensure_vacant()?;
    ensure_session_present(&args.session)?;

    let staged = workspace.stage(&args.session)?;
    let working_path = staged.working_path().to_path_buf();

    let account = with_staged_session(staged, async {
        let client = connector.connect(&args.credentials, &working_path).await?;
        let account = sign_in(&client, args).await;
        client.disconnect().await;
        account
    })
    .await?;

    info!(session = %args.session.display(), "Session authenticated");
    writeln!(out, "Signed in as {}", account)?;

    Ok(())
}

async fn sign_in<A: TelegramApi>(client: &A, args: &AuthArgs) -> Result<String> {
    info!(phone = %args.phone, "Signing in");
    match client
        .sign_in(&args.phone, &args.auth_hash, &args.auth_code)
        .await
    {
        Err(Error::PasswordRequired) => match &args.password {
            Some(password) => {
                info!("Two-step verification enabled, checking password");
                client.check_password(password).await
            }
            None => Err(Error::PasswordRequired),
        },
        outcome => outcome,
    }
}
