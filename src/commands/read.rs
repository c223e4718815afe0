//! Read recent messages from the Telegram service account

use std::io::Write;
use std::path::PathBuf;

use tracing::info;

use crate::chat::{find_official_dialog, format_history};
use crate::config::DEFAULT_HISTORY_LIMIT;
use crate::error::{Error, Result};
use crate::session::{ensure_session_present, with_staged_session, Workspace};
use crate::telegram::{ApiCredentials, Connector, TelegramApi};

#[derive(Debug, Clone)]
pub struct ReadArgs {
    pub credentials: ApiCredentials,
    pub session: PathBuf,
    pub history_limit: usize,
}

impl ReadArgs {
    pub fn new(credentials: ApiCredentials, session: PathBuf) -> Self {
        Self {
            credentials,
            session,
            history_limit: DEFAULT_HISTORY_LIMIT,
        }
    }
}

pub async fn run<C: Connector>(
    connector: &C,
    workspace: &Workspace,
    args: &ReadArgs,
    out: &mut dyn Write,
) -> Result<()> {
    let _lock = workspace.lock()?;
    workspace.ensure_vacant()?;
    ensure_session_present(&args.session)?;

    let staged = workspace.stage(&args.session)?;
    let working_path = staged.working_path().to_path_buf();

    with_staged_session(staged, async {
        let client = connector.connect(&args.credentials, &working_path).await?;
        let outcome = print_recent_messages(&client, args.history_limit, &mut *out).await;
        client.disconnect().await;
        outcome
    })
    .await
}

async fn print_recent_messages<A: TelegramApi>(
    client: &A,
    history_limit: usize,
    out: &mut dyn Write,
) -> Result<()> {
    if !client.is_authorized().await? {
        return Err(Error::Unauthenticated);
    }

    info!("Looking for chat with official Telegram account");
    let Some(dialog) = find_official_dialog(client.list_dialogs().await?) else {
        writeln!(out, "Official account dialog not found")?;
        return Ok(());
    };

    let history = client.fetch_history(&dialog.peer, history_limit).await?;
    info!(count = history.len(), "Fetched recent messages");

    writeln!(out, "Recent messages:")?;
    if !history.is_empty() {
        writeln!(out, "{}", format_history(&history))?;
    }
    Ok(())
}
