//! Create a new session and request an authentication code

use std::io::Write;
use std::path::PathBuf;

use tracing::{info, warn};

use crate::error::{Error, Result};
use crate::session::{ensure_session_absent, move_file, Workspace};
use crate::telegram::{ApiCredentials, Connector, TelegramApi};

#[derive(Debug, Clone)]
pub struct CreateArgs {
    pub credentials: ApiCredentials,
    pub phone: String,
    pub session: PathBuf,
}

pub async fn run<C: Connector>(
    connector: &C,
    workspace: &Workspace,
    args: &CreateArgs,
    out: &mut dyn Write,
) -> Result<()> {
    let _lock = workspace.lock()?;
    workspace.ensure_vacant()?;
    ensure_session_absent(&args.session)?;

    info!(phone = %args.phone, "Requesting authentication code");
    let auth_hash = match request_code(connector, workspace, args).await {
        Ok(hash) => hash,
        Err(err) => {
            if workspace.working_path().exists() {
                warn!(
                    path = %workspace.working_path().display(),
                    "Partially created session left in place, remove it before retrying"
                );
            }
            return Err(err);
        }
    };

    writeln!(
        out,
        "Authentication code requested. Auth hash (required for auth): {}",
        auth_hash
    )?;

    move_file(workspace.working_path(), &args.session).map_err(|source| Error::Restore {
        path: args.session.clone(),
        source,
    })?;
    info!(session = %args.session.display(), "Session created");

    Ok(())
}

/// The client is disconnected before returning so its session store is
/// closed before the file is moved out.
async fn request_code<C: Connector>(
    connector: &C,
    workspace: &Workspace,
    args: &CreateArgs,
) -> Result<String> {
    let client = connector
        .connect(&args.credentials, workspace.working_path())
        .await?;
    let auth_hash = client.request_login_code(&args.phone).await;
    client.disconnect().await;
    auth_hash
}
