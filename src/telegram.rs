//! Telegram client access
//!
//! The commands talk to Telegram only through [`Connector`] and
//! [`TelegramApi`]. [`GrammersConnector`] is the production implementation
//! on top of grammers; tests plug in their own.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use grammers_client::client::updates::UpdatesLike;
use grammers_client::types::peer::Peer;
use grammers_client::{Client, InvocationError};
use grammers_crypto::two_factor_auth::{calculate_2fa, check_p_and_g};
use grammers_mtsender::{SenderPool, SenderPoolHandle};
use grammers_session::storages::SqliteSession;
use grammers_session::Session;
use grammers_tl_types as tl;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::chat::get_peer_id;
use crate::error::{Error, Result};

/// Application credentials from my.telegram.org.
#[derive(Debug, Clone)]
pub struct ApiCredentials {
    pub api_id: i32,
    pub api_hash: String,
}

/// A dialog as seen by the commands: its peer id plus whatever handle the
/// client needs to fetch history from it.
#[derive(Debug, Clone)]
pub struct DialogEntry<P> {
    pub peer_id: i64,
    /// Private chat with a user, as opposed to a group or channel.
    pub is_user: bool,
    pub peer: P,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryMessage {
    pub id: i32,
    pub text: String,
}

/// Opens a client on an explicit session file.
#[async_trait(?Send)]
pub trait Connector {
    type Client: TelegramApi;

    async fn connect(&self, credentials: &ApiCredentials, session_file: &Path)
        -> Result<Self::Client>;
}

/// The operations the commands need from a connected client.
#[async_trait(?Send)]
pub trait TelegramApi {
    type Peer;

    /// Send a login code to `phone` and return the phone code hash.
    async fn request_login_code(&self, phone: &str) -> Result<String>;

    /// Complete sign-in and return the account's display name.
    ///
    /// Fails with [`Error::PasswordRequired`] when the account has two-step
    /// verification enabled; follow up with [`TelegramApi::check_password`].
    async fn sign_in(&self, phone: &str, auth_hash: &str, code: &str) -> Result<String>;

    /// Finish a sign-in that stopped at two-step verification.
    async fn check_password(&self, password: &str) -> Result<String>;

    async fn is_authorized(&self) -> Result<bool>;

    async fn list_dialogs(&self) -> Result<Vec<DialogEntry<Self::Peer>>>;

    /// Up to `limit` messages, newest first.
    async fn fetch_history(&self, peer: &Self::Peer, limit: usize) -> Result<Vec<HistoryMessage>>;

    /// Stop the connection and wait until the session store is released.
    async fn disconnect(self);
}

/// Connects through grammers with a SQLite session store.
#[derive(Debug, Default, Clone, Copy)]
pub struct GrammersConnector;

#[async_trait(?Send)]
impl Connector for GrammersConnector {
    type Client = TelegramClient;

    async fn connect(
        &self,
        credentials: &ApiCredentials,
        session_file: &Path,
    ) -> Result<TelegramClient> {
        let session = SqliteSession::open(session_file).map_err(|e| {
            Error::TelegramError(format!(
                "Failed to open session {}: {}",
                session_file.display(),
                e
            ))
        })?;
        TelegramClient::connect(Arc::new(session), credentials.clone()).await
    }
}

/// Holder for SenderPool components and Client
pub struct TelegramClient {
    pub client: Client,
    pub handle: SenderPoolHandle,
    session: Arc<SqliteSession>,
    credentials: ApiCredentials,
    _updates: mpsc::UnboundedReceiver<UpdatesLike>,
    runner_handle: Option<JoinHandle<()>>,
}

impl TelegramClient {
    /// Create a new TelegramClient from session
    pub async fn connect(session: Arc<SqliteSession>, credentials: ApiCredentials) -> Result<Self> {
        let pool = SenderPool::new(Arc::clone(&session), credentials.api_id);

        // Client borrows the whole pool, so build it before taking the pool apart
        let client = Client::new(&pool);

        let SenderPool {
            runner,
            updates,
            handle,
        } = pool;

        let runner_handle = tokio::spawn(async move {
            runner.run().await;
        });

        info!("Connected to Telegram");

        Ok(Self {
            client,
            handle,
            session,
            credentials,
            _updates: updates,
            runner_handle: Some(runner_handle),
        })
    }

    /// Invoke in the home data center, following one `*_MIGRATE_<dc>`
    /// redirect. A phone or account living elsewhere answers the first
    /// login request with 303.
    async fn invoke_home<R: tl::RemoteCall>(
        &self,
        request: &R,
    ) -> std::result::Result<R::Return, InvocationError> {
        match self.client.invoke(request).await {
            Err(err) => {
                let Some(new_dc) = migrate_target(&err) else {
                    return Err(err);
                };
                let old_dc = self.session.home_dc_id();
                info!(old_dc, new_dc, "Home data center changed, retrying there");
                // Drop the unused connection before switching.
                self.handle.disconnect_from_dc(old_dc);
                self.session.set_home_dc_id(new_dc);
                self.client.invoke(request).await
            }
            ok => ok,
        }
    }
}

impl Drop for TelegramClient {
    fn drop(&mut self) {
        // Only reached without disconnect(), e.g. on unwinding.
        if let Some(runner) = self.runner_handle.take() {
            runner.abort();
        }
    }
}

impl std::ops::Deref for TelegramClient {
    type Target = Client;

    fn deref(&self) -> &Self::Target {
        &self.client
    }
}

fn code_settings() -> tl::enums::CodeSettings {
    tl::enums::CodeSettings::Settings(tl::types::CodeSettings {
        allow_flashcall: false,
        current_number: false,
        allow_app_hash: false,
        allow_missed_call: false,
        allow_firebase: false,
        unknown_number: false,
        logout_tokens: None,
        token: None,
        app_sandbox: None,
    })
}

fn is_rpc_error(err: &InvocationError, name: &str) -> bool {
    matches!(err, InvocationError::Rpc(rpc) if rpc.name == name)
}

/// Data center named by a 303 `PHONE_MIGRATE_n` / `USER_MIGRATE_n` style error.
fn migrate_target(err: &InvocationError) -> Option<i32> {
    match err {
        InvocationError::Rpc(rpc) if rpc.code == 303 => {
            rpc.value.and_then(|dc| i32::try_from(dc).ok())
        }
        _ => None,
    }
}

fn sign_in_outcome(
    answer: std::result::Result<tl::enums::auth::Authorization, InvocationError>,
) -> Result<String> {
    match answer {
        Ok(tl::enums::auth::Authorization::Authorization(auth)) => Ok(display_name(&auth.user)),
        Ok(tl::enums::auth::Authorization::SignUpRequired(_)) => Err(Error::SignUpRequired),
        Err(err) if is_rpc_error(&err, "SESSION_PASSWORD_NEEDED") => Err(Error::PasswordRequired),
        Err(err) if is_rpc_error(&err, "PASSWORD_HASH_INVALID") => Err(Error::InvalidPassword),
        Err(err) => Err(err.into()),
    }
}

/// Build the SRP proof for `auth.checkPassword` from `account.getPassword`.
fn password_check(
    info: tl::types::account::Password,
    password: &str,
) -> Result<tl::functions::auth::CheckPassword> {
    let Some(tl::enums::PasswordKdfAlgo::Sha256Sha256Pbkdf2Hmacsha512iter100000Sha256ModPow(
        algo,
    )) = info.current_algo
    else {
        return Err(Error::TelegramError(
            "Account has no supported two-step verification algorithm".to_string(),
        ));
    };
    let (Some(srp_b), Some(srp_id)) = (info.srp_b, info.srp_id) else {
        return Err(Error::TelegramError(
            "Password information is missing SRP parameters".to_string(),
        ));
    };
    if !check_p_and_g(&algo.p, &algo.g) {
        return Err(Error::TelegramError(
            "Telegram sent invalid SRP group parameters".to_string(),
        ));
    }

    let (m1, g_a) = calculate_2fa(
        &algo.salt1,
        &algo.salt2,
        &algo.p,
        &algo.g,
        srp_b,
        info.secure_random,
        password,
    );

    Ok(tl::functions::auth::CheckPassword {
        password: tl::enums::InputCheckPasswordSrp::Srp(tl::types::InputCheckPasswordSrp {
            srp_id,
            a: g_a.to_vec(),
            m1: m1.to_vec(),
        }),
    })
}

fn display_name(user: &tl::enums::User) -> String {
    match user {
        tl::enums::User::User(u) => name_or_fallback(
            u.first_name.as_deref(),
            u.last_name.as_deref(),
            u.username.as_deref(),
            u.id,
        ),
        tl::enums::User::Empty(u) => u.id.to_string(),
    }
}

/// "First Last", else "@username", else the numeric id.
fn name_or_fallback(
    first_name: Option<&str>,
    last_name: Option<&str>,
    username: Option<&str>,
    id: i64,
) -> String {
    let full = format!("{} {}", first_name.unwrap_or(""), last_name.unwrap_or(""));
    let full = full.trim();
    match (full.is_empty(), username) {
        (false, _) => full.to_string(),
        (true, Some(username)) => format!("@{}", username),
        (true, None) => id.to_string(),
    }
}

#[async_trait(?Send)]
impl TelegramApi for TelegramClient {
    type Peer = Peer;

    async fn request_login_code(&self, phone: &str) -> Result<String> {
        let request = tl::functions::auth::SendCode {
            phone_number: phone.to_string(),
            api_id: self.credentials.api_id,
            api_hash: self.credentials.api_hash.clone(),
            settings: code_settings(),
        };

        match self.invoke_home(&request).await? {
            tl::enums::auth::SentCode::Code(sent) => Ok(sent.phone_code_hash),
            _ => Err(Error::TelegramError(
                "Unexpected answer to auth.sendCode, no code was sent".to_string(),
            )),
        }
    }

    async fn sign_in(&self, phone: &str, auth_hash: &str, code: &str) -> Result<String> {
        let request = tl::functions::auth::SignIn {
            phone_number: phone.to_string(),
            phone_code_hash: auth_hash.to_string(),
            phone_code: Some(code.trim().to_string()),
            email_verification: None,
        };

        sign_in_outcome(self.invoke_home(&request).await)
    }

    async fn check_password(&self, password: &str) -> Result<String> {
        let info: tl::types::account::Password = self
            .invoke_home(&tl::functions::account::GetPassword {})
            .await?
            .into();
        let request = password_check(info, password)?;
        sign_in_outcome(self.invoke_home(&request).await)
    }

    async fn is_authorized(&self) -> Result<bool> {
        Ok(self.client.is_authorized().await?)
    }

    async fn list_dialogs(&self) -> Result<Vec<DialogEntry<Peer>>> {
        let mut entries = Vec::new();
        let mut dialogs = self.client.iter_dialogs();

        while let Some(dialog) = dialogs.next().await? {
            let peer_id = get_peer_id(&dialog.peer);
            debug!(peer_id, "Dialog");
            entries.push(DialogEntry {
                peer_id,
                is_user: matches!(dialog.peer, Peer::User(_)),
                peer: dialog.peer.clone(),
            });
        }

        Ok(entries)
    }

    async fn fetch_history(&self, peer: &Peer, limit: usize) -> Result<Vec<HistoryMessage>> {
        let mut messages = Vec::with_capacity(limit);
        if limit == 0 {
            return Ok(messages);
        }

        let mut iter = self.client.iter_messages(peer);
        while let Some(msg) = iter.next().await? {
            messages.push(HistoryMessage {
                id: msg.id(),
                text: msg.text().to_string(),
            });
            if messages.len() >= limit {
                break;
            }
        }

        Ok(messages)
    }

    async fn disconnect(mut self) {
        self.handle.quit();
        if let Some(runner) = self.runner_handle.take() {
            if let Err(e) = runner.await {
                warn!("Connection runner stopped abnormally: {}", e);
            }
        }
        debug!("Disconnected from Telegram");
    }
}
