//! Peer identification and message rendering

use grammers_client::types::peer::Peer;

use crate::config::OFFICIAL_ACCOUNT_ID;
use crate::telegram::{DialogEntry, HistoryMessage};

/// Get ID from Peer
pub fn get_peer_id(peer: &Peer) -> i64 {
    match peer {
        Peer::User(u) => u.raw.id(),
        Peer::Group(g) => match &g.raw {
            grammers_tl_types::enums::Chat::Chat(c) => c.id,
            grammers_tl_types::enums::Chat::Forbidden(f) => f.id,
            _ => 0,
        },
        Peer::Channel(c) => c.raw.id,
    }
}

/// Find the private chat with the Telegram service account. Groups and
/// channels are skipped even when their id collides.
pub fn find_official_dialog<P>(dialogs: Vec<DialogEntry<P>>) -> Option<DialogEntry<P>> {
    dialogs
        .into_iter()
        .find(|dialog| dialog.is_user && dialog.peer_id == OFFICIAL_ACCOUNT_ID)
}

/// Render a newest-first history oldest-first as `[i / n]: text` entries
/// separated by a blank line.
pub fn format_history(newest_first: &[HistoryMessage]) -> String {
    let total = newest_first.len();
    newest_first
        .iter()
        .rev()
        .enumerate()
        .map(|(ind, msg)| format!("[{} / {}]: {}", ind + 1, total, msg.text))
        .collect::<Vec<_>>()
        .join("\n\n")
}
