//! Permission check for privileged commands.

use std::collections::HashSet;

use super::client::Chat;

/// Super-admins pass everywhere; anyone else must be an admin of this group.
///
/// Evaluated on every call, admin status can change between commands.
pub fn is_authorized(sender_id: i64, chat: &Chat, super_admins: &HashSet<i64>) -> bool {
    if super_admins.contains(&sender_id) {
        return true;
    }
    if !chat.is_group {
        return false;
    }
    chat.participants
        .iter()
        .find(|p| p.user_id == sender_id)
        .is_some_and(|p| p.is_admin)
}
