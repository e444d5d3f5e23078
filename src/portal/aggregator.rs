use crate::portal::types::{User, UserCollection};
use tracing::debug;

/// Append the authenticated user to the bulk listing unless it is already
/// present (same `id`, or same email). Bulk order is preserved and existing
/// entries are never modified.
pub fn merge(bulk_users: Vec<User>, authenticated_user: User) -> UserCollection {
    let mut users = bulk_users;

    if let Some(existing) = users
        .iter()
        .position(|u| u.is_same_identity(&authenticated_user))
    {
        debug!(
            user_id = %authenticated_user.id,
            position = existing,
            "authenticated user already listed"
        );
    } else {
        users.push(authenticated_user);
    }

    users
}
