//! Route gating based on the signed-in account's public metadata.

use crate::models::{PublicMetadata, User};

/// Routes reachable without any checks. `/` only matches exactly.
const PUBLIC_PREFIXES: &[&str] = &["/sign-in", "/sign-up", "/api/clerk-webhooks"];

const ADMIN_PREFIXES: &[&str] = &["/admin", "/admin/users", "/api/admin"];

pub const PENDING_APPROVAL_ROUTE: &str = "/pending-approval";
pub const UNAUTHORIZED_ROUTE: &str = "/unauthorized";

/// Who is making a request.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Session {
    pub user_id: Option<String>,
    pub metadata: PublicMetadata,
}

impl Session {
    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn for_user(user: &User) -> Self {
        Self {
            user_id: Some(user.id.clone()),
            metadata: user.public_metadata.clone(),
        }
    }

    pub fn is_signed_in(&self) -> bool {
        self.user_id.is_some()
    }
}

/// Result of gating one route.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    Allow,
    Redirect(&'static str),
}

impl Decision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Decision::Allow)
    }
}

fn matches_prefix(path: &str, prefixes: &[&str]) -> bool {
    prefixes.iter().any(|p| path.starts_with(p))
}

/// Decide whether `session` may open `path`.
///
/// Anonymous sessions are let through; sign-in is enforced by the
/// identity provider itself.
pub fn gate(session: &Session, path: &str) -> Decision {
    if path == "/" || matches_prefix(path, PUBLIC_PREFIXES) {
        return Decision::Allow;
    }

    if !session.is_signed_in() || path == PENDING_APPROVAL_ROUTE {
        return Decision::Allow;
    }

    if matches_prefix(path, ADMIN_PREFIXES) {
        return if session.metadata.is_admin() {
            Decision::Allow
        } else {
            Decision::Redirect(UNAUTHORIZED_ROUTE)
        };
    }

    if session.metadata.is_approved() {
        Decision::Allow
    } else {
        Decision::Redirect(PENDING_APPROVAL_ROUTE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Role;

    fn session(role: Option<Role>, approved: Option<bool>) -> Session {
        Session {
            user_id: Some("user_1".to_string()),
            metadata: PublicMetadata {
                role,
                is_approved: approved,
                ..PublicMetadata::default()
            },
        }
    }

    #[test]
    fn test_public_routes() {
        let unapproved = session(None, Some(false));
        assert_eq!(gate(&unapproved, "/"), Decision::Allow);
        assert_eq!(gate(&unapproved, "/sign-in/factor-one"), Decision::Allow);
        assert_eq!(gate(&unapproved, "/api/clerk-webhooks"), Decision::Allow);
    }

    #[test]
    fn test_root_is_not_a_prefix() {
        let unapproved = session(None, Some(false));
        assert_eq!(
            gate(&unapproved, "/documents"),
            Decision::Redirect(PENDING_APPROVAL_ROUTE)
        );
    }

    #[test]
    fn test_anonymous_is_allowed() {
        assert!(gate(&Session::anonymous(), "/admin/users").is_allowed());
        assert!(gate(&Session::anonymous(), "/results").is_allowed());
    }

    #[test]
    fn test_admin_routes_require_admin() {
        let member = session(Some(Role::Member), Some(true));
        assert_eq!(gate(&member, "/admin"), Decision::Redirect(UNAUTHORIZED_ROUTE));
        assert_eq!(
            gate(&member, "/api/admin/approve-user"),
            Decision::Redirect(UNAUTHORIZED_ROUTE)
        );

        let admin = session(Some(Role::Admin), None);
        assert_eq!(gate(&admin, "/admin/users"), Decision::Allow);
    }

    #[test]
    fn test_other_routes_require_approval() {
        assert_eq!(
            gate(&session(Some(Role::PromptAdmin), None), "/history"),
            Decision::Redirect(PENDING_APPROVAL_ROUTE)
        );
        assert_eq!(gate(&session(None, Some(true)), "/history"), Decision::Allow);
        assert_eq!(
            gate(&session(None, Some(false)), PENDING_APPROVAL_ROUTE),
            Decision::Allow
        );
    }
}
