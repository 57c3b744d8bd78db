//! Route guards: what to do with a navigation given the session state.

use crate::session::{Navigation, SessionState};

/// Outcome of a guard decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuardOutcome {
    /// Show the requested page.
    Render,
    /// Session not settled yet; show a loading indicator.
    ///
    /// The console middleware resolves the session before any handler runs,
    /// so routed pages never see this. It stays part of the guard contract
    /// for callers that evaluate a guard on an unsettled session.
    Loading,
    /// Go somewhere else instead.
    Redirect(Navigation),
}

/// A pure decision over the session state. Guards never fetch or mutate.
pub trait RouteGuard {
    fn decide(&self, state: &SessionState) -> GuardOutcome;
}

/// Any signed-in user.
#[derive(Debug, Clone, Copy, Default)]
pub struct SignedIn;

/// Signed-in administrators only. Other signed-in users go home.
#[derive(Debug, Clone, Copy, Default)]
pub struct AdminOnly;

impl RouteGuard for SignedIn {
    fn decide(&self, state: &SessionState) -> GuardOutcome {
        match state {
            SessionState::Unresolved | SessionState::Resolving => GuardOutcome::Loading,
            SessionState::Anonymous => GuardOutcome::Redirect(Navigation::Login),
            SessionState::Authenticated(_) => GuardOutcome::Render,
        }
    }
}

impl RouteGuard for AdminOnly {
    fn decide(&self, state: &SessionState) -> GuardOutcome {
        match state {
            SessionState::Authenticated(user) if !user.is_admin() => {
                GuardOutcome::Redirect(Navigation::Home)
            }
            other => SignedIn.decide(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use insurance_console_core::{Role, User, UserId};

    use super::*;

    fn user(role: Role) -> SessionState {
        SessionState::Authenticated(User {
            id: UserId::new(1),
            login: "u".to_string(),
            email: None,
            active: true,
            role,
            created_at: None,
            last_login: None,
        })
    }

    #[test]
    fn test_signed_in_decisions() {
        assert_eq!(SignedIn.decide(&SessionState::Unresolved), GuardOutcome::Loading);
        assert_eq!(SignedIn.decide(&SessionState::Resolving), GuardOutcome::Loading);
        assert_eq!(
            SignedIn.decide(&SessionState::Anonymous),
            GuardOutcome::Redirect(Navigation::Login)
        );
        assert_eq!(SignedIn.decide(&user(Role::Client)), GuardOutcome::Render);
        assert_eq!(SignedIn.decide(&user(Role::Admin)), GuardOutcome::Render);
    }

    #[test]
    fn test_admin_only_decisions() {
        assert_eq!(AdminOnly.decide(&SessionState::Resolving), GuardOutcome::Loading);
        assert_eq!(
            AdminOnly.decide(&SessionState::Anonymous),
            GuardOutcome::Redirect(Navigation::Login)
        );
        assert_eq!(
            AdminOnly.decide(&user(Role::Client)),
            GuardOutcome::Redirect(Navigation::Home)
        );
        assert_eq!(AdminOnly.decide(&user(Role::Admin)), GuardOutcome::Render);
    }
}
