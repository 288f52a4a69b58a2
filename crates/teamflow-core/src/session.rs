//! Process-lifetime session state.
//!
//! `Session` has a single writer, the navigation loop. The chat layer never
//! reads it directly; token and context are handed to `open()` as parameters
//! so a `/back` during a connect attempt cannot race the store.

use uuid::Uuid;

use crate::entity::ContextType;

/// Mutable client session: auth token, selected team, selected context.
///
/// Invariants are enforced by the mutators:
/// - a context can only be set while a team is selected;
/// - clearing the team clears the context;
/// - clearing the token clears everything.
#[derive(Debug, Clone, Default)]
pub struct Session {
    token: Option<String>,
    team_id: Option<Uuid>,
    context: Option<(ContextType, Uuid)>,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    pub fn team_id(&self) -> Option<Uuid> {
        self.team_id
    }

    pub fn context(&self) -> Option<(ContextType, Uuid)> {
        self.context
    }

    pub fn is_logged_in(&self) -> bool {
        self.token.is_some()
    }

    /// Stores the token received from a successful login or register.
    pub fn set_token(&mut self, token: impl Into<String>) {
        self.token = Some(token.into());
    }

    /// Drops the token and everything selected under it. Used when an
    /// operation reports an auth failure and the user must log in again.
    pub fn clear_token(&mut self) {
        self.token = None;
        self.team_id = None;
        self.context = None;
    }

    pub fn select_team(&mut self, team_id: Uuid) {
        self.team_id = Some(team_id);
    }

    /// Backs out of team selection; any selected context goes with it.
    pub fn clear_team(&mut self) {
        self.team_id = None;
        self.context = None;
    }

    /// Selects a context entity. Ignored if no team is selected, which keeps
    /// the context-implies-team invariant even on a buggy call path.
    pub fn select_context(&mut self, context_type: ContextType, context_id: Uuid) {
        if self.team_id.is_some() {
            self.context = Some((context_type, context_id));
        }
    }

    pub fn clear_context(&mut self) {
        self.context = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clearing_team_clears_context() {
        let mut session = Session::new();
        session.set_token("abc");
        session.select_team(Uuid::new_v4());
        session.select_context(ContextType::Epic, Uuid::new_v4());
        assert!(session.context().is_some());

        session.clear_team();
        assert!(session.team_id().is_none());
        assert!(session.context().is_none());
        assert!(session.is_logged_in());
    }

    #[test]
    fn clearing_token_clears_everything() {
        let mut session = Session::new();
        session.set_token("abc");
        session.select_team(Uuid::new_v4());
        session.select_context(ContextType::Task, Uuid::new_v4());

        session.clear_token();
        assert!(!session.is_logged_in());
        assert!(session.team_id().is_none());
        assert!(session.context().is_none());
    }

    #[test]
    fn context_requires_team() {
        let mut session = Session::new();
        session.set_token("abc");
        session.select_context(ContextType::Sprint, Uuid::new_v4());
        assert!(session.context().is_none());
    }
}
