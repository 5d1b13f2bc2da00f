//! Route guards.
//!
//! A guard is a pure predicate over the normalized view of an incoming
//! message. Guards on a route are evaluated left to right and combined
//! with AND, short-circuiting on the first failure. They never perform
//! IO; everything they need (admin flag, conversation state) is resolved
//! once per update before routing starts.

use crate::core::state::ConversationState;

/// One predicate of a route.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Guard {
    /// Message text equals this string exactly
    Pattern(&'static str),
    /// Message text starts with this string
    Prefix(&'static str),
    /// User is in exactly this conversation state (`None` = idle)
    State(Option<ConversationState>),
    /// Sender is an admin (master admin included)
    Admin,
    /// Message arrived in a private chat
    Private,
}

/// Normalized per-update facts the guards are evaluated against.
#[derive(Debug, Clone, Default)]
pub struct GuardInput {
    pub text: Option<String>,
    pub state: Option<ConversationState>,
    pub is_admin: bool,
    pub is_private: bool,
}

impl Guard {
    pub fn matches(&self, input: &GuardInput) -> bool {
        match self {
            Self::Pattern(p) => input.text.as_deref() == Some(*p),
            Self::Prefix(p) => input.text.as_deref().is_some_and(|t| t.starts_with(p)),
            Self::State(s) => input.state == *s,
            Self::Admin => input.is_admin,
            Self::Private => input.is_private,
        }
    }
}

/// AND over all guards, left to right, short-circuiting.
pub fn matches_all(guards: &[Guard], input: &GuardInput) -> bool {
    guards.iter().all(|g| g.matches(input))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input(text: &str) -> GuardInput {
        GuardInput { text: Some(text.to_string()), state: None, is_admin: false, is_private: true }
    }

    #[test]
    fn pattern_is_exact() {
        assert!(Guard::Pattern("/start").matches(&input("/start")));
        assert!(!Guard::Pattern("/start").matches(&input("/start get_x")));
        assert!(!Guard::Pattern("/start").matches(&GuardInput::default()));
    }

    #[test]
    fn prefix_matches_payloads() {
        assert!(Guard::Prefix("/start get_").matches(&input("/start get_Abc123")));
        assert!(!Guard::Prefix("/start get_").matches(&input("/start")));
    }

    #[test]
    fn state_guard_distinguishes_idle() {
        let mut i = input("hello");
        assert!(Guard::State(None).matches(&i));
        i.state = Some(ConversationState::UploadCollect);
        assert!(Guard::State(Some(ConversationState::UploadCollect)).matches(&i));
        assert!(!Guard::State(None).matches(&i));
        assert!(!Guard::State(Some(ConversationState::DeleteFile)).matches(&i));
    }

    #[test]
    fn conjunction_short_circuits_left_to_right() {
        let mut i = input("Finish upload");
        i.state = Some(ConversationState::UploadCollect);
        let guards = [
            Guard::Private,
            Guard::Pattern("Finish upload"),
            Guard::State(Some(ConversationState::UploadCollect)),
        ];
        assert!(matches_all(&guards, &i));

        i.is_private = false;
        assert!(!matches_all(&guards, &i));
    }

    #[test]
    fn admin_guard_follows_resolved_flag() {
        let mut i = input("Stats");
        assert!(!Guard::Admin.matches(&i));
        i.is_admin = true;
        assert!(Guard::Admin.matches(&i));
    }
}
