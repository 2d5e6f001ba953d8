use crate::models::user::User;

/// Client-local record of whether, and as whom, the user is currently
/// authenticated. Exactly one exists per running process; observers
/// receive it as a snapshot through the session manager's watch
/// channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub user: Option<User>,
    pub is_authenticated: bool,
    pub is_loading: bool,
}

impl Session {
    pub fn initializing() -> Self {
        Session {
            user: None,
            is_authenticated: false,
            is_loading: true,
        }
    }
}

/// Authentication lifecycle states.
///
/// `Expired` is transient: the expiry timer passes through it on the
/// way back to `Unauthenticated`, so observers can distinguish a
/// timeout from an explicit logout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    Initializing,
    Unauthenticated,
    Authenticating,
    Authenticated { user: User },
    Expired,
}

impl SessionState {
    pub fn name(&self) -> &'static str {
        match self {
            SessionState::Initializing => "initializing",
            SessionState::Unauthenticated => "unauthenticated",
            SessionState::Authenticating => "authenticating",
            SessionState::Authenticated { .. } => "authenticated",
            SessionState::Expired => "expired",
        }
    }

    pub fn user(&self) -> Option<&User> {
        match self {
            SessionState::Authenticated { user } => Some(user),
            _ => None,
        }
    }

    pub fn snapshot(&self) -> Session {
        match self {
            SessionState::Initializing | SessionState::Authenticating => Session {
                user: None,
                is_authenticated: false,
                is_loading: true,
            },
            SessionState::Authenticated { user } => Session {
                user: Some(user.clone()),
                is_authenticated: true,
                is_loading: false,
            },
            SessionState::Unauthenticated | SessionState::Expired => Session {
                user: None,
                is_authenticated: false,
                is_loading: false,
            },
        }
    }
}
