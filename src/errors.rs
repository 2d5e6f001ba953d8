use thiserror::Error;

/// Failures surfaced by the session manager.
///
/// `login` returns these as values; nothing in the public session
/// surface panics or propagates a raw transport error.
#[derive(Debug, Error)]
pub enum AuthError {
    /// The backend rejected the supplied credentials. Safe to show on a
    /// login form.
    #[error("invalid username or password")]
    InvalidCredentials,

    /// The backend answered 200 but the payload was unusable (missing
    /// or empty role list, undecodable body). Treated as an auth
    /// failure; the detail is for logs, not end users.
    #[error("malformed auth response: {0}")]
    MalformedResponse(String),

    /// The backend could not be reached or did not produce an answer.
    #[error("could not reach the backend: {0}")]
    Network(String),

    /// The local validity window elapsed. Never returned from `login`;
    /// observers see `is_authenticated` flip instead.
    #[error("session expired")]
    SessionExpired,
}

/// Normalized API-client failures.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Non-success HTTP status, with the backend's message when the
    /// body carried one.
    #[error("backend returned {status}: {message}")]
    Status { status: u16, message: String },

    /// Transport-level failure (connect, DNS, TLS, timeout).
    #[error("request failed: {0}")]
    Network(String),

    /// The backend answered successfully but the body did not decode
    /// into the expected shape.
    #[error("undecodable response body: {0}")]
    Decode(String),
}

impl From<reqwest::Error> for ApiError {
    fn from(e: reqwest::Error) -> Self {
        ApiError::Network(e.to_string())
    }
}

impl ApiError {
    /// Map a login-path failure into the session taxonomy: any 4xx is
    /// the backend rejecting the credentials, everything else means we
    /// never got a usable answer.
    pub fn into_auth_error(self) -> AuthError {
        match self {
            ApiError::Status { status, .. } if (400..500).contains(&status) => {
                AuthError::InvalidCredentials
            }
            ApiError::Status { status, message } => {
                AuthError::Network(format!("backend error {status}: {message}"))
            }
            ApiError::Network(msg) => AuthError::Network(msg),
            ApiError::Decode(msg) => AuthError::MalformedResponse(msg),
        }
    }
}
