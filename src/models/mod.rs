pub mod audit;
pub mod realtime;
pub mod session;
pub mod token;
pub mod user;

pub use audit::AccessAttempt;
pub use realtime::{MessageKind, RealtimeMessage};
pub use session::{Session, SessionState};
pub use token::TokenRecord;
pub use user::{Role, RoleSet, User};
