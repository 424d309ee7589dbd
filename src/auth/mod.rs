pub mod session;

pub use session::{create_session, SessionRepository};
