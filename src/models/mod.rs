pub mod project;
pub mod user;

pub use project::{ProjectInput, ProjectRecord};
pub use user::{ChangePasswordRequest, LoginRequest, NewUserRequest, SessionRecord, UserRecord};

/// Random 32-char lowercase hex identifier, used for projects, users, and
/// sessions.
pub fn generate_id() -> String {
    use rand::RngExt;
    let mut rng = rand::rng();
    (0..16)
        .map(|_| format!("{:02x}", rng.random::<u8>()))
        .collect()
}
