/// Authentication utilities
///
/// - `password`: Argon2id password hashing and verification

pub mod password;
