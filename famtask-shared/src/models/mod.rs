/// Database models
///
/// One module per table, following the schema in `migrations/`:
///
/// - `user`: user accounts
/// - `family`: family groups and join codes
/// - `membership`: user-family relationships with roles
/// - `join_request`: pending asks to join a family
/// - `task`: chores and their single assignment
/// - `points`: per-(user, family) reward accumulator

pub mod family;
pub mod join_request;
pub mod membership;
pub mod points;
pub mod task;
pub mod user;
