pub mod auth;
pub mod health;
pub mod setup;
pub mod students;

/// Treat blank form values as absent.
pub(crate) fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}
