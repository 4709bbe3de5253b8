//! Session layer configuration.

/// Configuration for the [`SessionRegistry`](crate::SessionRegistry).
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Human-readable reason sent in the `kicked` event when a newer login
    /// replaces a connection.
    pub kick_message: String,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            kick_message: "You have logged in from somewhere else!".to_string(),
        }
    }
}
