use std::fmt;

use serde::{Deserialize, Serialize};

/// Identity of one admission participant: a browser tab of a client.
///
/// Two tabs of the same client are independent participants.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionKey {
    pub client_id: String,
    pub tab_id: String,
}

impl SessionKey {
    pub fn new(client_id: impl Into<String>, tab_id: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            tab_id: tab_id.into(),
        }
    }

    /// Build a key from optional request fields. Returns `None` if either part
    /// is missing or empty.
    pub fn from_parts(client_id: Option<String>, tab_id: Option<String>) -> Option<Self> {
        let client_id = client_id.filter(|s| !s.is_empty())?;
        let tab_id = tab_id.filter(|s| !s.is_empty())?;
        Some(Self { client_id, tab_id })
    }
}

impl fmt::Display for SessionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.client_id, self.tab_id)
    }
}
