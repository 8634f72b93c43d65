use serde::{Deserialize, Serialize};

/// Connection material returned from a bind call. Bindings are ephemeral:
/// nothing beyond the remote database user is kept, so these values cannot
/// be retrieved again later.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConnectionDetails {
    pub username: String,
    pub password: String,
    pub uri: String,
    #[serde(rename = "connectionString")]
    pub connection_string: String,
}
