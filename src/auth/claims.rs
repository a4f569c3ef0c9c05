use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// JWT payload carried in the session.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Claims {
    pub user_id: Uuid,  // owner of the session
    pub email: String,  // normalized email at signing time
    pub iat: usize,     // issued at (unix timestamp)
    pub exp: usize,     // expires at (unix timestamp)
    pub iss: String,    // issuer
    pub aud: String,    // audience
}
