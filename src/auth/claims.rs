use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// JWT payload: a snapshot of the user at signing time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,     // user ID
    pub name: String,  // display name when the token was signed
    pub email: String, // email when the token was signed
    pub iat: usize,    // issued at (unix timestamp)
    pub exp: usize,    // expires at (unix timestamp)
    pub iss: String,   // issuer
    pub aud: String,   // audience
}
