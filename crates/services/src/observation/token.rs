use rand::Rng;
use rand::distr::Alphanumeric;
use usability_core::model::{SessionToken, SessionTokenError};

/// Length of generated session tokens.
pub const SESSION_TOKEN_LEN: usize = 8;

/// Generate a random lowercase alphanumeric session token.
///
/// # Errors
///
/// Returns `SessionTokenError` if the generated text is rejected.
pub fn generate_session_token() -> Result<SessionToken, SessionTokenError> {
    generate_with(&mut rand::rng())
}

pub(crate) fn generate_with<R: Rng>(rng: &mut R) -> Result<SessionToken, SessionTokenError> {
    let raw: String = (0..SESSION_TOKEN_LEN)
        .map(|_| char::from(rng.sample(Alphanumeric)).to_ascii_lowercase())
        .collect();
    SessionToken::new(raw)
}
