use tunnel_core::{NewUrl, ShortCode};
use tunnel_generator::{generate, Alphabet, DEFAULT_LENGTH};
use uuid::Uuid;

/// A fixed session UUID for tests that need a stable user.
pub const TEST_USER_UUID: &str = "353ba025-7285-4790-bfeb-b70c1ef18323";

/// A fresh, valid origin URL on a random lowercase domain.
pub fn random_origin() -> String {
    format!(
        "https://{}.com/{}",
        generate(10, Alphabet::Lowercase),
        generate(6, Alphabet::Lowercase)
    )
}

pub fn random_code() -> ShortCode {
    ShortCode::new_unchecked(generate(DEFAULT_LENGTH, Alphabet::Alphanumeric))
}

/// A create request for `origin` with a random short code.
pub fn new_url(origin: impl Into<String>) -> NewUrl {
    NewUrl::new(random_code(), origin)
}

pub fn random_uuid() -> String {
    Uuid::new_v4().to_string()
}
