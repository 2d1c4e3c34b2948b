//! Game identifiers and player credentials.
//!
//! Both come from the thread-local CSPRNG, never from a counter, so
//! neither can be guessed from another.

use std::fmt;

use rand::RngCore;

/// Six uppercase hex characters (3 random bytes).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GameId(String);

impl GameId {
    pub const LEN: usize = 6;

    pub fn random() -> Self {
        let mut bytes = [0u8; 3];
        rand::thread_rng().fill_bytes(&mut bytes);
        GameId(hex::encode_upper(bytes))
    }

    /// Accept an already validated identifier.
    ///
    /// Returns `None` unless the text is exactly six `[A-Z0-9]` characters.
    pub fn parse(s: &str) -> Option<Self> {
        let ok = s.len() == Self::LEN
            && s.bytes()
                .all(|b| b.is_ascii_uppercase() || b.is_ascii_digit());
        ok.then(|| GameId(s.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for GameId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Per-seat secret: 32 lowercase hex characters (16 random bytes).
#[derive(Clone, PartialEq, Eq)]
pub struct AuthToken(String);

impl AuthToken {
    pub fn random() -> Self {
        let mut bytes = [0u8; 16];
        rand::thread_rng().fill_bytes(&mut bytes);
        AuthToken(hex::encode(bytes))
    }

    pub fn from_wire(s: &str) -> Self {
        AuthToken(s.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Comparison whose running time does not depend on where the
    /// first differing byte is.
    pub fn matches(&self, presented: &str) -> bool {
        let a = self.0.as_bytes();
        let b = presented.as_bytes();
        if a.len() != b.len() {
            return false;
        }
        a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
    }
}

// Keep secrets out of logs.
impl fmt::Debug for AuthToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AuthToken(..)")
    }
}
