use std::fmt;

use sha2::{Digest, Sha256};

use crate::util::random::FromRandom;

/// Code challenge method. Only S256 is offered.
#[derive(Debug, Clone, PartialEq, Eq)]
#[derive(serde::Deserialize, serde::Serialize)]
pub enum Transformation {
    S256,
}

impl Transformation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::S256 => "S256",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
#[derive(serde::Deserialize, serde::Serialize)]
pub struct Challenge {
    #[serde(rename = "code_challenge")]
    pub code: String,
    #[serde(rename = "code_challenge_method")]
    pub method: Transformation,
}

#[derive(Clone, PartialEq, Eq)]
#[derive(serde::Deserialize, serde::Serialize)]
#[serde(transparent)]
pub struct Verifier {
    pub value: String,
}

impl fmt::Debug for Verifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Verifier").field("value", &"<redacted>").finish()
    }
}

impl Verifier {
    pub fn challenge(&self) -> Challenge {
        let digest = Sha256::digest(self.value.as_bytes());
        Challenge {
            code: base64::encode_config(digest, base64::URL_SAFE_NO_PAD),
            method: Transformation::S256,
        }
    }
}

impl FromRandom for Verifier {
    fn from_random() -> Self {
        // 43..=128 characters from the unreserved set
        Verifier {
            value: crate::util::random::random_string(64),
        }
    }
}
