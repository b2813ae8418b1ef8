use crate::core::types::{CsrfState, SessionId};

pub trait FromRandom {
    fn from_random() -> Self;
}

impl FromRandom for CsrfState {
    fn from_random() -> Self {
        CsrfState(random_string(32))
    }
}

impl FromRandom for SessionId {
    fn from_random() -> Self {
        SessionId(random_string(48))
    }
}

pub fn random_string(size: usize) -> String {
    use rand::Rng;

    let s: String = rand::thread_rng()
        .sample_iter(rand::distributions::Alphanumeric)
        .take(size)
        .map(|b| b as char)
        .collect();
    base64::encode_config(s, base64::URL_SAFE_NO_PAD)
}
