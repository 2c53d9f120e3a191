use argon2::password_hash::rand_core::{OsRng, RngCore};
use std::fmt::Write as _;

/// `n` bytes from the OS RNG, lowercase hex.
pub fn random_hex(n: usize) -> String {
    let mut buf = vec![0u8; n];
    OsRng.fill_bytes(&mut buf);
    buf.iter().fold(String::with_capacity(n * 2), |mut s, b| {
        let _ = write!(s, "{b:02x}");
        s
    })
}
