//! Fingerprints of persisted frames.
//!
//! The digest is taken over the encoded bytes that were written to disk, not over
//! raw pixels. Two identical screens only compare equal if the JPEG encoder is
//! deterministic for the same input and quality; that is a precondition of the
//! duplicate-triplicate stop, not something this module can check.

use sha2::{Digest as _, Sha256};
use std::fmt;

pub const DIGEST_LEN: usize = 32;

/// SHA-256 закодированного кадра
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Digest([u8; DIGEST_LEN]);

impl Digest {
    pub fn of(encoded: &[u8]) -> Self {
        let hash = Sha256::digest(encoded);
        let mut bytes = [0u8; DIGEST_LEN];
        bytes.copy_from_slice(&hash);
        Self(bytes)
    }
}

impl fmt::Display for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for byte in &self.0 {
            write!(f, "{:02x}", byte)?;
        }
        Ok(())
    }
}

impl fmt::Debug for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // В логах хватает префикса
        let hex = self.to_string();
        write!(f, "Digest({}…)", &hex[..12])
    }
}

/// Истина, только если все три отпечатка есть и попарно совпадают
pub fn all_equal(a: Option<&Digest>, b: Option<&Digest>, c: Option<&Digest>) -> bool {
    match (a, b, c) {
        (Some(a), Some(b), Some(c)) => a == b && b == c,
        _ => false,
    }
}

/// Скользящее окно из двух предыдущих отпечатков
#[derive(Debug, Clone, Default)]
pub struct DigestWindow {
    previous: Option<Digest>,
    before_previous: Option<Digest>,
}

impl DigestWindow {
    pub fn new() -> Self {
        Self::default()
    }

    /// Совпадает ли `current` с обоими предыдущими кадрами
    pub fn completes_triplicate(&self, current: &Digest) -> bool {
        all_equal(self.before_previous.as_ref(), self.previous.as_ref(), Some(current))
    }

    /// Сдвиг окна после кадра, который не остановил цикл
    pub fn shift(&mut self, current: Digest) {
        self.before_previous = self.previous.replace(current);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_digest_is_deterministic() {
        let bytes = b"\xff\xd8\xff\xe0 not really a jpeg";
        assert_eq!(Digest::of(bytes), Digest::of(bytes));
        assert_ne!(Digest::of(bytes), Digest::of(b"other"));
    }

    #[test]
    fn test_digest_matches_known_sha256() {
        assert_eq!(
            Digest::of(b"abc").to_string(),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn test_all_equal_requires_three_present() {
        let h = Digest::of(b"frame");
        let other = Digest::of(b"other frame");

        assert!(all_equal(Some(&h), Some(&h), Some(&h)));
        assert!(!all_equal(Some(&h), Some(&h), Some(&other)));
        assert!(!all_equal(Some(&other), Some(&h), Some(&h)));
        assert!(!all_equal(None, Some(&h), Some(&h)));
        assert!(!all_equal(Some(&h), None, Some(&h)));
        assert!(!all_equal(Some(&h), Some(&h), None));
        assert!(!all_equal(None, None, None));
    }

    #[test]
    fn test_window_needs_two_previous_frames() {
        let h = Digest::of(b"same");
        let mut window = DigestWindow::new();

        assert!(!window.completes_triplicate(&h));
        window.shift(h);
        assert!(!window.completes_triplicate(&h));
        window.shift(h);
        assert!(window.completes_triplicate(&h));
    }

    #[test]
    fn test_window_slides() {
        let a = Digest::of(b"a");
        let b = Digest::of(b"b");
        let mut window = DigestWindow::new();

        window.shift(a);
        window.shift(b);
        window.shift(b);
        assert!(window.completes_triplicate(&b));

        window.shift(a);
        assert!(!window.completes_triplicate(&b));
    }
}
