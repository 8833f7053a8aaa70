//! Keyed hashing and the secretbox construction used to wrap third-party
//! caveat keys.
//!
//! These must match the reference constructions bit for bit; any change to
//! the folding order silently breaks interoperability.

use crypto::hmac::Hmac;
use crypto::mac::Mac;
use crypto::poly1305::Poly1305;
use crypto::salsa20::Salsa20;
use crypto::sha2::Sha256;
use crypto::symmetriccipher::SynchronousStreamCipher;
use crypto::util::fixed_time_eq;
use rand_core::{CryptoRng, RngCore};

use crate::error::{MacaroonError, Result};


pub const KEY_LEN: usize = 32;
pub const HASH_LEN: usize = 32;
pub const NONCE_LEN: usize = 24;

/// Length of the Poly1305 tag prepended to each secretbox.
pub const SECRETBOX_OVERHEAD: usize = 16;

/// The HMAC key used to turn an arbitrary root key into a fixed size one.
pub const KEY_GENERATOR: &[u8] = b"macaroons-key-generator";

/// The key used when binding a discharge macaroon to its primary.
pub const ZERO_KEY: [u8; KEY_LEN] = [0; KEY_LEN];


/// Derives the fixed size key used to mint a macaroon from a root key of
/// any length.
pub fn make_key(variable_key: &[u8]) -> [u8; KEY_LEN] {
    keyed_hash(KEY_GENERATOR, variable_key)
}

/// HMAC-SHA256 of `text` under `key`.
pub fn keyed_hash(key: &[u8], text: &[u8]) -> [u8; HASH_LEN] {
    let mut mac = Hmac::new(Sha256::new(), key);
    mac.input(text);
    let mut out = [0; HASH_LEN];
    mac.raw_result(&mut out);
    out
}

/// Folds two pieces of data into one hash.
///
/// If `d1` is empty this is just `keyed_hash(key, d2)`, otherwise it is
/// the hash of both individual hashes concatenated.
pub fn keyed_hash2(key: &[u8], d1: &[u8], d2: &[u8]) -> [u8; HASH_LEN] {
    if d1.is_empty() {
        return keyed_hash(key, d2);
    }
    let mut both = [0; HASH_LEN * 2];
    both[..HASH_LEN].copy_from_slice(&keyed_hash(key, d1));
    both[HASH_LEN..].copy_from_slice(&keyed_hash(key, d2));
    keyed_hash(key, &both)
}

/// Binds a discharge signature to the signature of the root macaroon it
/// is sent along with.
///
/// The root macaroon itself is "bound" to its own signature, which leaves
/// it unchanged.
pub fn bind_for_request(root_sig: &[u8], discharge_sig: &[u8; HASH_LEN]) -> [u8; HASH_LEN] {
    if root_sig == &discharge_sig[..] {
        return *discharge_sig;
    }
    keyed_hash2(&ZERO_KEY, root_sig, discharge_sig)
}

/// Constant time comparison of two signatures.
pub fn signatures_equal(a: &[u8], b: &[u8]) -> bool {
    a.len() == b.len() && fixed_time_eq(a, b)
}

/// Encrypts a key under `key` with a fresh nonce from `rng`.
///
/// The output is `nonce || tag || ciphertext`, as produced by NaCl's
/// `crypto_secretbox` with the nonce prepended.
pub fn encrypt<R>(key: &[u8; KEY_LEN], text: &[u8; KEY_LEN], rng: &mut R) -> Result<Vec<u8>>
    where R: RngCore + CryptoRng
{
    let mut nonce = [0; NONCE_LEN];
    rng.try_fill_bytes(&mut nonce)?;

    let mut out = Vec::with_capacity(NONCE_LEN + SECRETBOX_OVERHEAD + KEY_LEN);
    out.extend_from_slice(&nonce);
    out.extend_from_slice(&secretbox_seal(key, &nonce, text));
    Ok(out)
}

/// Reverses `encrypt`, checking the authentication tag and the length of
/// the recovered key.
pub fn decrypt(key: &[u8; KEY_LEN], ciphertext: &[u8]) -> Result<[u8; KEY_LEN]> {
    if ciphertext.len() < NONCE_LEN + SECRETBOX_OVERHEAD {
        return Err(MacaroonError::Crypto("message too short"));
    }
    let (nonce, sealed) = ciphertext.split_at(NONCE_LEN);

    let text = secretbox_open(key, nonce, sealed)
        .ok_or(MacaroonError::Crypto("decryption failure"))?;
    if text.len() != KEY_LEN {
        return Err(MacaroonError::Crypto("decrypted text is wrong length"));
    }

    let mut out = [0; KEY_LEN];
    out.copy_from_slice(&text);
    Ok(out)
}


// XSalsa20 keystream; the first 32 bytes key Poly1305 and the rest
// encrypt the message.
fn secretbox_cipher(key: &[u8], nonce: &[u8]) -> (Salsa20, [u8; 32]) {
    let mut cipher = Salsa20::new_xsalsa20(key, nonce);
    let mut poly_key = [0; 32];
    cipher.process(&[0; 32], &mut poly_key);
    (cipher, poly_key)
}

fn poly1305_tag(poly_key: &[u8], data: &[u8]) -> [u8; SECRETBOX_OVERHEAD] {
    let mut mac = Poly1305::new(poly_key);
    mac.input(data);
    let mut tag = [0; SECRETBOX_OVERHEAD];
    mac.raw_result(&mut tag);
    tag
}

fn secretbox_seal(key: &[u8], nonce: &[u8], text: &[u8]) -> Vec<u8> {
    let (mut cipher, poly_key) = secretbox_cipher(key, nonce);

    let mut sealed = vec![0; SECRETBOX_OVERHEAD + text.len()];
    cipher.process(text, &mut sealed[SECRETBOX_OVERHEAD..]);
    let tag = poly1305_tag(&poly_key, &sealed[SECRETBOX_OVERHEAD..]);
    sealed[..SECRETBOX_OVERHEAD].copy_from_slice(&tag);
    sealed
}

fn secretbox_open(key: &[u8], nonce: &[u8], sealed: &[u8]) -> Option<Vec<u8>> {
    let (tag, ciphertext) = sealed.split_at(SECRETBOX_OVERHEAD);
    let (mut cipher, poly_key) = secretbox_cipher(key, nonce);

    if !fixed_time_eq(&poly1305_tag(&poly_key, ciphertext), tag) {
        return None;
    }

    let mut text = vec![0; ciphertext.len()];
    cipher.process(ciphertext, &mut text);
    Some(text)
}
