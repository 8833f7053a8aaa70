quick_error! {
    /// Everything that can go wrong while building, encoding, decoding or
    /// verifying a macaroon.
    ///
    /// Every error is terminal for the call that produced it; nothing is
    /// retried internally.
    #[derive(Debug)]
    pub enum MacaroonError {
        /// A packet had a bad length prefix, field name or terminator, or the
        /// packet stream was otherwise malformed.
        PacketFormat(msg: String) {
            display("malformed packet: {}", msg)
        }

        /// The content does not fit in a packet's 16-bit length field.
        PacketTooLarge(field: &'static str, size: usize) {
            display("{} packet too big ({} bytes)", field, size)
        }

        /// Authenticated decryption failed, or produced the wrong length.
        Crypto(msg: &'static str) {
            display("crypto failure: {}", msg)
        }

        /// The random source could not supply a full nonce.
        RandomSource(err: rand_core::Error) {
            from()
            display("cannot generate nonce: {}", err)
            cause(err)
        }

        /// The caller's check rejected a first-party caveat.
        CaveatCheck(caveat: String, reason: String) {
            display("caveat {:?} not satisfied: {}", caveat, reason)
        }

        DischargeNotFound(caveat: String) {
            display("cannot find discharge macaroon for caveat {:?}", caveat)
        }

        DischargeReused(id: String) {
            display("discharge macaroon {:?} was used more than once", id)
        }

        DischargeUnused(id: String) {
            display("discharge macaroon {:?} was not used", id)
        }

        SignatureMismatch {
            display("signature mismatch after caveat verification")
        }

        /// JSON that is syntactically or structurally invalid.
        Json(msg: String) {
            display("invalid macaroon JSON: {}", msg)
        }
    }
}

pub type Result<T> = ::std::result::Result<T, MacaroonError>;
