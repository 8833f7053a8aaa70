use std::fmt;

use zeroize::Zeroizing;

use crate::error::{MacaroonError, Result};
use crate::macaroon::{Caveat, Macaroon};
use crate::primitives::{self, HASH_LEN, KEY_LEN};


impl Macaroon {
    /// Verify the macaroon against its root key and a set of discharge
    /// macaroons.
    ///
    /// `check` is called with the condition of every first-party caveat, of
    /// this macaroon and of every discharge used, and must return an error
    /// to reject it. Every third-party caveat must be satisfied by exactly
    /// one discharge bound to this macaroon's signature, and every
    /// discharge must be used exactly once.
    pub fn verify<F, E>(&self, root_key: &[u8], mut check: F, discharges: &[Macaroon]) -> Result<()>
        where F: FnMut(&[u8]) -> ::std::result::Result<(), E>,
              E: fmt::Display
    {
        let key = Zeroizing::new(primitives::make_key(root_key));
        let mut check = |condition: &[u8]| check(condition).map_err(|e| e.to_string());

        let mut session = Session {
            check: &mut check,
            discharges: discharges,
            used: vec![0; discharges.len()],
            root_signature: *self.signature(),
        };
        session.verify(self, &key)?;

        for (discharge, &used) in discharges.iter().zip(&session.used) {
            match used {
                1 => {}
                0 => {
                    debug!("discharge macaroon {:?} was not used", discharge.id_lossy());
                    return Err(MacaroonError::DischargeUnused(discharge.id_lossy().into_owned()));
                }
                _ => return Err(MacaroonError::DischargeReused(discharge.id_lossy().into_owned())),
            }
        }

        Ok(())
    }
}


/// State for a single call to `Macaroon::verify`.
struct Session<'a> {
    check: &'a mut dyn FnMut(&[u8]) -> ::std::result::Result<(), String>,
    discharges: &'a [Macaroon],
    /// How many times each discharge has been used so far.
    used: Vec<u32>,
    /// Signature of the primary macaroon, that all discharges are bound to.
    root_signature: [u8; HASH_LEN],
}

impl<'a> Session<'a> {
    fn verify(&mut self, macaroon: &Macaroon, key: &[u8; KEY_LEN]) -> Result<()> {
        let mut signature = primitives::keyed_hash(key, macaroon.id());

        for (i, caveat) in macaroon.caveat_list().iter().enumerate() {
            let caveat_id = macaroon.packet_data(caveat.id());
            trace!("macaroon {:?}: caveat {}", macaroon.id_lossy(), i);

            match *caveat {
                Caveat::FirstParty { .. } => {
                    if let Err(reason) = (self.check)(caveat_id) {
                        let caveat_id = String::from_utf8_lossy(caveat_id).into_owned();
                        debug!("caveat {:?} rejected: {}", caveat_id, reason);
                        return Err(MacaroonError::CaveatCheck(caveat_id, reason));
                    }
                    signature = primitives::keyed_hash2(&signature, b"", caveat_id);
                }
                Caveat::ThirdParty { verification_id, .. } => {
                    let verification_id = macaroon.packet_data(verification_id);
                    let caveat_key = primitives::decrypt(&signature, verification_id)
                        .map(Zeroizing::new)
                        .map_err(|err| {
                            debug!("cannot decrypt caveat {} of {:?}: {}", i, macaroon.id_lossy(), err);
                            err
                        })?;

                    let discharges = self.discharges;
                    let index = discharges.iter()
                        .position(|d| d.id() == caveat_id)
                        .ok_or_else(|| {
                            let caveat_id = String::from_utf8_lossy(caveat_id).into_owned();
                            debug!("no discharge macaroon for caveat {:?}", caveat_id);
                            MacaroonError::DischargeNotFound(caveat_id)
                        })?;

                    let discharge = &discharges[index];
                    if self.used[index] >= 1 {
                        debug!("discharge macaroon {:?} used more than once", discharge.id_lossy());
                        return Err(MacaroonError::DischargeReused(discharge.id_lossy().into_owned()));
                    }
                    self.used[index] += 1;

                    self.verify(discharge, &caveat_key)?;
                    signature = primitives::keyed_hash2(&signature, verification_id, caveat_id);
                }
            }
        }

        let bound = primitives::bind_for_request(&self.root_signature, &signature);
        if !primitives::signatures_equal(&bound, macaroon.signature()) {
            debug!("signature mismatch for macaroon {:?}", macaroon.id_lossy());
            return Err(MacaroonError::SignatureMismatch);
        }
        Ok(())
    }
}


/// A reusable set of rules deciding which first-party caveats are
/// acceptable.
///
/// A caveat passes if it equals one of the exact conditions, or if any of
/// the general predicates accepts it.
#[derive(Default)]
pub struct Verifier<'a> {
    exact: Vec<Vec<u8>>,
    general: Vec<Box<dyn Fn(&[u8]) -> bool + 'a>>,
}

impl<'a> Verifier<'a> {
    pub fn new() -> Verifier<'a> {
        Verifier::default()
    }

    /// Accept caveats whose condition is exactly `condition`.
    pub fn satisfy_exact(&mut self, condition: &[u8]) -> &mut Self {
        self.exact.push(condition.to_vec());
        self
    }

    /// Accept caveats for which `predicate` returns true.
    pub fn satisfy_general<F>(&mut self, predicate: F) -> &mut Self
        where F: Fn(&[u8]) -> bool + 'a
    {
        self.general.push(Box::new(predicate));
        self
    }

    pub fn check(&self, caveat: &[u8]) -> ::std::result::Result<(), &'static str> {
        if self.exact.iter().any(|c| &c[..] == caveat)
            || self.general.iter().any(|predicate| predicate(caveat))
        {
            Ok(())
        } else {
            Err("caveat not satisfied")
        }
    }

    /// Verify `macaroon` with these rules as the first-party check.
    pub fn verify(&self, macaroon: &Macaroon, root_key: &[u8], discharges: &[Macaroon]) -> Result<()> {
        macaroon.verify(root_key, |caveat| self.check(caveat), discharges)
    }
}
