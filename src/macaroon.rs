use std::borrow::Cow;
use std::fmt;

use rand_core::{CryptoRng, OsRng, RngCore};
use rustc_serialize::hex::ToHex;
use zeroize::Zeroizing;

use crate::error::Result;
use crate::packet::{self, Field, Packet};
use crate::primitives::{self, HASH_LEN};


/// A caveat as stored inside a macaroon. The packets index into the
/// macaroon's data buffer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Caveat {
    /// Checked locally by the verifier. A location hint is only present if
    /// one was decoded off the wire.
    FirstParty {
        id: Packet,
        location: Option<Packet>,
    },
    /// Requires a discharge macaroon whose id is the caveat id.
    ThirdParty {
        id: Packet,
        verification_id: Packet,
        location: Option<Packet>,
    },
}

impl Caveat {
    pub(crate) fn id(&self) -> Packet {
        match *self {
            Caveat::FirstParty { id, .. } | Caveat::ThirdParty { id, .. } => id,
        }
    }

    pub(crate) fn location(&self) -> Option<Packet> {
        match *self {
            Caveat::FirstParty { location, .. } | Caveat::ThirdParty { location, .. } => location,
        }
    }

    pub(crate) fn verification_id(&self) -> Option<Packet> {
        match *self {
            Caveat::FirstParty { .. } => None,
            Caveat::ThirdParty { verification_id, .. } => Some(verification_id),
        }
    }
}


/// A read-only view of one caveat of a macaroon.
///
/// The verification id of third-party caveats is deliberately not exposed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CaveatInfo<'a> {
    id: &'a [u8],
    location: &'a [u8],
    third_party: bool,
}

impl<'a> CaveatInfo<'a> {
    /// The caveat condition, or for a third-party caveat the id a discharge
    /// macaroon must carry.
    pub fn id(&self) -> &'a [u8] {
        self.id
    }

    /// Location hint of the caveat; empty if there is none.
    pub fn location(&self) -> &'a [u8] {
        self.location
    }

    pub fn is_third_party(&self) -> bool {
        self.third_party
    }
}


/// A macaroon: a bearer token made of a location hint, an identifier, an
/// ordered list of caveats and a signature chaining them all to a root key.
///
/// Every caveat *decreases* the authority the macaroon grants. First-party
/// caveats are conditions the verifier checks itself; third-party caveats
/// need a discharge macaroon minted by whoever holds the caveat's key.
///
/// The signature is updated as caveats are added, so it is always the fold
/// of the id and all caveats over the root key. It is only checked against
/// that fold when the macaroon is verified.
///
/// All packets live in one buffer, which is also the start of the binary
/// serialization. Cloning copies that buffer, so a clone and its original
/// can be extended independently.
#[derive(Clone)]
pub struct Macaroon {
    data: Vec<u8>,
    location: Packet,
    id: Packet,
    caveats: Vec<Caveat>,
    signature: [u8; HASH_LEN],
}

impl Macaroon {
    /// Mint a new macaroon from a root key, an identifier and a location
    /// hint.
    pub fn new(root_key: &[u8], id: &[u8], location: &[u8]) -> Result<Macaroon> {
        let mut macaroon = Macaroon::unsigned(id, location)?;
        let key = Zeroizing::new(primitives::make_key(root_key));
        macaroon.signature = primitives::keyed_hash(&*key, id);
        Ok(macaroon)
    }

    /// The location and id packets with no caveats and a zero signature.
    pub(crate) fn unsigned(id: &[u8], location: &[u8]) -> Result<Macaroon> {
        let mut data = Vec::with_capacity(
            packet::packet_size(Field::Location, location)
                + packet::packet_size(Field::Identifier, id)
        );
        let location = packet::append_packet(&mut data, Field::Location, location)?;
        let id = packet::append_packet(&mut data, Field::Identifier, id)?;

        Ok(Macaroon {
            data: data,
            location: location,
            id: id,
            caveats: Vec::new(),
            signature: [0; HASH_LEN],
        })
    }

    pub(crate) fn from_parts(
        data: Vec<u8>,
        location: Packet,
        id: Packet,
        caveats: Vec<Caveat>,
        signature: [u8; HASH_LEN],
    ) -> Macaroon {
        Macaroon {
            data: data,
            location: location,
            id: id,
            caveats: caveats,
            signature: signature,
        }
    }

    /// Add a caveat that the verifier checks itself.
    pub fn add_first_party_caveat(&mut self, caveat_id: &[u8]) -> Result<&mut Self> {
        self.append_caveat(caveat_id, b"", b"")?;
        self.signature = primitives::keyed_hash2(&self.signature, b"", caveat_id);
        Ok(self)
    }

    /// Add a caveat that must be discharged by a third party, using the
    /// operating system's random source for the nonce.
    ///
    /// `root_key` is the key the discharge macaroon will be minted with,
    /// and `caveat_id` the id it will carry.
    pub fn add_third_party_caveat(
        &mut self,
        root_key: &[u8],
        caveat_id: &[u8],
        location: &[u8],
    ) -> Result<&mut Self> {
        self.add_third_party_caveat_with_rng(root_key, caveat_id, location, &mut OsRng)
    }

    /// Like `add_third_party_caveat`, with the nonce drawn from `rng`.
    pub fn add_third_party_caveat_with_rng<R>(
        &mut self,
        root_key: &[u8],
        caveat_id: &[u8],
        location: &[u8],
        rng: &mut R,
    ) -> Result<&mut Self>
        where R: RngCore + CryptoRng
    {
        let key = Zeroizing::new(primitives::make_key(root_key));
        let verification_id = primitives::encrypt(&self.signature, &key, rng)?;

        self.append_caveat(caveat_id, &verification_id, location)?;
        self.signature = primitives::keyed_hash2(&self.signature, &verification_id, caveat_id);
        Ok(self)
    }

    /// Bind this (discharge) macaroon to the signature of the primary
    /// macaroon it will be sent with.
    pub fn bind(&mut self, root_signature: &[u8]) -> &mut Self {
        self.signature = primitives::bind_for_request(root_signature, &self.signature);
        self
    }

    /// Appends the packets for one caveat. On failure the macaroon is left
    /// exactly as it was.
    pub(crate) fn append_caveat(
        &mut self,
        caveat_id: &[u8],
        verification_id: &[u8],
        location: &[u8],
    ) -> Result<()> {
        let mark = self.data.len();
        match self.append_caveat_packets(caveat_id, verification_id, location) {
            Ok(caveat) => {
                self.caveats.push(caveat);
                Ok(())
            }
            Err(err) => {
                self.data.truncate(mark);
                Err(err)
            }
        }
    }

    fn append_caveat_packets(
        &mut self,
        caveat_id: &[u8],
        verification_id: &[u8],
        location: &[u8],
    ) -> Result<Caveat> {
        let id = packet::append_packet(&mut self.data, Field::CaveatId, caveat_id)?;

        let vid = if verification_id.is_empty() {
            None
        } else {
            Some(packet::append_packet(&mut self.data, Field::VerificationId, verification_id)?)
        };

        let location = if location.is_empty() {
            None
        } else {
            Some(packet::append_packet(&mut self.data, Field::CaveatLocation, location)?)
        };

        Ok(match vid {
            None => Caveat::FirstParty { id: id, location: location },
            Some(vid) => Caveat::ThirdParty { id: id, verification_id: vid, location: location },
        })
    }

    /// Get the location hint of the macaroon
    pub fn location(&self) -> &[u8] {
        self.location.data(&self.data)
    }

    /// Get the identifier of the macaroon
    pub fn id(&self) -> &[u8] {
        self.id.data(&self.data)
    }

    /// Get the *current* signature of the macaroon.
    ///
    /// # Safety
    /// Do not compare this directly with other signatures. Always use a
    /// constant time comparison function.
    pub fn signature(&self) -> &[u8; HASH_LEN] {
        &self.signature
    }

    pub fn signature_hex(&self) -> String {
        self.signature.to_hex()
    }

    /// Get the *current* caveats of the macaroon, in order.
    pub fn caveats(&self) -> Vec<CaveatInfo> {
        self.caveats.iter()
            .map(|caveat| CaveatInfo {
                id: self.packet_data(caveat.id()),
                location: caveat.location().map_or(&[][..], |p| self.packet_data(p)),
                third_party: caveat.verification_id().is_some(),
            })
            .collect()
    }

    pub(crate) fn caveat_list(&self) -> &[Caveat] {
        &self.caveats
    }

    pub(crate) fn packet_data(&self, p: Packet) -> &[u8] {
        p.data(&self.data)
    }

    /// The packets of the location, the id and every caveat.
    pub(crate) fn data(&self) -> &[u8] {
        &self.data
    }

    pub(crate) fn set_signature(&mut self, signature: [u8; HASH_LEN]) {
        self.signature = signature;
    }

    /// The id, for use in log and error messages.
    pub(crate) fn id_lossy(&self) -> Cow<str> {
        String::from_utf8_lossy(self.id())
    }
}

impl fmt::Debug for Macaroon {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Macaroon")
            .field("location", &String::from_utf8_lossy(self.location()))
            .field("id", &self.id_lossy())
            .field("caveats", &self.caveats.len())
            .finish()
    }
}

impl PartialEq for Macaroon {
    /// Two macaroons are equal if they would serialize identically.
    fn eq(&self, other: &Macaroon) -> bool {
        self.data == other.data
            && primitives::signatures_equal(&self.signature, &other.signature)
    }
}

impl Eq for Macaroon {}
