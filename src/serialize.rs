//! Binary, base64 and JSON encodings of macaroons, and of the slice of a
//! primary macaroon with its discharges.
//!
//! The binary form is the macaroon's packets followed by a `signature`
//! packet. The base64 form is the URL-safe, unpadded encoding of the binary
//! form. The JSON form is
//!
//! ```text
//! {"caveats":[{"cid":..,"vid":..,"cl":..}],"identifier":..,"location":..,"signature":..}
//! ```
//!
//! with `vid` in URL-safe base64 and the signature in lowercase hex. `vid`
//! and `cl` are left out when empty.

use std::collections::BTreeMap;
use std::iter;

use rustc_serialize::base64::{FromBase64, ToBase64, URL_SAFE};
use rustc_serialize::hex::{FromHex, ToHex};
use rustc_serialize::json::{self, Json, ToJson};

use crate::error::{MacaroonError, Result};
use crate::macaroon::{Caveat, Macaroon};
use crate::packet::{self, Field, Packet};
use crate::primitives::HASH_LEN;


impl Macaroon {
    /// Serialize into a binary blob.
    pub fn to_binary(&self) -> Result<Vec<u8>> {
        let mut data = Vec::with_capacity(
            self.data().len() + packet::packet_size(Field::Signature, self.signature())
        );
        data.extend_from_slice(self.data());
        packet::append_packet(&mut data, Field::Signature, self.signature())?;
        Ok(data)
    }

    /// Parse a binary serialized macaroon, which must make up the whole of
    /// `data`.
    ///
    /// *Note: This does not verify the signature.*
    pub fn from_binary(data: &[u8]) -> Result<Macaroon> {
        let (macaroon, used) = Macaroon::from_binary_prefix(data)?;
        if used != data.len() {
            return Err(format_error(format!("{} bytes of trailing data", data.len() - used)));
        }
        Ok(macaroon)
    }

    /// Parse the binary serialized macaroon at the start of `data`,
    /// returning it and the number of bytes it took up.
    pub fn from_binary_prefix(data: &[u8]) -> Result<(Macaroon, usize)> {
        decode_binary(data).map_err(|err| {
            debug!("cannot decode macaroon: {}", err);
            err
        })
    }

    /// Serialize into base64; the URL-safe base64 of the binary form.
    pub fn to_base64(&self) -> Result<String> {
        Ok(self.to_binary()?.to_base64(URL_SAFE))
    }

    /// Parse a base64 serialized macaroon. Padding is optional.
    pub fn from_base64(input: &str) -> Result<Macaroon> {
        Macaroon::from_binary(&decode_base64(input)?)
    }

    pub fn to_json_string(&self) -> String {
        self.to_json().to_string()
    }

    /// Parse a macaroon from its JSON object.
    pub fn from_json(value: &Json) -> Result<Macaroon> {
        let obj = value.as_object()
            .ok_or_else(|| json_error("macaroon is not an object"))?;

        let location = string_field(obj, "location")?.unwrap_or("");
        let id = string_field(obj, "identifier")?
            .ok_or_else(|| json_error("missing identifier"))?;

        let signature = string_field(obj, "signature")?
            .ok_or_else(|| json_error("missing signature"))?
            .from_hex()
            .map_err(|err| json_error(format!("cannot decode signature: {}", err)))?;
        if signature.len() != HASH_LEN {
            return Err(json_error(format!("signature has unexpected length {}", signature.len())));
        }

        let mut macaroon = Macaroon::unsigned(id.as_bytes(), location.as_bytes())?;

        let caveats = match obj.get("caveats") {
            None | Some(&Json::Null) => &[][..],
            Some(&Json::Array(ref caveats)) => &caveats[..],
            Some(_) => return Err(json_error("caveats is not an array")),
        };
        for caveat in caveats {
            let caveat = caveat.as_object()
                .ok_or_else(|| json_error("caveat is not an object"))?;
            let caveat_id = string_field(caveat, "cid")?
                .ok_or_else(|| json_error("caveat without cid"))?;
            let verification_id = match string_field(caveat, "vid")? {
                Some(vid) => vid.from_base64()
                    .map_err(|err| json_error(format!("cannot decode vid: {}", err)))?,
                None => Vec::new(),
            };
            let location = string_field(caveat, "cl")?.unwrap_or("");

            macaroon.append_caveat(caveat_id.as_bytes(), &verification_id, location.as_bytes())?;
        }

        let mut sig = [0; HASH_LEN];
        sig.copy_from_slice(&signature);
        macaroon.set_signature(sig);
        Ok(macaroon)
    }

    pub fn from_json_str(input: &str) -> Result<Macaroon> {
        Macaroon::from_json(&parse_json(input)?)
    }
}

impl ToJson for Macaroon {
    fn to_json(&self) -> Json {
        let caveats = self.caveat_list().iter()
            .map(|caveat| {
                let mut obj = BTreeMap::new();
                obj.insert("cid".to_owned(), self.lossy_json(caveat.id()));
                if let Some(vid) = caveat.verification_id() {
                    let vid = self.packet_data(vid).to_base64(URL_SAFE);
                    obj.insert("vid".to_owned(), Json::String(vid));
                }
                if let Some(location) = caveat.location() {
                    obj.insert("cl".to_owned(), self.lossy_json(location));
                }
                Json::Object(obj)
            })
            .collect();

        let mut obj = BTreeMap::new();
        obj.insert("caveats".to_owned(), Json::Array(caveats));
        obj.insert("location".to_owned(), Json::String(String::from_utf8_lossy(self.location()).into_owned()));
        obj.insert("identifier".to_owned(), Json::String(self.id_lossy().into_owned()));
        obj.insert("signature".to_owned(), Json::String(self.signature().to_hex()));
        Json::Object(obj)
    }
}

impl Macaroon {
    fn lossy_json(&self, p: Packet) -> Json {
        Json::String(String::from_utf8_lossy(self.packet_data(p)).into_owned())
    }
}


/// A caveat whose `cid` has been read but which may still get a `vid` or
/// `cl` packet.
struct PendingCaveat {
    id: Packet,
    verification_id: Option<Packet>,
    location: Option<Packet>,
}

impl PendingCaveat {
    fn finish(self) -> Caveat {
        match self.verification_id {
            Some(vid) => Caveat::ThirdParty {
                id: self.id,
                verification_id: vid,
                location: self.location,
            },
            None => Caveat::FirstParty { id: self.id, location: self.location },
        }
    }
}

fn decode_binary(data: &[u8]) -> Result<(Macaroon, usize)> {
    let location = expect_packet(data, 0, Field::Location)?;
    let id = expect_packet(data, location.end(), Field::Identifier)?;

    let mut caveats = Vec::new();
    let mut pending: Option<PendingCaveat> = None;
    let mut start = id.end();

    loop {
        let p = packet::parse_packet(data, start)?;
        start = p.end();

        match Field::from_name(p.field_name(data)) {
            Some(Field::Signature) => {
                caveats.extend(pending.take().map(PendingCaveat::finish));

                let sig = p.data(data);
                if sig.len() != HASH_LEN {
                    return Err(format_error(format!("signature has unexpected length {}", sig.len())));
                }
                let mut signature = [0; HASH_LEN];
                signature.copy_from_slice(sig);

                let macaroon = Macaroon::from_parts(
                    data[..p.start()].to_vec(), location, id, caveats, signature,
                );
                return Ok((macaroon, start));
            }
            Some(Field::CaveatId) => {
                let next = PendingCaveat { id: p, verification_id: None, location: None };
                caveats.extend(pending.replace(next).map(PendingCaveat::finish));
            }
            Some(Field::VerificationId) => {
                let caveat = pending.as_mut()
                    .ok_or_else(|| format_error("vid field before any cid".to_owned()))?;
                if caveat.verification_id.replace(p).is_some() {
                    return Err(format_error("repeated field \"vid\" in caveat".to_owned()));
                }
            }
            Some(Field::CaveatLocation) => {
                let caveat = pending.as_mut()
                    .ok_or_else(|| format_error("cl field before any cid".to_owned()))?;
                if caveat.location.replace(p).is_some() {
                    return Err(format_error("repeated field \"cl\" in caveat".to_owned()));
                }
            }
            Some(Field::Location) | Some(Field::Identifier) | None => {
                return Err(format_error(format!(
                    "unexpected field {:?}",
                    String::from_utf8_lossy(p.field_name(data)),
                )));
            }
        }
    }
}

fn expect_packet(data: &[u8], start: usize, field: Field) -> Result<Packet> {
    let p = packet::parse_packet(data, start)?;
    if Field::from_name(p.field_name(data)) != Some(field) {
        return Err(format_error(format!(
            "unexpected field {:?}; expected {}",
            String::from_utf8_lossy(p.field_name(data)),
            field.name(),
        )));
    }
    Ok(p)
}


/// A primary macaroon together with the discharge macaroons needed to
/// verify it, in the order they are sent.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Slice {
    primary: Macaroon,
    discharges: Vec<Macaroon>,
}

impl Slice {
    pub fn new(primary: Macaroon) -> Slice {
        Slice { primary: primary, discharges: Vec::new() }
    }

    pub fn push(&mut self, discharge: Macaroon) -> &mut Self {
        self.discharges.push(discharge);
        self
    }

    pub fn primary(&self) -> &Macaroon {
        &self.primary
    }

    pub fn discharges(&self) -> &[Macaroon] {
        &self.discharges
    }

    /// All macaroons, primary first.
    pub fn iter(&self) -> impl Iterator<Item = &Macaroon> {
        iter::once(&self.primary).chain(self.discharges.iter())
    }

    pub fn len(&self) -> usize {
        1 + self.discharges.len()
    }

    /// Bind every discharge to the signature of the primary macaroon.
    pub fn bind_discharges(&mut self) -> &mut Self {
        let signature = *self.primary.signature();
        for discharge in &mut self.discharges {
            discharge.bind(&signature);
        }
        self
    }

    /// Verify the primary macaroon using the rest as its discharges.
    pub fn verify<F, E>(&self, root_key: &[u8], check: F) -> Result<()>
        where F: FnMut(&[u8]) -> ::std::result::Result<(), E>,
              E: ::std::fmt::Display
    {
        self.primary.verify(root_key, check, &self.discharges)
    }

    /// The binary forms of all macaroons, concatenated.
    pub fn to_binary(&self) -> Result<Vec<u8>> {
        let mut data = Vec::new();
        for macaroon in self.iter() {
            data.extend_from_slice(&macaroon.to_binary()?);
        }
        Ok(data)
    }

    pub fn from_binary(data: &[u8]) -> Result<Slice> {
        let mut macaroons = Vec::new();
        let mut start = 0;
        while start < data.len() {
            let (macaroon, used) = Macaroon::from_binary_prefix(&data[start..])?;
            macaroons.push(macaroon);
            start += used;
        }
        Slice::from_macaroons(macaroons)
            .ok_or_else(|| format_error("no macaroons in slice".to_owned()))
    }

    pub fn to_base64(&self) -> Result<String> {
        Ok(self.to_binary()?.to_base64(URL_SAFE))
    }

    pub fn from_base64(input: &str) -> Result<Slice> {
        Slice::from_binary(&decode_base64(input)?)
    }

    pub fn to_json_string(&self) -> String {
        self.to_json().to_string()
    }

    /// Parse a JSON array of macaroon objects.
    pub fn from_json(value: &Json) -> Result<Slice> {
        let macaroons = value.as_array()
            .ok_or_else(|| json_error("macaroon slice is not an array"))?
            .iter()
            .map(Macaroon::from_json)
            .collect::<Result<Vec<_>>>()?;
        Slice::from_macaroons(macaroons)
            .ok_or_else(|| json_error("no macaroons in slice"))
    }

    pub fn from_json_str(input: &str) -> Result<Slice> {
        Slice::from_json(&parse_json(input)?)
    }

    fn from_macaroons(macaroons: Vec<Macaroon>) -> Option<Slice> {
        let mut macaroons = macaroons.into_iter();
        let primary = macaroons.next()?;
        Some(Slice { primary: primary, discharges: macaroons.collect() })
    }
}

impl ToJson for Slice {
    fn to_json(&self) -> Json {
        Json::Array(self.iter().map(ToJson::to_json).collect())
    }
}


fn string_field<'a>(obj: &'a json::Object, key: &str) -> Result<Option<&'a str>> {
    match obj.get(key) {
        None | Some(&Json::Null) => Ok(None),
        Some(&Json::String(ref s)) => Ok(Some(s)),
        Some(_) => Err(json_error(format!("field {:?} is not a string", key))),
    }
}

fn parse_json(input: &str) -> Result<Json> {
    Json::from_str(input).map_err(|err| json_error(err.to_string()))
}

fn decode_base64(input: &str) -> Result<Vec<u8>> {
    input.from_base64()
        .map_err(|err| format_error(format!("invalid base64: {}", err)))
}

fn json_error<S: Into<String>>(msg: S) -> MacaroonError {
    MacaroonError::Json(msg.into())
}

fn format_error(msg: String) -> MacaroonError {
    MacaroonError::PacketFormat(msg)
}


#[cfg(test)]
mod tests {
    use super::Slice;
    use crate::error::MacaroonError;
    use crate::macaroon::Macaroon;
    use crate::packet::{self, Field};
    use crate::primitives::test_rng::CountingRng;
    use rustc_serialize::base64::{FromBase64, ToBase64, URL_SAFE};
    use rustc_serialize::json::Json;

    const VECTOR: &str = concat!(
        "MDAwZWxvY2F0aW9uIAowMDE1aWRlbnRpZmllciBrZXlpZAowMDFkY2lkIGFjY291bnQgPSAzNzM1OTI4NTU5Cj",
        "AwMmZzaWduYXR1cmUgdcXNHCk0t4XENTdmLaXvt5tmHw7yQqVkdlTOrVLqvaoK",
    );

    fn vector_macaroon() -> Macaroon {
        let mut m = Macaroon::new(b"this is a super secret key", b"keyid", b"").unwrap();
        m.add_first_party_caveat(b"account = 3735928559").unwrap();
        m
    }

    fn full_macaroon() -> Macaroon {
        let mut m = Macaroon::new(b"root-key", b"primary", b"https://example.com").unwrap();
        m.add_first_party_caveat(b"time < 2030-01-01").unwrap();
        m.add_third_party_caveat_with_rng(b"shared-key", b"user=alice", b"auth", &mut CountingRng(0))
            .unwrap();
        m.add_third_party_caveat_with_rng(b"other-key", b"mfa", b"", &mut CountingRng(50))
            .unwrap();
        m.add_first_party_caveat(b"op = read").unwrap();
        m
    }

    /// Every caveat as `(id, verification id, location)`.
    fn caveat_tuples(m: &Macaroon) -> Vec<(Vec<u8>, Vec<u8>, Vec<u8>)> {
        m.caveat_list().iter()
            .map(|c| (
                m.packet_data(c.id()).to_vec(),
                c.verification_id().map_or(Vec::new(), |p| m.packet_data(p).to_vec()),
                c.location().map_or(Vec::new(), |p| m.packet_data(p).to_vec()),
            ))
            .collect()
    }

    fn assert_same(a: &Macaroon, b: &Macaroon) {
        assert_eq!(a.location(), b.location());
        assert_eq!(a.id(), b.id());
        assert_eq!(caveat_tuples(a), caveat_tuples(b));
        assert_eq!(a.signature(), b.signature());
    }

    fn assert_format_error(data: &[u8]) {
        match Macaroon::from_binary(data) {
            Err(MacaroonError::PacketFormat(_)) => {}
            other => panic!("unexpected result {:?}", other),
        }
    }

    #[test]
    fn binary_vector() {
        let m = vector_macaroon();
        assert_eq!(m.to_base64().unwrap(), VECTOR);

        let parsed = Macaroon::from_base64(VECTOR).unwrap();
        assert_same(&parsed, &m);
        assert_eq!(parsed.location(), b"");
        assert_eq!(parsed.id(), b"keyid");
        parsed.verify(b"this is a super secret key", |c: &[u8]| {
            if c == b"account = 3735928559" { Ok(()) } else { Err("bad caveat") }
        }, &[]).unwrap();
    }

    #[test]
    fn binary_round_trip() {
        let m = full_macaroon();
        let encoded = m.to_binary().unwrap();
        let parsed = Macaroon::from_binary(&encoded).unwrap();

        assert_same(&parsed, &m);
        assert_eq!(parsed, m);
        assert_eq!(parsed.to_binary().unwrap(), encoded);

        // Decoded macaroons can be extended like any other.
        let mut extended = parsed.clone();
        extended.add_first_party_caveat(b"more").unwrap();
        let mut expected = m.clone();
        expected.add_first_party_caveat(b"more").unwrap();
        assert_same(&extended, &expected);
    }

    #[test]
    fn base64_accepts_padding() {
        // 79 bytes, so the padded form ends in "==".
        let m = Macaroon::new(b"key", b"id", b"").unwrap();
        let unpadded = m.to_base64().unwrap();
        assert!(!unpadded.ends_with('='));

        let padded = m.to_binary().unwrap().to_base64(rustc_serialize::base64::Config {
            pad: true,
            ..URL_SAFE
        });
        assert!(padded.ends_with('='));
        assert_same(&Macaroon::from_base64(&padded).unwrap(), &m);
        assert_same(&Macaroon::from_base64(&unpadded).unwrap(), &m);

        assert_format_error_base64("not base64!");
    }

    fn assert_format_error_base64(input: &str) {
        match Macaroon::from_base64(input) {
            Err(MacaroonError::PacketFormat(_)) => {}
            other => panic!("unexpected result {:?}", other),
        }
    }

    fn packets(fields: &[(Field, &[u8])]) -> Vec<u8> {
        let mut data = Vec::new();
        for &(field, value) in fields {
            packet::append_packet(&mut data, field, value).unwrap();
        }
        data
    }

    #[test]
    fn first_party_caveat_with_location() {
        let data = packets(&[
            (Field::Location, b""),
            (Field::Identifier, b"id"),
            (Field::CaveatId, b"a = 1"),
            (Field::CaveatLocation, b"somewhere"),
            (Field::CaveatId, b"b = 2"),
            (Field::Signature, &[7; 32]),
        ]);
        let m = Macaroon::from_binary(&data).unwrap();

        let caveats = m.caveats();
        assert_eq!(caveats.len(), 2);
        assert!(!caveats[0].is_third_party());
        assert_eq!(caveats[0].location(), b"somewhere");
        assert_eq!(caveats[1].id(), b"b = 2");
        assert_eq!(caveats[1].location(), b"");
        assert_eq!(m.to_binary().unwrap(), data);
    }

    #[test]
    fn malformed_binary() {
        let sig: &[u8] = &[7; 32];

        // Truncated, or no signature at all.
        let full = packets(&[(Field::Location, b""), (Field::Identifier, b"id"), (Field::Signature, sig)]);
        for i in 0..full.len() {
            assert_format_error(&full[..i]);
        }
        assert_format_error(&packets(&[(Field::Location, b""), (Field::Identifier, b"id")]));

        // Wrong order of the header packets.
        assert_format_error(&packets(&[(Field::Identifier, b"id"), (Field::Location, b""), (Field::Signature, sig)]));
        assert_format_error(&packets(&[(Field::Location, b""), (Field::CaveatId, b"c"), (Field::Signature, sig)]));

        // Header fields again after the header.
        assert_format_error(&packets(&[
            (Field::Location, b""), (Field::Identifier, b"id"), (Field::Location, b"x"), (Field::Signature, sig),
        ]));

        // vid or cl without a caveat, or repeated within one.
        assert_format_error(&packets(&[
            (Field::Location, b""), (Field::Identifier, b"id"), (Field::VerificationId, b"v"), (Field::Signature, sig),
        ]));
        assert_format_error(&packets(&[
            (Field::Location, b""), (Field::Identifier, b"id"), (Field::CaveatLocation, b"l"), (Field::Signature, sig),
        ]));
        assert_format_error(&packets(&[
            (Field::Location, b""), (Field::Identifier, b"id"), (Field::CaveatId, b"c"),
            (Field::VerificationId, b"v"), (Field::VerificationId, b"v"), (Field::Signature, sig),
        ]));
        assert_format_error(&packets(&[
            (Field::Location, b""), (Field::Identifier, b"id"), (Field::CaveatId, b"c"),
            (Field::CaveatLocation, b"l"), (Field::CaveatLocation, b"l"), (Field::Signature, sig),
        ]));

        // Signature of the wrong length.
        assert_format_error(&packets(&[(Field::Location, b""), (Field::Identifier, b"id"), (Field::Signature, &[7; 31])]));

        // Unknown field.
        let mut data = packets(&[(Field::Location, b""), (Field::Identifier, b"id")]);
        data.extend_from_slice(b"000cfoo bar\n");
        data.extend_from_slice(&packets(&[(Field::Signature, sig)]));
        assert_format_error(&data);

        // Trailing bytes.
        let mut data = full.clone();
        data.push(b'\n');
        assert_format_error(&data);
        let (_, used) = Macaroon::from_binary_prefix(&data).unwrap();
        assert_eq!(used, full.len());
    }

    #[test]
    fn json_vector() {
        let m = vector_macaroon();
        let expected = concat!(
            r#"{"caveats":[{"cid":"account = 3735928559"}],"identifier":"keyid","location":"","#,
            r#""signature":"75c5cd1c2934b785c43537662da5efb79b661f0ef242a5647654cead52eabdaa"}"#,
        );
        assert_eq!(m.to_json_string(), expected);
        assert_same(&Macaroon::from_json_str(expected).unwrap(), &m);
    }

    #[test]
    fn json_round_trip() {
        let m = full_macaroon();
        let parsed = Macaroon::from_json_str(&m.to_json_string()).unwrap();
        assert_same(&parsed, &m);
        assert_eq!(parsed.to_binary().unwrap(), m.to_binary().unwrap());

        let json = Json::from_str(&m.to_json_string()).unwrap();
        let caveats = json.find("caveats").unwrap().as_array().unwrap();
        assert_eq!(caveats.len(), 4);
        assert!(caveats[0].find("vid").is_none());
        assert!(caveats[0].find("cl").is_none());
        assert_eq!(caveats[1].find("cl").unwrap().as_string(), Some("auth"));
        let vid = caveats[1].find("vid").unwrap().as_string().unwrap();
        assert!(!vid.contains('=') && !vid.contains('+') && !vid.contains('/'));
        assert_eq!(vid.from_base64().unwrap().len(), 72);
    }

    #[test]
    fn json_vid_padding() {
        let sig = "00".repeat(32);
        let parse = |vid: &str| {
            let input = format!(
                r#"{{"caveats":[{{"cid":"c","vid":"{}","cl":"x"}}],"location":"l","identifier":"i","signature":"{}"}}"#,
                vid, sig,
            );
            Macaroon::from_json_str(&input).unwrap()
        };

        let padded = parse("AQI=");
        let unpadded = parse("AQI");
        assert_same(&padded, &unpadded);
        let vid = padded.caveat_list()[0].verification_id().unwrap();
        assert_eq!(padded.packet_data(vid), &[1, 2][..]);
        assert!(padded.caveats()[0].is_third_party());

        assert!(padded.to_json_string().contains(r#""vid":"AQI""#));
    }

    #[test]
    fn json_optional_fields() {
        let sig = "ab".repeat(32);
        let input = format!(r#"{{"identifier":"i","signature":"{}"}}"#, sig);
        let m = Macaroon::from_json_str(&input).unwrap();
        assert_eq!(m.location(), b"");
        assert!(m.caveats().is_empty());

        let input = format!(
            r#"{{"caveats":[{{"cid":"c","vid":"","cl":null}}],"location":null,"identifier":"i","signature":"{}"}}"#,
            sig,
        );
        let m = Macaroon::from_json_str(&input).unwrap();
        assert!(!m.caveats()[0].is_third_party());
        assert_eq!(m.caveats()[0].location(), b"");
    }

    #[test]
    fn malformed_json() {
        let sig = "ab".repeat(32);
        let inputs = vec![
            "not json".to_owned(),
            "[]".to_owned(),
            format!(r#"{{"signature":"{}"}}"#, sig),
            r#"{"identifier":"i"}"#.to_owned(),
            r#"{"identifier":"i","signature":"zz"}"#.to_owned(),
            r#"{"identifier":"i","signature":"abab"}"#.to_owned(),
            format!(r#"{{"identifier":1,"signature":"{}"}}"#, sig),
            format!(r#"{{"identifier":"i","signature":"{}","caveats":{{}}}}"#, sig),
            format!(r#"{{"identifier":"i","signature":"{}","caveats":[1]}}"#, sig),
            format!(r#"{{"identifier":"i","signature":"{}","caveats":[{{"vid":"AQI"}}]}}"#, sig),
            format!(r#"{{"identifier":"i","signature":"{}","caveats":[{{"cid":"c","vid":"*"}}]}}"#, sig),
        ];
        for input in inputs {
            match Macaroon::from_json_str(&input) {
                Err(MacaroonError::Json(_)) => {}
                other => panic!("{}: unexpected result {:?}", input, other),
            }
        }
    }

    fn slice() -> Slice {
        let primary = full_macaroon();
        let mut slice = Slice::new(primary);
        slice.push(Macaroon::new(b"shared-key", b"user=alice", b"").unwrap());
        slice.push(Macaroon::new(b"other-key", b"mfa", b"mfa.example.com").unwrap());
        slice
    }

    fn check(caveat: &[u8]) -> Result<(), String> {
        match caveat {
            b"time < 2030-01-01" | b"op = read" => Ok(()),
            _ => Err("unexpected caveat".to_owned()),
        }
    }

    #[test]
    fn slice_binding_and_verification() {
        let mut slice = slice();
        match slice.verify(b"root-key", check) {
            Err(MacaroonError::SignatureMismatch) => {}
            other => panic!("unexpected result {:?}", other),
        }

        slice.bind_discharges();
        slice.verify(b"root-key", check).unwrap();
        assert!(slice.verify(b"wrong-key", check).is_err());
    }

    #[test]
    fn slice_encodings() {
        let mut slice = slice();
        slice.bind_discharges();
        assert_eq!(slice.len(), 3);

        let binary = slice.to_binary().unwrap();
        let parsed = Slice::from_binary(&binary).unwrap();
        assert_eq!(parsed, slice);
        for (a, b) in parsed.iter().zip(slice.iter()) {
            assert_same(a, b);
        }
        parsed.verify(b"root-key", check).unwrap();

        let parsed = Slice::from_base64(&slice.to_base64().unwrap()).unwrap();
        assert_eq!(parsed, slice);

        let parsed = Slice::from_json_str(&slice.to_json_string()).unwrap();
        assert_eq!(parsed, slice);
        assert_eq!(parsed.primary().id(), b"primary");
        assert_eq!(parsed.discharges()[1].location(), b"mfa.example.com");
        parsed.verify(b"root-key", check).unwrap();
    }

    #[test]
    fn slice_decode_errors() {
        match Slice::from_binary(b"") {
            Err(MacaroonError::PacketFormat(_)) => {}
            other => panic!("unexpected result {:?}", other),
        }
        match Slice::from_json_str("[]") {
            Err(MacaroonError::Json(_)) => {}
            other => panic!("unexpected result {:?}", other),
        }

        let mut binary = slice().to_binary().unwrap();
        binary.extend_from_slice(b"0006a");
        match Slice::from_binary(&binary) {
            Err(MacaroonError::PacketFormat(_)) => {}
            other => panic!("unexpected result {:?}", other),
        }

        // Each macaroon of a slice is still decodable on its own.
        let binary = slice().to_binary().unwrap();
        let (first, used) = Macaroon::from_binary_prefix(&binary).unwrap();
        assert_same(&first, slice().primary());
        assert!(used < binary.len());
        assert_eq!(
            binary.to_base64(URL_SAFE),
            slice().to_base64().unwrap()
        );
    }
}
