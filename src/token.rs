//! Reversible access tokens.
//!
//! Accesses are value objects computed on the fly, yet they are useful to
//! pass around; a (satellite, groundstation, midpoint) triple is enough to
//! recompute one. The triple is run through AES-CFB with a fixed embedded
//! key and IV so tokens look visually distinct to operators, then encoded
//! url-safe base64. This is opacity, **not** confidentiality: anyone with
//! this code can decode any token, and no access-control property depends
//! on it.

use aes::cipher::{AsyncStreamCipher, KeyIvInit};
use aes::Aes128;
use base64::engine::general_purpose::URL_SAFE;
use base64::Engine;
use chrono::{DateTime, Datelike, TimeZone, Utc};

use crate::error::{Error, Result};

const KEY: &[u8; 16] = b"bananasinpajamas";
const IV: &[u8; 16] = b"banana1orbanana2";

type Encryptor = cfb_mode::Encryptor<Aes128>;
type Decryptor = cfb_mode::Decryptor<Aes128>;

/// Encodes `(satellite, groundstation, midpoint)` into a compact url-safe
/// token and back. The timestamp is carried as a two-digit year (plus a
/// fixed 2000 offset), capping validity to years 2000 through 2099, and is
/// truncated to whole seconds.
#[derive(Debug, Clone, Copy, Default)]
pub struct AccessIdCodec {
    _priv: (),
}

impl AccessIdCodec {
    pub fn new() -> Self {
        AccessIdCodec { _priv: () }
    }

    pub fn encode(&self, sat_hwid: &str, gs_hwid: &str, time: DateTime<Utc>) -> Result<String> {
        for hwid in [sat_hwid, gs_hwid] {
            if hwid.contains('|') {
                return Err(Error::validation("hwid", "must not contain '|'"));
            }
        }
        let year = time.year();
        if !(2000..=2099).contains(&year) {
            return Err(Error::validation(
                "time",
                format!("year {year} outside the encodable range 2000-2099"),
            ));
        }

        let stamp = time.format("%y%m%d%H%M%S").to_string();
        let mut buf = format!("{sat_hwid}|{gs_hwid}|{stamp}").into_bytes();
        Encryptor::new(KEY.into(), IV.into()).encrypt(&mut buf);
        Ok(URL_SAFE.encode(buf))
    }

    pub fn decode(&self, token: &str) -> Result<(String, String, DateTime<Utc>)> {
        let mut buf = URL_SAFE
            .decode(token)
            .map_err(|e| Error::validation("access id", e.to_string()))?;
        Decryptor::new(KEY.into(), IV.into()).decrypt(&mut buf);
        let text = String::from_utf8(buf)
            .map_err(|_| Error::validation("access id", "token does not decode to text"))?;

        let Some((rest, stamp)) = text.rsplit_once('|') else {
            return Err(Error::validation("access id", "malformed token"));
        };
        let Some((sat_hwid, gs_hwid)) = rest.split_once('|') else {
            return Err(Error::validation("access id", "malformed token"));
        };

        let time = parse_stamp(stamp)?;
        Ok((sat_hwid.to_string(), gs_hwid.to_string(), time))
    }
}

/// Parse a `yymmddHHMMSS` stamp, adding the fixed 2000-year offset back.
/// Deliberately not chrono's `%y`, whose pivot splits at 1969/2068.
fn parse_stamp(stamp: &str) -> Result<DateTime<Utc>> {
    if stamp.len() != 12 || !stamp.bytes().all(|b| b.is_ascii_digit()) {
        return Err(Error::validation("access id", "malformed timestamp"));
    }
    let field = |i: usize| -> u32 {
        stamp[i..i + 2].parse().unwrap_or(0)
    };
    let (yy, month, day) = (field(0), field(2), field(4));
    let (hour, minute, second) = (field(6), field(8), field(10));
    Utc.with_ymd_and_hms(2000 + yy as i32, month, day, hour, minute, second)
        .single()
        .ok_or_else(|| Error::validation("access id", format!("invalid timestamp {stamp}")))
}
