//! TSID Generator
//!
//! Time-sorted 64-bit identifiers rendered as 13 Crockford Base32
//! characters. Every document id in the desk is a TSID.

use std::sync::atomic::{AtomicU16, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::shared::error::{PlatformError, Result};

/// Crockford Base32 alphabet (excludes I, L, O, U)
const ALPHABET: &[u8] = b"0123456789ABCDEFGHJKMNPQRSTVWXYZ";

const TSID_LEN: usize = 13;

static COUNTER: AtomicU16 = AtomicU16::new(0);

pub struct TsidGenerator;

impl TsidGenerator {
    /// Generate a new TSID, e.g. `0HZXEQ5Y8JY5Z`
    ///
    /// Layout: 42 bits of milliseconds, 10 random bits, 12 counter bits.
    pub fn generate() -> String {
        let now = now_millis();
        let counter = COUNTER.fetch_add(1, Ordering::SeqCst) as u64;
        let random = rand::random::<u16>() as u64 & 0x3FF;

        let tsid = ((now & 0x3FF_FFFF_FFFF) << 22) | (random << 12) | (counter & 0xFFF);
        encode_crockford(tsid)
    }

    pub fn to_long(tsid: &str) -> Option<i64> {
        decode_crockford(tsid).map(|v| v as i64)
    }

    pub fn from_long(value: i64) -> String {
        encode_crockford(value as u64)
    }

    /// Whether `value` is a well-formed TSID (case-insensitive)
    pub fn is_valid(value: &str) -> bool {
        decode_crockford(value).is_some()
    }
}

/// Reject malformed path ids before they reach the database.
pub fn parse_id<'a>(entity_type: &str, value: &'a str) -> Result<&'a str> {
    if TsidGenerator::is_valid(value) {
        Ok(value)
    } else {
        Err(PlatformError::InvalidId {
            entity_type: entity_type.to_string(),
            id: value.to_string(),
        })
    }
}

fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or_default()
}

fn encode_crockford(mut value: u64) -> String {
    let mut result = [b'0'; TSID_LEN];
    for slot in result.iter_mut().rev() {
        *slot = ALPHABET[(value & 0x1F) as usize];
        value >>= 5;
    }
    result.iter().map(|&b| b as char).collect()
}

fn decode_crockford(s: &str) -> Option<u64> {
    if s.len() != TSID_LEN {
        return None;
    }

    let mut result: u64 = 0;
    for (index, c) in s.chars().enumerate() {
        let c = c.to_ascii_uppercase();
        let val = match c {
            '0'..='9' => c as u64 - '0' as u64,
            'A'..='H' => c as u64 - 'A' as u64 + 10,
            'J'..='K' => c as u64 - 'J' as u64 + 18,
            'M'..='N' => c as u64 - 'M' as u64 + 20,
            'P'..='T' => c as u64 - 'P' as u64 + 22,
            'V'..='Z' => c as u64 - 'V' as u64 + 27,
            _ => return None,
        };
        // the leading character only carries the top 4 bits
        if index == 0 && val > 0xF {
            return None;
        }
        result = (result << 5) | val;
    }

    Some(result)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_tsid() {
        let id = TsidGenerator::generate();
        assert_eq!(id.len(), 13);
        assert!(TsidGenerator::is_valid(&id));
    }

    #[test]
    fn test_uniqueness() {
        let mut ids = std::collections::HashSet::new();
        for _ in 0..1000 {
            assert!(ids.insert(TsidGenerator::generate()), "Duplicate TSID generated");
        }
    }

    #[test]
    fn test_round_trip() {
        let id = TsidGenerator::generate();
        let num = TsidGenerator::to_long(&id).unwrap();
        assert_eq!(TsidGenerator::from_long(num), id);
    }

    #[test]
    fn test_sortability() {
        let id1 = TsidGenerator::generate();
        std::thread::sleep(std::time::Duration::from_millis(2));
        let id2 = TsidGenerator::generate();
        assert!(id1 < id2);
    }

    #[test]
    fn test_invalid_ids() {
        assert!(!TsidGenerator::is_valid(""));
        assert!(!TsidGenerator::is_valid("abc"));
        assert!(!TsidGenerator::is_valid("0HZXEQ5Y8JY5ZZ"));
        assert!(!TsidGenerator::is_valid("0HZXEQ5Y8JY5U"));
        assert!(!TsidGenerator::is_valid("ZZZZZZZZZZZZZ"));
        assert!(!TsidGenerator::is_valid("507f1f77bcf86cd799439011"));
        assert!(TsidGenerator::is_valid("0hzxeq5y8jy5z"));
    }

    #[test]
    fn test_parse_id_maps_to_invalid_id_error() {
        assert!(parse_id("Complaint", "0HZXEQ5Y8JY5Z").is_ok());
        assert!(matches!(
            parse_id("Complaint", "not-an-id"),
            Err(PlatformError::InvalidId { .. })
        ));
    }
}
