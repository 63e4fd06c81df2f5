//! Discord ids (snowflakes) are u64, sent as decimal strings in JSON, and
//! stored bit-cast to i64 because `SQLite` does not support u64 integers.

use serde::Serializer;

/// Bit-cast u64 (id in Discord API) to i64 (stored in the `SQLite` database).
pub const fn to_i64(unsigned: u64) -> i64 {
    let bit_cast = unsigned.to_be_bytes();
    i64::from_be_bytes(bit_cast)
}

/// Bit-cast i64 (stored in `SQLite` database) to u64 (id in Discord API).
pub const fn from_i64(signed: i64) -> u64 {
    let bit_cast = signed.to_be_bytes();
    u64::from_be_bytes(bit_cast)
}

/// Parse a decimal id, ignoring surrounding whitespace.
pub fn parse(id: &str) -> Option<u64> {
    id.trim().parse().ok()
}

pub fn serialize<S: Serializer>(id: &u64, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.collect_str(id)
}

pub fn serialize_opt<S: Serializer>(id: &Option<u64>, serializer: S) -> Result<S::Ok, S::Error> {
    match id {
        Some(id) => serializer.collect_str(id),
        None => serializer.serialize_none(),
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn bit_cast_keeps_large_ids() {
        let id = u64::MAX - 42;
        let stored = to_i64(id);

        assert!(stored < 0);
        assert_eq!(from_i64(stored), id);
    }

    #[test]
    fn parse_ids() {
        assert_eq!(parse("1234567890123456789"), Some(1_234_567_890_123_456_789));
        assert_eq!(parse(" 42 "), Some(42));
        assert_eq!(parse("-1"), None);
        assert_eq!(parse("abc"), None);
        assert_eq!(parse(""), None);
    }
}
