use xxhash_rust::xxh64::xxh64;

const BASE62_CHARS: &[u8] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz";

/// Encode a u64 value as a base62 string (11 chars, zero-padded).
fn base62_encode(mut value: u64) -> String {
    let mut result = [b'0'; 11];
    let mut idx = result.len();
    while value > 0 && idx > 0 {
        idx -= 1;
        result[idx] = BASE62_CHARS[(value % 62) as usize];
        value /= 62;
    }
    result.iter().map(|&b| b as char).collect()
}

/// Digest of a canonical form or file body: base62(xxhash64(text)).
///
/// Used to report whether two canonical serializations are identical
/// without printing either one.
pub fn digest(text: &str) -> String {
    base62_encode(xxh64(text.as_bytes(), 0))
}

/// Digest of several parts joined with NUL separators, so that
/// `("ab", "c")` and `("a", "bc")` never collide trivially.
pub fn digest_parts(parts: &[&str]) -> String {
    let cap = parts.iter().map(|p| p.len() + 1).sum();
    let mut input = String::with_capacity(cap);
    for (i, part) in parts.iter().enumerate() {
        if i > 0 {
            input.push('\0');
        }
        input.push_str(part);
    }
    digest(&input)
}
