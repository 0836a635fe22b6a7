use crate::{constants::SHORT_LINK_PREFIX, schema::Uuid};

const ALPHABET: &[u8; 62] = b"0123456789abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ";

/// Base-62 code for a recipe id. Negative ids have no code.
pub fn encode(id: Uuid) -> Option<String> {
    if id < 0 {
        return None;
    }

    let mut value = id as u64;
    let mut digits = Vec::new();
    loop {
        digits.push(ALPHABET[(value % 62) as usize]);
        value /= 62;
        if value == 0 {
            break;
        }
    }
    digits.reverse();

    String::from_utf8(digits).ok()
}

pub fn decode(code: &str) -> Option<Uuid> {
    if code.is_empty() {
        return None;
    }

    code.bytes().try_fold(0 as Uuid, |acc, byte| {
        let digit = ALPHABET.iter().position(|c| *c == byte)? as Uuid;
        acc.checked_mul(62)?.checked_add(digit)
    })
}

/// Absolute short link for a recipe, e.g. `https://host/s/1C`.
pub fn short_link(base_url: &str, id: Uuid) -> Option<String> {
    let code = encode(id)?;
    Some(format!(
        "{}/{SHORT_LINK_PREFIX}/{code}",
        base_url.trim_end_matches('/')
    ))
}
