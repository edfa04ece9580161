// A keyed "pseudorandom" function that is nothing of the sort.
//
// Each output character is the XOR of a message code point with the code
// point of the key at the same position, reduced mod 26 onto 'a'..='z'.
// The key is repeated end-to-end when it is shorter than the message.
// Anyone holding the key can invert it, and anyone holding one output can
// learn a lot about the key, which is what makes the MAC built on top of it
// breakable.

use crate::MacError;

const ALPHABET_SIZE: u32 = 26;

/// Apply `F_k` to `message`, producing one char of `'a'..='z'` per char of
/// the message.
pub fn pseudorandom_function(key: &str, message: &str) -> Result<String, MacError> {
    if key.is_empty() {
        return Err(MacError::InvalidKey);
    }
    Ok(message
        .chars()
        .zip(key.chars().cycle())
        .map(|(m, k)| substitute(k, m))
        .collect())
}

fn substitute(key_char: char, message_char: char) -> char {
    let combined = (key_char as u32 ^ message_char as u32) % ALPHABET_SIZE;
    // `combined` is always below 26, so this can't leave the alphabet.
    (b'a' + combined as u8) as char
}
