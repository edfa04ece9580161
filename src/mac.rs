// The split MAC.
//
// A message is cut at its midpoint and each half is run through F_k on its
// own, behind a one-char domain separator:
//
//   MAC(k, m) = F_k('0' || m[..mid]) || F_k('1' || m[mid..])
//
// The separator stops a first half being passed off as a second half, but
// nothing ties the two halves of one message together. Under a fixed key,
// the first sub-tag of any message is valid next to the second sub-tag of
// any other message, see `forgery`.

use crate::{pseudorandom_function, MacError};

const FIRST_HALF_PREFIX: char = '0';
const SECOND_HALF_PREFIX: char = '1';

/// Compute the tag of `message` under `key`.
///
/// The tag has two more chars than the message, one for each domain
/// separator.
pub fn mac(key: &str, message: &str) -> Result<String, MacError> {
    let (m0, m1) = split_message(message);
    let t0 = pseudorandom_function(key, &prefixed(FIRST_HALF_PREFIX, m0))?;
    let t1 = pseudorandom_function(key, &prefixed(SECOND_HALF_PREFIX, m1))?;
    Ok(t0 + &t1)
}

/// Check `tag` against a freshly computed MAC of `message`.
///
/// The comparison is plain string equality and not constant time.
pub fn verify(key: &str, message: &str, tag: &str) -> Result<bool, MacError> {
    Ok(mac(key, message)? == tag)
}

/// The split point of a message, counted in chars.
pub fn split_point(message: &str) -> usize {
    message.chars().count() / 2
}

/// Cut a message into the two halves that are tagged independently.
pub fn split_message(message: &str) -> (&str, &str) {
    split_at_char(message, split_point(message))
}

/// Cut a tag of `message` into its two sub-tags.
///
/// The first sub-tag covers the separator plus the first half, so the cut
/// falls one char after the message's own split point.
pub fn split_tag<'a>(message: &str, tag: &'a str) -> (&'a str, &'a str) {
    split_at_char(tag, split_point(message) + 1)
}

/// Split `s` after its first `n` chars, or at the end if it is shorter.
pub(crate) fn split_at_char(s: &str, n: usize) -> (&str, &str) {
    let index = s.char_indices().nth(n).map_or(s.len(), |(i, _)| i);
    s.split_at(index)
}

fn prefixed(prefix: char, half: &str) -> String {
    let mut s = String::with_capacity(half.len() + 1);
    s.push(prefix);
    s.push_str(half);
    s
}
