use crate::{mac, verify, MacError};

use serde::Serialize;

/// A message and the tag the oracle produced for it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ObservedPair {
    pub message: String,
    pub tag: String,
}

/// An honest key holder that tags and verifies messages on request.
///
/// Every tagging request is recorded, in order, as an observed pair.
/// Verification requests are not.
#[derive(Debug, Clone)]
pub struct MacOracle {
    key: String,
    observed: Vec<ObservedPair>,
}

impl MacOracle {
    pub fn new(key: &str) -> Result<Self, MacError> {
        if key.is_empty() {
            return Err(MacError::InvalidKey);
        }
        Ok(Self {
            key: key.to_string(),
            observed: Vec::new(),
        })
    }

    pub fn get_tag(&mut self, message: &str) -> String {
        let tag = self.mac_message(message);
        self.observed.push(ObservedPair {
            message: message.to_string(),
            tag: tag.clone(),
        });
        tag
    }

    pub fn verify(&self, message: &str, tag: &str) -> bool {
        // The key was checked in `new`, so verification can't fail.
        verify(&self.key, message, tag).unwrap_or(false)
    }

    pub fn get_observed(&self) -> &[ObservedPair] {
        &self.observed
    }

    /// Whether `message` was ever submitted for tagging.
    pub fn has_tagged(&self, message: &str) -> bool {
        self.observed.iter().any(|pair| pair.message == message)
    }

    fn mac_message(&self, message: &str) -> String {
        // Same as in `verify`: the key is non-empty.
        mac(&self.key, message).unwrap_or_default()
    }
}
