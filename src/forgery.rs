// Cut-and-splice forgery against the split MAC.
//
// The MAC tags the two halves of a message independently, so the first
// half of one tagged message and the second half of another can be glued
// together, along with the matching pieces of their tags, into a pair the
// oracle never produced.
//
// The attack below cuts the tags at the *message* split point, not at the
// sub-tag boundary one char later. The char straddling the boundary comes
// from the second message's first sub-tag, so the splice only verifies when
// that char happens to agree with the first message's. Success is
// therefore probabilistic for randomly drawn messages. Cutting at
// `split_tag` instead would make it succeed every time for equal-length
// messages.

use crate::{mac::split_at_char, split_point, MacError, MacOracle, ObservedPair, RandomSource};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

const DEFAULT_QUERIES: usize = 5;
const EXHAUSTIVE_QUERIES: usize = 10;
const DEFAULT_PROBE_LEN: usize = 16;
const MIN_HISTORY: usize = 2;

const SPLICE_DESCRIPTION: &str = "The attack combines the first half of message 1 with the \
    second half of message 2, and similarly combines their tags.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttackConfig {
    /// Number of random probe messages to get tagged before splicing.
    pub queries: usize,
    /// Length, in chars, of each probe message.
    pub probe_len: usize,
}

impl AttackConfig {
    /// Probe more heavily, giving a larger pool of pairs to splice from.
    pub fn exhaustive() -> Self {
        Self {
            queries: EXHAUSTIVE_QUERIES,
            ..Self::default()
        }
    }
}

impl Default for AttackConfig {
    fn default() -> Self {
        Self {
            queries: DEFAULT_QUERIES,
            probe_len: DEFAULT_PROBE_LEN,
        }
    }
}

/// One probe the attacker sent to the oracle. Steps count from 1.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OracleQuery {
    pub step: usize,
    pub message: String,
    pub tag: String,
}

/// The two observed pairs that were spliced, and the pieces taken from each.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChosenMessages {
    pub message1: String,
    pub tag1: String,
    pub message2: String,
    pub tag2: String,
    pub m0a: String,
    pub m1b: String,
    pub t0a: String,
    pub t1b: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForgeryExplanation {
    pub description: String,
    pub forged_message: String,
    pub forged_tag: String,
    pub verification: bool,
}

/// Everything the attacker did during one run, in the order it did it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttackTrace {
    pub oracle_queries: Vec<OracleQuery>,
    pub chosen_messages: ChosenMessages,
    pub forgery_explanation: ForgeryExplanation,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Forgery {
    pub message: String,
    pub tag: String,
    pub success: bool,
    pub trace: AttackTrace,
}

impl Forgery {
    /// A valid forgery on a message the oracle was never asked to tag.
    pub fn is_existential_forgery(&self, oracle: &MacOracle) -> bool {
        self.success && !oracle.has_tagged(&self.message)
    }
}

#[derive(Debug, Clone, Default)]
pub struct ForgeryAttacker {
    config: AttackConfig,
}

impl ForgeryAttacker {
    pub fn new(config: AttackConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &AttackConfig {
        &self.config
    }

    /// Probe the oracle, splice two of its observed pairs and ask it to
    /// verify the result.
    ///
    /// Fails without touching the oracle if probing would still leave fewer
    /// than two pairs to choose from.
    pub fn forge<R: RandomSource + ?Sized>(
        &self,
        oracle: &mut MacOracle,
        rng: &mut R,
    ) -> Result<Forgery, MacError> {
        let observed = oracle.get_observed().len() + self.config.queries;
        if observed < MIN_HISTORY {
            return Err(MacError::InsufficientHistory { observed });
        }

        let oracle_queries = self.probe(oracle, rng);

        let history = oracle.get_observed();
        let (index1, index2) = choose_distinct_indices(history.len(), rng);
        debug!(
            history = history.len(),
            index1, index2, "chose observed pairs to splice"
        );
        let chosen_messages = splice(&history[index1], &history[index2]);

        let forged_message = format!("{}{}", chosen_messages.m0a, chosen_messages.m1b);
        let forged_tag = format!("{}{}", chosen_messages.t0a, chosen_messages.t1b);
        let success = oracle.verify(&forged_message, &forged_tag);
        info!(%forged_message, %forged_tag, success, "forgery verified by oracle");

        let forgery_explanation = ForgeryExplanation {
            description: SPLICE_DESCRIPTION.to_string(),
            forged_message: forged_message.clone(),
            forged_tag: forged_tag.clone(),
            verification: success,
        };
        Ok(Forgery {
            message: forged_message,
            tag: forged_tag,
            success,
            trace: AttackTrace {
                oracle_queries,
                chosen_messages,
                forgery_explanation,
            },
        })
    }

    fn probe<R: RandomSource + ?Sized>(
        &self,
        oracle: &mut MacOracle,
        rng: &mut R,
    ) -> Vec<OracleQuery> {
        (1..=self.config.queries)
            .map(|step| {
                let message = rng.alphanumeric(self.config.probe_len);
                let tag = oracle.get_tag(&message);
                debug!(step, %message, %tag, "oracle query");
                OracleQuery { step, message, tag }
            })
            .collect()
    }
}

/// Pick `i != j` uniformly from `0..n`, with `n >= 2`.
fn choose_distinct_indices<R: RandomSource + ?Sized>(n: usize, rng: &mut R) -> (usize, usize) {
    let i = rng.index_below(n);
    let mut j = rng.index_below(n - 1);
    if j >= i {
        j += 1;
    }
    (i, j)
}

/// Take the first halves from `first` and the second halves from `second`.
///
/// Both message and tag are cut at the message's split point.
fn splice(first: &ObservedPair, second: &ObservedPair) -> ChosenMessages {
    let mid1 = split_point(&first.message);
    let mid2 = split_point(&second.message);
    let (m0a, _) = split_at_char(&first.message, mid1);
    let (t0a, _) = split_at_char(&first.tag, mid1);
    let (_, m1b) = split_at_char(&second.message, mid2);
    let (_, t1b) = split_at_char(&second.tag, mid2);
    ChosenMessages {
        message1: first.message.clone(),
        tag1: first.tag.clone(),
        message2: second.message.clone(),
        tag2: second.tag.clone(),
        m0a: m0a.to_string(),
        m1b: m1b.to_string(),
        t0a: t0a.to_string(),
        t1b: t1b.to_string(),
    }
}
