// Live oracles, one per session, keyed by an opaque random id.
//
// Each operation takes the lock once and runs to completion under it, so
// the attacker's probe-then-index sequence can't interleave with another
// request against the same oracle.

use crate::{Forgery, ForgeryAttacker, MacError, MacOracle, ObservedPair, RandomSource};

use rand::{rngs::StdRng, SeedableRng};
use serde::{Deserialize, Serialize};

use std::{
    collections::HashMap,
    fmt::Display,
    sync::{Mutex, MutexGuard, PoisonError},
};

const SESSION_ID_LEN: usize = 8;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(String);

impl SessionId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SessionId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

#[derive(Debug)]
struct Sessions<R> {
    oracles: HashMap<SessionId, MacOracle>,
    rng: R,
}

impl<R: RandomSource> Sessions<R> {
    fn oracle_mut(&mut self, id: &SessionId) -> Result<&mut MacOracle, MacError> {
        self.oracles
            .get_mut(id)
            .ok_or_else(|| MacError::UnknownSession(id.to_string()))
    }

    fn fresh_id(&mut self) -> SessionId {
        loop {
            let id = SessionId(self.rng.alphanumeric(SESSION_ID_LEN));
            if !self.oracles.contains_key(&id) {
                return id;
            }
        }
    }
}

/// Every live session's oracle, plus the RNG for ids and attack draws.
///
/// Sessions are only removed by `discard`. Nothing expires them, so a
/// long-running service grows by one oracle per created session.
#[derive(Debug)]
pub struct SessionStore<R = StdRng> {
    sessions: Mutex<Sessions<R>>,
}

impl SessionStore<StdRng> {
    /// A store whose ids and attack draws are reproducible from `seed`.
    pub fn seeded(seed: u64) -> Self {
        Self::new(StdRng::seed_from_u64(seed))
    }

    pub fn from_entropy() -> Self {
        Self::new(StdRng::from_entropy())
    }
}

impl<R: RandomSource> SessionStore<R> {
    pub fn new(rng: R) -> Self {
        Self {
            sessions: Mutex::new(Sessions {
                oracles: HashMap::new(),
                rng,
            }),
        }
    }

    /// Bind a fresh oracle holding `key` to a new session.
    pub fn create(&self, key: &str) -> Result<SessionId, MacError> {
        let oracle = MacOracle::new(key)?;
        let mut sessions = self.lock();
        let id = sessions.fresh_id();
        sessions.oracles.insert(id.clone(), oracle);
        Ok(id)
    }

    /// Run `f` on the session's oracle under the lock.
    pub fn with_oracle<T>(
        &self,
        id: &SessionId,
        f: impl FnOnce(&mut MacOracle) -> T,
    ) -> Result<T, MacError> {
        Ok(f(self.lock().oracle_mut(id)?))
    }

    pub fn tag(&self, id: &SessionId, message: &str) -> Result<String, MacError> {
        self.with_oracle(id, |oracle| oracle.get_tag(message))
    }

    pub fn observed(&self, id: &SessionId) -> Result<Vec<ObservedPair>, MacError> {
        self.with_oracle(id, |oracle| oracle.get_observed().to_vec())
    }

    /// Run `attacker` against the session's oracle, holding the lock for
    /// the whole run.
    pub fn run_forgery(
        &self,
        id: &SessionId,
        attacker: &ForgeryAttacker,
    ) -> Result<Forgery, MacError> {
        let mut sessions = self.lock();
        let Sessions { oracles, rng } = &mut *sessions;
        let oracle = oracles
            .get_mut(id)
            .ok_or_else(|| MacError::UnknownSession(id.to_string()))?;
        attacker.forge(oracle, rng)
    }

    pub fn discard(&self, id: &SessionId) -> Result<(), MacError> {
        self.lock()
            .oracles
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| MacError::UnknownSession(id.to_string()))
    }

    /// A random alphanumeric string, for filling in missing keys and
    /// messages.
    pub fn random_string(&self, len: usize) -> String {
        self.lock().rng.alphanumeric(len)
    }

    pub fn len(&self) -> usize {
        self.lock().oracles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> MutexGuard<'_, Sessions<R>> {
        // Nothing panics while holding the lock, and the map is never left
        // half-updated, so a poisoned lock is still usable.
        self.sessions.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::AttackConfig;

    #[test]
    fn create_returns_distinct_eight_char_ids() {
        let store = SessionStore::seeded(101);

        let id_1 = store.create("key").unwrap();
        let id_2 = store.create("key").unwrap();

        assert_ne!(id_1, id_2);
        assert_eq!(id_1.as_str().len(), 8);
        assert!(id_1.as_str().chars().all(|c| c.is_ascii_alphanumeric()));
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn create_rejects_empty_key() {
        let store = SessionStore::seeded(101);

        assert_eq!(store.create(""), Err(MacError::InvalidKey));
        assert!(store.is_empty());
    }

    #[test]
    fn tag_records_pair_in_session_only() {
        let store = SessionStore::seeded(101);
        let id_1 = store.create("K").unwrap();
        let id_2 = store.create("K").unwrap();

        let tag = store.tag(&id_1, "AAAABBBB").unwrap();

        assert_eq!(tag, "tkkkksjjjj");
        assert_eq!(
            store.observed(&id_1).unwrap(),
            vec![ObservedPair {
                message: "AAAABBBB".to_string(),
                tag,
            }]
        );
        assert!(store.observed(&id_2).unwrap().is_empty());
    }

    #[test]
    fn unknown_session_is_reported() {
        let store = SessionStore::seeded(101);
        let id = SessionId::from("missing1");
        let attacker = ForgeryAttacker::default();

        let expected = MacError::UnknownSession("missing1".to_string());
        assert_eq!(store.tag(&id, "message").unwrap_err(), expected);
        assert_eq!(store.observed(&id).unwrap_err(), expected);
        assert_eq!(store.discard(&id).unwrap_err(), expected);
        assert_eq!(store.run_forgery(&id, &attacker).unwrap_err(), expected);
    }

    #[test]
    fn run_forgery_grows_session_history() {
        let store = SessionStore::seeded(101);
        let id = store.create("secretkey").unwrap();
        store.tag(&id, "helloworld12").unwrap();
        let attacker = ForgeryAttacker::new(AttackConfig::exhaustive());

        let forgery = store.run_forgery(&id, &attacker).unwrap();

        assert_eq!(store.observed(&id).unwrap().len(), 11);
        assert_eq!(forgery.trace.oracle_queries.len(), 10);
    }

    #[test]
    fn discarded_session_is_gone() {
        let store = SessionStore::seeded(101);
        let id = store.create("key").unwrap();

        store.discard(&id).unwrap();

        assert!(store.is_empty());
        assert_eq!(
            store.tag(&id, "message"),
            Err(MacError::UnknownSession(id.to_string()))
        );
    }

    #[test]
    fn sessions_stay_until_discarded() {
        let store = SessionStore::seeded(101);
        let ids: Vec<SessionId> = (0..5).map(|_| store.create("key").unwrap()).collect();
        let attacker = ForgeryAttacker::default();

        store.run_forgery(&ids[0], &attacker).unwrap();
        assert_eq!(store.len(), 5);

        store.discard(&ids[0]).unwrap();
        assert_eq!(store.len(), 4);
        assert!(store.tag(&ids[1], "still here").is_ok());
    }

    #[test]
    fn seeded_stores_are_reproducible() {
        let store_1 = SessionStore::seeded(42);
        let store_2 = SessionStore::seeded(42);

        assert_eq!(store_1.create("k").unwrap(), store_2.create("k").unwrap());
        assert_eq!(store_1.random_string(16), store_2.random_string(16));
    }
}
