pub mod api;
mod client;
mod error;
mod forgery;
mod mac;
mod oracle;
mod prf;
mod random;
pub mod server;
mod session;

pub use client::MacClient;
pub use error::{ClientError, MacError};
pub use forgery::{
    AttackConfig, AttackTrace, ChosenMessages, Forgery, ForgeryAttacker, ForgeryExplanation,
    OracleQuery,
};
pub use mac::{mac, split_message, split_point, split_tag, verify};
pub use oracle::{MacOracle, ObservedPair};
pub use prf::pseudorandom_function;
pub use random::RandomSource;
pub use server::{spawn_server, MacService};
pub use session::{SessionId, SessionStore};
