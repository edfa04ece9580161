//! JSON bodies exchanged between the MAC service and its clients.
//!
//! Missing string fields in requests default to empty, which the service
//! treats as "not provided".

use crate::{AttackTrace, SessionId};

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerateTagRequest {
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub key: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerateTagResponse {
    pub message: String,
    pub key: String,
    pub tag: String,
    pub session_id: SessionId,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagRequest {
    pub session_id: SessionId,
    #[serde(default)]
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagResponse {
    pub message: String,
    pub tag: String,
    /// Number of pairs the session's oracle has tagged so far.
    pub observed: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerifyTagRequest {
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub key: String,
    #[serde(default)]
    pub tag: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerifyTagResponse {
    pub is_valid: bool,
    pub computed_tag: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunForgeryRequest {
    pub session_id: SessionId,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunForgeryResponse {
    pub forged_message: String,
    pub forged_tag: String,
    pub success: bool,
    pub attack_steps: AttackTrace,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusResponse {
    pub status: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}
