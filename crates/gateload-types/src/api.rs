//! Wire payloads exchanged with the gateway.
//!
//! Only the fields the scenarios send or read are modelled; responses ignore
//! everything else.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque identifier returned by the API (numeric today, string tolerated).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ResourceId {
    Int(i64),
    Str(String),
}

impl ResourceId {
    /// Reads an id out of a JSON value. Empty strings and non-scalar values are rejected.
    pub fn from_json(value: &serde_json::Value) -> Option<ResourceId> {
        match value {
            serde_json::Value::Number(n) => n.as_i64().map(ResourceId::Int),
            serde_json::Value::String(s) if !s.is_empty() => Some(ResourceId::Str(s.clone())),
            _ => None,
        }
    }
}

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResourceId::Int(id) => write!(f, "{id}"),
            ResourceId::Str(id) => f.write_str(id),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CreateUserPayload {
    pub telegram_id: u64,
    pub login: String,
    pub password: String,
    pub email: String,
}

impl CreateUserPayload {
    /// Email is derived from the login, `<login>@example.com`.
    pub fn new(telegram_id: u64, login: impl Into<String>, password: impl Into<String>) -> Self {
        let login = login.into();
        let email = format!("{login}@example.com");
        Self {
            telegram_id,
            login,
            password: password.into(),
            email,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LoginPayload {
    pub login: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PatchUserPayload {
    pub email: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BusinessPayload {
    pub name: String,
    pub description: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ReportPayload {
    pub name: String,
    pub user_id: ResourceId,
    pub users: u64,
    pub customers: u64,
    pub avp: f64,
    pub apc: u64,
    pub tms: f64,
    pub cogs: f64,
    pub cogs1s: f64,
    pub fc: f64,
    pub rr: f64,
    pub agr: f64,
}

impl ReportPayload {
    /// The fixed unit economics every scenario submits; only `users` varies.
    pub fn sample(name: impl Into<String>, user_id: ResourceId, users: u64) -> Self {
        Self {
            name: name.into(),
            user_id,
            users,
            customers: 10,
            avp: 150.5,
            apc: 2,
            tms: 50000.0,
            cogs: 10000.0,
            cogs1s: 5000.0,
            fc: 20000.0,
            rr: 0.8,
            agr: 0.1,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct ChatContext {
    pub history: Vec<ChatMessage>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChatPayload {
    pub text: String,
    pub context: ChatContext,
}

impl ChatPayload {
    pub fn question(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            context: ChatContext::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChatResponse {
    #[serde(default)]
    pub response: String,
}
