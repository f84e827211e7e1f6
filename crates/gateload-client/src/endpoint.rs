//! Gateway routes exercised by the scenarios.

use gateload_types::api::ResourceId;
use reqwest::Method;
use serde::Serialize;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Endpoint {
    /// `GET /` liveness probe.
    Health,
    CreateUser,
    Login,
    ListUsers,
    GetUser(ResourceId),
    PatchUser(ResourceId),
    DeleteUser(ResourceId),
    /// Adds a business to the given user.
    AddBusiness(ResourceId),
    GetBusiness(ResourceId),
    DeleteBusiness(ResourceId),
    CreateReport,
    GetReport(ResourceId),
    DeleteReport(ResourceId),
    GenerateResponse,
}

impl Endpoint {
    pub fn method(&self) -> Method {
        match self {
            Endpoint::Health
            | Endpoint::ListUsers
            | Endpoint::GetUser(_)
            | Endpoint::GetBusiness(_)
            | Endpoint::GetReport(_) => Method::GET,
            Endpoint::CreateUser
            | Endpoint::Login
            | Endpoint::AddBusiness(_)
            | Endpoint::CreateReport
            | Endpoint::GenerateResponse => Method::POST,
            Endpoint::PatchUser(_) => Method::PATCH,
            Endpoint::DeleteUser(_) | Endpoint::DeleteBusiness(_) | Endpoint::DeleteReport(_) => {
                Method::DELETE
            }
        }
    }

    pub fn path(&self) -> String {
        match self {
            Endpoint::Health => "/".to_string(),
            Endpoint::CreateUser | Endpoint::ListUsers => "/api/users/users".to_string(),
            Endpoint::Login => "/login".to_string(),
            Endpoint::GetUser(id) | Endpoint::PatchUser(id) | Endpoint::DeleteUser(id) => {
                format!("/api/users/users/{id}")
            }
            Endpoint::AddBusiness(user) => format!("/api/users/users/{user}/businesses"),
            Endpoint::GetBusiness(id) | Endpoint::DeleteBusiness(id) => {
                format!("/api/users/businesses/{id}")
            }
            Endpoint::CreateReport => "/api/users/reports".to_string(),
            Endpoint::GetReport(id) | Endpoint::DeleteReport(id) => {
                format!("/api/users/reports/{id}")
            }
            Endpoint::GenerateResponse => "/models/chat/generate_response".to_string(),
        }
    }

    /// Stable `name` tag for metrics; ids are never part of it.
    pub fn tag(&self) -> &'static str {
        match self {
            Endpoint::Health => "Health",
            Endpoint::CreateUser => "CreateUser",
            Endpoint::Login => "LoginUser",
            Endpoint::ListUsers => "ListUsers",
            Endpoint::GetUser(_) => "GetUser",
            Endpoint::PatchUser(_) => "PatchUser",
            Endpoint::DeleteUser(_) => "DeleteUser",
            Endpoint::AddBusiness(_) => "AddBusiness",
            Endpoint::GetBusiness(_) => "GetBusiness",
            Endpoint::DeleteBusiness(_) => "DeleteBusiness",
            Endpoint::CreateReport => "CreateReport",
            Endpoint::GetReport(_) => "GetReport",
            Endpoint::DeleteReport(_) => "DeleteReport",
            Endpoint::GenerateResponse => "GenerateResponse",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Auth {
    None,
    /// `X-Bot-Key: <key>`
    BotKey(String),
    /// `Authorization: Bearer <token>`
    Bearer(String),
}

#[derive(Debug, Clone)]
pub struct ApiRequest {
    pub endpoint: Endpoint,
    pub auth: Auth,
    pub body: Option<serde_json::Value>,

    /// Overrides the client's default timeout for this request only.
    pub timeout: Option<Duration>,
}

impl ApiRequest {
    pub fn new(endpoint: Endpoint) -> Self {
        Self {
            endpoint,
            auth: Auth::None,
            body: None,
            timeout: None,
        }
    }

    pub fn json<T: Serialize>(mut self, body: &T) -> Result<Self, serde_json::Error> {
        self.body = Some(serde_json::to_value(body)?);
        Ok(self)
    }

    pub fn bearer(mut self, token: impl Into<String>) -> Self {
        self.auth = Auth::Bearer(token.into());
        self
    }

    pub fn bot_key(mut self, key: impl Into<String>) -> Self {
        self.auth = Auth::BotKey(key.into());
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn tag(&self) -> &'static str {
        self.endpoint.tag()
    }
}
