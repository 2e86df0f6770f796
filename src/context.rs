//! # Call context attached to every outgoing request.
//!
//! [`CallContext`] carries routing/identity metadata (tenant, actor role, preview flag).
//! The core never mutates it; [`CallContext::headers`] renders it as transport headers.
//!
//! ```rust
//! use copilot_core::{ActorRole, CallContext};
//!
//! let ctx = CallContext::new("acme", ActorRole::Agent, true).unwrap();
//! let headers = ctx.headers();
//! assert_eq!(headers["x-tenant-id"], "acme");
//! assert_eq!(headers["x-actor-role"], "agent");
//! assert_eq!(headers["x-preview"], "true");
//! ```

use std::fmt;
use std::sync::Arc;

use reqwest::header::{HeaderMap, HeaderName, HeaderValue};

use crate::error::ContextError;

/// Header carrying the tenant identifier.
pub const TENANT_HEADER: &str = "x-tenant-id";
/// Header carrying the actor role.
pub const ROLE_HEADER: &str = "x-actor-role";
/// Header carrying the preview (non-mutating) flag.
pub const PREVIEW_HEADER: &str = "x-preview";

/// Role of the acting user. Open set: unknown roles round-trip through `Other`.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum ActorRole {
    Admin,
    Manager,
    Agent,
    Viewer,
    Other(Arc<str>),
}

impl ActorRole {
    /// Parses a role name case-insensitively.
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "admin" => ActorRole::Admin,
            "manager" => ActorRole::Manager,
            "agent" => ActorRole::Agent,
            "viewer" => ActorRole::Viewer,
            _ => ActorRole::Other(Arc::from(raw.trim())),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            ActorRole::Admin => "admin",
            ActorRole::Manager => "manager",
            ActorRole::Agent => "agent",
            ActorRole::Viewer => "viewer",
            ActorRole::Other(s) => s,
        }
    }
}

impl fmt::Display for ActorRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Immutable routing/identity metadata for a call.
///
/// Cheap to clone (tenant is `Arc`-backed).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CallContext {
    tenant: Arc<str>,
    role: ActorRole,
    preview: bool,
}

impl CallContext {
    /// Creates a context; the tenant must be non-empty.
    pub fn new(
        tenant: impl AsRef<str>,
        role: ActorRole,
        preview: bool,
    ) -> Result<Self, ContextError> {
        let tenant = tenant.as_ref().trim();
        if tenant.is_empty() {
            return Err(ContextError::EmptyTenant);
        }
        Ok(Self {
            tenant: Arc::from(tenant),
            role,
            preview,
        })
    }

    pub fn tenant(&self) -> &str {
        &self.tenant
    }

    pub fn role(&self) -> &ActorRole {
        &self.role
    }

    /// True when calls must run in non-mutating simulation mode.
    pub fn preview(&self) -> bool {
        self.preview
    }

    /// Renders the context as request headers.
    ///
    /// Values that are not valid header text (e.g. a role with control
    /// characters) are skipped with a warning rather than failing the call.
    pub fn headers(&self) -> HeaderMap {
        let mut map = HeaderMap::with_capacity(3);
        let pairs = [
            (TENANT_HEADER, self.tenant()),
            (ROLE_HEADER, self.role.as_str()),
            (PREVIEW_HEADER, if self.preview { "true" } else { "false" }),
        ];
        for (name, value) in pairs {
            match HeaderValue::from_str(value) {
                Ok(v) => {
                    map.insert(HeaderName::from_static(name), v);
                }
                Err(_) => {
                    tracing::warn!(header = name, "skipping context header with invalid value");
                }
            }
        }
        map
    }
}
