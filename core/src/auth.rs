//! Query signing collaborator.
//!
//! The client hands the endpoint path and its unsigned parameters to an
//! [`AuthQuery`] and sends whatever query string comes back. Errors from the
//! signer reach the caller unchanged and no request is sent.

use crate::error::RoadsError;
use crate::http::QueryParams;

/// Produces the final, authenticated query string for a request.
pub trait AuthQuery: Send + Sync {
    fn generate_auth_query(
        &self,
        path: &str,
        query: QueryParams,
        is_post: bool,
    ) -> Result<String, RoadsError>;
}

/// Authenticates with a plain API key sent as `key=`.
#[derive(Debug, Clone)]
pub struct ApiKeyAuth {
    api_key: String,
}

impl ApiKeyAuth {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
        }
    }
}

impl AuthQuery for ApiKeyAuth {
    fn generate_auth_query(
        &self,
        _path: &str,
        mut query: QueryParams,
        _is_post: bool,
    ) -> Result<String, RoadsError> {
        if self.api_key.is_empty() {
            return Err(RoadsError::Auth("missing API key".to_string()));
        }
        query.set("key", self.api_key.as_str());
        Ok(query.encode())
    }
}
