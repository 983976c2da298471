use admission_core_types::UserIdentity;
use admission_errors::codes;
use async_trait::async_trait;

use crate::context::ProtoRequest;
use crate::errors::InterceptError;

/// Upstream authentication collaborator: turns request credentials into a caller identity.
#[async_trait]
pub trait IdentityResolver: Send + Sync {
    async fn resolve(
        &self,
        req: &mut dyn ProtoRequest,
    ) -> Result<Option<UserIdentity>, InterceptError>;
}

/// Reads an identity asserted by an authenticating proxy in front of the gateway.
///
/// Tokens are not verified here; only deploy behind a proxy that strips these headers from
/// client traffic.
#[derive(Clone, Debug)]
pub struct TrustedHeaderResolver {
    pub user_id_header: String,
    pub username_header: String,
    pub email_header: String,
    pub tenant_header: String,
    pub roles_header: String,
    /// Reject requests that carry an `Authorization` header but no asserted identity.
    pub require_identity_with_token: bool,
}

impl Default for TrustedHeaderResolver {
    fn default() -> Self {
        Self {
            user_id_header: "X-Auth-User-Id".into(),
            username_header: "X-Auth-Username".into(),
            email_header: "X-Auth-Email".into(),
            tenant_header: "X-Auth-Tenant-Id".into(),
            roles_header: "X-Auth-Roles".into(),
            require_identity_with_token: false,
        }
    }
}

#[async_trait]
impl IdentityResolver for TrustedHeaderResolver {
    async fn resolve(
        &self,
        req: &mut dyn ProtoRequest,
    ) -> Result<Option<UserIdentity>, InterceptError> {
        let user_id = req
            .header(&self.user_id_header)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty());
        let Some(user_id) = user_id else {
            if self.require_identity_with_token && req.header("Authorization").is_some() {
                return Err(InterceptError::from_public(
                    codes::TOKEN_INVALID,
                    "The access token could not be verified.",
                ));
            }
            return Ok(None);
        };

        let roles = req
            .header(&self.roles_header)
            .map(|raw| {
                raw.split(',')
                    .map(str::trim)
                    .filter(|r| !r.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();
        Ok(Some(UserIdentity {
            user_id,
            username: req.header(&self.username_header),
            email: req.header(&self.email_header),
            tenant_id: req.header(&self.tenant_header),
            roles,
        }))
    }
}
