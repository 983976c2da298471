use async_trait::async_trait;

use crate::context::{InterceptContext, ProtoRequest, ProtoResponse};
use crate::errors::InterceptError;
use crate::stages::{Stage, StageKind, StageOutcome};

pub const USER_ID: &str = "X-User-Id";
pub const USERNAME: &str = "X-Username";
pub const USER_EMAIL: &str = "X-User-Email";
pub const TENANT_ID: &str = "X-Tenant-Id";
pub const USER_ROLES: &str = "X-User-Roles";

const ALL: [&str; 5] = [USER_ID, USERNAME, USER_EMAIL, TENANT_ID, USER_ROLES];

/// Forwards the resolved caller identity as headers; client-supplied copies are dropped first.
#[derive(Default)]
pub struct UserContextStage;

#[async_trait]
impl Stage for UserContextStage {
    fn kind(&self) -> StageKind {
        StageKind::UserContext
    }

    async fn handle(
        &self,
        cx: &mut InterceptContext,
        req: &mut dyn ProtoRequest,
        _rsp: &mut dyn ProtoResponse,
    ) -> Result<StageOutcome, InterceptError> {
        for name in ALL {
            req.remove_header(name);
        }
        let Some(identity) = cx.identity.clone() else {
            return Ok(StageOutcome::Continue);
        };

        let mut forwarded = vec![(USER_ID, identity.user_id)];
        forwarded.extend(identity.username.map(|v| (USERNAME, v)));
        forwarded.extend(identity.email.map(|v| (USER_EMAIL, v)));
        forwarded.extend(identity.tenant_id.map(|v| (TENANT_ID, v)));
        if !identity.roles.is_empty() {
            forwarded.push((USER_ROLES, identity.roles.join(",")));
        }

        for (name, value) in forwarded {
            req.insert_header(name, &value);
            cx.forward_headers.insert(name.to_string(), value);
        }
        Ok(StageOutcome::Continue)
    }
}
