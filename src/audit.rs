use sea_orm::{ActiveModelTrait, ConnectionTrait, Set};
use sea_orm::ActiveValue::NotSet;
use serde_json::Value;
use uuid::Uuid;

use crate::{entity::audit_logs::ActiveModel as AuditLogActive, store::StoreResult};

pub async fn log_audit<C>(
    conn: &C,
    user_id: Option<Uuid>,
    action: &str,
    resource: Option<&str>,
    metadata: Option<Value>,
) -> StoreResult<()>
where
    C: ConnectionTrait,
{
    AuditLogActive {
        id: Set(Uuid::new_v4()),
        user_id: Set(user_id),
        action: Set(action.to_string()),
        resource: Set(resource.map(str::to_string)),
        metadata: Set(metadata),
        created_at: NotSet,
    }
    .insert(conn)
    .await?;

    Ok(())
}
