use sea_orm::ActiveValue::NotSet;
use sea_orm::{ActiveModelTrait, Set};
use serde_json::Value;
use uuid::Uuid;

use crate::{db::OrmConn, entity::audit_logs, error::AppResult};

/// Append an audit row. Callers treat failures as best-effort: a broken audit
/// trail must never fail the request it describes.
pub async fn log_audit(
    orm: &OrmConn,
    user_id: Option<Uuid>,
    action: &str,
    resource: Option<&str>,
    metadata: Option<Value>,
) -> AppResult<()> {
    audit_logs::ActiveModel {
        id: Set(Uuid::new_v4()),
        user_id: Set(user_id),
        action: Set(action.to_string()),
        resource: Set(resource.map(str::to_string)),
        metadata: Set(metadata),
        created_at: NotSet,
    }
    .insert(orm)
    .await?;

    Ok(())
}
