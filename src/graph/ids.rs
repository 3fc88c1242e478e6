use chrono::Utc;
use uuid::Uuid;

/// Source of globally unique node identifiers.
pub trait IdIssuer: Send + Sync {
    fn mint(&self) -> anyhow::Result<String>;
}

/// `<uuid v4>-<unix seconds>`, the format the rest of the platform uses for geids.
#[derive(Debug, Default, Clone, Copy)]
pub struct UuidIssuer;

impl IdIssuer for UuidIssuer {
    fn mint(&self) -> anyhow::Result<String> {
        Ok(format!("{}-{}", Uuid::new_v4(), Utc::now().timestamp()))
    }
}
