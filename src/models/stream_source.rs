use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// An imported feed owning zero or more channel records
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceDescriptor {
    pub id: Uuid,
    pub name: String,
    pub origin: SourceOrigin,
    pub fetch_status: FetchStatus,
    pub last_updated_at: Option<DateTime<Utc>>,
    pub error_detail: Option<String>,
    pub enabled: bool,
}

impl SourceDescriptor {
    pub fn new(name: impl Into<String>, origin: SourceOrigin) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            origin,
            fetch_status: FetchStatus::Pending,
            last_updated_at: None,
            error_detail: None,
            enabled: true,
        }
    }

    /// Record a successful import or refresh
    pub fn mark_ok(&mut self) {
        self.fetch_status = FetchStatus::Ok;
        self.last_updated_at = Some(Utc::now());
        self.error_detail = None;
    }

    /// Record a failed refresh; the previous channel set is retained
    pub fn mark_failed(&mut self, detail: impl Into<String>) {
        self.fetch_status = FetchStatus::Failed;
        self.error_detail = Some(detail.into());
    }

    pub fn remote_url(&self) -> Option<&str> {
        match &self.origin {
            SourceOrigin::RemoteUrl { url } => Some(url),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SourceOrigin {
    RemoteUrl { url: String },
    UploadedText,
    Manual,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FetchStatus {
    Pending,
    Ok,
    Failed,
}
