//! Recently modified Google Docs, read through the Drive files API.

use std::sync::Arc;

use chrono::{DateTime, SecondsFormat};
use gapihub_core::{DateRange, DocActivityRecord};
use serde::Deserialize;
use tracing::{debug, warn};

use crate::error::ProviderResult;
use crate::fetcher::{Fetcher, MAX_RESULTS};
use crate::transport::{BoxFuture, DRIVE_API_BASE, GoogleTransport, get_decoded};

const DOCUMENT_MIME_TYPE: &str = "application/vnd.google-apps.document";
const FILE_FIELDS: &str = "files(id,name,modifiedTime,lastModifyingUser)";

#[derive(Debug, Deserialize)]
struct FileList {
    #[serde(default)]
    files: Vec<DriveFile>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DriveFile {
    pub id: Option<String>,
    pub name: Option<String>,
    pub modified_time: Option<String>,
    pub last_modifying_user: Option<DriveUser>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DriveUser {
    #[serde(default)]
    pub display_name: String,
}

/// Drive search expression limited to Docs modified inside `range`.
pub fn search_query(range: &DateRange) -> String {
    let mut clauses = vec![format!("mimeType='{DOCUMENT_MIME_TYPE}'")];
    if let Some(start) = &range.start {
        clauses.push(format!(
            "modifiedTime >= '{}'",
            start
                .start_of_range()
                .to_rfc3339_opts(SecondsFormat::AutoSi, true)
        ));
    }
    if let Some(end) = &range.end {
        clauses.push(format!(
            "modifiedTime <= '{}'",
            end.end_of_range()
                .to_rfc3339_opts(SecondsFormat::AutoSi, true)
        ));
    }
    clauses.join(" and ")
}

/// `2024-02-19T10:00:00.000Z` becomes `2024-02-19T10:00:00+00:00`; a
/// non-zero fraction is written with six digits.
fn with_utc_offset(modified_time: &str) -> String {
    match DateTime::parse_from_rfc3339(modified_time) {
        Ok(dt) => {
            let precision = if dt.timestamp_subsec_micros() == 0 {
                SecondsFormat::Secs
            } else {
                SecondsFormat::Micros
            };
            dt.to_rfc3339_opts(precision, false)
        }
        Err(e) => {
            warn!(modified_time, error = %e, "unparseable modifiedTime");
            modified_time.to_string()
        }
    }
}

pub struct DocsFetcher {
    transport: Arc<dyn GoogleTransport>,
}

impl DocsFetcher {
    pub fn new(transport: Arc<dyn GoogleTransport>) -> Self {
        Self { transport }
    }

    /// Docs modified inside `range`, most recent first.
    pub async fn get_activity(&self, range: &DateRange) -> ProviderResult<Vec<DocActivityRecord>> {
        let list: FileList = get_decoded(
            self.transport.as_ref(),
            Self::NAME,
            format!("{DRIVE_API_BASE}/files"),
            vec![
                ("q", search_query(range)),
                ("pageSize", MAX_RESULTS.to_string()),
                ("fields", FILE_FIELDS.to_string()),
                ("orderBy", "modifiedTime desc".to_string()),
            ],
            "files.list",
        )
        .await?;
        debug!(count = list.files.len(), "listed documents");

        Ok(list.files.iter().filter_map(Self::format_file).collect())
    }

    pub fn format_file(file: &DriveFile) -> Option<DocActivityRecord> {
        let Some(id) = &file.id else {
            warn!(name = ?file.name, "dropping drive file without id");
            return None;
        };
        let timestamp = file
            .modified_time
            .as_deref()
            .map(with_utc_offset)
            .unwrap_or_default();

        let mut record = DocActivityRecord::new(id.clone(), timestamp);
        if let Some(user) = &file.last_modifying_user {
            record.user = user.display_name.clone();
        }
        Some(record)
    }
}

impl Fetcher for DocsFetcher {
    type Record = DocActivityRecord;

    const NAME: &'static str = "drive";

    fn from_transport(transport: Arc<dyn GoogleTransport>) -> Self {
        Self::new(transport)
    }

    fn fetch<'a>(
        &'a self,
        range: &'a DateRange,
    ) -> BoxFuture<'a, ProviderResult<Vec<Self::Record>>> {
        Box::pin(self.get_activity(range))
    }
}
