//! Bitable REST API types.

use serde::{Deserialize, Serialize};
use vlens_models::FieldMap;

use crate::error::{BitableError, BitableResult};

/// Response envelope shared by every open-API endpoint.
#[derive(Debug, Deserialize)]
pub struct Envelope<T> {
    pub code: i64,
    #[serde(default)]
    pub msg: String,
    pub data: Option<T>,
}

impl<T> Envelope<T> {
    /// Unwrap `data`, turning a non-zero `code` into an API error.
    pub fn into_data(self) -> BitableResult<T> {
        if self.code != 0 {
            return Err(BitableError::Api {
                code: self.code,
                msg: self.msg,
            });
        }
        self.data
            .ok_or_else(|| BitableError::invalid_response("response has no data"))
    }
}

/// A table record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Record {
    #[serde(default)]
    pub record_id: String,
    #[serde(default)]
    pub fields: FieldMap,
}

#[derive(Debug, Deserialize)]
pub struct RecordData {
    pub record: Record,
}

/// Request body for record create and update.
#[derive(Debug, Serialize)]
pub struct FieldsBody<'a> {
    pub fields: &'a FieldMap,
}

#[derive(Debug, Deserialize)]
pub struct TmpDownloadUrlData {
    #[serde(default)]
    pub tmp_download_urls: Vec<TmpDownloadUrl>,
}

#[derive(Debug, Deserialize)]
pub struct TmpDownloadUrl {
    pub file_token: String,
    pub tmp_download_url: String,
}
