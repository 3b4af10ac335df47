//! [`RecordStore`] backed by the bitable client.

use async_trait::async_trait;
use vlens_bitable::{BitableClient, Record};
use vlens_models::FieldMap;

use crate::error::AnalysisResult;
use crate::ports::RecordStore;

#[async_trait]
impl RecordStore for BitableClient {
    async fn get_record(&self, table_id: &str, record_id: &str) -> AnalysisResult<Record> {
        Ok(BitableClient::get_record(self, table_id, record_id).await?)
    }

    async fn update_record(
        &self,
        table_id: &str,
        record_id: &str,
        fields: &FieldMap,
    ) -> AnalysisResult<()> {
        BitableClient::update_record(self, table_id, record_id, fields).await?;
        Ok(())
    }

    async fn create_record(&self, table_id: &str, fields: &FieldMap) -> AnalysisResult<String> {
        let record = BitableClient::create_record(self, table_id, fields).await?;
        Ok(record.record_id)
    }

    async fn resolve_download_url(&self, file_token: &str) -> AnalysisResult<String> {
        Ok(self.tmp_download_url(file_token).await?)
    }
}
