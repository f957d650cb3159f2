use super::record::{Filters, Record, SelectParams};
use crate::core::Result;
use async_trait::async_trait;

/// Keyed record store consumed by the persistent model engine.
///
/// `sort` is a `"field [ASC|DESC], ..."` clause (empty for id order),
/// `fields` is `"*"` or a comma separated projection, `limit == 0` means
/// unlimited.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Fetch the single record matching `filters`.
    async fn get_record(&self, table: &str, filters: &Filters) -> Result<Option<Record>>;

    /// Fetch records matching equality `filters`.
    async fn get_records(
        &self,
        table: &str,
        filters: &Filters,
        sort: &str,
        fields: &str,
        offset: usize,
        limit: usize,
    ) -> Result<Vec<Record>>;

    /// Fetch records matching a raw select clause.
    async fn get_records_select(
        &self,
        table: &str,
        select: &str,
        params: &SelectParams,
        sort: &str,
        fields: &str,
        offset: usize,
        limit: usize,
    ) -> Result<Vec<Record>>;

    /// Insert a record and return the id the store assigned.
    async fn insert_record(&self, table: &str, record: Record) -> Result<i64>;

    /// Write the fields present in `record` to the row with its `id`.
    async fn update_record(&self, table: &str, record: Record) -> Result<bool>;

    /// Delete every record matching `filters`.
    async fn delete_records(&self, table: &str, filters: &Filters) -> Result<bool>;

    async fn count_records(&self, table: &str, filters: &Filters) -> Result<u64>;

    async fn count_records_select(
        &self,
        table: &str,
        select: &str,
        params: &SelectParams,
    ) -> Result<u64>;
}
