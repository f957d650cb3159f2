use super::engine::RecordStore;
use super::record::{Fields, Filters, Record, SelectParams, SortOrder, SortSpec};
use crate::core::{PersistError, Result, Value};
use crate::evaluator::SelectEvaluator;
use crate::parser::SelectParserAdapter;
use async_trait::async_trait;
use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};
use tokio::sync::RwLock;

#[derive(Debug, Default)]
struct MemoryTable {
    rows: BTreeMap<i64, Record>,
    next_id: i64,
}

impl MemoryTable {
    fn allocate_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }
}

/// Record store kept entirely in memory. Tables are created on first insert.
#[derive(Debug, Default)]
pub struct MemoryRecordStore {
    tables: RwLock<HashMap<String, MemoryTable>>,
}

impl MemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of rows currently in `table`.
    pub async fn row_count(&self, table: &str) -> usize {
        let tables = self.tables.read().await;
        tables.get(table).map_or(0, |t| t.rows.len())
    }

    async fn scan<F>(&self, table: &str, mut predicate: F) -> Result<Vec<Record>>
    where
        F: FnMut(&Record) -> Result<bool>,
    {
        let tables = self.tables.read().await;
        let Some(table) = tables.get(table) else {
            return Ok(Vec::new());
        };

        let mut matched = Vec::new();
        for record in table.rows.values() {
            if predicate(record)? {
                matched.push(record.clone());
            }
        }
        Ok(matched)
    }

    fn finish(
        mut records: Vec<Record>,
        sort: &str,
        fields: &str,
        offset: usize,
        limit: usize,
    ) -> Result<Vec<Record>> {
        let sort = SortSpec::parse(sort)?;
        let fields = Fields::parse(fields)?;

        if !sort.is_empty() {
            records.sort_by(|a, b| {
                for key in sort.keys() {
                    let left = a.get(&key.field).unwrap_or(&Value::Null);
                    let right = b.get(&key.field).unwrap_or(&Value::Null);
                    let ordering = match key.order {
                        SortOrder::Asc => left.compare(right),
                        SortOrder::Desc => right.compare(left),
                    };
                    if ordering != Ordering::Equal {
                        return ordering;
                    }
                }
                Ordering::Equal
            });
        }

        let take = if limit == 0 { usize::MAX } else { limit };
        Ok(records
            .into_iter()
            .skip(offset)
            .take(take)
            .map(|record| record.project(&fields))
            .collect())
    }
}

#[async_trait]
impl RecordStore for MemoryRecordStore {
    async fn get_record(&self, table: &str, filters: &Filters) -> Result<Option<Record>> {
        let mut matched = self.scan(table, |record| Ok(filters.matches(record))).await?;
        if matched.len() > 1 {
            return Err(PersistError::Store(format!(
                "Found more than one record in '{}' where exactly one was expected",
                table
            )));
        }
        Ok(matched.pop())
    }

    async fn get_records(
        &self,
        table: &str,
        filters: &Filters,
        sort: &str,
        fields: &str,
        offset: usize,
        limit: usize,
    ) -> Result<Vec<Record>> {
        let matched = self.scan(table, |record| Ok(filters.matches(record))).await?;
        Self::finish(matched, sort, fields, offset, limit)
    }

    async fn get_records_select(
        &self,
        table: &str,
        select: &str,
        params: &SelectParams,
        sort: &str,
        fields: &str,
        offset: usize,
        limit: usize,
    ) -> Result<Vec<Record>> {
        let matched = if select.trim().is_empty() {
            self.scan(table, |_| Ok(true)).await?
        } else {
            let parsed = SelectParserAdapter::new().parse(select)?;
            let evaluator = SelectEvaluator::bind(&parsed, params)?;
            self.scan(table, |record| evaluator.matches(record)).await?
        };
        Self::finish(matched, sort, fields, offset, limit)
    }

    async fn insert_record(&self, table: &str, record: Record) -> Result<i64> {
        let mut tables = self.tables.write().await;
        let table = tables.entry(table.to_string()).or_default();
        let id = table.allocate_id();

        let mut stored = Record::new().with("id", id);
        for (name, value) in record {
            if name != "id" {
                stored.insert(name, value);
            }
        }
        table.rows.insert(id, stored);
        Ok(id)
    }

    async fn update_record(&self, table: &str, record: Record) -> Result<bool> {
        let id = record.id().ok_or_else(|| {
            PersistError::Store(format!("update of '{}' requires an id field", table))
        })?;

        let mut tables = self.tables.write().await;
        let Some(row) = tables.get_mut(table).and_then(|t| t.rows.get_mut(&id)) else {
            return Ok(false);
        };
        for (name, value) in record {
            if name != "id" {
                row.insert(name, value);
            }
        }
        Ok(true)
    }

    async fn delete_records(&self, table: &str, filters: &Filters) -> Result<bool> {
        let mut tables = self.tables.write().await;
        let Some(table) = tables.get_mut(table) else {
            return Ok(false);
        };
        let before = table.rows.len();
        table.rows.retain(|_, record| !filters.matches(record));
        Ok(table.rows.len() < before)
    }

    async fn count_records(&self, table: &str, filters: &Filters) -> Result<u64> {
        let matched = self.scan(table, |record| Ok(filters.matches(record))).await?;
        Ok(matched.len() as u64)
    }

    async fn count_records_select(
        &self,
        table: &str,
        select: &str,
        params: &SelectParams,
    ) -> Result<u64> {
        let matched = self
            .get_records_select(table, select, params, "", "*", 0, 0)
            .await?;
        Ok(matched.len() as u64)
    }
}
