//! In-memory port implementations for service tests
//!
//! The mocks keep their state behind `parking_lot` locks so tests can hold
//! an `Arc` handle and inspect calls after handing a clone to the service.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use amfe_core::{
    FailureModeOrder, FailureModeQuery, FailureModeTable, LocalRecordStore, RecordTable, RemoteResult,
};
use amfe_domain::{
    AmfeError, AmfeRecord, FailureMode, NewFailureMode, RemoteFailure, Result as DomainResult,
};
use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use parking_lot::Mutex;

/// Build a record with fixed timestamps
pub fn failure_mode(id: &str, category: &str, mode: &str, tags: &[&str]) -> FailureMode {
    let at = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
    FailureMode {
        id: id.to_string(),
        category: category.to_string(),
        mode: mode.to_string(),
        common_causes: vec![],
        severity_default: 5,
        tags: tags.iter().map(|t| t.to_string()).collect(),
        created_at: at,
        updated_at: at,
    }
}

/// Small library spread over three categories
pub fn library() -> Vec<FailureMode> {
    vec![
        failure_mode("1", "Electrical", "Short circuit", &["Wiring"]),
        failure_mode("2", "Electrical", "Open circuit", &["Wiring", "Connector"]),
        failure_mode("3", "Mechanical", "Bearing seizure", &["Rotating"]),
        failure_mode("4", "Mechanical", "Fatigue crack", &["Structure"]),
        failure_mode("5", "Software", "Memory leak", &["Runtime"]),
    ]
}

/// Scriptable remote table
///
/// Queued failures are returned one per call, in order, before the table
/// starts answering from its rows.
#[derive(Default)]
pub struct MockTable {
    rows: Mutex<Vec<FailureMode>>,
    failures: Mutex<VecDeque<RemoteFailure>>,
    last_query: Mutex<Option<FailureModeQuery>>,
    inserted: Mutex<Vec<NewFailureMode>>,
    select_calls: AtomicUsize,
    select_by_id_calls: AtomicUsize,
    category_calls: AtomicUsize,
}

impl MockTable {
    pub fn new(rows: Vec<FailureMode>) -> Arc<Self> {
        Arc::new(Self { rows: Mutex::new(rows), ..Self::default() })
    }

    pub fn fail_next(&self, failure: RemoteFailure) {
        self.failures.lock().push_back(failure);
    }

    pub fn fail_times(&self, times: usize, failure: RemoteFailure) {
        for _ in 0..times {
            self.fail_next(failure.clone());
        }
    }

    pub fn set_rows(&self, rows: Vec<FailureMode>) {
        *self.rows.lock() = rows;
    }

    pub fn select_calls(&self) -> usize {
        self.select_calls.load(Ordering::SeqCst)
    }

    pub fn select_by_id_calls(&self) -> usize {
        self.select_by_id_calls.load(Ordering::SeqCst)
    }

    pub fn category_calls(&self) -> usize {
        self.category_calls.load(Ordering::SeqCst)
    }

    pub fn total_calls(&self) -> usize {
        self.select_calls() + self.select_by_id_calls() + self.category_calls()
    }

    pub fn last_query(&self) -> Option<FailureModeQuery> {
        self.last_query.lock().clone()
    }

    pub fn inserted(&self) -> Vec<NewFailureMode> {
        self.inserted.lock().clone()
    }

    fn next_failure(&self) -> Option<RemoteFailure> {
        self.failures.lock().pop_front()
    }
}

#[async_trait]
impl FailureModeTable for MockTable {
    async fn select(&self, query: &FailureModeQuery) -> RemoteResult<Vec<FailureMode>> {
        self.select_calls.fetch_add(1, Ordering::SeqCst);
        *self.last_query.lock() = Some(query.clone());
        if let Some(failure) = self.next_failure() {
            return Err(failure);
        }

        let mut rows: Vec<FailureMode> = self
            .rows
            .lock()
            .iter()
            .filter(|fm| query.category.as_ref().map_or(true, |c| &fm.category == c))
            .filter(|fm| {
                query.pattern.as_ref().map_or(true, |p| {
                    fm.mode.to_lowercase().contains(&p.to_lowercase()) || fm.has_tag(p)
                })
            })
            .filter(|fm| query.any_tags.is_empty() || query.any_tags.iter().any(|t| fm.has_tag(t)))
            .cloned()
            .collect();

        match query.order {
            FailureModeOrder::CategoryThenMode => {
                rows.sort_by(|a, b| (&a.category, &a.mode).cmp(&(&b.category, &b.mode)))
            }
            FailureModeOrder::Mode => rows.sort_by(|a, b| a.mode.cmp(&b.mode)),
        }

        let offset = query.offset.unwrap_or(0);
        let limit = query.limit.unwrap_or(usize::MAX);
        Ok(rows.into_iter().skip(offset).take(limit).collect())
    }

    async fn select_by_id(&self, id: &str) -> RemoteResult<FailureMode> {
        self.select_by_id_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(failure) = self.next_failure() {
            return Err(failure);
        }
        self.rows
            .lock()
            .iter()
            .find(|fm| fm.id == id)
            .cloned()
            .ok_or_else(|| RemoteFailure::code("PGRST116", "JSON object requested, multiple (or no) rows returned"))
    }

    async fn select_categories(&self) -> RemoteResult<Vec<String>> {
        self.category_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(failure) = self.next_failure() {
            return Err(failure);
        }
        let mut categories: Vec<String> =
            self.rows.lock().iter().map(|fm| fm.category.clone()).collect();
        categories.sort();
        Ok(categories)
    }

    async fn insert(&self, record: &NewFailureMode) -> RemoteResult<FailureMode> {
        if let Some(failure) = self.next_failure() {
            return Err(failure);
        }
        self.inserted.lock().push(record.clone());

        let mut rows = self.rows.lock();
        let tags: Vec<&str> = record.tags.iter().map(String::as_str).collect();
        let stored = failure_mode(
            &format!("custom-{}", rows.len() + 1),
            &record.category,
            &record.mode,
            &tags,
        );
        rows.push(stored.clone());
        Ok(stored)
    }
}

/// In-memory local record store
pub struct MockLocalStore {
    supported: bool,
    records: Mutex<Vec<FailureMode>>,
    last_sync: Mutex<Option<DateTime<Utc>>>,
    fail_reads: AtomicBool,
    fail_writes: AtomicBool,
    init_calls: AtomicUsize,
    store_calls: AtomicUsize,
}

impl MockLocalStore {
    pub fn new(records: Vec<FailureMode>) -> Arc<Self> {
        Arc::new(Self {
            supported: true,
            records: Mutex::new(records),
            last_sync: Mutex::new(None),
            fail_reads: AtomicBool::new(false),
            fail_writes: AtomicBool::new(false),
            init_calls: AtomicUsize::new(0),
            store_calls: AtomicUsize::new(0),
        })
    }

    pub fn unsupported() -> Arc<Self> {
        Arc::new(Self {
            supported: false,
            records: Mutex::new(Vec::new()),
            last_sync: Mutex::new(None),
            fail_reads: AtomicBool::new(false),
            fail_writes: AtomicBool::new(false),
            init_calls: AtomicUsize::new(0),
            store_calls: AtomicUsize::new(0),
        })
    }

    /// Replace the stored records as if a sync had just completed
    pub fn seed(&self, records: Vec<FailureMode>) {
        *self.records.lock() = records;
        *self.last_sync.lock() = Some(Utc::now());
    }

    pub fn fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    pub fn records(&self) -> Vec<FailureMode> {
        self.records.lock().clone()
    }

    pub fn init_calls(&self) -> usize {
        self.init_calls.load(Ordering::SeqCst)
    }

    pub fn store_calls(&self) -> usize {
        self.store_calls.load(Ordering::SeqCst)
    }

    fn check_reads(&self) -> DomainResult<()> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(AmfeError::StorageUnavailable("mock read failure".into()));
        }
        Ok(())
    }
}

#[async_trait]
impl LocalRecordStore for MockLocalStore {
    fn is_supported(&self) -> bool {
        self.supported
    }

    async fn init(&self) -> DomainResult<()> {
        self.init_calls.fetch_add(1, Ordering::SeqCst);
        self.check_reads()
    }

    async fn store_failure_modes(&self, records: &[FailureMode]) -> DomainResult<()> {
        self.store_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(AmfeError::StorageWrite("mock write failure".into()));
        }
        *self.records.lock() = records.to_vec();
        *self.last_sync.lock() = Some(Utc::now());
        Ok(())
    }

    async fn get_failure_modes(&self) -> DomainResult<Vec<FailureMode>> {
        self.check_reads()?;
        Ok(self.records.lock().clone())
    }

    async fn clear_cache(&self) -> DomainResult<()> {
        self.records.lock().clear();
        Ok(())
    }

    async fn last_sync(&self) -> DomainResult<Option<DateTime<Utc>>> {
        self.check_reads()?;
        Ok(*self.last_sync.lock())
    }
}

fn not_found() -> RemoteFailure {
    RemoteFailure::code("PGRST116", "JSON object requested, multiple (or no) rows returned")
}

/// Scriptable table for any AMFE record type
///
/// Rows are kept with their parent id. Inserts answer with the next queued
/// row; updates answer with the stored row unchanged. Payloads are captured
/// as JSON.
pub struct MockRecordTable<R> {
    rows: Mutex<Vec<(Option<String>, R)>>,
    created: Mutex<VecDeque<R>>,
    failures: Mutex<VecDeque<RemoteFailure>>,
    inserted: Mutex<Vec<serde_json::Value>>,
    patched: Mutex<Vec<(String, serde_json::Value)>>,
    deleted: Mutex<Vec<String>>,
    list_calls: AtomicUsize,
}

impl<R: AmfeRecord + Clone> MockRecordTable<R> {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            rows: Mutex::new(Vec::new()),
            created: Mutex::new(VecDeque::new()),
            failures: Mutex::new(VecDeque::new()),
            inserted: Mutex::new(Vec::new()),
            patched: Mutex::new(Vec::new()),
            deleted: Mutex::new(Vec::new()),
            list_calls: AtomicUsize::new(0),
        })
    }

    pub fn add(&self, parent_id: Option<&str>, row: R) {
        self.rows.lock().push((parent_id.map(str::to_string), row));
    }

    /// Row returned by the next insert
    pub fn answer_insert_with(&self, row: R) {
        self.created.lock().push_back(row);
    }

    pub fn fail_next(&self, failure: RemoteFailure) {
        self.failures.lock().push_back(failure);
    }

    pub fn inserted(&self) -> Vec<serde_json::Value> {
        self.inserted.lock().clone()
    }

    pub fn patched(&self) -> Vec<(String, serde_json::Value)> {
        self.patched.lock().clone()
    }

    pub fn deleted(&self) -> Vec<String> {
        self.deleted.lock().clone()
    }

    pub fn list_calls(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }

    fn next_failure(&self) -> Option<RemoteFailure> {
        self.failures.lock().pop_front()
    }
}

#[async_trait]
impl<R: AmfeRecord + Clone> RecordTable<R> for MockRecordTable<R> {
    async fn list(&self, parent_id: Option<&str>) -> RemoteResult<Vec<R>> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(failure) = self.next_failure() {
            return Err(failure);
        }
        Ok(self
            .rows
            .lock()
            .iter()
            .filter(|(parent, _)| parent_id.is_none() || parent.as_deref() == parent_id)
            .map(|(_, row)| row.clone())
            .collect())
    }

    async fn get(&self, id: &str) -> RemoteResult<R> {
        if let Some(failure) = self.next_failure() {
            return Err(failure);
        }
        self.rows.lock().iter().map(|(_, row)| row).find(|row| row.id() == id).cloned().ok_or_else(not_found)
    }

    async fn insert(&self, record: &R::New) -> RemoteResult<R> {
        if let Some(failure) = self.next_failure() {
            return Err(failure);
        }
        self.inserted.lock().push(serde_json::to_value(record).unwrap());
        self.created
            .lock()
            .pop_front()
            .ok_or_else(|| RemoteFailure::message("insert returned no representation"))
    }

    async fn update(&self, id: &str, patch: &R::Patch) -> RemoteResult<R> {
        if let Some(failure) = self.next_failure() {
            return Err(failure);
        }
        self.patched.lock().push((id.to_string(), serde_json::to_value(patch).unwrap()));
        self.rows.lock().iter().map(|(_, row)| row).find(|row| row.id() == id).cloned().ok_or_else(not_found)
    }

    async fn delete(&self, id: &str) -> RemoteResult<()> {
        if let Some(failure) = self.next_failure() {
            return Err(failure);
        }
        self.deleted.lock().push(id.to_string());
        self.rows.lock().retain(|(_, row)| row.id() != id);
        Ok(())
    }
}
