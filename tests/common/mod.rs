#![allow(dead_code)]

use async_trait::async_trait;
use opalstack_ensure::error::{ClientError, EnsureError, Result};
use opalstack_ensure::record::{self, Record};
use opalstack_ensure::store::BackingStore;
use opalstack_ensure::wait::{wait_for, PollConfig, TerminalState};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Op {
    List,
    Create(Vec<String>),
    Delete(Vec<String>),
    WaitReady(Vec<String>),
    WaitDeleted(Vec<String>),
}

#[derive(Default)]
struct State {
    records: Vec<Record>,
    next_id: u64,
    ops: Vec<Op>,
    checks: HashMap<String, u32>,
}

/// A store keeping its records in memory and logging every call.
pub struct MemoryStore {
    kind: &'static str,
    instantaneous: bool,
    /// Checks a created record needs before it reports ready
    ready_after: Option<u32>,
    fail_listing: bool,
    state: Mutex<State>,
}

impl MemoryStore {
    pub fn new(kind: &'static str) -> Self {
        Self {
            kind,
            instantaneous: false,
            ready_after: Some(2),
            fail_listing: false,
            state: Mutex::new(State {
                next_id: 1,
                ..Default::default()
            }),
        }
    }

    pub fn instantaneous(mut self) -> Self {
        self.instantaneous = true;
        self
    }

    pub fn never_ready(mut self) -> Self {
        self.ready_after = None;
        self
    }

    pub fn failing(mut self) -> Self {
        self.fail_listing = true;
        self
    }

    /// Seed existing records, assigning ids.
    pub fn with_records(self, records: Vec<Record>) -> Self {
        {
            let mut state = self.state.lock().unwrap();
            for mut record in records {
                let id = format!("r{}", state.next_id);
                state.next_id += 1;
                record.insert("id".into(), Value::String(id));
                state.records.push(record);
            }
        }
        self
    }

    pub fn records(&self) -> Vec<Record> {
        self.state.lock().unwrap().records.clone()
    }

    pub fn ops(&self) -> Vec<Op> {
        self.state.lock().unwrap().ops.clone()
    }

    pub fn clear_ops(&self) {
        self.state.lock().unwrap().ops.clear();
    }

    fn log(&self, op: Op) {
        self.state.lock().unwrap().ops.push(op);
    }
}

#[async_trait]
impl BackingStore for MemoryStore {
    fn kind(&self) -> &str {
        self.kind
    }

    fn primary_key(&self) -> &str {
        "id"
    }

    fn is_instantaneous(&self) -> bool {
        self.instantaneous
    }

    async fn list_all(&self) -> Result<Vec<Record>> {
        self.log(Op::List);
        if self.fail_listing {
            return Err(ClientError::Request("store unavailable".into()).into());
        }
        Ok(self.records())
    }

    async fn batch_create(&self, records: &[Record]) -> Result<Vec<Record>> {
        let mut state = self.state.lock().unwrap();
        let mut created = Vec::new();
        for record in records {
            let mut record = record.clone();
            let id = format!("r{}", state.next_id);
            state.next_id += 1;
            record.insert("id".into(), Value::String(id));
            state.records.push(record.clone());
            created.push(record);
        }
        let ids = created.iter().filter_map(|r| record::key(r, "id")).collect();
        state.ops.push(Op::Create(ids));
        Ok(created)
    }

    async fn batch_delete(&self, records: &[Record]) -> Result<()> {
        let keys = self.keys(records)?;
        let mut state = self.state.lock().unwrap();
        state
            .records
            .retain(|r| !record::key(r, "id").map_or(false, |id| keys.contains(&id)));
        state.ops.push(Op::Delete(keys));
        Ok(())
    }

    async fn wait_until_ready(&self, keys: &[String], poll: &PollConfig) -> Result<()> {
        self.log(Op::WaitReady(keys.to_vec()));
        wait_for(self.kind, TerminalState::Ready, keys, poll, |key| {
            let mut state = self.state.lock().unwrap();
            let checks = state.checks.entry(key).or_insert(0);
            *checks += 1;
            let ready = self.ready_after.map_or(false, |after| *checks >= after);
            async move { Ok::<_, EnsureError>(ready) }
        })
        .await
    }

    async fn wait_until_deleted(&self, keys: &[String], poll: &PollConfig) -> Result<()> {
        self.log(Op::WaitDeleted(keys.to_vec()));
        wait_for(self.kind, TerminalState::Deleted, keys, poll, |key| {
            let gone = !self
                .state
                .lock()
                .unwrap()
                .records
                .iter()
                .any(|r| record::key(r, "id").as_deref() == Some(key.as_str()));
            async move { Ok::<_, EnsureError>(gone) }
        })
        .await
    }
}

pub fn rec(value: Value) -> Record {
    record::from_value(value).expect("record literal must be an object")
}

pub fn named(name: &str) -> Record {
    rec(json!({ "name": name }))
}

pub fn names(records: &[Record]) -> Vec<String> {
    records
        .iter()
        .filter_map(|r| r.get("name").and_then(Value::as_str).map(str::to_string))
        .collect()
}

pub fn fast_poll(max_attempts: u32) -> PollConfig {
    PollConfig::new(Duration::from_millis(1), max_attempts)
}
