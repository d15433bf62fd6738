//! Shared fixtures for integration tests

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use featurestore::cursor::{CursorResult, RecordCursor, VecCursor};
use featurestore::record::{Record, Value};
use featurestore::schema::{AttributeDescriptor, Schema};

/// Counters shared with a probe after it moved into a chain
#[derive(Debug, Default)]
pub struct Calls {
    pub has_next: AtomicUsize,
    pub next: AtomicUsize,
    pub close: AtomicUsize,
}

impl Calls {
    pub fn next(&self) -> usize {
        self.next.load(Ordering::SeqCst)
    }

    pub fn close(&self) -> usize {
        self.close.load(Ordering::SeqCst)
    }
}

/// Leaf cursor that counts how it is driven
pub struct Probe {
    inner: VecCursor,
    calls: Arc<Calls>,
}

impl Probe {
    pub fn new(schema: Arc<Schema>, records: Vec<Record>) -> (Self, Arc<Calls>) {
        let calls = Arc::new(Calls::default());
        let probe = Self {
            inner: VecCursor::new(schema, records),
            calls: Arc::clone(&calls),
        };
        (probe, calls)
    }
}

impl RecordCursor for Probe {
    fn schema(&self) -> &Arc<Schema> {
        self.inner.schema()
    }

    fn has_next(&mut self) -> CursorResult<bool> {
        self.calls.has_next.fetch_add(1, Ordering::SeqCst);
        self.inner.has_next()
    }

    fn next(&mut self) -> CursorResult<Record> {
        self.calls.next.fetch_add(1, Ordering::SeqCst);
        self.inner.next()
    }

    fn close(&mut self) {
        self.calls.close.fetch_add(1, Ordering::SeqCst);
        self.inner.close();
    }
}

/// Schema `t(v: int, name: string, g: geometry)`
pub fn schema() -> Arc<Schema> {
    Arc::new(Schema::new(
        "t",
        vec![
            AttributeDescriptor::int("v"),
            AttributeDescriptor::string("name"),
            AttributeDescriptor::geometry("g"),
        ],
    ))
}

/// `n` records `r0..r{n-1}` with `v = i % modulo`
pub fn records(schema: &Arc<Schema>, n: usize, modulo: i64) -> Vec<Record> {
    (0..n)
        .map(|i| {
            Record::new(
                format!("r{}", i),
                Arc::clone(schema),
                vec![
                    Value::Int(i as i64 % modulo),
                    Value::from(format!("n{}", i)),
                    Value::Null,
                ],
            )
        })
        .collect()
}

pub fn ids(records: &[Record]) -> Vec<String> {
    records.iter().map(|r| r.id().to_string()).collect()
}
