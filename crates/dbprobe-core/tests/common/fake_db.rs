//! Scripted in-memory pool for driving the round loop through failures.
//!
//! Connections are numbered in acquisition order (serial 0 is the first
//! successful acquisition, i.e. the bootstrap connection). Faults are keyed
//! by connection serial, probe index on that connection, and phase.

#![allow(dead_code)]

use chrono::Local;
use dbprobe_core::db::{ConnectionPool, ProbeConnection, ProbeRecord, TableStatus};
use dbprobe_core::retry::{DbError, ProbePhase};
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::{Arc, Mutex};

/// Failure to inject; turned into a fresh `DbError` each time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fault {
    Lost,
    Operational,
    Exhausted,
    Other,
}

impl Fault {
    pub fn to_error(self) -> DbError {
        match self {
            Fault::Lost => DbError::Interface("server has gone away".to_string()),
            Fault::Operational => DbError::operational("lock wait timeout exceeded"),
            Fault::Exhausted => DbError::Pool("no connection available".to_string()),
            Fault::Other => DbError::Other("unexpected driver state".to_string()),
        }
    }
}

#[derive(Debug, Default)]
pub struct FakeState {
    /// Per acquisition call, in order; `None` or an empty queue means success.
    pub acquire_script: VecDeque<Option<Fault>>,
    pub probe_faults: HashMap<(u32, u32, ProbePhase), Fault>,
    pub close_faults: HashSet<u32>,
    pub acquire_calls: u32,
    pub acquisitions: u32,
    pub releases: u32,
    pub live: u32,
    pub max_live: u32,
    pub table_created: bool,
    pub rows: Vec<ProbeRecord>,
}

#[derive(Clone, Default)]
pub struct FakePool {
    pub state: Arc<Mutex<FakeState>>,
}

impl FakePool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Script the outcome of the next acquisition calls, in order.
    pub fn script_acquire(&self, outcomes: impl IntoIterator<Item = Option<Fault>>) -> &Self {
        self.state.lock().unwrap().acquire_script.extend(outcomes);
        self
    }

    /// Fail `phase` of probe `probe` (0-based) on connection `serial`.
    pub fn fail_probe(&self, serial: u32, probe: u32, phase: ProbePhase, fault: Fault) -> &Self {
        self.state
            .lock()
            .unwrap()
            .probe_faults
            .insert((serial, probe, phase), fault);
        self
    }

    pub fn fail_close(&self, serial: u32) -> &Self {
        self.state.lock().unwrap().close_faults.insert(serial);
        self
    }

    pub fn snapshot<T>(&self, f: impl FnOnce(&FakeState) -> T) -> T {
        f(&self.state.lock().unwrap())
    }
}

impl ConnectionPool for FakePool {
    type Conn = FakeConn;

    fn name(&self) -> &str {
        "fake"
    }

    fn capacity(&self) -> u32 {
        5
    }

    async fn acquire(&self) -> Result<FakeConn, DbError> {
        let mut st = self.state.lock().unwrap();
        st.acquire_calls += 1;
        if let Some(Some(fault)) = st.acquire_script.pop_front() {
            return Err(fault.to_error());
        }
        let serial = st.acquisitions;
        st.acquisitions += 1;
        st.live += 1;
        st.max_live = st.max_live.max(st.live);
        Ok(FakeConn {
            serial,
            probes: 0,
            pending: None,
            live: true,
            state: Arc::clone(&self.state),
        })
    }
}

pub struct FakeConn {
    serial: u32,
    probes: u32,
    pending: Option<String>,
    live: bool,
    state: Arc<Mutex<FakeState>>,
}

impl FakeConn {
    fn fault(&mut self, probe: u32, phase: ProbePhase) -> Result<(), DbError> {
        let fault = self
            .state
            .lock()
            .unwrap()
            .probe_faults
            .get(&(self.serial, probe, phase))
            .copied();
        match fault {
            Some(f) => {
                if f == Fault::Lost {
                    self.live = false;
                }
                Err(f.to_error())
            }
            None => Ok(()),
        }
    }
}

impl ProbeConnection for FakeConn {
    async fn create_table(&mut self, _table: &str) -> Result<TableStatus, DbError> {
        let mut st = self.state.lock().unwrap();
        if st.table_created {
            return Ok(TableStatus::AlreadyExists);
        }
        st.table_created = true;
        Ok(TableStatus::Created)
    }

    async fn insert_probe(&mut self, _table: &str, datestr: &str) -> Result<(), DbError> {
        let probe = self.probes;
        self.probes += 1;
        self.fault(probe, ProbePhase::Write)?;
        self.pending = Some(datestr.to_string());
        Ok(())
    }

    async fn commit(&mut self) -> Result<(), DbError> {
        self.fault(self.probes.saturating_sub(1), ProbePhase::Commit)?;
        if let Some(datestr) = self.pending.take() {
            let mut st = self.state.lock().unwrap();
            let id = st.rows.len() as i64 + 1;
            st.rows.push(ProbeRecord {
                id,
                datestr,
                created_at: Local::now().naive_local(),
            });
        }
        Ok(())
    }

    async fn latest_probe(&mut self, _table: &str) -> Result<Option<ProbeRecord>, DbError> {
        self.fault(self.probes.saturating_sub(1), ProbePhase::Read)?;
        Ok(self.state.lock().unwrap().rows.last().cloned())
    }

    fn is_live(&self) -> bool {
        self.live
    }

    async fn close(self) -> Result<(), DbError> {
        let mut st = self.state.lock().unwrap();
        st.live -= 1;
        st.releases += 1;
        if st.close_faults.contains(&self.serial) {
            return Err(DbError::Other("close failed".to_string()));
        }
        Ok(())
    }
}
