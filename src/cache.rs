//! Read-through cache over contract reads.
//!
//! A read never blocks: a miss answers `Loading` and schedules the call, a
//! hit answers the last stored value and, when that value predates the current
//! epoch, schedules a refetch. Every new block bumps the epoch, so nothing is
//! served more than one block stale once the refetch lands.

use crate::{
    error::GatewayError,
    gateway::{
        FromReadValue,
        ReadCall,
        ReadValue,
    },
    loadable::Loadable,
    types::BlockHeader,
};
use std::{
    cell::RefCell,
    collections::{
        HashMap,
        HashSet,
    },
};
use tracing::{
    debug,
    warn,
};

#[derive(Clone, Debug)]
struct Entry {
    value: Loadable<ReadValue>,
    fetched_epoch: u64,
}

#[derive(Debug, Default)]
pub struct CallCache {
    entries: HashMap<ReadCall, Entry>,
    in_flight: HashSet<ReadCall>,
    pending: RefCell<HashSet<ReadCall>>,
    block: BlockHeader,
    epoch: u64,
    revision: u64,
}

impl CallCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn read(&self, call: &ReadCall) -> Loadable<ReadValue> {
        match self.entries.get(call) {
            None => {
                self.schedule(call);
                Loadable::Loading
            }
            Some(entry) => {
                if entry.fetched_epoch < self.epoch {
                    self.schedule(call);
                }
                entry.value.clone()
            }
        }
    }

    pub fn read_as<T: FromReadValue>(&self, call: &ReadCall) -> Loadable<T> {
        self.read(call).and_then(|value| match T::from_read_value(&value) {
            Some(typed) => Loadable::Ready(typed),
            None => Loadable::Failed(
                GatewayError::Decode {
                    call: format!("{call:?}"),
                    detail: "value has the wrong type".to_string(),
                }
                .to_string(),
            ),
        })
    }

    fn schedule(&self, call: &ReadCall) {
        if self.in_flight.contains(call) {
            return;
        }
        self.pending.borrow_mut().insert(call.clone());
    }

    pub fn has_pending(&self) -> bool {
        !self.pending.borrow().is_empty()
    }

    /// Drains scheduled calls and marks them in flight. The caller fetches
    /// them and hands each result back through [`CallCache::complete`] with
    /// the epoch returned here.
    pub fn take_pending(&mut self) -> (Vec<ReadCall>, u64) {
        let calls: Vec<ReadCall> = self.pending.get_mut().drain().collect();
        self.in_flight.extend(calls.iter().cloned());
        (calls, self.epoch)
    }

    pub fn complete(
        &mut self,
        call: ReadCall,
        result: Result<ReadValue, GatewayError>,
        fetched_epoch: u64,
    ) {
        self.in_flight.remove(&call);
        let value = match result {
            Ok(value) => Loadable::Ready(value),
            Err(err) => {
                warn!(?call, %err, "chain read failed");
                match self.entries.get(&call) {
                    // keep serving the last good value
                    Some(Entry {
                        value: previous @ Loadable::Ready(_),
                        ..
                    }) => previous.clone(),
                    _ => Loadable::Failed(err.to_string()),
                }
            }
        };
        self.entries.insert(
            call,
            Entry {
                value,
                fetched_epoch,
            },
        );
        self.revision += 1;
    }

    /// Records a new block. Returns `false` for a header that is not newer
    /// than the one already seen.
    pub fn advance_block(&mut self, header: BlockHeader) -> bool {
        if header.height <= self.block.height && self.epoch > 0 {
            return false;
        }
        debug!(height = header.height, entries = self.entries.len(), "invalidating call cache");
        self.block = header;
        self.epoch += 1;
        true
    }

    /// Marks every entry stale without waiting for a block.
    pub fn invalidate_all(&mut self) {
        self.epoch += 1;
    }

    pub fn block(&self) -> BlockHeader {
        self.block
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    /// Bumped every time a fetched value is stored.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
