//! Request scheduler, defers servicing of MCPS requests to the MAC tick
//
// https://github.com/rust-iot/rust-lpwan
// Copyright 2021 Ryan Kurte

use heapless::spsc::Queue;

use super::mcps::{DataRequest, DataConfirmCb};
#[cfg(feature = "purge")]
use super::mcps::{PurgeRequest, PurgeConfirmCb};

/// Queue storage size, the usable capacity is one less
pub const REQUEST_QUEUE_LEN: usize = 8;

/// A scheduled primitive and its confirm callback
#[derive(Clone)]
pub enum Request {
    Data(DataRequest, DataConfirmCb),
    #[cfg(feature = "purge")]
    Purge(PurgeRequest, PurgeConfirmCb),
}

/// FIFO of scheduled requests
pub struct Scheduler {
    pending: Queue<Request, REQUEST_QUEUE_LEN>,
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl Scheduler {
    pub fn new() -> Self {
        Self { pending: Queue::new() }
    }

    /// Schedule a request, returning it if the scheduler is full
    pub fn post(&mut self, r: Request) -> Result<(), Request> {
        self.pending.enqueue(r)
    }

    /// Take the next request for servicing
    pub fn next(&mut self) -> Option<Request> {
        self.pending.dequeue()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}

#[cfg(all(test, feature = "purge"))]
mod test {
    use crate::mac_802154::mcps::PurgeConfirm;

    use super::*;

    fn noop(_c: &PurgeConfirm) {}

    #[test]
    fn fifo_order() {
        let mut s = Scheduler::new();

        for i in 0..3 {
            s.post(Request::Purge(PurgeRequest::new(i), noop)).unwrap();
        }
        assert!(!s.is_empty());

        for i in 0..3 {
            match s.next() {
                Some(Request::Purge(r, _)) => assert_eq!(r.msdu_handle, i),
                _ => panic!("Expected purge request {}", i),
            }
        }

        assert!(s.is_empty());
        assert!(s.next().is_none());
    }

    #[test]
    fn bounded() {
        let mut s = Scheduler::new();

        for i in 0..(REQUEST_QUEUE_LEN - 1) {
            s.post(Request::Purge(PurgeRequest::new(i as u8), noop)).unwrap();
        }

        assert!(s.post(Request::Purge(PurgeRequest::new(0xff), noop)).is_err());
    }
}
