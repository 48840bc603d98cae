//! MAC transaction queue
//
// https://github.com/rust-iot/rust-lpwan
// Copyright 2021 Ryan Kurte

use ieee802154::mac::Address;
use heapless::Vec;

use super::Packet;
use super::mcps::DataConfirmCb;

/// Maximum number of queued outbound transactions
pub const TX_QUEUE_LEN: usize = 8;

/// An outbound MSDU held by the MAC until transmission completes
#[derive(Clone)]
pub struct Transaction {
    /// Caller assigned MSDU handle (`None` for frames queued without a confirm)
    pub handle: Option<u8>,
    /// Encoded frame
    pub packet: Packet,
    /// Indirect transactions are held until polled by the destination
    pub indirect: bool,
    /// Set when the destination of an indirect transaction has polled for it
    pub polled: bool,
    /// Expiry time for indirect transactions
    pub expires_at: Option<u64>,
    /// MCPS-DATA.confirm callback
    pub confirm: Option<DataConfirmCb>,
}

// Callbacks are not compared or printed
impl PartialEq for Transaction {
    fn eq(&self, o: &Self) -> bool {
        self.handle == o.handle &&
        self.packet == o.packet &&
        self.indirect == o.indirect &&
        self.polled == o.polled &&
        self.expires_at == o.expires_at
    }
}

impl core::fmt::Debug for Transaction {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Transaction")
            .field("handle", &self.handle)
            .field("seq", &self.packet.header.seq)
            .field("indirect", &self.indirect)
            .field("polled", &self.polled)
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

impl Transaction {
    /// Create a direct transaction
    pub fn direct(handle: Option<u8>, packet: Packet, confirm: Option<DataConfirmCb>) -> Self {
        Self {
            handle,
            packet,
            indirect: false,
            polled: false,
            expires_at: None,
            confirm,
        }
    }

    /// Create an indirect transaction expiring at the provided time
    pub fn indirect(handle: Option<u8>, packet: Packet, expires_at: Option<u64>, confirm: Option<DataConfirmCb>) -> Self {
        Self {
            handle,
            packet,
            indirect: true,
            polled: false,
            expires_at,
            confirm,
        }
    }

    /// Check whether the transaction may be transmitted
    pub fn is_ready(&self) -> bool {
        !self.indirect || self.polled
    }
}

/// Bounded FIFO of outbound transactions.
///
/// Removal preserves the order of the remaining transactions.
#[derive(Clone, Debug, PartialEq)]
pub struct TransactionQueue {
    items: Vec<Transaction, TX_QUEUE_LEN>,
}

impl Default for TransactionQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl TransactionQueue {
    pub fn new() -> Self {
        Self{ items: Vec::new() }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.items.len() == self.items.capacity()
    }

    /// Append a transaction, returning it if the queue is full
    pub fn push(&mut self, t: Transaction) -> Result<(), Transaction> {
        self.items.push(t)
    }

    pub fn iter(&self) -> impl Iterator<Item=&Transaction> {
        self.items.iter()
    }

    /// Remove the oldest transaction with the provided handle
    pub fn purge(&mut self, handle: u8) -> Option<Transaction> {
        let i = self.items.iter().position(|t| t.handle == Some(handle))?;
        self.remove(i)
    }

    /// Remove the first transaction eligible for transmission
    pub fn next_ready(&mut self) -> Option<Transaction> {
        let i = self.items.iter().position(|t| t.is_ready())?;
        self.remove(i)
    }

    /// Mark the first un-polled indirect transaction for `dest` as polled,
    /// returns whether a transaction was found
    pub fn mark_polled(&mut self, dest: &Address) -> bool {
        match self.items.iter_mut().find(|t| t.indirect && !t.polled && t.packet.header.destination == *dest) {
            Some(t) => {
                t.polled = true;
                true
            },
            None => false,
        }
    }

    /// Remove the first un-polled indirect transaction that has expired
    pub fn pop_expired(&mut self, now: u64) -> Option<Transaction> {
        let i = self.items.iter().position(|t| {
            match t.expires_at {
                Some(e) => !t.polled && e <= now,
                None => false,
            }
        })?;
        self.remove(i)
    }

    fn remove(&mut self, index: usize) -> Option<Transaction> {
        self.items[index..].rotate_left(1);
        self.items.pop()
    }
}

#[cfg(test)]
mod test {
    use ieee802154::mac::{PanId, ShortAddress};

    use super::*;

    fn addr(a: u16) -> Address {
        Address::Short(PanId(1), ShortAddress(a))
    }

    fn packet(dest: u16, seq: u8) -> Packet {
        Packet::data(addr(dest), addr(1), seq, &[seq], false).unwrap()
    }

    #[test]
    fn purge_preserves_order() {
        let mut q = TransactionQueue::new();
        for i in 0..4 {
            q.push(Transaction::direct(Some(i), packet(2, i), None)).unwrap();
        }

        let t = q.purge(1).unwrap();
        assert_eq!(t.handle, Some(1));
        assert_eq!(q.len(), 3);

        let handles: std::vec::Vec<_> = q.iter().map(|t| t.handle).collect();
        assert_eq!(handles, std::vec![Some(0), Some(2), Some(3)]);

        assert!(q.purge(1).is_none());
        assert!(q.purge(9).is_none());
    }

    #[test]
    fn purge_oldest_duplicate() {
        let mut q = TransactionQueue::new();
        q.push(Transaction::direct(Some(5), packet(2, 0), None)).unwrap();
        q.push(Transaction::direct(Some(5), packet(2, 1), None)).unwrap();

        assert_eq!(q.purge(5).map(|t| t.packet.header.seq), Some(0));
        assert_eq!(q.purge(5).map(|t| t.packet.header.seq), Some(1));
        assert!(q.is_empty());
    }

    #[test]
    fn untagged_not_purgeable() {
        let mut q = TransactionQueue::new();
        q.push(Transaction::direct(None, packet(2, 0), None)).unwrap();

        assert!(q.purge(0).is_none());
        assert_eq!(q.len(), 1);
    }

    #[test]
    fn overflow() {
        let mut q = TransactionQueue::new();
        for i in 0..TX_QUEUE_LEN {
            q.push(Transaction::direct(Some(i as u8), packet(2, i as u8), None)).unwrap();
        }
        assert!(q.is_full());

        let t = Transaction::direct(Some(0xff), packet(2, 0xff), None);
        assert_eq!(q.push(t.clone()), Err(t));
    }

    #[test]
    fn indirect_held_until_polled() {
        let mut q = TransactionQueue::new();
        q.push(Transaction::indirect(Some(1), packet(3, 0), Some(100), None)).unwrap();
        q.push(Transaction::direct(Some(2), packet(2, 1), None)).unwrap();

        // Direct transactions bypass pending indirect ones
        assert_eq!(q.next_ready().and_then(|t| t.handle), Some(2));
        assert!(q.next_ready().is_none());

        // Polls from other devices do not release the transaction
        assert!(!q.mark_polled(&addr(4)));
        assert!(q.next_ready().is_none());

        assert!(q.mark_polled(&addr(3)));
        assert_eq!(q.next_ready().and_then(|t| t.handle), Some(1));
        assert!(q.is_empty());
    }

    #[test]
    fn indirect_expiry() {
        let mut q = TransactionQueue::new();
        q.push(Transaction::indirect(Some(1), packet(3, 0), Some(100), None)).unwrap();
        q.push(Transaction::indirect(Some(2), packet(4, 1), Some(200), None)).unwrap();
        q.push(Transaction::direct(Some(3), packet(2, 2), None)).unwrap();

        assert!(q.pop_expired(99).is_none());
        assert_eq!(q.pop_expired(100).and_then(|t| t.handle), Some(1));
        assert!(q.pop_expired(150).is_none());

        // Polled transactions no longer expire
        assert!(q.mark_polled(&addr(4)));
        assert!(q.pop_expired(1000).is_none());
        assert_eq!(q.len(), 2);
    }
}
