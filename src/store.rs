//! The reservation state store: advertised streams, the per-port subscribed
//! streams table, and the worst-case-delay cache. Owned exclusively by the
//! dispatcher's [`crate::dispatcher::Controller`] (see SPEC_FULL.md §9,
//! "Global mutable state").

use std::collections::HashMap;
use std::net::Ipv4Addr;

use crate::reservation::{Reservation, StreamKey};

/// An advertised stream as recorded by the store: the original advertisement
/// as received, the delay-updated copy that gets flooded, and the port it
/// first arrived on (used to unicast subscription approvals back toward the
/// talker).
#[derive(Debug, Clone, Copy)]
pub struct AdvertisedEntry {
    pub original: Reservation,
    pub flood_copy: Reservation,
    pub ingress_port: u16,
}

/// Outcome of checking an incoming advertisement against the store.
pub enum AdvertisementCheck {
    /// The stream is already known with an identical `stream_hash`; reflood
    /// the stored copy unchanged.
    Unchanged(Reservation),
    /// The stream is new, or a stale entry was just evicted because its
    /// `stream_hash` changed. The caller must perform the end-to-end latency
    /// check, derive a flood copy, and call [`ReservationStore::store_advertisement`].
    Stale,
}

#[derive(Debug, Default)]
pub struct ReservationStore {
    advertised: HashMap<StreamKey, AdvertisedEntry>,
    subscribed: HashMap<u16, Vec<(Reservation, Ipv4Addr)>>,
    cache: HashMap<(StreamKey, Ipv4Addr), u32>,
}

impl ReservationStore {
    pub fn new() -> Self {
        ReservationStore::default()
    }

    /// Checks an incoming advertisement for stream `key` against the stored
    /// entry, evicting it if its shape has changed.
    pub fn check_advertisement(&mut self, key: StreamKey, incoming: &Reservation) -> AdvertisementCheck {
        match self.advertised.get(&key) {
            Some(entry) if entry.original.stream_hash() == incoming.stream_hash() => {
                AdvertisementCheck::Unchanged(entry.flood_copy)
            }
            Some(_) => {
                self.advertised.remove(&key);
                AdvertisementCheck::Stale
            }
            None => AdvertisementCheck::Stale,
        }
    }

    /// Stores a freshly validated advertisement and its flood copy.
    pub fn store_advertisement(
        &mut self,
        key: StreamKey,
        original: Reservation,
        flood_copy: Reservation,
        ingress_port: u16,
    ) {
        self.advertised.insert(
            key,
            AdvertisedEntry {
                original,
                flood_copy,
                ingress_port,
            },
        );
    }

    pub fn advertisement(&self, key: &StreamKey) -> Option<&AdvertisedEntry> {
        self.advertised.get(key)
    }

    /// Streams currently subscribed on egress port `p`.
    pub fn iter_port(&self, port: u16) -> impl Iterator<Item = &(Reservation, Ipv4Addr)> {
        self.subscribed.get(&port).into_iter().flatten()
    }

    /// Idempotent insertion of `(r, listener_ip)` into port `p`'s set, with
    /// the precomputed worst-case delay written to the cache atomically with
    /// the insert.
    pub fn add_subscription(&mut self, port: u16, r: Reservation, listener_ip: Ipv4Addr, wcd: u32) {
        let key = StreamKey::from(&r);
        let entries = self.subscribed.entry(port).or_default();
        let already_present = entries
            .iter()
            .any(|(existing, ip)| StreamKey::from(existing) == key && *ip == listener_ip);
        if !already_present {
            entries.push((r, listener_ip));
        }
        self.cache.insert((key, listener_ip), wcd);
    }

    pub fn cache_get(&self, key: StreamKey, listener_ip: Ipv4Addr) -> Option<u32> {
        self.cache.get(&(key, listener_ip)).copied()
    }

    pub fn cache_set(&mut self, key: StreamKey, listener_ip: Ipv4Addr, wcd: u32) {
        self.cache.insert((key, listener_ip), wcd);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stream(src_port: u16, dst_ip: Ipv4Addr) -> Reservation {
        Reservation::new(
            5000,
            7,
            Ipv4Addr::new(10, 0, 0, 1),
            dst_ip,
            src_port,
            2000,
            100,
            1500,
            1500,
            1000,
            0,
            0,
        )
    }

    #[test]
    fn check_advertisement_reports_unchanged_then_stale_after_shape_change() {
        let mut store = ReservationStore::new();
        let r = stream(1000, Ipv4Addr::UNSPECIFIED);
        let key = StreamKey::from(&r);

        assert!(matches!(store.check_advertisement(key, &r), AdvertisementCheck::Stale));
        store.store_advertisement(key, r, r, 3);

        assert!(matches!(
            store.check_advertisement(key, &r),
            AdvertisementCheck::Unchanged(flood) if flood == r
        ));

        let mut changed = r;
        changed.burst_interval = 500;
        assert!(matches!(
            store.check_advertisement(key, &changed),
            AdvertisementCheck::Stale
        ));
        // The stale entry was evicted; a subsequent lookup with the old
        // shape is stale too.
        assert!(matches!(store.check_advertisement(key, &r), AdvertisementCheck::Stale));
    }

    #[test]
    fn add_subscription_is_idempotent() {
        let mut store = ReservationStore::new();
        let r = stream(1000, Ipv4Addr::new(10, 0, 0, 50));
        let listener = Ipv4Addr::new(10, 0, 0, 50);

        store.add_subscription(4, r, listener, 300);
        store.add_subscription(4, r, listener, 300);

        assert_eq!(store.iter_port(4).count(), 1);
    }

    #[test]
    fn cache_invariant_holds_after_insert() {
        let mut store = ReservationStore::new();
        let r = stream(1000, Ipv4Addr::new(10, 0, 0, 50));
        let listener = Ipv4Addr::new(10, 0, 0, 50);
        let key = StreamKey::from(&r);

        store.add_subscription(2, r, listener, 480);
        assert_eq!(store.cache_get(key, listener), Some(480));
    }
}
