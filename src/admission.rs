//! The admission engine: decides whether a candidate subscription can be
//! deployed on an egress port without violating link capacity or any
//! existing stream's delay guarantee, and commits the state-store mutation
//! atomically when it can. See SPEC_FULL.md §4.4.

use std::net::Ipv4Addr;

use crate::delay::{self, ClassDelayMap};
use crate::reservation::{Reservation, StreamKey};
use crate::store::ReservationStore;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum AdmissionError {
    #[error("advertisement cannot meet its required end-to-end latency of {req_latency}us: accumulated {accumulated}us")]
    E2ELatencyViolation { req_latency: u32, accumulated: u32 },
    #[error("subscription would exceed egress bandwidth on port {port}: {requested} + existing > {link_speed_bps}")]
    EgressBandwidthExceeded {
        port: u16,
        requested: u64,
        link_speed_bps: u64,
    },
    #[error("admitting the subscription would push stream on port {port} over its delay guarantee")]
    DelayGuaranteeViolation { port: u16 },
}

/// Checks an incoming advertisement against its own `req_latency` before it
/// is stored or flooded (SPEC_FULL.md §4.4 step 1). `r` is the raw,
/// pre-hop advertisement, not a flood copy.
pub fn check_end_to_end_latency(
    r: &Reservation,
    delta: &ClassDelayMap,
) -> Result<(), AdmissionError> {
    let accumulated = r.acc_max_delay + delta.get(r.priority).unwrap_or(0);
    if accumulated > r.req_latency {
        return Err(AdmissionError::E2ELatencyViolation {
            req_latency: r.req_latency,
            accumulated,
        });
    }
    Ok(())
}

/// Attempts to admit `candidate` as a subscription from listener
/// `listener_ip` on egress port `port`. On success, commits the state-store
/// mutation (cache updates for affected streams, insertion of `candidate`,
/// and the candidate's own cached worst-case delay) and returns that delay.
/// On failure, the store is left untouched.
///
/// `candidate`'s `acc_min_delay`/`acc_max_delay` must be the stream's
/// *original*, pre-this-hop values (the ones recorded in
/// [`ReservationStore::advertisement`]), not a flood copy's already-advanced
/// values — the delay calculus in [`crate::delay`] adds this hop's Δ budget
/// itself, and passing an already-advanced value would double-count it. The
/// dispatcher is responsible for resolving a subscription PDU back to the
/// original advertisement before calling this function.
pub fn try_admit(
    store: &mut ReservationStore,
    candidate: &Reservation,
    listener_ip: Ipv4Addr,
    port: u16,
    delta: &ClassDelayMap,
    link_speed_bps: u64,
) -> Result<u32, AdmissionError> {
    // Step 2: egress bandwidth check.
    let existing_rate: u64 = store.iter_port(port).map(|(s, _)| s.burst_rate()).sum();
    let requested = candidate.burst_rate();
    if requested + existing_rate > link_speed_bps {
        return Err(AdmissionError::EgressBandwidthExceeded {
            port,
            requested,
            link_speed_bps,
        });
    }

    // Step 3: deployability check against every existing stream on the port.
    let mut updates: Vec<(StreamKey, Ipv4Addr, u32)> = Vec::new();
    for (s_i, listener_i) in store.iter_port(port) {
        let key_i = StreamKey::from(s_i);
        let current = store
            .cache_get(key_i, *listener_i)
            .expect("cache invariant violated: subscribed stream missing a cached delay");

        let new_wcd = if s_i.priority == candidate.priority {
            current + delay::equal_prio_delay(candidate, delta, link_speed_bps)
        } else if s_i.priority < candidate.priority {
            current + delay::higher_prio_delay(candidate, s_i, delta, link_speed_bps)
        } else {
            continue;
        };

        let budget = delta.get(s_i.priority).unwrap_or(0);
        if new_wcd > budget {
            return Err(AdmissionError::DelayGuaranteeViolation { port });
        }
        updates.push((key_i, *listener_i, new_wcd));
    }

    // Step 4: commit. Apply the same updates unconditionally, then insert
    // the candidate and its own worst-case delay.
    for (key_i, listener_i, new_wcd) in updates {
        store.cache_set(key_i, listener_i, new_wcd);
    }

    let existing: Vec<Reservation> = store.iter_port(port).map(|(s, _)| *s).collect();
    let wcd = delay::worst_case_delay(
        candidate,
        existing.iter().chain(std::iter::once(candidate)),
        delta,
        link_speed_bps,
    );
    store.add_subscription(port, *candidate, listener_ip, wcd);

    Ok(wcd)
}
