//! Worst-case queuing delay calculus under strict-priority scheduling.
//!
//! Every function here is pure: given a handful of `Reservation`s and the
//! class delay budget Δ, it returns a delay in microseconds. None of them
//! touch the state store; `store` and `admission` decide which streams to
//! feed through them and what to do with the result.

use std::collections::HashMap;

use crate::reservation::Reservation;
use crate::units::{ceil_div_u128, ceil_div_u64};

/// The maximum-MTU frame size (bytes) used for the lower-priority blocking
/// term, per SPEC_FULL.md §4.2.
const MAX_MTU_BYTES: u64 = 1530;

/// Per-hop maximum queuing delay allotted to a priority class, in
/// microseconds. Immutable once constructed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassDelayMap(HashMap<u32, u32>);

impl ClassDelayMap {
    /// The canonical Δ table: {7: 500, 6: 1000, 5: 2000, 4: 5000} us.
    pub fn standard() -> Self {
        let mut m = HashMap::new();
        m.insert(7, 500);
        m.insert(6, 1000);
        m.insert(5, 2000);
        m.insert(4, 5000);
        ClassDelayMap(m)
    }

    /// Looks up the budget for a priority class. `None` for any priority
    /// outside the admitted set {4,5,6,7}.
    pub fn get(&self, priority: u32) -> Option<u32> {
        self.0.get(&priority).copied()
    }
}

fn d_max(x: &Reservation, delta: &ClassDelayMap) -> i64 {
    x.acc_max_delay as i64 + delta.get(x.priority).unwrap_or(0) as i64
}

/// Takes `bits` as `u128`: a pathological-but-decodable PDU (near-max
/// `burst_size`, `acc_max_delay` and a `burst_interval` of 1) can drive `y *
/// burst_size * 8` past `u64::MAX` well before the `* 1_000_000` below, so
/// callers widen at the multiplication site rather than here. Saturates to
/// `u32::MAX` rather than panicking: a valid frame must never crash the
/// dispatcher.
fn bits_to_micros(bits: u128, link_speed_bps: u64) -> u32 {
    let delay = ceil_div_u128(bits * 1_000_000, link_speed_bps as u128);
    u32::try_from(delay).unwrap_or(u32::MAX)
}

/// `y(x, i) = ceil((D_max(x) - D_min(i) + delta[priority(i)]) / tau(x))`
fn calc_y(x: &Reservation, i: &Reservation, delta: &ClassDelayMap) -> u64 {
    let delta_i = delta.get(i.priority).unwrap_or(0) as i64;
    let numerator = d_max(x, delta) - i.acc_min_delay as i64 + delta_i;
    let numerator = numerator.max(0) as u64;
    ceil_div_u64(numerator, x.burst_interval as u64)
}

/// `z(x) = ceil((D_max(x) - D_min(x)) / tau(x))`
fn calc_z(x: &Reservation, delta: &ClassDelayMap) -> u64 {
    let numerator = d_max(x, delta) - x.acc_min_delay as i64;
    let numerator = numerator.max(0) as u64;
    ceil_div_u64(numerator, x.burst_interval as u64)
}

/// The worst-case delay a higher-priority stream `x` imposes on an observed
/// lower-priority stream `i`, in microseconds.
pub fn higher_prio_delay(
    x: &Reservation,
    i: &Reservation,
    delta: &ClassDelayMap,
    link_speed_bps: u64,
) -> u32 {
    let y = calc_y(x, i, delta);
    bits_to_micros(y as u128 * x.burst_size as u128 * 8, link_speed_bps)
}

/// The worst-case delay an equal-priority stream `x` imposes on any other
/// stream of the same priority class (including itself), in microseconds.
pub fn equal_prio_delay(x: &Reservation, delta: &ClassDelayMap, link_speed_bps: u64) -> u32 {
    let z = calc_z(x, delta);
    bits_to_micros(z as u128 * x.burst_size as u128 * 8, link_speed_bps)
}

/// The single maximum-MTU blocking term a lower-priority frame already in
/// flight can impose, added exactly once per candidate stream.
pub fn low_blocking(link_speed_bps: u64) -> u32 {
    bits_to_micros(MAX_MTU_BYTES as u128 * 8, link_speed_bps)
}

/// The worst-case delay for candidate stream `i` on port `p`, assuming `i`
/// itself is among `others` (the full set of streams deployed on `p`,
/// including `i`). See SPEC_FULL.md §4.2.
pub fn worst_case_delay<'a>(
    i: &Reservation,
    others: impl Iterator<Item = &'a Reservation>,
    delta: &ClassDelayMap,
    link_speed_bps: u64,
) -> u32 {
    let mut total = low_blocking(link_speed_bps);
    for x in others {
        if x.priority > i.priority {
            total += higher_prio_delay(x, i, delta, link_speed_bps);
        } else if x.priority == i.priority {
            total += equal_prio_delay(x, delta, link_speed_bps);
        }
    }
    total
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv4Addr;

    fn stream(priority: u32, burst_size: u32, burst_interval: u32, acc_max: u32, acc_min: u32) -> Reservation {
        Reservation::new(
            5000,
            priority,
            Ipv4Addr::new(192, 168, 1, 10),
            Ipv4Addr::new(192, 168, 1, 20),
            1000,
            1000,
            100,
            1500,
            burst_size,
            burst_interval,
            acc_min,
            acc_max,
        )
    }

    #[test]
    fn low_blocking_matches_max_mtu_at_100mbps() {
        // ceil(1530*8 * 1e6 / 1e8) = ceil(122.4) = 123
        assert_eq!(low_blocking(100_000_000), 123);
    }

    #[test]
    fn equal_prio_delay_scenario_one() {
        let delta = ClassDelayMap::standard();
        let x = stream(7, 1500, 1000, 500, 1);
        // D_max = 500 + 500 = 1000, D_min = 1, z = ceil(999/1000) = 1
        // delay = ceil(1 * 1500 * 8 * 1e6 / 1e8) = 120
        let d = equal_prio_delay(&x, &delta, 100_000_000);
        assert_eq!(d, 120);
    }

    #[test]
    fn worst_case_delay_boundary_single_stream_meets_budget() {
        let delta = ClassDelayMap::standard();
        let i = stream(7, 1500, 1000, 0, 0);
        let all = vec![i];
        let wcd = worst_case_delay(&i, all.iter(), &delta, 100_000_000);
        assert!(wcd <= delta.get(7).unwrap());
    }

    #[test]
    fn equal_prio_delay_saturates_instead_of_panicking_on_extreme_shape() {
        let delta = ClassDelayMap::standard();
        // Near-max burst_size/acc_max_delay with a burst_interval of 1 drives
        // y/z and the bits product well past u64::MAX before scaling by
        // 1_000_000; this must saturate, not panic or wrap.
        let x = stream(4, u32::MAX, 1, u32::MAX, 0);
        assert_eq!(equal_prio_delay(&x, &delta, 100_000_000), u32::MAX);
        assert_eq!(higher_prio_delay(&x, &x, &delta, 100_000_000), u32::MAX);
    }

    #[test]
    fn higher_prio_starves_lower_per_scenario_four() {
        let delta = ClassDelayMap::standard();
        // A priority-7 stream with a tight burst_interval arrives on a port
        // already carrying a priority-4 stream: the priority-4 budget (5000us)
        // must be blown by the higher-priority interference alone.
        let x = stream(7, 1500, 10, 0, 0);
        let i = stream(4, 1500, 1000, 0, 0);
        let delay = higher_prio_delay(&x, &i, &delta, 100_000_000);
        let eq = equal_prio_delay(&i, &delta, 100_000_000);
        let total = low_blocking(100_000_000) + delay + eq;
        assert!(total > delta.get(4).unwrap());
    }
}
