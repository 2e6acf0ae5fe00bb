//! Binary-weighted latency increments.

/// Latency increment of each device port, smallest first.
///
/// Port `i` adds `100 << i` units of latency.
pub const LATENCY_TABLE: [(u32, u8); 8] = [
    (100, 0),
    (200, 1),
    (400, 2),
    (800, 3),
    (1600, 4),
    (3200, 5),
    (6400, 6),
    (12800, 7),
];

/// Latency added by one "extend" step.
pub const LATENCY_STEP: u32 = 100;

/// Ports to latch for `latency`, most significant increment first.
///
/// Greedy largest-first: each increment that still fits is taken once. Any
/// remainder that no increment covers (below 100, or beyond the sum of the
/// table) is dropped without error.
///
/// ```
/// assert_eq!(cytec::decompose(2700), vec![4, 3, 1, 0]);
/// assert_eq!(cytec::decompose(150), vec![0]);
/// ```
pub fn decompose(latency: u32) -> Vec<u8> {
    let mut remaining = latency;
    let mut ports = Vec::new();
    for &(increment, port) in LATENCY_TABLE.iter().rev() {
        if remaining >= increment {
            ports.push(port);
            remaining -= increment;
        }
    }
    ports
}
