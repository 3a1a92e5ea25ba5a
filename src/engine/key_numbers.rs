//! Fixed table of common NFL victory margins and their empirical frequency
//! as a fraction of all games. Spreads landing near these margins are harder
//! to separate cleanly, so they carry a probability penalty.

pub const KEY_NUMBERS: [(f64, f64); 7] = [
    (3.0, 0.1552),  // field goal
    (7.0, 0.1018),  // touchdown
    (6.0, 0.0701),  // touchdown, no extra point
    (10.0, 0.0688), // field goal + touchdown
    (4.0, 0.0543),
    (14.0, 0.0432), // two touchdowns
    (17.0, 0.0289),
];

/// Sums the frequency weight of every key number within half a point of the
/// spread magnitude. A 2.5 or 3.5 line both "cross" the key number 3; a 5.0
/// line crosses nothing.
pub fn key_number_impact(magnitude: f64) -> f64 {
    KEY_NUMBERS
        .iter()
        .filter(|(key, _)| (magnitude - key).abs() <= 0.5)
        .map(|(_, weight)| weight)
        .sum()
}
