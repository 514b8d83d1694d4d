use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::constants::{
    DEFAULT_CONNECTION_GATE, DEFAULT_CONNECTION_THRESHOLD, MAX_CONNECTION_STRENGTH,
    MIN_CONNECTION_STRENGTH,
};
use crate::projection::ProjectedPosition;

/// Decorative line between two hub markers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Connection {
    pub from: usize,
    pub to: usize,
    pub strength: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConnectionParams {
    /// Pairs at or beyond this distance (percent units) are never linked
    pub threshold: f64,
    /// A pair is kept when its random draw exceeds this value
    pub gate: f64,
}

impl Default for ConnectionParams {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_CONNECTION_THRESHOLD,
            gate: DEFAULT_CONNECTION_GATE,
        }
    }
}

/// Randomly thinned links between nearby markers.
///
/// Pairs are visited in `(i, j)` order with `i < j`, one draw for the gate and
/// one for the strength of each kept pair, so a seeded rng gives a stable result.
pub fn generate_connections<R: Rng + ?Sized>(
    positions: &[ProjectedPosition],
    params: &ConnectionParams,
    rng: &mut R,
) -> Vec<Connection> {
    let mut connections = Vec::new();

    for (i, a) in positions.iter().enumerate() {
        for (j, b) in positions.iter().enumerate().skip(i + 1) {
            // false for a NaN threshold, so nothing gets linked
            let close = a.distance_to(b) < params.threshold;
            if !close {
                continue;
            }
            if rng.gen::<f64>() <= params.gate {
                continue;
            }
            connections.push(Connection {
                from: i,
                to: j,
                strength: rng.gen_range(MIN_CONNECTION_STRENGTH..MAX_CONNECTION_STRENGTH),
            });
        }
    }

    connections
}

/// Seeded when a seed is given, otherwise fresh lines every call.
pub fn connection_rng(seed: Option<u64>) -> StdRng {
    match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cluster() -> Vec<ProjectedPosition> {
        vec![
            ProjectedPosition { x: 10.0, y: 10.0 },
            ProjectedPosition { x: 15.0, y: 12.0 },
            ProjectedPosition { x: 20.0, y: 18.0 },
            ProjectedPosition { x: 90.0, y: 90.0 },
            ProjectedPosition { x: 85.0, y: 80.0 },
        ]
    }

    #[test]
    fn test_same_seed_same_lines() {
        let positions = cluster();
        let params = ConnectionParams::default();

        let first = generate_connections(&positions, &params, &mut connection_rng(Some(7)));
        let second = generate_connections(&positions, &params, &mut connection_rng(Some(7)));
        assert_eq!(first, second);
    }

    #[test]
    fn test_lines_respect_threshold_and_strength_range() {
        let positions = cluster();
        let params = ConnectionParams::default();

        for seed in 0..50u64 {
            let lines = generate_connections(&positions, &params, &mut connection_rng(Some(seed)));
            for line in lines {
                assert!(line.from < line.to);
                let d = positions[line.from].distance_to(&positions[line.to]);
                assert!(d < params.threshold);
                assert!(line.strength >= MIN_CONNECTION_STRENGTH);
                assert!(line.strength < MAX_CONNECTION_STRENGTH);
            }
        }
    }

    #[test]
    fn test_open_gate_keeps_every_close_pair() {
        let positions = cluster();
        let params = ConnectionParams { threshold: 30.0, gate: -1.0 };

        let lines = generate_connections(&positions, &params, &mut connection_rng(Some(1)));
        let pairs: Vec<(usize, usize)> = lines.iter().map(|c| (c.from, c.to)).collect();
        assert_eq!(pairs, vec![(0, 1), (0, 2), (1, 2), (3, 4)]);
    }

    #[test]
    fn test_nan_threshold_links_nothing() {
        let positions = vec![
            ProjectedPosition { x: 2.0, y: 2.0 },
            ProjectedPosition { x: 98.0, y: 98.0 },
        ];
        let params = ConnectionParams { threshold: f64::NAN, gate: -1.0 };

        let lines = generate_connections(&positions, &params, &mut connection_rng(Some(3)));
        assert!(lines.is_empty());
    }

    #[test]
    fn test_gate_one_keeps_nothing() {
        let positions = cluster();
        let params = ConnectionParams { threshold: 30.0, gate: 1.0 };

        let lines = generate_connections(&positions, &params, &mut connection_rng(Some(1)));
        assert!(lines.is_empty());
    }

    #[test]
    fn test_roughly_forty_percent_survive_the_gate() {
        let positions: Vec<_> = (0..40)
            .map(|i| ProjectedPosition { x: 40.0 + (i % 8) as f64, y: 40.0 + (i / 8) as f64 })
            .collect();
        let params = ConnectionParams::default();

        let lines = generate_connections(&positions, &params, &mut connection_rng(Some(42)));
        let pairs = 40 * 39 / 2;
        let ratio = lines.len() as f64 / pairs as f64;
        assert!((0.3..0.5).contains(&ratio), "ratio = {ratio}");
    }
}
