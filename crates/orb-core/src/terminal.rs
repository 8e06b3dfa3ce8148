//! Decorative terminal feeds shown around the orb.
//!
//! Each feed replays a fixed script forever: clear, print lines one by one
//! with a jittered gap, pause, repeat. Scheduling is pure over an injected
//! RNG so the driver decides how to wait.

use std::time::Duration;

use rand::Rng;
use serde::Serialize;

const STAGGER_MS: u64 = 1_000;
const LINE_GAP_MS: (u64, u64) = (400, 1_000);
const PAUSE_MS: (u64, u64) = (3_000, 8_000);

pub struct TerminalScript {
    pub id: &'static str,
    pub lines: &'static [&'static str],
}

pub static SCRIPTS: [TerminalScript; 4] = [
    TerminalScript {
        id: "neural",
        lines: &[
            "> python neural_pathways.py --init",
            "Loading cognitive mesh... ✓",
            "> health_check --neural",
            "Memory: 2.1GB | CPU: 45% | Status: OK",
            "> runtime --neural --verbose",
            "Processing cognitive responses...",
            "Building neural traits...",
            "Status: ACTIVE | Uptime: 2h 34m",
        ],
    },
    TerminalScript {
        id: "quantum",
        lines: &[
            "> quantum_mesh --version",
            "Quantum Mesh 1.17.0",
            "> rpc --endpoint https://nexus.quantum.solana.com",
            "Connecting to Quantum RPC... ✓",
            "> health_check --quantum",
            "Network: 99.8% | Nodes: 2,847 | Status: SYNCING",
            "> runtime --quantum --monitor",
            "Analyzing quantum patterns...",
            "Status: SYNCING | Block: 245,678,901",
        ],
    },
    TerminalScript {
        id: "cognitive",
        lines: &[
            "> cognitive_lattice --start",
            "Initializing cognitive connections...",
            "> health_check --cognitive",
            "Synapses: 847,392 | Signals: 1.2M/s | Status: OK",
            "> runtime --cognitive --optimize",
            "Mapping cognitive pathways...",
            "Calibrating cognitive frequencies...",
            "Status: PROCESSING | Efficiency: 94.2%",
        ],
    },
    TerminalScript {
        id: "oracle",
        lines: &[
            "> oracle_core --scan",
            "Scanning oracle layers...",
            "> health_check --oracle",
            "Oracle: 78% | Visions: 156 patterns | Status: OK",
            "> runtime --oracle --learn",
            "Analyzing prophetic patterns...",
            "Updating oracle matrix...",
            "Status: LEARNING | Visions: 1,247",
        ],
    },
];

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "action", content = "text", rename_all = "snake_case")]
pub enum TerminalAction {
    Clear,
    Line(String),
}

/// Wait `delay`, then perform `action`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TerminalEvent {
    pub delay: Duration,
    pub action: TerminalAction,
}

pub struct TerminalFeed {
    index: usize,
    script: &'static TerminalScript,
    started: bool,
    cursor: usize,
}

impl TerminalFeed {
    /// Feed for the `index`-th terminal. Later terminals start later.
    pub fn new(index: usize) -> Option<Self> {
        SCRIPTS.get(index).map(|script| Self {
            index,
            script,
            started: false,
            cursor: 0,
        })
    }

    pub fn id(&self) -> &'static str {
        self.script.id
    }

    pub fn next_event(&mut self, rng: &mut impl Rng) -> TerminalEvent {
        if !self.started {
            self.started = true;
            return TerminalEvent {
                delay: Duration::from_millis(STAGGER_MS * (self.index as u64 + 1)),
                action: TerminalAction::Clear,
            };
        }

        if self.cursor < self.script.lines.len() {
            let delay = if self.cursor == 0 {
                Duration::ZERO
            } else {
                line_gap(rng)
            };
            let line = self.script.lines[self.cursor].to_string();
            self.cursor += 1;
            return TerminalEvent {
                delay,
                action: TerminalAction::Line(line),
            };
        }

        self.cursor = 0;
        let pause = Duration::from_millis(rng.random_range(PAUSE_MS.0..=PAUSE_MS.1));
        TerminalEvent {
            delay: line_gap(rng) + pause,
            action: TerminalAction::Clear,
        }
    }
}

fn line_gap(rng: &mut impl Rng) -> Duration {
    Duration::from_millis(rng.random_range(LINE_GAP_MS.0..=LINE_GAP_MS.1))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::SmallRng;

    #[test]
    fn test_unknown_terminal() {
        assert!(TerminalFeed::new(SCRIPTS.len()).is_none());
    }

    #[test]
    fn test_staggered_start() {
        let mut rng = SmallRng::seed_from_u64(7);
        for i in 0..SCRIPTS.len() {
            let mut feed = TerminalFeed::new(i).unwrap();
            let first = feed.next_event(&mut rng);
            assert_eq!(first.action, TerminalAction::Clear);
            assert_eq!(first.delay, Duration::from_millis(1_000 * (i as u64 + 1)));
        }
    }

    #[test]
    fn test_cycle_prints_script_then_pauses() {
        let mut rng = SmallRng::seed_from_u64(42);
        let mut feed = TerminalFeed::new(0).unwrap();
        feed.next_event(&mut rng);

        let lines = SCRIPTS[0].lines;
        for (i, expected) in lines.iter().enumerate() {
            let ev = feed.next_event(&mut rng);
            assert_eq!(ev.action, TerminalAction::Line(expected.to_string()));
            if i == 0 {
                assert_eq!(ev.delay, Duration::ZERO);
            } else {
                assert!((400..=1_000).contains(&(ev.delay.as_millis() as u64)));
            }
        }

        let pause = feed.next_event(&mut rng);
        assert_eq!(pause.action, TerminalAction::Clear);
        let ms = pause.delay.as_millis() as u64;
        assert!((3_400..=9_000).contains(&ms), "pause {ms}ms");

        let again = feed.next_event(&mut rng);
        assert_eq!(again.action, TerminalAction::Line(lines[0].to_string()));
    }

    #[test]
    fn test_scripts_non_empty() {
        for s in &SCRIPTS {
            assert!(!s.lines.is_empty(), "{}", s.id);
        }
    }
}
