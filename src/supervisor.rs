use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::client::Connector;
use crate::world::AgentId;

pub const BOT_TAG: &str = "[BOT]";

const DEFAULT_PREFIXES: &str = "Hurtiger Dummer Reicher Baby Crazy Fat Hungry Interesting Kind \
    Little Magic Naive Old Powerful Quiet Rich Superman Undefined Valuable Wifeless Young Zombie";
const DEFAULT_NAMES: &str = "Alice Pius Tobi Benni Bobber Benny Bob Carol Dave Eve Francis Grace \
    Hans Isabella Jason Kate Louis Margaret Nathan Olivia Paul Queen Richard Susan Thomas Uma \
    Vivian Winnie Xander Yasmine Zach";

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NamePool {
    pub prefixes: Vec<String>,
    pub names: Vec<String>,
}

impl Default for NamePool {
    fn default() -> Self {
        let split = |raw: &str| raw.split_whitespace().map(str::to_string).collect();
        Self {
            prefixes: split(DEFAULT_PREFIXES),
            names: split(DEFAULT_NAMES),
        }
    }
}

/// `"[BOT] <name>"`, where `<name>` is the override or a random
/// `"<prefix> <name>"` pair from the pool.
pub fn display_name<R: Rng + ?Sized>(pool: &NamePool, name_override: Option<&str>, rng: &mut R) -> String {
    if let Some(name) = name_override.filter(|n| !n.trim().is_empty()) {
        return format!("{BOT_TAG} {name}");
    }
    let prefix = pool.prefixes.choose(rng).map(String::as_str).unwrap_or("Nameless");
    let name = pool.names.choose(rng).map(String::as_str).unwrap_or("Bot");
    format!("{BOT_TAG} {prefix} {name}")
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryPolicy {
    pub single_agent_ms: u64,
    pub dual_agent_ms: u64,
    pub after_death_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            single_agent_ms: 1_000,
            dual_agent_ms: 5_000,
            after_death_ms: 5_000,
        }
    }
}

impl RetryPolicy {
    pub fn retry_delay(&self, dual_agent: bool) -> Duration {
        Duration::from_millis(if dual_agent {
            self.dual_agent_ms
        } else {
            self.single_agent_ms
        })
    }

    pub fn after_death(&self) -> Duration {
        Duration::from_millis(self.after_death_ms)
    }
}

/// Whole frames covering `delay` at `fps`, rounded up.
pub fn delay_frames(delay: Duration, fps: u64) -> u64 {
    let millis = delay.as_millis() as u64;
    (millis * fps.max(1)).div_ceil(1_000)
}

/// Frame-clocked reconnect state for one seat.
#[derive(Clone, Debug)]
pub struct Reconnector {
    policy: RetryPolicy,
    dual_agent: bool,
    fps: u64,
    next_attempt: Option<u64>,
    pub failures: u32,
    pub joins: u32,
}

impl Reconnector {
    pub fn new(policy: RetryPolicy, dual_agent: bool, fps: u64) -> Self {
        Self {
            policy,
            dual_agent,
            fps,
            next_attempt: Some(0),
            failures: 0,
            joins: 0,
        }
    }

    pub fn next_attempt(&self) -> Option<u64> {
        self.next_attempt
    }

    pub fn is_due(&self, frame: u64) -> bool {
        self.next_attempt.is_some_and(|due| frame >= due)
    }

    pub fn schedule_after_death(&mut self, frame: u64) {
        self.next_attempt = Some(frame + delay_frames(self.policy.after_death(), self.fps));
    }

    /// Tries to join. On failure the next attempt is pushed out by the
    /// retry delay for this seat's mode.
    pub fn attempt<C: Connector + ?Sized>(
        &mut self,
        connector: &mut C,
        endpoint: &str,
        name: &str,
        frame: u64,
    ) -> Option<AgentId> {
        match connector.connect(endpoint, name, self.dual_agent) {
            Ok(id) => {
                self.next_attempt = None;
                self.joins += 1;
                tracing::info!(%name, id, frame, "joined game");
                Some(id)
            }
            Err(err) => {
                let delay = self.policy.retry_delay(self.dual_agent);
                self.failures += 1;
                self.next_attempt = Some(frame + delay_frames(delay, self.fps).max(1));
                tracing::warn!(%name, frame, failures = self.failures, "join failed: {err:#}");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::{bail, Result};
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    struct FlakyConnector {
        failures_left: u32,
        seen_dual: Vec<bool>,
    }

    impl Connector for FlakyConnector {
        fn connect(&mut self, _endpoint: &str, _name: &str, dual_agent: bool) -> Result<AgentId> {
            self.seen_dual.push(dual_agent);
            if self.failures_left > 0 {
                self.failures_left -= 1;
                bail!("server full");
            }
            Ok(42)
        }
    }

    #[test]
    fn names_carry_the_bot_tag() {
        let mut rng = ChaCha8Rng::seed_from_u64(2);
        let pool = NamePool::default();
        let name = display_name(&pool, None, &mut rng);
        assert!(name.starts_with("[BOT] "));
        assert_eq!(name.split(' ').count(), 3);
        assert_eq!(display_name(&pool, Some("Zed"), &mut rng), "[BOT] Zed");
        assert_eq!(display_name(&pool, Some("  "), &mut rng).split(' ').count(), 3);
    }

    #[test]
    fn empty_pools_still_name_the_bot() {
        let mut rng = ChaCha8Rng::seed_from_u64(2);
        let pool = NamePool {
            prefixes: Vec::new(),
            names: Vec::new(),
        };
        assert_eq!(display_name(&pool, None, &mut rng), "[BOT] Nameless Bot");
    }

    #[test]
    fn dual_agent_mode_waits_longer() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.retry_delay(false), Duration::from_millis(1_000));
        assert_eq!(policy.retry_delay(true), Duration::from_millis(5_000));
        assert_eq!(delay_frames(policy.retry_delay(false), 30), 30);
        assert_eq!(delay_frames(Duration::from_millis(10), 30), 1);
    }

    #[test]
    fn failed_joins_retry_without_limit() {
        let mut connector = FlakyConnector {
            failures_left: 3,
            seen_dual: Vec::new(),
        };
        let mut seat = Reconnector::new(RetryPolicy::default(), true, 30);
        let mut frame = 0;
        let mut joined = None;
        while joined.is_none() {
            assert!(seat.is_due(frame));
            joined = seat.attempt(&mut connector, "local", "[BOT] Test", frame);
            if joined.is_none() {
                assert_eq!(seat.next_attempt(), Some(frame + 150));
                frame += 150;
            }
        }
        assert_eq!(joined, Some(42));
        assert_eq!(seat.failures, 3);
        assert!(connector.seen_dual.iter().all(|dual| *dual));
        assert!(!seat.is_due(frame + 1_000));

        seat.schedule_after_death(600);
        assert!(!seat.is_due(749));
        assert!(seat.is_due(750));
    }
}
