use serde::Serialize;
use std::collections::HashMap;

use crate::claim::ClaimPlan;
use crate::tuner::{Coefficients, LifeSummary};
use crate::world::AgentId;

/// Frames seen during the current life. `start` is `None` until the first tick.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct LifeWindow {
    pub start: Option<u64>,
    pub end: u64,
}

impl LifeWindow {
    /// Records `frame` and returns the life's first frame.
    pub fn observe(&mut self, frame: u64) -> u64 {
        let start = *self.start.get_or_insert(frame);
        self.end = frame;
        start
    }

    pub fn survived(&self) -> u64 {
        self.start.map_or(0, |start| self.end.saturating_sub(start))
    }
}

/// Everything one bot carries across ticks and lives.
#[derive(Clone, Debug)]
pub struct BotSession {
    portions: HashMap<AgentId, i64>,
    self_id: Option<AgentId>,
    pub coefficients: Coefficients,
    pub aggression: f64,
    pub window: LifeWindow,
    pub plan: ClaimPlan,
    pub lives: u32,
    /// Latest kill count the game client reported this life.
    pub kills_seen: u32,
}

impl BotSession {
    pub fn new(coefficients: Coefficients, aggression: f64) -> Self {
        Self {
            portions: HashMap::new(),
            self_id: None,
            coefficients,
            aggression,
            window: LifeWindow::default(),
            plan: ClaimPlan::default(),
            lives: 0,
            kills_seen: 0,
        }
    }

    pub fn agent_added(&mut self, id: AgentId) {
        self.portions.insert(id, 0);
    }

    pub fn agent_removed(&mut self, id: AgentId) {
        self.portions.remove(&id);
    }

    pub fn set_self(&mut self, id: AgentId) {
        self.self_id = Some(id);
    }

    pub fn ownership_changed(&mut self, before: Option<AgentId>, after: Option<AgentId>) {
        if before == after {
            return;
        }
        if let Some(id) = before {
            *self.portions.entry(id).or_default() -= 1;
        }
        if let Some(id) = after {
            *self.portions.entry(id).or_default() += 1;
        }
    }

    pub fn portion_of(&self, id: AgentId) -> i64 {
        self.portions.get(&id).copied().unwrap_or(0)
    }

    pub fn own_portion(&self) -> i64 {
        self.self_id.map_or(0, |id| self.portion_of(id))
    }

    /// Closes the current life and clears per-life state. The caller mutates
    /// the coefficients from the returned summary.
    pub fn end_life(&mut self, kills: u32) -> LifeSummary {
        let summary = LifeSummary {
            portion: self.own_portion(),
            kills: kills.max(self.kills_seen),
            survival_frames: self.window.survived(),
        };
        self.lives += 1;
        self.reset_life();
        summary
    }

    pub fn reset_life(&mut self) {
        self.window = LifeWindow::default();
        self.plan.clear();
        self.kills_seen = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::world::Heading;

    #[test]
    fn matching_gain_and_loss_events_cancel_out() {
        let mut session = BotSession::new(Coefficients::default(), 0.5);
        session.agent_added(4);
        session.agent_added(9);
        for _ in 0..25 {
            session.ownership_changed(None, Some(4));
        }
        let before = session.portion_of(4);

        for _ in 0..10 {
            session.ownership_changed(Some(9), Some(4));
        }
        for _ in 0..10 {
            session.ownership_changed(Some(4), Some(9));
        }
        assert_eq!(session.portion_of(4), before);
        assert_eq!(session.portion_of(9), 0);
    }

    #[test]
    fn unknown_agents_start_from_zero() {
        let mut session = BotSession::new(Coefficients::default(), 0.5);
        session.ownership_changed(None, Some(77));
        assert_eq!(session.portion_of(77), 1);
        session.agent_removed(77);
        assert_eq!(session.portion_of(77), 0);
        session.agent_added(77);
        assert_eq!(session.portion_of(77), 0);
    }

    #[test]
    fn ending_a_life_reports_and_resets() {
        let mut session = BotSession::new(Coefficients::default(), 0.5);
        session.set_self(1);
        session.agent_added(1);
        for _ in 0..9 {
            session.ownership_changed(None, Some(1));
        }
        assert_eq!(session.window.observe(120), 120);
        assert_eq!(session.window.observe(450), 120);
        session.plan.refill(&[crate::claim::ClaimLeg {
            heading: Heading::Up,
            steps: 3,
        }]);

        let life = session.end_life(2);
        assert_eq!(
            life,
            LifeSummary {
                portion: 9,
                kills: 2,
                survival_frames: 330,
            }
        );
        assert_eq!(session.lives, 1);
        assert!(session.plan.is_empty());

        session.kills_seen = 3;
        assert_eq!(session.end_life(1).kills, 3);
        assert_eq!(session.kills_seen, 0);
        assert_eq!(session.window, LifeWindow::default());
    }
}
