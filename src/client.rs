use anyhow::Result;

use crate::tuner::LifeSummary;
use crate::world::{Agent, AgentId, Cell, Grid, Heading};

/// Read access to the hosted game plus the single steering command.
pub trait GameClient {
    fn grid(&self) -> &Grid;
    /// `None` while the controlled agent is not (or no longer) on the board.
    fn me(&self) -> Option<&Agent>;
    fn opponents(&self) -> Vec<&Agent>;
    /// Kills credited to the controlled agent during the current life.
    fn kills(&self) -> u32;
    fn set_heading(&mut self, heading: Heading);
}

/// Lifecycle callbacks, delivered serially by the host.
pub trait GameEvents {
    fn on_agent_added(&mut self, id: AgentId);
    fn on_agent_removed(&mut self, id: AgentId);
    fn on_set_self(&mut self, id: AgentId);
    fn on_tick(&mut self, frame: u64, client: &mut dyn GameClient);
    fn on_ownership_changed(&mut self, cell: Cell, before: Option<AgentId>, after: Option<AgentId>);
    /// The life is over; returns what the life achieved.
    fn on_disconnect(&mut self, kills: u32) -> LifeSummary;
}

pub trait Connector {
    /// Joins the game at `endpoint` under `name`, returning the controlled agent.
    fn connect(&mut self, endpoint: &str, name: &str, dual_agent: bool) -> Result<AgentId>;
}
