use anyhow::Result;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use std::collections::{BTreeMap, VecDeque};

use crate::client::{Connector, GameClient};
use crate::error::EngineError;
use crate::world::{Agent, AgentId, Cell, Grid, Heading};

const SPAWN_ATTEMPTS: u32 = 256;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ArenaEvent {
    Added {
        id: AgentId,
    },
    Removed {
        id: AgentId,
    },
    Ownership {
        cell: Cell,
        before: Option<AgentId>,
        after: Option<AgentId>,
    },
    Died {
        id: AgentId,
        killer: Option<AgentId>,
        kills: u32,
    },
}

#[derive(Clone, Debug)]
struct Player {
    agent: Agent,
    kills: u32,
    pending: Option<Heading>,
}

/// Seeded local game. Agents move one cell every `frames_per_cell` frames;
/// leaving the grid kills the mover, crossing a tail kills its owner, and
/// returning home turns the tail and whatever it encloses into land.
pub struct Arena {
    grid: Grid,
    frames_per_cell: u64,
    players: BTreeMap<AgentId, Player>,
    next_id: AgentId,
    frame: u64,
    rng: ChaCha8Rng,
    events: Vec<ArenaEvent>,
}

impl Arena {
    pub fn new(grid_count: i32, frames_per_cell: u64, seed: u64) -> Self {
        Self {
            grid: Grid::new(grid_count),
            frames_per_cell: frames_per_cell.max(1),
            players: BTreeMap::new(),
            next_id: 1,
            frame: 0,
            rng: ChaCha8Rng::seed_from_u64(seed),
            events: Vec::new(),
        }
    }

    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    pub fn agent(&self, id: AgentId) -> Option<&Agent> {
        self.players.get(&id).map(|p| &p.agent)
    }

    pub fn is_alive(&self, id: AgentId) -> bool {
        self.players.contains_key(&id)
    }

    pub fn kills_of(&self, id: AgentId) -> u32 {
        self.players.get(&id).map_or(0, |p| p.kills)
    }

    pub fn take_events(&mut self) -> Vec<ArenaEvent> {
        std::mem::take(&mut self.events)
    }

    /// Places a new agent on a random free 3x3 block.
    pub fn spawn(&mut self, name: &str) -> Result<AgentId, EngineError> {
        let size = self.grid.size();
        if size < 3 {
            return Err(EngineError::ArenaFull {
                grid_count: size,
                attempts: 0,
            });
        }
        for _ in 0..SPAWN_ATTEMPTS {
            let center = Cell::new(
                self.rng.gen_range(1..size - 1),
                self.rng.gen_range(1..size - 1),
            );
            if self.block_is_free(center) {
                let heading = Heading::from_index(self.rng.gen_range(0..4));
                return self.spawn_at(name, center, heading);
            }
        }
        Err(EngineError::ArenaFull {
            grid_count: size,
            attempts: SPAWN_ATTEMPTS,
        })
    }

    pub fn spawn_at(&mut self, name: &str, center: Cell, heading: Heading) -> Result<AgentId, EngineError> {
        if !self.block_is_free(center) {
            return Err(EngineError::ArenaFull {
                grid_count: self.grid.size(),
                attempts: 1,
            });
        }
        let id = self.next_id;
        self.next_id += 1;
        self.players.insert(
            id,
            Player {
                agent: Agent::new(id, name, center, heading),
                kills: 0,
                pending: None,
            },
        );
        self.events.push(ArenaEvent::Added { id });
        for cell in block(center) {
            self.claim(cell, id);
        }
        tracing::debug!(id, %name, row = center.row, col = center.col, "spawned");
        Ok(id)
    }

    /// Queues a heading for the agent's next move. Reversals are dropped when
    /// the move is applied.
    pub fn steer(&mut self, id: AgentId, heading: Heading) -> Result<(), EngineError> {
        let player = self
            .players
            .get_mut(&id)
            .ok_or(EngineError::UnknownAgent { id })?;
        player.pending = Some(heading);
        Ok(())
    }

    pub fn client(&mut self, id: AgentId) -> ArenaClient<'_> {
        ArenaClient { arena: self, id }
    }

    /// Advances one frame. Agents move in id order on movement frames.
    pub fn step(&mut self) {
        self.frame += 1;
        if self.frame % self.frames_per_cell != 0 {
            return;
        }
        let ids: Vec<AgentId> = self.players.keys().copied().collect();
        for id in ids {
            self.advance(id);
        }
    }

    fn advance(&mut self, id: AgentId) {
        let size = self.grid.size();
        let next = match self.players.get_mut(&id) {
            Some(player) => {
                if let Some(turn) = player.pending.take() {
                    if turn != player.agent.heading.reverse() {
                        player.agent.heading = turn;
                    }
                }
                player.agent.cell.step(player.agent.heading, 1)
            }
            None => return,
        };

        if !next.in_bounds(size) {
            self.kill(id, None);
            return;
        }

        let victims: Vec<AgentId> = self
            .players
            .iter()
            .filter(|(_, p)| p.agent.tail.hits(next))
            .map(|(victim, _)| *victim)
            .collect();
        for victim in victims {
            let killer = (victim != id).then_some(id);
            self.kill(victim, killer);
        }

        let home = self.grid.is_owned_by(next, id);
        let Some(player) = self.players.get_mut(&id) else {
            return;
        };
        player.agent.cell = next;
        if !home {
            player.agent.tail.push(next);
        } else if !player.agent.tail.is_empty() {
            self.capture(id);
        }
    }

    fn kill(&mut self, id: AgentId, killer: Option<AgentId>) {
        let Some(dead) = self.players.remove(&id) else {
            return;
        };
        if let Some(killer) = killer {
            if let Some(hunter) = self.players.get_mut(&killer) {
                hunter.kills += 1;
            }
        }
        tracing::debug!(id, ?killer, frame = self.frame, "agent died");
        self.events.push(ArenaEvent::Died {
            id,
            killer,
            kills: dead.kills,
        });

        let land: Vec<Cell> = self
            .grid
            .cells()
            .filter(|cell| self.grid.is_owned_by(*cell, id))
            .collect();
        for cell in land {
            let before = self.grid.set_owner(cell, None);
            self.events.push(ArenaEvent::Ownership {
                cell,
                before,
                after: None,
            });
        }
        self.events.push(ArenaEvent::Removed { id });
    }

    /// Converts the tail to land, then fills every region the new border
    /// cuts off from the grid edge.
    fn capture(&mut self, id: AgentId) {
        let tail: Vec<Cell> = match self.players.get_mut(&id) {
            Some(player) => {
                let cells = player.agent.tail.cells().to_vec();
                player.agent.tail.clear();
                cells
            }
            None => return,
        };
        for cell in tail {
            self.claim(cell, id);
        }

        let size = self.grid.size();
        let slot = |cell: Cell| (cell.row * size + cell.col) as usize;
        let mut outside = vec![false; (size * size) as usize];
        let mut queue = VecDeque::new();
        for cell in self.grid.cells() {
            let border = cell.row == 0 || cell.col == 0 || cell.row == size - 1 || cell.col == size - 1;
            if border && !self.grid.is_owned_by(cell, id) {
                outside[slot(cell)] = true;
                queue.push_back(cell);
            }
        }
        while let Some(cell) = queue.pop_front() {
            for heading in Heading::ALL {
                let next = cell.step(heading, 1);
                if next.in_bounds(size) && !outside[slot(next)] && !self.grid.is_owned_by(next, id) {
                    outside[slot(next)] = true;
                    queue.push_back(next);
                }
            }
        }

        let enclosed: Vec<Cell> = self
            .grid
            .cells()
            .filter(|cell| !outside[slot(*cell)] && !self.grid.is_owned_by(*cell, id))
            .collect();
        for cell in enclosed {
            self.claim(cell, id);
        }
    }

    fn claim(&mut self, cell: Cell, id: AgentId) {
        let before = self.grid.set_owner(cell, Some(id));
        if before != Some(id) {
            self.events.push(ArenaEvent::Ownership {
                cell,
                before,
                after: Some(id),
            });
        }
    }

    fn block_is_free(&self, center: Cell) -> bool {
        block(center).all(|cell| {
            cell.in_bounds(self.grid.size())
                && self.grid.owner_of(cell).is_none()
                && self
                    .players
                    .values()
                    .all(|p| p.agent.cell != cell && !p.agent.tail.hits(cell))
        })
    }
}

fn block(center: Cell) -> impl Iterator<Item = Cell> {
    (-1..=1).flat_map(move |dr| (-1..=1).map(move |dc| Cell::new(center.row + dr, center.col + dc)))
}

impl Connector for Arena {
    fn connect(&mut self, endpoint: &str, name: &str, dual_agent: bool) -> Result<AgentId> {
        tracing::trace!(%endpoint, %name, dual_agent, "local join");
        Ok(self.spawn(name)?)
    }
}

/// One agent's view of the arena.
pub struct ArenaClient<'a> {
    arena: &'a mut Arena,
    id: AgentId,
}

impl GameClient for ArenaClient<'_> {
    fn grid(&self) -> &Grid {
        &self.arena.grid
    }

    fn me(&self) -> Option<&Agent> {
        self.arena.agent(self.id)
    }

    fn opponents(&self) -> Vec<&Agent> {
        self.arena
            .players
            .iter()
            .filter(|(id, _)| **id != self.id)
            .map(|(_, p)| &p.agent)
            .collect()
    }

    fn kills(&self) -> u32 {
        self.arena.kills_of(self.id)
    }

    fn set_heading(&mut self, heading: Heading) {
        if let Err(err) = self.arena.steer(self.id, heading) {
            tracing::debug!("dropped steering command: {err}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn drive(arena: &mut Arena, id: AgentId, legs: &[(Heading, u32)]) {
        for (heading, steps) in legs {
            arena.steer(id, *heading).expect("agent alive");
            for _ in 0..*steps {
                arena.step();
            }
        }
    }

    #[test]
    fn spawn_claims_a_three_by_three_block() -> Result<()> {
        let mut arena = Arena::new(20, 1, 1);
        let id = arena.spawn("[BOT] Test")?;
        assert_eq!(arena.grid().owned_by(id), 9);
        let events = arena.take_events();
        assert_eq!(events[0], ArenaEvent::Added { id });
        assert_eq!(events.len(), 10);
        Ok(())
    }

    #[test]
    fn crowded_grid_reports_full() -> Result<()> {
        let mut arena = Arena::new(5, 1, 1);
        arena.spawn("a")?;
        assert!(matches!(
            arena.spawn("b"),
            Err(EngineError::ArenaFull { grid_count: 5, .. })
        ));
        Ok(())
    }

    #[test]
    fn grids_smaller_than_a_block_refuse_spawns() {
        for size in [0, 1, 2] {
            let mut arena = Arena::new(size, 1, 1);
            assert!(matches!(
                arena.spawn("tiny"),
                Err(EngineError::ArenaFull { attempts: 0, .. })
            ));
        }
    }

    #[test]
    fn leaving_the_grid_kills() -> Result<()> {
        let mut arena = Arena::new(10, 1, 1);
        let id = arena.spawn_at("edge", Cell::new(1, 1), Heading::Up)?;
        arena.take_events();
        arena.step();
        assert!(arena.is_alive(id));
        arena.step();
        assert!(!arena.is_alive(id));
        assert_eq!(arena.grid().owned_by(id), 0);
        let events = arena.take_events();
        assert!(events.contains(&ArenaEvent::Died {
            id,
            killer: None,
            kills: 0
        }));
        assert_eq!(events.last(), Some(&ArenaEvent::Removed { id }));
        Ok(())
    }

    #[test]
    fn reversal_is_ignored() -> Result<()> {
        let mut arena = Arena::new(20, 1, 1);
        let id = arena.spawn_at("r", Cell::new(10, 10), Heading::Up)?;
        drive(&mut arena, id, &[(Heading::Down, 1)]);
        assert_eq!(arena.agent(id).map(|a| a.cell), Some(Cell::new(9, 10)));
        Ok(())
    }

    #[test]
    fn closing_a_loop_captures_tail_and_interior() -> Result<()> {
        let mut arena = Arena::new(20, 1, 1);
        let id = arena.spawn_at("loop", Cell::new(10, 10), Heading::Up)?;
        drive(
            &mut arena,
            id,
            &[
                (Heading::Up, 3),
                (Heading::Right, 2),
                (Heading::Down, 3),
            ],
        );
        assert_eq!(arena.agent(id).map(|a| a.tail.len()), Some(7));
        drive(&mut arena, id, &[(Heading::Left, 1)]);

        let me = arena.agent(id).expect("still alive");
        assert!(me.tail.is_empty());
        assert!(arena.grid().is_owned_by(Cell::new(8, 11), id));
        assert_eq!(arena.grid().owned_by(id), 9 + 7 + 1);
        Ok(())
    }

    #[test]
    fn crossing_a_tail_kills_its_owner() -> Result<()> {
        let mut arena = Arena::new(30, 1, 1);
        let hunter = arena.spawn_at("hunter", Cell::new(10, 5), Heading::Up)?;
        let prey = arena.spawn_at("prey", Cell::new(6, 8), Heading::Left)?;
        for _ in 0..4 {
            arena.step();
        }
        assert!(arena.is_alive(hunter));
        assert!(!arena.is_alive(prey));
        assert_eq!(arena.kills_of(hunter), 1);
        assert_eq!(arena.grid().owned_by(prey), 0);
        assert!(arena.take_events().contains(&ArenaEvent::Died {
            id: prey,
            killer: Some(hunter),
            kills: 0
        }));
        Ok(())
    }

    #[test]
    fn client_view_hides_self_from_opponents() -> Result<()> {
        let mut arena = Arena::new(20, 1, 3);
        let a = arena.spawn_at("a", Cell::new(3, 3), Heading::Right)?;
        let b = arena.spawn_at("b", Cell::new(15, 15), Heading::Left)?;
        let mut view = arena.client(a);
        assert_eq!(view.me().map(|m| m.id), Some(a));
        let others: Vec<AgentId> = view.opponents().iter().map(|o| o.id).collect();
        assert_eq!(others, vec![b]);
        view.set_heading(Heading::Down);
        arena.step();
        assert_eq!(arena.agent(a).map(|m| m.cell), Some(Cell::new(4, 3)));
        Ok(())
    }
}
