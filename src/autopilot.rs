use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use crate::client::{GameClient, GameEvents};
use crate::config::{BotConfig, GameConstants, Policy};
use crate::sampling::sample_heading;
use crate::session::BotSession;
use crate::territory::{
    blend_scores, claim_threshold, next_claim_step, ray_march, select_mode, Mode,
};
use crate::tuner::{mutate, LifeSummary, MutationReport};
use crate::weighting::{direction_scores, CooperationRule};
use crate::world::{render_ascii, AgentId, Cell, Heading, Snapshot};

/// "Act every `divisor`-th frame", phased so the first acting frame is the
/// one right after the life's first observed frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TickSchedule {
    pub divisor: u64,
}

impl TickSchedule {
    pub fn new(divisor: u64) -> Self {
        Self {
            divisor: divisor.max(1),
        }
    }

    pub fn should_act(&self, frame: u64, life_start: u64) -> bool {
        frame % self.divisor == (life_start + 1) % self.divisor
    }
}

pub struct Autopilot<R: Rng = ChaCha8Rng> {
    config: BotConfig,
    constants: GameConstants,
    schedule: TickSchedule,
    session: BotSession,
    rng: R,
    last_mode: Option<Mode>,
    last_mutation: Option<MutationReport>,
}

impl Autopilot<ChaCha8Rng> {
    pub fn new(config: BotConfig, constants: GameConstants, seed: u64) -> Self {
        Self::with_rng(config, constants, ChaCha8Rng::seed_from_u64(seed))
    }
}

impl<R: Rng> Autopilot<R> {
    pub fn with_rng(config: BotConfig, constants: GameConstants, mut rng: R) -> Self {
        let aggression = match config.aggression {
            Some(fixed) => fixed.clamp(0.0, 1.0),
            None => rng.gen::<f64>(),
        };
        let session = BotSession::new(config.coefficients, aggression);
        Self {
            schedule: TickSchedule::new(constants.tick_divisor),
            config,
            constants,
            session,
            rng,
            last_mode: None,
            last_mutation: None,
        }
    }

    pub fn config(&self) -> &BotConfig {
        &self.config
    }

    pub fn session(&self) -> &BotSession {
        &self.session
    }

    pub fn last_mode(&self) -> Option<Mode> {
        self.last_mode
    }

    pub fn last_mutation(&self) -> Option<&MutationReport> {
        self.last_mutation.as_ref()
    }

    /// Picks the next heading for `snapshot`, independent of tick cadence.
    /// Returns `None` when the snapshot puts the bot off the grid.
    pub fn decide(&mut self, snapshot: &Snapshot<'_>) -> Option<Heading> {
        let me = snapshot.me;
        if !me.cell.in_bounds(self.constants.grid_count) {
            tracing::trace!(row = me.cell.row, col = me.cell.col, "stale position, skipping tick");
            return None;
        }

        let cfg = &self.config;
        let coop = CooperationRule {
            marker: &cfg.cooperative_marker,
            discount: cfg.cooperative_discount,
        };
        let session = &mut self.session;

        let heading = match cfg.policy {
            Policy::FeatureWeighted => {
                let scores = direction_scores(
                    snapshot,
                    &self.constants,
                    &session.coefficients,
                    session.aggression,
                    &coop,
                );
                sample_heading(&scores, me.heading, &mut self.rng)
            }
            Policy::Territorial => {
                let portion = session.portion_of(me.id);
                let threshold = claim_threshold(
                    cfg.claim_threshold_base,
                    cfg.claim_threshold_spread,
                    self.constants.area(),
                    &mut self.rng,
                );
                let mode = select_mode(snapshot.owns(me.cell), portion, threshold);
                if self.last_mode != Some(mode) {
                    tracing::debug!(bot = %me.name, ?mode, portion, threshold, "mode change");
                }
                self.last_mode = Some(mode);

                match mode {
                    Mode::Claiming => next_claim_step(
                        &mut session.plan,
                        me.heading,
                        &session.coefficients,
                        self.constants.grid_count as u32,
                        &mut self.rng,
                    ),
                    Mode::InTerritory | Mode::OutsideCaution => {
                        session.plan.clear();
                        let weights = if mode == Mode::InTerritory {
                            &cfg.in_territory
                        } else {
                            &cfg.caution
                        };
                        let ray = ray_march(snapshot, weights, &self.constants, &coop);
                        let scores = if cfg.feature_blend == 0.0 {
                            ray
                        } else {
                            let features = direction_scores(
                                snapshot,
                                &self.constants,
                                &session.coefficients,
                                session.aggression,
                                &coop,
                            );
                            blend_scores(&ray, &features, cfg.feature_blend)
                        };
                        sample_heading(&scores, me.heading, &mut self.rng)
                    }
                }
            }
        };
        Some(heading)
    }
}

impl<R: Rng> GameEvents for Autopilot<R> {
    fn on_agent_added(&mut self, id: AgentId) {
        self.session.agent_added(id);
    }

    fn on_agent_removed(&mut self, id: AgentId) {
        self.session.agent_removed(id);
    }

    fn on_set_self(&mut self, id: AgentId) {
        self.session.set_self(id);
    }

    fn on_tick(&mut self, frame: u64, client: &mut dyn GameClient) {
        let life_start = self.session.window.observe(frame);
        self.session.kills_seen = client.kills();
        if !self.schedule.should_act(frame, life_start) {
            return;
        }

        let decision = {
            let Some(me) = client.me() else {
                return;
            };
            let opponents = client.opponents();
            let snapshot = Snapshot {
                grid: client.grid(),
                me,
                opponents: &opponents,
            };
            tracing::trace!(frame, board = %render_ascii(&snapshot), "acting tick");
            self.decide(&snapshot)
        };
        if let Some(heading) = decision {
            client.set_heading(heading);
        }
    }

    fn on_ownership_changed(&mut self, _cell: Cell, before: Option<AgentId>, after: Option<AgentId>) {
        self.session.ownership_changed(before, after);
    }

    fn on_disconnect(&mut self, kills: u32) -> LifeSummary {
        let life = self.session.end_life(kills);
        let report = mutate(&mut self.session.coefficients, &life, &mut self.rng);
        tracing::info!(
            bot = %self.config.id,
            life = self.session.lives,
            portion = life.portion,
            kills = life.kills,
            survived = life.survival_frames,
            fitness = report.fitness,
            strength = report.strength,
            "life ended"
        );
        self.last_mode = None;
        self.last_mutation = Some(report);
        life
    }
}
