use indicatif::{ProgressBar, ProgressStyle};
use rand::{Rng, SeedableRng, rngs::StdRng};
use tracing::info;

use crate::{
    data::table::{FeatureTable, PriceSeries},
    error::{DataError, DynaqResult, LearnError},
    learner::{
        action::{Action, LegalActions},
        best_case::BestCaseLedger,
        config::TrainConfig,
        experience::ExperienceLog,
        policy::Policy,
        portfolio::{Portfolio, step_reward},
        state::{State, StateKey},
        value_table::ValueTable,
    },
};

/// Planning sweeps per known state key after each real episode.
const PLANNING_PER_STATE: usize = 4;

/// The Dyna-Q training engine.
///
/// Each call to [`Trainer::train`] interleaves real episodes over the feature table with
/// planning sweeps that replay recorded experience from best-case portfolio snapshots. The
/// value table, experience log, and best-case ledger persist across episodes; the portfolio
/// is reset to `initial_cash` at the start of every episode.
///
/// All randomness (exploration draws, Q-seeding, planning samples) flows through one seeded
/// RNG, so a fixed [`TrainConfig::seed`] reproduces the full training trajectory.
#[derive(Debug)]
pub struct Trainer {
    cfg: TrainConfig,
    features: FeatureTable,
    prices: PriceSeries,
    q: ValueTable,
    experience: ExperienceLog,
    best_case: BestCaseLedger,
    rng: StdRng,
}

impl Trainer {
    pub fn new(features: FeatureTable, prices: PriceSeries, cfg: TrainConfig) -> DynaqResult<Self> {
        cfg.validate()?;
        if features.num_states() != prices.len() {
            return Err(DataError::RowCountMismatch {
                features: features.num_states(),
                prices: prices.len(),
            }
            .into());
        }

        Ok(Self {
            cfg,
            features,
            prices,
            q: ValueTable::default(),
            experience: ExperienceLog::default(),
            best_case: BestCaseLedger::default(),
            rng: StdRng::seed_from_u64(cfg.seed),
        })
    }

    /// Runs `episodes` real episodes, each followed by a planning phase whose budget is
    /// recomputed as `known states × 4`, so planning effort scales with table growth.
    #[tracing::instrument(skip(self))]
    pub fn train(&mut self, episodes: usize) -> DynaqResult<()> {
        let bar = progress_bar(episodes as u64)?;
        bar.set_message("training");

        for episode in 0..episodes {
            let final_value = self.run_episode()?;
            let budget = self.q.state_count() * PLANNING_PER_STATE;
            self.plan(budget)?;

            info!(
                episode,
                final_value,
                planning_budget = budget,
                states = self.q.state_count(),
                "episode finished"
            );
            bar.inc(1);
        }

        bar.finish_with_message("training finished");
        Ok(())
    }

    /// One pass over the feature table, acting ε-greedily, learning from real transitions.
    /// Returns the portfolio value at the terminal index.
    fn run_episode(&mut self) -> DynaqResult<f64> {
        let mut portfolio = Portfolio::with_cash(self.cfg.initial_cash);
        let mut state = State::initial(&self.features)?;
        let mut key = state.key();

        self.q
            .initialize(&key, &state.legal_actions(), &mut self.rng);
        self.best_case.observe(0, key.clone(), portfolio);

        while state.has_next(&self.features) {
            let action = self.choose_action(&key)?;
            self.experience.record(state.index(), key.clone(), action);

            // Two-step valuation: snapshot before acting, execute at the departure close,
            // then mark to the arrival close. The reward spans both steps.
            let prev_value = portfolio.value();
            portfolio.apply(action, self.prices.close(state.index())?);

            let next = state.next(action, &self.features)?;
            portfolio.revalue(self.prices.close(next.index())?);
            let reward = step_reward(prev_value, portfolio.value())?;

            let next_key = next.key();
            self.q
                .initialize(&next_key, &next.legal_actions(), &mut self.rng);
            self.q.update(
                &key,
                action,
                &next_key,
                reward,
                self.cfg.alpha,
                self.cfg.gamma,
            )?;
            self.best_case.observe(next.index(), next_key.clone(), portfolio);

            state = next;
            key = next_key;
        }

        Ok(portfolio.value())
    }

    /// The planning phase: replays up to `iterations` sampled `(index, state, action)`
    /// triples against their best-case portfolio snapshots and applies the same Bellman
    /// update as real experience. Stops early once the log runs dry.
    ///
    /// Planning reads the experience log but never writes it, and touches no live episode
    /// portfolio. It may improve the best-case ledger at arrival states.
    fn plan(&mut self, iterations: usize) -> DynaqResult<()> {
        for _ in 0..iterations {
            let Some((index, key, action)) = self.experience.sample(&mut self.rng) else {
                return Ok(());
            };

            let state = State::from_key(index, key);
            let mut portfolio =
                self.best_case
                    .get(index, key)
                    .ok_or_else(|| LearnError::MissingBestCase {
                        index,
                        key: key.canonical(),
                    })?;

            let prev_value = portfolio.value();
            portfolio.apply(action, self.prices.close(index)?);

            let next = state.next(action, &self.features)?;
            portfolio.revalue(self.prices.close(next.index())?);
            let reward = step_reward(prev_value, portfolio.value())?;

            let next_key = next.key();
            self.q
                .initialize(&next_key, &next.legal_actions(), &mut self.rng);
            self.q.update(
                key,
                action,
                &next_key,
                reward,
                self.cfg.alpha,
                self.cfg.gamma,
            )?;
            self.best_case.observe(next.index(), next_key, portfolio);
        }
        Ok(())
    }

    /// ε-greedy selection. The exploration draw happens on every step; when it fires and
    /// more than one action is legal, the pick is uniform over the non-greedy legal actions.
    fn choose_action(&mut self, key: &StateKey) -> DynaqResult<Action> {
        let greedy = self.q.greedy_action(key)?;
        let legal = key.legal_actions();

        if self.rng.random_bool(self.cfg.p_explore) && legal.len() > 1 {
            let alternatives: LegalActions =
                legal.into_iter().filter(|action| *action != greedy).collect();
            let pick = self.rng.random_range(0..alternatives.len());
            return Ok(alternatives[pick]);
        }
        Ok(greedy)
    }

    pub fn config(&self) -> &TrainConfig {
        &self.cfg
    }

    pub fn value_table(&self) -> &ValueTable {
        &self.q
    }

    pub fn experience(&self) -> &ExperienceLog {
        &self.experience
    }

    pub fn best_case(&self) -> &BestCaseLedger {
        &self.best_case
    }

    /// The greedy policy over everything learned so far.
    pub fn policy(&self) -> DynaqResult<Policy> {
        self.q.export_policy()
    }
}

// ================================================================================================
// Helper Functions
// ================================================================================================
fn progress_bar(capacity: u64) -> DynaqResult<ProgressBar> {
    let bar = ProgressBar::new(capacity);
    bar.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta_precise}) {msg}")
            .map_err(LearnError::ProgressBar)?
            .progress_chars("#>-"));
    Ok(bar)
}
