//! Surrogate-guided optimizer over a discrete search space.

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use std::cmp::Ordering;
use std::fmt;
use tracing::{debug, info};

use so_surrogate::{Dataset, GbdtParams, GbdtTrainer, Regressor, Trainer};
use so_types::{
    runtime_error, type_error, value_error, Objective, SearchPoint, SpaceOptResult, Value,
};

use crate::config::OptimizerConfig;
use crate::sampler::sample_unevaluated_unique;
use crate::space::{render_block, Space};
use crate::table::{surrogate_error, SpointTable};

/// Candidate pool drawn per proposal.
pub const DEFAULT_SAMPLE_SIZE: usize = 10_000;
pub const DEFAULT_NUM_BOOST_ROUND: usize = 1024;
/// Sampling attempts before giving up on finding new points.
pub const DEFAULT_MAX_NUM_RETRIES: usize = 100;
/// Below this many evaluated points `fit_predict` proposes at random.
pub const MIN_EVALUATED_FOR_FIT: usize = 2;

/// Points proposed for evaluation.
///
/// A request for one point yields [`Proposal::Single`], anything larger a
/// [`Proposal::Batch`]. A batch may hold fewer points than requested when
/// the space is nearly exhausted.
#[derive(Debug, Clone, PartialEq)]
pub enum Proposal {
    Single(SearchPoint),
    Batch(Vec<SearchPoint>),
}

impl Proposal {
    fn from_points(points: Vec<SearchPoint>, num_spoints: usize) -> SpaceOptResult<Self> {
        if num_spoints == 1 {
            points
                .into_iter()
                .next()
                .map(Self::Single)
                .ok_or_else(|| runtime_error!("no spoint available to propose."))
        } else {
            Ok(Self::Batch(points))
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Self::Single(_) => 1,
            Self::Batch(points) => points.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn as_single(&self) -> Option<&SearchPoint> {
        match self {
            Self::Single(point) => Some(point),
            Self::Batch(_) => None,
        }
    }

    pub fn into_single(self) -> Option<SearchPoint> {
        match self {
            Self::Single(point) => Some(point),
            Self::Batch(_) => None,
        }
    }

    pub fn into_vec(self) -> Vec<SearchPoint> {
        match self {
            Self::Single(point) => vec![point],
            Self::Batch(points) => points,
        }
    }
}

/// Proposes points to evaluate and learns from evaluated ones.
///
/// Evaluated points are appended by the caller with
/// [`Optimizer::append_evaluated_spoint`]. Proposals come either from uniform
/// random sampling ([`Optimizer::get_random`]) or from ranking random
/// unevaluated candidates with a surrogate model trained on the history
/// ([`Optimizer::fit_predict`]).
#[derive(Debug, Clone)]
pub struct Optimizer<T: Trainer = GbdtTrainer> {
    space: Space,
    target_name: String,
    objective: Objective,
    /// Objective as spelled by the caller.
    objective_token: String,
    evaluated_spoints: Vec<SearchPoint>,
    rng: ChaCha8Rng,
    trainer: T,
}

impl Optimizer<GbdtTrainer> {
    /// Build an optimizer with the default GBDT surrogate and a random seed.
    pub fn new(space: Space, target_name: &str, objective: &str) -> SpaceOptResult<Self> {
        if target_name.is_empty() {
            return Err(value_error!("target_name is empty."));
        }
        if space.contains_variable(target_name) {
            return Err(runtime_error!(
                "target_name='{target_name}' should not be in search space variables: {:?}.",
                space.variable_names()
            ));
        }
        let objective_token = objective;
        let objective: Objective = objective_token.parse()?;

        Ok(Self {
            space,
            target_name: target_name.to_string(),
            objective,
            objective_token: objective_token.to_string(),
            evaluated_spoints: Vec::new(),
            rng: ChaCha8Rng::seed_from_u64(rand::random()),
            trainer: GbdtTrainer::default(),
        })
    }

    pub fn from_config(config: OptimizerConfig) -> SpaceOptResult<Self> {
        let space = Space::from_json(&config.search_space)?;
        config
            .trainer
            .validate()
            .map_err(|e| value_error!("invalid trainer params: {e}."))?;
        let optimizer = Self::new(space, &config.target_name, &config.objective)?
            .with_trainer_params(config.trainer);
        Ok(match config.seed {
            Some(seed) => optimizer.with_seed(seed),
            None => optimizer,
        })
    }

    pub fn with_trainer_params(self, params: GbdtParams) -> Self {
        self.with_trainer(GbdtTrainer::new(params))
    }

    pub fn trainer_params(&self) -> &GbdtParams {
        self.trainer.params()
    }
}

impl<T: Trainer> Optimizer<T> {
    /// Reseed the optimizer's RNG. Same seed and same calls give the same
    /// proposals.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = ChaCha8Rng::seed_from_u64(seed);
        self
    }

    /// Swap the surrogate engine.
    pub fn with_trainer<U: Trainer>(self, trainer: U) -> Optimizer<U> {
        Optimizer {
            space: self.space,
            target_name: self.target_name,
            objective: self.objective,
            objective_token: self.objective_token,
            evaluated_spoints: self.evaluated_spoints,
            rng: self.rng,
            trainer,
        }
    }

    pub fn space(&self) -> &Space {
        &self.space
    }

    pub fn target_name(&self) -> &str {
        &self.target_name
    }

    pub fn objective(&self) -> Objective {
        self.objective
    }

    pub fn trainer(&self) -> &T {
        &self.trainer
    }

    pub fn evaluated_spoints(&self) -> &[SearchPoint] {
        &self.evaluated_spoints
    }

    pub fn num_evaluated(&self) -> usize {
        self.evaluated_spoints.len()
    }

    /// Record an evaluated point.
    ///
    /// The point must hold a declared value for every variable and a finite
    /// float under the target name. Duplicates are kept.
    pub fn append_evaluated_spoint(&mut self, point: SearchPoint) -> SpaceOptResult<()> {
        self.space.verify_spoint(&point)?;
        match point.get(&self.target_name) {
            None => {
                return Err(value_error!(
                    "spoint={point} is not evaluated, target_name='{}' is not found.",
                    self.target_name
                ))
            }
            Some(Value::Float(y)) if !y.is_finite() => {
                return Err(value_error!(
                    "evaluated_spoint has '{}' with value={y}, but it should be finite.",
                    self.target_name
                ))
            }
            Some(Value::Float(_)) => {}
            Some(other) => {
                return Err(type_error!(
                    "evaluated_spoint has '{}' with value={other} of type {}, \
                     but it should be of type float.",
                    self.target_name,
                    other.vtype()
                ))
            }
        }
        self.evaluated_spoints.push(point);
        Ok(())
    }

    /// Best evaluated point under the objective. Ties keep the earliest.
    pub fn best_evaluated(&self) -> Option<&SearchPoint> {
        let mut best: Option<(&SearchPoint, f64)> = None;
        for point in &self.evaluated_spoints {
            let Some(Value::Float(score)) = point.get(&self.target_name) else {
                continue;
            };
            let improves = match best {
                None => true,
                Some((_, incumbent)) => self.objective.improves(*score, incumbent),
            };
            if improves {
                best = Some((point, *score));
            }
        }
        best.map(|(point, _)| point)
    }

    /// Uniform random points, possibly already evaluated and possibly
    /// repeated.
    pub fn sample_random_spoints(&mut self, sample_size: usize) -> SpaceOptResult<Vec<SearchPoint>> {
        check_positive("sample_size", sample_size)?;
        Ok((0..sample_size)
            .map(|_| self.space.sample(&mut self.rng))
            .collect())
    }

    /// Distinct points not yet evaluated, in random order.
    pub fn sample_unevaluated_unique_spoints(
        &mut self,
        sample_size: usize,
        max_num_retries: usize,
    ) -> SpaceOptResult<Vec<SearchPoint>> {
        check_positive("sample_size", sample_size)?;
        check_positive("max_num_retries", max_num_retries)?;
        sample_unevaluated_unique(
            &self.space,
            &self.evaluated_spoints,
            &mut self.rng,
            sample_size,
            max_num_retries,
        )
    }

    /// Propose `num_spoints` unevaluated points chosen at random from a pool
    /// of `sample_size` candidates.
    pub fn get_random(&mut self, num_spoints: usize, sample_size: usize) -> SpaceOptResult<Proposal> {
        check_positive("num_spoints", num_spoints)?;
        check_positive("sample_size", sample_size)?;
        let mut candidates = self.sample_unevaluated_unique_spoints(
            sample_size.max(num_spoints),
            DEFAULT_MAX_NUM_RETRIES,
        )?;
        candidates.truncate(num_spoints);
        Proposal::from_points(candidates, num_spoints)
    }

    /// Train the surrogate on every evaluated point.
    pub fn fit(&self, num_boost_round: usize) -> SpaceOptResult<T::Model> {
        check_positive("num_boost_round", num_boost_round)?;
        if self.evaluated_spoints.is_empty() {
            return Err(runtime_error!("cannot fit a model without evaluated spoints."));
        }

        let mut table = SpointTable::from_spoints(&self.space, &self.evaluated_spoints)?;
        self.space.encode_variables(&mut table)?;
        let features = table.to_feature_matrix()?;

        let labels = self
            .evaluated_spoints
            .iter()
            .map(|point| match point.get(&self.target_name) {
                Some(Value::Float(y)) => Ok(*y),
                _ => Err(runtime_error!(
                    "evaluated spoint={point} has no float '{}'.",
                    self.target_name
                )),
            })
            .collect::<SpaceOptResult<Vec<f64>>>()?;

        let dataset = Dataset::new(features, labels, &self.space.categorical_indices())
            .map_err(surrogate_error)?;
        self.trainer
            .train(&dataset, num_boost_round)
            .map_err(surrogate_error)
    }

    /// Propose the `num_spoints` most promising unevaluated points.
    ///
    /// A surrogate is trained on the history and scores `sample_size` random
    /// unevaluated candidates; the best-scoring ones under the objective are
    /// returned. With fewer than [`MIN_EVALUATED_FOR_FIT`] evaluated points
    /// this behaves exactly like [`Optimizer::get_random`].
    pub fn fit_predict(
        &mut self,
        num_spoints: usize,
        num_boost_round: usize,
        sample_size: usize,
    ) -> SpaceOptResult<Proposal> {
        check_positive("num_spoints", num_spoints)?;
        check_positive("num_boost_round", num_boost_round)?;
        check_positive("sample_size", sample_size)?;

        if self.evaluated_spoints.len() < MIN_EVALUATED_FOR_FIT {
            debug!(
                evaluated = self.evaluated_spoints.len(),
                "too few evaluated spoints to fit, proposing at random"
            );
            return self.get_random(num_spoints, sample_size);
        }

        let model = self.fit(num_boost_round)?;

        let candidates =
            self.sample_unevaluated_unique_spoints(sample_size, DEFAULT_MAX_NUM_RETRIES)?;
        let mut table = SpointTable::from_spoints(&self.space, &candidates)?;
        self.space.encode_variables(&mut table)?;
        let scores = model.predict(&table.to_feature_matrix()?);
        self.space.decode_variables(&mut table)?;

        let ascending = self.objective.is_ascending();
        let mut order: Vec<usize> = (0..scores.len()).collect();
        order.sort_by(|&a, &b| rank_cmp(scores[a], scores[b], ascending));

        info!(
            evaluated = self.evaluated_spoints.len(),
            candidates = candidates.len(),
            best_predicted = ?order.first().map(|&i| scores[i]),
            objective = %self.objective,
            "ranked candidates with surrogate"
        );

        let mut ranked: Vec<Option<SearchPoint>> =
            table.into_spoints().into_iter().map(Some).collect();
        let top = order
            .into_iter()
            .take(num_spoints)
            .filter_map(|i| ranked[i].take())
            .collect();
        Proposal::from_points(top, num_spoints)
    }
}

/// Order scores best first; NaN always sorts last.
fn rank_cmp(a: f64, b: f64, ascending: bool) -> Ordering {
    match (a.is_nan(), b.is_nan()) {
        (true, true) => Ordering::Equal,
        (true, false) => Ordering::Greater,
        (false, true) => Ordering::Less,
        (false, false) if ascending => a.total_cmp(&b),
        (false, false) => b.total_cmp(&a),
    }
}

fn check_positive(name: &str, value: usize) -> SpaceOptResult<()> {
    if value == 0 {
        return Err(value_error!("{name}={value} should be positive."));
    }
    Ok(())
}

impl<T: Trainer> fmt::Display for Optimizer<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let fields = [
            self.space.to_string(),
            format!("target_name='{}'", self.target_name),
            format!("objective={}", self.objective_token),
        ];
        f.write_str(&render_block("Optimizer", &fields))
    }
}
