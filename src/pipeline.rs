//! Batch computation of action-angle-frequency tables for every dataset and potential

use crate::actions::ActionSolver;
use crate::cache::CacheLayout;
use crate::config::Config;
use crate::data::DatasetRegistry;
use crate::error::PipelineError;
use crate::pool::PoolTrait;
use crate::potential::PotentialRegistry;

use itertools::Itertools;
use std::path::PathBuf;

/// One dataset–potential pair and the file its AAF table goes to
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Task {
    pub dataset: String,
    pub potential: String,
    pub output: PathBuf,
}

/// Pairs whose AAF file is missing, or all pairs if `overwrite` is set
pub fn generate_tasks(
    datasets: &DatasetRegistry,
    potentials: &PotentialRegistry,
    layout: &CacheLayout,
    overwrite: bool,
) -> Vec<Task> {
    let potential_names: Vec<&str> = potentials.names().collect();
    datasets
        .names()
        .cartesian_product(potential_names)
        .map(|(dataset, potential)| Task {
            dataset: dataset.to_owned(),
            potential: potential.to_owned(),
            output: layout.aaf_path(dataset, potential),
        })
        .filter(|task| overwrite || !task.output.exists())
        .collect()
}

pub struct ActionPipeline<S> {
    config: Config,
    datasets: DatasetRegistry,
    potentials: PotentialRegistry,
    solver: S,
}

impl<S> ActionPipeline<S>
where
    S: ActionSolver,
{
    pub fn new(
        config: Config,
        datasets: DatasetRegistry,
        potentials: PotentialRegistry,
        solver: S,
    ) -> Self {
        Self {
            config,
            datasets,
            potentials,
            solver,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn tasks(&self, overwrite: bool) -> Vec<Task> {
        generate_tasks(
            &self.datasets,
            &self.potentials,
            &self.config.cache,
            overwrite,
        )
    }

    /// Compute and write the AAF table of a single task, returning the written path
    pub fn compute(&self, task: &Task) -> Result<PathBuf, PipelineError> {
        let dataset = self.datasets.get(&task.dataset)?;
        let w = self.config.frame.transform(dataset.observations());
        let potential = self.potentials.get(&task.potential)?;
        let aaf = self
            .solver
            .actions(potential, &w)?
            .with_ids(dataset.ids().clone())?;
        aaf.write_fits_atomically(&task.output)
            .map_err(|source| PipelineError::Write {
                path: task.output.clone(),
                source,
            })?;
        tracing::debug!(
            "{} stars of {} in {} written to {}",
            aaf.len(),
            task.dataset,
            task.potential,
            task.output.display()
        );
        Ok(task.output.clone())
    }

    /// Compute every pending task with `pool`, returning the number of files written
    pub fn run<P>(&self, pool: &P, overwrite: bool) -> Result<usize, PipelineError>
    where
        P: PoolTrait,
    {
        let tasks = self.tasks(overwrite);
        tracing::info!(
            "{} task(s) to compute on {} worker(s)",
            tasks.len(),
            pool.size()
        );
        let written = pool.map(|task| self.compute(&task), tasks)?;
        tracing::info!("{} AAF file(s) written", written.len());
        Ok(written.len())
    }
}
