//! Ordered, named pipeline stages.
//!
//! Stages run strictly in order. The first failure stops the pipeline and
//! is reported by stage name; later stages never run.

use anyhow::Result;
use thiserror::Error;
use tracing::{error, info};

use crate::batch::run_batch;
use crate::config::PipelineConfig;
use crate::prepare::{add_regimes, build_features, label_features, StageSummary};

#[derive(Debug, Error)]
pub enum StageError {
    #[error("stage '{stage}' failed: {message}")]
    Failed {
        stage: &'static str,
        message: String,
        /// Stages that finished before the failure.
        completed: Vec<&'static str>,
    },
}

type StageFn<'a> = Box<dyn Fn() -> Result<String> + 'a>;

struct Stage<'a> {
    name: &'static str,
    run: StageFn<'a>,
}

/// One finished stage and its one-line result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageReport {
    pub name: &'static str,
    pub detail: String,
}

#[derive(Default)]
pub struct Pipeline<'a> {
    stages: Vec<Stage<'a>>,
}

impl<'a> Pipeline<'a> {
    pub fn new() -> Self {
        Self { stages: Vec::new() }
    }

    /// Append a stage. `run` returns a short description of what it did.
    pub fn stage(mut self, name: &'static str, run: impl Fn() -> Result<String> + 'a) -> Self {
        self.stages.push(Stage {
            name,
            run: Box::new(run),
        });
        self
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.stages.iter().map(|s| s.name).collect()
    }

    pub fn run(&self) -> Result<Vec<StageReport>, StageError> {
        let mut reports = Vec::with_capacity(self.stages.len());
        for stage in &self.stages {
            info!(stage = stage.name, "starting step");
            match (stage.run)() {
                Ok(detail) => {
                    info!(stage = stage.name, detail = %detail, "completed step");
                    reports.push(StageReport {
                        name: stage.name,
                        detail,
                    });
                }
                Err(e) => {
                    error!(stage = stage.name, error = %format!("{e:#}"), "stopping pipeline");
                    return Err(StageError::Failed {
                        stage: stage.name,
                        message: format!("{e:#}"),
                        completed: reports.iter().map(|r: &StageReport| r.name).collect(),
                    });
                }
            }
        }
        Ok(reports)
    }
}

fn describe(summary: &StageSummary) -> String {
    format!(
        "{} file(s) processed, {} skipped",
        summary.processed(),
        summary.skipped()
    )
}

/// features (optional) → regime → label → backtest.
pub fn standard_pipeline(config: &PipelineConfig, with_features: bool) -> Pipeline<'_> {
    let mut pipeline = Pipeline::new();
    if with_features {
        pipeline = pipeline.stage("features", move || Ok(describe(&build_features(config)?)));
    }
    pipeline
        .stage("regime", move || Ok(describe(&add_regimes(config)?)))
        .stage("label", move || Ok(describe(&label_features(config)?)))
        .stage("backtest", move || {
            let report = run_batch(config)?;
            Ok(format!(
                "{} symbol(s) completed, {} failed",
                report.completed(),
                report.failed()
            ))
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    #[test]
    fn stages_run_in_order() {
        let log = RefCell::new(Vec::new());
        let reports = Pipeline::new()
            .stage("a", || {
                log.borrow_mut().push("a");
                Ok("did a".into())
            })
            .stage("b", || {
                log.borrow_mut().push("b");
                Ok("did b".into())
            })
            .run()
            .unwrap();
        assert_eq!(*log.borrow(), ["a", "b"]);
        assert_eq!(reports[1].detail, "did b");
    }

    #[test]
    fn first_failure_stops_the_rest() {
        let ran_last = RefCell::new(false);
        let err = Pipeline::new()
            .stage("ok", || Ok(String::new()))
            .stage("boom", || anyhow::bail!("disk full"))
            .stage("never", || {
                *ran_last.borrow_mut() = true;
                Ok(String::new())
            })
            .run()
            .unwrap_err();
        let StageError::Failed {
            stage,
            message,
            completed,
        } = err;
        assert_eq!(stage, "boom");
        assert!(message.contains("disk full"));
        assert_eq!(completed, ["ok"]);
        assert!(!*ran_last.borrow());
    }

    #[test]
    fn standard_pipeline_layout() {
        let cfg = PipelineConfig::default();
        assert_eq!(
            standard_pipeline(&cfg, true).names(),
            ["features", "regime", "label", "backtest"]
        );
        assert_eq!(standard_pipeline(&cfg, false).names(), ["regime", "label", "backtest"]);
    }
}
