//! Drives evaluation over a dataset.
//!
//! Every sample is scored independently. Workers fold samples into a [`PartialEvaluation`]
//! (summed confusion matrix plus a bounded worst-K candidate set) and partials are merged
//! pairwise. Both merges are commutative and associative, so the outcome does not depend
//! on how the dataset was split or in which order workers finished.

use std::{num::NonZeroUsize, sync::Arc};

use burn::tensor::backend::Backend;
use image::RgbImage;
use rayon::prelude::*;
use segdiag_metric::{ClassIou, ClassMap, ClassRegistry, ConfusionMatrix};

use crate::{
    error::{EvalError, EvalResult, SampleResult},
    predictor::Predictor,
    sample::SampleSource,
    selector::WorstCaseSelector,
    summary::{DatasetSummary, SkippedSample},
};

/// A scored sample, kept only while it is among the worst K.
#[derive(Debug, Clone)]
pub struct EvaluatedCase {
    /// Position in the dataset.
    pub index: usize,
    pub sample_id: String,
    pub image: RgbImage,
    pub prediction: ClassMap,
    pub ground_truth: ClassMap,
    pub class_iou: ClassIou,
    /// Mean over classes with a defined IoU.
    pub mean_iou: Option<f64>,
}

/// Result of a full evaluation pass.
#[derive(Debug, Clone)]
pub struct EvaluationOutcome {
    pub summary: DatasetSummary,
    /// At most K cases, ascending by mean IoU, ties by dataset index.
    pub worst_cases: Vec<EvaluatedCase>,
}

/// Evaluation state for a contiguous or scattered subset of the dataset.
#[derive(Debug, Clone)]
pub struct PartialEvaluation {
    confusion: ConfusionMatrix,
    observations: Vec<u64>,
    evaluated: usize,
    ranked: usize,
    skipped: Vec<SkippedSample>,
    candidates: WorstCaseSelector<EvaluatedCase>,
}

impl PartialEvaluation {
    pub fn new(num_classes: usize, worst_k: NonZeroUsize) -> Self {
        Self {
            confusion: ConfusionMatrix::new(num_classes),
            observations: vec![0; num_classes],
            evaluated: 0,
            ranked: 0,
            skipped: Vec::new(),
            candidates: WorstCaseSelector::with_capacity(worst_k),
        }
    }

    /// Folds one successfully scored sample in.
    fn record(&mut self, case: EvaluatedCase, confusion: &ConfusionMatrix) -> EvalResult<()> {
        self.confusion.merge(confusion)?;
        for (class, _) in case.class_iou.defined() {
            if let Some(count) = self.observations.get_mut(class) {
                *count += 1;
            }
        }
        self.evaluated += 1;

        match case.mean_iou {
            Some(mean_iou) => {
                self.ranked += 1;
                self.candidates.offer(mean_iou, case.index, case);
            }
            None => {
                tracing::debug!(
                    sample = %case.sample_id,
                    "no class defined, excluded from ranking"
                );
            }
        }
        Ok(())
    }

    fn skip(&mut self, index: usize, sample_id: String, reason: String) {
        tracing::warn!(index, sample = %sample_id, %reason, "skipping sample");
        self.skipped.push(SkippedSample {
            index,
            sample_id,
            reason,
        });
    }

    /// Combines two partials built for the same class count and K.
    pub fn merge(mut self, other: Self) -> EvalResult<Self> {
        self.confusion.merge(&other.confusion)?;
        for (total, count) in self.observations.iter_mut().zip(&other.observations) {
            *total += count;
        }
        self.evaluated += other.evaluated;
        self.ranked += other.ranked;
        self.skipped.extend(other.skipped);
        self.candidates.merge(other.candidates);
        Ok(self)
    }

    fn finish(self, total_samples: usize) -> EvaluationOutcome {
        let summary = DatasetSummary::new(
            total_samples,
            self.evaluated,
            self.ranked,
            self.skipped,
            self.confusion,
            self.observations,
        );
        let worst_cases = self
            .candidates
            .into_sorted()
            .into_iter()
            .map(|ranked| ranked.item)
            .collect();
        EvaluationOutcome {
            summary,
            worst_cases,
        }
    }
}

/// Scores every sample of a [`SampleSource`] with an injected [`Predictor`].
pub struct CaseAggregator<'a, B: Backend, P: Predictor<B>> {
    registry: Arc<ClassRegistry>,
    predictor: &'a P,
    device: B::Device,
    worst_k: NonZeroUsize,
}

impl<'a, B: Backend, P: Predictor<B>> CaseAggregator<'a, B, P> {
    pub fn new(
        registry: Arc<ClassRegistry>,
        predictor: &'a P,
        device: B::Device,
        worst_k: usize,
    ) -> EvalResult<Self> {
        let worst_k = NonZeroUsize::new(worst_k).ok_or_else(|| EvalError::InvalidConfiguration {
            reason: "worst-case count must be at least 1".to_string(),
        })?;
        Ok(Self {
            registry,
            predictor,
            device,
            worst_k,
        })
    }

    pub fn registry(&self) -> &ClassRegistry {
        &self.registry
    }

    /// Predicts and scores one sample.
    pub fn evaluate_case<S: SampleSource + ?Sized>(
        &self,
        source: &S,
        index: usize,
    ) -> SampleResult<(EvaluatedCase, ConfusionMatrix)> {
        let num_classes = self.registry.len();
        let sample = source.load(index)?;
        let prediction = self
            .predictor
            .predict(&sample.id, &sample.image, &self.device)?
            .into_class_map(num_classes)?;

        let confusion = ConfusionMatrix::from_maps(&sample.ground_truth, &prediction, num_classes)?;
        let class_iou = confusion.per_class_iou();
        let mean_iou = class_iou.mean();

        let case = EvaluatedCase {
            index,
            sample_id: sample.id,
            image: sample.image,
            prediction,
            ground_truth: sample.ground_truth,
            class_iou,
            mean_iou,
        };
        Ok((case, confusion))
    }

    fn observe<S: SampleSource + ?Sized>(
        &self,
        mut partial: PartialEvaluation,
        source: &S,
        index: usize,
    ) -> EvalResult<PartialEvaluation> {
        match self.evaluate_case(source, index) {
            Ok((case, confusion)) => partial.record(case, &confusion)?,
            Err(e) => partial.skip(index, source.sample_id(index), e.to_string()),
        }
        Ok(partial)
    }

    fn empty_partial(&self) -> PartialEvaluation {
        PartialEvaluation::new(self.registry.len(), self.worst_k)
    }

    /// Evaluates the dataset on the calling thread.
    pub fn run<S: SampleSource + ?Sized>(&self, source: &S) -> EvalResult<EvaluationOutcome> {
        tracing::info!(samples = source.len(), k = self.worst_k.get(), "evaluating sequentially");
        let mut partial = self.empty_partial();
        for index in 0..source.len() {
            partial = self.observe(partial, source, index)?;
        }
        Ok(self.finish(partial, source.len()))
    }

    /// Evaluates the dataset on a rayon pool of `workers` threads (0 picks rayon's default).
    ///
    /// Produces exactly the same outcome as [`run`](Self::run).
    pub fn run_parallel<S: SampleSource + ?Sized>(
        &self,
        source: &S,
        workers: usize,
    ) -> EvalResult<EvaluationOutcome> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(workers)
            .build()
            .map_err(|e| EvalError::InvalidConfiguration {
                reason: format!("failed to build worker pool: {e}"),
            })?;
        tracing::info!(
            samples = source.len(),
            k = self.worst_k.get(),
            workers = pool.current_num_threads(),
            "evaluating in parallel",
        );

        let partial = pool.install(|| {
            (0..source.len())
                .into_par_iter()
                .try_fold(
                    || self.empty_partial(),
                    |partial, index| self.observe(partial, source, index),
                )
                .try_reduce(|| self.empty_partial(), PartialEvaluation::merge)
        })?;

        Ok(self.finish(partial, source.len()))
    }

    fn finish(&self, partial: PartialEvaluation, total_samples: usize) -> EvaluationOutcome {
        let outcome = partial.finish(total_samples);
        tracing::info!(
            evaluated = outcome.summary.evaluated,
            skipped = outcome.summary.skipped_count,
            mean_iou = ?outcome.summary.mean_iou,
            retained = outcome.worst_cases.len(),
            "evaluation finished",
        );
        outcome
    }
}
