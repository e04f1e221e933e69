use std::collections::HashMap;

use anyhow::{Result, anyhow};
use chrono::NaiveDate;
use linfa::prelude::*;
use linfa_trees::DecisionTree;
use ndarray::{Array1, Array2};
use tracing::info;

use crate::error::PipelineError;
use crate::form::{FEATURE_NAMES, FeatureRow};

/// Any binary classifier over the form feature matrix. Labels are 0 or 1.
pub trait Classifier {
    fn name(&self) -> &'static str;
    fn fit(&mut self, features: &Array2<f64>, targets: &Array1<usize>) -> Result<()>;
    fn predict(&self, features: &Array2<f64>) -> Result<Array1<usize>>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum ModelKind {
    #[default]
    Tree,
    Majority,
}

#[derive(Debug, Clone, Copy)]
pub struct TreeParams {
    pub max_depth: Option<usize>,
    pub min_weight_split: f32,
}

impl Default for TreeParams {
    fn default() -> Self {
        Self {
            max_depth: Some(10),
            min_weight_split: 5.0,
        }
    }
}

impl ModelKind {
    pub fn build(self, params: TreeParams) -> Box<dyn Classifier> {
        match self {
            ModelKind::Tree => Box::new(DecisionTreeClassifier::new(params)),
            ModelKind::Majority => Box::new(MajorityClassifier::default()),
        }
    }
}

pub struct DecisionTreeClassifier {
    params: TreeParams,
    model: Option<DecisionTree<f64, usize>>,
}

impl DecisionTreeClassifier {
    pub fn new(params: TreeParams) -> Self {
        Self {
            params,
            model: None,
        }
    }
}

impl Classifier for DecisionTreeClassifier {
    fn name(&self) -> &'static str {
        "decision-tree"
    }

    fn fit(&mut self, features: &Array2<f64>, targets: &Array1<usize>) -> Result<()> {
        let dataset = Dataset::new(features.clone(), targets.clone());
        let model: DecisionTree<f64, usize> = DecisionTree::params()
            .max_depth(self.params.max_depth)
            .min_weight_split(self.params.min_weight_split)
            .fit(&dataset)?;
        self.model = Some(model);
        Ok(())
    }

    fn predict(&self, features: &Array2<f64>) -> Result<Array1<usize>> {
        let model = self
            .model
            .as_ref()
            .ok_or_else(|| anyhow!("decision tree used before fit"))?;
        Ok(model.predict(features))
    }
}

/// Predicts the most frequent training label everywhere.
#[derive(Debug, Default)]
pub struct MajorityClassifier {
    label: Option<usize>,
}

impl Classifier for MajorityClassifier {
    fn name(&self) -> &'static str {
        "majority"
    }

    fn fit(&mut self, _features: &Array2<f64>, targets: &Array1<usize>) -> Result<()> {
        let mut counts: HashMap<usize, usize> = HashMap::new();
        for label in targets {
            *counts.entry(*label).or_insert(0) += 1;
        }
        // ties go to the smaller label
        self.label = counts
            .into_iter()
            .max_by(|a, b| a.1.cmp(&b.1).then(b.0.cmp(&a.0)))
            .map(|(label, _)| label);
        Ok(())
    }

    fn predict(&self, features: &Array2<f64>) -> Result<Array1<usize>> {
        let label = self
            .label
            .ok_or_else(|| anyhow!("majority classifier used before fit"))?;
        Ok(Array1::from_elem(features.nrows(), label))
    }
}

/// Trains on matches before `cutoff`, tests on matches on or after it.
#[derive(Debug, Clone, Copy)]
pub struct TemporalSplit {
    pub cutoff: NaiveDate,
}

impl Default for TemporalSplit {
    fn default() -> Self {
        Self {
            cutoff: NaiveDate::from_ymd_opt(2024, 12, 1).unwrap_or_default(),
        }
    }
}

impl TemporalSplit {
    pub fn split(&self, rows: Vec<FeatureRow>) -> (Vec<FeatureRow>, Vec<FeatureRow>) {
        rows.into_iter()
            .partition(|row| row.row().kickoff.date() < self.cutoff)
    }
}

/// A feature row with its actual and predicted label.
#[derive(Debug, Clone, PartialEq)]
pub struct PredictionRecord {
    pub features: FeatureRow,
    pub actual: u8,
    pub predicted: u8,
}

impl PredictionRecord {
    pub fn is_correct(&self) -> bool {
        self.actual == self.predicted
    }
}

pub fn feature_matrix(rows: &[FeatureRow]) -> Result<Array2<f64>> {
    let flat: Vec<f64> = rows.iter().flat_map(|row| row.features()).collect();
    Ok(Array2::from_shape_vec((rows.len(), FEATURE_NAMES.len()), flat)?)
}

pub fn target_vector(rows: &[FeatureRow]) -> Array1<usize> {
    rows.iter().map(|row| usize::from(row.target())).collect()
}

/// Fits `classifier` on the training side of `split` and labels the test side.
pub fn make_predictions(
    rows: Vec<FeatureRow>,
    split: &TemporalSplit,
    classifier: &mut dyn Classifier,
) -> Result<Vec<PredictionRecord>> {
    let (train, test) = split.split(rows);
    info!(
        train = train.len(),
        test = test.len(),
        cutoff = %split.cutoff,
        model = classifier.name(),
        "Temporal split"
    );

    if train.is_empty() {
        return Err(PipelineError::EmptyPartitionAfterFilter {
            stage: "training split",
        }
        .into());
    }
    if test.is_empty() {
        return Err(PipelineError::EmptyPartitionAfterFilter { stage: "test split" }.into());
    }

    classifier.fit(&feature_matrix(&train)?, &target_vector(&train))?;
    let predicted = classifier.predict(&feature_matrix(&test)?)?;

    Ok(test
        .into_iter()
        .zip(predicted.iter())
        .map(|(features, label)| PredictionRecord {
            actual: features.target(),
            predicted: u8::from(*label == 1),
            features,
        })
        .collect())
}
