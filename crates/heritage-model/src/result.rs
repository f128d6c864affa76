//! What a random forest fit hands back besides the forest itself.

use crate::forest::RandomForest;
use crate::importance::RankedFeature;
use crate::oob::OobScore;

/// Shape of a completed forest fit.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct TrainingMetadata {
    /// Trees in the ensemble.
    pub n_trees: usize,
    /// Training rows.
    pub n_samples: usize,
    /// Feature columns.
    pub n_features: usize,
    /// Features tried per split after resolving [`MaxFeatures`](crate::MaxFeatures).
    pub max_features: usize,
    /// Rows drawn with replacement for each tree.
    pub draw_count: usize,
    /// Mean depth over all trees.
    pub mean_depth: f64,
    /// Mean leaf count over all trees.
    pub mean_leaves: f64,
}

/// A fitted forest with its importances and optional out-of-bag score.
#[derive(Debug, Clone)]
pub struct RandomForestResult {
    pub(crate) forest: RandomForest,
    pub(crate) importances: Vec<RankedFeature>,
    pub(crate) oob_score: Option<OobScore>,
    pub(crate) metadata: TrainingMetadata,
}

impl RandomForestResult {
    /// Borrow the fitted forest.
    #[must_use]
    pub fn forest(&self) -> &RandomForest {
        &self.forest
    }

    /// Take the fitted forest, dropping the rest.
    #[must_use]
    pub fn into_forest(self) -> RandomForest {
        self.forest
    }

    /// Ranked mean-decrease-in-impurity importances.
    #[must_use]
    pub fn importances(&self) -> &[RankedFeature] {
        &self.importances
    }

    /// Out-of-bag score, present when [`OobMode::Enabled`](crate::OobMode::Enabled).
    #[must_use]
    pub fn oob_score(&self) -> Option<&OobScore> {
        self.oob_score.as_ref()
    }

    #[must_use]
    pub fn metadata(&self) -> &TrainingMetadata {
        &self.metadata
    }
}
