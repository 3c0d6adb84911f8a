use crate::step::Step;
use std::sync::Arc;

/// Ordered list of steps run for every record. Steps run sequentially
/// within a record; each may depend on values produced by earlier ones.
#[derive(Clone, Default)]
pub struct StepPipeline {
    steps: Vec<Arc<dyn Step>>,
}

impl StepPipeline {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_step(mut self, step: impl Step + 'static) -> Self {
        self.steps.push(Arc::new(step));
        self
    }

    pub fn steps(&self) -> &[Arc<dyn Step>] {
        &self.steps
    }
}

impl FromIterator<Arc<dyn Step>> for StepPipeline {
    fn from_iter<I: IntoIterator<Item = Arc<dyn Step>>>(iter: I) -> Self {
        Self {
            steps: iter.into_iter().collect(),
        }
    }
}
