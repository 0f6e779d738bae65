//! Optional per-branch speech synthesis.

use std::sync::Arc;

use crate::queue::JobQueue;

use super::error::BranchError;
use super::tasks::{SynthesisRequest, SynthesisTask};
use super::types::{ResponseMode, TranslationBranch};

pub struct SynthesisStage {
    queue: Arc<JobQueue<SynthesisTask>>,
}

impl SynthesisStage {
    pub fn new(queue: Arc<JobQueue<SynthesisTask>>) -> Self {
        Self { queue }
    }

    /// Attach synthesized audio to every translated branch.
    ///
    /// With [`ResponseMode::Text`] the branches are returned untouched.
    /// Branches whose translation failed are skipped.
    pub async fn synthesize_all(
        &self,
        mut branches: Vec<TranslationBranch>,
        mode: ResponseMode,
    ) -> Vec<TranslationBranch> {
        if !mode.wants_synthesis() {
            return branches;
        }

        let pending: Vec<_> = branches
            .iter()
            .enumerate()
            .filter_map(|(idx, branch)| {
                let text = branch.translated_text()?;
                let handle = self.queue.enqueue(SynthesisRequest {
                    text: text.to_string(),
                    language: branch.target,
                });
                Some((idx, handle))
            })
            .collect();

        for (idx, handle) in pending {
            let (outcome, elapsed) = match handle {
                Ok(handle) => {
                    let report = handle.wait().await;
                    (report.outcome.map_err(BranchError::from), report.elapsed)
                }
                Err(e) => (Err(BranchError::from(e)), Default::default()),
            };
            let branch = &mut branches[idx];
            if let Err(e) = &outcome {
                log::warn!("synthesis: {} failed: {e}", branch.target);
            }
            branch.synthesis = Some(outcome);
            branch.timings.synthesis = Some(elapsed);
        }

        branches
    }
}
