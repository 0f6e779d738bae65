//! Per-language translation fan-out.
//!
//! One translation job per target is enqueued up front, so the languages run
//! concurrently up to the translation queue's worker count.  Results are
//! collected in request order; a failure stays in its own branch.

use std::sync::Arc;

use tokio::time::Instant;

use crate::language::{dedup_preserving_order, Language};
use crate::queue::JobQueue;

use super::error::BranchError;
use super::tasks::{TranslationRequest, TranslationTask};
use super::types::{BranchTimings, TranslationBranch};

pub struct TranslationFanOut {
    queue: Arc<JobQueue<TranslationTask>>,
}

impl TranslationFanOut {
    pub fn new(queue: Arc<JobQueue<TranslationTask>>) -> Self {
        Self { queue }
    }

    /// Translate `text` into every target.  Returns one branch per distinct
    /// target, in input order; an empty target list makes no engine call.
    pub async fn translate_all(
        &self,
        text: &str,
        source: Option<Language>,
        targets: &[Language],
    ) -> Vec<TranslationBranch> {
        let targets = dedup_preserving_order(targets);
        if targets.is_empty() {
            return Vec::new();
        }

        let shared: Arc<str> = Arc::from(text);
        let started = Instant::now();
        let pending: Vec<_> = targets
            .iter()
            .map(|&target| {
                let handle = self.queue.enqueue(TranslationRequest {
                    text: Arc::clone(&shared),
                    target,
                    source,
                });
                (target, handle)
            })
            .collect();

        let mut branches = Vec::with_capacity(pending.len());
        for (target, handle) in pending {
            let (translation, elapsed) = match handle {
                Ok(handle) => {
                    let report = handle.wait().await;
                    (report.outcome.map_err(BranchError::from), report.elapsed)
                }
                Err(e) => (Err(BranchError::from(e)), started.elapsed()),
            };
            if let Err(e) = &translation {
                log::warn!("fan-out: translation to {target} failed: {e}");
            }
            branches.push(TranslationBranch {
                target,
                translation,
                synthesis: None,
                timings: BranchTimings {
                    translation: elapsed,
                    synthesis: None,
                },
            });
        }

        log::info!(
            "fan-out: {}/{} translation(s) succeeded in {:?}",
            branches.iter().filter(|b| b.translation.is_ok()).count(),
            branches.len(),
            started.elapsed()
        );
        branches
    }
}
