//! Pipeline stage machine and per-stage timing.
//!
//! [`PipelineStage`] names where a run currently is; [`StageTracker`] walks
//! a run through the stages, refusing backward moves, and records how long
//! each stage took.

use std::time::Duration;

use tokio::time::Instant;

// ---------------------------------------------------------------------------
// PipelineStage
// ---------------------------------------------------------------------------

/// Stages of one pipeline run.
///
/// ```text
/// Detecting ──▶ FaningOutTranslation ──▶ Synthesizing ──▶ Aggregating ──▶ Done
///     │                  └───────(text mode)────────────▶ Aggregating
///     └──fatal detection failure──▶ Failed
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PipelineStage {
    Detecting,
    FaningOutTranslation,
    Synthesizing,
    Aggregating,
    Done,
    Failed,
}

impl PipelineStage {
    /// Whether `self → next` is a legal transition.
    ///
    /// ```
    /// use voice_translator::pipeline::PipelineStage;
    ///
    /// assert!(PipelineStage::Detecting.can_advance_to(PipelineStage::FaningOutTranslation));
    /// assert!(PipelineStage::FaningOutTranslation.can_advance_to(PipelineStage::Aggregating));
    /// assert!(!PipelineStage::Aggregating.can_advance_to(PipelineStage::Synthesizing));
    /// assert!(!PipelineStage::Done.can_advance_to(PipelineStage::Failed));
    /// ```
    pub fn can_advance_to(&self, next: PipelineStage) -> bool {
        use PipelineStage::*;
        matches!(
            (*self, next),
            (Detecting, FaningOutTranslation)
                | (Detecting, Failed)
                | (FaningOutTranslation, Synthesizing)
                | (FaningOutTranslation, Aggregating)
                | (Synthesizing, Aggregating)
                | (Aggregating, Done)
        )
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, PipelineStage::Done | PipelineStage::Failed)
    }

    pub fn label(&self) -> &'static str {
        match self {
            PipelineStage::Detecting => "detecting",
            PipelineStage::FaningOutTranslation => "translating",
            PipelineStage::Synthesizing => "synthesizing",
            PipelineStage::Aggregating => "aggregating",
            PipelineStage::Done => "done",
            PipelineStage::Failed => "failed",
        }
    }
}

// ---------------------------------------------------------------------------
// StageTracker
// ---------------------------------------------------------------------------

/// Walks one run through its stages and times them.
#[derive(Debug)]
pub struct StageTracker {
    stage: PipelineStage,
    run_started: Instant,
    stage_started: Instant,
    finished: Vec<(PipelineStage, Duration)>,
}

impl StageTracker {
    /// Start a run in [`PipelineStage::Detecting`].
    pub fn start() -> Self {
        let now = Instant::now();
        log::debug!("pipeline: → {}", PipelineStage::Detecting.label());
        Self {
            stage: PipelineStage::Detecting,
            run_started: now,
            stage_started: now,
            finished: Vec::new(),
        }
    }

    pub fn stage(&self) -> PipelineStage {
        self.stage
    }

    /// Close the current stage and enter `next`.  Illegal transitions are
    /// ignored and logged; the tracker stays where it was.
    pub fn advance(&mut self, next: PipelineStage) -> bool {
        if !self.stage.can_advance_to(next) {
            log::error!(
                "pipeline: refused transition {} → {}",
                self.stage.label(),
                next.label()
            );
            return false;
        }
        let now = Instant::now();
        self.finished.push((self.stage, now - self.stage_started));
        log::debug!("pipeline: {} → {}", self.stage.label(), next.label());
        self.stage = next;
        self.stage_started = now;
        true
    }

    /// Time spent in a completed stage, if the run passed through it.
    pub fn duration_of(&self, stage: PipelineStage) -> Option<Duration> {
        self.finished
            .iter()
            .find(|(s, _)| *s == stage)
            .map(|(_, d)| *d)
    }

    /// Time since [`start`](Self::start).
    pub fn total(&self) -> Duration {
        self.run_started.elapsed()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use PipelineStage::*;

    const ALL: [PipelineStage; 6] = [
        Detecting,
        FaningOutTranslation,
        Synthesizing,
        Aggregating,
        Done,
        Failed,
    ];

    #[test]
    fn terminal_stages_have_no_exits() {
        for from in [Done, Failed] {
            assert!(from.is_terminal());
            assert!(ALL.iter().all(|to| !from.can_advance_to(*to)));
        }
    }

    #[test]
    fn only_detection_can_fail() {
        for from in ALL {
            assert_eq!(from.can_advance_to(Failed), from == Detecting);
        }
    }

    #[test]
    fn no_stage_advances_to_itself() {
        assert!(ALL.iter().all(|s| !s.can_advance_to(*s)));
    }

    #[test]
    fn labels_are_distinct() {
        let labels: std::collections::HashSet<_> = ALL.iter().map(|s| s.label()).collect();
        assert_eq!(labels.len(), ALL.len());
    }

    #[tokio::test(start_paused = true)]
    async fn tracker_times_each_stage() {
        let mut t = StageTracker::start();
        tokio::time::sleep(Duration::from_millis(30)).await;
        assert!(t.advance(FaningOutTranslation));
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(t.advance(Aggregating));
        assert!(t.advance(Done));

        assert_eq!(t.stage(), Done);
        assert!(t.duration_of(Detecting).unwrap() >= Duration::from_millis(30));
        assert!(t.duration_of(FaningOutTranslation).unwrap() >= Duration::from_millis(50));
        assert_eq!(t.duration_of(Synthesizing), None);
        assert!(t.total() >= Duration::from_millis(80));
    }

    #[tokio::test(start_paused = true)]
    async fn tracker_refuses_backward_moves() {
        let mut t = StageTracker::start();
        assert!(t.advance(FaningOutTranslation));
        assert!(!t.advance(Detecting));
        assert_eq!(t.stage(), FaningOutTranslation);
    }
}
