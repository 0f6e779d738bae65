//! Pipeline orchestrator: detection → translation fan-out → synthesis.
//!
//! [`Pipeline`] owns one job queue per engine and the three stages built on
//! them.  A run never fails because of a single language: only a fatal
//! detection failure (or cancellation) turns into a [`PipelineError`].

use std::sync::Arc;

use serde::Serialize;
use tokio::task::JoinHandle;

use crate::ports::{SynthesisPort, TranscriptionPort, TranslationPort};
use crate::queue::{CancelToken, JobQueue, QueueSettings, QueueStats};

use super::detector::{DetectionSettings, LanguageDetector};
use super::error::PipelineError;
use super::fan_out::TranslationFanOut;
use super::state::{PipelineStage, StageTracker};
use super::synthesis::SynthesisStage;
use super::tasks::{SynthesisTask, TranscriptionTask, TranslationTask};
use super::types::{AudioJob, PipelineResult, PipelineTimings};

// ---------------------------------------------------------------------------
// Construction inputs
// ---------------------------------------------------------------------------

/// Engine implementations injected by the process bootstrap.
#[derive(Clone)]
pub struct EnginePorts {
    pub transcription: Arc<dyn TranscriptionPort>,
    pub translation: Arc<dyn TranslationPort>,
    pub synthesis: Arc<dyn SynthesisPort>,
}

/// Detection rule plus sizing and retry policy of each queue.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PipelineSettings {
    pub detection: DetectionSettings,
    pub transcription_queue: QueueSettings,
    pub translation_queue: QueueSettings,
    pub synthesis_queue: QueueSettings,
}

/// Per-queue counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PipelineQueueStats {
    pub transcription: QueueStats,
    pub translation: QueueStats,
    pub synthesis: QueueStats,
}

// ---------------------------------------------------------------------------
// Pipeline
// ---------------------------------------------------------------------------

pub struct Pipeline {
    transcription: Arc<JobQueue<TranscriptionTask>>,
    translation: Arc<JobQueue<TranslationTask>>,
    synthesis: Arc<JobQueue<SynthesisTask>>,
    detector: LanguageDetector,
    fan_out: TranslationFanOut,
    synthesizer: SynthesisStage,
}

impl Pipeline {
    /// Build the queues and stages.  Must be called inside a tokio runtime.
    pub fn new(ports: EnginePorts, settings: PipelineSettings) -> Self {
        let transcription = Arc::new(JobQueue::new(
            "transcription",
            TranscriptionTask::new(ports.transcription),
            settings.transcription_queue,
        ));
        let translation = Arc::new(JobQueue::new(
            "translation",
            TranslationTask::new(ports.translation),
            settings.translation_queue,
        ));
        let synthesis = Arc::new(JobQueue::new(
            "synthesis",
            SynthesisTask::new(ports.synthesis),
            settings.synthesis_queue,
        ));

        Self {
            detector: LanguageDetector::new(Arc::clone(&transcription), settings.detection),
            fan_out: TranslationFanOut::new(Arc::clone(&translation)),
            synthesizer: SynthesisStage::new(Arc::clone(&synthesis)),
            transcription,
            translation,
            synthesis,
        }
    }

    /// Run one job to completion.
    ///
    /// Dropping the returned future cancels every job it still has in
    /// flight.
    pub async fn run(&self, job: &AudioJob) -> Result<PipelineResult, PipelineError> {
        log::info!(
            "pipeline: {} byte(s) of audio → {} target(s), mode {}",
            job.audio().len(),
            job.targets().len(),
            job.mode()
        );
        let mut stages = StageTracker::start();

        let detection = match self
            .detector
            .detect(job.shared_audio(), job.source_hint())
            .await
        {
            Ok(detection) => detection,
            Err(e) => {
                stages.advance(PipelineStage::Failed);
                log::error!("pipeline: detection failed: {e}");
                return Err(e);
            }
        };

        stages.advance(PipelineStage::FaningOutTranslation);
        let mut branches = self
            .fan_out
            .translate_all(&detection.text, Some(detection.language), job.targets())
            .await;

        if job.mode().wants_synthesis() {
            stages.advance(PipelineStage::Synthesizing);
            branches = self.synthesizer.synthesize_all(branches, job.mode()).await;
        }

        stages.advance(PipelineStage::Aggregating);
        let failed = branches.iter().filter(|b| b.is_failed()).count();
        if failed > 0 {
            log::warn!(
                "pipeline: {failed} of {} language(s) failed",
                branches.len()
            );
        }
        stages.advance(PipelineStage::Done);

        let timings = PipelineTimings {
            detection: stages.duration_of(PipelineStage::Detecting).unwrap_or_default(),
            translation: stages
                .duration_of(PipelineStage::FaningOutTranslation)
                .unwrap_or_default(),
            synthesis: stages.duration_of(PipelineStage::Synthesizing),
            aggregation: stages.duration_of(PipelineStage::Aggregating).unwrap_or_default(),
            total: stages.total(),
        };
        log::info!(
            "pipeline: done in {:?} (detected {}, {} branch(es))",
            timings.total,
            detection.language,
            branches.len()
        );

        Ok(PipelineResult {
            detection,
            branches,
            timings,
        })
    }

    /// [`run`](Self::run), abandoned with [`PipelineError::Cancelled`] as
    /// soon as `cancel` fires.  In-flight jobs are cancelled.
    pub async fn run_cancellable(
        &self,
        job: &AudioJob,
        cancel: &CancelToken,
    ) -> Result<PipelineResult, PipelineError> {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                log::info!("pipeline: cancelled by caller");
                Err(PipelineError::Cancelled)
            }
            result = self.run(job) => result,
        }
    }

    /// Run `job` on its own task.
    pub fn submit(self: &Arc<Self>, job: AudioJob) -> JoinHandle<Result<PipelineResult, PipelineError>> {
        let pipeline = Arc::clone(self);
        tokio::spawn(async move { pipeline.run(&job).await })
    }

    pub fn queue_stats(&self) -> PipelineQueueStats {
        PipelineQueueStats {
            transcription: self.transcription.stats(),
            translation: self.translation.stats(),
            synthesis: self.synthesis.stats(),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use crate::language::Language;
    use crate::ports::mock::{MockSynthesizer, MockTranscriber, MockTranslator};
    use crate::ports::PortError;
    use crate::pipeline::types::ResponseMode;

    fn lang(code: &str) -> Language {
        Language::parse(code).unwrap()
    }

    fn langs(codes: &[&str]) -> Vec<Language> {
        codes.iter().map(|c| lang(c)).collect()
    }

    struct Harness {
        transcriber: Arc<MockTranscriber>,
        translator: Arc<MockTranslator>,
        synthesizer: Arc<MockSynthesizer>,
        pipeline: Arc<Pipeline>,
    }

    fn harness(
        transcriber: MockTranscriber,
        translator: MockTranslator,
        synthesizer: MockSynthesizer,
    ) -> Harness {
        let transcriber = Arc::new(transcriber);
        let translator = Arc::new(translator);
        let synthesizer = Arc::new(synthesizer);
        let ports = EnginePorts {
            transcription: transcriber.clone(),
            translation: translator.clone(),
            synthesis: synthesizer.clone(),
        };
        let settings = PipelineSettings {
            detection: DetectionSettings {
                candidates: langs(&["en", "es", "fr"]),
                early_exit_threshold: 0.8,
            },
            transcription_queue: QueueSettings::for_tests(2),
            translation_queue: QueueSettings::for_tests(4),
            synthesis_queue: QueueSettings::for_tests(4),
        };
        Harness {
            transcriber,
            translator,
            synthesizer,
            pipeline: Arc::new(Pipeline::new(ports, settings)),
        }
    }

    fn english() -> MockTranscriber {
        MockTranscriber::new().respond("en", "good morning", Some(0.93))
    }

    fn job(targets: &[&str], mode: ResponseMode) -> AudioJob {
        AudioJob::new(vec![7u8; 64], &langs(targets), mode).unwrap()
    }

    #[tokio::test(start_paused = true)]
    async fn english_audio_is_translated_and_synthesized_into_each_target() {
        let h = harness(english(), MockTranslator::new(), MockSynthesizer::new());

        let result = h
            .pipeline
            .run(&job(&["es", "fr"], ResponseMode::Both))
            .await
            .unwrap();

        assert_eq!(result.detection.language, lang("en"));
        assert_eq!(result.detection.text, "good morning");
        assert_eq!(h.transcriber.calls(), vec!["en"]);

        assert_eq!(result.branches.len(), 2);
        for (branch, code) in result.branches.iter().zip(["es", "fr"]) {
            let expected_text = MockTranslator::expected("good morning", code);
            assert_eq!(branch.target, lang(code));
            assert_eq!(branch.translated_text(), Some(expected_text.as_str()));
            assert_eq!(
                branch.audio(),
                Some(MockSynthesizer::expected(&expected_text, lang(code)).as_slice())
            );
        }
        assert!(result.failed_languages().is_empty());
        assert!(result.timings.synthesis.is_some());
        assert_eq!(h.synthesizer.call_count(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn detected_language_is_the_translation_source() {
        let h = harness(english(), MockTranslator::new(), MockSynthesizer::new());
        h.pipeline
            .run(&job(&["de"], ResponseMode::Text))
            .await
            .unwrap();

        assert_eq!(
            h.translator.calls(),
            vec![("de".to_string(), "en".to_string())]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn text_mode_skips_synthesis() {
        let h = harness(english(), MockTranslator::new(), MockSynthesizer::new());

        let result = h
            .pipeline
            .run(&job(&["es", "fr"], ResponseMode::Text))
            .await
            .unwrap();

        assert_eq!(h.synthesizer.call_count(), 0);
        assert!(result.branches.iter().all(|b| b.synthesis.is_none()));
        assert_eq!(result.timings.synthesis, None);
    }

    #[tokio::test(start_paused = true)]
    async fn failed_language_does_not_fail_the_run() {
        let h = harness(
            english(),
            MockTranslator::new().fail("fr", PortError::UnsupportedLanguage("fr".into())),
            MockSynthesizer::new(),
        );

        let result = h
            .pipeline
            .run(&job(&["es", "fr", "de"], ResponseMode::Both))
            .await
            .unwrap();

        assert_eq!(result.failed_languages(), vec![lang("fr")]);
        assert!(result.is_partial_success());
        assert!(result.branches[1].synthesis.is_none());
        assert_eq!(h.synthesizer.call_count(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn fatal_detection_stops_before_translation() {
        let h = harness(
            MockTranscriber::new(),
            MockTranslator::new(),
            MockSynthesizer::new(),
        );

        let err = h
            .pipeline
            .run(&job(&["es"], ResponseMode::Both))
            .await
            .unwrap_err();

        assert!(matches!(err, PipelineError::NoViableLanguage { .. }));
        assert_eq!(h.transcriber.call_count(), 3);
        assert_eq!(h.translator.call_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn source_hint_bypasses_candidates() {
        let h = harness(
            MockTranscriber::new().respond("ko", "annyeong", Some(0.3)),
            MockTranslator::new(),
            MockSynthesizer::new(),
        );
        let job = job(&["en"], ResponseMode::Text).with_source_hint(Some(lang("ko")));

        let result = h.pipeline.run(&job).await.unwrap();

        assert_eq!(result.detection.language, lang("ko"));
        assert_eq!(h.transcriber.calls(), vec!["ko"]);
    }

    #[tokio::test(start_paused = true)]
    async fn cancellation_abandons_in_flight_translations() {
        let h = harness(
            english(),
            MockTranslator::new()
                .slow("es", Duration::from_secs(30))
                .slow("fr", Duration::from_secs(30)),
            MockSynthesizer::new(),
        );
        let cancel = CancelToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(1)).await;
            trigger.cancel();
        });

        let err = h
            .pipeline
            .run_cancellable(&job(&["es", "fr"], ResponseMode::Both), &cancel)
            .await
            .unwrap_err();
        assert_eq!(err, PipelineError::Cancelled);

        for _ in 0..100 {
            if h.pipeline.queue_stats().translation.failed == 2 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(1)).await;
        }
        let stats = h.pipeline.queue_stats().translation;
        assert_eq!(stats.failed, 2);
        assert_eq!(stats.active, 0);
        assert_eq!(stats.completed, 0);
        assert_eq!(h.synthesizer.call_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn queue_stats_count_jobs_per_engine() {
        let h = harness(
            MockTranscriber::new()
                .respond("en", "hi", Some(0.1))
                .respond("es", "hola", Some(0.9)),
            MockTranslator::new(),
            MockSynthesizer::new(),
        );

        h.pipeline
            .run(&job(&["fr", "de", "it"], ResponseMode::Audio))
            .await
            .unwrap();

        let stats = h.pipeline.queue_stats();
        assert_eq!(stats.transcription.completed, 2);
        assert_eq!(stats.translation.completed, 3);
        assert_eq!(stats.synthesis.completed, 3);
        assert_eq!(stats.translation.waiting + stats.translation.active, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn submitted_jobs_run_concurrently() {
        let h = harness(english(), MockTranslator::new(), MockSynthesizer::new());

        let first = h.pipeline.submit(job(&["es"], ResponseMode::Text));
        let second = h.pipeline.submit(job(&["fr"], ResponseMode::Audio));

        let first = first.await.unwrap().unwrap();
        let second = second.await.unwrap().unwrap();
        assert_eq!(first.branches[0].target, lang("es"));
        assert!(second.branches[0].audio().is_some());
    }
}
