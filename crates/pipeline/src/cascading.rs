//! Cascading pipeline assembly
//!
//! Holds the five configured stages behind their trait seams and hands them
//! to the session driver. The pipeline never rewrites stage configuration;
//! `stage_summary` reports exactly what was supplied.

use std::sync::Arc;

use cascade_config::Settings;
use cascade_core::{
    LanguageModel, SpeechToText, TextToSpeech, TurnDetector, VadConfig, VoiceActivityDetector,
};
use cascade_llm::{OpenAiConfig, OpenAiLlm};

use crate::stt::{DeepgramConfig, DeepgramStt};
use crate::tts::{ElevenLabsConfig, ElevenLabsTts};
use crate::turn::{HybridTurnDetector, TurnDetectorConfig};
use crate::vad::EnergyVad;
use crate::PipelineError;

/// Configured identity of the five stages, for logging and tests
#[derive(Debug, Clone, PartialEq)]
pub struct StageSummary {
    pub stt_model: String,
    pub llm_model: String,
    pub tts_model: String,
    pub vad_threshold: f32,
    pub turn_threshold: f32,
}

/// The five-stage cascading pipeline
pub struct CascadingPipeline {
    stt: Arc<dyn SpeechToText>,
    llm: Arc<dyn LanguageModel>,
    tts: Arc<dyn TextToSpeech>,
    vad: Arc<dyn VoiceActivityDetector>,
    turn_detector: Arc<dyn TurnDetector>,
}

impl CascadingPipeline {
    pub fn builder() -> CascadingPipelineBuilder {
        CascadingPipelineBuilder::default()
    }

    /// Build the pipeline from settings, instantiating the configured vendor
    /// backends. API keys come from the ambient environment.
    pub fn from_settings(settings: &Settings) -> Result<Self, PipelineError> {
        let stt = DeepgramStt::new(
            DeepgramConfig::default()
                .with_model(&settings.stt.model)
                .with_language(&settings.stt.language),
        )?;

        let llm = OpenAiLlm::new(
            OpenAiConfig::default()
                .with_model(&settings.llm.model)
                .with_max_tokens(settings.llm.max_tokens)
                .with_temperature(settings.llm.temperature),
        )
        .map_err(|e| PipelineError::Configuration(e.to_string()))?;

        let tts = ElevenLabsTts::new(
            ElevenLabsConfig::default()
                .with_model(&settings.tts.model)
                .with_voice(&settings.tts.voice_id),
        )?;

        let vad = EnergyVad::new(VadConfig {
            threshold: settings.vad.threshold,
            min_speech_duration_ms: settings.vad.min_speech_duration_ms,
            min_silence_duration_ms: settings.vad.min_silence_duration_ms,
        });

        let turn_detector = HybridTurnDetector::new(TurnDetectorConfig {
            threshold: settings.turn_detection.threshold,
            base_silence_ms: settings.turn_detection.base_silence_ms,
            max_silence_ms: settings.turn_detection.max_silence_ms,
        });

        Self::builder()
            .stt(Arc::new(stt))
            .llm(Arc::new(llm))
            .tts(Arc::new(tts))
            .vad(Arc::new(vad))
            .turn_detector(Arc::new(turn_detector))
            .build()
    }

    pub fn stt(&self) -> &Arc<dyn SpeechToText> {
        &self.stt
    }

    pub fn llm(&self) -> &Arc<dyn LanguageModel> {
        &self.llm
    }

    pub fn tts(&self) -> &Arc<dyn TextToSpeech> {
        &self.tts
    }

    pub fn vad(&self) -> &Arc<dyn VoiceActivityDetector> {
        &self.vad
    }

    pub fn turn_detector(&self) -> &Arc<dyn TurnDetector> {
        &self.turn_detector
    }

    /// Report the configured stage identity unchanged
    pub fn stage_summary(&self) -> StageSummary {
        StageSummary {
            stt_model: self.stt.model_name().to_string(),
            llm_model: self.llm.model_name().to_string(),
            tts_model: self.tts.model_name().to_string(),
            vad_threshold: self.vad.threshold(),
            turn_threshold: self.turn_detector.threshold(),
        }
    }
}

/// Builder requiring all five stages
#[derive(Default)]
pub struct CascadingPipelineBuilder {
    stt: Option<Arc<dyn SpeechToText>>,
    llm: Option<Arc<dyn LanguageModel>>,
    tts: Option<Arc<dyn TextToSpeech>>,
    vad: Option<Arc<dyn VoiceActivityDetector>>,
    turn_detector: Option<Arc<dyn TurnDetector>>,
}

impl CascadingPipelineBuilder {
    pub fn stt(mut self, stt: Arc<dyn SpeechToText>) -> Self {
        self.stt = Some(stt);
        self
    }

    pub fn llm(mut self, llm: Arc<dyn LanguageModel>) -> Self {
        self.llm = Some(llm);
        self
    }

    pub fn tts(mut self, tts: Arc<dyn TextToSpeech>) -> Self {
        self.tts = Some(tts);
        self
    }

    pub fn vad(mut self, vad: Arc<dyn VoiceActivityDetector>) -> Self {
        self.vad = Some(vad);
        self
    }

    pub fn turn_detector(mut self, turn_detector: Arc<dyn TurnDetector>) -> Self {
        self.turn_detector = Some(turn_detector);
        self
    }

    pub fn build(self) -> Result<CascadingPipeline, PipelineError> {
        Ok(CascadingPipeline {
            stt: self.stt.ok_or(PipelineError::MissingStage("stt"))?,
            llm: self.llm.ok_or(PipelineError::MissingStage("llm"))?,
            tts: self.tts.ok_or(PipelineError::MissingStage("tts"))?,
            vad: self.vad.ok_or(PipelineError::MissingStage("vad"))?,
            turn_detector: self
                .turn_detector
                .ok_or(PipelineError::MissingStage("turn_detector"))?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use cascade_core::{
        AudioFrame, Message, Result as CoreResult, TranscriptResult, TurnDecision, TurnState,
        VadEvent, VadState,
    };
    use futures::Stream;
    use std::pin::Pin;

    struct StubStt;

    #[async_trait]
    impl SpeechToText for StubStt {
        async fn transcribe(&self, _audio: &AudioFrame) -> CoreResult<TranscriptResult> {
            Ok(TranscriptResult::final_text("stub", 1.0))
        }

        fn transcribe_stream<'a>(
            &'a self,
            _audio_stream: Pin<Box<dyn Stream<Item = AudioFrame> + Send + 'a>>,
        ) -> Pin<Box<dyn Stream<Item = CoreResult<TranscriptResult>> + Send + 'a>> {
            Box::pin(futures::stream::empty())
        }

        fn model_name(&self) -> &str {
            "nova-2"
        }
    }

    struct StubLlm;

    #[async_trait]
    impl LanguageModel for StubLlm {
        async fn generate(&self, _messages: &[Message]) -> CoreResult<String> {
            Ok("stub".to_string())
        }

        fn generate_stream<'a>(
            &'a self,
            _messages: &'a [Message],
        ) -> Pin<Box<dyn Stream<Item = CoreResult<String>> + Send + 'a>> {
            Box::pin(futures::stream::empty())
        }

        fn model_name(&self) -> &str {
            "gpt-4o"
        }
    }

    struct StubTts;

    #[async_trait]
    impl TextToSpeech for StubTts {
        async fn synthesize(&self, _text: &str) -> CoreResult<AudioFrame> {
            Ok(AudioFrame::new(
                vec![0.0; 160],
                cascade_core::SampleRate::Hz16000,
                cascade_core::Channels::Mono,
                0,
            ))
        }

        fn synthesize_stream<'a>(
            &'a self,
            _text_stream: Pin<Box<dyn Stream<Item = String> + Send + 'a>>,
        ) -> Pin<Box<dyn Stream<Item = CoreResult<AudioFrame>> + Send + 'a>> {
            Box::pin(futures::stream::empty())
        }

        fn model_name(&self) -> &str {
            "eleven_flash_v2_5"
        }
    }

    struct StubVad;

    impl VoiceActivityDetector for StubVad {
        fn process_frame(&self, _audio: &AudioFrame) -> VadEvent {
            VadEvent::Silence
        }

        fn speech_probability(&self, _audio: &AudioFrame) -> f32 {
            0.0
        }

        fn reset(&self) {}

        fn state(&self) -> VadState {
            VadState::Idle
        }

        fn threshold(&self) -> f32 {
            0.35
        }

        fn detector_info(&self) -> &str {
            "stub-vad"
        }
    }

    struct StubTurn;

    impl TurnDetector for StubTurn {
        fn process(
            &self,
            _vad: VadEvent,
            _transcript: Option<&str>,
        ) -> CoreResult<TurnDecision> {
            Ok(TurnDecision {
                state: TurnState::Idle,
                is_turn_complete: false,
                confidence: 0.0,
                silence: std::time::Duration::ZERO,
            })
        }

        fn mark_agent_speaking(&self) {}
        fn mark_agent_done(&self) {}
        fn reset(&self) {}

        fn threshold(&self) -> f32 {
            0.8
        }

        fn detector_info(&self) -> &str {
            "stub-turn"
        }
    }

    fn full_builder() -> CascadingPipelineBuilder {
        CascadingPipeline::builder()
            .stt(Arc::new(StubStt))
            .llm(Arc::new(StubLlm))
            .tts(Arc::new(StubTts))
            .vad(Arc::new(StubVad))
            .turn_detector(Arc::new(StubTurn))
    }

    #[test]
    fn all_five_stages_required() {
        let missing_turn = CascadingPipeline::builder()
            .stt(Arc::new(StubStt))
            .llm(Arc::new(StubLlm))
            .tts(Arc::new(StubTts))
            .vad(Arc::new(StubVad))
            .build();
        assert!(matches!(
            missing_turn,
            Err(PipelineError::MissingStage("turn_detector"))
        ));

        let missing_stt = CascadingPipeline::builder()
            .llm(Arc::new(StubLlm))
            .tts(Arc::new(StubTts))
            .vad(Arc::new(StubVad))
            .turn_detector(Arc::new(StubTurn))
            .build();
        assert!(matches!(
            missing_stt,
            Err(PipelineError::MissingStage("stt"))
        ));

        assert!(full_builder().build().is_ok());
    }

    #[test]
    fn stage_summary_reports_configuration_unchanged() {
        let pipeline = full_builder().build().unwrap();
        let summary = pipeline.stage_summary();
        assert_eq!(
            summary,
            StageSummary {
                stt_model: "nova-2".to_string(),
                llm_model: "gpt-4o".to_string(),
                tts_model: "eleven_flash_v2_5".to_string(),
                vad_threshold: 0.35,
                turn_threshold: 0.8,
            }
        );
    }
}
