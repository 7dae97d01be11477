// src/controller.rs
//! One capture → encode → analyze → display cycle at a time.
//!
//! The frame is acquired on the caller's (UI) thread. Encoding and the network
//! round trip run on a thread spawned for the cycle, and the outcome travels
//! back over a channel. Presentation state is only touched from `poll`/`wait`,
//! which the UI thread calls.

use log::{debug, error, info, warn};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender, TryRecvError};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use crate::ai::{AiConnector, AnalysisResult};
use crate::capture::{CapturedFrame, FrameSource};
use crate::encode::ImageEncoder;

pub const READY_TEXT: &str = "Kamerayı soruya doğrultun ve BAŞLA butonuna basın";
pub const WORKING_TEXT: &str = "Fotoğraf çekiliyor ve analiz ediliyor...";
pub const ANSWER_PREFIX: &str = "CEVAP:\n\n";
pub const ERROR_PREFIX: &str = "HATA: ";

/// Presentation collaborator. Only ever called from the UI thread.
pub trait UiHandle {
    fn set_status_text(&mut self, text: &str);
    fn show_error(&mut self, text: &str);

    /// Drop any error still on display from the previous cycle
    fn clear_error(&mut self) {}
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CycleState {
    Idle,
    Capturing,
    Analyzing,
    Done(AnalysisResult),
}

struct CycleOutcome {
    cycle: u64,
    result: AnalysisResult,
}

pub struct CaptureController {
    source: Box<dyn FrameSource>,
    connector: Arc<dyn AiConnector>,
    encoder: ImageEncoder,
    instruction: Arc<str>,
    state: CycleState,
    cycle: u64,
    tx: Sender<CycleOutcome>,
    rx: Receiver<CycleOutcome>,
}

impl CaptureController {
    pub fn new(
        source: Box<dyn FrameSource>,
        connector: Arc<dyn AiConnector>,
        encoder: ImageEncoder,
        instruction: &str,
    ) -> Self {
        let (tx, rx) = mpsc::channel();
        Self {
            source,
            connector,
            encoder,
            instruction: Arc::from(instruction),
            state: CycleState::Idle,
            cycle: 0,
            tx,
            rx,
        }
    }

    pub fn state(&self) -> &CycleState {
        &self.state
    }

    /// A cycle is in flight; triggers are refused
    pub fn is_busy(&self) -> bool {
        matches!(self.state, CycleState::Capturing | CycleState::Analyzing)
    }

    pub fn last_result(&self) -> Option<&AnalysisResult> {
        match &self.state {
            CycleState::Done(result) => Some(result),
            _ => None,
        }
    }

    pub fn source_description(&self) -> String {
        self.source.describe()
    }

    /// Swap the frame source between cycles. Refused while busy.
    pub fn set_source(&mut self, source: Box<dyn FrameSource>) -> bool {
        if self.is_busy() {
            warn!("Ignoring source change while a cycle is in flight");
            return false;
        }
        info!("Frame source set to {}", source.describe());
        self.source = source;
        true
    }

    /// Start a cycle. Returns `false` when one is already running.
    pub fn trigger(&mut self, ui: &mut dyn UiHandle) -> bool {
        if self.is_busy() {
            warn!("Trigger ignored: cycle {} still running", self.cycle);
            return false;
        }

        self.cycle += 1;
        self.state = CycleState::Capturing;
        ui.clear_error();
        ui.set_status_text(WORKING_TEXT);
        info!("Cycle {} started from {}", self.cycle, self.source.describe());

        let frame = match self.source.capture_frame() {
            Ok(frame) => frame,
            Err(e) => {
                error!("Failed to capture frame: {}", e);
                self.finish(AnalysisResult::Failure(e.into()), ui);
                return true;
            }
        };

        self.state = CycleState::Analyzing;

        let cycle = self.cycle;
        let encoder = self.encoder;
        let connector = Arc::clone(&self.connector);
        let instruction = Arc::clone(&self.instruction);
        let tx = self.tx.clone();
        thread::spawn(move || {
            let result = run_cycle(&encoder, connector.as_ref(), frame, &instruction);
            if tx.send(CycleOutcome { cycle, result }).is_err() {
                warn!("Cycle {} finished after the UI went away", cycle);
            }
        });

        true
    }

    /// Apply a finished cycle, if any, without blocking. Returns whether the UI changed.
    pub fn poll(&mut self, ui: &mut dyn UiHandle) -> bool {
        loop {
            match self.rx.try_recv() {
                Ok(outcome) => {
                    if self.apply(outcome, ui) {
                        return true;
                    }
                }
                Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => return false,
            }
        }
    }

    /// Block until the running cycle finishes or `timeout` elapses
    pub fn wait(&mut self, ui: &mut dyn UiHandle, timeout: Duration) -> Option<&AnalysisResult> {
        let deadline = Instant::now() + timeout;
        while self.state == CycleState::Analyzing {
            let remaining = deadline.saturating_duration_since(Instant::now());
            match self.rx.recv_timeout(remaining) {
                Ok(outcome) => {
                    self.apply(outcome, ui);
                }
                Err(RecvTimeoutError::Timeout) => {
                    warn!("Cycle {} did not finish within {:?}", self.cycle, timeout);
                    return None;
                }
                Err(RecvTimeoutError::Disconnected) => return None,
            }
        }
        self.last_result()
    }

    /// Dismiss the displayed result
    pub fn acknowledge(&mut self) {
        if let CycleState::Done(_) = self.state {
            self.state = CycleState::Idle;
        }
    }

    fn apply(&mut self, outcome: CycleOutcome, ui: &mut dyn UiHandle) -> bool {
        if outcome.cycle != self.cycle || self.state != CycleState::Analyzing {
            debug!("Dropping stale outcome of cycle {}", outcome.cycle);
            return false;
        }
        self.finish(outcome.result, ui);
        true
    }

    fn finish(&mut self, result: AnalysisResult, ui: &mut dyn UiHandle) {
        match &result {
            AnalysisResult::Answer(answer) => {
                info!("Cycle {} answered", self.cycle);
                ui.set_status_text(&format!("{}{}", ANSWER_PREFIX, answer));
            }
            AnalysisResult::Failure(reason) => {
                error!("Cycle {} failed: {}", self.cycle, reason);
                let message = reason.user_message();
                ui.set_status_text(&format!("{}{}", ERROR_PREFIX, message));
                ui.show_error(&message);
            }
        }
        self.state = CycleState::Done(result);
    }
}

/// Encode then analyze; the frame is dropped once encoded
pub fn run_cycle(
    encoder: &ImageEncoder,
    connector: &dyn AiConnector,
    frame: CapturedFrame,
    instruction: &str,
) -> AnalysisResult {
    let encoded = match encoder.encode(&frame) {
        Ok(encoded) => encoded,
        Err(e) => {
            error!("Failed to encode frame: {}", e);
            return AnalysisResult::Failure(e.into());
        }
    };
    drop(frame);
    connector.analyze(&encoded, instruction)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::FailureReason;
    use crate::capture::CaptureError;
    use crate::encode::EncodedImage;
    use image::{Rgba, RgbaImage};
    use std::sync::Mutex;

    const WAIT: Duration = Duration::from_secs(10);

    #[derive(Default)]
    struct RecordingUi {
        statuses: Vec<String>,
        errors: Vec<String>,
        showing_error: bool,
    }

    impl UiHandle for RecordingUi {
        fn set_status_text(&mut self, text: &str) {
            self.statuses.push(text.to_string());
        }

        fn show_error(&mut self, text: &str) {
            self.errors.push(text.to_string());
            self.showing_error = true;
        }

        fn clear_error(&mut self) {
            self.showing_error = false;
        }
    }

    struct StillSource {
        width: u32,
        height: u32,
    }

    impl FrameSource for StillSource {
        fn capture_frame(&mut self) -> Result<CapturedFrame, CaptureError> {
            let img = RgbaImage::from_pixel(self.width, self.height, Rgba([9, 9, 9, 255]));
            Ok(CapturedFrame::from_rgba(self.width, self.height, img.into_raw()))
        }

        fn describe(&self) -> String {
            "still".to_string()
        }
    }

    struct BrokenSource;

    impl FrameSource for BrokenSource {
        fn capture_frame(&mut self) -> Result<CapturedFrame, CaptureError> {
            Err(CaptureError::NoDevice)
        }

        fn describe(&self) -> String {
            "broken".to_string()
        }
    }

    struct CorruptSource;

    impl FrameSource for CorruptSource {
        fn capture_frame(&mut self) -> Result<CapturedFrame, CaptureError> {
            Ok(CapturedFrame::from_encoded(b"garbage".to_vec()))
        }

        fn describe(&self) -> String {
            "corrupt".to_string()
        }
    }

    struct ScriptedConnector {
        reply: AnalysisResult,
        seen: Mutex<Vec<(EncodedImage, String)>>,
        gate: Option<Mutex<mpsc::Receiver<()>>>,
    }

    impl ScriptedConnector {
        fn replying(reply: AnalysisResult) -> Self {
            Self {
                reply,
                seen: Mutex::new(Vec::new()),
                gate: None,
            }
        }

        fn gated(reply: AnalysisResult) -> (Self, mpsc::Sender<()>) {
            let (tx, rx) = mpsc::channel();
            let connector = Self {
                gate: Some(Mutex::new(rx)),
                ..Self::replying(reply)
            };
            (connector, tx)
        }

        fn calls(&self) -> usize {
            self.seen.lock().unwrap().len()
        }
    }

    impl AiConnector for ScriptedConnector {
        fn analyze(&self, image: &EncodedImage, instruction: &str) -> AnalysisResult {
            if let Some(gate) = &self.gate {
                let _ = gate.lock().unwrap().recv();
            }
            self.seen
                .lock()
                .unwrap()
                .push((image.clone(), instruction.to_string()));
            self.reply.clone()
        }

        fn model_name(&self) -> &str {
            "scripted"
        }
    }

    fn controller(
        source: impl FrameSource + 'static,
        connector: Arc<ScriptedConnector>,
    ) -> CaptureController {
        CaptureController::new(Box::new(source), connector, ImageEncoder::default(), "solve")
    }

    #[test]
    fn answer_reaches_ui_only_through_wait() {
        let connector = Arc::new(ScriptedConnector::replying(AnalysisResult::Answer(
            "42".to_string(),
        )));
        let mut ctrl = controller(StillSource { width: 640, height: 480 }, connector.clone());
        let mut ui = RecordingUi::default();

        assert!(ctrl.trigger(&mut ui));
        assert_eq!(ui.statuses, vec![WORKING_TEXT.to_string()]);

        let result = ctrl.wait(&mut ui, WAIT).cloned();
        assert_eq!(result, Some(AnalysisResult::Answer("42".to_string())));
        assert_eq!(ui.statuses.last().unwrap(), "CEVAP:\n\n42");
        assert!(ui.errors.is_empty());

        let seen = connector.seen.lock().unwrap();
        assert_eq!((seen[0].0.width, seen[0].0.height), (640, 480));
        assert_eq!(seen[0].1, "solve");
    }

    #[test]
    fn large_frames_are_downsized_before_sending() {
        let connector = Arc::new(ScriptedConnector::replying(AnalysisResult::Answer(
            "ok".to_string(),
        )));
        let mut ctrl = controller(StillSource { width: 1280, height: 960 }, connector.clone());
        let mut ui = RecordingUi::default();

        ctrl.trigger(&mut ui);
        ctrl.wait(&mut ui, WAIT);

        let seen = connector.seen.lock().unwrap();
        assert_eq!((seen[0].0.width, seen[0].0.height), (800, 600));
    }

    #[test]
    fn capture_failure_finishes_immediately() {
        let connector = Arc::new(ScriptedConnector::replying(AnalysisResult::Answer(
            "unused".to_string(),
        )));
        let mut ctrl = controller(BrokenSource, connector.clone());
        let mut ui = RecordingUi::default();

        assert!(ctrl.trigger(&mut ui));
        assert!(matches!(
            ctrl.state(),
            CycleState::Done(AnalysisResult::Failure(FailureReason::Capture(_)))
        ));
        assert_eq!(ui.errors.len(), 1);
        assert!(ui.errors[0].starts_with("Fotoğraf çekerken hata"));
        assert!(ui.statuses.last().unwrap().starts_with(ERROR_PREFIX));
        assert_eq!(connector.calls(), 0);
    }

    #[test]
    fn encoding_failure_skips_the_request() {
        let connector = Arc::new(ScriptedConnector::replying(AnalysisResult::Answer(
            "unused".to_string(),
        )));
        let mut ctrl = controller(CorruptSource, connector.clone());
        let mut ui = RecordingUi::default();

        ctrl.trigger(&mut ui);
        let result = ctrl.wait(&mut ui, WAIT).cloned();

        assert!(matches!(
            result,
            Some(AnalysisResult::Failure(FailureReason::Encoding(_)))
        ));
        assert_eq!(connector.calls(), 0);
        assert_eq!(ui.errors.len(), 1);
    }

    #[test]
    fn failures_show_error_and_status() {
        let connector = Arc::new(ScriptedConnector::replying(AnalysisResult::Failure(
            FailureReason::NonSuccessStatus(500),
        )));
        let mut ctrl = controller(StillSource { width: 8, height: 8 }, connector);
        let mut ui = RecordingUi::default();

        ctrl.trigger(&mut ui);
        ctrl.wait(&mut ui, WAIT);

        assert_eq!(ui.statuses.last().unwrap(), "HATA: API Hatası: 500");
        assert_eq!(ui.errors, vec!["API Hatası: 500".to_string()]);
    }

    #[test]
    fn second_trigger_is_refused_while_analyzing() {
        let (connector, release) =
            ScriptedConnector::gated(AnalysisResult::Answer("done".to_string()));
        let connector = Arc::new(connector);
        let mut ctrl = controller(StillSource { width: 8, height: 8 }, connector.clone());
        let mut ui = RecordingUi::default();

        assert!(ctrl.trigger(&mut ui));
        assert_eq!(ctrl.state(), &CycleState::Analyzing);
        assert!(!ctrl.trigger(&mut ui));
        assert!(!ctrl.set_source(Box::new(BrokenSource)));
        assert!(!ctrl.poll(&mut ui));

        release.send(()).unwrap();
        assert!(ctrl.wait(&mut ui, WAIT).is_some());
        assert_eq!(connector.calls(), 1);

        // a finished cycle does not block the next one
        release.send(()).unwrap();
        assert!(ctrl.trigger(&mut ui));
        ctrl.wait(&mut ui, WAIT);
        assert_eq!(connector.calls(), 2);
    }

    #[test]
    fn poll_applies_outcome_once() {
        let connector = Arc::new(ScriptedConnector::replying(AnalysisResult::Answer(
            "once".to_string(),
        )));
        let mut ctrl = controller(StillSource { width: 8, height: 8 }, connector);
        let mut ui = RecordingUi::default();

        ctrl.trigger(&mut ui);
        let deadline = Instant::now() + WAIT;
        while !ctrl.poll(&mut ui) {
            assert!(Instant::now() < deadline, "cycle never finished");
            thread::sleep(Duration::from_millis(5));
        }
        assert!(!ctrl.poll(&mut ui));
        assert_eq!(ui.statuses.len(), 2);
    }

    #[test]
    fn new_cycle_clears_previous_error() {
        let connector = Arc::new(ScriptedConnector::replying(AnalysisResult::Answer(
            "42".to_string(),
        )));
        let mut ctrl = controller(BrokenSource, connector);
        let mut ui = RecordingUi::default();

        ctrl.trigger(&mut ui);
        assert!(ui.showing_error);

        assert!(ctrl.set_source(Box::new(StillSource { width: 8, height: 8 })));
        ctrl.trigger(&mut ui);
        assert!(!ui.showing_error);

        ctrl.wait(&mut ui, WAIT);
        assert!(!ui.showing_error);
        assert_eq!(ui.statuses.last().unwrap(), "CEVAP:\n\n42");
        assert_eq!(ctrl.last_result().and_then(|r| r.answer()), Some("42"));
    }

    #[test]
    fn acknowledge_returns_to_idle() {
        let connector = Arc::new(ScriptedConnector::replying(AnalysisResult::Answer(
            "x".to_string(),
        )));
        let mut ctrl = controller(BrokenSource, connector);
        let mut ui = RecordingUi::default();

        ctrl.acknowledge();
        assert_eq!(ctrl.state(), &CycleState::Idle);

        ctrl.trigger(&mut ui);
        assert!(ctrl.last_result().is_some());
        ctrl.acknowledge();
        assert_eq!(ctrl.state(), &CycleState::Idle);
        assert!(ctrl.last_result().is_none());
    }
}
