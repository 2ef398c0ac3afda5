use std::sync::mpsc::{self, Receiver};

use log::{debug, info};

use crate::SpeedRecorderError;

use super::{LocationFix, Sample, SampleSource, Session, now_epoch_seconds};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RecordingState {
    Idle,
    Recording,
}

/// `SessionController` gates the flow of fixes from a [`SampleSource`] into the current
/// [`Session`].
///
/// It is the only writer of the session's samples. Fixes reach it over a channel that is
/// created fresh for every recording, and are applied in arrival order by [`Self::pump`].
pub struct SessionController<S: SampleSource> {
    source: S,
    state: RecordingState,
    session: Session,
    fix_receiver: Option<Receiver<LocationFix>>,
}

impl<S: SampleSource> SessionController<S> {
    pub fn new(source: S) -> Self {
        Self {
            source,
            state: RecordingState::Idle,
            session: Session::default(),
            fix_receiver: None,
        }
    }

    pub fn state(&self) -> RecordingState {
        self.state
    }

    pub fn is_recording(&self) -> bool {
        self.state == RecordingState::Recording
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    /// Start a new recording, stamped with the current wall clock time.
    pub fn start(&mut self) -> Result<(), SpeedRecorderError> {
        self.start_at(now_epoch_seconds())
    }

    /// Start a new recording that began at `started_at` seconds since the Unix epoch.
    ///
    /// The previous session's samples are discarded. If the source refuses to start, the
    /// controller stays idle and the previous session is left untouched.
    pub fn start_at(&mut self, started_at: f64) -> Result<(), SpeedRecorderError> {
        if self.is_recording() {
            return Err(SpeedRecorderError::AlreadyRecording);
        }

        let (fix_sender, fix_receiver) = mpsc::channel::<LocationFix>();
        self.source.start_updating(fix_sender)?;

        self.session = Session::new(started_at);
        self.fix_receiver = Some(fix_receiver);
        self.state = RecordingState::Recording;
        info!("Recording started at {:.2}", started_at);
        Ok(())
    }

    /// Stop the current recording. The captured samples stay available until the next start.
    ///
    /// Fixes the source sent but that were not pumped yet are dropped.
    pub fn stop(&mut self) -> Result<(), SpeedRecorderError> {
        if !self.is_recording() {
            debug!("Stop requested while idle, ignoring");
            return Ok(());
        }

        self.state = RecordingState::Idle;
        self.fix_receiver = None;
        info!(
            "Recording stopped with {} samples",
            self.session.samples.len()
        );
        self.source.stop_updating()
    }

    /// Append a sample to the current session. Returns false, and records nothing, when idle.
    pub fn on_sample(&mut self, speed_mps: f64, timestamp_s: f64) -> bool {
        if !self.is_recording() {
            debug!(
                "Dropping sample ({}, {}) delivered while idle",
                speed_mps, timestamp_s
            );
            return false;
        }
        self.session
            .samples
            .push(Sample::new(speed_mps, timestamp_s));
        true
    }

    /// Record a raw fix. Fixes without a speed reading carry nothing to record and are skipped.
    pub fn on_fix(&mut self, fix: LocationFix) -> bool {
        match fix.speed_mps {
            Some(speed_mps) => self.on_sample(speed_mps, fix.timestamp_s),
            None => {
                debug!("Skipping fix at {} without speed", fix.timestamp_s);
                false
            }
        }
    }

    /// Apply every fix currently waiting on the channel, in arrival order.
    ///
    /// Returns the number of samples accepted.
    pub fn pump(&mut self) -> usize {
        let Some(receiver) = self.fix_receiver.take() else {
            return 0;
        };

        let mut accepted = 0;
        for fix in receiver.try_iter() {
            if self.on_fix(fix) {
                accepted += 1;
            }
        }
        self.fix_receiver = Some(receiver);
        accepted
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::sync::mpsc::Sender;

    /// Source driven by hand from the test: fixes are sent through the stored sender.
    #[derive(Default)]
    struct ManualSource {
        sink: Option<Sender<LocationFix>>,
        starts: usize,
        stops: usize,
        fail_start: bool,
    }

    impl ManualSource {
        fn emit(&self, fix: LocationFix) {
            if let Some(sink) = &self.sink {
                sink.send(fix).unwrap();
            }
        }
    }

    impl SampleSource for ManualSource {
        fn start_updating(
            &mut self,
            sink: Sender<LocationFix>,
        ) -> Result<(), SpeedRecorderError> {
            if self.fail_start {
                return Err(SpeedRecorderError::SourceStartError {
                    description: "location services disabled".to_string(),
                });
            }
            self.starts += 1;
            self.sink = Some(sink);
            Ok(())
        }

        fn stop_updating(&mut self) -> Result<(), SpeedRecorderError> {
            self.stops += 1;
            Ok(())
        }

        fn is_updating(&self) -> bool {
            self.starts > self.stops
        }
    }

    fn samples(controller: &SessionController<ManualSource>) -> Vec<Sample> {
        controller.session().samples().as_slice().to_vec()
    }

    #[test]
    fn test_initial_state_is_idle() {
        let controller = SessionController::new(ManualSource::default());
        assert_eq!(controller.state(), RecordingState::Idle);
        assert!(controller.session().samples().is_empty());
    }

    #[test]
    fn test_start_clears_previous_session() {
        let mut controller = SessionController::new(ManualSource::default());

        controller.start_at(50.).unwrap();
        assert!(controller.on_sample(1., 100.));
        controller.stop().unwrap();
        assert_eq!(samples(&controller), vec![Sample::new(1., 100.)]);

        controller.start_at(150.).unwrap();
        assert!(controller.on_sample(2., 200.));
        controller.stop().unwrap();

        assert_eq!(samples(&controller), vec![Sample::new(2., 200.)]);
        assert_eq!(controller.session().started_at, 150.);
        assert_eq!(controller.source().starts, 2);
        assert_eq!(controller.source().stops, 2);
    }

    #[test]
    fn test_samples_while_idle_are_ignored() {
        let mut controller = SessionController::new(ManualSource::default());
        assert!(!controller.on_sample(1., 1.));
        assert!(controller.session().samples().is_empty());

        controller.start_at(0.).unwrap();
        controller.on_sample(1., 1.);
        controller.stop().unwrap();

        assert!(!controller.on_sample(2., 2.));
        assert_eq!(samples(&controller), vec![Sample::new(1., 1.)]);
    }

    #[test]
    fn test_fix_without_speed_is_skipped() {
        let mut controller = SessionController::new(ManualSource::default());
        controller.start_at(0.).unwrap();

        assert!(!controller.on_fix(LocationFix::without_speed(1.)));
        assert!(controller.on_fix(LocationFix::new(-1., 2.)));

        assert_eq!(samples(&controller), vec![Sample::new(-1., 2.)]);
    }

    #[test]
    fn test_pump_applies_fixes_in_order() {
        let mut controller = SessionController::new(ManualSource::default());
        controller.start_at(0.).unwrap();

        controller.source().emit(LocationFix::new(1., 10.));
        controller.source().emit(LocationFix::without_speed(11.));
        controller.source().emit(LocationFix::new(3., 12.));
        controller.source().emit(LocationFix::new(3., 12.));

        assert_eq!(controller.pump(), 3);
        assert_eq!(controller.pump(), 0);
        assert_eq!(
            samples(&controller),
            vec![
                Sample::new(1., 10.),
                Sample::new(3., 12.),
                Sample::new(3., 12.)
            ]
        );
    }

    #[test]
    fn test_fixes_pending_at_stop_are_dropped() {
        let mut controller = SessionController::new(ManualSource::default());
        controller.start_at(0.).unwrap();
        controller.source().emit(LocationFix::new(1., 10.));
        controller.pump();

        controller.source().emit(LocationFix::new(2., 11.));
        controller.stop().unwrap();
        assert_eq!(controller.pump(), 0);

        // a new session gets a fresh channel, nothing stale leaks in
        controller.start_at(20.).unwrap();
        assert_eq!(controller.pump(), 0);
        assert!(controller.session().samples().is_empty());
    }

    #[test]
    fn test_start_while_recording_is_rejected() {
        let mut controller = SessionController::new(ManualSource::default());
        controller.start_at(0.).unwrap();
        controller.on_sample(1., 1.);

        match controller.start_at(5.) {
            Err(SpeedRecorderError::AlreadyRecording) => {}
            other => panic!("Expected AlreadyRecording, got {:?}", other),
        }
        assert!(controller.is_recording());
        assert_eq!(controller.session().started_at, 0.);
        assert_eq!(samples(&controller), vec![Sample::new(1., 1.)]);
    }

    #[test]
    fn test_source_start_failure_keeps_previous_session() {
        let mut controller = SessionController::new(ManualSource::default());
        controller.start_at(0.).unwrap();
        controller.on_sample(1., 1.);
        controller.stop().unwrap();

        controller.source.fail_start = true;
        assert!(controller.start_at(5.).is_err());
        assert_eq!(controller.state(), RecordingState::Idle);
        assert_eq!(samples(&controller), vec![Sample::new(1., 1.)]);
    }

    #[test]
    fn test_stop_while_idle_is_noop() {
        let mut controller = SessionController::new(ManualSource::default());
        controller.stop().unwrap();
        assert_eq!(controller.source().stops, 0);
        assert_eq!(controller.state(), RecordingState::Idle);
    }

    #[derive(Clone, Debug)]
    enum Call {
        Start,
        Stop,
        Sample(f64, f64),
    }

    fn call_strategy() -> impl Strategy<Value = Call> {
        prop_oneof![
            1 => Just(Call::Start),
            1 => Just(Call::Stop),
            6 => (-5.0f64..60.0, 0.0f64..1e9).prop_map(|(s, t)| Call::Sample(s, t)),
        ]
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        #[test]
        fn prop_store_holds_exactly_the_accepted_samples_in_order(
            calls in prop::collection::vec(call_strategy(), 0..200),
        ) {
            let mut controller = SessionController::new(ManualSource::default());
            let mut expected: Vec<Sample> = Vec::new();
            let mut recording = false;

            for call in calls {
                match call {
                    Call::Start => {
                        if recording {
                            prop_assert!(controller.start_at(0.).is_err());
                        } else {
                            controller.start_at(0.).unwrap();
                            expected.clear();
                            recording = true;
                        }
                    }
                    Call::Stop => {
                        controller.stop().unwrap();
                        recording = false;
                    }
                    Call::Sample(speed, ts) => {
                        let accepted = controller.on_sample(speed, ts);
                        prop_assert_eq!(accepted, recording);
                        if accepted {
                            expected.push(Sample::new(speed, ts));
                        }
                    }
                }
                prop_assert_eq!(samples(&controller), expected.clone());
            }
        }
    }
}
