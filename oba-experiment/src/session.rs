use crate::config::ExperimentConfig;
use crate::evaluate::evaluate;
use crate::log::SessionLog;
use crate::marker::MarkerSink;
use crate::schedule::{ScheduledEvent, condition_sequence, schedule_events};
use crate::staircase::{next_magnitude, tilt_step};
use anyhow::{Context, Result, anyhow, bail};
use oba_core::{FrameView, PatchId, PatchView, ScreenState, TrialRecord, is_visible};
use oba_timing::{Clock, FrameMonitor};
use rand::Rng;

/// Logical key presses observed since the previous frame, already mapped
/// from the physical device by the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyAction {
    Response,
    Quit,
}

/// What the caller should do after a tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickFlow {
    Continue,
    /// All trials are done; the end screen is showing.
    SessionOver,
    /// Quit key pressed: terminate immediately, nothing further is written.
    Quit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SessionPhase {
    Welcome,
    RefreshCheck,
    Trials,
    Finished,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TrialPhase {
    Iti,
    Cue,
    Stimulus,
    PostTrial,
}

#[derive(Debug)]
struct ActiveTrial {
    cued: PatchId,
    /// Tilt magnitude this trial, tenths of a degree.
    magnitude: i32,
    events: Vec<ScheduledEvent>,
    iti_frames: usize,
    phase: TrialPhase,
    /// Frame index within the current trial phase.
    frame: usize,
    next_event: usize,
    event_times_ms: Vec<f64>,
    response_times_ms: Vec<f64>,
}

const WHITE: [u8; 4] = [255, 255, 255, 255];

/// The adaptive trial controller. Single-threaded and frame-stepped: the
/// caller invokes `tick` exactly once per presented display frame with the
/// keys pressed since the previous frame, then renders `frame_view`.
pub struct SessionController<C, R, M>
where
    C: Clock,
    R: Rng,
    M: MarkerSink,
{
    config: ExperimentConfig,
    clock: C,
    rng: R,
    marker: M,
    phase: SessionPhase,
    monitor: FrameMonitor,
    last_frame_ms: Option<f64>,
    conditions: Vec<PatchId>,
    trial_index: usize,
    trial: Option<ActiveTrial>,
    log: SessionLog,
    view: FrameView,
}

impl<C, R, M> SessionController<C, R, M>
where
    C: Clock,
    R: Rng,
    M: MarkerSink,
{
    pub fn new(config: ExperimentConfig, clock: C, mut rng: R, marker: M) -> Result<Self> {
        if config.trial_frames() < 2 * config.hold_frames() {
            bail!("trial duration too short to fit two tilt-hold windows");
        }
        let conditions = condition_sequence(&mut rng, config.reps_per_condition);
        let monitor = FrameMonitor::new(config.refresh_check_frames.max(1));
        let log = SessionLog::create(&config.log_path);
        Ok(Self {
            phase: SessionPhase::Welcome,
            monitor,
            last_frame_ms: None,
            conditions,
            trial_index: 0,
            trial: None,
            log,
            view: FrameView {
                screen: ScreenState::Fixation { color: WHITE },
            },
            config,
            clock,
            rng,
            marker,
        })
    }

    /// Advances the session by one display frame.
    pub fn tick(&mut self, pressed: &[KeyAction]) -> Result<TickFlow> {
        if pressed.contains(&KeyAction::Quit) {
            return Ok(TickFlow::Quit);
        }
        match self.phase {
            SessionPhase::Welcome => {
                self.view = FrameView {
                    screen: ScreenState::Fixation { color: WHITE },
                };
                if pressed.contains(&KeyAction::Response) {
                    println!("Measuring display refresh rate...");
                    self.phase = SessionPhase::RefreshCheck;
                    self.last_frame_ms = None;
                }
                Ok(TickFlow::Continue)
            }
            SessionPhase::RefreshCheck => {
                let now = self.clock.elapsed_ms();
                if let Some(prev) = self.last_frame_ms {
                    self.monitor.record_interval(now - prev);
                }
                self.last_frame_ms = Some(now);
                self.view = FrameView {
                    screen: ScreenState::Fixation { color: WHITE },
                };
                if self.monitor.sample_count() >= self.config.refresh_check_frames {
                    let stats = self.monitor.stats();
                    if !self.monitor.matches_refresh(
                        self.config.refresh_rate as f64,
                        self.config.refresh_tolerance,
                    ) {
                        bail!(
                            "display refresh mismatch: measured {:.1} Hz, expected {} Hz",
                            stats.effective_hz,
                            self.config.refresh_rate
                        );
                    }
                    println!(
                        "Refresh check passed: {:.1} Hz (jitter {:.3} ms)",
                        stats.effective_hz, stats.jitter_ms
                    );
                    self.phase = SessionPhase::Trials;
                    self.start_trial()?;
                }
                Ok(TickFlow::Continue)
            }
            SessionPhase::Trials => {
                self.step_trial(pressed)?;
                if self.phase == SessionPhase::Finished {
                    Ok(TickFlow::SessionOver)
                } else {
                    Ok(TickFlow::Continue)
                }
            }
            SessionPhase::Finished => {
                self.view = FrameView {
                    screen: ScreenState::EndScreen,
                };
                Ok(TickFlow::SessionOver)
            }
        }
    }

    /// What to draw for the frame just ticked.
    pub fn frame_view(&self) -> &FrameView {
        &self.view
    }

    pub fn config(&self) -> &ExperimentConfig {
        &self.config
    }

    pub fn log(&self) -> &SessionLog {
        &self.log
    }

    pub fn is_finished(&self) -> bool {
        self.phase == SessionPhase::Finished
    }

    fn start_trial(&mut self) -> Result<()> {
        let idx = self.trial_index;
        if idx >= self.conditions.len() {
            self.trial = None;
            self.phase = SessionPhase::Finished;
            self.view = FrameView {
                screen: ScreenState::EndScreen,
            };
            println!("\n    *** Session finished: {idx} trials recorded ***");
            return Ok(());
        }

        // Trial 1 always starts from the seed; afterwards the staircase
        // state is derived purely from the persisted log.
        let magnitude = if idx == 0 {
            self.config.seed_magnitude
        } else {
            let log = SessionLog::load(&self.config.log_path)
                .context("session log must exist after the first trial")?;
            let prev = log
                .last()
                .ok_or_else(|| anyhow!("session log is empty after the first trial"))?;
            match prev.running_performance {
                Some(running) => next_magnitude(
                    prev.tilt_magnitude,
                    tilt_step(self.config.target_performance, running),
                ),
                None => prev.tilt_magnitude,
            }
        };

        let events = schedule_events(
            &mut self.rng,
            self.config.trial_frames(),
            self.config.hold_frames(),
        );
        let iti_frames = self
            .rng
            .random_range(self.config.iti_frames_min()..=self.config.iti_frames_max());

        print!(
            "[Trial {:03}]   TiltAng: {:3.1}deg   ",
            idx + 1,
            magnitude as f64 / 10.0
        );
        self.trial = Some(ActiveTrial {
            cued: self.conditions[idx],
            magnitude,
            events,
            iti_frames,
            phase: TrialPhase::Iti,
            frame: 0,
            next_event: 0,
            event_times_ms: Vec::new(),
            response_times_ms: Vec::new(),
        });
        Ok(())
    }

    fn step_trial(&mut self, pressed: &[KeyAction]) -> Result<()> {
        let hold = self.config.hold_frames();
        let cycle1 = self.config.frames_per_cycle(PatchId::One);
        let cycle2 = self.config.frames_per_cycle(PatchId::Two);
        let trial_frames = self.config.trial_frames();
        let cue_frames = self.config.cue_frames();
        let post_frames = self.config.post_trial_frames();
        let send_markers = self.config.send_markers;

        let mut stimulus_done = false;
        let mut trial_done = false;

        let Some(trial) = self.trial.as_mut() else {
            return Ok(());
        };
        match trial.phase {
            TrialPhase::Iti => {
                self.view = FrameView::blank();
                trial.frame += 1;
                if trial.frame >= trial.iti_frames {
                    trial.phase = TrialPhase::Cue;
                    trial.frame = 0;
                }
            }
            TrialPhase::Cue => {
                self.view = FrameView {
                    screen: ScreenState::Fixation {
                        color: trial.cued.cue_color(),
                    },
                };
                trial.frame += 1;
                if trial.frame >= cue_frames {
                    trial.phase = TrialPhase::Stimulus;
                    trial.frame = 0;
                    // Trial clock epoch: every timestamp in this trial is
                    // relative to stimulus onset.
                    self.clock.reset();
                    if send_markers {
                        self.marker
                            .send_marker(&format!("CUE{}", trial.cued.label()));
                    }
                }
            }
            TrialPhase::Stimulus => {
                let f = trial.frame;
                if trial.next_event < trial.events.len()
                    && trial.events[trial.next_event].onset_frame == f
                {
                    trial.event_times_ms.push(self.clock.elapsed_ms());
                    trial.next_event += 1;
                }
                if pressed.contains(&KeyAction::Response) {
                    trial.response_times_ms.push(self.clock.elapsed_ms());
                }

                let mut patches = [
                    PatchView {
                        visible: is_visible(f, cycle1),
                        tilt_deg: 0.0,
                    },
                    PatchView {
                        visible: is_visible(f, cycle2),
                        tilt_deg: 0.0,
                    },
                ];
                if let Some(event) = trial
                    .events
                    .iter()
                    .find(|e| f >= e.onset_frame && f < e.onset_frame + hold)
                {
                    patches[event.patch.index()].tilt_deg =
                        event.direction.sign() * trial.magnitude as f32 / 10.0;
                }
                self.view = FrameView {
                    screen: ScreenState::Stimulus {
                        patches,
                        cued: trial.cued,
                    },
                };

                trial.frame += 1;
                if trial.frame >= trial_frames {
                    trial.phase = TrialPhase::PostTrial;
                    trial.frame = 0;
                    stimulus_done = true;
                }
            }
            TrialPhase::PostTrial => {
                self.view = FrameView::blank();
                trial.frame += 1;
                if trial.frame >= post_frames {
                    trial_done = true;
                }
            }
        }

        if stimulus_done {
            self.finish_trial()?;
        }
        if trial_done {
            self.trial_index += 1;
            self.start_trial()?;
        }
        Ok(())
    }

    fn finish_trial(&mut self) -> Result<()> {
        let Some(trial) = self.trial.as_ref() else {
            return Ok(());
        };
        let events: Vec<(f64, PatchId)> = trial
            .event_times_ms
            .iter()
            .copied()
            .zip(trial.events.iter().map(|e| e.patch))
            .collect();
        let outcome = evaluate(
            trial.cued,
            &events,
            &trial.response_times_ms,
            self.config.response_window_ms,
        );

        let record = TrialRecord {
            trial_num: self.trial_index + 1,
            frequency_tags: [self.config.freq1, self.config.freq2],
            cued_patch: trial.cued,
            n_events: trial.events.len(),
            event_frames: trial.events.iter().map(|e| e.onset_frame).collect(),
            event_patches: trial.events.iter().map(|e| e.patch).collect(),
            event_directions: trial.events.iter().map(|e| e.direction).collect(),
            tilt_magnitude: trial.magnitude,
            event_times_ms: trial.event_times_ms.clone(),
            response_times_ms: trial.response_times_ms.clone(),
            instant_performance: outcome.accuracy_pct,
            avg_rt_ms: outcome.mean_rt_ms,
            cumulative_performance: None,
            running_performance: None,
        };
        self.log.append(record)?;
        let (cumulative, running) = self.log.backfill_performance()?;

        match outcome.accuracy_pct {
            Some(p) => print!("Perf:{p:3.0}%   "),
            None => print!("Perf: ---   "),
        }
        match outcome.mean_rt_ms {
            Some(rt) => print!("avgRT:{rt:4.0}ms   "),
            None => print!("avgRT: ---   "),
        }
        match (cumulative, running) {
            (Some(c), Some(r)) => println!("CumPerf:{c:6.2}%   RunPerf:{r:6.2}%"),
            _ => println!("CumPerf: ---      RunPerf: ---"),
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::marker::testing::RecordingMarker;
    use oba_timing::ManualClock;
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use std::path::PathBuf;

    const FRAME_MS: f64 = 1000.0 / 60.0;

    type TestController = SessionController<ManualClock, StdRng, RecordingMarker>;

    fn scratch_path(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("oba_session_{}_{}.json", name, std::process::id()))
    }

    fn test_config(name: &str) -> ExperimentConfig {
        ExperimentConfig {
            reps_per_condition: 1,
            trial_seconds: 2,
            cue_seconds: 1,
            send_markers: true,
            log_path: scratch_path(name),
            ..ExperimentConfig::default()
        }
    }

    fn controller(name: &str, seed: u64) -> TestController {
        SessionController::new(
            test_config(name),
            ManualClock::new(),
            StdRng::seed_from_u64(seed),
            RecordingMarker::default(),
        )
        .unwrap()
    }

    fn tick_frame(c: &mut TestController, pressed: &[KeyAction]) -> TickFlow {
        c.clock.advance_ms(FRAME_MS);
        c.tick(pressed).unwrap()
    }

    fn run_to_trials(c: &mut TestController) {
        tick_frame(c, &[KeyAction::Response]);
        let mut safety = 1000;
        while c.phase == SessionPhase::RefreshCheck {
            tick_frame(c, &[]);
            safety -= 1;
            assert!(safety > 0, "refresh check never completed");
        }
        assert_eq!(c.phase, SessionPhase::Trials);
    }

    #[test]
    fn full_session_runs_logs_and_staircases_every_trial() {
        let mut c = controller("full", 42);
        run_to_trials(&mut c);

        let mut safety = 1_000_000;
        loop {
            if tick_frame(&mut c, &[]) == TickFlow::SessionOver {
                break;
            }
            safety -= 1;
            assert!(safety > 0, "session never finished");
        }

        let records = c.log.records();
        assert_eq!(records.len(), 6);
        assert_eq!(records[0].tilt_magnitude, 50);
        for record in records {
            assert!((1..=99).contains(&record.tilt_magnitude));
            assert!(record.n_events <= 2);
            assert_eq!(record.event_frames.len(), record.n_events);
            assert_eq!(record.event_times_ms.len(), record.n_events);
            if record.n_events == 0 {
                assert_eq!(record.instant_performance, None);
                assert_eq!(record.avg_rt_ms, None);
            }
        }

        // Each trial's magnitude is derivable from the previous record.
        for pair in records.windows(2) {
            let (prev, next) = (&pair[0], &pair[1]);
            let expected = match prev.running_performance {
                Some(running) => next_magnitude(prev.tilt_magnitude, tilt_step(80.0, running)),
                None => prev.tilt_magnitude,
            };
            assert_eq!(next.tilt_magnitude, expected);
        }

        // Reloading the persisted log reproduces the stored aggregates.
        let reloaded = SessionLog::load(&c.config.log_path).unwrap();
        let last = reloaded.last().unwrap();
        assert_eq!(last.cumulative_performance, reloaded.cumulative_performance());
        assert_eq!(
            last.running_performance,
            reloaded.running_performance(crate::log::RUNNING_WINDOW)
        );

        // One CUE marker per trial.
        assert_eq!(c.marker.labels.len(), 6);
        assert!(c.marker.labels.iter().all(|l| l == "CUE1" || l == "CUE2"));

        std::fs::remove_file(&c.config.log_path).ok();
    }

    #[test]
    fn quit_aborts_immediately_without_writing() {
        let mut c = controller("quit", 1);
        run_to_trials(&mut c);
        for _ in 0..10 {
            tick_frame(&mut c, &[]);
        }
        assert_eq!(tick_frame(&mut c, &[KeyAction::Quit]), TickFlow::Quit);
        assert!(c.log.is_empty());
        assert!(!c.config.log_path.exists());
    }

    #[test]
    fn refresh_mismatch_is_fatal() {
        let mut c = controller("mismatch", 2);
        c.clock.advance_ms(FRAME_MS);
        c.tick(&[KeyAction::Response]).unwrap();
        // 30 Hz intervals against the configured 60 Hz.
        let mut outcome = Ok(TickFlow::Continue);
        for _ in 0..300 {
            c.clock.advance_ms(1000.0 / 30.0);
            outcome = c.tick(&[]);
            if outcome.is_err() {
                break;
            }
        }
        assert!(outcome.is_err());
    }

    #[test]
    fn responses_during_stimulus_are_timestamped_on_the_trial_clock() {
        let mut c = controller("respond", 3);
        run_to_trials(&mut c);

        let mut safety = 100_000;
        while c.trial.as_ref().map(|t| t.phase) != Some(TrialPhase::Stimulus) {
            tick_frame(&mut c, &[]);
            safety -= 1;
            assert!(safety > 0);
        }
        // First stimulus frame: both patches start their cycles visible.
        tick_frame(&mut c, &[KeyAction::Response]);
        match &c.view.screen {
            ScreenState::Stimulus { patches, .. } => {
                assert!(patches[0].visible);
                assert!(patches[1].visible);
            }
            other => panic!("expected stimulus screen, got {other:?}"),
        }

        while c.log.is_empty() {
            tick_frame(&mut c, &[]);
            safety -= 1;
            assert!(safety > 0);
        }
        let record = c.log.last().unwrap();
        assert_eq!(record.response_times_ms.len(), 1);
        assert!(record.response_times_ms[0] >= 0.0);
        assert!(record.response_times_ms[0] < 100.0);
        std::fs::remove_file(&c.config.log_path).ok();
    }
}
