use oba_core::PatchId;

/// Classified outcome of one trial.
#[derive(Debug, Clone, PartialEq)]
pub struct TrialOutcome {
    /// Percent of correctly handled events; `None` on zero-event trials.
    pub accuracy_pct: Option<f64>,
    /// Mean hit latency in ms; `None` when there were no hits.
    pub mean_rt_ms: Option<f64>,
    pub hits: usize,
    pub correct_rejections: usize,
    pub false_alarms: usize,
}

/// Matches responses to events and scores the trial.
///
/// Each response can satisfy at most one event; events are considered in
/// onset order and take the earliest unconsumed response that falls within
/// `window_ms` after their onset. A matched response on a cued-patch event
/// is a hit; a non-cued event with no matching response is a correct
/// rejection; responses left unmatched are false alarms and do not enter
/// the accuracy denominator.
pub fn evaluate(
    cued: PatchId,
    events: &[(f64, PatchId)],
    responses: &[f64],
    window_ms: f64,
) -> TrialOutcome {
    let mut consumed = vec![false; responses.len()];
    let mut hits = 0usize;
    let mut correct_rejections = 0usize;
    let mut latencies: Vec<f64> = Vec::new();

    for &(onset_ms, patch) in events {
        let mut matched: Option<(usize, f64)> = None;
        for (i, &resp_ms) in responses.iter().enumerate() {
            if !consumed[i] && resp_ms >= onset_ms && resp_ms - onset_ms <= window_ms {
                matched = Some((i, resp_ms));
                break;
            }
        }
        match (patch == cued, matched) {
            (true, Some((i, resp_ms))) => {
                consumed[i] = true;
                hits += 1;
                latencies.push(resp_ms - onset_ms);
            }
            // Miss: a cued event the subject failed to report.
            (true, None) => {}
            // The subject responded to a non-cued event; the response is
            // spent but the event was handled incorrectly.
            (false, Some((i, _))) => {
                consumed[i] = true;
            }
            (false, None) => {
                correct_rejections += 1;
            }
        }
    }

    let false_alarms = consumed.iter().filter(|c| !**c).count();
    let accuracy_pct = if events.is_empty() {
        None
    } else {
        Some((hits + correct_rejections) as f64 / events.len() as f64 * 100.0)
    };
    let mean_rt_ms = if latencies.is_empty() {
        None
    } else {
        Some(latencies.iter().sum::<f64>() / latencies.len() as f64)
    };

    TrialOutcome {
        accuracy_pct,
        mean_rt_ms,
        hits,
        correct_rejections,
        false_alarms,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const WINDOW: f64 = 1000.0;

    #[test]
    fn timely_response_to_cued_event_is_a_hit() {
        let outcome = evaluate(PatchId::One, &[(1000.0, PatchId::One)], &[1300.0], WINDOW);
        assert_eq!(outcome.accuracy_pct, Some(100.0));
        assert_eq!(outcome.mean_rt_ms, Some(300.0));
        assert_eq!(outcome.hits, 1);
        assert_eq!(outcome.false_alarms, 0);
    }

    #[test]
    fn silence_on_non_cued_event_is_correct() {
        let outcome = evaluate(PatchId::One, &[(1000.0, PatchId::Two)], &[], WINDOW);
        assert_eq!(outcome.accuracy_pct, Some(100.0));
        assert_eq!(outcome.mean_rt_ms, None);
        assert_eq!(outcome.correct_rejections, 1);
    }

    #[test]
    fn late_response_misses_the_window() {
        let outcome = evaluate(PatchId::One, &[(1000.0, PatchId::One)], &[2500.0], WINDOW);
        assert_eq!(outcome.accuracy_pct, Some(0.0));
        assert_eq!(outcome.mean_rt_ms, None);
        assert_eq!(outcome.false_alarms, 1);
    }

    #[test]
    fn zero_event_trial_has_no_data() {
        let outcome = evaluate(PatchId::One, &[], &[], WINDOW);
        assert_eq!(outcome.accuracy_pct, None);
        assert_eq!(outcome.mean_rt_ms, None);
    }

    #[test]
    fn response_to_non_cued_event_costs_the_event_and_the_response() {
        let outcome = evaluate(PatchId::One, &[(1000.0, PatchId::Two)], &[1200.0], WINDOW);
        assert_eq!(outcome.accuracy_pct, Some(0.0));
        assert_eq!(outcome.correct_rejections, 0);
        assert_eq!(outcome.false_alarms, 0);
    }

    #[test]
    fn one_response_cannot_satisfy_two_events() {
        let events = [(1000.0, PatchId::One), (1400.0, PatchId::One)];
        let outcome = evaluate(PatchId::One, &events, &[1500.0], WINDOW);
        assert_eq!(outcome.hits, 1);
        assert_eq!(outcome.accuracy_pct, Some(50.0));
        assert_eq!(outcome.mean_rt_ms, Some(500.0));
    }

    #[test]
    fn two_hits_average_their_latencies() {
        let events = [(1000.0, PatchId::One), (3000.0, PatchId::One)];
        let outcome = evaluate(PatchId::One, &events, &[1200.0, 3600.0], WINDOW);
        assert_eq!(outcome.hits, 2);
        assert_eq!(outcome.accuracy_pct, Some(100.0));
        assert_eq!(outcome.mean_rt_ms, Some(400.0));
    }

    #[test]
    fn spontaneous_press_on_zero_event_trial_is_a_false_alarm() {
        let outcome = evaluate(PatchId::One, &[], &[2000.0], WINDOW);
        assert_eq!(outcome.accuracy_pct, None);
        assert_eq!(outcome.false_alarms, 1);
    }
}
