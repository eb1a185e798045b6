//! CI/CD gating decisions (spec.md §4.9 "CI/CD terminator"). In `log`/`no-log` mode the process
//! just keeps running; the three `cicd-*` modes instead watch the duty schedule and decide when
//! it's safe for a deployment pipeline to proceed, expressed as a process exit code: `0` means
//! go ahead, `1` means validators have duties imminent enough that the pipeline should hold off
//! or treat this as a failure.

use crate::config::{Config, Mode};
use crate::duties::{DutyType, ValidatorDuty};
use crate::slot_clock::SlotClock;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// Keep running the watch loop.
    Continue,
    /// Terminate the process with this exit code.
    Exit(i32),
}

/// "Relevant upcoming duties", per spec.md §4.9:
///
/// 1. an empty duty list is never relevant;
/// 2. any non-attestation duty (proposing or sync-committee) makes the whole list relevant,
///    regardless of timing — those duties can't be deferred by waiting out a proportion;
/// 3. otherwise (every duty is an attestation) the list is relevant iff the fraction of
///    attestation duties at least `mode_cicd_attestation_time` seconds away is strictly less
///    than `mode_cicd_attestation_proportion` — i.e. too few attestations are comfortably far
///    off.
fn has_relevant_upcoming_duties(duties: &[ValidatorDuty], clock: &SlotClock, config: &Config) -> bool {
    if duties.is_empty() {
        return false;
    }
    if duties.iter().any(|d| d.duty_type != DutyType::Attestation) {
        return true;
    }

    let far_enough = duties
        .iter()
        .filter(|d| d.seconds_to_duty(clock) >= config.mode_cicd_attestation_time as i64)
        .count();
    let far_enough_fraction = far_enough as f64 / duties.len() as f64;
    far_enough_fraction < config.mode_cicd_attestation_proportion
}

/// Whether the current schedule is calm enough to proceed: there are no relevant upcoming
/// duties. `Config::validate` has already clamped the proportion to `[0, 1]`.
pub fn safe_to_proceed(duties: &[ValidatorDuty], clock: &SlotClock, config: &Config) -> bool {
    !has_relevant_upcoming_duties(duties, clock, config)
}

/// One evaluation of the terminator. `waited` is how long the watcher has been running in
/// `cicd-wait` mode; irrelevant to the other modes.
pub fn evaluate(
    mode: Mode,
    duties: &[ValidatorDuty],
    clock: &SlotClock,
    config: &Config,
    waited: Duration,
) -> Decision {
    match mode {
        Mode::Log | Mode::NoLog => Decision::Continue,
        Mode::CicdForceGracefulExit => Decision::Exit(0),
        Mode::CicdExit => {
            if safe_to_proceed(duties, clock, config) {
                Decision::Exit(0)
            } else {
                Decision::Exit(1)
            }
        }
        Mode::CicdWait => {
            if safe_to_proceed(duties, clock, config) {
                Decision::Exit(0)
            } else if waited.as_secs() >= config.mode_cicd_waiting_time {
                Decision::Exit(1)
            } else {
                Decision::Continue
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::duties::DutyType;

    fn config(mode: Mode, proportion: f64, attestation_time: u64, waiting_time: u64) -> Config {
        let args = crate::config::Args {
            beacon_nodes: vec!["http://localhost:5052".to_string()],
            interval: 60,
            log: "INFO".to_string(),
            log_pubkeys: false,
            log_color_warning: "255,165,0".to_string(),
            log_color_critical: "255,0,0".to_string(),
            log_color_proposing: "0,0,255".to_string(),
            log_time_warning: 300,
            log_time_critical: 60,
            max_attestation_duty_logs: 100,
            mode,
            mode_cicd_waiting_time: waiting_time,
            mode_cicd_attestation_time: attestation_time,
            mode_cicd_attestation_proportion: proportion,
            omit_attestation_duties: false,
            rest: false,
            rest_host: "127.0.0.1".to_string(),
            rest_port: 5064,
            validators: vec!["1".to_string()],
            validators_file: None,
            validator_nodes: None,
            validator_update_interval: 15,
        };
        Config::from_args(args).unwrap()
    }

    /// An attestation duty `seconds_from_now` seconds away, expressed as a slot (genesis = 0,
    /// so `seconds_to_duty == slot * 12`).
    fn attestation_duty(seconds_from_now: i64) -> ValidatorDuty {
        ValidatorDuty {
            pubkey: "0xaa".to_string(),
            validator_index: 1,
            duty_type: DutyType::Attestation,
            epoch: 0,
            slot: (seconds_from_now / 12) as u64,
            validator_sync_committee_indices: vec![],
        }
    }

    fn proposing_duty(slot: u64) -> ValidatorDuty {
        ValidatorDuty {
            pubkey: "0xaa".to_string(),
            validator_index: 1,
            duty_type: DutyType::Proposing,
            epoch: 0,
            slot,
            validator_sync_committee_indices: vec![],
        }
    }

    #[test]
    fn force_graceful_exit_always_exits_zero() {
        let config = config(Mode::CicdForceGracefulExit, 0.5, 360, 1800);
        let clock = SlotClock::new(0);
        let decision = evaluate(Mode::CicdForceGracefulExit, &[], &clock, &config, Duration::ZERO);
        assert_eq!(decision, Decision::Exit(0));
    }

    #[test]
    fn empty_duty_list_is_never_relevant() {
        let config = config(Mode::CicdExit, 0.85, 360, 1800);
        let clock = SlotClock::new(0);
        let decision = evaluate(Mode::CicdExit, &[], &clock, &config, Duration::ZERO);
        assert_eq!(decision, Decision::Exit(0));
    }

    #[test]
    fn any_non_attestation_duty_is_always_relevant() {
        // A lone proposing duty far in the future still forces exit 1 — spec.md §4.9 rule 2
        // makes non-attestation duties relevant unconditionally, with no timing exception.
        let config = config(Mode::CicdExit, 0.0, 1, 1800);
        let clock = SlotClock::new(0);
        let duties = vec![proposing_duty(1_000_000)];
        let decision = evaluate(Mode::CicdExit, &duties, &clock, &config, Duration::ZERO);
        assert_eq!(decision, Decision::Exit(1));
    }

    /// spec.md §8 scenario 6, first case: 3/3 attestations at 300s, threshold 240s, proportion
    /// 1.0. 3/3 >= 240 satisfies the proportion exactly (not strictly less) -> not relevant.
    #[test]
    fn scenario_six_first_case_exits_zero() {
        let config = config(Mode::CicdExit, 1.0, 240, 1800);
        let clock = SlotClock::new(0);
        let duties = vec![attestation_duty(300), attestation_duty(300), attestation_duty(300)];
        let decision = evaluate(Mode::CicdExit, &duties, &clock, &config, Duration::ZERO);
        assert_eq!(decision, Decision::Exit(0));
    }

    /// spec.md §8 scenario 6, second case: 1 duty at 100s, 2 at 300s, threshold 240s, proportion
    /// 0.5. 2/3 >= 240 is 0.667, not < 0.5 -> not relevant.
    #[test]
    fn scenario_six_second_case_exits_zero() {
        let config = config(Mode::CicdExit, 0.5, 240, 1800);
        let clock = SlotClock::new(0);
        let duties = vec![attestation_duty(100), attestation_duty(300), attestation_duty(300)];
        let decision = evaluate(Mode::CicdExit, &duties, &clock, &config, Duration::ZERO);
        assert_eq!(decision, Decision::Exit(0));
    }

    /// spec.md §8 scenario 6, third case: same duties, proportion 0.75. 2/3 = 0.667 < 0.75 ->
    /// relevant -> exit 1.
    #[test]
    fn scenario_six_third_case_exits_one() {
        let config = config(Mode::CicdExit, 0.75, 240, 1800);
        let clock = SlotClock::new(0);
        let duties = vec![attestation_duty(100), attestation_duty(300), attestation_duty(300)];
        let decision = evaluate(Mode::CicdExit, &duties, &clock, &config, Duration::ZERO);
        assert_eq!(decision, Decision::Exit(1));
    }

    #[test]
    fn cicd_exit_passes_when_nothing_imminent() {
        let config = config(Mode::CicdExit, 0.5, 12, 1800);
        let clock = SlotClock::new(0);
        let duties = vec![attestation_duty(i64::MAX / 12 * 12)];
        let decision = evaluate(Mode::CicdExit, &duties, &clock, &config, Duration::ZERO);
        assert_eq!(decision, Decision::Exit(0));
    }

    #[test]
    fn cicd_wait_continues_until_waiting_time_elapses() {
        let config = config(Mode::CicdWait, 0.5, 3600, 1800);
        let clock = SlotClock::new(0);
        let duties = vec![attestation_duty(0)];
        let decision = evaluate(
            Mode::CicdWait,
            &duties,
            &clock,
            &config,
            Duration::from_secs(60),
        );
        assert_eq!(decision, Decision::Continue);

        let decision = evaluate(
            Mode::CicdWait,
            &duties,
            &clock,
            &config,
            Duration::from_secs(1800),
        );
        assert_eq!(decision, Decision::Exit(1));
    }

    #[test]
    fn log_mode_never_terminates() {
        let config = config(Mode::Log, 0.5, 360, 1800);
        let clock = SlotClock::new(0);
        let decision = evaluate(Mode::Log, &[], &clock, &config, Duration::ZERO);
        assert_eq!(decision, Decision::Continue);
    }
}
