//! Renders the duty list to the console (spec.md §4.7 "Log renderer"). Each line names the
//! validator (alias, pubkey, or index, per `--log-pubkeys`), the duty type, and a countdown;
//! lines whose duty is imminent are coloured, and a closing line summarises how comfortable the
//! whole schedule is. Colour is applied as raw 24-bit ANSI escapes rather than through a crate:
//! this is the one place in the binary that needs it, and the teacher's own dependency set
//! carries nothing for terminal colour.

use crate::config::{Config, Rgb};
use crate::duties::{DutyType, ValidatorDuty};
use crate::identifiers::registry::IdentifierRegistry;
use crate::identifiers::ValidatorIdentifier;
use crate::slot_clock::SlotClock;
use slog::{info, Logger};

fn ansi(rgb: Rgb, text: &str) -> String {
    format!("\x1b[38;2;{};{};{}m{}\x1b[0m", rgb.0, rgb.1, rgb.2, text)
}

/// `MM:SS` under an hour, `HH:MM:SS` otherwise. Negative durations (the duty has already
/// passed but the store hasn't been refreshed yet) are reported as outdated instead.
fn format_countdown(seconds: i64) -> String {
    if seconds < 0 {
        return "outdated; will refetch".to_string();
    }
    let h = seconds / 3600;
    let m = (seconds % 3600) / 60;
    let s = seconds % 60;
    if h > 0 {
        format!("{h:02}:{m:02}:{s:02}")
    } else {
        format!("{m:02}:{s:02}")
    }
}

fn label(duty_type: DutyType) -> &'static str {
    match duty_type {
        DutyType::Attestation => "attestation",
        DutyType::Proposing => "block proposal",
        DutyType::SyncCommittee => "sync committee",
        DutyType::None => "none",
    }
}

fn identifier_for(registry_snapshot: &std::collections::HashMap<u64, ValidatorIdentifier>, duty: &ValidatorDuty) -> ValidatorIdentifier {
    registry_snapshot
        .get(&duty.validator_index)
        .cloned()
        .unwrap_or(ValidatorIdentifier {
            index: duty.validator_index,
            pubkey: duty.pubkey.clone(),
            alias: None,
        })
}

/// One rendered line for a single duty, with colour applied per spec.md §4.7's thresholds:
/// anything due within `log_time_critical` seconds gets `log_color_critical`; else within
/// `log_time_warning`, `log_color_warning`; else proposing duties get `log_color_proposing`;
/// otherwise no colour. Sync-committee rows bypass the threshold check entirely: current-period
/// membership is always `log_color_critical`, next-period membership always `log_color_warning`,
/// since their `seconds_to_duty` measures something other than an imminent moment.
pub fn render_line(
    duty: &ValidatorDuty,
    who: &str,
    clock: &SlotClock,
    config: &Config,
) -> String {
    let seconds = duty.seconds_to_duty(clock);
    let mut line = format!("{who}: {} in {}", label(duty.duty_type), format_countdown(seconds));

    if let Some(left) = duty.seconds_left_in_committee(clock) {
        line.push_str(&format!(" ({} left in committee)", format_countdown(left)));
    }

    if duty.duty_type == DutyType::SyncCommittee {
        let colour = if duty.epoch == 0 {
            config.log_color_critical
        } else {
            config.log_color_warning
        };
        return ansi(colour, &line);
    }

    if seconds >= 0 && seconds <= config.log_time_critical as i64 {
        return ansi(config.log_color_critical, &line);
    }
    if seconds >= 0 && seconds <= config.log_time_warning as i64 {
        return ansi(config.log_color_warning, &line);
    }
    if duty.duty_type == DutyType::Proposing {
        return ansi(config.log_color_proposing, &line);
    }
    line
}

/// Fraction of all duties (0-100) executing no sooner than `log_time_warning` seconds from now;
/// the closing summary line spec.md §4.7 describes as a schedule-comfort indicator.
pub fn comfortable_percentage(duties: &[ValidatorDuty], clock: &SlotClock, config: &Config) -> f64 {
    if duties.is_empty() {
        return 100.0;
    }
    let comfortable = duties
        .iter()
        .filter(|d| d.seconds_to_duty(clock) >= config.log_time_warning as i64)
        .count();
    100.0 * comfortable as f64 / duties.len() as f64
}

pub fn render(duties: &[ValidatorDuty], registry: &IdentifierRegistry, clock: &SlotClock, config: &Config, log: &Logger) {
    let snapshot = registry.snapshot();
    if duties.is_empty() {
        info!(log, "No duties scheduled for the active validator set");
        return;
    }

    for duty in duties {
        let identifier = identifier_for(&snapshot, duty);
        let who = identifier.display(config.log_pubkeys);
        info!(log, "{}", render_line(duty, &who, clock, config));
    }

    let percent = comfortable_percentage(duties, clock, config);
    info!(
        log,
        "{:.2}% of all duties will be executed in \u{2265} {} sec",
        percent,
        config.log_time_warning,
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    fn duty(duty_type: DutyType, slot: u64) -> ValidatorDuty {
        ValidatorDuty {
            pubkey: "0xaa".to_string(),
            validator_index: 1,
            duty_type,
            epoch: 0,
            slot,
            validator_sync_committee_indices: vec![],
        }
    }

    fn sync_committee_duty(epoch: u64) -> ValidatorDuty {
        ValidatorDuty {
            pubkey: "0xaa".to_string(),
            validator_index: 1,
            duty_type: DutyType::SyncCommittee,
            epoch,
            slot: 0,
            validator_sync_committee_indices: vec![3],
        }
    }

    fn test_config() -> Config {
        let config_args = crate::config::Args {
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
            mode: crate::config::Mode::Log,
            mode_cicd_waiting_time: 1800,
            mode_cicd_attestation_time: 360,
            mode_cicd_attestation_proportion: 0.85,
            omit_attestation_duties: false,
            rest: false,
            rest_host: "127.0.0.1".to_string(),
            rest_port: 5064,
            validators: vec!["1".to_string()],
            validators_file: None,
            validator_nodes: None,
            validator_update_interval: 15,
        };
        Config::from_args(config_args).unwrap()
    }

    #[test]
    fn formats_sub_hour_as_mm_ss() {
        assert_eq!(format_countdown(90), "01:30");
    }

    #[test]
    fn formats_over_hour_as_hh_mm_ss() {
        assert_eq!(format_countdown(3661), "01:01:01");
    }

    #[test]
    fn negative_countdown_is_outdated() {
        assert_eq!(format_countdown(-5), "outdated; will refetch");
    }

    #[test]
    fn all_duties_due_now_are_zero_percent_comfortable() {
        let clock = SlotClock::new(0);
        let config = test_config();
        let duties = vec![duty(DutyType::Attestation, 0)];
        assert_eq!(comfortable_percentage(&duties, &clock, &config), 0.0);
    }

    #[test]
    fn imminent_proposing_duty_is_critical_not_proposing_colour() {
        // slot 0 is due immediately, well within log_time_critical -- critical must win over
        // the proposing-duty default, per spec.md §4.7's precedence.
        let clock = SlotClock::new(0);
        let config = test_config();
        let line = render_line(&duty(DutyType::Proposing, 0), "1", &clock, &config);
        assert!(line.contains(&format!(
            "{};{};{}",
            config.log_color_critical.0, config.log_color_critical.1, config.log_color_critical.2
        )));
    }

    #[test]
    fn distant_proposing_duty_keeps_proposing_colour() {
        let clock = SlotClock::new(0);
        let config = test_config();
        // Far beyond both thresholds, so the proposing-duty default colour applies.
        let line = render_line(&duty(DutyType::Proposing, 1_000_000), "1", &clock, &config);
        assert!(line.contains(&format!(
            "{};{};{}",
            config.log_color_proposing.0, config.log_color_proposing.1, config.log_color_proposing.2
        )));
    }

    #[test]
    fn current_period_sync_committee_is_always_critical() {
        let clock = SlotClock::new(0);
        let config = test_config();
        let line = render_line(&sync_committee_duty(0), "1", &clock, &config);
        assert!(line.contains(&format!(
            "{};{};{}",
            config.log_color_critical.0, config.log_color_critical.1, config.log_color_critical.2
        )));
    }

    #[test]
    fn next_period_sync_committee_is_always_warning() {
        let clock = SlotClock::new(0);
        let config = test_config();
        let line = render_line(&sync_committee_duty(256), "1", &clock, &config);
        assert!(line.contains(&format!(
            "{};{};{}",
            config.log_color_warning.0, config.log_color_warning.1, config.log_color_warning.2
        )));
    }
}
