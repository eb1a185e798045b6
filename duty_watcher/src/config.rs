//! Argument parsing and validation. Kept deliberately dumb: build a `Config`, validate it once,
//! and never touch `clap` again afterwards. The interesting cross-field invariants (thresholds,
//! mutually exclusive validator sources, mode-specific requirements) are checked in
//! [`Config::validate`] rather than scattered through `clap` value parsers, so that they can be
//! unit tested without going through argument parsing at all.

use crate::error::Error;
use clap::{Parser, ValueEnum};
use sensitive_url::SensitiveUrl;
use std::path::PathBuf;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Mode {
    Log,
    NoLog,
    CicdExit,
    CicdWait,
    CicdForceGracefulExit,
}

impl Mode {
    pub fn is_cicd(&self) -> bool {
        !matches!(self, Mode::Log | Mode::NoLog)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rgb(pub u8, pub u8, pub u8);

impl FromStr for Rgb {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if let Some(hex) = s.strip_prefix('#') {
            if hex.len() != 6 {
                return Err(format!("expected #RRGGBB, got {s}"));
            }
            let r = u8::from_str_radix(&hex[0..2], 16).map_err(|e| e.to_string())?;
            let g = u8::from_str_radix(&hex[2..4], 16).map_err(|e| e.to_string())?;
            let b = u8::from_str_radix(&hex[4..6], 16).map_err(|e| e.to_string())?;
            Ok(Rgb(r, g, b))
        } else {
            let parts: Vec<&str> = s.split(',').collect();
            if parts.len() != 3 {
                return Err(format!("expected R,G,B or #RRGGBB, got {s}"));
            }
            let r = parts[0].trim().parse().map_err(|_| format!("bad component in {s}"))?;
            let g = parts[1].trim().parse().map_err(|_| format!("bad component in {s}"))?;
            let b = parts[2].trim().parse().map_err(|_| format!("bad component in {s}"))?;
            Ok(Rgb(r, g, b))
        }
    }
}

#[derive(Parser, Debug, Clone)]
#[command(name = "duty_watcher", about = "Reports upcoming validator duties")]
pub struct Args {
    #[arg(long, value_delimiter = ',')]
    pub beacon_nodes: Vec<String>,

    #[arg(long, default_value_t = 60)]
    pub interval: u64,

    #[arg(long, default_value = "INFO")]
    pub log: String,

    #[arg(long, default_value_t = false)]
    pub log_pubkeys: bool,

    #[arg(long, default_value = "255,165,0")]
    pub log_color_warning: String,
    #[arg(long, default_value = "255,0,0")]
    pub log_color_critical: String,
    #[arg(long, default_value = "0,0,255")]
    pub log_color_proposing: String,

    #[arg(long, default_value_t = 300)]
    pub log_time_warning: u64,
    #[arg(long, default_value_t = 60)]
    pub log_time_critical: u64,

    #[arg(long, default_value_t = 100)]
    pub max_attestation_duty_logs: usize,

    #[arg(long, value_enum, default_value = "log")]
    pub mode: Mode,

    #[arg(long, default_value_t = 1800)]
    pub mode_cicd_waiting_time: u64,

    #[arg(long, default_value_t = 360)]
    pub mode_cicd_attestation_time: u64,

    #[arg(long, default_value_t = 0.85)]
    pub mode_cicd_attestation_proportion: f64,

    #[arg(long, default_value_t = false)]
    pub omit_attestation_duties: bool,

    #[arg(long, default_value_t = false)]
    pub rest: bool,
    #[arg(long, default_value = "127.0.0.1")]
    pub rest_host: String,
    #[arg(long, default_value_t = 5064)]
    pub rest_port: u16,

    #[arg(long, value_delimiter = ',')]
    pub validators: Vec<String>,
    #[arg(long)]
    pub validators_file: Option<PathBuf>,
    #[arg(long)]
    pub validator_nodes: Option<PathBuf>,

    #[arg(long, default_value_t = 15)]
    pub validator_update_interval: u64,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub beacon_nodes: Vec<SensitiveUrl>,
    pub interval: u64,
    pub log_level: logging::LogLevel,
    pub log_pubkeys: bool,
    pub log_color_warning: Rgb,
    pub log_color_critical: Rgb,
    pub log_color_proposing: Rgb,
    pub log_time_warning: u64,
    pub log_time_critical: u64,
    pub max_attestation_duty_logs: usize,
    pub mode: Mode,
    pub mode_cicd_waiting_time: u64,
    pub mode_cicd_attestation_time: u64,
    pub mode_cicd_attestation_proportion: f64,
    pub omit_attestation_duties: bool,
    pub rest: bool,
    pub rest_host: String,
    pub rest_port: u16,
    pub validators: Vec<String>,
    pub validators_file: Option<PathBuf>,
    pub validator_nodes: Option<PathBuf>,
    pub validator_update_interval: u64,
}

impl Config {
    pub fn from_args(args: Args) -> Result<Self, Error> {
        let beacon_nodes = args
            .beacon_nodes
            .iter()
            .map(|s| {
                if !s.starts_with("http://") && !s.starts_with("https://") {
                    return Err(Error::Config(format!(
                        "beacon node URL must start with http:// or https://: {s}"
                    )));
                }
                SensitiveUrl::parse(s)
                    .map_err(|e| Error::Config(format!("invalid beacon node URL {s}: {e}")))
            })
            .collect::<Result<Vec<_>, _>>()?;

        let log_level = args
            .log
            .parse()
            .map_err(Error::Config)?;

        let config = Config {
            beacon_nodes,
            interval: args.interval,
            log_level,
            log_pubkeys: args.log_pubkeys,
            log_color_warning: args.log_color_warning.parse().map_err(Error::Config)?,
            log_color_critical: args.log_color_critical.parse().map_err(Error::Config)?,
            log_color_proposing: args.log_color_proposing.parse().map_err(Error::Config)?,
            log_time_warning: args.log_time_warning,
            log_time_critical: args.log_time_critical,
            max_attestation_duty_logs: args.max_attestation_duty_logs,
            mode: args.mode,
            mode_cicd_waiting_time: args.mode_cicd_waiting_time,
            mode_cicd_attestation_time: args.mode_cicd_attestation_time,
            mode_cicd_attestation_proportion: args.mode_cicd_attestation_proportion,
            omit_attestation_duties: args.omit_attestation_duties,
            rest: args.rest,
            rest_host: args.rest_host,
            rest_port: args.rest_port,
            validators: args.validators,
            validators_file: args.validators_file,
            validator_nodes: args.validator_nodes,
            validator_update_interval: args.validator_update_interval,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), Error> {
        if self.interval < 12 {
            return Err(Error::Config(format!(
                "--interval must be >= 12 (one slot), got {}",
                self.interval
            )));
        }

        if self.log_time_warning < self.log_time_critical {
            return Err(Error::Config(
                "--log-time-warning must be >= --log-time-critical".to_string(),
            ));
        }
        if self.log_time_critical == 0 || self.log_time_warning == 0 {
            return Err(Error::Config(
                "--log-time-warning/--log-time-critical must be > 0".to_string(),
            ));
        }

        if !(0.0..=1.0).contains(&self.mode_cicd_attestation_proportion) {
            return Err(Error::Config(format!(
                "--mode-cicd-attestation-proportion must be within [0, 1], got {}",
                self.mode_cicd_attestation_proportion
            )));
        }

        let has_validators = !self.validators.is_empty();
        let has_validators_file = self.validators_file.is_some();
        if has_validators && has_validators_file {
            return Err(Error::Config(
                "exactly one of --validators / --validators-file may be supplied".to_string(),
            ));
        }
        if !has_validators && !has_validators_file && self.validator_nodes.is_none() {
            return Err(Error::Config(
                "at least one of --validators, --validators-file, --validator-nodes is required"
                    .to_string(),
            ));
        }

        if self.mode == Mode::CicdWait && self.mode_cicd_waiting_time < self.interval {
            return Err(Error::Config(
                "--mode-cicd-waiting-time must be >= --interval in cicd-wait mode".to_string(),
            ));
        }

        if self.beacon_nodes.is_empty() {
            return Err(Error::Config(
                "at least one --beacon-nodes URL is required".to_string(),
            ));
        }

        Ok(())
    }
}
