use std::{fs::read_to_string, os::unix::fs::PermissionsExt, path::Path};

use log::warn;
use lwptp::{
    config::{ClockIdentity, ClockQuality, InstanceConfig, PortConfig, ServoConfig},
    time::TimeInternal,
};
use serde::{Deserialize, Deserializer};
use timestamped_socket::interface::InterfaceName;

use crate::{network::TimestampingMode, tracing::LogLevel};

#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "kebab-case", deny_unknown_fields, default)]
pub struct Config {
    pub loglevel: LogLevel,
    /// Network interface to join the multicast groups on
    pub interface: Option<InterfaceName>,
    pub timestamping: TimestampingMode,
    #[serde(deserialize_with = "deserialize_clock_identity")]
    pub clock_identity: Option<ClockIdentity>,
    pub domain: u8,
    pub priority1: u8,
    pub priority2: u8,
    pub slave_only: bool,
    pub two_step: bool,
    pub clock_class: u8,
    pub clock_accuracy: u8,
    pub clock_variance: u16,
    pub utc_offset: i16,
    pub announce_interval_ms: u32,
    pub sync_interval_ms: u32,
    pub delay_request_interval_ms: u32,
    pub announce_receipt_timeout: u8,
    pub delay_mechanism: DelayMechanism,
    pub max_foreign_records: usize,
    pub inbound_latency_ns: i64,
    pub outbound_latency_ns: i64,
    pub servo: Servo,
}

#[derive(Deserialize, Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DelayMechanism {
    #[default]
    E2E,
    P2P,
    Disabled,
}

impl From<DelayMechanism> for lwptp::config::DelayMechanism {
    fn from(value: DelayMechanism) -> Self {
        match value {
            DelayMechanism::E2E => Self::E2E,
            DelayMechanism::P2P => Self::P2P,
            DelayMechanism::Disabled => Self::Disabled,
        }
    }
}

#[derive(Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "kebab-case", deny_unknown_fields, default)]
pub struct Servo {
    pub proportional_gain: i32,
    pub integral_gain: i32,
    pub delay_stiffness: u8,
    pub offset_stiffness: u8,
    pub no_adjust: bool,
    pub no_reset_clock: bool,
}

impl Default for Servo {
    fn default() -> Self {
        let servo = ServoConfig::default();

        Self {
            proportional_gain: servo.proportional_gain,
            integral_gain: servo.integral_gain,
            delay_stiffness: servo.delay_filter_stiffness,
            offset_stiffness: servo.offset_filter_stiffness,
            no_adjust: servo.no_adjust,
            no_reset_clock: servo.no_reset_clock,
        }
    }
}

impl From<Servo> for ServoConfig {
    fn from(servo: Servo) -> Self {
        Self {
            proportional_gain: servo.proportional_gain,
            integral_gain: servo.integral_gain,
            delay_filter_stiffness: servo.delay_stiffness,
            offset_filter_stiffness: servo.offset_stiffness,
            no_adjust: servo.no_adjust,
            no_reset_clock: servo.no_reset_clock,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        let instance = InstanceConfig::default();
        let port = PortConfig::default();

        Self {
            loglevel: LogLevel::default(),
            interface: None,
            timestamping: TimestampingMode::default(),
            clock_identity: None,
            domain: instance.domain_number,
            priority1: instance.priority_1,
            priority2: instance.priority_2,
            slave_only: instance.slave_only,
            two_step: instance.two_step,
            clock_class: instance.clock_quality.clock_class,
            clock_accuracy: instance.clock_quality.clock_accuracy,
            clock_variance: instance.clock_quality.offset_scaled_log_variance,
            utc_offset: instance.current_utc_offset,
            announce_interval_ms: port.announce_interval_ms,
            sync_interval_ms: port.sync_interval_ms,
            delay_request_interval_ms: port.delay_request_interval_ms,
            announce_receipt_timeout: port.announce_receipt_timeout,
            delay_mechanism: DelayMechanism::default(),
            max_foreign_records: port.max_foreign_records,
            inbound_latency_ns: 0,
            outbound_latency_ns: 0,
            servo: Servo::default(),
        }
    }
}

fn deserialize_clock_identity<'de, D>(deserializer: D) -> Result<Option<ClockIdentity>, D::Error>
where
    D: Deserializer<'de>,
{
    use hex::FromHex;
    use serde::de::Error;
    let raw: String = Deserialize::deserialize(deserializer)?;
    Ok(Some(ClockIdentity(<[u8; 8]>::from_hex(raw).map_err(
        |e| D::Error::custom(format!("Invalid clock identifier: {}", e)),
    )?)))
}

impl Config {
    /// Parse config from file
    pub fn from_file(file: &Path) -> Result<Config, ConfigError> {
        let meta = std::fs::metadata(file).map_err(ConfigError::Io)?;
        let perm = meta.permissions();

        if perm.mode() as libc::mode_t & libc::S_IWOTH != 0 {
            warn!("Unrestricted config file permissions: Others can write.");
        }

        let contents = read_to_string(file).map_err(ConfigError::Io)?;
        let config: Config = toml::de::from_str(&contents).map_err(ConfigError::Toml)?;
        config.warn_when_unreasonable();
        Ok(config)
    }

    /// Warns about unreasonable config values
    pub fn warn_when_unreasonable(&self) {
        if self.slave_only && self.priority1 != 255 {
            warn!("Slave-only clocks usually announce priority1 255.");
        }

        if self.sync_interval_ms > self.announce_interval_ms {
            warn!("Sync messages are sent less often than announce messages.");
        }

        if self.inbound_latency_ns < 0 || self.outbound_latency_ns < 0 {
            warn!("Negative latency corrections are configured.");
        }
    }

    pub fn instance_config(&self, clock_identity: ClockIdentity) -> InstanceConfig {
        InstanceConfig {
            clock_identity,
            priority_1: self.priority1,
            priority_2: self.priority2,
            domain_number: self.domain,
            slave_only: self.slave_only,
            two_step: self.two_step,
            clock_quality: ClockQuality {
                clock_class: self.clock_class,
                clock_accuracy: self.clock_accuracy,
                offset_scaled_log_variance: self.clock_variance,
            },
            current_utc_offset: self.utc_offset,
        }
    }

    pub fn port_config(&self) -> PortConfig {
        PortConfig {
            delay_mechanism: self.delay_mechanism.into(),
            announce_interval_ms: self.announce_interval_ms,
            announce_receipt_timeout: self.announce_receipt_timeout,
            sync_interval_ms: self.sync_interval_ms,
            delay_request_interval_ms: self.delay_request_interval_ms,
            max_foreign_records: self.max_foreign_records,
            inbound_latency: TimeInternal::from_nanos(self.inbound_latency_ns),
            outbound_latency: TimeInternal::from_nanos(self.outbound_latency_ns),
        }
    }

    pub fn servo_config(&self) -> ServoConfig {
        self.servo.into()
    }
}

#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("io error while reading config: {0}")]
    Io(#[from] std::io::Error),
    #[error("config toml parsing error: {0}")]
    Toml(#[from] toml::de::Error),
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use lwptp::config::DelayMechanism as PortDelayMechanism;

    use super::*;

    const MINIMAL_CONFIG: &str = r#"
interface = "enp0s31f6"
"#;

    #[test]
    fn minimal_config() {
        let config: Config = toml::from_str(MINIMAL_CONFIG).unwrap();

        let expected = Config {
            interface: Some(InterfaceName::from_str("enp0s31f6").unwrap()),
            ..Default::default()
        };
        assert_eq!(config, expected);

        let identity = ClockIdentity([1, 2, 3, 4, 5, 6, 7, 8]);
        assert_eq!(
            config.instance_config(identity),
            InstanceConfig {
                clock_identity: identity,
                ..Default::default()
            }
        );
        assert_eq!(config.port_config(), PortConfig::default());
        assert_eq!(config.servo_config(), ServoConfig::default());
    }

    #[test]
    fn full_config() {
        let config: Config = toml::from_str(
            r#"
loglevel = "debug"
interface = "eth1"
timestamping = "hardware"
clock-identity = "00ff00ff00ff00ff"
domain = 3
priority1 = 100
priority2 = 110
slave-only = false
two-step = false
clock-class = 6
clock-accuracy = 33
clock-variance = 20061
utc-offset = 36
announce-interval-ms = 1000
sync-interval-ms = 125
delay-request-interval-ms = 500
announce-receipt-timeout = 4
delay-mechanism = "P2P"
max-foreign-records = 3
inbound-latency-ns = 1200
outbound-latency-ns = 800

[servo]
proportional-gain = 5
integral-gain = 200
delay-stiffness = 4
offset-stiffness = 2
no-adjust = true
"#,
        )
        .unwrap();

        assert_eq!(config.loglevel, LogLevel::Debug);
        assert_eq!(config.interface, Some(InterfaceName::from_str("eth1").unwrap()));
        assert_eq!(config.timestamping, TimestampingMode::Hardware);
        assert_eq!(
            config.clock_identity,
            Some(ClockIdentity([0x00, 0xff, 0x00, 0xff, 0x00, 0xff, 0x00, 0xff]))
        );

        let instance = config.instance_config(ClockIdentity::default());
        assert_eq!(instance.domain_number, 3);
        assert_eq!(instance.priority_1, 100);
        assert!(!instance.two_step);
        assert_eq!(instance.clock_quality.clock_class, 6);
        assert_eq!(instance.clock_quality.offset_scaled_log_variance, 0x4e5d);
        assert_eq!(instance.current_utc_offset, 36);

        let port = config.port_config();
        assert_eq!(port.delay_mechanism, PortDelayMechanism::P2P);
        assert_eq!(port.sync_interval_ms, 125);
        assert_eq!(port.announce_receipt_timeout, 4);
        assert_eq!(port.max_foreign_records, 3);
        assert_eq!(port.inbound_latency, TimeInternal::from_nanos(1200));
        assert_eq!(port.validate(5), Ok(()));

        let servo = config.servo_config();
        assert_eq!(servo.proportional_gain, 5);
        assert_eq!(servo.delay_filter_stiffness, 4);
        assert!(servo.no_adjust);
        assert!(!servo.no_reset_clock);
    }

    #[test]
    fn invalid_clock_identity() {
        let result: Result<Config, _> = toml::from_str(r#"clock-identity = "00ff00""#);
        assert!(result.is_err());
    }

    #[test]
    fn unknown_timestamping_mode() {
        let result: Result<Config, _> = toml::from_str(r#"timestamping = "user""#);
        assert!(result.is_err());
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let result: Result<Config, _> = toml::from_str(r#"sdo-id = 1"#);
        assert!(result.is_err());

        let result: Result<Config, _> = toml::from_str("[servo]\nderivative-gain = 1");
        assert!(result.is_err());
    }
}
