use std::env;
use std::time::Duration;

use crate::reconnect::ReconnectConfig;
use crate::trigger::DEFAULT_TRIGGER_SUBJECT;
use crate::RechargeError;

/// Default replenishment quantity.
pub const DEFAULT_REPLENISH_CREDITS: i64 = 5;

/// Servers drop IDLE after 30 minutes; re-issue it a minute earlier.
pub const DEFAULT_IDLE_TIMEOUT: Duration = Duration::from_secs(29 * 60);

/// Default bound on a single mail store command.
pub const DEFAULT_OP_TIMEOUT: Duration = Duration::from_secs(60);

/// Settings for the recharge subsystem.
#[derive(Debug, Clone)]
pub struct RechargeConfig {
    /// Mailbox watched for recharge replies.
    pub mailbox: String,
    /// Subject a reply must carry, compared exactly.
    pub trigger_subject: String,
    /// Balance an exhausted user is reset to.
    pub replenish_credits: i64,
    /// How long one IDLE waits before the keepalive rescan.
    pub idle_timeout: Duration,
    /// Bound on every other mail store command.
    pub op_timeout: Duration,
    /// Reconnect schedule after a lost session.
    pub reconnect: ReconnectConfig,
}

impl Default for RechargeConfig {
    fn default() -> Self {
        Self {
            mailbox: "INBOX".to_string(),
            trigger_subject: DEFAULT_TRIGGER_SUBJECT.to_string(),
            replenish_credits: DEFAULT_REPLENISH_CREDITS,
            idle_timeout: DEFAULT_IDLE_TIMEOUT,
            op_timeout: DEFAULT_OP_TIMEOUT,
            reconnect: ReconnectConfig::default(),
        }
    }
}

impl RechargeConfig {
    /// Load settings from the environment.
    ///
    /// All optional:
    /// - `RECHARGE_MAILBOX` - Default: INBOX
    /// - `RECHARGE_SUBJECT` - Default: recharge 5 credits
    /// - `RECHARGE_CREDITS` - Default: 5
    /// - `RECHARGE_IDLE_TIMEOUT_SECS` - Default: 1740
    /// - `RECHARGE_OP_TIMEOUT_SECS` - Default: 60
    pub fn from_env() -> Result<Self, RechargeError> {
        let defaults = Self::default();

        let mailbox = env::var("RECHARGE_MAILBOX").unwrap_or(defaults.mailbox);
        let trigger_subject = env::var("RECHARGE_SUBJECT").unwrap_or(defaults.trigger_subject);

        let replenish_credits = match env::var("RECHARGE_CREDITS") {
            Ok(v) => v
                .parse::<i64>()
                .ok()
                .filter(|n| *n > 0)
                .ok_or_else(|| {
                    RechargeError::Config(format!("Invalid RECHARGE_CREDITS: {}", v))
                })?,
            Err(_) => defaults.replenish_credits,
        };

        let idle_timeout = secs_from_env("RECHARGE_IDLE_TIMEOUT_SECS", defaults.idle_timeout)?;
        let op_timeout = secs_from_env("RECHARGE_OP_TIMEOUT_SECS", defaults.op_timeout)?;

        Ok(Self {
            mailbox,
            trigger_subject,
            replenish_credits,
            idle_timeout,
            op_timeout,
            reconnect: defaults.reconnect,
        })
    }

    /// Builder method to set the watched mailbox.
    pub fn with_mailbox(mut self, mailbox: impl Into<String>) -> Self {
        self.mailbox = mailbox.into();
        self
    }

    /// Builder method to set IDLE and command timeouts.
    pub fn with_timeouts(mut self, idle_timeout: Duration, op_timeout: Duration) -> Self {
        self.idle_timeout = idle_timeout;
        self.op_timeout = op_timeout;
        self
    }

    /// Builder method to set the reconnect schedule.
    pub fn with_reconnect(mut self, reconnect: ReconnectConfig) -> Self {
        self.reconnect = reconnect;
        self
    }
}

fn secs_from_env(key: &str, default: Duration) -> Result<Duration, RechargeError> {
    match env::var(key) {
        Ok(v) => v
            .parse::<u64>()
            .ok()
            .filter(|n| *n > 0)
            .map(Duration::from_secs)
            .ok_or_else(|| RechargeError::Config(format!("Invalid {}: {}", key, v))),
        Err(_) => Ok(default),
    }
}
