//! ufw control-plane adapter: typed views of ufw's text output and the
//! operations that drive the external `ufw` binary.

pub mod exec;
pub mod manager;
pub mod parser;

use serde::{Deserialize, Serialize};

pub use exec::{CommandOutput, CommandRunner, ExecError, SudoCommandRunner};
pub use manager::UfwManager;

/// Overall firewall state as reported by `ufw status`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatusKind {
    Active,
    Inactive,
    Unknown,
    Error,
}

/// Snapshot of the firewall's enabled/disabled state. Recomputed on every
/// query; never cached.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FirewallStatus {
    pub status: StatusKind,

    /// Raw trimmed output when the status line was not recognized.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<String>,

    /// Error detail when the command could not be run or failed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl FirewallStatus {
    pub fn active() -> Self {
        Self {
            status: StatusKind::Active,
            output: None,
            message: None,
        }
    }

    pub fn inactive() -> Self {
        Self {
            status: StatusKind::Inactive,
            output: None,
            message: None,
        }
    }

    pub fn unknown(raw: impl Into<String>) -> Self {
        Self {
            status: StatusKind::Unknown,
            output: Some(raw.into()),
            message: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            status: StatusKind::Error,
            output: None,
            message: Some(message.into()),
        }
    }
}

/// One parsed row of the ufw rule table. Field names mirror ufw's column
/// headers on the wire. Row order is ufw's 1-based rule numbering, which is
/// the only identifier accepted for deletion; it is not stable across any
/// mutation of the rule set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RuleRecord {
    #[serde(rename = "To")]
    pub to: String,

    #[serde(rename = "Action")]
    pub action: String,

    #[serde(rename = "From")]
    pub from: String,

    /// Set when ufw embeds directionality in the action cell ("ALLOW IN").
    #[serde(skip_serializing_if = "Option::is_none")]
    pub direction: Option<String>,
}

impl RuleRecord {
    pub fn new(to: impl Into<String>, action: impl Into<String>, from: impl Into<String>) -> Self {
        Self {
            to: to.into(),
            action: action.into(),
            from: from.into(),
            direction: None,
        }
    }
}

/// Combined result of a single `ufw status` invocation: the reported state
/// plus the rule table parsed from the same output.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RulesReport {
    pub status: StatusKind,
    pub rules: Vec<RuleRecord>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl RulesReport {
    pub fn empty(status: StatusKind) -> Self {
        Self {
            status,
            rules: Vec::new(),
            message: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            status: StatusKind::Error,
            rules: Vec::new(),
            message: Some(message.into()),
        }
    }
}

/// An inbound rule-creation request. Validated once, translated straight
/// into an argument vector; never persisted.
#[derive(Debug, Clone, Deserialize)]
pub struct RuleSpec {
    /// One of allow, deny, reject, limit.
    pub action: String,

    /// Port or port range, passed through to ufw as-is.
    pub port: String,

    /// Optional protocol (tcp, udp, ...).
    #[serde(default)]
    pub protocol: Option<String>,

    /// Optional direction; only literal "in"/"out" is forwarded to ufw.
    #[serde(default)]
    pub direction: Option<String>,

    /// Optional source address; "any" (in any case) is treated as absent.
    #[serde(default, alias = "from_ip")]
    pub source_address: Option<String>,
}

/// Outcome of every mutating operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OperationResult {
    pub status: ResultStatus,
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ResultStatus {
    Success,
    Error,
}

impl OperationResult {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            status: ResultStatus::Success,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            status: ResultStatus::Error,
            message: message.into(),
        }
    }
}
