use bon::bon;
use miette::{Diagnostic, Report};
pub use pipelight_error::{CastError, PipelightError, TomlError};
use std::fmt;

use thiserror::Error;

#[derive(Debug, Error, Diagnostic)]
pub enum WgError {
    ////////////////////////////////
    // Lib native errors
    #[error(transparent)]
    #[diagnostic(transparent)]
    WrapError(#[from] WrapError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    LibError(#[from] LibError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Joined(#[from] JoinedError),

    ////////////////////////////////
    // Addressing
    #[error("invalid address: {0}")]
    #[diagnostic(
        code(wgtool::address::invalid),
        help("expected an ip address or a cidr like \"10.0.0.1/24\"")
    )]
    InvalidAddress(String),

    #[error("invalid port: {0}")]
    #[diagnostic(
        code(wgtool::address::port),
        help("a listen port must be in the range 1..=65535")
    )]
    InvalidPort(u32),

    #[error("no address left to lease in network {0}")]
    #[diagnostic(
        code(wgtool::lease::exhausted),
        help("release unused leases or widen the network prefix")
    )]
    AddressSpaceExhausted(String),

    ////////////////////////////////
    // Topology
    #[error("node {0} has no uplink to connect to")]
    #[diagnostic(
        code(wgtool::topology::no_uplink),
        help("set the node uplink to the id of an uplink node")
    )]
    NoConnectPeer(u64),

    #[error("node {0} is declared as its own uplink")]
    #[diagnostic(code(wgtool::topology::cycle))]
    UplinkCycle(u64),

    #[error("node {id} is the uplink of {count} other node(s)")]
    #[diagnostic(
        code(wgtool::topology::referenced),
        help("detach or delete the dependent nodes first")
    )]
    NodeReferenced { id: u64, count: usize },

    #[error("node {0} is not an uplink")]
    #[diagnostic(
        code(wgtool::topology::not_uplink),
        help("only uplink nodes provision an interface from their record")
    )]
    NotUplink(u64),

    #[error("{0} not found")]
    #[diagnostic(code(wgtool::not_found))]
    NotFound(String),

    ////////////////////////////////
    // Wireguard
    #[error("invalid wireguard key: {0}")]
    #[diagnostic(
        code(wgtool::wireguard::key),
        help("keys are 32 bytes encoded as standard base64 (44 characters)")
    )]
    InvalidKey(String),

    ////////////////////////////////
    // Type convertion
    #[error(transparent)]
    #[diagnostic(code(strum::error))]
    StrumError(#[from] strum::ParseError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    CastError(#[from] CastError),

    #[error(transparent)]
    #[diagnostic(code(wgtool::io::error))]
    IoError(#[from] std::io::Error),

    ////////////////////////////////
    // Process execution
    #[error(transparent)]
    #[diagnostic(transparent)]
    PipelightError(#[from] PipelightError),

    // Database
    #[error(transparent)]
    #[diagnostic(code(sea_orm::error))]
    SeaOrmError(#[from] sea_orm::DbErr),
}

impl WgError {
    /**
    Merge an original failure with the failures that happened while
    handling it (usually rollback steps).
    Returns the original error untouched when there is nothing to add.
    */
    pub fn join(original: WgError, others: Vec<WgError>) -> WgError {
        if others.is_empty() {
            return original;
        }
        let mut joined = JoinedError::default();
        joined.push(original);
        for e in others {
            joined.push(e);
        }
        joined.into()
    }
}

/**
Several errors reported together.
Used when a parse of many entries or a rollback of many steps
fails more than once. Nested joins are flattened.
*/
#[derive(Debug, Default, Error, Diagnostic)]
#[diagnostic(code(wgtool::joined::error))]
pub struct JoinedError {
    #[related]
    errors: Vec<WgError>,
}
impl fmt::Display for JoinedError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let messages: Vec<String> = self.errors.iter().map(|e| e.to_string()).collect();
        write!(f, "{}", messages.join("\n"))
    }
}
impl JoinedError {
    pub fn push(&mut self, error: WgError) {
        match error {
            WgError::Joined(inner) => self.errors.extend(inner.errors),
            e => self.errors.push(e),
        }
    }
    pub fn errors(&self) -> &[WgError] {
        &self.errors
    }
    pub fn len(&self) -> usize {
        self.errors.len()
    }
    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }
    /// None when nothing was collected.
    pub fn into_error(self) -> Option<WgError> {
        match self.errors.len() {
            0 => None,
            _ => Some(self.into()),
        }
    }
}

/**
A config error with help higher origin
Can be recursively chained.
*/
#[derive(Debug, Error, Diagnostic)]
#[error("{}", message)]
#[diagnostic(code(wgtool::wrap::error))]
pub struct WrapError {
    pub message: String,
    #[diagnostic_source]
    pub origin: Report,
    #[help]
    pub help: String,
}

#[bon]
impl WrapError {
    #[builder]
    pub fn new(msg: &str, help: &str, origin: Report) -> Self {
        Self {
            message: msg.to_owned(),
            help: help.to_owned(),
            origin,
        }
    }
}

/**
A root cause error with no inner origin
*/
#[derive(Debug, Error, Diagnostic)]
#[error("{}", message)]
#[diagnostic(code(wgtool::lib::error))]
pub struct LibError {
    pub message: String,
    #[help]
    pub help: String,
}

#[bon]
impl LibError {
    #[builder]
    pub fn new(msg: &str, help: &str) -> Self {
        Self {
            message: msg.to_owned(),
            help: help.to_owned(),
        }
    }
}
