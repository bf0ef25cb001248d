//! Driver error types and translation of transport/server error records.

use docdb_bson::CodecError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Error domains reported by the transport layer.
pub mod domain {
    pub const CLIENT: u32 = 1;
    pub const STREAM: u32 = 2;
    pub const PROTOCOL: u32 = 3;
    pub const CURSOR: u32 = 4;
    pub const QUERY: u32 = 5;
    pub const INSERT: u32 = 6;
    pub const SASL: u32 = 7;
    pub const BSON: u32 = 8;
    pub const MATCHER: u32 = 9;
    pub const NAMESPACE: u32 = 10;
    pub const COMMAND: u32 = 11;
    pub const COLLECTION: u32 = 12;
    pub const GRIDFS: u32 = 13;
    pub const SCRAM: u32 = 14;
    pub const SERVER_SELECTION: u32 = 15;
    pub const WRITE_CONCERN: u32 = 16;
    pub const SERVER: u32 = 17;
    pub const TRANSACTION: u32 = 18;
}

/// Well-known error codes.
///
/// Codes below 100 in the `CLIENT`/`STREAM`/`PROTOCOL`/`CURSOR` domains are
/// driver codes; codes in the `SERVER` domain are server codes.
pub mod code {
    // Driver codes
    pub const STREAM_SOCKET: u32 = 4;
    pub const STREAM_CONNECT: u32 = 5;
    pub const STREAM_NOT_ESTABLISHED: u32 = 6;
    pub const CLIENT_NOT_READY: u32 = 7;
    pub const CLIENT_AUTHENTICATE: u32 = 11;
    pub const PROTOCOL_INVALID_REPLY: u32 = 14;
    pub const CURSOR_INVALID_CURSOR: u32 = 16;
    pub const QUERY_FAILURE: u32 = 17;

    // Server codes
    pub const BAD_VALUE: u32 = 2;
    pub const NO_SUCH_KEY: u32 = 4;
    pub const HOST_UNREACHABLE: u32 = 6;
    pub const HOST_NOT_FOUND: u32 = 7;
    pub const FAILED_TO_PARSE: u32 = 9;
    pub const USER_NOT_FOUND: u32 = 11;
    pub const UNAUTHORIZED: u32 = 13;
    pub const TYPE_MISMATCH: u32 = 14;
    pub const AUTHENTICATION_FAILED: u32 = 18;
    pub const ILLEGAL_OPERATION: u32 = 20;
    pub const NAMESPACE_NOT_FOUND: u32 = 26;
    pub const INDEX_NOT_FOUND: u32 = 27;
    pub const CURSOR_NOT_FOUND: u32 = 43;
    pub const EXCEEDED_TIME_LIMIT: u32 = 50;
    pub const COMMAND_NOT_FOUND: u32 = 59;
    pub const NETWORK_TIMEOUT: u32 = 89;
    pub const SHUTDOWN_IN_PROGRESS: u32 = 91;
    pub const QUERY_PLAN_KILLED: u32 = 175;
    pub const PRIMARY_STEPPED_DOWN: u32 = 189;
    pub const SOCKET_EXCEPTION: u32 = 9001;
    pub const DUPLICATE_KEY: u32 = 11000;
    pub const INTERRUPTED_AT_SHUTDOWN: u32 = 11600;
    pub const INTERRUPTED_DUE_TO_REPL_STATE_CHANGE: u32 = 11602;
}

/// Raw `{domain, code, message}` error as reported by the transport or server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorRecord {
    pub domain: u32,
    pub code: u32,
    pub message: String,
}

impl ErrorRecord {
    pub fn new(domain: u32, code: u32, message: impl Into<String>) -> Self {
        Self {
            domain,
            code,
            message: message.into(),
        }
    }

    /// Record for a fetch that exceeded its deadline.
    pub fn fetch_timeout(after: Duration) -> Self {
        Self::new(
            domain::STREAM,
            code::STREAM_SOCKET,
            format!("fetch timed out after {:?}", after),
        )
    }

    /// Record for a cursor whose transport has already been dropped.
    pub fn transport_closed() -> Self {
        Self::new(
            domain::CLIENT,
            code::CLIENT_NOT_READY,
            "transport is closed",
        )
    }
}

impl fmt::Display for ErrorRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} (domain: {}, code: {})",
            self.message, self.domain, self.code
        )
    }
}

/// Error kinds callers can branch on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Codec,
    Connection,
    Authentication,
    QueryExecution,
    Protocol,
    UnknownServer,
    InvalidState,
}

/// Driver errors.
#[derive(Debug, Error)]
pub enum DriverError {
    #[error("codec error: {0}")]
    Codec(#[from] CodecError),

    #[error("connection error: {0}")]
    Connection(ErrorRecord),

    #[error("authentication error: {0}")]
    Authentication(ErrorRecord),

    #[error("query execution error: {0}")]
    QueryExecution(ErrorRecord),

    #[error("protocol error: {0}")]
    Protocol(ErrorRecord),

    #[error("unknown server error: {0}")]
    UnknownServer(ErrorRecord),

    #[error("invalid cursor state: {0}")]
    InvalidState(String),
}

impl DriverError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            DriverError::Codec(_) => ErrorKind::Codec,
            DriverError::Connection(_) => ErrorKind::Connection,
            DriverError::Authentication(_) => ErrorKind::Authentication,
            DriverError::QueryExecution(_) => ErrorKind::QueryExecution,
            DriverError::Protocol(_) => ErrorKind::Protocol,
            DriverError::UnknownServer(_) => ErrorKind::UnknownServer,
            DriverError::InvalidState(_) => ErrorKind::InvalidState,
        }
    }

    /// Returns the raw record this error was translated from, if any.
    pub fn record(&self) -> Option<&ErrorRecord> {
        match self {
            DriverError::Connection(r)
            | DriverError::Authentication(r)
            | DriverError::QueryExecution(r)
            | DriverError::Protocol(r)
            | DriverError::UnknownServer(r) => Some(r),
            DriverError::Codec(_) | DriverError::InvalidState(_) => None,
        }
    }

    /// Returns whether this error is potentially retryable.
    pub fn is_retryable(&self) -> bool {
        match self {
            DriverError::Connection(_) => true,
            _ => self
                .record()
                .is_some_and(|r| r.domain == domain::SERVER && is_transient_server_code(r.code)),
        }
    }
}

impl From<ErrorRecord> for DriverError {
    fn from(record: ErrorRecord) -> Self {
        translate(record)
    }
}

fn is_transient_server_code(value: u32) -> bool {
    matches!(
        value,
        code::HOST_UNREACHABLE
            | code::HOST_NOT_FOUND
            | code::NETWORK_TIMEOUT
            | code::SHUTDOWN_IN_PROGRESS
            | code::PRIMARY_STEPPED_DOWN
            | code::SOCKET_EXCEPTION
            | code::INTERRUPTED_AT_SHUTDOWN
            | code::INTERRUPTED_DUE_TO_REPL_STATE_CHANGE
    )
}

/// Maps a raw error record onto a driver error kind, keeping the record.
pub fn translate(record: ErrorRecord) -> DriverError {
    match record.domain {
        domain::CLIENT if record.code == code::CLIENT_AUTHENTICATE => {
            DriverError::Authentication(record)
        }
        domain::CLIENT | domain::STREAM | domain::SERVER_SELECTION => {
            DriverError::Connection(record)
        }
        domain::SASL | domain::SCRAM => DriverError::Authentication(record),
        domain::PROTOCOL | domain::BSON => DriverError::Protocol(record),
        domain::CURSOR | domain::QUERY | domain::COMMAND => DriverError::QueryExecution(record),
        domain::SERVER => match record.code {
            code::USER_NOT_FOUND | code::UNAUTHORIZED | code::AUTHENTICATION_FAILED => {
                DriverError::Authentication(record)
            }
            code::HOST_UNREACHABLE
            | code::HOST_NOT_FOUND
            | code::NETWORK_TIMEOUT
            | code::SHUTDOWN_IN_PROGRESS
            | code::SOCKET_EXCEPTION
            | code::INTERRUPTED_AT_SHUTDOWN
            | code::INTERRUPTED_DUE_TO_REPL_STATE_CHANGE => DriverError::Connection(record),
            code::BAD_VALUE
            | code::NO_SUCH_KEY
            | code::FAILED_TO_PARSE
            | code::TYPE_MISMATCH
            | code::ILLEGAL_OPERATION
            | code::NAMESPACE_NOT_FOUND
            | code::INDEX_NOT_FOUND
            | code::CURSOR_NOT_FOUND
            | code::EXCEEDED_TIME_LIMIT
            | code::COMMAND_NOT_FOUND
            | code::QUERY_PLAN_KILLED
            | code::DUPLICATE_KEY => DriverError::QueryExecution(record),
            _ => DriverError::UnknownServer(record),
        },
        _ => DriverError::UnknownServer(record),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kind_of(domain: u32, code: u32) -> ErrorKind {
        translate(ErrorRecord::new(domain, code, "boom")).kind()
    }

    #[test]
    fn test_translate_by_domain() {
        assert_eq!(kind_of(domain::STREAM, code::STREAM_SOCKET), ErrorKind::Connection);
        assert_eq!(kind_of(domain::SERVER_SELECTION, 13053), ErrorKind::Connection);
        assert_eq!(kind_of(domain::CLIENT, code::CLIENT_NOT_READY), ErrorKind::Connection);
        assert_eq!(
            kind_of(domain::CLIENT, code::CLIENT_AUTHENTICATE),
            ErrorKind::Authentication
        );
        assert_eq!(kind_of(domain::SASL, 1), ErrorKind::Authentication);
        assert_eq!(kind_of(domain::SCRAM, 1), ErrorKind::Authentication);
        assert_eq!(
            kind_of(domain::PROTOCOL, code::PROTOCOL_INVALID_REPLY),
            ErrorKind::Protocol
        );
        assert_eq!(kind_of(domain::BSON, 1), ErrorKind::Protocol);
        assert_eq!(
            kind_of(domain::CURSOR, code::CURSOR_INVALID_CURSOR),
            ErrorKind::QueryExecution
        );
        assert_eq!(kind_of(domain::QUERY, code::QUERY_FAILURE), ErrorKind::QueryExecution);
        assert_eq!(kind_of(domain::COMMAND, 2), ErrorKind::QueryExecution);
    }

    #[test]
    fn test_translate_server_codes() {
        assert_eq!(
            kind_of(domain::SERVER, code::AUTHENTICATION_FAILED),
            ErrorKind::Authentication
        );
        assert_eq!(kind_of(domain::SERVER, code::UNAUTHORIZED), ErrorKind::Authentication);
        assert_eq!(kind_of(domain::SERVER, code::NETWORK_TIMEOUT), ErrorKind::Connection);
        assert_eq!(kind_of(domain::SERVER, code::CURSOR_NOT_FOUND), ErrorKind::QueryExecution);
        assert_eq!(kind_of(domain::SERVER, code::BAD_VALUE), ErrorKind::QueryExecution);
        assert_eq!(kind_of(domain::SERVER, code::DUPLICATE_KEY), ErrorKind::QueryExecution);
    }

    #[test]
    fn test_translate_unlisted_server_code_is_unknown() {
        let err = translate(ErrorRecord::new(domain::SERVER, 424242, "never heard of it"));
        assert_eq!(err.kind(), ErrorKind::UnknownServer);
        assert_eq!(
            err.record(),
            Some(&ErrorRecord::new(domain::SERVER, 424242, "never heard of it"))
        );

        // Transient codes outside the connection set stay retryable
        let err = translate(ErrorRecord::new(domain::SERVER, code::PRIMARY_STEPPED_DOWN, ""));
        assert_eq!(err.kind(), ErrorKind::UnknownServer);
        assert!(err.is_retryable());
    }

    #[test]
    fn test_translate_unknown_keeps_raw_record() {
        let err = translate(ErrorRecord::new(999, 12345, "mystery"));
        assert_eq!(err.kind(), ErrorKind::UnknownServer);
        let record = err.record().unwrap();
        assert_eq!(record.domain, 999);
        assert_eq!(record.code, 12345);
        assert_eq!(record.message, "mystery");
    }

    #[test]
    fn test_mapped_errors_keep_raw_record() {
        let err = translate(ErrorRecord::new(domain::SERVER, 18, "bad credentials"));
        assert_eq!(err.kind(), ErrorKind::Authentication);
        assert_eq!(
            err.record(),
            Some(&ErrorRecord::new(domain::SERVER, 18, "bad credentials"))
        );
        let msg = err.to_string();
        assert!(msg.contains("bad credentials"));
        assert!(msg.contains("code: 18"));
    }

    #[test]
    fn test_retryable() {
        assert!(translate(ErrorRecord::fetch_timeout(Duration::from_secs(1))).is_retryable());
        assert!(translate(ErrorRecord::new(domain::SERVER, code::PRIMARY_STEPPED_DOWN, "")).is_retryable());
        assert!(!translate(ErrorRecord::new(domain::SERVER, 2, "bad value")).is_retryable());
        assert!(!translate(ErrorRecord::new(domain::SASL, 1, "")).is_retryable());
        assert!(!DriverError::InvalidState("closed".into()).is_retryable());
        assert!(!DriverError::Codec(CodecError::MissingTerminator).is_retryable());
    }

    #[test]
    fn test_codec_error_conversion() {
        let err: DriverError = CodecError::Truncated { needed: 3 }.into();
        assert_eq!(err.kind(), ErrorKind::Codec);
        assert!(err.record().is_none());
    }

    #[test]
    fn test_synthesized_records() {
        let err = DriverError::from(ErrorRecord::transport_closed());
        assert_eq!(err.kind(), ErrorKind::Connection);

        let err = DriverError::from(ErrorRecord::fetch_timeout(Duration::from_millis(5)));
        assert_eq!(err.kind(), ErrorKind::Connection);
        assert!(err.to_string().contains("timed out"));
    }
}
