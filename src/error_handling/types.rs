use std::fmt;

#[derive(Debug)]
pub enum ConfigError {
    IoError(std::io::Error),
    TomlError(String),
    BadBrokerUrl(String),
    NotInRange(String),
    IncompleteTls(String),
    BadTlsMaterial(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::IoError(e) => write!(f, "IO error: {}", e),
            ConfigError::TomlError(e) => write!(f, "TOML parsing error: {}", e),
            ConfigError::BadBrokerUrl(e) => write!(f, "Broker URL error: {}", e),
            ConfigError::NotInRange(e) => write!(f, "Value out of range: {}", e),
            ConfigError::IncompleteTls(e) => write!(f, "TLS configuration error: {}", e),
            ConfigError::BadTlsMaterial(e) => write!(f, "Unusable TLS material: {}", e),
        }
    }
}

impl std::error::Error for ConfigError {}

impl From<std::io::Error> for ConfigError {
    fn from(err: std::io::Error) -> Self {
        ConfigError::IoError(err)
    }
}

/// The broker could not be reached or refused the handshake.
#[derive(Debug)]
pub enum ConnectionError {
    Unreachable(String),
    Refused(String),
    Timeout,
}

impl fmt::Display for ConnectionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConnectionError::Unreachable(e) => write!(f, "Broker unreachable: {}", e),
            ConnectionError::Refused(e) => write!(f, "Broker refused connection: {}", e),
            ConnectionError::Timeout => write!(f, "Timed out waiting for the broker handshake"),
        }
    }
}

impl std::error::Error for ConnectionError {}

#[derive(Debug)]
pub enum SubscriptionError {
    RequestFailed(String),
    Rejected(String),
    Timeout,
}

impl fmt::Display for SubscriptionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SubscriptionError::RequestFailed(e) => write!(f, "Subscribe request failed: {}", e),
            SubscriptionError::Rejected(topic) => {
                write!(f, "Broker rejected subscription to '{}'", topic)
            }
            SubscriptionError::Timeout => write!(f, "Timed out waiting for subscription ack"),
        }
    }
}

impl std::error::Error for SubscriptionError {}

/// A trace line that cannot be turned back into a publish.
#[derive(Debug, Clone, PartialEq)]
pub struct MalformedRecordError {
    /// 1-based line number in the input trace, 0 when unknown.
    pub line: usize,
    pub reason: MalformedReason,
}

#[derive(Debug, Clone, PartialEq)]
pub enum MalformedReason {
    MissingFields(usize),
    BadDuration(String),
    BadBase64(String),
    BadJson(String),
}

impl MalformedRecordError {
    pub fn new(reason: MalformedReason) -> Self {
        Self { line: 0, reason }
    }

    pub fn at_line(mut self, line: usize) -> Self {
        self.line = line;
        self
    }
}

impl fmt::Display for MalformedReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MalformedReason::MissingFields(n) => write!(f, "expected 3 fields, found {}", n),
            MalformedReason::BadDuration(e) => write!(f, "invalid duration: {}", e),
            MalformedReason::BadBase64(e) => write!(f, "invalid base64 payload: {}", e),
            MalformedReason::BadJson(e) => write!(f, "invalid JSON record: {}", e),
        }
    }
}

impl fmt::Display for MalformedRecordError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Malformed record at line {}: {}", self.line, self.reason)
    }
}

impl std::error::Error for MalformedRecordError {}

#[derive(Debug)]
pub enum PublishError {
    Rejected(String),
    LinkClosed,
}

impl fmt::Display for PublishError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PublishError::Rejected(e) => write!(f, "Publish rejected: {}", e),
            PublishError::LinkClosed => write!(f, "Publish failed: broker link is closed"),
        }
    }
}

impl std::error::Error for PublishError {}

/// Errors raised before any capture or replay begins.
#[derive(Debug)]
pub enum StartupError {
    Config(ConfigError),
    Connection(ConnectionError),
    Subscription(SubscriptionError),
}

impl fmt::Display for StartupError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StartupError::Config(e) => write!(f, "Configuration error: {}", e),
            StartupError::Connection(e) => write!(f, "Connection error: {}", e),
            StartupError::Subscription(e) => write!(f, "Subscription error: {}", e),
        }
    }
}

impl std::error::Error for StartupError {}

impl From<ConfigError> for StartupError {
    fn from(err: ConfigError) -> Self {
        StartupError::Config(err)
    }
}

impl From<ConnectionError> for StartupError {
    fn from(err: ConnectionError) -> Self {
        StartupError::Connection(err)
    }
}

impl From<SubscriptionError> for StartupError {
    fn from(err: SubscriptionError) -> Self {
        StartupError::Subscription(err)
    }
}

/// Errors that end a running capture or replay session.
#[derive(Debug)]
pub enum SessionError {
    MalformedRecord(MalformedRecordError),
    Publish(PublishError),
    Io(std::io::Error),
    SourceClosed,
}

impl fmt::Display for SessionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionError::MalformedRecord(e) => write!(f, "{}", e),
            SessionError::Publish(e) => write!(f, "{}", e),
            SessionError::Io(e) => write!(f, "Trace IO error: {}", e),
            SessionError::SourceClosed => write!(f, "Message source closed unexpectedly"),
        }
    }
}

impl std::error::Error for SessionError {}

impl From<MalformedRecordError> for SessionError {
    fn from(err: MalformedRecordError) -> Self {
        SessionError::MalformedRecord(err)
    }
}

impl From<PublishError> for SessionError {
    fn from(err: PublishError) -> Self {
        SessionError::Publish(err)
    }
}

impl From<std::io::Error> for SessionError {
    fn from(err: std::io::Error) -> Self {
        SessionError::Io(err)
    }
}

#[derive(Debug)]
pub enum BoomboxError {
    Startup(StartupError),
    Session(SessionError),
}

impl BoomboxError {
    /// Process exit status for this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            BoomboxError::Startup(_) => 2,
            BoomboxError::Session(_) => 1,
        }
    }
}

impl fmt::Display for BoomboxError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BoomboxError::Startup(e) => write!(f, "Startup failed: {}", e),
            BoomboxError::Session(e) => write!(f, "Session aborted: {}", e),
        }
    }
}

impl std::error::Error for BoomboxError {}

impl From<StartupError> for BoomboxError {
    fn from(err: StartupError) -> Self {
        BoomboxError::Startup(err)
    }
}

impl From<SessionError> for BoomboxError {
    fn from(err: SessionError) -> Self {
        BoomboxError::Session(err)
    }
}

impl From<ConfigError> for BoomboxError {
    fn from(err: ConfigError) -> Self {
        BoomboxError::Startup(StartupError::Config(err))
    }
}

impl From<ConnectionError> for BoomboxError {
    fn from(err: ConnectionError) -> Self {
        BoomboxError::Startup(StartupError::Connection(err))
    }
}

impl From<SubscriptionError> for BoomboxError {
    fn from(err: SubscriptionError) -> Self {
        BoomboxError::Startup(StartupError::Subscription(err))
    }
}
