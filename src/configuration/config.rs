use super::types::*;
use crate::data_capture::DEFAULT_CAPACITY;
use crate::error_handling::types::ConfigError;
use crate::message_bus::{tls, BrokerAddress};
use crate::trace_format::TraceCodec;
use clap::Parser;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use uuid::Uuid;

pub const DEFAULT_BROKER: &str = "tcp://localhost:1883";
pub const DEFAULT_KEEP_ALIVE_SECS: u64 = 30;

/// Command-line surface.
///
/// Every option can also come from a TOML file given with `--config`;
/// values on the command line take precedence over the file. Switches the
/// file turns on are turned off again with their `--no-` form.
///
/// # Examples
///
/// ```text
/// # record everything under sensors/ to a trace
/// boombox --broker tcp://broker:1883 'sensors/#' > sensors.trace
///
/// # play it back, keeping the original timing
/// boombox --broker tcp://broker:1883 < sensors.trace
/// ```
#[derive(Parser, Debug, Clone, Default)]
#[command(name = "boombox")]
#[command(version)]
#[command(about = "Record MQTT traffic to a replayable trace, and play it back")]
pub struct Args {
    /// MQTT broker URL (default tcp://localhost:1883)
    #[arg(long, env = "BOOMBOX_BROKER")]
    pub broker: Option<String>,

    /// Binary data mode: payloads are base64-encoded in the trace
    #[arg(long, overrides_with = "no_binary")]
    pub binary: bool,

    #[arg(long, overrides_with = "binary", hide = true)]
    pub no_binary: bool,

    /// Print a running message counter on stderr
    #[arg(long, overrides_with = "no_counter")]
    pub counter: bool,

    #[arg(long, overrides_with = "counter", hide = true)]
    pub no_counter: bool,

    /// Fast-forward: ignore recorded timing when playing back
    #[arg(long = "ff", overrides_with = "no_fast_forward")]
    pub fast_forward: bool,

    #[arg(long = "no-ff", overrides_with = "fast_forward", hide = true)]
    pub no_fast_forward: bool,

    /// MQTT client id (default: boombox-<random>)
    #[arg(long = "clientid")]
    pub client_id: Option<String>,

    #[arg(long, env = "BOOMBOX_USERNAME")]
    pub username: Option<String>,

    #[arg(long, env = "BOOMBOX_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,

    /// Client certificate PEM
    #[arg(long)]
    pub cert: Option<PathBuf>,

    /// Client private key PEM
    #[arg(long)]
    pub key: Option<PathBuf>,

    /// CA root certificate PEM
    #[arg(long)]
    pub cafile: Option<PathBuf>,

    /// ALPN protocol to negotiate
    #[arg(long)]
    pub alpn: Option<String>,

    /// Trace line format
    #[arg(long, value_enum)]
    pub format: Option<TraceFormat>,

    /// Force record or play instead of detecting it from stdin
    #[arg(long, value_enum)]
    pub mode: Option<ModeSelection>,

    /// On shutdown, write out messages still queued instead of dropping them
    #[arg(long, overrides_with = "no_drain")]
    pub drain: bool,

    #[arg(long, overrides_with = "drain", hide = true)]
    pub no_drain: bool,

    /// TOML file with default values for any option
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Messages buffered between the broker and the trace writer
    #[arg(long)]
    pub queue_capacity: Option<usize>,

    /// MQTT keep-alive interval in seconds
    #[arg(long)]
    pub keep_alive: Option<u64>,

    /// Topics to record (default: every topic); ignored when playing
    pub topics: Vec<String>,
}

/// Options read from a `--config` TOML file. Same names as the flags.
#[derive(Debug, Default, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    pub broker: Option<String>,
    pub binary: Option<bool>,
    pub counter: Option<bool>,
    #[serde(alias = "ff")]
    pub fast_forward: Option<bool>,
    #[serde(alias = "clientid")]
    pub client_id: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
    pub cert: Option<PathBuf>,
    pub key: Option<PathBuf>,
    pub cafile: Option<PathBuf>,
    pub alpn: Option<String>,
    pub format: Option<TraceFormat>,
    pub mode: Option<ModeSelection>,
    pub drain: Option<bool>,
    pub queue_capacity: Option<usize>,
    pub keep_alive: Option<u64>,
    pub topics: Option<Vec<String>>,
}

impl FileConfig {
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path)?;
        toml::from_str(&content)
            .map_err(|e| ConfigError::TomlError(format!("{}: {}", path.display(), e)))
    }
}

/// Settings shared by the recorder and the player for one run.
///
/// Built once at startup and handed to both by reference; nothing mutates
/// it afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    pub broker_url: String,
    /// Subscription filters; empty means every topic.
    pub topics: Vec<String>,
    pub encoding: PayloadEncoding,
    pub counter: bool,
    pub fast_forward: bool,
    pub format: TraceFormat,
    pub shutdown: ShutdownPolicy,
    pub queue_capacity: usize,
}

impl Default for Session {
    fn default() -> Self {
        Self {
            broker_url: DEFAULT_BROKER.to_string(),
            topics: Vec::new(),
            encoding: PayloadEncoding::Text,
            counter: false,
            fast_forward: false,
            format: TraceFormat::default(),
            shutdown: ShutdownPolicy::Discard,
            queue_capacity: DEFAULT_CAPACITY,
        }
    }
}

impl Session {
    pub fn codec(&self) -> TraceCodec {
        TraceCodec::new(self.format, self.encoding)
    }
}

/// Fully resolved runtime configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub session: Session,
    pub connection: ConnectionSettings,
    pub mode: ModeSelection,
}

impl Config {
    /// Parses the process arguments, then merges in the `--config` file.
    ///
    /// # Panics
    /// Exits the process with usage help when the arguments themselves are
    /// invalid, as clap does.
    pub fn from_args() -> Result<Self, ConfigError> {
        Self::from_parsed(Args::parse())
    }

    pub fn from_parsed(args: Args) -> Result<Self, ConfigError> {
        let file = match &args.config {
            Some(path) => FileConfig::from_file(path)?,
            None => FileConfig::default(),
        };
        Self::resolve(args, file)
    }

    /// Merges CLI values over file values over defaults, then validates.
    pub fn resolve(args: Args, file: FileConfig) -> Result<Self, ConfigError> {
        let broker_url = args
            .broker
            .or(file.broker)
            .unwrap_or_else(|| DEFAULT_BROKER.to_string());
        broker_url.parse::<BrokerAddress>()?;

        let queue_capacity = args
            .queue_capacity
            .or(file.queue_capacity)
            .unwrap_or(DEFAULT_CAPACITY);
        if queue_capacity == 0 {
            return Err(ConfigError::NotInRange(
                "queue capacity must be at least 1".to_string(),
            ));
        }

        let keep_alive_secs = args
            .keep_alive
            .or(file.keep_alive)
            .unwrap_or(DEFAULT_KEEP_ALIVE_SECS);
        if !(5..=u16::MAX as u64).contains(&keep_alive_secs) {
            return Err(ConfigError::NotInRange(format!(
                "keep-alive must be between 5 and {} seconds, got {}",
                u16::MAX,
                keep_alive_secs
            )));
        }

        let tls = TlsOptions {
            ca_file: args.cafile.or(file.cafile),
            cert_file: args.cert.or(file.cert),
            key_file: args.key.or(file.key),
            alpn: args.alpn.or(file.alpn),
        };
        tls::validate(&tls)?;

        let topics = if args.topics.is_empty() {
            file.topics.unwrap_or_default()
        } else {
            args.topics
        };

        let drain = switch(args.drain, args.no_drain, file.drain);
        let session = Session {
            broker_url: broker_url.clone(),
            topics,
            encoding: PayloadEncoding::from_binary_flag(
                switch(args.binary, args.no_binary, file.binary),
            ),
            counter: switch(args.counter, args.no_counter, file.counter),
            fast_forward: switch(args.fast_forward, args.no_fast_forward, file.fast_forward),
            format: args.format.or(file.format).unwrap_or_default(),
            shutdown: if drain {
                ShutdownPolicy::Drain
            } else {
                ShutdownPolicy::Discard
            },
            queue_capacity,
        };

        let connection = ConnectionSettings {
            broker_url,
            client_id: non_blank(args.client_id.or(file.client_id))
                .unwrap_or_else(generated_client_id),
            username: non_blank(args.username.or(file.username)),
            password: non_blank(args.password.or(file.password)),
            keep_alive_secs,
            tls,
        };

        Ok(Self {
            session,
            connection,
            mode: args.mode.or(file.mode).unwrap_or_default(),
        })
    }
}

/// A boolean flag: `--x` or `--no-x` on the command line, else the file.
fn switch(on: bool, off: bool, file: Option<bool>) -> bool {
    if on || off {
        on
    } else {
        file.unwrap_or(false)
    }
}

/// Empty strings behave as if the option was not given.
fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

fn generated_client_id() -> String {
    let id = Uuid::new_v4().simple().to_string();
    format!("boombox-{}", &id[..8])
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn parse(argv: &[&str]) -> Config {
        let mut full = vec!["boombox"];
        full.extend_from_slice(argv);
        let args = Args::try_parse_from(full).unwrap_or_else(|e| panic!("{}", e));
        Config::from_parsed(args).unwrap_or_else(|e| panic!("{}", e))
    }

    #[test]
    #[serial]
    fn defaults() {
        let config = parse(&[]);
        assert_eq!(config.session.broker_url, DEFAULT_BROKER);
        assert!(config.session.topics.is_empty());
        assert_eq!(config.session.encoding, PayloadEncoding::Text);
        assert_eq!(config.session.format, TraceFormat::Json);
        assert_eq!(config.session.shutdown, ShutdownPolicy::Discard);
        assert_eq!(config.session.queue_capacity, 100);
        assert_eq!(config.mode, ModeSelection::Auto);
        assert!(config.connection.client_id.starts_with("boombox-"));
        assert_eq!(config.connection.client_id.len(), "boombox-".len() + 8);
    }

    #[test]
    #[serial]
    fn original_flags() {
        let config = parse(&[
            "--broker",
            "ssl://broker:8883",
            "--binary",
            "--counter",
            "--ff",
            "--clientid",
            "rec-1",
            "--username",
            "u",
            "--password",
            "p",
            "sensors/#",
            "cam/+",
        ]);
        assert_eq!(config.session.broker_url, "ssl://broker:8883");
        assert_eq!(config.session.encoding, PayloadEncoding::Base64);
        assert!(config.session.counter);
        assert!(config.session.fast_forward);
        assert_eq!(config.session.topics, vec!["sensors/#", "cam/+"]);
        assert_eq!(config.connection.client_id, "rec-1");
        assert_eq!(config.connection.username.as_deref(), Some("u"));
        assert_eq!(config.connection.password.as_deref(), Some("p"));
    }

    #[test]
    #[serial]
    fn client_tls_without_ca_file_is_accepted() {
        let config = parse(&[
            "--broker",
            "ssl://broker.example:8883",
            "--cert",
            "/c.pem",
            "--key",
            "/k.pem",
        ]);
        assert_eq!(config.connection.tls.ca_file, None);
        assert!(config.connection.tls.cert_file.is_some());

        let config = parse(&["--broker", "ssl://broker.example", "--alpn", "x-amzn-mqtt-ca"]);
        assert_eq!(config.connection.tls.alpn.as_deref(), Some("x-amzn-mqtt-ca"));
    }

    #[test]
    #[serial]
    fn blank_identity_options_are_ignored() {
        let config = parse(&["--clientid", "", "--username", " "]);
        assert!(config.connection.client_id.starts_with("boombox-"));
        assert_eq!(config.connection.username, None);
    }

    #[test]
    #[serial]
    fn file_values_yield_to_cli() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
broker = "tcp://from-file:1883"
ff = true
format = "pipe"
topics = ["a", "b"]
queue_capacity = 7
"#
        )
        .unwrap();
        let path = file.path().to_str().unwrap();

        let config = parse(&["--config", path, "--broker", "tcp://from-cli:1883"]);
        assert_eq!(config.session.broker_url, "tcp://from-cli:1883");
        assert!(config.session.fast_forward);
        assert_eq!(config.session.format, TraceFormat::Pipe);
        assert_eq!(config.session.topics, vec!["a", "b"]);
        assert_eq!(config.session.queue_capacity, 7);

        let config = parse(&["--config", path, "--format", "json", "c"]);
        assert_eq!(config.session.format, TraceFormat::Json);
        assert_eq!(config.session.topics, vec!["c"]);
    }

    #[test]
    #[serial]
    fn file_switches_can_be_turned_off() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "binary = true\nff = true\ndrain = true\ncounter = true").unwrap();
        let path = file.path().to_str().unwrap();

        let config = parse(&["--config", path]);
        assert_eq!(config.session.encoding, PayloadEncoding::Base64);
        assert!(config.session.fast_forward);
        assert_eq!(config.session.shutdown, ShutdownPolicy::Drain);
        assert!(config.session.counter);

        let config = parse(&[
            "--config",
            path,
            "--no-binary",
            "--no-ff",
            "--no-drain",
            "--no-counter",
        ]);
        assert_eq!(config.session.encoding, PayloadEncoding::Text);
        assert!(!config.session.fast_forward);
        assert_eq!(config.session.shutdown, ShutdownPolicy::Discard);
        assert!(!config.session.counter);

        // The later of the two forms wins.
        let config = parse(&["--no-binary", "--binary"]);
        assert_eq!(config.session.encoding, PayloadEncoding::Base64);
    }

    #[test]
    #[serial]
    fn unknown_file_keys_are_rejected() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "brokr = \"tcp://typo:1883\"").unwrap();
        let args = Args {
            config: Some(file.path().to_path_buf()),
            ..Args::default()
        };
        assert!(matches!(
            Config::from_parsed(args),
            Err(ConfigError::TomlError(_))
        ));
    }

    #[test]
    #[serial]
    fn invalid_values_are_rejected() {
        let bad = |args: Args| Config::resolve(args, FileConfig::default()).unwrap_err();

        assert!(matches!(
            bad(Args {
                queue_capacity: Some(0),
                ..Args::default()
            }),
            ConfigError::NotInRange(_)
        ));
        assert!(matches!(
            bad(Args {
                broker: Some("http://nope".into()),
                ..Args::default()
            }),
            ConfigError::BadBrokerUrl(_)
        ));
        assert!(matches!(
            bad(Args {
                key: Some("/k.pem".into()),
                cafile: Some("/ca.pem".into()),
                ..Args::default()
            }),
            ConfigError::IncompleteTls(_)
        ));
        assert!(matches!(
            bad(Args {
                keep_alive: Some(1),
                ..Args::default()
            }),
            ConfigError::NotInRange(_)
        ));
    }

    #[test]
    #[serial]
    fn broker_from_environment() {
        std::env::set_var("BOOMBOX_BROKER", "tcp://env-broker:1884");
        let config = parse(&[]);
        std::env::remove_var("BOOMBOX_BROKER");
        assert_eq!(config.session.broker_url, "tcp://env-broker:1884");
        assert_eq!(config.connection.broker_url, "tcp://env-broker:1884");
    }
}
