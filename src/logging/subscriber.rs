//! Tracing subscriber setup: console formatter and initialisation.
use tracing_subscriber::EnvFilter;

/// Splits a [`tracing::Event`] into its message and its remaining fields.
#[derive(Default)]
pub(super) struct MessageExtractor {
    pub(super) message: String,
    pub(super) fields: Vec<(&'static str, String)>,
}

impl tracing::field::Visit for MessageExtractor {
    fn record_debug(&mut self, field: &tracing::field::Field, value: &dyn std::fmt::Debug) {
        if field.name() == "message" {
            self.message = format!("{value:?}");
        } else {
            self.fields.push((field.name(), format!("{value:?}")));
        }
    }

    fn record_str(&mut self, field: &tracing::field::Field, value: &str) {
        if field.name() == "message" {
            self.message = value.to_string();
        } else {
            self.fields.push((field.name(), value.to_string()));
        }
    }
}

/// A [`tracing_subscriber::fmt::FormatEvent`] that prints the message
/// followed by its structured fields as `key=value`.
struct ResolverFormatter;

impl<S, N> tracing_subscriber::fmt::FormatEvent<S, N> for ResolverFormatter
where
    S: tracing::Subscriber + for<'a> tracing_subscriber::registry::LookupSpan<'a>,
    N: for<'a> tracing_subscriber::fmt::FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        _ctx: &tracing_subscriber::fmt::FmtContext<'_, S, N>,
        mut writer: tracing_subscriber::fmt::format::Writer<'_>,
        event: &tracing::Event<'_>,
    ) -> std::fmt::Result {
        let level = *event.metadata().level();

        let mut extractor = MessageExtractor::default();
        event.record(&mut extractor);

        match level {
            tracing::Level::ERROR => write!(writer, "\x1b[31mERROR\x1b[0m {}", extractor.message)?,
            tracing::Level::WARN => write!(writer, "\x1b[33mWARN\x1b[0m  {}", extractor.message)?,
            tracing::Level::INFO => write!(writer, "  {}", extractor.message)?,
            _ => write!(writer, "  \x1b[2m{}\x1b[0m", extractor.message)?,
        }
        for (name, value) in &extractor.fields {
            write!(writer, " \x1b[2m{name}={value}\x1b[0m")?;
        }
        writeln!(writer)
    }
}

/// Console filter: `RUST_LOG` when set, otherwise `info` (or `debug` when
/// `verbose`) for this crate and `warn` for everything else.
pub(super) fn console_filter(verbose: bool) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        let level = if verbose { "debug" } else { "info" };
        EnvFilter::new(format!("warn,manifest_resolver={level}"))
    })
}

/// Initialise the global [`tracing`] subscriber.
///
/// Warnings and errors go to stderr, everything else to stdout. Call once at
/// program startup, before any logging.
///
/// # Errors
///
/// Returns an error if a global subscriber is already installed.
pub fn init_subscriber(verbose: bool) -> anyhow::Result<()> {
    use tracing_subscriber::fmt::writer::MakeWriterExt as _;
    use tracing_subscriber::{Layer as _, fmt, layer::SubscriberExt as _, util::SubscriberInitExt as _};

    let make_writer = std::io::stderr
        .with_max_level(tracing::Level::WARN)
        .and(std::io::stdout.with_min_level(tracing::Level::INFO));

    let console_layer = fmt::layer()
        .event_format(ResolverFormatter)
        .with_writer(make_writer)
        .with_filter(console_filter(verbose));

    tracing_subscriber::registry()
        .with(console_layer)
        .try_init()
        .map_err(|e| anyhow::anyhow!("failed to install tracing subscriber: {e}"))
}
