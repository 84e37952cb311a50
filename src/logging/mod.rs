//! Structured logging for the resolution engine.
//!
//! The engine only emits [`tracing`] events (target `manifest_resolver::*`);
//! installing a subscriber is left to the embedding application, which can
//! use [`init_subscriber`] for console output.

mod subscriber;

pub use subscriber::init_subscriber;

/// One event recorded by [`capture`].
#[cfg(test)]
#[derive(Debug, Clone)]
pub(crate) struct Captured {
    pub(crate) level: tracing::Level,
    pub(crate) message: String,
    pub(crate) fields: Vec<(&'static str, String)>,
}

#[cfg(test)]
struct CaptureLayer(std::sync::Arc<std::sync::Mutex<Vec<Captured>>>);

#[cfg(test)]
impl<S: tracing::Subscriber> tracing_subscriber::Layer<S> for CaptureLayer {
    fn on_event(
        &self,
        event: &tracing::Event<'_>,
        _ctx: tracing_subscriber::layer::Context<'_, S>,
    ) {
        let mut extractor = subscriber::MessageExtractor::default();
        event.record(&mut extractor);
        if let Ok(mut events) = self.0.lock() {
            events.push(Captured {
                level: *event.metadata().level(),
                message: extractor.message,
                fields: extractor.fields,
            });
        }
    }
}

/// Record every event emitted on this thread until the guard is dropped.
#[cfg(test)]
pub(crate) fn capture() -> (
    std::sync::Arc<std::sync::Mutex<Vec<Captured>>>,
    tracing::dispatcher::DefaultGuard,
) {
    use tracing_subscriber::layer::SubscriberExt as _;
    let events = std::sync::Arc::new(std::sync::Mutex::new(Vec::new()));
    let subscriber = tracing_subscriber::registry().with(CaptureLayer(events.clone()));
    let guard = tracing::dispatcher::set_default(&tracing::Dispatch::new(subscriber));
    (events, guard)
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;

    #[test]
    fn capture_records_message_and_fields() {
        let (events, _guard) = capture();
        tracing::warn!(key = "bogus", "rejected attribute");
        let events = events.lock().unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].level, tracing::Level::WARN);
        assert_eq!(events[0].message, "rejected attribute");
        assert_eq!(events[0].fields, [("key", "bogus".to_string())]);
    }

    #[test]
    fn verbose_filter_enables_debug_for_this_crate() {
        if std::env::var_os("RUST_LOG").is_some() {
            return;
        }
        let filter = subscriber::console_filter(true).to_string();
        assert!(filter.contains("manifest_resolver=debug"), "{filter}");
    }
}
