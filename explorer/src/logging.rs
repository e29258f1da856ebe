use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Covers the library, the frame-loop engine, and the windowed binary.
pub const DEFAULT_FILTER: &str = "explorer=info,headful=info,engine=info";

/// `RUST_LOG` when set and valid, [`DEFAULT_FILTER`] otherwise.
pub fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
}

/// Installs the stderr subscriber.
///
/// Safe to call more than once; later calls are ignored.
pub fn init_tracing() {
    let _ = tracing_subscriber::registry()
        .with(env_filter())
        .with(fmt::layer().with_writer(std::io::stderr))
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;
    use std::sync::{Arc, Mutex};

    #[derive(Clone, Default)]
    struct Capture(Arc<Mutex<Vec<u8>>>);

    impl io::Write for Capture {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            if let Ok(mut out) = self.0.lock() {
                out.extend_from_slice(buf);
            }
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    fn captured(filter: &str, emit: impl FnOnce()) -> String {
        let capture = Capture::default();
        let writer = capture.clone();
        let subscriber = tracing_subscriber::registry().with(EnvFilter::new(filter)).with(
            fmt::layer()
                .with_ansi(false)
                .with_writer(move || writer.clone()),
        );
        tracing::subscriber::with_default(subscriber, emit);
        let bytes = capture.0.lock().map(|b| b.clone()).unwrap_or_default();
        String::from_utf8_lossy(&bytes).into_owned()
    }

    #[test]
    fn default_filter_keeps_engine_and_binary_warnings() {
        let out = captured(DEFAULT_FILTER, || {
            tracing::warn!(target: "engine::app", "render failed");
            tracing::warn!(target: "headful", "keyboard fallback");
            tracing::warn!(target: "explorer::scene", "scene warning");
            tracing::debug!(target: "engine::app", "too chatty");
            tracing::info!(target: "wgpu_core", "foreign crate");
        });
        assert!(out.contains("render failed"), "{out}");
        assert!(out.contains("keyboard fallback"), "{out}");
        assert!(out.contains("scene warning"), "{out}");
        assert!(!out.contains("too chatty"), "{out}");
        assert!(!out.contains("foreign crate"), "{out}");
    }
}
