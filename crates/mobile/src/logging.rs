use std::sync::Once;

use tracing_subscriber::{
    filter::FilterFn, fmt::format::Format, layer::SubscriberExt, util::SubscriberInitExt,
};

fn ours(module_path: Option<&str>) -> bool {
    module_path.unwrap_or_default().starts_with("shadow_tag")
}

/// Routes the crates' tracing output to logcat on Android and stderr
/// elsewhere. Safe to call more than once.
#[uniffi::export]
pub fn init_logging() {
    static LOGGING_SETUP: Once = Once::new();

    LOGGING_SETUP.call_once(|| {
        let filter = FilterFn::new(|meta| ours(meta.module_path()));
        let format = Format::default().with_level(false).without_time();

        #[cfg(target_os = "android")]
        {
            use tracing_logcat::{LogcatMakeWriter, LogcatTag};

            const LOG_TAG: &str = "ShadowTag-Rust";

            match LogcatMakeWriter::new(LogcatTag::Fixed(LOG_TAG.to_owned())) {
                Ok(writer) => {
                    let layer = tracing_subscriber::fmt::layer()
                        .event_format(format)
                        .with_writer(writer)
                        .with_ansi(false);
                    tracing_subscriber::registry().with(layer).with(filter).init();
                }
                Err(e) => eprintln!("{LOG_TAG}: failed to initialize logcat writer: {e}"),
            }
        }

        #[cfg(not(target_os = "android"))]
        {
            let layer = tracing_subscriber::fmt::layer()
                .event_format(format.with_target(false))
                .with_writer(std::io::stderr)
                .with_ansi(false);
            // a host app may already own the global subscriber
            let _ = tracing_subscriber::registry().with(layer).with(filter).try_init();
        }
    })
}
