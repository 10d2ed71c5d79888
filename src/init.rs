use crate::config::Config;
use crate::backend::Core;
use crate::sink::LogSink;
use std::sync::Arc;
use tracing::subscriber::SetGlobalDefaultError;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::Registry;

/// Initialize the global `tracing` subscriber using the provided sink and
/// [`Config`].
///
/// **Parameters**
/// - `sink`: implementation of [`LogSink`] that receives the encoded
///   entries.
/// - `config`: level gate, encoder options and severity mapping.
/// - `enable_stdout`: if `true`, a `tracing_subscriber::fmt` layer is added
///   so events are also printed to the console.
///
/// **Returns**
///
/// A handle to the [`Core`] events are written through, so the caller can
/// [`Core::sync`] it at shutdown, or the error from `tracing` if a global
/// subscriber was already installed.
pub fn init_tracing_with_config(
    sink: Arc<dyn LogSink>,
    config: Config,
    enable_stdout: bool,
) -> Result<Core, SetGlobalDefaultError> {
    let layer = config.layer(sink);
    let core = layer.core().clone();

    // The two subscriber shapes have different types, so each branch
    // installs its own.
    if enable_stdout {
        let fmt_layer = tracing_subscriber::fmt::layer();
        let subscriber = Registry::default().with(layer).with(fmt_layer);
        tracing::subscriber::set_global_default(subscriber)?;
    } else {
        let subscriber = Registry::default().with(layer);
        tracing::subscriber::set_global_default(subscriber)?;
    }
    Ok(core)
}

/// Initialize tracing with the production preset and no console output.
///
/// Equivalent to calling [`init_tracing_with_config`] with
/// [`Config::production`]. This is the recommended entrypoint for typical
/// services.
pub fn init_tracing(sink: Arc<dyn LogSink>) -> Result<Core, SetGlobalDefaultError> {
    init_tracing_with_config(sink, Config::production(), false)
}
