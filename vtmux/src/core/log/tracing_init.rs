// Copyright (c) 2024-2025 R3BL LLC. Licensed under Apache License, Version 2.0.

use tracing_core::LevelFilter;
use tracing_subscriber::{Layer, layer::SubscriberExt, registry::LookupSpan,
                         util::SubscriberInitExt};

use super::{DisplayPreference, TracingConfig, WriterConfig,
            try_create_log_file_appender};

/// Avoid gnarly type annotations by using a macro to create the `fmt` layer. The
/// console has no color support worth speaking of in a log file, so ANSI is off.
#[macro_export]
macro_rules! create_fmt {
    () => {
        tracing_subscriber::fmt::layer()
            .compact()
            .with_ansi(false)
            .with_thread_ids(false)
            .with_target(true)
    };
}

/// Type alias for a boxed layer.
pub type DynLayer<S> = dyn Layer<S> + Send + Sync + 'static;

/// Initialize the global tracing subscriber with the layers from [`TracingConfig`]. A
/// [`WriterConfig::None`] config installs only the level filter.
///
/// # Errors
///
/// Returns an error if the log file can't be created, or if a global subscriber has
/// already been installed.
pub fn try_initialize_logging_global(tracing_config: TracingConfig) -> miette::Result<()> {
    let layers = try_create_layers(tracing_config)?;
    tracing_subscriber::registry()
        .with(layers)
        .try_init()
        .map_err(|e| miette::miette!("failed to install tracing subscriber: {e}"))
}

/// Returns the layers. This does not initialize the tracing system. See
/// [`try_initialize_logging_global`] for that.
///
/// # Errors
///
/// Returns an error if the log file can't be created.
pub fn try_create_layers(
    tracing_config: TracingConfig,
) -> miette::Result<Vec<Box<DynLayer<tracing_subscriber::Registry>>>> {
    let level_filter = tracing_config.get_level_filter();
    let writer_config = tracing_config.get_writer_config();

    let mut return_it: Vec<Box<DynLayer<tracing_subscriber::Registry>>> = vec![];

    // Set the level filter from the tracing configuration. This is needed if you add
    // more layers which don't have a level filter.
    return_it.push(Box::new(level_filter));

    if let Some(layer) = try_create_display_layer(level_filter, writer_config.clone()) {
        return_it.push(layer);
    }

    if let Some(layer) = try_create_file_layer(level_filter, writer_config)? {
        return_it.push(layer);
    }

    Ok(return_it)
}

/// This erases the concrete type of the writer, and returns a boxed layer.
#[must_use]
pub fn try_create_display_layer<S>(
    level_filter: LevelFilter,
    writer_config: WriterConfig,
) -> Option<Box<DynLayer<S>>>
where
    S: tracing_core::Subscriber,
    for<'a> S: LookupSpan<'a>,
{
    let fmt_layer = create_fmt!();

    match writer_config {
        WriterConfig::DisplayAndFile(display_pref, _)
        | WriterConfig::Display(display_pref) => match display_pref {
            DisplayPreference::Stdout => Some(Box::new(
                fmt_layer
                    .with_writer(std::io::stdout)
                    .with_filter(level_filter),
            )),
            DisplayPreference::Stderr => Some(Box::new(
                fmt_layer
                    .with_writer(std::io::stderr)
                    .with_filter(level_filter),
            )),
        },
        WriterConfig::None | WriterConfig::File(_) => None,
    }
}

/// This erases the concrete type of the writer, and returns a boxed layer.
///
/// # Errors
///
/// Returns an error if the log file can't be created.
pub fn try_create_file_layer<S>(
    level_filter: LevelFilter,
    writer_config: WriterConfig,
) -> miette::Result<Option<Box<DynLayer<S>>>>
where
    S: tracing_core::Subscriber,
    for<'a> S: LookupSpan<'a>,
{
    let fmt_layer = create_fmt!();

    Ok(match writer_config {
        WriterConfig::DisplayAndFile(_, tracing_log_file_path)
        | WriterConfig::File(tracing_log_file_path) => {
            let file = try_create_log_file_appender(tracing_log_file_path.as_str())?;
            Some(Box::new(
                fmt_layer.with_writer(file).with_filter(level_filter),
            ))
        }
        WriterConfig::None | WriterConfig::Display(_) => None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_log_file(name: &str) -> String {
        let dir = std::env::temp_dir().join("r3bl_vtmux_tracing_test");
        std::fs::create_dir_all(&dir).unwrap();
        dir.join(name).to_str().unwrap().to_string()
    }

    #[test]
    fn test_try_create_display_layer() {
        let layer: Option<Box<DynLayer<tracing_subscriber::Registry>>> =
            try_create_display_layer(
                LevelFilter::DEBUG,
                WriterConfig::Display(DisplayPreference::Stderr),
            );
        assert!(layer.is_some());
    }

    #[test]
    fn test_no_display_layer_for_file_config() {
        let layer: Option<Box<DynLayer<tracing_subscriber::Registry>>> =
            try_create_display_layer(
                LevelFilter::DEBUG,
                WriterConfig::File("unused.log".to_string()),
            );
        assert!(layer.is_none());
    }

    #[test]
    fn test_try_create_file_layer() {
        let file_path = temp_log_file("file_layer.log");
        let layer: Option<Box<DynLayer<tracing_subscriber::Registry>>> =
            try_create_file_layer(LevelFilter::DEBUG, WriterConfig::File(file_path.clone()))
                .unwrap();

        assert!(layer.is_some());
        assert!(std::path::Path::new(&file_path).exists());
    }

    #[test]
    fn test_try_create_both_layers() {
        let file_path = temp_log_file("both_layers.log");
        let tracing_config = TracingConfig {
            writer_config: WriterConfig::DisplayAndFile(
                DisplayPreference::Stdout,
                file_path.clone(),
            ),
            level_filter: LevelFilter::DEBUG,
        };

        let layers = try_create_layers(tracing_config).unwrap();
        assert_eq!(layers.len(), 3);
        assert!(std::path::Path::new(&file_path).exists());
    }

    #[test]
    fn test_none_config_only_has_level_filter() {
        let tracing_config = TracingConfig {
            writer_config: WriterConfig::None,
            level_filter: LevelFilter::WARN,
        };
        let layers = try_create_layers(tracing_config).unwrap();
        assert_eq!(layers.len(), 1);
    }
}
