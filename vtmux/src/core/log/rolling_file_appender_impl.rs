// Copyright (c) 2024-2025 R3BL LLC. Licensed under Apache License, Version 2.0.

use std::path::PathBuf;

/// Creates a file appender that never rotates. The multiplexer is a long lived process
/// on a console with no scrollback, so a single file that can be `tail -f`'d from
/// another VT is the useful shape.
///
/// Note that if you wrap this up in a non blocking writer, log lines written right
/// before the process exits (the teardown sequence) can be lost.
///
/// # Errors
///
/// Returns an error if:
/// - The path has no parent directory
/// - The path has no file name
pub fn try_create_log_file_appender(
    path_str: &str,
) -> miette::Result<tracing_appender::rolling::RollingFileAppender> {
    let path = PathBuf::from(&path_str);

    let parent = match path.parent() {
        Some(parent) if parent.as_os_str().is_empty() => PathBuf::from("."),
        Some(parent) => parent.to_path_buf(),
        None => miette::bail!(
            "Can't access parent folder of {}. It might not exist, or don't have required permissions.",
            path.display()
        ),
    };

    let file_name = path.file_name().ok_or_else(|| {
        miette::miette!(
            "Can't access file name {}. It might not exist, or don't have required permissions.",
            path.display()
        )
    })?;

    Ok(tracing_appender::rolling::never(parent, file_name))
}
