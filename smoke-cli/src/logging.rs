use std::fs::File;
use std::io;
use std::path::Path;
use std::sync::Mutex;

use tracing_subscriber::fmt::writer::{BoxMakeWriter, MakeWriterExt};

/// Log sink: stderr, teed into `path` when given. Stdout is left to the run output.
pub(crate) fn log_writer(path: Option<&Path>) -> io::Result<BoxMakeWriter> {
    Ok(match path {
        Some(path) => BoxMakeWriter::new(io::stderr.and(Mutex::new(File::create(path)?))),
        None => BoxMakeWriter::new(io::stderr),
    })
}
