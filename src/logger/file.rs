/// Plain-text file sink for log lines
use once_cell::sync::Lazy;
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::Path;
use std::sync::Mutex;

static LOG_FILE: Lazy<Mutex<Option<BufWriter<File>>>> = Lazy::new(|| Mutex::new(None));

/// Open (append) the log file; replaces any previously opened sink
pub fn init_file_logging(path: &Path) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let file = OpenOptions::new().create(true).append(true).open(path)?;

    if let Ok(mut sink) = LOG_FILE.lock() {
        *sink = Some(BufWriter::new(file));
    }

    Ok(())
}

/// Write a single line to the file sink, if one is open
pub fn write_to_file(line: &str) {
    if let Ok(mut sink) = LOG_FILE.lock() {
        if let Some(writer) = sink.as_mut() {
            let _ = writeln!(writer, "{}", line);
        }
    }
}

pub fn flush_file_logging() {
    if let Ok(mut sink) = LOG_FILE.lock() {
        if let Some(writer) = sink.as_mut() {
            let _ = writer.flush();
        }
    }
}
