use crate::error::SinkError;
use crate::sink::Sink;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::PathBuf;
use std::sync::{Mutex, PoisonError};

/// Appends each record to a file. The file is opened (and created if
/// missing) by [`Sink::initialize`].
#[derive(Debug)]
pub struct FileSink {
    name: String,
    path: PathBuf,
    file: Mutex<Option<File>>,
}

impl FileSink {
    pub fn new(name: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        FileSink {
            name: name.into(),
            path: path.into(),
            file: Mutex::new(None),
        }
    }

    pub fn path(&self) -> &PathBuf {
        &self.path
    }
}

impl Sink for FileSink {
    fn name(&self) -> &str {
        &self.name
    }

    fn initialize(&self) -> Result<(), SinkError> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        *self.file.lock().unwrap_or_else(PoisonError::into_inner) = Some(file);
        Ok(())
    }

    fn write(&self, buf: &[u8]) -> Result<usize, SinkError> {
        let mut guard = self.file.lock().unwrap_or_else(PoisonError::into_inner);
        let file = guard.as_mut().ok_or(SinkError::NotInitialized)?;
        file.write_all(buf)?;
        Ok(buf.len())
    }

    fn sync(&self) -> Result<(), SinkError> {
        if let Some(file) = self.file.lock().unwrap_or_else(PoisonError::into_inner).as_mut() {
            file.sync_data()?;
        }
        Ok(())
    }

    fn close(&self) {
        if let Some(file) = self.file.lock().unwrap_or_else(PoisonError::into_inner).take() {
            let _ = file.sync_all();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn temp_path(tag: &str) -> PathBuf {
        let nanos = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap()
            .as_nanos();
        std::env::temp_dir().join(format!("fieldlog_{}_{}.log", tag, nanos))
    }

    #[test]
    fn appends_lines_after_initialize() {
        let path = temp_path("append");
        let sink = FileSink::new("file", &path);

        assert!(matches!(sink.write(b"early\n"), Err(SinkError::NotInitialized)));

        sink.initialize().unwrap();
        sink.write(b"one\n").unwrap();
        sink.write(b"two\n").unwrap();
        sink.sync().unwrap();
        sink.close();
        sink.close();

        assert_eq!(fs::read_to_string(&path).unwrap(), "one\ntwo\n");
        assert!(matches!(sink.write(b"late\n"), Err(SinkError::NotInitialized)));

        fs::remove_file(&path).unwrap();
    }
}
