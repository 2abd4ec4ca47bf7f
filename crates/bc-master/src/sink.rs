//! Destinations for converted files.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tracing::info;

/// Receives each output file once, at the end of a conversion.
pub trait OutputSink {
    fn write(&mut self, file_name: &str, data: &[u8]) -> io::Result<()>;
}

/// Writes files into a directory, creating it on first use.
#[derive(Debug)]
pub struct DirectorySink {
    dir: PathBuf,
    written: Vec<PathBuf>,
}

impl DirectorySink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            written: Vec::new(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Paths written so far.
    pub fn written(&self) -> &[PathBuf] {
        &self.written
    }
}

impl OutputSink for DirectorySink {
    fn write(&mut self, file_name: &str, data: &[u8]) -> io::Result<()> {
        fs::create_dir_all(&self.dir)?;
        let path = self.dir.join(sanitize_file_name(file_name));
        fs::write(&path, data)?;
        info!(path = %path.display(), bytes = data.len(), "wrote file");
        self.written.push(path);
        Ok(())
    }
}

/// Keeps every output in memory.
#[derive(Debug, Default)]
pub struct MemorySink {
    pub files: Vec<(String, Vec<u8>)>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, file_name: &str) -> Option<&[u8]> {
        self.files
            .iter()
            .find(|(name, _)| name == file_name)
            .map(|(_, data)| data.as_slice())
    }
}

impl OutputSink for MemorySink {
    fn write(&mut self, file_name: &str, data: &[u8]) -> io::Result<()> {
        self.files.push((file_name.to_string(), data.to_vec()));
        Ok(())
    }
}

/// Replace characters that are not safe in file names on common systems.
pub fn sanitize_file_name(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();
    let trimmed = cleaned.trim().trim_matches('.');
    if trimmed.is_empty() {
        "untitled".to_string()
    } else {
        trimmed.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unsafe_characters_are_replaced() {
        assert_eq!(sanitize_file_name("a/b:c?.dls"), "a_b_c_.dls");
        assert_eq!(sanitize_file_name(" .. "), "untitled");
    }

    #[test]
    fn directory_sink_creates_the_directory() {
        let tmp = tempfile::tempdir().unwrap();
        let mut sink = DirectorySink::new(tmp.path().join("out"));
        sink.write("x/y.wav", b"RIFF").unwrap();
        let path = tmp.path().join("out").join("x_y.wav");
        assert_eq!(fs::read(&path).unwrap(), b"RIFF");
        assert_eq!(sink.written(), &[path]);
    }

    #[test]
    fn memory_sink_keeps_files() {
        let mut sink = MemorySink::new();
        sink.write("a.sf2", &[1, 2]).unwrap();
        assert_eq!(sink.get("a.sf2"), Some(&[1u8, 2][..]));
        assert!(sink.get("b.sf2").is_none());
    }
}
