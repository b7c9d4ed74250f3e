//! JSON-lines metadata source.
//!
//! Reads one snapshot per line, e.g.
//! `{"title": "Midnight", "artist": "", "app_id": "spotify"}`.
//! Missing string fields default to empty and `is_playing` defaults to true.

use anyhow::Context;
use std::io::{self, BufRead, BufReader};
use std::sync::atomic::{AtomicBool, Ordering};

use crate::types::TrackMetadata;

use super::MetadataSource;

/// Reads snapshots from any line-oriented reader.
pub struct JsonLinesSource<R> {
    reader: R,
}

impl JsonLinesSource<BufReader<io::Stdin>> {
    /// Creates a source reading from stdin.
    pub fn stdin() -> Self {
        Self::new(BufReader::new(io::stdin()))
    }
}

impl<R: BufRead> JsonLinesSource<R> {
    /// Creates a source over a reader.
    pub fn new(reader: R) -> Self {
        Self { reader }
    }

    /// Parses one line. Blank lines yield None; malformed lines are an error.
    pub fn parse_line(line: &str) -> serde_json::Result<Option<TrackMetadata>> {
        let line = line.trim();
        if line.is_empty() {
            return Ok(None);
        }
        let metadata: TrackMetadata = serde_json::from_str(line)?;
        Ok(Some(metadata.trimmed()))
    }
}

impl<R: BufRead> MetadataSource for JsonLinesSource<R> {
    fn run(
        &mut self,
        emit: &mut dyn FnMut(TrackMetadata),
        shutdown: &AtomicBool,
    ) -> anyhow::Result<()> {
        let mut line_no = 0usize;
        let mut line = String::new();

        while !shutdown.load(Ordering::SeqCst) {
            line.clear();
            let read = self
                .reader
                .read_line(&mut line)
                .context("reading metadata input")?;
            if read == 0 {
                log::debug!("Metadata input closed after {} lines", line_no);
                break;
            }
            line_no += 1;

            match Self::parse_line(&line) {
                Ok(Some(metadata)) => emit(metadata),
                Ok(None) => {}
                Err(e) => log::warn!("Skipping malformed metadata on line {}: {}", line_no, e),
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn collect(input: &str) -> Vec<TrackMetadata> {
        let mut source = JsonLinesSource::new(Cursor::new(input.to_string()));
        let mut seen = Vec::new();
        let shutdown = AtomicBool::new(false);
        source.run(&mut |m| seen.push(m), &shutdown).unwrap();
        seen
    }

    #[test]
    fn reads_each_line() {
        let seen = collect(concat!(
            "{\"title\":\"Midnight\",\"artist\":\"\",\"album\":\"\",\"app_id\":\"spotify\"}\n",
            "\n",
            "{\"title\":\" Stronger \",\"artist\":\"Kanye West\",\"app_id\":\"vlc\",\"is_playing\":false}\n",
        ));
        assert_eq!(seen.len(), 2);
        assert_eq!(seen[0], TrackMetadata::new("Midnight", "", "", "spotify"));
        assert_eq!(seen[1].title, "Stronger");
        assert_eq!(seen[1].album, "");
        assert!(!seen[1].is_playing);
    }

    #[test]
    fn malformed_lines_are_skipped() {
        let seen = collect("not json\n{\"title\": 5}\n{\"title\":\"ok\"}");
        assert_eq!(seen, vec![TrackMetadata::new("ok", "", "", "")]);
    }

    #[test]
    fn stops_when_shut_down() {
        let mut source = JsonLinesSource::new(Cursor::new("{\"title\":\"a\"}\n{\"title\":\"b\"}\n"));
        let shutdown = AtomicBool::new(false);
        let mut seen = Vec::new();
        source
            .run(
                &mut |m| {
                    seen.push(m);
                    shutdown.store(true, Ordering::SeqCst);
                },
                &shutdown,
            )
            .unwrap();
        assert_eq!(seen.len(), 1);
    }

    #[test]
    fn defaults_for_missing_fields() {
        let parsed = JsonLinesSource::<Cursor<&str>>::parse_line("{}").unwrap().unwrap();
        assert_eq!(parsed, TrackMetadata::new("", "", "", ""));
        assert!(parsed.is_playing);
        assert!(JsonLinesSource::<Cursor<&str>>::parse_line("   ").unwrap().is_none());
    }
}
