// Per-channel push ("on") and pull ("off") pulse widths
//
// Configuration file format, one record per line:
//
//     # channel, on, off
//     0, 2400, 700
//
// Spaces are ignored. Comment lines and records that are not exactly three
// integers are skipped without error.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use tracing::{debug, info, warn};

use crate::error::{Result, ServoError};
use crate::servo::PulseWidth;

/// Outcome of loading a configuration source
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoadReport {
    /// Records written into the table
    pub applied: usize,
    /// Comments, blank and malformed lines
    pub skipped: usize,
    /// Well-formed records naming a channel the table does not have
    pub out_of_range: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelTable {
    on: Vec<PulseWidth>,
    off: Vec<PulseWidth>,
}

impl ChannelTable {
    /// Table of `channel_count` entries, all set to `center` microseconds
    pub fn new(channel_count: usize, center: u16) -> Self {
        Self {
            on: vec![PulseWidth::Active(center); channel_count],
            off: vec![PulseWidth::Active(center); channel_count],
        }
    }

    pub fn len(&self) -> usize {
        self.on.len()
    }

    pub fn is_empty(&self) -> bool {
        self.on.is_empty()
    }

    /// Push width of `channel`
    pub fn on(&self, channel: usize) -> Option<PulseWidth> {
        self.on.get(channel).copied()
    }

    /// Pull width of `channel`
    pub fn off(&self, channel: usize) -> Option<PulseWidth> {
        self.off.get(channel).copied()
    }

    /// Overwrite both widths of one channel
    pub fn set(&mut self, channel: usize, on: PulseWidth, off: PulseWidth) -> Result<()> {
        if channel >= self.len() {
            return Err(ServoError::InvalidChannel {
                channel,
                count: self.len(),
            });
        }
        self.on[channel] = on;
        self.off[channel] = off;
        Ok(())
    }

    /// Apply every record of `reader` to the table
    pub fn load<R: BufRead>(&mut self, reader: R) -> std::io::Result<LoadReport> {
        let mut report = LoadReport::default();

        for (lineno, line) in reader.lines().enumerate() {
            let line = line?;
            let Some((channel, on, off)) = parse_record(&line) else {
                debug!("line {}: skipped {:?}", lineno + 1, line);
                report.skipped += 1;
                continue;
            };

            match self.set(channel, on, off) {
                Ok(()) => report.applied += 1,
                Err(e) => {
                    warn!("line {}: {} .. ignored", lineno + 1, e);
                    report.out_of_range += 1;
                }
            }
        }

        debug!("on={:?}", self.on);
        debug!("off={:?}", self.off);
        Ok(report)
    }

    /// Load the configuration file at `path`
    pub fn load_file(&mut self, path: &Path) -> Result<LoadReport> {
        info!("Loading servo configuration from {}", path.display());
        let config_error = |source| ServoError::Config {
            path: path.to_path_buf(),
            source,
        };

        let file = File::open(path).map_err(config_error)?;
        let report = self.load(BufReader::new(file)).map_err(config_error)?;

        info!(
            "Configuration loaded: {} applied, {} skipped, {} out of range",
            report.applied, report.skipped, report.out_of_range
        );
        Ok(report)
    }
}

/// Parse `channel,on,off`, `None` for anything that is not such a record
fn parse_record(line: &str) -> Option<(usize, PulseWidth, PulseWidth)> {
    let compact: String = line.chars().filter(|c| !c.is_whitespace()).collect();
    if compact.starts_with('#') {
        return None;
    }

    let fields: Vec<&str> = compact.split(',').collect();
    let [channel, on, off] = fields.as_slice() else {
        return None;
    };

    let channel = channel.parse::<usize>().ok()?;
    let on = PulseWidth::from_raw(on.parse().ok()?)?;
    let off = PulseWidth::from_raw(off.parse().ok()?)?;
    Some((channel, on, off))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Cursor, Write};

    #[test]
    fn test_defaults_to_center() {
        let table = ChannelTable::new(3, 1500);
        assert_eq!(table.len(), 3);
        for ch in 0..3 {
            assert_eq!(table.on(ch), Some(PulseWidth::Active(1500)));
            assert_eq!(table.off(ch), Some(PulseWidth::Active(1500)));
        }
        assert_eq!(table.on(3), None);
    }

    #[test]
    fn test_parse_record() {
        assert_eq!(
            parse_record(" 1, 2400 ,700\r"),
            Some((1, PulseWidth::Active(2400), PulseWidth::Active(700)))
        );
        assert_eq!(
            parse_record("2,0,-1"),
            Some((2, PulseWidth::Off, PulseWidth::NoOp))
        );
        assert_eq!(parse_record("# comment,1,2"), None);
        assert_eq!(parse_record("5,10"), None);
        assert_eq!(parse_record("1,2,3,4"), None);
        assert_eq!(parse_record("a,2400,700"), None);
        assert_eq!(parse_record("-1,2400,700"), None);
        assert_eq!(parse_record("1,-5,700"), None);
        assert_eq!(parse_record(""), None);
    }

    #[test]
    fn test_load_skips_comments_and_malformed_lines() {
        let mut table = ChannelTable::new(8, 1500);
        let source = "# comment,1,2\n5,10\n1,2400,700\n";
        let report = table.load(Cursor::new(source)).unwrap();

        assert_eq!(
            report,
            LoadReport {
                applied: 1,
                skipped: 2,
                out_of_range: 0
            }
        );
        assert_eq!(table.on(5), Some(PulseWidth::Active(1500)));
        assert_eq!(table.off(5), Some(PulseWidth::Active(1500)));
        assert_eq!(table.on(1), Some(PulseWidth::Active(2400)));
        assert_eq!(table.off(1), Some(PulseWidth::Active(700)));
    }

    #[test]
    fn test_load_rejects_out_of_range_channel() {
        let mut table = ChannelTable::new(3, 1500);
        let report = table.load(Cursor::new("3,2400,700\n99,2400,700\n")).unwrap();

        assert_eq!(report.out_of_range, 2);
        assert_eq!(report.applied, 0);
        assert_eq!(table, ChannelTable::new(3, 1500));
    }

    #[test]
    fn test_later_records_win() {
        let mut table = ChannelTable::new(2, 1500);
        table
            .load(Cursor::new("0,2000,1000\n0,2100,900\n"))
            .unwrap();
        assert_eq!(table.on(0), Some(PulseWidth::Active(2100)));
        assert_eq!(table.off(0), Some(PulseWidth::Active(900)));
    }

    #[test]
    fn test_load_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "# ch, on, off").unwrap();
        writeln!(file, "0, 2300, 800").unwrap();
        writeln!(file, "2, 600, 2200").unwrap();

        let mut table = ChannelTable::new(3, 1500);
        let report = table.load_file(file.path()).unwrap();
        assert_eq!(report.applied, 2);
        assert_eq!(report.skipped, 1);
        assert_eq!(table.off(2), Some(PulseWidth::Active(2200)));
    }

    #[test]
    fn test_load_file_missing() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("music-box-servo.conf");

        let mut table = ChannelTable::new(3, 1500);
        let err = table.load_file(&missing).unwrap_err();
        assert!(matches!(err, ServoError::Config { path, .. } if path == missing));
    }
}
