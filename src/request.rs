// Input lines of the interactive prompt

use crate::music_box::decode_hole_pattern;

/// What one prompt line asks for
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Request {
    /// Pluck these channels
    Tap(Vec<usize>),
    /// Print the last commanded pulse widths
    Status,
    /// Leave the loop
    Quit,
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum RequestError {
    #[error("not a channel number: {0:?}")]
    InvalidNumber(String),
}

/// Parse one line: `1, 2,3` lists channels, `!--o-o--` is a hole pattern,
/// `?` asks for the status and an empty line quits.
pub fn parse_request(line: &str) -> Result<Request, RequestError> {
    let line = line.trim_end_matches(['\r', '\n']);
    if line.is_empty() {
        return Ok(Request::Quit);
    }

    let line: String = line.chars().filter(|c| *c != ' ').collect();
    if line == "?" {
        return Ok(Request::Status);
    }

    let first = line.split(',').next().unwrap_or_default();
    if let Some(pattern) = first.strip_prefix('!') {
        return Ok(Request::Tap(decode_hole_pattern(pattern.trim_matches('!'))));
    }

    line.split(',')
        .map(|s| {
            s.parse::<usize>()
                .map_err(|_| RequestError::InvalidNumber(s.to_string()))
        })
        .collect::<Result<Vec<_>, _>>()
        .map(Request::Tap)
}
