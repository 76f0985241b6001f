//! Download output classification
//!
//! The model utility reports on stdout with a fixed prefix protocol:
//!
//! ```text
//! STATUS: Downloading Whisper...
//! PROGRESS: 42
//! DONE
//! ```
//!
//! Anything else it prints is ignored.

use crate::events::Event;

pub const PROGRESS_PREFIX: &str = "PROGRESS:";
pub const STATUS_PREFIX: &str = "STATUS:";
pub const DONE_MARKER: &str = "DONE";

/// Map one stdout line to its event; the full line is kept as payload
pub fn classify_download_line(line: &str) -> Option<Event> {
    if line.starts_with(PROGRESS_PREFIX) {
        Some(Event::Progress(line.to_string()))
    } else if line.starts_with(STATUS_PREFIX) {
        Some(Event::Status(line.to_string()))
    } else if line == DONE_MARKER {
        Some(Event::Done)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reference_sequence() {
        let events: Vec<_> = ["PROGRESS: 42", "STATUS: extracting", "DONE", "noise"]
            .into_iter()
            .filter_map(classify_download_line)
            .collect();

        assert_eq!(
            events,
            vec![
                Event::Progress("PROGRESS: 42".into()),
                Event::Status("STATUS: extracting".into()),
                Event::Done,
            ]
        );
    }

    #[test]
    fn test_done_must_match_exactly() {
        assert_eq!(classify_download_line("DONE "), None);
        assert_eq!(classify_download_line("DONE!"), None);
        assert_eq!(classify_download_line("done"), None);
        assert_eq!(classify_download_line(""), None);
    }

    #[test]
    fn test_prefixes_are_case_and_position_sensitive() {
        assert_eq!(classify_download_line(" PROGRESS: 1"), None);
        assert_eq!(classify_download_line("progress: 1"), None);
        assert_eq!(
            classify_download_line("PROGRESS:"),
            Some(Event::Progress("PROGRESS:".into()))
        );
    }
}
