//! Transcript assembly
//!
//! Pure text handling for both transcription paths: the cleaning rule applied
//! to every piece of text coming back from the backend, and the append-only
//! buffer the live session grows fragment by fragment. No network or device
//! state lives here.

use regex::Regex;
use std::sync::LazyLock;

/// Boilerplate the recognition engine emits on silent or noisy input.
static BOILERPLATE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)subtítulos realizados por la comunidad de amara\.org")
        .expect("boilerplate pattern is valid")
});

static WHITESPACE_RUNS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("whitespace pattern is valid"));

/// Clean a piece of transcribed text: strip the known boilerplate marker
/// (case-insensitive, wherever it appears), collapse whitespace runs into
/// single spaces, and trim. Idempotent. Shared by the live assembler and the
/// batch client.
pub fn clean_fragment(text: &str) -> String {
    let stripped = BOILERPLATE.replace_all(text, "");
    WHITESPACE_RUNS.replace_all(&stripped, " ").trim().to_string()
}

/// Append-only transcript buffer for one live session.
///
/// Fragments are appended strictly in arrival order, each followed by a line
/// separator. Nothing is ever rewritten or removed while the session runs;
/// the buffer is only reset when a new session starts.
#[derive(Debug, Default)]
pub struct TranscriptAssembler {
    buffer: String,
    fragment_count: usize,
}

impl TranscriptAssembler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Clean and append one fragment. Returns false when the fragment is
    /// discarded (whitespace-only, or nothing left after cleaning).
    pub fn append(&mut self, fragment: &str) -> bool {
        if fragment.trim().is_empty() {
            return false;
        }

        let cleaned = clean_fragment(fragment);
        if cleaned.is_empty() {
            return false;
        }

        self.buffer.push_str(&cleaned);
        self.buffer.push('\n');
        self.fragment_count += 1;
        true
    }

    /// The transcript so far, one cleaned fragment per line.
    pub fn text(&self) -> &str {
        &self.buffer
    }

    pub fn fragment_count(&self) -> usize {
        self.fragment_count
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// Reset for a new session.
    pub fn clear(&mut self) {
        self.buffer.clear();
        self.fragment_count = 0;
    }
}
