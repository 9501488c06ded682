//! Lossy UTF-8 decoding of a byte stream that arrives in arbitrary chunks.

/// Decodes successive chunks of bytes as UTF-8, replacing every invalid
/// sequence with `U+FFFD`.
///
/// A multi-byte character may be split across two reads. The incomplete tail
/// of a chunk (at most 3 bytes) is kept until the next chunk arrives instead of
/// being replaced right away, so the character comes out intact.
#[derive(Debug, Default)]
pub(crate) struct Utf8Decoder {
    pending: Vec<u8>,
}
impl Utf8Decoder {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Decode `bytes`, prefixed with whatever was held back from the previous
    /// call. Never fails.
    pub(crate) fn decode(&mut self, bytes: &[u8]) -> String {
        let mut input = std::mem::take(&mut self.pending);
        input.extend_from_slice(bytes);

        let mut text = String::with_capacity(input.len());
        let mut chunks = input.utf8_chunks().peekable();
        while let Some(chunk) = chunks.next() {
            text.push_str(chunk.valid());
            let invalid = chunk.invalid();
            if invalid.is_empty() {
                continue;
            }
            if chunks.peek().is_none() && is_truncated(invalid) {
                // The rest of this character is still on the wire.
                self.pending.extend_from_slice(invalid);
            } else {
                text.push(char::REPLACEMENT_CHARACTER);
            }
        }
        text
    }

    /// Number of bytes held back waiting for the rest of a character.
    #[cfg(test)]
    fn pending(&self) -> usize {
        self.pending.len()
    }
}

/// Whether `invalid` is the start of a character cut short rather than a
/// sequence that can never be valid.
fn is_truncated(invalid: &[u8]) -> bool {
    matches!(std::str::from_utf8(invalid), Err(e) if e.error_len().is_none())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
use pretty_assertions::assert_eq;

#[test]
fn plain_ascii_passes_through() {
    let mut decoder = Utf8Decoder::new();
    assert_eq!(decoder.decode(b"hello\n"), "hello\n");
    assert_eq!(decoder.pending(), 0);
}

#[test]
fn empty_chunk_yields_nothing() {
    let mut decoder = Utf8Decoder::new();
    assert_eq!(decoder.decode(b""), "");
}

#[test]
fn lone_continuation_byte_is_replaced_in_place() {
    let mut decoder = Utf8Decoder::new();
    assert_eq!(decoder.decode(b"ab\x80cd"), "ab\u{FFFD}cd");
    assert_eq!(decoder.pending(), 0);
}

#[test]
fn every_invalid_sequence_gets_its_own_marker() {
    let mut decoder = Utf8Decoder::new();
    assert_eq!(decoder.decode(b"\xff\xfeok\xc0"), "\u{FFFD}\u{FFFD}ok\u{FFFD}");
}

#[test]
fn matches_std_lossy_on_complete_input() {
    let bytes = b"temp=21\xc2\xb0C \xe2\x82 \xf0\x9f\x98\x80 \xed\xa0\x80 end";
    let mut decoder = Utf8Decoder::new();
    assert_eq!(decoder.decode(bytes), String::from_utf8_lossy(bytes));
}

#[test]
fn character_split_across_chunks_is_kept_whole() {
    // "€" is E2 82 AC.
    let mut decoder = Utf8Decoder::new();
    assert_eq!(decoder.decode(b"price: \xe2"), "price: ");
    assert_eq!(decoder.pending(), 1);
    assert_eq!(decoder.decode(b"\x82"), "");
    assert_eq!(decoder.pending(), 2);
    assert_eq!(decoder.decode(b"\xac 5\n"), "\u{20AC} 5\n");
    assert_eq!(decoder.pending(), 0);
}

#[test]
fn truncation_is_told_apart_from_garbage() {
    assert!(is_truncated(b"\xe2\x82"));
    assert!(is_truncated(b"\xf0\x9f\x98"));
    assert!(!is_truncated(b"\x80"));
    assert!(!is_truncated(b"\xc0"));
}

#[test]
fn truncated_sequence_followed_by_ascii_is_replaced() {
    let mut decoder = Utf8Decoder::new();
    assert_eq!(decoder.decode(b"\xe2\x82"), "");
    assert_eq!(decoder.decode(b"A"), "\u{FFFD}A");
    assert_eq!(decoder.pending(), 0);
}
