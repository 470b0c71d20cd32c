use std::borrow::Cow;
use std::char::REPLACEMENT_CHARACTER;

use pooled_buffers::{BufferWriter, MemoryBufferWriter, SpanOwner};

/// The encoding of raw bytes passed to
/// [`StringPool::get_or_add_bytes()`][crate::StringPool::get_or_add_bytes].
///
/// Decoding is lossy: byte sequences that are not valid in the chosen encoding become
/// U+FFFD REPLACEMENT CHARACTER instead of failing.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
#[non_exhaustive]
pub enum TextEncoding {
    /// UTF-8. This is the default.
    #[default]
    Utf8,

    /// UTF-16 with little-endian code units.
    Utf16Le,

    /// UTF-16 with big-endian code units.
    Utf16Be,

    /// ISO-8859-1, where every byte is the code point of the same value.
    Latin1,
}

/// Decodes `bytes` and hands the resulting text to `f`.
///
/// UTF-8 input is borrowed when valid. The other encodings are transcoded into scratch memory
/// rented from the shared byte pool, so no heap allocation is needed unless `f` makes one.
pub(crate) fn decode<R>(bytes: &[u8], encoding: TextEncoding, f: impl FnOnce(&str) -> R) -> R {
    match encoding {
        TextEncoding::Utf8 => f(&String::from_utf8_lossy(bytes)),
        TextEncoding::Utf16Le => {
            let units = utf16_units(bytes, u16::from_le_bytes);
            transcode(utf16_chars(bytes, units), utf16_worst_case(bytes.len()), f)
        }
        TextEncoding::Utf16Be => {
            let units = utf16_units(bytes, u16::from_be_bytes);
            transcode(utf16_chars(bytes, units), utf16_worst_case(bytes.len()), f)
        }
        TextEncoding::Latin1 => transcode(
            bytes.iter().copied().map(char::from),
            bytes.len().saturating_mul(2),
            f,
        ),
    }
}

fn utf16_units(bytes: &[u8], from_bytes: fn([u8; 2]) -> u16) -> impl Iterator<Item = u16> {
    bytes.chunks_exact(2).map(move |pair| {
        #[expect(
            clippy::indexing_slicing,
            reason = "chunks_exact only yields slices of length 2"
        )]
        let pair = [pair[0], pair[1]];

        from_bytes(pair)
    })
}

/// Decodes UTF-16 code units, replacing unpaired surrogates and a trailing odd byte.
fn utf16_chars(bytes: &[u8], units: impl Iterator<Item = u16>) -> impl Iterator<Item = char> {
    let trailing_byte = (bytes.len() % 2 == 1).then_some(REPLACEMENT_CHARACTER);

    char::decode_utf16(units)
        .map(|decoded| decoded.unwrap_or(REPLACEMENT_CHARACTER))
        .chain(trailing_byte)
}

/// Every UTF-16 code unit becomes at most 3 UTF-8 bytes (a surrogate pair becomes 4 bytes from
/// 2 units), plus 3 bytes for the replacement of a trailing odd byte.
fn utf16_worst_case(byte_len: usize) -> usize {
    (byte_len / 2).saturating_mul(3).saturating_add(3)
}

fn transcode<R>(
    chars: impl Iterator<Item = char>,
    max_len: usize,
    f: impl FnOnce(&str) -> R,
) -> R {
    let mut scratch = SpanOwner::<u8>::allocate(max_len);
    let mut writer = MemoryBufferWriter::new(&mut *scratch);

    for c in chars {
        let mut encoded = [0_u8; 4];

        writer
            .write(c.encode_utf8(&mut encoded).as_bytes())
            .expect("scratch memory is sized for the worst-case UTF-8 expansion");
    }

    // Always valid UTF-8 because it was assembled from whole chars, so this borrows.
    let text: Cow<'_, str> = String::from_utf8_lossy(writer.into_written());
    f(&text)
}
