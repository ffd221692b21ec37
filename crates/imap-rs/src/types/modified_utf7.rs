//! Modified UTF-7 codec for IMAP mailbox names (RFC 3501 §5.1.3).
//!
//! Printable US-ASCII except `&` represents itself; `&` shifts into modified
//! BASE64 (RFC 2152) until a `-` shifts back, and a bare `&-` is the escape
//! for a literal `&`.

use base64::Engine;
use base64::engine::GeneralPurpose;
use base64::engine::general_purpose::NO_PAD;

fn engine() -> GeneralPurpose {
    GeneralPurpose::new(&base64::alphabet::IMAP_MUTF7, NO_PAD)
}

/// Decodes a modified UTF-7 mailbox name into a Rust `String`.
///
/// Returns `None` on malformed input (unterminated `&` run, invalid
/// base64, or an octet outside the printable ASCII range).
#[must_use]
pub fn decode(input: &[u8]) -> Option<String> {
    let engine = engine();
    let mut output = String::new();
    let mut i = 0;

    while i < input.len() {
        match input[i] {
            b'&' => {
                let start = i;
                loop {
                    i += 1;
                    if i == input.len() {
                        return None;
                    }
                    if input[i] == b'-' {
                        break;
                    }
                }
                if start + 1 == i {
                    output.push('&');
                } else {
                    let decoded = engine.decode(&input[start + 1..i]).ok()?;
                    let mut utf16 = Vec::with_capacity(decoded.len() / 2);
                    let mut chunks = decoded.chunks_exact(2);
                    for chunk in &mut chunks {
                        utf16.push(u16::from_be_bytes([chunk[0], chunk[1]]));
                    }
                    if !chunks.remainder().is_empty() {
                        return None;
                    }
                    let decoded_str = String::from_utf16(&utf16).ok()?;
                    output.push_str(&decoded_str);
                }
            }
            c @ (0x20..=0x25 | 0x27..=0x7e) => output.push(c as char),
            _ => return None,
        }
        i += 1;
    }

    Some(output)
}

/// Encodes a Rust string into modified UTF-7 for use as a mailbox name.
#[must_use]
pub fn encode(input: &str) -> String {
    let engine = engine();
    let mut output = Vec::new();
    let mut run: Vec<u16> = Vec::new();

    let flush_run = |run: &mut Vec<u16>, output: &mut Vec<u8>| {
        if run.is_empty() {
            return;
        }
        let mut bytes = Vec::with_capacity(run.len() * 2);
        for unit in run.drain(..) {
            bytes.extend_from_slice(&unit.to_be_bytes());
        }
        output.push(b'&');
        output.extend_from_slice(engine.encode(&bytes).as_bytes());
        output.push(b'-');
    };

    for c in input.chars() {
        if c == '&' {
            flush_run(&mut run, &mut output);
            output.extend_from_slice(b"&-");
        } else if matches!(c as u32, 0x20..=0x25 | 0x27..=0x7e) {
            flush_run(&mut run, &mut output);
            output.push(c as u8);
        } else {
            let mut buf = [0u16; 2];
            for unit in c.encode_utf16(&mut buf) {
                run.push(*unit);
            }
        }
    }
    flush_run(&mut run, &mut output);

    // SAFETY-free: every pushed byte is either printable ASCII or produced by
    // the base64 engine, both of which are valid UTF-8.
    String::from_utf8(output).unwrap_or_default()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::{decode, encode};

    #[test]
    fn decode_ascii_passthrough() {
        assert_eq!(decode(b"INBOX").as_deref(), Some("INBOX"));
    }

    #[test]
    fn decode_escaped_ampersand() {
        assert_eq!(decode(b"Q&-A").as_deref(), Some("Q&A"));
    }

    #[test]
    fn decode_german_umlaut() {
        // "Büro" (office) in modified UTF-7.
        assert_eq!(decode(b"B&APw-ro").as_deref(), Some("Büro"));
    }

    #[test]
    fn round_trip_non_ascii() {
        let original = "hello/世界/& world";
        let encoded = encode(original);
        assert_eq!(decode(encoded.as_bytes()).as_deref(), Some(original));
    }

    #[test]
    fn decode_rejects_unterminated_shift() {
        assert_eq!(decode(b"&APw"), None);
    }

    #[test]
    fn encode_plain_ascii_untouched() {
        assert_eq!(encode("INBOX"), "INBOX");
    }
}
