//! Code 39 barcode encoder.
//!
//! Produces the bar/space element sequence for a serial number, ready to be
//! painted at any physical width. Code 39 is discrete and self-checking:
//! every symbol is nine elements (five bars, four spaces) of which exactly
//! three are wide, and the payload is wrapped in `*` start/stop sentinels.
//!
//! The encoder never fails: the payload is sanitized to the Code 39 charset
//! first, and an empty payload still yields valid sentinel-only bars.

/// Width of a narrow element, in units.
const NARROW: u32 = 1;
/// Width of a wide element, in units.
const WIDE: u32 = 3;
/// Width of the space between consecutive symbols, in units.
const GAP: u32 = 1;

/// One drawable element of an encoded barcode. Spaces advance the cursor
/// without being painted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub struct Element {
    /// Width in narrow units (1 or 3).
    pub width: u32,
    /// `true` for a bar, `false` for a space.
    pub bar: bool,
}

/// Wide/narrow flags for a symbol, elements alternating bar/space and
/// starting with a bar. `1` marks a wide element.
fn wide_flags(ch: char) -> Option<&'static [u8; 9]> {
    let flags: &[u8; 9] = match ch {
        '0' => b"000110100",
        '1' => b"100100001",
        '2' => b"001100001",
        '3' => b"101100000",
        '4' => b"000110001",
        '5' => b"100110000",
        '6' => b"001110000",
        '7' => b"000100101",
        '8' => b"100100100",
        '9' => b"001100100",
        'A' => b"100001001",
        'B' => b"001001001",
        'C' => b"101001000",
        'D' => b"000011001",
        'E' => b"100011000",
        'F' => b"001011000",
        'G' => b"000001101",
        'H' => b"100001100",
        'I' => b"001001100",
        'J' => b"000011100",
        'K' => b"100000011",
        'L' => b"001000011",
        'M' => b"101000010",
        'N' => b"000010011",
        'O' => b"100010010",
        'P' => b"001010010",
        'Q' => b"000000111",
        'R' => b"100000110",
        'S' => b"001000110",
        'T' => b"000010110",
        'U' => b"110000001",
        'V' => b"011000001",
        'W' => b"111000000",
        'X' => b"010010001",
        'Y' => b"110010000",
        'Z' => b"011010000",
        '-' => b"010000101",
        '.' => b"110000100",
        ' ' => b"011000100",
        '$' => b"010101000",
        '/' => b"010100010",
        '+' => b"010001010",
        '%' => b"000101010",
        '*' => b"010010100",
        _ => return None,
    };
    Some(flags)
}

/// Upper-case the value and strip every character outside the Code 39
/// charset (`0-9 A-Z - . SPACE $ / + %`). Idempotent; may shorten the
/// string. The `*` sentinel is not part of the data charset and is
/// stripped too, which keeps start/stop markers unambiguous.
pub fn sanitize(value: &str) -> String {
    value
        .to_uppercase()
        .chars()
        .filter(|ch| matches!(ch, '0'..='9' | 'A'..='Z' | '-' | '.' | ' ' | '$' | '/' | '+' | '%'))
        .collect()
}

/// Append one symbol's nine elements. Symbols missing from the table fall
/// back to the `-` pattern so rendering can never fail; sanitization makes
/// that path unreachable for `encode` callers.
fn push_symbol(out: &mut Vec<Element>, ch: char) {
    let flags = wide_flags(ch).unwrap_or(b"010000101");
    for (idx, flag) in flags.iter().enumerate() {
        out.push(Element {
            width: if *flag == b'1' { WIDE } else { NARROW },
            bar: idx % 2 == 0,
        });
    }
}

/// Encode a value into its bar/space element sequence: sanitize, wrap in
/// `*` sentinels, emit each symbol's pattern with a one-unit gap between
/// symbols. Total (no error path); an empty sanitized payload encodes to
/// start/stop bars only.
pub fn encode(value: &str) -> Vec<Element> {
    let payload = sanitize(value);
    let symbols: Vec<char> = std::iter::once('*')
        .chain(payload.chars())
        .chain(std::iter::once('*'))
        .collect();

    let mut out = Vec::with_capacity(symbols.len() * 10);
    for (pos, ch) in symbols.iter().enumerate() {
        if pos > 0 {
            out.push(Element {
                width: GAP,
                bar: false,
            });
        }
        push_symbol(&mut out, *ch);
    }
    out
}

/// Sum of element widths, in narrow units. Used to derive the physical
/// width of one unit from the drawable span.
pub fn total_units(elements: &[Element]) -> u32 {
    elements.iter().map(|e| e.width).sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Every symbol spans 15 units: 3 wide (3 units) + 6 narrow.
    const UNITS_PER_SYMBOL: u32 = 15;

    #[test]
    fn sanitize_uppercases_and_strips() {
        assert_eq!(sanitize("ab#12@"), "AB12");
        assert_eq!(sanitize("abc-123"), "ABC-123");
        assert_eq!(sanitize("A*B"), "AB");
        assert_eq!(sanitize("PRIX $9/+5%"), "PRIX $9/+5%");
        assert_eq!(sanitize("éçü"), "");
    }

    #[test]
    fn sanitize_is_idempotent() {
        for raw in ["ABC-123", "ab#12@", "  99 00 ", "*X*", "é$%"] {
            let once = sanitize(raw);
            assert_eq!(sanitize(&once), once);
        }
    }

    #[test]
    fn empty_payload_encodes_sentinels_only() {
        let elements = encode("");
        // Two symbols of nine elements plus one inter-symbol gap.
        assert_eq!(elements.len(), 19);
        assert_eq!(total_units(&elements), 2 * UNITS_PER_SYMBOL + GAP);
    }

    #[test]
    fn element_counts_follow_symbol_count() {
        let elements = encode("A");
        assert_eq!(elements.len(), 3 * 9 + 2);
        assert_eq!(total_units(&elements), 3 * UNITS_PER_SYMBOL + 2 * GAP);

        let elements = encode("ABC-123");
        assert_eq!(elements.len(), 9 * 9 + 8);
        assert_eq!(total_units(&elements), 9 * UNITS_PER_SYMBOL + 8 * GAP);
    }

    #[test]
    fn elements_alternate_starting_with_a_bar() {
        // Each symbol contributes 10 elements (9 + gap), so bar/space parity
        // holds across the whole sequence.
        let elements = encode("999000111");
        for (idx, element) in elements.iter().enumerate() {
            assert_eq!(element.bar, idx % 2 == 0, "element {idx}");
        }
        assert!(elements.first().is_some_and(|e| e.bar));
        assert!(elements.last().is_some_and(|e| e.bar));
    }

    #[test]
    fn widths_are_narrow_or_wide_only() {
        for element in encode("X/4.2 $+%") {
            assert!(element.width == NARROW || element.width == WIDE);
        }
    }

    #[test]
    fn start_and_stop_patterns_match() {
        let elements = encode("42");
        let start: Vec<u32> = elements[..9].iter().map(|e| e.width).collect();
        let stop: Vec<u32> = elements[elements.len() - 9..].iter().map(|e| e.width).collect();
        assert_eq!(start, stop);
        // The `*` sentinel: narrow bar, wide space, narrow bar, narrow
        // space, wide bar, narrow space, wide bar, narrow space, narrow bar.
        assert_eq!(start, vec![1, 3, 1, 1, 3, 1, 3, 1, 1]);
    }

    #[test]
    fn encoding_is_deterministic() {
        assert_eq!(encode("ABC-123"), encode("ABC-123"));
        assert_eq!(total_units(&encode("999000111")), total_units(&encode("999000111")));
    }

    #[test]
    fn unsupported_characters_are_dropped_before_encoding() {
        assert_eq!(encode("AB#12@"), encode("AB12"));
    }

    #[test]
    fn unknown_symbol_falls_back_to_dash_pattern() {
        let mut fallback = Vec::new();
        push_symbol(&mut fallback, '#');
        let mut dash = Vec::new();
        push_symbol(&mut dash, '-');
        assert_eq!(fallback, dash);
    }

    #[test]
    fn every_symbol_has_three_wide_elements() {
        let charset = "0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ-. $/+%*";
        assert_eq!(charset.chars().count(), 44);
        for ch in charset.chars() {
            let flags = wide_flags(ch).unwrap();
            let wide = flags.iter().filter(|f| **f == b'1').count();
            assert_eq!(wide, 3, "symbol {ch:?}");
        }
    }
}
