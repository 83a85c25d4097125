//! Glyph metrics for the standard Type1 fonts
//!
//! Widths are in 1/1000 em, indexed by WinAnsiEncoding byte.

/// Helvetica widths for bytes 0x20..=0x7E
const HELVETICA_ASCII: [u16; 95] = [
    278, 278, 355, 556, 556, 889, 667, 191, 333, 333, 389, 584, 278, 333, 278, 278, // 0x20
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, // digits
    278, 278, 584, 584, 584, 556, 1015, // : ; < = > ? @
    667, 667, 722, 722, 667, 611, 778, 722, 278, 500, 667, 556, 833, // A-M
    722, 778, 667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, // N-Z
    278, 278, 278, 469, 556, 222, // [ \ ] ^ _ `
    556, 556, 500, 556, 556, 278, 556, 556, 222, 222, 500, 222, 833, // a-m
    556, 556, 556, 556, 333, 500, 278, 556, 500, 722, 500, 500, 500, // n-z
    334, 260, 334, 584, // { | } ~
];

/// Helvetica widths for bytes 0xA0..=0xFF
const HELVETICA_LATIN1: [u16; 96] = [
    278, 333, 556, 556, 556, 556, 260, 556, 333, 737, 370, 556, 584, 333, 737, 333, // 0xA0
    400, 584, 333, 333, 333, 556, 537, 278, 333, 333, 365, 556, 834, 834, 834, 611, // 0xB0
    667, 667, 667, 667, 667, 667, 1000, 722, 667, 667, 667, 667, 278, 278, 278, 278, // 0xC0
    722, 722, 778, 778, 778, 778, 778, 584, 778, 722, 722, 722, 722, 667, 667, 611, // 0xD0
    556, 556, 556, 556, 556, 556, 889, 500, 556, 556, 556, 556, 278, 278, 278, 278, // 0xE0
    556, 556, 556, 556, 556, 556, 556, 584, 611, 556, 556, 556, 556, 500, 556, 500, // 0xF0
];

/// Every Courier glyph has the same advance
const COURIER_WIDTH: u16 = 600;

/// Replacement for characters WinAnsiEncoding cannot represent
pub const REPLACEMENT_BYTE: u8 = b'?';

/// Map a character to its WinAnsiEncoding byte
pub fn win_ansi_byte(c: char) -> Option<u8> {
    match c {
        ' '..='~' | '\u{A0}'..='\u{FF}' => Some(c as u32 as u8),
        '€' => Some(0x80),
        '…' => Some(0x85),
        '‘' => Some(0x91),
        '’' => Some(0x92),
        '“' => Some(0x93),
        '”' => Some(0x94),
        '•' => Some(0x95),
        '–' => Some(0x96),
        '—' => Some(0x97),
        '™' => Some(0x99),
        _ => None,
    }
}

/// Helvetica advance width for a WinAnsi byte
pub fn helvetica_width(byte: u8) -> u16 {
    match byte {
        0x20..=0x7E => HELVETICA_ASCII[(byte - 0x20) as usize],
        0xA0..=0xFF => HELVETICA_LATIN1[(byte - 0xA0) as usize],
        0x80 => 556,
        0x85 => 1000,
        0x91 | 0x92 => 222,
        0x93 | 0x94 => 333,
        0x95 => 350,
        0x96 => 556,
        0x97 => 1000,
        0x99 => 1000,
        _ => helvetica_width(REPLACEMENT_BYTE),
    }
}

/// Courier advance width for a WinAnsi byte
pub fn courier_width(_byte: u8) -> u16 {
    COURIER_WIDTH
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_win_ansi_ascii_and_latin1() {
        assert_eq!(win_ansi_byte('A'), Some(0x41));
        assert_eq!(win_ansi_byte('/'), Some(0x2F));
        assert_eq!(win_ansi_byte('ñ'), Some(0xF1));
        assert_eq!(win_ansi_byte('’'), Some(0x92));
        assert_eq!(win_ansi_byte('₱'), None);
        assert_eq!(win_ansi_byte('\n'), None);
    }

    #[test]
    fn test_helvetica_widths() {
        assert_eq!(helvetica_width(b' '), 278);
        assert_eq!(helvetica_width(b'/'), 278);
        assert_eq!(helvetica_width(b'0'), 556);
        assert_eq!(helvetica_width(b'J'), 500);
        assert_eq!(helvetica_width(b'W'), 944);
        assert_eq!(helvetica_width(b'i'), 222);
        assert_eq!(helvetica_width(b'm'), 833);
        assert_eq!(helvetica_width(b'~'), 584);
        assert_eq!(helvetica_width(0xD1), 722); // Ñ
        assert_eq!(helvetica_width(0xF1), 556); // ñ
    }

    #[test]
    fn test_helvetica_unmapped_byte_uses_replacement() {
        assert_eq!(helvetica_width(0x81), helvetica_width(b'?'));
    }

    #[test]
    fn test_courier_is_monospaced() {
        assert_eq!(courier_width(b'i'), courier_width(b'W'));
    }
}
