//! Player color (White / Black) for seats, turns and clocks.

/// Side of the board a player controls.
///
/// On the wire a color is the single character `'w'` or `'b'`,
/// matching the side-to-move field of a FEN string.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Color {
    White,
    Black,
}

impl Color {
    /// Colors in seating order: the first joiner gets `White`.
    pub const SEATING: [Color; 2] = [Color::White, Color::Black];

    /// Wire representation (`'w'` / `'b'`).
    pub fn as_char(self) -> char {
        match self {
            Color::White => 'w',
            Color::Black => 'b',
        }
    }

    /// Parse from the wire representation (case-sensitive).
    pub fn from_char(c: char) -> Option<Self> {
        match c {
            'w' => Some(Color::White),
            'b' => Some(Color::Black),
            _ => None,
        }
    }

    /// Parse a one-character string such as `"w"`.
    pub fn from_wire(s: &str) -> Option<Self> {
        let mut chars = s.chars();
        match (chars.next(), chars.next()) {
            (Some(c), None) => Color::from_char(c),
            _ => None,
        }
    }

    pub fn opposite(self) -> Self {
        match self {
            Color::White => Color::Black,
            Color::Black => Color::White,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Color::White => "white",
            Color::Black => "black",
        }
    }
}

impl From<shakmaty::Color> for Color {
    fn from(c: shakmaty::Color) -> Self {
        match c {
            shakmaty::Color::White => Color::White,
            shakmaty::Color::Black => Color::Black,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_chars_round_trip() {
        for color in Color::SEATING {
            assert_eq!(Color::from_char(color.as_char()), Some(color));
        }
        assert_eq!(Color::from_char('W'), None);
    }

    #[test]
    fn from_wire_rejects_longer_strings() {
        assert_eq!(Color::from_wire("w"), Some(Color::White));
        assert_eq!(Color::from_wire("white"), None);
        assert_eq!(Color::from_wire(""), None);
    }

    #[test]
    fn opposite_flips() {
        assert_eq!(Color::White.opposite(), Color::Black);
        assert_eq!(Color::Black.opposite(), Color::White);
    }
}
