//! Board wrapper over the `shakmaty` rules engine.
//!
//! The session layer only needs four things from the rules: the FEN of
//! the current position, the side to move, "play this from/to move or
//! tell me it's illegal", and terminal classification. Everything else
//! stays inside `shakmaty`.

use shakmaty::fen::Fen;
use shakmaty::{CastlingMode, Chess, EnPassantMode, File, Move, Position, Role, Square};

use crate::color::Color;
use crate::error::RulesError;

/// Piece a pawn promotes to. Defaults to a queen when the request omits it.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Promotion {
    Queen,
    Rook,
    Bishop,
    Knight,
}

impl Promotion {
    pub fn from_char(c: char) -> Option<Self> {
        match c {
            'q' => Some(Promotion::Queen),
            'r' => Some(Promotion::Rook),
            'b' => Some(Promotion::Bishop),
            'n' => Some(Promotion::Knight),
            _ => None,
        }
    }

    fn role(self) -> Role {
        match self {
            Promotion::Queen => Role::Queen,
            Promotion::Rook => Role::Rook,
            Promotion::Bishop => Role::Bishop,
            Promotion::Knight => Role::Knight,
        }
    }
}

/// Terminal classification of a position.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum BoardStatus {
    Ongoing,
    Checkmate { winner: Color },
    Stalemate,
    InsufficientMaterial,
    FiftyMoveRule,
    ThreefoldRepetition,
}

impl BoardStatus {
    pub fn is_terminal(self) -> bool {
        self != BoardStatus::Ongoing
    }
}

/// Parse an algebraic square such as `"e4"`.
pub fn parse_square(s: &str) -> Result<Square, RulesError> {
    s.parse::<Square>()
        .map_err(|_| RulesError::InvalidSquare(s.to_string()))
}

#[derive(Debug, Clone)]
pub struct Board {
    position: Chess,

    /// Repetition keys since the last irreversible move, current one last.
    history: Vec<String>,
}

impl Board {
    /// Standard starting position.
    pub fn new() -> Self {
        Board::from_position(Chess::default())
    }

    pub fn from_fen(fen: &str) -> Result<Self, RulesError> {
        let parsed: Fen = fen
            .parse()
            .map_err(|e| RulesError::InvalidFen(format!("{e}")))?;
        let position: Chess = parsed
            .into_position(CastlingMode::Standard)
            .map_err(|e| RulesError::InvalidFen(format!("{e}")))?;
        Ok(Board::from_position(position))
    }

    fn from_position(position: Chess) -> Self {
        let mut board = Board {
            position,
            history: Vec::new(),
        };
        let key = board.repetition_key();
        board.history.push(key);
        board
    }

    pub fn fen(&self) -> String {
        Fen::from_position(&self.position, EnPassantMode::Legal).to_string()
    }

    pub fn turn(&self) -> Color {
        self.position.turn().into()
    }

    /// Play `from -> to` on a copy of this board.
    ///
    /// Castling may be requested with the king's destination square
    /// (`e1 -> g1`) or by moving the king onto its own rook.
    pub fn play(
        &self,
        from: Square,
        to: Square,
        promotion: Option<Promotion>,
    ) -> Result<Board, RulesError> {
        let candidates: Vec<Move> = self
            .position
            .legal_moves()
            .into_iter()
            .filter(|m| m.from() == Some(from) && lands_on(m, to))
            .collect();

        let wanted = promotion.unwrap_or(Promotion::Queen).role();
        let chosen = candidates
            .iter()
            .find(|m| m.promotion().map_or(true, |role| role == wanted))
            .ok_or(RulesError::IllegalMove { from, to })?;

        let mut next = self.clone();
        next.position.play_unchecked(*chosen);
        if next.position.halfmoves() == 0 {
            next.history.clear();
        }
        let key = next.repetition_key();
        next.history.push(key);
        Ok(next)
    }

    pub fn status(&self) -> BoardStatus {
        let pos = &self.position;
        if pos.is_checkmate() {
            BoardStatus::Checkmate {
                winner: Color::from(pos.turn()).opposite(),
            }
        } else if pos.is_stalemate() {
            BoardStatus::Stalemate
        } else if pos.is_insufficient_material() {
            BoardStatus::InsufficientMaterial
        } else if pos.halfmoves() >= 100 {
            BoardStatus::FiftyMoveRule
        } else if self.repetitions() >= 3 {
            BoardStatus::ThreefoldRepetition
        } else {
            BoardStatus::Ongoing
        }
    }

    /// How many times the current position has occurred.
    fn repetitions(&self) -> usize {
        match self.history.last() {
            Some(current) => self.history.iter().filter(|k| *k == current).count(),
            None => 0,
        }
    }

    /// Placement, side to move, castling rights and en-passant square.
    fn repetition_key(&self) -> String {
        let fen = self.fen();
        fen.split(' ').take(4).collect::<Vec<_>>().join(" ")
    }
}

impl Default for Board {
    fn default() -> Self {
        Self::new()
    }
}

fn lands_on(m: &Move, to: Square) -> bool {
    match *m {
        Move::Castle { king, rook } => {
            let king_file = if rook.file() > king.file() {
                File::G
            } else {
                File::C
            };
            to == rook || to == Square::from_coords(king_file, king.rank())
        }
        _ => m.to() == to,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const START_FEN: &str = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1";

    fn sq(s: &str) -> Square {
        parse_square(s).unwrap()
    }

    #[test]
    fn starting_position() {
        let board = Board::new();
        assert_eq!(board.fen(), START_FEN);
        assert_eq!(board.turn(), Color::White);
        assert_eq!(board.status(), BoardStatus::Ongoing);
    }

    #[test]
    fn play_returns_new_board_and_leaves_original() {
        let board = Board::new();
        let next = board.play(sq("e2"), sq("e4"), None).unwrap();
        assert_eq!(board.fen(), START_FEN);
        assert!(next.fen().starts_with("rnbqkbnr/pppppppp/8/8/4P3/8/PPPP1PPP/RNBQKBNR b"));
        assert_eq!(next.turn(), Color::Black);
    }

    #[test]
    fn illegal_move_is_rejected() {
        let board = Board::new();
        let err = board.play(sq("e2"), sq("e5"), None).unwrap_err();
        assert_eq!(
            err,
            RulesError::IllegalMove {
                from: sq("e2"),
                to: sq("e5")
            }
        );
    }

    #[test]
    fn bad_square_text() {
        assert!(parse_square("i9").is_err());
        assert!(parse_square("e4").is_ok());
    }

    #[test]
    fn fools_mate_is_checkmate_for_black() {
        let mut board = Board::new();
        for (from, to) in [("f2", "f3"), ("e7", "e5"), ("g2", "g4"), ("d8", "h4")] {
            board = board.play(sq(from), sq(to), None).unwrap();
        }
        assert_eq!(
            board.status(),
            BoardStatus::Checkmate {
                winner: Color::Black
            }
        );
    }

    #[test]
    fn castling_by_king_destination() {
        let board =
            Board::from_fen("r3k2r/pppppppp/8/8/8/8/PPPPPPPP/R3K2R w KQkq - 0 1").unwrap();
        let next = board.play(sq("e1"), sq("g1"), None).unwrap();
        assert!(next.fen().starts_with("r3k2r/pppppppp/8/8/8/8/PPPPPPPP/R4RK1 b kq"));
    }

    #[test]
    fn promotion_defaults_to_queen() {
        let board = Board::from_fen("8/P7/8/8/8/8/8/k6K w - - 0 1").unwrap();
        let queen = board.play(sq("a7"), sq("a8"), None).unwrap();
        assert!(queen.fen().starts_with("Q7/"));
        let knight = board
            .play(sq("a7"), sq("a8"), Some(Promotion::Knight))
            .unwrap();
        assert!(knight.fen().starts_with("N7/"));
    }

    #[test]
    fn stalemate_and_insufficient_material() {
        let stalemate = Board::from_fen("7k/5Q2/6K1/8/8/8/8/8 b - - 0 1").unwrap();
        assert_eq!(stalemate.status(), BoardStatus::Stalemate);

        let bare_kings = Board::from_fen("8/8/8/4k3/8/8/8/4K3 w - - 0 1").unwrap();
        assert_eq!(bare_kings.status(), BoardStatus::InsufficientMaterial);
    }

    #[test]
    fn knight_shuffle_reaches_threefold() {
        let mut board = Board::new();
        let shuffle = [("g1", "f3"), ("g8", "f6"), ("f3", "g1"), ("f6", "g8")];
        for _ in 0..2 {
            for (from, to) in shuffle {
                assert_eq!(board.status(), BoardStatus::Ongoing);
                board = board.play(sq(from), sq(to), None).unwrap();
            }
        }
        assert_eq!(board.status(), BoardStatus::ThreefoldRepetition);
    }

    #[test]
    fn invalid_fen() {
        assert!(matches!(
            Board::from_fen("not a fen"),
            Err(RulesError::InvalidFen(_))
        ));
    }
}
