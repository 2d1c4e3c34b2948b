//! Untimed single-player boards.
//!
//! The caller moves both sides; there are no seats, credentials or
//! clocks, and nobody else is told about the moves.

use shakmaty::Square;

use crate::error::SessionError;
use crate::messages::PracticeOutcome;
use crate::rules::{Board, Promotion};
use crate::session::GameResult;

#[derive(Debug, Clone)]
pub struct PracticeGame {
    board: Board,
    last_activity_ms: u64,
}

impl PracticeGame {
    pub fn new(now_ms: u64) -> Self {
        PracticeGame {
            board: Board::new(),
            last_activity_ms: now_ms,
        }
    }

    pub fn fen(&self) -> String {
        self.board.fen()
    }

    pub fn last_activity_ms(&self) -> u64 {
        self.last_activity_ms
    }

    pub fn result(&self) -> Option<GameResult> {
        GameResult::from_board(self.board.status())
    }

    pub fn play(
        &mut self,
        from: Square,
        to: Square,
        promotion: Option<Promotion>,
        now_ms: u64,
    ) -> Result<PracticeOutcome, SessionError> {
        if self.result().is_some() {
            return Err(SessionError::GameUnavailable);
        }
        self.board = self.board.play(from, to, promotion)?;
        self.last_activity_ms = now_ms;
        Ok(PracticeOutcome {
            fen: self.board.fen(),
            result: self.result(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color::Color;
    use crate::rules::parse_square;

    #[test]
    fn both_sides_move_until_mate() {
        let mut game = PracticeGame::new(0);
        let mut last = None;
        for (from, to) in [("f2", "f3"), ("e7", "e5"), ("g2", "g4"), ("d8", "h4")] {
            last = Some(
                game.play(parse_square(from).unwrap(), parse_square(to).unwrap(), None, 5)
                    .unwrap(),
            );
        }
        let last = last.unwrap();
        assert_eq!(last.result, Some(GameResult::Checkmate { winner: Color::Black }));
        assert_eq!(game.last_activity_ms(), 5);

        let err = game
            .play(parse_square("e2").unwrap(), parse_square("e4").unwrap(), None, 6)
            .unwrap_err();
        assert_eq!(err, SessionError::GameUnavailable);
    }
}
