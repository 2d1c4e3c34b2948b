//! Input validation for request bodies.
//!
//! Every wire field is checked here before anything reaches the session
//! core. Failures map to HTTP 400 in the server.

use std::sync::LazyLock;

use regex::Regex;
use thiserror::Error;

use chess_core::{parse_square, Color, GameId, MoveRequest, Promotion, Square, TimeControl};

use crate::wire_types::{CreateGameRequest, JoinGameRequest, MoveRequestBody, PracticeMoveRequest};

static GAME_ID_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Z0-9]{6}$").expect("valid regex"));
static SQUARE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-h][1-8]$").expect("valid regex"));
static NAME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[\p{L}\p{N} _-]{1,30}$").expect("valid regex"));
static TOKEN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Fa-f0-9]{20,128}$").expect("valid regex"));

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("malformed request body: {0}")]
    Body(String),

    #[error("invalid game id")]
    GameId,

    #[error("invalid square: {0}")]
    Square(String),

    #[error("invalid player name")]
    PlayerName,

    #[error("invalid player color")]
    Color,

    #[error("invalid auth token")]
    AuthToken,

    #[error("invalid promotion piece")]
    Promotion,

    #[error(
        "invalid time control: minutes must be {}-{}, increment 0-{}",
        TimeControl::MIN_MINUTES,
        TimeControl::MAX_MINUTES,
        TimeControl::MAX_INCREMENT_SECS
    )]
    TimeControl,
}

pub fn game_id(s: &str) -> Result<GameId, ValidationError> {
    if !GAME_ID_RE.is_match(s) {
        return Err(ValidationError::GameId);
    }
    GameId::parse(s).ok_or(ValidationError::GameId)
}

pub fn square(s: &str) -> Result<Square, ValidationError> {
    if !SQUARE_RE.is_match(s) {
        return Err(ValidationError::Square(s.to_string()));
    }
    parse_square(s).map_err(|_| ValidationError::Square(s.to_string()))
}

/// Trimmed display name: 1-30 letters, digits, spaces, `_` or `-`.
pub fn player_name(s: &str) -> Result<String, ValidationError> {
    let name = s.trim();
    if !NAME_RE.is_match(name) {
        return Err(ValidationError::PlayerName);
    }
    Ok(name.to_string())
}

pub fn color(s: &str) -> Result<Color, ValidationError> {
    Color::from_wire(s).ok_or(ValidationError::Color)
}

pub fn auth_token(s: &str) -> Result<&str, ValidationError> {
    if TOKEN_RE.is_match(s) {
        Ok(s)
    } else {
        Err(ValidationError::AuthToken)
    }
}

pub fn promotion(s: Option<&str>) -> Result<Option<Promotion>, ValidationError> {
    match s {
        None => Ok(None),
        Some(s) => {
            let mut chars = s.chars();
            match (chars.next(), chars.next()) {
                (Some(c), None) => Promotion::from_char(c.to_ascii_lowercase())
                    .map(Some)
                    .ok_or(ValidationError::Promotion),
                _ => Err(ValidationError::Promotion),
            }
        }
    }
}

pub fn time_control(req: &CreateGameRequest) -> Result<TimeControl, ValidationError> {
    let tc = TimeControl::from_optional(req.minutes, req.increment);
    if tc.is_within_limits() {
        Ok(tc)
    } else {
        Err(ValidationError::TimeControl)
    }
}

pub fn join_request(req: &JoinGameRequest) -> Result<(GameId, String), ValidationError> {
    Ok((game_id(&req.game_id)?, player_name(&req.player_name)?))
}

pub fn move_request(req: &MoveRequestBody) -> Result<(GameId, MoveRequest), ValidationError> {
    let id = game_id(&req.game_id)?;
    let request = MoveRequest {
        credential: auth_token(&req.auth_token)?.to_string(),
        color: color(&req.player_color)?,
        from: square(&req.from)?,
        to: square(&req.to)?,
        promotion: promotion(req.promotion.as_deref())?,
    };
    Ok((id, request))
}

pub fn practice_move(
    req: &PracticeMoveRequest,
) -> Result<(Option<GameId>, Square, Square, Option<Promotion>), ValidationError> {
    Ok((
        req.game_id.as_deref().map(game_id).transpose()?,
        square(&req.from)?,
        square(&req.to)?,
        promotion(req.promotion.as_deref())?,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn move_body() -> MoveRequestBody {
        MoveRequestBody {
            game_id: "A1B2C3".into(),
            from: "e2".into(),
            to: "e4".into(),
            player_color: "w".into(),
            auth_token: "0123456789abcdef0123456789abcdef".into(),
            promotion: None,
        }
    }

    #[test]
    fn game_ids() {
        assert!(game_id("A1B2C3").is_ok());
        assert_eq!(game_id("a1b2c3"), Err(ValidationError::GameId));
        assert_eq!(game_id("A1B2C"), Err(ValidationError::GameId));
        assert_eq!(game_id("A1B2C3D"), Err(ValidationError::GameId));
        assert_eq!(game_id(""), Err(ValidationError::GameId));
    }

    #[test]
    fn squares() {
        assert!(square("a1").is_ok());
        assert!(square("h8").is_ok());
        assert!(square("i1").is_err());
        assert!(square("a9").is_err());
        assert!(square("E2").is_err());
        assert!(square("e2 ").is_err());
    }

    #[test]
    fn names() {
        assert_eq!(player_name("  Alice_B-1 ").unwrap(), "Alice_B-1");
        assert_eq!(player_name("Иван").unwrap(), "Иван");
        assert!(player_name("").is_err());
        assert!(player_name("   ").is_err());
        assert!(player_name(&"x".repeat(31)).is_err());
        assert!(player_name(&"x".repeat(30)).is_ok());
        assert!(player_name("<script>").is_err());
    }

    #[test]
    fn colors_and_tokens() {
        assert_eq!(color("w"), Ok(Color::White));
        assert_eq!(color("b"), Ok(Color::Black));
        assert!(color("white").is_err());
        assert!(auth_token("abc").is_err());
        assert!(auth_token(&"g".repeat(32)).is_err());
        assert!(auth_token(&"a".repeat(129)).is_err());
    }

    #[test]
    fn promotions() {
        assert_eq!(promotion(None), Ok(None));
        assert_eq!(promotion(Some("n")), Ok(Some(Promotion::Knight)));
        assert_eq!(promotion(Some("Q")), Ok(Some(Promotion::Queen)));
        assert!(promotion(Some("k")).is_err());
        assert!(promotion(Some("qq")).is_err());
        assert!(promotion(Some("")).is_err());
    }

    #[test]
    fn time_controls() {
        let default = time_control(&CreateGameRequest::default()).unwrap();
        assert_eq!(default, TimeControl::default());

        let ok = CreateGameRequest { minutes: Some(180), increment: Some(60) };
        assert!(time_control(&ok).is_ok());

        let zero = CreateGameRequest { minutes: Some(0), increment: None };
        assert_eq!(time_control(&zero), Err(ValidationError::TimeControl));

        let long = CreateGameRequest { minutes: Some(181), increment: None };
        assert!(time_control(&long).is_err());

        let inc = CreateGameRequest { minutes: None, increment: Some(61) };
        assert!(time_control(&inc).is_err());
    }

    #[test]
    fn full_move_request() {
        let (id, req) = move_request(&move_body()).unwrap();
        assert_eq!(id.as_str(), "A1B2C3");
        assert_eq!(req.color, Color::White);
        assert_eq!(req.from.to_string(), "e2");
        assert_eq!(req.promotion, None);

        let mut bad = move_body();
        bad.player_color = "x".into();
        assert_eq!(move_request(&bad).unwrap_err(), ValidationError::Color);

        let mut bad = move_body();
        bad.to = "z9".into();
        assert!(matches!(move_request(&bad), Err(ValidationError::Square(_))));
    }

    #[test]
    fn practice_game_id_is_optional() {
        let req: PracticeMoveRequest = serde_json::from_str(r#"{"from":"e2","to":"e4"}"#).unwrap();
        let (id, from, to, promo) = practice_move(&req).unwrap();
        assert_eq!(id, None);
        assert_eq!(from.to_string(), "e2");
        assert_eq!(to.to_string(), "e4");
        assert_eq!(promo, None);

        let keyed = PracticeMoveRequest { game_id: Some("A1B2C3".into()), ..req.clone() };
        assert_eq!(practice_move(&keyed).unwrap().0.unwrap().as_str(), "A1B2C3");

        let bad = PracticeMoveRequest { game_id: Some("nope".into()), ..req };
        assert_eq!(practice_move(&bad).unwrap_err(), ValidationError::GameId);
    }
}
