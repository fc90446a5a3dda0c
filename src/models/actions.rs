use serde::{Deserialize, Serialize};

use crate::error::SessionError;
use crate::models::game_state::{GameOverReason, Move, PlayerColor};

/// Everything a player, or the clock observer, can do to a session
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum GameAction {
    #[serde(rename_all = "camelCase")]
    MoveMade {
        #[serde(rename = "move")]
        mv: Move,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        player_id: Option<String>,
    },
    RequestTakeback {
        player: PlayerColor,
    },
    #[serde(rename_all = "camelCase")]
    AcceptTakeback {
        accepting_player: PlayerColor,
    },
    #[serde(rename_all = "camelCase")]
    DeclineTakeback {
        declining_player: PlayerColor,
    },
    OfferDraw {
        player: PlayerColor,
    },
    AcceptDraw {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        player: Option<PlayerColor>,
    },
    DeclineDraw {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        player: Option<PlayerColor>,
    },
    PlayerResigned {
        player: PlayerColor,
    },
    GameOver {
        reason: GameOverReason,
    },
}

impl GameAction {
    pub fn move_made(mv: Move, player_id: Option<String>) -> Self {
        GameAction::MoveMade { mv, player_id }
    }

    pub fn game_over(reason: GameOverReason) -> Self {
        GameAction::GameOver { reason }
    }

    /// Short name matching the serialized `type` tag, for logging
    pub fn kind(&self) -> &'static str {
        match self {
            GameAction::MoveMade { .. } => "move-made",
            GameAction::RequestTakeback { .. } => "request-takeback",
            GameAction::AcceptTakeback { .. } => "accept-takeback",
            GameAction::DeclineTakeback { .. } => "decline-takeback",
            GameAction::OfferDraw { .. } => "offer-draw",
            GameAction::AcceptDraw { .. } => "accept-draw",
            GameAction::DeclineDraw { .. } => "decline-draw",
            GameAction::PlayerResigned { .. } => "player-resigned",
            GameAction::GameOver { .. } => "game-over",
        }
    }

    /// Rewrite a client-submitted action so it can only act for the sender's seat.
    ///
    /// Moves are stamped with the sender's identity, color-carrying actions must
    /// name the sender's own color, and draw responses are tagged with it so the
    /// reducer can refuse self-acceptance. `game-over` is reserved for the
    /// server's clock observer.
    pub fn bind_to_seat(self, seat: PlayerColor, player_id: &str) -> Result<Self, SessionError> {
        let check = |color: PlayerColor| {
            if color == seat {
                Ok(())
            } else {
                Err(SessionError::WrongSeat(color.as_str().to_string()))
            }
        };

        match self {
            GameAction::MoveMade { mv, .. } => Ok(GameAction::MoveMade {
                mv,
                player_id: Some(player_id.to_string()),
            }),
            GameAction::RequestTakeback { player }
            | GameAction::OfferDraw { player }
            | GameAction::PlayerResigned { player } => {
                check(player)?;
                Ok(self)
            }
            GameAction::AcceptTakeback { accepting_player } => {
                check(accepting_player)?;
                Ok(self)
            }
            GameAction::DeclineTakeback { declining_player } => {
                check(declining_player)?;
                Ok(self)
            }
            GameAction::AcceptDraw { player } => {
                if let Some(color) = player {
                    check(color)?;
                }
                Ok(GameAction::AcceptDraw { player: Some(seat) })
            }
            GameAction::DeclineDraw { player } => {
                if let Some(color) = player {
                    check(color)?;
                }
                Ok(GameAction::DeclineDraw { player: Some(seat) })
            }
            GameAction::GameOver { .. } => Err(SessionError::ReservedAction),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn move_made_uses_original_field_names() {
        let action = GameAction::move_made(Move::new("e2", "e4"), Some("alice".to_string()));
        let json = serde_json::to_value(&action).unwrap();
        assert_eq!(json["type"], "move-made");
        assert_eq!(json["move"]["source"], "e2");
        assert_eq!(json["playerId"], "alice");
    }

    #[test]
    fn parses_takeback_and_game_over_actions() {
        let accept: GameAction =
            serde_json::from_str(r#"{"type":"accept-takeback","acceptingPlayer":"black"}"#).unwrap();
        assert_eq!(
            accept,
            GameAction::AcceptTakeback {
                accepting_player: PlayerColor::Black
            }
        );

        let over: GameAction =
            serde_json::from_str(r#"{"type":"game-over","reason":"white-timeout"}"#).unwrap();
        assert_eq!(over, GameAction::game_over(GameOverReason::WhiteTimeout));

        let draw: GameAction = serde_json::from_str(r#"{"type":"accept-draw"}"#).unwrap();
        assert_eq!(draw, GameAction::AcceptDraw { player: None });
    }

    #[test]
    fn bind_stamps_moves_with_sender() {
        let action = GameAction::move_made(Move::new("e2", "e4"), Some("mallory".to_string()));
        let bound = action.bind_to_seat(PlayerColor::White, "alice").unwrap();
        assert_eq!(
            bound,
            GameAction::move_made(Move::new("e2", "e4"), Some("alice".to_string()))
        );
    }

    #[test]
    fn bind_refuses_acting_for_other_seat() {
        let action = GameAction::PlayerResigned {
            player: PlayerColor::Black,
        };
        assert_eq!(
            action.bind_to_seat(PlayerColor::White, "alice"),
            Err(SessionError::WrongSeat("black".to_string()))
        );
    }

    #[test]
    fn bind_tags_draw_responses_and_reserves_game_over() {
        let bound = GameAction::AcceptDraw { player: None }
            .bind_to_seat(PlayerColor::Black, "bob")
            .unwrap();
        assert_eq!(
            bound,
            GameAction::AcceptDraw {
                player: Some(PlayerColor::Black)
            }
        );

        let over = GameAction::game_over(GameOverReason::Checkmate);
        assert_eq!(
            over.bind_to_seat(PlayerColor::Black, "bob"),
            Err(SessionError::ReservedAction)
        );
    }
}
