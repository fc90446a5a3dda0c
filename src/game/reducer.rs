use chrono::{DateTime, Utc};
use log::{debug, info};
use std::collections::VecDeque;

use crate::error::RulesError;
use crate::game::rules::{RulesEngine, StandardRules};
use crate::models::{GameAction, GameOverReason, GameStatus, Move, PlayerColor, SessionState, TimeControl};

/// The session transition function, parameterized over the rules engine.
///
/// Every call applies exactly one action and returns the follow-up actions the
/// caller must feed back in, in order. Invalid actions never fail: they leave
/// the state untouched and emit nothing.
#[derive(Debug, Clone, Default)]
pub struct Reducer<R = StandardRules> {
    rules: R,
}

impl Reducer<StandardRules> {
    pub fn standard() -> Self {
        Self::new(StandardRules)
    }
}

impl<R: RulesEngine> Reducer<R> {
    pub fn new(rules: R) -> Self {
        Self { rules }
    }

    pub fn rules(&self) -> &R {
        &self.rules
    }

    /// Fresh session for this engine's variant and starting position
    pub fn new_session(&self, time_control: TimeControl) -> Result<SessionState, RulesError> {
        self.session_from_position(time_control, self.rules.initial_position())
    }

    /// Session starting from a custom position.
    ///
    /// Turn ownership follows move parity, so the position must have white to move.
    pub fn session_from_position(
        &self,
        time_control: TimeControl,
        position: impl Into<String>,
    ) -> Result<SessionState, RulesError> {
        let position = position.into();
        if self.rules.side_to_move(&position)? != PlayerColor::White {
            return Err(RulesError::NotWhiteToMove(position));
        }
        Ok(SessionState::from_position(self.rules.variant(), time_control, position))
    }

    pub fn apply(&self, state: SessionState, action: &GameAction) -> (SessionState, Vec<GameAction>) {
        self.apply_at(state, action, Utc::now())
    }

    /// Apply one action with `now` as the wall-clock time
    pub fn apply_at(
        &self,
        mut state: SessionState,
        action: &GameAction,
        now: DateTime<Utc>,
    ) -> (SessionState, Vec<GameAction>) {
        let mut emitted = Vec::new();

        match action {
            GameAction::MoveMade { mv, player_id } => {
                self.move_made(&mut state, mv, player_id.as_deref(), now, &mut emitted);
            }
            GameAction::RequestTakeback { player } => request_takeback(&mut state, *player),
            GameAction::AcceptTakeback { accepting_player } => {
                accept_takeback(&mut state, *accepting_player)
            }
            GameAction::DeclineTakeback { declining_player } => {
                state.takeback_request.take(declining_player.opposite());
            }
            GameAction::OfferDraw { player } => {
                if state.status == GameStatus::InProgress {
                    state.draw_offer = Some(*player);
                } else {
                    debug!("Ignoring draw offer from {}: game not in progress", player.as_str());
                }
            }
            GameAction::AcceptDraw { player } => {
                if let Some(offered_by) = state.draw_offer {
                    if *player == Some(offered_by) {
                        debug!("Ignoring {} accepting their own draw offer", offered_by.as_str());
                    } else {
                        emitted.push(GameAction::game_over(GameOverReason::DrawAgreed));
                    }
                }
            }
            GameAction::DeclineDraw { player } => {
                if state.draw_offer.is_some() && *player != state.draw_offer {
                    state.draw_offer = None;
                }
            }
            GameAction::PlayerResigned { player } => {
                emitted.push(GameAction::game_over(GameOverReason::resignation(*player)));
            }
            GameAction::GameOver { reason } => {
                if state.status != GameStatus::Complete {
                    info!("Game over: {:?} after {} moves", reason, state.moves.len());
                    state.status = GameStatus::Complete;
                    state.game_over_reason = Some(*reason);
                    state.completed_at = Some(now);
                    state.draw_offer = None;
                    state.takeback_request = Default::default();
                }
            }
        }

        (state, emitted)
    }

    /// Apply `action` and drain every emitted action, in emission order.
    ///
    /// Returns the final state and the log of every action applied, starting
    /// with `action` itself.
    pub fn dispatch(
        &self,
        state: SessionState,
        action: GameAction,
        now: DateTime<Utc>,
    ) -> (SessionState, Vec<GameAction>) {
        let mut state = state;
        let mut applied = Vec::new();
        let mut queue = VecDeque::from([action]);

        while let Some(next) = queue.pop_front() {
            let (new_state, emitted) = self.apply_at(state, &next, now);
            state = new_state;
            applied.push(next);
            queue.extend(emitted);
        }

        (state, applied)
    }

    fn move_made(
        &self,
        state: &mut SessionState,
        mv: &Move,
        player_id: Option<&str>,
        now: DateTime<Utc>,
        emitted: &mut Vec<GameAction>,
    ) {
        if !state.players.both_seated() {
            debug!("Ignoring move {}-{}: seats not filled", mv.source, mv.target);
            return;
        }

        let mover = state.side_to_move();
        if let Some(id) = player_id {
            if state.players.get(mover) != Some(id) {
                debug!("Ignoring move from {}: it is {}'s turn", id, mover.as_str());
                return;
            }
        }

        let Some(board) = state.current_board() else {
            debug!("Ignoring move {}-{}: session has no position", mv.source, mv.target);
            return;
        };
        match self.rules.side_to_move(board) {
            Ok(color) if color == mover => {}
            Ok(color) => {
                debug!("Ignoring move: position has {} to move, history has {}", color.as_str(), mover.as_str());
                return;
            }
            Err(e) => {
                debug!("Ignoring move: {}", e);
                return;
            }
        }

        let applied = match self.rules.validate_and_apply(board, mv) {
            Ok(applied) => applied,
            Err(e) => {
                debug!("Ignoring move: {}", e);
                return;
            }
        };

        let status = if state.status == GameStatus::Waiting && state.moves.is_empty() {
            GameStatus::InProgress
        } else {
            state.status
        };
        if status != GameStatus::InProgress {
            debug!("Ignoring move {}-{}: game is {:?}", mv.source, mv.target, status);
            return;
        }

        state.status = status;
        state.move_times.push(now);
        state.moves.push(mv.clone());
        state.moves_with_notation.push(applied.notation);
        state.boards.push(applied.position);

        if let Some(reason) = self.rules.terminal_conditions(&state.boards).reason() {
            emitted.push(GameAction::game_over(reason));
        }
    }
}

fn request_takeback(state: &mut SessionState, player: PlayerColor) {
    if state.status != GameStatus::InProgress {
        return;
    }

    let played = state.moves.len();
    if played == 0 {
        return;
    }

    let target = if PlayerColor::for_ply(played - 1) == player {
        played - 1
    } else if played >= 2 {
        played - 2
    } else {
        return;
    };

    state.takeback_request.set(player, target);
}

fn accept_takeback(state: &mut SessionState, accepting: PlayerColor) {
    let Some(target) = state.takeback_request.take(accepting.opposite()) else {
        return;
    };
    if target > state.moves.len() {
        debug!("Dropping stale takeback to move {}", target);
        return;
    }

    state.moves.truncate(target);
    state.moves_with_notation.truncate(target);
    state.move_times.truncate(target);
    state.boards.truncate(target + 1);

    // The acceptor's own request may now point past the end of the game
    if state
        .takeback_request
        .get(accepting)
        .is_some_and(|own| own > state.moves.len())
    {
        state.takeback_request.take(accepting);
    }
}

/// Apply one action with the standard rules at the current time
pub fn apply(state: SessionState, action: &GameAction) -> (SessionState, Vec<GameAction>) {
    Reducer::standard().apply(state, action)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{create_game, PlayerOrdering};
    use chrono::TimeZone;

    fn at(second: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, second).unwrap()
    }

    fn seated() -> SessionState {
        create_game(TimeControl::default(), "alice", "bob", PlayerOrdering::CreatorFirst)
    }

    fn play(state: SessionState, moves: &[(&str, &str)]) -> SessionState {
        let reducer = Reducer::standard();
        moves.iter().fold(state, |state, (from, to)| {
            let (state, _) = reducer.apply_at(state, &GameAction::move_made(Move::new(*from, *to), None), at(0));
            state
        })
    }

    #[test]
    fn illegal_move_is_a_silent_no_op() {
        let state = seated();
        let (next, emitted) = Reducer::standard().apply_at(
            state.clone(),
            &GameAction::move_made(Move::new("e2", "e5"), None),
            at(1),
        );
        assert_eq!(next, state);
        assert!(emitted.is_empty());
    }

    const BLACK_TO_MOVE: &str = "rnbqkbnr/pppppppp/8/8/4P3/8/PPPP1PPP/RNBQKBNR b KQkq - 0 1";

    #[test]
    fn custom_start_must_have_white_to_move() {
        let reducer = Reducer::standard();
        assert_eq!(
            reducer.session_from_position(TimeControl::default(), BLACK_TO_MOVE),
            Err(RulesError::NotWhiteToMove(BLACK_TO_MOVE.to_string()))
        );
        assert!(matches!(
            reducer.session_from_position(TimeControl::default(), "not a position"),
            Err(RulesError::InvalidPosition(_))
        ));

        let state = reducer.new_session(TimeControl::default()).unwrap();
        assert_eq!(state.boards, vec![crate::models::STARTING_POSITION.to_string()]);
    }

    #[test]
    fn record_with_black_to_move_refuses_both_players() {
        let mut state = seated();
        state.boards[0] = BLACK_TO_MOVE.to_string();
        let reducer = Reducer::standard();

        for player in ["alice", "bob"] {
            let action = GameAction::move_made(Move::new("e7", "e5"), Some(player.to_string()));
            let (next, emitted) = reducer.apply_at(state.clone(), &action, at(1));
            assert_eq!(next, state);
            assert!(emitted.is_empty());
        }
    }

    #[test]
    fn record_without_boards_ignores_moves() {
        let mut state = seated();
        state.boards.clear();
        let (next, emitted) = Reducer::standard().apply_at(
            state.clone(),
            &GameAction::move_made(Move::new("e2", "e4"), None),
            at(1),
        );
        assert_eq!(next, state);
        assert!(emitted.is_empty());
    }

    #[test]
    fn first_move_starts_the_game() {
        let (state, emitted) = Reducer::standard().apply_at(
            seated(),
            &GameAction::move_made(Move::new("e2", "e4"), Some("alice".to_string())),
            at(1),
        );
        assert!(emitted.is_empty());
        assert_eq!(state.status, GameStatus::InProgress);
        assert_eq!(state.boards.len(), 2);
        assert_eq!(state.moves_with_notation, vec!["e4"]);
        assert_eq!(state.move_times, vec![at(1)]);
    }

    #[test]
    fn wrong_player_cannot_move() {
        let state = seated();
        let (next, _) = Reducer::standard().apply_at(
            state.clone(),
            &GameAction::move_made(Move::new("e2", "e4"), Some("bob".to_string())),
            at(1),
        );
        assert_eq!(next, state);
    }

    #[test]
    fn no_moves_after_completion() {
        let reducer = Reducer::standard();
        let state = play(seated(), &[("e2", "e4")]);
        let (state, _) = reducer.dispatch(
            state,
            GameAction::PlayerResigned {
                player: PlayerColor::Black,
            },
            at(2),
        );
        let (next, emitted) =
            reducer.apply_at(state.clone(), &GameAction::move_made(Move::new("e7", "e5"), None), at(3));
        assert_eq!(next, state);
        assert!(emitted.is_empty());
    }

    #[test]
    fn resigning_before_any_move_does_not_reopen_the_game() {
        let reducer = Reducer::standard();
        let (state, _) = reducer.dispatch(
            seated(),
            GameAction::PlayerResigned {
                player: PlayerColor::White,
            },
            at(1),
        );
        assert_eq!(state.status, GameStatus::Complete);

        let (next, _) =
            reducer.apply_at(state.clone(), &GameAction::move_made(Move::new("e2", "e4"), None), at(2));
        assert_eq!(next.status, GameStatus::Complete);
        assert!(next.moves.is_empty());
    }

    #[test]
    fn takeback_target_depends_on_who_asks() {
        let reducer = Reducer::standard();
        let state = play(seated(), &[("e2", "e4"), ("e7", "e5"), ("g1", "f3")]);

        let (state, _) = reducer.apply_at(
            state,
            &GameAction::RequestTakeback {
                player: PlayerColor::White,
            },
            at(1),
        );
        assert_eq!(state.takeback_request.white, Some(2));

        let (state, _) = reducer.apply_at(
            state,
            &GameAction::RequestTakeback {
                player: PlayerColor::Black,
            },
            at(1),
        );
        assert_eq!(state.takeback_request.black, Some(1));
    }

    #[test]
    fn takeback_needs_two_moves_when_requester_is_to_move() {
        let state = play(seated(), &[("e2", "e4")]);
        let (next, _) = Reducer::standard().apply_at(
            state.clone(),
            &GameAction::RequestTakeback {
                player: PlayerColor::Black,
            },
            at(1),
        );
        assert_eq!(next, state);
    }

    #[test]
    fn accepting_one_takeback_drops_the_others_stale_target() {
        let reducer = Reducer::standard();
        let mut state = play(seated(), &[("e2", "e4"), ("e7", "e5"), ("g1", "f3")]);
        state.takeback_request.white = Some(2);
        state.takeback_request.black = Some(3);

        let (state, _) = reducer.apply_at(
            state,
            &GameAction::AcceptTakeback {
                accepting_player: PlayerColor::Black,
            },
            at(1),
        );
        assert_eq!(state.moves.len(), 2);
        assert_eq!(state.takeback_request, Default::default());
    }

    #[test]
    fn draw_offer_cannot_be_accepted_by_the_offerer() {
        let reducer = Reducer::standard();
        let state = play(seated(), &[("e2", "e4")]);
        let (state, _) = reducer.apply_at(
            state,
            &GameAction::OfferDraw {
                player: PlayerColor::White,
            },
            at(1),
        );

        let (_, emitted) = reducer.apply_at(
            state.clone(),
            &GameAction::AcceptDraw {
                player: Some(PlayerColor::White),
            },
            at(2),
        );
        assert!(emitted.is_empty());

        let (_, emitted) = reducer.apply_at(
            state,
            &GameAction::AcceptDraw {
                player: Some(PlayerColor::Black),
            },
            at(2),
        );
        assert_eq!(emitted, vec![GameAction::game_over(GameOverReason::DrawAgreed)]);
    }

    #[test]
    fn game_over_clears_pending_negotiations() {
        let reducer = Reducer::standard();
        let mut state = play(seated(), &[("e2", "e4"), ("e7", "e5")]);
        state.draw_offer = Some(PlayerColor::Black);
        state.takeback_request.black = Some(1);

        let (state, _) = reducer.apply_at(
            state,
            &GameAction::game_over(GameOverReason::WhiteTimeout),
            at(9),
        );
        assert_eq!(state.game_over_reason, Some(GameOverReason::WhiteTimeout));
        assert_eq!(state.completed_at, Some(at(9)));
        assert_eq!(state.draw_offer, None);
        assert!(!state.takeback_request.is_pending());
    }

    #[test]
    fn dispatch_logs_cascade_in_order() {
        let reducer = Reducer::standard();
        let state = play(seated(), &[("e2", "e4")]);
        let (state, applied) = reducer.dispatch(
            state,
            GameAction::PlayerResigned {
                player: PlayerColor::Black,
            },
            at(5),
        );
        assert_eq!(
            applied,
            vec![
                GameAction::PlayerResigned {
                    player: PlayerColor::Black
                },
                GameAction::game_over(GameOverReason::BlackResignation),
            ]
        );
        assert_eq!(state.status, GameStatus::Complete);
    }
}
