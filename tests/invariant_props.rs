//! Random action sequences must never break the session invariants

use chess::{Board, MoveGen};
use chess_session::game::Reducer;
use chess_session::models::{
    create_game, GameAction, GameOverReason, GameStatus, Move, PlayerColor, PlayerOrdering,
    SessionState, TimeControl,
};
use chrono::{DateTime, Duration, TimeZone, Utc};
use proptest::prelude::*;
use std::str::FromStr;

#[derive(Debug, Clone)]
enum Step {
    /// Pick the n-th legal move, optionally claiming to be a given seat
    Play(usize, Option<PlayerColor>),
    /// A king leap that is illegal in nearly every position
    Junk,
    RequestTakeback(PlayerColor),
    AcceptTakeback(PlayerColor),
    DeclineTakeback(PlayerColor),
    OfferDraw(PlayerColor),
    AcceptDraw(Option<PlayerColor>),
    DeclineDraw(Option<PlayerColor>),
    Resign(PlayerColor),
    Timeout(PlayerColor),
}

fn color() -> impl Strategy<Value = PlayerColor> {
    prop_oneof![Just(PlayerColor::White), Just(PlayerColor::Black)]
}

fn step() -> impl Strategy<Value = Step> {
    prop_oneof![
        12 => (any::<usize>(), proptest::option::of(color())).prop_map(|(n, c)| Step::Play(n, c)),
        1 => Just(Step::Junk),
        2 => color().prop_map(Step::RequestTakeback),
        2 => color().prop_map(Step::AcceptTakeback),
        1 => color().prop_map(Step::DeclineTakeback),
        1 => color().prop_map(Step::OfferDraw),
        1 => proptest::option::of(color()).prop_map(Step::AcceptDraw),
        1 => proptest::option::of(color()).prop_map(Step::DeclineDraw),
        1 => color().prop_map(Step::Resign),
        1 => color().prop_map(Step::Timeout),
    ]
}

fn to_action(state: &SessionState, step: &Step) -> GameAction {
    match step {
        Step::Play(n, claimed) => {
            let fen = state.current_board().expect("history is never empty");
            let board = Board::from_str(fen).expect("reducer stores valid FEN");
            let legal: Vec<_> = MoveGen::new_legal(&board).collect();
            let mv = if legal.is_empty() {
                Move::new("a1", "a1")
            } else {
                let chosen = legal[n % legal.len()];
                Move::new(chosen.get_source().to_string(), chosen.get_dest().to_string())
            };
            let player_id = claimed.map(|c| match c {
                PlayerColor::White => "w".to_string(),
                PlayerColor::Black => "b".to_string(),
            });
            GameAction::move_made(mv, player_id)
        }
        Step::Junk => GameAction::move_made(Move::new("e1", "e8"), None),
        Step::RequestTakeback(c) => GameAction::RequestTakeback { player: *c },
        Step::AcceptTakeback(c) => GameAction::AcceptTakeback { accepting_player: *c },
        Step::DeclineTakeback(c) => GameAction::DeclineTakeback { declining_player: *c },
        Step::OfferDraw(c) => GameAction::OfferDraw { player: *c },
        Step::AcceptDraw(c) => GameAction::AcceptDraw { player: *c },
        Step::DeclineDraw(c) => GameAction::DeclineDraw { player: *c },
        Step::Resign(c) => GameAction::PlayerResigned { player: *c },
        Step::Timeout(c) => GameAction::game_over(GameOverReason::timeout(*c)),
    }
}

fn rank(status: GameStatus) -> u8 {
    match status {
        GameStatus::Waiting => 0,
        GameStatus::InProgress => 1,
        GameStatus::Complete => 2,
    }
}

fn check_invariants(before: &SessionState, after: &SessionState) -> Result<(), TestCaseError> {
    prop_assert_eq!(after.boards.len(), after.moves.len() + 1);
    prop_assert_eq!(after.moves_with_notation.len(), after.moves.len());
    prop_assert_eq!(after.move_times.len(), after.moves.len());

    prop_assert!(rank(after.status) >= rank(before.status));
    let complete = after.status == GameStatus::Complete;
    prop_assert_eq!(after.game_over_reason.is_some(), complete);
    prop_assert_eq!(after.completed_at.is_some(), complete);
    if before.status == GameStatus::Complete {
        prop_assert_eq!(after.game_over_reason, before.game_over_reason);
        prop_assert_eq!(after.completed_at, before.completed_at);
    }

    for color in [PlayerColor::White, PlayerColor::Black] {
        if let Some(target) = after.takeback_request.get(color) {
            prop_assert!(target <= after.moves.len());
        }
    }
    if let Some(offered_by) = after.draw_offer {
        prop_assert!(after.players.get(offered_by).is_some());
    }
    Ok(())
}

fn t(seconds: i64) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap() + Duration::seconds(seconds)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn prop_random_sequences_keep_invariants(steps in proptest::collection::vec(step(), 1..60)) {
        let reducer = Reducer::standard();
        let mut state = create_game(TimeControl::default(), "w", "b", PlayerOrdering::CreatorFirst);

        for (i, step) in steps.iter().enumerate() {
            let action = to_action(&state, step);
            let (next, applied) = reducer.dispatch(state.clone(), action, t(i as i64));
            prop_assert!(!applied.is_empty());
            check_invariants(&state, &next)?;
            state = next;
        }
    }

    #[test]
    fn prop_game_over_twice_equals_once(
        steps in proptest::collection::vec(step(), 0..30),
        loser in color(),
    ) {
        let reducer = Reducer::standard();
        let mut state = create_game(TimeControl::default(), "w", "b", PlayerOrdering::CreatorFirst);
        for (i, step) in steps.iter().enumerate() {
            let action = to_action(&state, step);
            state = reducer.dispatch(state, action, t(i as i64)).0;
        }

        let over = GameAction::game_over(GameOverReason::timeout(loser));
        let (once, _) = reducer.apply_at(state, &over, t(100));
        let (twice, emitted) = reducer.apply_at(once.clone(), &over, t(200));
        prop_assert_eq!(once, twice);
        prop_assert!(emitted.is_empty());
    }
}
