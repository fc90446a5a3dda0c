use crate::models::{GameAction, Move, SessionState};

/// Read-only view into a session's past positions.
///
/// A cursor either follows the live position or is parked on a board index.
/// Moves are only produced while it shows the live position; see [`HistoryCursor::move_action`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HistoryCursor {
    parked: Option<usize>,
}

impl HistoryCursor {
    pub fn live() -> Self {
        Self::default()
    }

    /// Board index the cursor shows, clamped to the session's history
    pub fn index(&self, state: &SessionState) -> usize {
        let latest = state.boards.len().saturating_sub(1);
        self.parked.map_or(latest, |index| index.min(latest))
    }

    pub fn board<'a>(&self, state: &'a SessionState) -> Option<&'a str> {
        state.boards.get(self.index(state)).map(String::as_str)
    }

    /// The move that produced the shown position
    pub fn last_move<'a>(&self, state: &'a SessionState) -> Option<&'a Move> {
        let index = self.index(state);
        index.checked_sub(1).and_then(|ply| state.moves.get(ply))
    }

    pub fn is_on_most_recent_state(&self, state: &SessionState) -> bool {
        self.index(state) + 1 >= state.boards.len()
    }

    /// A `move-made` for `mv`, or `None` while parked on an earlier position
    pub fn move_action(&self, state: &SessionState, mv: Move, player_id: Option<String>) -> Option<GameAction> {
        self.is_on_most_recent_state(state)
            .then(|| GameAction::move_made(mv, player_id))
    }

    /// Show the position right after `ply` (zero-based); selecting the latest move resumes following
    pub fn select_move(&mut self, state: &SessionState, ply: usize) {
        self.jump(state, ply + 1);
    }

    pub fn step_back(&mut self, state: &SessionState) {
        let index = self.index(state);
        self.jump(state, index.saturating_sub(1));
    }

    pub fn step_forward(&mut self, state: &SessionState) {
        let index = self.index(state);
        self.jump(state, index + 1);
    }

    pub fn follow_live(&mut self) {
        self.parked = None;
    }

    fn jump(&mut self, state: &SessionState, index: usize) {
        let latest = state.boards.len().saturating_sub(1);
        self.parked = if index >= latest { None } else { Some(index) };
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::reducer::Reducer;
    use crate::models::{create_game, PlayerOrdering, TimeControl};

    fn three_moves() -> SessionState {
        let reducer = Reducer::standard();
        let mut state = create_game(TimeControl::default(), "alice", "bob", PlayerOrdering::CreatorFirst);
        for (from, to) in [("e2", "e4"), ("e7", "e5"), ("g1", "f3")] {
            state = reducer.apply(state, &GameAction::move_made(Move::new(from, to), None)).0;
        }
        state
    }

    #[test]
    fn live_cursor_follows_new_moves() {
        let state = three_moves();
        let cursor = HistoryCursor::live();
        assert_eq!(cursor.index(&state), 3);
        assert!(cursor.is_on_most_recent_state(&state));
        assert_eq!(cursor.last_move(&state), Some(&Move::new("g1", "f3")));
    }

    #[test]
    fn parked_cursor_is_not_live() {
        let state = three_moves();
        let mut cursor = HistoryCursor::live();
        cursor.select_move(&state, 0);
        assert_eq!(cursor.board(&state), Some(state.boards[1].as_str()));
        assert!(!cursor.is_on_most_recent_state(&state));

        cursor.step_back(&state);
        assert_eq!(cursor.index(&state), 0);
        assert_eq!(cursor.last_move(&state), None);

        cursor.step_forward(&state);
        cursor.step_forward(&state);
        cursor.step_forward(&state);
        assert!(cursor.is_on_most_recent_state(&state));
        assert_eq!(cursor, HistoryCursor::live());
    }

    #[test]
    fn parked_index_is_clamped_after_takeback() {
        let mut state = three_moves();
        let mut cursor = HistoryCursor::live();
        cursor.select_move(&state, 1);
        state.boards.truncate(2);
        state.moves.truncate(1);
        assert_eq!(cursor.index(&state), 1);
        assert!(cursor.is_on_most_recent_state(&state));
    }

    #[test]
    fn moves_only_leave_a_live_cursor() {
        let state = three_moves();
        let mut cursor = HistoryCursor::live();
        let mv = Move::new("b8", "c6");

        assert_eq!(
            cursor.move_action(&state, mv.clone(), Some("bob".to_string())),
            Some(GameAction::move_made(mv.clone(), Some("bob".to_string())))
        );

        cursor.select_move(&state, 1);
        assert_eq!(cursor.move_action(&state, mv.clone(), None), None);

        cursor.follow_live();
        assert!(cursor.move_action(&state, mv, None).is_some());
    }
}
