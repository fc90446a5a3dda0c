use chess::{Board, BoardStatus, ChessMove, Color, MoveGen, Piece, Rank, Square};
use log::debug;
use std::str::FromStr;

use crate::error::RulesError;
use crate::models::{GameOverReason, GameVariant, Move, PlayerColor, PromotionPiece, STARTING_POSITION};

/// Result of a move the rules engine accepted
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppliedMove {
    /// Standard algebraic notation, e.g. `Nbd2`, `exd5`, `O-O`, `Qh4#`
    pub notation: String,
    /// Position encoding after the move
    pub position: String,
}

/// Terminal conditions of a position
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TerminalConditions {
    pub checkmate: bool,
    pub stalemate: bool,
    pub insufficient_material: bool,
    pub threefold_repetition: bool,
}

impl TerminalConditions {
    /// The single reason a position ends the game, checked in priority order
    pub fn reason(&self) -> Option<GameOverReason> {
        if self.checkmate {
            Some(GameOverReason::Checkmate)
        } else if self.stalemate {
            Some(GameOverReason::Stalemate)
        } else if self.insufficient_material {
            Some(GameOverReason::InsufficientMaterial)
        } else if self.threefold_repetition {
            Some(GameOverReason::ThreefoldRepetition)
        } else {
            None
        }
    }

    pub fn is_game_over(&self) -> bool {
        self.reason().is_some()
    }
}

/// Capability interface the reducer uses to judge moves.
///
/// Implementations must not panic on malformed input; every failure is a
/// `RulesError`.
pub trait RulesEngine {
    fn variant(&self) -> GameVariant;

    fn initial_position(&self) -> String;

    /// The color due to move in `position`
    fn side_to_move(&self, position: &str) -> Result<PlayerColor, RulesError>;

    /// Validate `mv` against `position` and return its notation and the resulting position
    fn validate_and_apply(&self, position: &str, mv: &Move) -> Result<AppliedMove, RulesError>;

    /// Terminal conditions of the last entry of `positions`. Earlier entries are
    /// the game's history, oldest first.
    fn terminal_conditions(&self, positions: &[String]) -> TerminalConditions;
}

/// Standard chess rules on top of the `chess` crate. Positions are FEN strings.
#[derive(Debug, Clone, Copy, Default)]
pub struct StandardRules;

impl RulesEngine for StandardRules {
    fn variant(&self) -> GameVariant {
        GameVariant::Standard
    }

    fn initial_position(&self) -> String {
        STARTING_POSITION.to_string()
    }

    fn side_to_move(&self, position: &str) -> Result<PlayerColor, RulesError> {
        Ok(match parse_board(position)?.side_to_move() {
            Color::White => PlayerColor::White,
            Color::Black => PlayerColor::Black,
        })
    }

    fn validate_and_apply(&self, position: &str, mv: &Move) -> Result<AppliedMove, RulesError> {
        let board = parse_board(position)?;
        let from = parse_square(&mv.source)?;
        let to = parse_square(&mv.target)?;

        // Pawns reaching the last rank promote to a queen unless told otherwise
        let promotion = if board.piece_on(from) == Some(Piece::Pawn)
            && matches!(to.get_rank(), Rank::First | Rank::Eighth)
        {
            Some(promotion_piece(mv.promotion.unwrap_or(PromotionPiece::Queen)))
        } else {
            None
        };

        let chess_move = ChessMove::new(from, to, promotion);
        if !board.legal(chess_move) {
            debug!("Rejected illegal move {}-{} in {}", mv.source, mv.target, position);
            return Err(RulesError::IllegalMove {
                from: mv.source.clone(),
                to: mv.target.clone(),
            });
        }

        let next = board.make_move_new(chess_move);
        Ok(AppliedMove {
            notation: san(&board, chess_move, &next),
            position: with_move_counters(position, &board, chess_move, &next),
        })
    }

    fn terminal_conditions(&self, positions: &[String]) -> TerminalConditions {
        let Some(last) = positions.last() else {
            return TerminalConditions::default();
        };
        let board = match parse_board(last) {
            Ok(board) => board,
            Err(e) => {
                debug!("Cannot evaluate terminal conditions: {}", e);
                return TerminalConditions::default();
            }
        };

        let status = board.status();
        TerminalConditions {
            checkmate: status == BoardStatus::Checkmate,
            stalemate: status == BoardStatus::Stalemate,
            insufficient_material: has_insufficient_material(&board),
            threefold_repetition: is_threefold_repetition(positions),
        }
    }
}

fn parse_board(position: &str) -> Result<Board, RulesError> {
    Board::from_str(position).map_err(|_| RulesError::InvalidPosition(position.to_string()))
}

fn parse_square(square: &str) -> Result<Square, RulesError> {
    Square::from_str(&square.to_lowercase()).map_err(|_| RulesError::InvalidSquare(square.to_string()))
}

fn promotion_piece(piece: PromotionPiece) -> Piece {
    match piece {
        PromotionPiece::Queen => Piece::Queen,
        PromotionPiece::Rook => Piece::Rook,
        PromotionPiece::Bishop => Piece::Bishop,
        PromotionPiece::Knight => Piece::Knight,
    }
}

fn piece_letter(piece: Piece) -> char {
    match piece {
        Piece::Pawn => 'P',
        Piece::Knight => 'N',
        Piece::Bishop => 'B',
        Piece::Rook => 'R',
        Piece::Queen => 'Q',
        Piece::King => 'K',
    }
}

fn file_char(square: Square) -> char {
    (b'a' + square.get_file().to_index() as u8) as char
}

fn rank_char(square: Square) -> char {
    (b'1' + square.get_rank().to_index() as u8) as char
}

/// FEN of `next` with the halfmove clock and fullmove number carried on from `previous`.
///
/// The `chess` crate neither reads nor writes the counters; it always renders `0 1`.
fn with_move_counters(previous: &str, board: &Board, chess_move: ChessMove, next: &Board) -> String {
    let mut counters = previous.split_whitespace().skip(4);
    let halfmove: u32 = counters.next().and_then(|f| f.parse().ok()).unwrap_or(0);
    let fullmove: u32 = counters.next().and_then(|f| f.parse().ok()).unwrap_or(1);

    let resets_clock = board.piece_on(chess_move.get_source()) == Some(Piece::Pawn)
        || board.piece_on(chess_move.get_dest()).is_some();
    let halfmove = if resets_clock { 0 } else { halfmove + 1 };
    let fullmove = match board.side_to_move() {
        Color::Black => fullmove + 1,
        Color::White => fullmove,
    };

    let rendered = next.to_string();
    let fields: Vec<&str> = rendered.split_whitespace().take(4).collect();
    format!("{} {} {}", fields.join(" "), halfmove, fullmove)
}

/// Standard algebraic notation of a legal move on `board`
fn san(board: &Board, chess_move: ChessMove, next: &Board) -> String {
    let from = chess_move.get_source();
    let to = chess_move.get_dest();
    let piece = board.piece_on(from).unwrap_or(Piece::Pawn);

    let mut notation = String::new();
    let file_distance = (from.get_file().to_index() as i32 - to.get_file().to_index() as i32).abs();

    if piece == Piece::King && file_distance == 2 {
        notation.push_str(if to.get_file().to_index() > from.get_file().to_index() {
            "O-O"
        } else {
            "O-O-O"
        });
    } else if piece == Piece::Pawn {
        // A pawn changing file always captures, en passant included
        if file_distance != 0 {
            notation.push(file_char(from));
            notation.push('x');
        }
        notation.push_str(&to.to_string());
        if let Some(promoted) = chess_move.get_promotion() {
            notation.push('=');
            notation.push(piece_letter(promoted));
        }
    } else {
        notation.push(piece_letter(piece));

        let rivals: Vec<Square> = MoveGen::new_legal(board)
            .filter(|m| m.get_dest() == to && m.get_source() != from)
            .map(|m| m.get_source())
            .filter(|sq| board.piece_on(*sq) == Some(piece))
            .collect();
        if !rivals.is_empty() {
            let shares_file = rivals.iter().any(|sq| sq.get_file() == from.get_file());
            let shares_rank = rivals.iter().any(|sq| sq.get_rank() == from.get_rank());
            if !shares_file {
                notation.push(file_char(from));
            } else if !shares_rank {
                notation.push(rank_char(from));
            } else {
                notation.push(file_char(from));
                notation.push(rank_char(from));
            }
        }

        if board.piece_on(to).is_some() {
            notation.push('x');
        }
        notation.push_str(&to.to_string());
    }

    if next.status() == BoardStatus::Checkmate {
        notation.push('#');
    } else if next.checkers().popcnt() > 0 {
        notation.push('+');
    }

    notation
}

/// Check if the board has insufficient material for checkmate
pub fn has_insufficient_material(board: &Board) -> bool {
    let heavy = *board.pieces(Piece::Pawn) | *board.pieces(Piece::Rook) | *board.pieces(Piece::Queen);
    if heavy.popcnt() > 0 {
        return false;
    }

    let knights = *board.pieces(Piece::Knight);
    let bishops = *board.pieces(Piece::Bishop);
    let minors = (knights | bishops).popcnt();

    // King vs king, or a lone minor piece against a bare king
    if minors <= 1 {
        return true;
    }
    if knights.popcnt() > 0 {
        return false;
    }

    // Bishops only: a draw when every bishop stands on the same square color
    let on_light = bishops.filter(|sq| is_light_square(*sq)).count();
    on_light == 0 || on_light == bishops.popcnt() as usize
}

fn is_light_square(square: Square) -> bool {
    (square.get_rank().to_index() + square.get_file().to_index()) % 2 == 1
}

/// Whether the last position has occurred at least three times.
///
/// Positions are compared on placement, side to move, castling rights and en
/// passant square; the move counters are ignored.
fn is_threefold_repetition(positions: &[String]) -> bool {
    let Some(last) = positions.last() else {
        return false;
    };
    let key = repetition_key(last);
    positions.iter().filter(|p| repetition_key(p) == key).count() >= 3
}

fn repetition_key(position: &str) -> Vec<&str> {
    position.split_whitespace().take(4).collect()
}
