//! 走法校验与生成
//!
//! 人类走法校验和机器人搜索共用同一套吃子枚举（[`MoveValidator::captures_from`]），
//! 保证两边对“是否存在强制吃子”的判断始终一致。

use serde::{Deserialize, Serialize};

use crate::board::Board;
use crate::error::MoveError;
use crate::piece::{Player, Position, Rank};

/// 四个斜方向
const DIAGONALS: [(i8, i8); 4] = [(1, 1), (1, -1), (-1, 1), (-1, -1)];

/// 走法
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Move {
    /// 起始位置
    pub from: Position,
    /// 目标位置
    pub to: Position,
    /// 被吃棋子所在位置（如果有）
    pub captured: Option<Position>,
}

impl Move {
    /// 创建新走法
    pub fn new(from: Position, to: Position) -> Self {
        Self {
            from,
            to,
            captured: None,
        }
    }

    /// 创建带吃子的走法
    pub fn with_capture(from: Position, to: Position, captured: Position) -> Self {
        Self {
            from,
            to,
            captured: Some(captured),
        }
    }

    pub fn is_capture(&self) -> bool {
        self.captured.is_some()
    }
}

impl std::fmt::Display for Move {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.captured {
            Some(captured) => write!(f, "{} x{} -> {}", self.from, captured, self.to),
            None => write!(f, "{} -> {}", self.from, self.to),
        }
    }
}

/// 走法校验器
pub struct MoveValidator;

impl MoveValidator {
    /// 校验一步走法
    ///
    /// 通过时返回带吃子信息的 [`Move`]，否则返回拒绝原因。校验顺序：
    /// 边界 → 棋子归属与终点 → 斜线 → 强制吃子 → 兵/王各自的规则。
    pub fn validate(board: &Board, from: Position, to: Position, player: Player) -> Result<Move, MoveError> {
        for pos in [from, to] {
            if !pos.is_valid() {
                return Err(MoveError::OutOfBounds {
                    row: pos.row,
                    col: pos.col,
                });
            }
        }
        if from == to {
            return Err(MoveError::SameSquare);
        }

        let piece = board.piece_at(from).ok_or(MoveError::NoPiece {
            row: from.row,
            col: from.col,
        })?;
        if piece.owner != player {
            return Err(MoveError::NotYourPiece {
                row: from.row,
                col: from.col,
            });
        }
        if !board.get(to).is_empty() {
            return Err(MoveError::DestinationOccupied {
                row: to.row,
                col: to.col,
            });
        }

        let (d_row, d_col) = from.delta(to);
        if d_row.abs() != d_col.abs() {
            return Err(MoveError::NotDiagonal);
        }

        let forced = Self::has_forced_capture(board, player);
        match piece.rank {
            Rank::Pawn => Self::validate_pawn(board, player, from, to, d_row, forced),
            Rank::King => Self::validate_king(board, player, from, to, forced),
        }
    }

    /// 兵：向前走一格，或向任意斜方向跳吃
    fn validate_pawn(
        board: &Board,
        player: Player,
        from: Position,
        to: Position,
        d_row: i8,
        forced: bool,
    ) -> Result<Move, MoveError> {
        match d_row.abs() {
            1 => {
                if d_row != player.forward() {
                    return Err(MoveError::PawnBackward);
                }
                if forced {
                    return Err(MoveError::CaptureRequired);
                }
                Ok(Move::new(from, to))
            }
            2 => {
                let middle = Position::new_unchecked((from.row + to.row) / 2, (from.col + to.col) / 2);
                if Self::is_opponent(board, middle, player) {
                    Ok(Move::with_capture(from, to, middle))
                } else if forced {
                    // 这枚兵吃不了，但别的棋子可以
                    Err(MoveError::CaptureRequired)
                } else {
                    Err(MoveError::NothingToCapture)
                }
            }
            _ => Err(MoveError::PawnTooFar),
        }
    }

    /// 王：沿斜线行走，路径上至多一枚对方棋子
    fn validate_king(
        board: &Board,
        player: Player,
        from: Position,
        to: Position,
        forced: bool,
    ) -> Result<Move, MoveError> {
        let (d_row, d_col) = from.delta(to);
        let (step_row, step_col) = (d_row.signum(), d_col.signum());

        let mut captured = None;
        let mut current = from;
        while let Some(next) = current.offset(step_row, step_col) {
            if next == to {
                break;
            }
            if let Some(other) = board.piece_at(next) {
                if other.owner == player || captured.is_some() {
                    return Err(MoveError::KingPathBlocked);
                }
                captured = Some(next);
            }
            current = next;
        }

        match captured {
            Some(captured) => Ok(Move::with_capture(from, to, captured)),
            None if forced => Err(MoveError::CaptureRequired),
            None => Ok(Move::new(from, to)),
        }
    }

    /// 指定位置上的棋子能做出的全部吃子走法
    pub fn captures_from(board: &Board, pos: Position) -> Vec<Move> {
        let mut moves = Vec::new();
        let Some(piece) = board.piece_at(pos) else {
            return moves;
        };

        for (d_row, d_col) in DIAGONALS {
            match piece.rank {
                Rank::Pawn => {
                    let (Some(middle), Some(landing)) = (pos.offset(d_row, d_col), pos.offset(2 * d_row, 2 * d_col))
                    else {
                        continue;
                    };
                    if Self::is_opponent(board, middle, piece.owner) && board.get(landing).is_empty() {
                        moves.push(Move::with_capture(pos, landing, middle));
                    }
                }
                Rank::King => Self::king_captures_along(board, pos, piece.owner, d_row, d_col, &mut moves),
            }
        }

        moves
    }

    /// 王沿一个方向的吃子：找到射线上第一枚棋子，若属于对方，其后每个连续空格都是落点
    fn king_captures_along(
        board: &Board,
        from: Position,
        owner: Player,
        d_row: i8,
        d_col: i8,
        moves: &mut Vec<Move>,
    ) {
        let mut current = from;
        let target = loop {
            let Some(next) = current.offset(d_row, d_col) else {
                return;
            };
            match board.piece_at(next) {
                None => current = next,
                Some(other) if other.owner != owner => break next,
                Some(_) => return,
            }
        };

        let mut landing = target;
        while let Some(next) = landing.offset(d_row, d_col) {
            if !board.get(next).is_empty() {
                break;
            }
            moves.push(Move::with_capture(from, next, target));
            landing = next;
        }
    }

    /// 指定位置的棋子（兵或王）能否吃子
    pub fn can_capture_from(board: &Board, pos: Position) -> bool {
        !Self::captures_from(board, pos).is_empty()
    }

    /// 执棋方是否有任何棋子可以吃子
    pub fn has_forced_capture(board: &Board, player: Player) -> bool {
        board
            .pieces(player)
            .iter()
            .any(|(pos, _)| Self::can_capture_from(board, *pos))
    }

    /// 指定位置棋子的所有不吃子走法（不考虑强制吃子）
    pub fn simple_moves_from(board: &Board, pos: Position) -> Vec<Move> {
        let mut moves = Vec::new();
        let Some(piece) = board.piece_at(pos) else {
            return moves;
        };

        match piece.rank {
            Rank::Pawn => {
                let forward = piece.owner.forward();
                for d_col in [-1i8, 1] {
                    if let Some(to) = pos.offset(forward, d_col) {
                        if board.get(to).is_empty() {
                            moves.push(Move::new(pos, to));
                        }
                    }
                }
            }
            Rank::King => {
                for (d_row, d_col) in DIAGONALS {
                    let mut current = pos;
                    while let Some(to) = current.offset(d_row, d_col) {
                        if !board.get(to).is_empty() {
                            break;
                        }
                        moves.push(Move::new(pos, to));
                        current = to;
                    }
                }
            }
        }

        moves
    }

    /// 执棋方所有合法走法：有吃子时只返回吃子走法
    pub fn legal_moves(board: &Board, player: Player) -> Vec<Move> {
        let pieces = board.pieces(player);

        let captures: Vec<Move> = pieces
            .iter()
            .flat_map(|(pos, _)| Self::captures_from(board, *pos))
            .collect();
        if !captures.is_empty() {
            return captures;
        }

        pieces
            .iter()
            .flat_map(|(pos, _)| Self::simple_moves_from(board, *pos))
            .collect()
    }

    /// 执棋方是否还有合法走法
    pub fn has_legal_move(board: &Board, player: Player) -> bool {
        board.pieces(player).iter().any(|(pos, _)| {
            Self::can_capture_from(board, *pos) || !Self::simple_moves_from(board, *pos).is_empty()
        })
    }

    /// 执棋方是否已输：没有棋子，或所有棋子都无路可走
    pub fn is_game_over(board: &Board, player: Player) -> bool {
        board.count(player) == 0 || !Self::has_legal_move(board, player)
    }

    fn is_opponent(board: &Board, pos: Position, player: Player) -> bool {
        board.piece_at(pos).is_some_and(|piece| piece.owner != player)
    }
}
