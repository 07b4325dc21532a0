//! 局面评估函数

use protocol::{Board, Piece, Player, Position, Rank, BOARD_SIZE};

/// 兵每前进一行的加分
const ADVANCE_BONUS: i32 = 5;

/// 王靠近中线的加分上限
const KING_CENTER_BONUS: i32 = 3;

/// 评估器
pub struct Evaluator;

impl Evaluator {
    /// 评估局面（`player` 视角，正值对其有利）：子力差 + 位置分差
    pub fn evaluate(board: &Board, player: Player) -> i32 {
        Self::evaluate_material(board, player) + Self::evaluate_position(board, player)
    }

    /// 位置分差
    fn evaluate_position(board: &Board, player: Player) -> i32 {
        board
            .all_pieces()
            .into_iter()
            .map(|(pos, piece)| {
                let bonus = Self::position_bonus(pos, piece);
                if piece.owner == player {
                    bonus
                } else {
                    -bonus
                }
            })
            .sum()
    }

    /// 位置加成：兵按前进行数加分，王按离中线的距离加分
    fn position_bonus(pos: Position, piece: Piece) -> i32 {
        match piece.rank {
            Rank::Pawn => {
                let advanced = match piece.owner {
                    Player::Player1 => pos.row as i32,
                    Player::Player2 => (BOARD_SIZE - 1) as i32 - pos.row as i32,
                };
                advanced * ADVANCE_BONUS
            }
            Rank::King => {
                // 列 3、4 为中线
                let edge_distance = (2 * pos.col as i32 - (BOARD_SIZE - 1) as i32).abs();
                KING_CENTER_BONUS - edge_distance / 2
            }
        }
    }

    /// 快速评估（仅计算子力差）
    pub fn evaluate_material(board: &Board, player: Player) -> i32 {
        board
            .all_pieces()
            .into_iter()
            .map(|(_, piece)| {
                if piece.owner == player {
                    piece.value()
                } else {
                    -piece.value()
                }
            })
            .sum()
    }
}
