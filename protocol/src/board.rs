//! 棋盘状态

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::constants::{BOARD_SIZE, STARTING_ROWS};
use crate::error::ProtocolError;
use crate::moves::Move;
use crate::piece::{Piece, Player, Position};

/// 棋盘格
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Cell {
    #[default]
    Empty,
    Piece(Piece),
}

impl Cell {
    /// 格子上的棋子（如果有）
    pub fn piece(&self) -> Option<Piece> {
        match self {
            Cell::Empty => None,
            Cell::Piece(piece) => Some(*piece),
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Cell::Empty)
    }
}

impl From<Option<Piece>> for Cell {
    fn from(piece: Option<Piece>) -> Self {
        piece.map_or(Cell::Empty, Cell::Piece)
    }
}

/// 棋盘
///
/// 8x8 固定数组，按 `[row][col]` 直接索引。序列化时使用持久化格式：
/// 以行号 `"0"`..`"7"` 为键的对象，每行 8 个元素，空格为 `null`。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "BoardEncoding", try_from = "BoardEncoding")]
pub struct Board {
    cells: [[Cell; BOARD_SIZE]; BOARD_SIZE],
}

impl Board {
    /// 创建空棋盘
    pub fn empty() -> Self {
        Self {
            cells: [[Cell::Empty; BOARD_SIZE]; BOARD_SIZE],
        }
    }

    /// 创建初始棋盘：双方各自底部三行的深色格摆满兵
    pub fn initial() -> Self {
        let mut board = Self::empty();

        for pos in Self::dark_squares() {
            let row = pos.row as usize;
            if row < STARTING_ROWS {
                board.place(pos, Piece::pawn(Player::Player1));
            } else if row >= BOARD_SIZE - STARTING_ROWS {
                board.place(pos, Piece::pawn(Player::Player2));
            }
        }

        board
    }

    /// 所有深色格（按行优先顺序）
    pub fn dark_squares() -> impl Iterator<Item = Position> {
        (0..BOARD_SIZE as u8)
            .flat_map(|row| (0..BOARD_SIZE as u8).map(move |col| Position::new_unchecked(row, col)))
            .filter(|pos| pos.is_dark())
    }

    /// 获取指定位置的格子（越界视为空格）
    pub fn get(&self, pos: Position) -> Cell {
        if pos.is_valid() {
            self.cells[pos.row as usize][pos.col as usize]
        } else {
            Cell::Empty
        }
    }

    /// 获取指定位置的棋子
    pub fn piece_at(&self, pos: Position) -> Option<Piece> {
        self.get(pos).piece()
    }

    /// 设置指定位置的格子
    pub fn set(&mut self, pos: Position, cell: Cell) {
        if pos.is_valid() {
            self.cells[pos.row as usize][pos.col as usize] = cell;
        }
    }

    /// 放置棋子
    pub fn place(&mut self, pos: Position, piece: Piece) {
        self.set(pos, Cell::Piece(piece));
    }

    /// 清空格子
    pub fn clear(&mut self, pos: Position) {
        self.set(pos, Cell::Empty);
    }

    /// 移动棋子（不检查规则），返回被移动的棋子
    pub fn move_piece(&mut self, from: Position, to: Position) -> Option<Piece> {
        let piece = self.piece_at(from);
        self.clear(from);
        self.set(to, piece.into());
        piece
    }

    /// 若该位置的兵已到达对方底线则升为王，返回是否发生升变
    pub fn promote_if_due(&mut self, pos: Position) -> bool {
        match self.piece_at(pos) {
            Some(piece) if !piece.is_king() && pos.row == piece.owner.promotion_row() => {
                self.place(pos, Piece::king(piece.owner));
                true
            }
            _ => false,
        }
    }

    /// 执行一步已校验的走法：移动棋子、移除被吃棋子、必要时升变，返回是否升变
    pub fn apply_move(&mut self, mv: &Move) -> bool {
        self.move_piece(mv.from, mv.to);
        if let Some(captured) = mv.captured {
            self.clear(captured);
        }
        self.promote_if_due(mv.to)
    }

    /// 获取指定执棋方的所有棋子位置
    pub fn pieces(&self, player: Player) -> Vec<(Position, Piece)> {
        self.all_pieces()
            .into_iter()
            .filter(|(_, piece)| piece.owner == player)
            .collect()
    }

    /// 获取所有棋子
    pub fn all_pieces(&self) -> Vec<(Position, Piece)> {
        let mut result = Vec::new();
        for (row, cells) in self.cells.iter().enumerate() {
            for (col, cell) in cells.iter().enumerate() {
                if let Some(piece) = cell.piece() {
                    result.push((Position::new_unchecked(row as u8, col as u8), piece));
                }
            }
        }
        result
    }

    /// 指定执棋方的棋子数量
    pub fn count(&self, player: Player) -> usize {
        self.cells
            .iter()
            .flatten()
            .filter(|cell| cell.piece().is_some_and(|piece| piece.owner == player))
            .count()
    }
}

impl Default for Board {
    fn default() -> Self {
        Self::initial()
    }
}

/// 棋盘的持久化编码
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BoardEncoding(BTreeMap<String, Vec<Option<Piece>>>);

impl From<Board> for BoardEncoding {
    fn from(board: Board) -> Self {
        let rows = board
            .cells
            .iter()
            .enumerate()
            .map(|(row, cells)| (row.to_string(), cells.iter().map(Cell::piece).collect::<Vec<_>>()))
            .collect();
        BoardEncoding(rows)
    }
}

impl TryFrom<BoardEncoding> for Board {
    type Error = ProtocolError;

    fn try_from(encoding: BoardEncoding) -> Result<Self, Self::Error> {
        let mut rows = encoding.0;
        if rows.len() != BOARD_SIZE {
            return Err(ProtocolError::InvalidBoard {
                reason: format!("Expected {} rows, got {}", BOARD_SIZE, rows.len()),
            });
        }

        let mut board = Board::empty();
        for row in 0..BOARD_SIZE {
            let cells = rows.remove(&row.to_string()).ok_or_else(|| ProtocolError::InvalidBoard {
                reason: format!("Missing row \"{}\"", row),
            })?;

            if cells.len() != BOARD_SIZE {
                return Err(ProtocolError::InvalidBoard {
                    reason: format!("Row {} has {} cells", row, cells.len()),
                });
            }

            for (col, piece) in cells.into_iter().enumerate() {
                let pos = Position::new_unchecked(row as u8, col as u8);
                if let Some(piece) = piece {
                    if !pos.is_dark() {
                        return Err(ProtocolError::InvalidBoard {
                            reason: format!("Piece on light square {}", pos),
                        });
                    }
                    board.place(pos, piece);
                }
            }
        }

        Ok(board)
    }
}
