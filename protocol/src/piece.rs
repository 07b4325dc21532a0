//! 棋子定义

use serde::{Deserialize, Serialize};

use crate::constants::BOARD_SIZE;
use crate::error::ProtocolError;

/// 棋子等级
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Rank {
    /// 兵：只能向前走一格，可向四个斜方向吃子
    Pawn,
    /// 王：沿斜线任意距离行走和吃子
    King,
}

impl Rank {
    /// 棋子基础分值（用于机器人评估）
    pub fn value(&self) -> i32 {
        match self {
            Rank::Pawn => 100,
            Rank::King => 300,
        }
    }
}

/// 执棋方
///
/// 序列化为 `1` / `2`，与持久化格式一致。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
pub enum Player {
    /// 先手，从第 0 行出发向第 7 行前进
    Player1,
    /// 后手，从第 7 行出发向第 0 行前进
    Player2,
}

impl Player {
    /// 获取对方
    pub fn opponent(&self) -> Player {
        match self {
            Player::Player1 => Player::Player2,
            Player::Player2 => Player::Player1,
        }
    }

    /// 兵的前进方向（行增量）
    pub fn forward(&self) -> i8 {
        match self {
            Player::Player1 => 1,
            Player::Player2 => -1,
        }
    }

    /// 升变所在的底线
    pub fn promotion_row(&self) -> u8 {
        match self {
            Player::Player1 => (BOARD_SIZE - 1) as u8,
            Player::Player2 => 0,
        }
    }

    /// 编号（1 或 2）
    pub fn number(&self) -> u8 {
        match self {
            Player::Player1 => 1,
            Player::Player2 => 2,
        }
    }
}

impl From<Player> for u8 {
    fn from(player: Player) -> u8 {
        player.number()
    }
}

impl TryFrom<u8> for Player {
    type Error = ProtocolError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Player::Player1),
            2 => Ok(Player::Player2),
            other => Err(ProtocolError::InvalidPlayer(other)),
        }
    }
}

impl std::fmt::Display for Player {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "player {}", self.number())
    }
}

/// 棋子
///
/// 持久化格式为 `{"player": 1|2, "type": "pawn"|"king"}`。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Piece {
    #[serde(rename = "player")]
    pub owner: Player,
    #[serde(rename = "type")]
    pub rank: Rank,
}

impl Piece {
    /// 创建新棋子
    pub fn new(owner: Player, rank: Rank) -> Self {
        Self { owner, rank }
    }

    pub fn pawn(owner: Player) -> Self {
        Self::new(owner, Rank::Pawn)
    }

    pub fn king(owner: Player) -> Self {
        Self::new(owner, Rank::King)
    }

    pub fn is_king(&self) -> bool {
        self.rank == Rank::King
    }

    /// 获取棋子分值
    pub fn value(&self) -> i32 {
        self.rank.value()
    }
}

/// 棋盘位置
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Position {
    /// 行 (0-7)
    pub row: u8,
    /// 列 (0-7)
    pub col: u8,
}

impl Position {
    /// 创建新位置
    pub fn new(row: u8, col: u8) -> Option<Self> {
        let pos = Self { row, col };
        pos.is_valid().then_some(pos)
    }

    /// 创建新位置（不检查边界，内部使用）
    pub const fn new_unchecked(row: u8, col: u8) -> Self {
        Self { row, col }
    }

    /// 检查位置是否在棋盘内
    pub fn is_valid(&self) -> bool {
        (self.row as usize) < BOARD_SIZE && (self.col as usize) < BOARD_SIZE
    }

    /// 是否为深色格（只有深色格可以放子）
    pub fn is_dark(&self) -> bool {
        (self.row as u16 + self.col as u16) % 2 == 1
    }

    /// 获取偏移后的位置
    pub fn offset(&self, d_row: i8, d_col: i8) -> Option<Position> {
        let row = self.row as i8 + d_row;
        let col = self.col as i8 + d_col;
        if row >= 0 && (row as usize) < BOARD_SIZE && col >= 0 && (col as usize) < BOARD_SIZE {
            Some(Position {
                row: row as u8,
                col: col as u8,
            })
        } else {
            None
        }
    }

    /// 到目标位置的行、列差值
    pub fn delta(&self, to: Position) -> (i8, i8) {
        (
            to.row as i8 - self.row as i8,
            to.col as i8 - self.col as i8,
        )
    }
}

impl std::fmt::Display for Position {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {})", self.row, self.col)
    }
}
