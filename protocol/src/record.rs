//! 持久化记录格式
//!
//! 对局、走法、队列三类记录，字段名使用 camelCase，与存储格式一致。

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::board::Board;
use crate::constants::BOT_PLAYER_ID;
use crate::message::{GameId, PlayerId};
use crate::moves::Move;
use crate::piece::{Player, Position};

/// 对局状态，只能从 `InProgress` 变为 `Finished`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GameStatus {
    InProgress,
    Finished,
}

/// 对局结果
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GameResult {
    Player1Won,
    Player2Won,
    Draw,
}

impl GameResult {
    /// 指定执棋方获胜
    pub fn win_for(player: Player) -> Self {
        match player {
            Player::Player1 => GameResult::Player1Won,
            Player::Player2 => GameResult::Player2Won,
        }
    }

    /// 获胜方（和棋为 None）
    pub fn winner(&self) -> Option<Player> {
        match self {
            GameResult::Player1Won => Some(Player::Player1),
            GameResult::Player2Won => Some(Player::Player2),
            GameResult::Draw => None,
        }
    }
}

/// 结束原因
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EndReason {
    /// 对方没有棋子
    NoPieces,
    /// 对方无路可走
    NoMoves,
    /// 认输
    Resignation,
    /// 机器人无棋可走
    BotExhausted,
    /// 双方都无路可走
    Stalemate,
}

/// 对局记录
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameRecord {
    pub id: GameId,
    pub player1_id: PlayerId,
    /// 为 [`BOT_PLAYER_ID`] 时对手是机器人
    pub player2_id: PlayerId,
    pub current_player: Player,
    pub status: GameStatus,
    pub board_state: Board,
    pub winner_id: Option<PlayerId>,
    pub result: Option<GameResult>,
    pub end_reason: Option<EndReason>,
    /// 连吃进行中时必须继续走子的棋子位置
    #[serde(default)]
    pub chain_from: Option<Position>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl GameRecord {
    /// 创建新对局：先手走第一步
    pub fn new(id: GameId, player1_id: PlayerId, player2_id: PlayerId, board: Board) -> Self {
        let now = Utc::now();
        Self {
            id,
            player1_id,
            player2_id,
            current_player: Player::Player1,
            status: GameStatus::InProgress,
            board_state: board,
            winner_id: None,
            result: None,
            end_reason: None,
            chain_from: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_finished(&self) -> bool {
        self.status == GameStatus::Finished
    }

    pub fn is_bot_game(&self) -> bool {
        self.player2_id == BOT_PLAYER_ID
    }

    /// 执棋方对应的玩家 ID
    pub fn player_id(&self, player: Player) -> PlayerId {
        match player {
            Player::Player1 => self.player1_id,
            Player::Player2 => self.player2_id,
        }
    }

    /// 玩家 ID 对应的执棋方（不是参与者时为 None）
    pub fn seat_of(&self, user_id: PlayerId) -> Option<Player> {
        if user_id == self.player1_id {
            Some(Player::Player1)
        } else if user_id == self.player2_id {
            Some(Player::Player2)
        } else {
            None
        }
    }

    pub fn is_participant(&self, user_id: PlayerId) -> bool {
        self.seat_of(user_id).is_some()
    }

    /// 当前是否轮到机器人
    pub fn is_bot_turn(&self) -> bool {
        !self.is_finished() && self.player_id(self.current_player) == BOT_PLAYER_ID
    }
}

/// 走法记录（只追加，用于复盘）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MoveRecord {
    pub game_id: GameId,
    pub user_id: PlayerId,
    pub from_row: u8,
    pub from_col: u8,
    pub to_row: u8,
    pub to_col: u8,
    pub captured: bool,
    pub played_at: DateTime<Utc>,
}

impl MoveRecord {
    /// 由一步已校验的走法创建记录
    pub fn new(game_id: GameId, user_id: PlayerId, mv: &Move) -> Self {
        Self {
            game_id,
            user_id,
            from_row: mv.from.row,
            from_col: mv.from.col,
            to_row: mv.to.row,
            to_col: mv.to.col,
            captured: mv.is_capture(),
            played_at: Utc::now(),
        }
    }

    /// 获取起始位置
    pub fn from_position(&self) -> Option<Position> {
        Position::new(self.from_row, self.from_col)
    }

    /// 获取目标位置
    pub fn to_position(&self) -> Option<Position> {
        Position::new(self.to_row, self.to_col)
    }
}

/// 匹配队列记录
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueueRecord {
    pub user_id: PlayerId,
    pub joined_at: DateTime<Utc>,
}
