//! 对局聚合
//!
//! 对局记录与走法日志作为一个整体存储，保证两者同时更新。

use chrono::Utc;
use serde::{Deserialize, Serialize};

use protocol::{
    Board, EndReason, GameId, GameRecord, GameResult, GameStatus, Move, MoveError, MoveRecord, MoveValidator,
    Player, PlayerId, Position, StateError,
};

use crate::error::Result;

/// 一步走法执行后的结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MoveOutcome {
    /// 落点的兵是否升变
    pub promoted: bool,
    /// 同一枚棋子还能继续吃子，回合不交换
    pub continues: bool,
    /// 对局因这步棋结束
    pub finished: bool,
}

/// 对局：记录 + 只追加的走法日志
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Game {
    pub record: GameRecord,
    pub moves: Vec<MoveRecord>,
}

impl Game {
    /// 创建新对局（初始棋盘，先手走第一步）
    pub fn new(id: GameId, player1_id: PlayerId, player2_id: PlayerId) -> Self {
        Self {
            record: GameRecord::new(id, player1_id, player2_id, Board::initial()),
            moves: Vec::new(),
        }
    }

    pub fn id(&self) -> GameId {
        self.record.id
    }

    /// 校验当前局面下的一步走法，连吃进行中时只能由连吃的棋子继续
    pub fn validate(&self, from: Position, to: Position, player: Player) -> std::result::Result<Move, MoveError> {
        Self::check_chain(self.record.chain_from, from)?;
        MoveValidator::validate(&self.record.board_state, from, to, player)
    }

    fn check_chain(chain_from: Option<Position>, from: Position) -> std::result::Result<(), MoveError> {
        match chain_from {
            Some(chain) if chain != from => Err(MoveError::ChainInProgress {
                row: chain.row,
                col: chain.col,
            }),
            _ => Ok(()),
        }
    }

    /// 吃子后同一枚棋子还能继续吃，返回该棋子的位置
    fn chain_after(board: &Board, mv: &Move) -> Option<Position> {
        (mv.is_capture() && MoveValidator::can_capture_from(board, mv.to)).then_some(mv.to)
    }

    /// 由当前执棋方执行一步已校验的走法
    ///
    /// 依次完成：移动与吃子、升变、判定对方是否已输、决定下一手、追加走法日志。
    pub fn apply_move(&mut self, mv: &Move) -> MoveOutcome {
        let mover = self.record.current_player;
        let user_id = self.record.player_id(mover);

        let promoted = self.record.board_state.apply_move(mv);
        let ending = Self::ending_after(&self.record.board_state, mover);

        // 连吃由同一方的同一枚棋子继续
        self.record.chain_from = Self::chain_after(&self.record.board_state, mv);
        let continues = self.record.chain_from.is_some();
        if !continues {
            self.record.current_player = mover.opponent();
        }

        self.moves.push(MoveRecord::new(self.record.id, user_id, mv));
        self.record.updated_at = Utc::now();

        let finished = match ending {
            Some((result, reason)) => self.finish(result, reason),
            None => false,
        };

        MoveOutcome {
            promoted,
            continues,
            finished,
        }
    }

    /// 走子方走完后对局是否结束
    ///
    /// 对方没有棋子或无路可走则走子方胜；若此时走子方自己也无路可走，判和。
    fn ending_after(board: &Board, mover: Player) -> Option<(GameResult, EndReason)> {
        let opponent = mover.opponent();
        if !MoveValidator::is_game_over(board, opponent) {
            return None;
        }
        if board.count(opponent) == 0 {
            Some((GameResult::win_for(mover), EndReason::NoPieces))
        } else if MoveValidator::has_legal_move(board, mover) {
            Some((GameResult::win_for(mover), EndReason::NoMoves))
        } else {
            Some((GameResult::Draw, EndReason::Stalemate))
        }
    }

    /// 结束对局，已结束时不做任何修改并返回 false
    pub fn finish(&mut self, result: GameResult, reason: EndReason) -> bool {
        if self.record.is_finished() {
            return false;
        }

        self.record.status = GameStatus::Finished;
        self.record.chain_from = None;
        self.record.result = Some(result);
        self.record.end_reason = Some(reason);
        self.record.winner_id = result.winner().map(|player| self.record.player_id(player));
        self.record.updated_at = Utc::now();
        true
    }

    /// 从初始棋盘重放走法日志，每一步都重新校验，返回重放后的棋盘
    pub fn replay(&self) -> Result<Board> {
        let mut board = Board::initial();
        let mut chain_from = None;

        for record in &self.moves {
            let from = record.from_position().ok_or(MoveError::OutOfBounds {
                row: record.from_row,
                col: record.from_col,
            })?;
            let to = record.to_position().ok_or(MoveError::OutOfBounds {
                row: record.to_row,
                col: record.to_col,
            })?;
            let player = self.record.seat_of(record.user_id).ok_or(StateError::NotParticipant)?;

            Self::check_chain(chain_from, from)?;
            let mv = MoveValidator::validate(&board, from, to, player)?;
            board.apply_move(&mv);
            chain_from = Self::chain_after(&board, &mv);
        }

        Ok(board)
    }
}
