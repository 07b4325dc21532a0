//! 对局引擎
//!
//! 所有对局修改都经过这里：加载 → 校验 → 在副本上修改 → 保存，
//! 整个过程（包括机器人应招）持有该对局的锁。

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tracing::{debug, error, info, warn};

use draughts_ai::{BotStrategy, Candidates};
use protocol::{
    EndReason, GameId, GameRecord, GameResult, MoveRecord, Player, PlayerId, Position, StateError, BOT_PLAYER_ID,
};

use crate::error::Result;
use crate::game::Game;
use crate::storage::GameStore;

/// 对局结束通知（通知推送、胜负统计）
pub trait GameEvents: Send + Sync {
    fn game_finished(&self, game: &GameRecord);
}

/// 默认实现：写日志
pub struct LogEvents;

impl GameEvents for LogEvents {
    fn game_finished(&self, game: &GameRecord) {
        info!(
            "Game {} finished: {:?} ({:?}), winner {:?}",
            game.id, game.result, game.end_reason, game.winner_id
        );
    }
}

/// 一次走棋请求的结果：最新状态，以及本次产生的全部走法（含机器人应招）
#[derive(Debug, Clone)]
pub struct MoveReport {
    pub game: GameRecord,
    pub moves: Vec<MoveRecord>,
}

/// 对局引擎
pub struct TurnEngine {
    store: Arc<dyn GameStore>,
    bot: Mutex<Box<dyn BotStrategy>>,
    events: Arc<dyn GameEvents>,
    /// 对局 ID -> 对局锁
    locks: Mutex<HashMap<GameId, Arc<Mutex<()>>>>,
}

impl TurnEngine {
    pub fn new(store: Arc<dyn GameStore>, bot: Box<dyn BotStrategy>) -> Self {
        Self {
            store,
            bot: Mutex::new(bot),
            events: Arc::new(LogEvents),
            locks: Mutex::new(HashMap::new()),
        }
    }

    /// 替换对局结束通知
    pub fn with_events(mut self, events: Arc<dyn GameEvents>) -> Self {
        self.events = events;
        self
    }

    /// 创建对局，`player2` 为 [`BOT_PLAYER_ID`] 时对手是机器人
    pub fn create_game(&self, player1: PlayerId, player2: PlayerId) -> Result<GameRecord> {
        if player1 == BOT_PLAYER_ID {
            return Err(StateError::ReservedPlayer(player1).into());
        }

        let id = self.store.next_id()?;
        let game = Game::new(id, player1, player2);
        self.store.save(&game)?;

        info!("Game {} created: {} vs {}", id, player1, player2);
        Ok(game.record)
    }

    /// 与机器人对局，玩家执先手
    pub fn create_bot_game(&self, user_id: PlayerId) -> Result<GameRecord> {
        self.create_game(user_id, BOT_PLAYER_ID)
    }

    /// 获取对局当前状态
    pub fn game(&self, game_id: GameId) -> Result<GameRecord> {
        Ok(self.load(game_id)?.record)
    }

    /// 玩家最近创建的进行中对局
    pub fn latest_in_progress(&self, user_id: PlayerId) -> Result<Option<GameRecord>> {
        Ok(self.store.latest_in_progress(user_id)?)
    }

    /// 走棋
    ///
    /// 被拒绝时对局不发生任何变化。对手是机器人且轮到它时，机器人的应招在同一把锁内完成。
    pub fn apply_move(
        &self,
        game_id: GameId,
        user_id: PlayerId,
        from: Position,
        to: Position,
    ) -> Result<MoveReport> {
        let lock = self.game_lock(game_id)?;
        let _guard = lock.lock()?;

        let mut game = self.load(game_id)?;
        let player = Self::seat_for_turn(&game, user_id)?;
        let mv = game.validate(from, to, player).map_err(|e| {
            debug!("Game {}: rejected {} -> {} by {}: {}", game_id, from, to, user_id, e);
            e
        })?;

        let outcome = game.apply_move(&mv);
        debug!("Game {}: {} played {} ({:?})", game_id, player, mv, outcome);
        let first = game.moves.len() - 1;

        self.play_bot_replies(&mut game)?;
        self.commit(&game)?;

        Ok(MoveReport {
            moves: game.moves[first..].to_vec(),
            game: game.record,
        })
    }

    /// 认输：对手获胜
    pub fn resign(&self, game_id: GameId, user_id: PlayerId) -> Result<GameRecord> {
        let lock = self.game_lock(game_id)?;
        let _guard = lock.lock()?;

        let mut game = self.load(game_id)?;
        let player = Self::seat_of(&game, user_id)?;
        if game.record.is_finished() {
            return Err(StateError::GameFinished.into());
        }

        self.finalize(&mut game, GameResult::win_for(player.opponent()), EndReason::Resignation)?;
        Ok(game.record)
    }

    /// 结束对局（认输、和棋、机器人无棋可走等），对已结束的对局不做任何修改
    pub fn end_game(&self, game_id: GameId, result: GameResult, reason: EndReason) -> Result<GameRecord> {
        let lock = self.game_lock(game_id)?;
        let _guard = lock.lock()?;

        let mut game = self.load(game_id)?;
        self.finalize(&mut game, result, reason)?;
        Ok(game.record)
    }

    /// 结束对局并保存，已结束的对局不做修改
    fn finalize(&self, game: &mut Game, result: GameResult, reason: EndReason) -> Result<()> {
        if game.finish(result, reason) {
            self.commit(game)?;
        }
        Ok(())
    }

    fn load(&self, game_id: GameId) -> Result<Game> {
        self.store
            .load(game_id)?
            .ok_or_else(|| StateError::GameNotFound(game_id).into())
    }

    /// 保存对局，刚结束的对局发出通知
    fn commit(&self, game: &Game) -> Result<()> {
        self.store.save(game).map_err(|e| {
            error!("Failed to save game {}: {}", game.id(), e);
            e
        })?;
        if game.record.is_finished() {
            // 已结束的对局不再接受修改，锁可以释放
            self.locks.lock()?.remove(&game.id());
            self.events.game_finished(&game.record);
        }
        Ok(())
    }

    fn game_lock(&self, game_id: GameId) -> Result<Arc<Mutex<()>>> {
        let mut locks = self.locks.lock()?;
        Ok(locks.entry(game_id).or_default().clone())
    }

    /// 玩家在对局中的座位
    fn seat_of(game: &Game, user_id: PlayerId) -> Result<Player> {
        if user_id == BOT_PLAYER_ID {
            return Err(StateError::ReservedPlayer(user_id).into());
        }
        Ok(game.record.seat_of(user_id).ok_or(StateError::NotParticipant)?)
    }

    /// 对局进行中且轮到该玩家时返回其座位
    fn seat_for_turn(game: &Game, user_id: PlayerId) -> Result<Player> {
        let player = Self::seat_of(game, user_id)?;
        if game.record.is_finished() {
            return Err(StateError::GameFinished.into());
        }
        if player != game.record.current_player {
            return Err(StateError::NotYourTurn.into());
        }
        Ok(player)
    }

    /// 轮到机器人时连续走棋（连吃时可能走多步）
    ///
    /// 机器人无棋可走或给出非法走法时判负，结果与玩家的走法一起保存。
    fn play_bot_replies(&self, game: &mut Game) -> Result<()> {
        while game.record.is_bot_turn() {
            let player = game.record.current_player;
            let board = &game.record.board_state;

            let choice = {
                let mut bot = self.bot.lock()?;
                match game.record.chain_from {
                    Some(chain) => bot.choose_among(board, player, &Candidates::continuing(board, chain)),
                    None => bot.choose_move(board, player),
                }
            };

            let Some(choice) = choice else {
                warn!("Bot has no legal move in game {}, human wins", game.id());
                game.finish(GameResult::win_for(player.opponent()), EndReason::BotExhausted);
                break;
            };

            // 机器人的走法同样经过校验器
            let mv = match game.validate(choice.from, choice.to, player) {
                Ok(mv) => mv,
                Err(e) => {
                    error!("Bot chose illegal move {} in game {}: {}, human wins", choice, game.id(), e);
                    game.finish(GameResult::win_for(player.opponent()), EndReason::BotExhausted);
                    break;
                }
            };

            game.apply_move(&mv);
            game.record.board_state.promote_if_due(mv.to);
            debug!("Game {}: bot played {}", game.id(), mv);
        }
        Ok(())
    }
}
