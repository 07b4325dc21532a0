//! 机器人走法选择
//!
//! 候选走法全部来自 [`MoveValidator`] 的统一枚举，吃子优先：
//! 只要存在吃子走法，就只在吃子走法中选择。

use protocol::{Board, Difficulty, Move, MoveValidator, Player, Position};
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tracing::debug;

use crate::evaluate::Evaluator;

/// 机器人策略
///
/// 输入局面和执棋方，返回一步合法走法；无棋可走时返回 `None`，
/// 由对局引擎判定机器人负。
pub trait BotStrategy: Send {
    /// 在给定的候选走法中选择一步
    fn choose_among(&mut self, board: &Board, player: Player, candidates: &Candidates) -> Option<Move>;

    /// 在执棋方全部合法走法中选择一步
    fn choose_move(&mut self, board: &Board, player: Player) -> Option<Move> {
        self.choose_among(board, player, &Candidates::collect(board, player))
    }

    /// 策略名称（日志用）
    fn name(&self) -> &'static str;
}

/// 候选走法：按吃子 / 不吃子划分
#[derive(Debug, Clone, Default)]
pub struct Candidates {
    pub captures: Vec<Move>,
    pub simple_moves: Vec<Move>,
}

impl Candidates {
    /// 枚举执棋方每枚棋子的吃子与普通走法
    pub fn collect(board: &Board, player: Player) -> Self {
        let mut candidates = Self::default();
        for (pos, _) in board.pieces(player) {
            candidates.captures.extend(MoveValidator::captures_from(board, pos));
            candidates.simple_moves.extend(MoveValidator::simple_moves_from(board, pos));
        }
        candidates
    }

    /// 连吃中的候选：只有该棋子的吃子走法
    pub fn continuing(board: &Board, pos: Position) -> Self {
        Self {
            captures: MoveValidator::captures_from(board, pos),
            simple_moves: Vec::new(),
        }
    }

    /// 可供选择的走法：有吃子时只返回吃子
    pub fn preferred(&self) -> &[Move] {
        if self.captures.is_empty() {
            &self.simple_moves
        } else {
            &self.captures
        }
    }

    pub fn is_empty(&self) -> bool {
        self.captures.is_empty() && self.simple_moves.is_empty()
    }
}

/// 随机机器人：在候选走法中等概率选择
pub struct RandomBot {
    rng: ChaCha8Rng,
}

impl RandomBot {
    pub fn new() -> Self {
        Self {
            rng: ChaCha8Rng::from_entropy(),
        }
    }

    /// 固定种子（测试用，结果可复现）
    pub fn with_seed(seed: u64) -> Self {
        Self {
            rng: ChaCha8Rng::seed_from_u64(seed),
        }
    }
}

impl Default for RandomBot {
    fn default() -> Self {
        Self::new()
    }
}

impl BotStrategy for RandomBot {
    fn choose_among(&mut self, _board: &Board, _player: Player, candidates: &Candidates) -> Option<Move> {
        let chosen = candidates.preferred().choose(&mut self.rng).copied();
        debug!(
            "RandomBot: {} captures, {} simple moves, chose {:?}",
            candidates.captures.len(),
            candidates.simple_moves.len(),
            chosen
        );
        chosen
    }

    fn name(&self) -> &'static str {
        "random"
    }
}

/// 贪心机器人：走一步后评估局面，取分数最高者，同分随机
pub struct GreedyBot {
    rng: ChaCha8Rng,
}

impl GreedyBot {
    pub fn new() -> Self {
        Self {
            rng: ChaCha8Rng::from_entropy(),
        }
    }

    pub fn with_seed(seed: u64) -> Self {
        Self {
            rng: ChaCha8Rng::seed_from_u64(seed),
        }
    }

    fn score(board: &Board, mv: &Move, player: Player) -> i32 {
        let mut next = board.clone();
        next.apply_move(mv);
        Evaluator::evaluate(&next, player)
    }
}

impl Default for GreedyBot {
    fn default() -> Self {
        Self::new()
    }
}

impl BotStrategy for GreedyBot {
    fn choose_among(&mut self, board: &Board, player: Player, candidates: &Candidates) -> Option<Move> {
        let scored: Vec<(Move, i32)> = candidates
            .preferred()
            .iter()
            .map(|mv| (*mv, Self::score(board, mv, player)))
            .collect();

        let best_score = scored.iter().map(|(_, score)| *score).max()?;
        let best: Vec<Move> = scored
            .into_iter()
            .filter(|(_, score)| *score == best_score)
            .map(|(mv, _)| mv)
            .collect();

        let chosen = best.choose(&mut self.rng).copied();
        debug!("GreedyBot: best score {}, {} tied, chose {:?}", best_score, best.len(), chosen);
        chosen
    }

    fn name(&self) -> &'static str {
        "greedy"
    }
}

/// 按难度创建机器人策略
pub fn from_difficulty(difficulty: Difficulty) -> Box<dyn BotStrategy> {
    match difficulty {
        Difficulty::Easy => Box::new(RandomBot::new()),
        Difficulty::Normal => Box::new(GreedyBot::new()),
    }
}
