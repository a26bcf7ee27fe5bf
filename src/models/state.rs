//! 扫描运行状态机
//!
//! 所有合法切换都列在 [`TRANSITIONS`] 中，任何不在表里的切换都会被拒绝。

use std::fmt;

use crate::error::{AppResult, ScanError};

/// 扫描运行状态，同一时刻只有一个
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum RunState {
    #[default]
    Idle,
    Initializing,
    Scanning,
    Organizing,
    Completed,
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RunState::Idle => "Idle",
            RunState::Initializing => "Initializing",
            RunState::Scanning => "Scanning",
            RunState::Organizing => "Organizing",
            RunState::Completed => "Completed",
        };
        f.write_str(name)
    }
}

/// 状态切换守卫所需的上下文
#[derive(Debug, Clone, Copy, Default)]
pub struct TransitionContext {
    pub has_profile: bool,
    pub total_count: usize,
    pub result_count: usize,
    pub writable_source: bool,
}

type Guard = fn(&TransitionContext) -> bool;

fn always(_: &TransitionContext) -> bool {
    true
}

fn ready_to_scan(ctx: &TransitionContext) -> bool {
    ctx.has_profile && ctx.total_count > 0
}

fn nothing_to_scan(ctx: &TransitionContext) -> bool {
    ctx.has_profile && ctx.total_count == 0
}

fn ready_to_organize(ctx: &TransitionContext) -> bool {
    ctx.result_count > 0 && ctx.writable_source
}

/// 状态切换表：(起点, 终点, 守卫)
///
/// 调用方丢弃扫描或整理的 future 时状态会停在中途，
/// 所以中途状态也可以直接开始新的扫描
pub const TRANSITIONS: &[(RunState, RunState, Guard)] = &[
    (RunState::Idle, RunState::Initializing, always),
    (RunState::Completed, RunState::Initializing, always),
    (RunState::Initializing, RunState::Initializing, always),
    (RunState::Scanning, RunState::Initializing, always),
    (RunState::Organizing, RunState::Initializing, always),
    (RunState::Initializing, RunState::Scanning, ready_to_scan),
    (RunState::Initializing, RunState::Completed, nothing_to_scan),
    (RunState::Initializing, RunState::Idle, always),
    (RunState::Scanning, RunState::Completed, always),
    (RunState::Scanning, RunState::Idle, always),
    (RunState::Completed, RunState::Organizing, ready_to_organize),
    (RunState::Organizing, RunState::Completed, always),
];

impl RunState {
    /// 是否允许切换到 `to`
    pub fn can_transition(self, to: RunState, ctx: &TransitionContext) -> bool {
        TRANSITIONS
            .iter()
            .any(|(from, target, guard)| *from == self && *target == to && guard(ctx))
    }

    /// 切换到 `to`，不合法时返回 [`ScanError::InvalidTransition`]
    pub fn transition(self, to: RunState, ctx: &TransitionContext) -> AppResult<RunState> {
        if self.can_transition(to, ctx) {
            Ok(to)
        } else {
            Err(ScanError::InvalidTransition { from: self, to })
        }
    }
}
