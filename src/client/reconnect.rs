// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use std::time::Duration;

/// 连接状态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// 尚未有监听者
    Idle,
    /// 正在建立连接，`attempt` 从 1 开始
    Connecting { attempt: u32 },
    Open,
    /// 等待退避结束后重连
    Backoff { attempt: u32 },
    /// 没有监听者，连接已放弃
    Closed,
}

/// 驱动状态机的事件
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionEvent {
    /// 本地监听者数量变化
    Listeners(usize),
    Connected,
    /// 连接建立失败或已建立的连接断开
    Disconnected,
    BackoffElapsed,
}

/// 状态机要求调用方执行的动作
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionAction {
    Connect,
    Wait(Duration),
    /// 关闭当前连接并停止
    Stop,
    None,
}

/// 重连状态机
///
/// 与具体 I/O 框架无关：调用方上报事件，按返回的动作去连接、等待或停止。
/// 只要还有监听者，断线后总会在固定退避之后重连。
#[derive(Debug)]
pub struct ReconnectMachine {
    state: ConnectionState,
    listeners: usize,
    backoff: Duration,
}

impl ReconnectMachine {
    pub fn new(backoff: Duration) -> Self {
        Self {
            state: ConnectionState::Idle,
            listeners: 0,
            backoff,
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn listeners(&self) -> usize {
        self.listeners
    }

    /// 处理一个事件并返回下一步动作
    pub fn handle(&mut self, event: ConnectionEvent) -> ConnectionAction {
        use ConnectionAction as A;
        use ConnectionState as S;

        if let ConnectionEvent::Listeners(count) = event {
            self.listeners = count;
            if count == 0 {
                return match self.state {
                    S::Idle | S::Closed => A::None,
                    _ => {
                        self.state = S::Closed;
                        A::Stop
                    }
                };
            }
            return match self.state {
                S::Idle | S::Closed => {
                    self.state = S::Connecting { attempt: 1 };
                    A::Connect
                }
                _ => A::None,
            };
        }

        match (self.state, event) {
            (S::Connecting { .. }, ConnectionEvent::Connected) => {
                self.state = S::Open;
                A::None
            }
            (S::Open, ConnectionEvent::Disconnected) => self.back_off(1),
            (S::Connecting { attempt }, ConnectionEvent::Disconnected) => self.back_off(attempt),
            (S::Backoff { attempt }, ConnectionEvent::BackoffElapsed) => {
                if self.listeners == 0 {
                    self.state = S::Closed;
                    return A::Stop;
                }
                self.state = S::Connecting {
                    attempt: attempt.saturating_add(1),
                };
                A::Connect
            }
            // 其余组合是过期事件
            _ => A::None,
        }
    }

    /// 退避结束：先同步最新的监听者数量，没有监听者时直接停止
    pub fn resume(&mut self, listeners: usize) -> ConnectionAction {
        match self.handle(ConnectionEvent::Listeners(listeners)) {
            ConnectionAction::Stop => ConnectionAction::Stop,
            _ => self.handle(ConnectionEvent::BackoffElapsed),
        }
    }

    fn back_off(&mut self, attempt: u32) -> ConnectionAction {
        if self.listeners == 0 {
            self.state = ConnectionState::Closed;
            return ConnectionAction::Stop;
        }
        self.state = ConnectionState::Backoff { attempt };
        ConnectionAction::Wait(self.backoff)
    }
}
