// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 实时状态客户端模块
///
/// 订阅服务端的 SSE 状态流，断线后按固定退避重连，
/// 并维护一份终态不回退的本地视图。
pub mod live_status_client;
pub mod reconnect;
