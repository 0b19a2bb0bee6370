// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

pub mod http;
pub mod rpc;

pub use http::{app, AppState};
pub use rpc::{dispatch, RpcFailure, RpcRequest, CODE_METHOD_NOT_FOUND, CODE_SERVER_ERROR};
