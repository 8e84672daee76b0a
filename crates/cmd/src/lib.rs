// SPDX-FileCopyrightText: 2025 Caspar Water Company
//
// SPDX-License-Identifier: Apache-2.0

//! Command implementations behind the `pulsemap` binary

pub mod commands;
pub mod common;
pub mod error_utils;
