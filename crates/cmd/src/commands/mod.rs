// SPDX-FileCopyrightText: 2025 Caspar Water Company
//
// SPDX-License-Identifier: Apache-2.0

pub mod map;
pub mod reduce;
pub mod settings;
pub mod tabulate;

pub use self::map::{map_multi_command, map_single_command};
pub use self::reduce::reduce_command;
pub use self::settings::settings_command;
pub use self::tabulate::{TabulateOptions, tabulate_command};
