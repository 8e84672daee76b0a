// SPDX-FileCopyrightText: 2025 Caspar Water Company
//
// SPDX-License-Identifier: Apache-2.0

//! Mapper pipelines and tabulation over pulse table files

mod error;
pub mod pipeline;
pub mod registry;
pub mod spec;
pub mod stages;
pub mod tabulate;

pub use error::{Error, Result, StageFailure, is_missing_column};
pub use pipeline::{BatchReport, FileOutcome, Pipeline, output_name};
pub use registry::{Mapper, MapperFactory, MapperRegistry};
pub use spec::MapperSpec;
pub use tabulate::tabulate;
