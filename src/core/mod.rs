// Copyright 2025 Stoolap Contributors
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Core types and definitions
//!
//! - [`DataType`] - SQL value type tags
//! - [`Value`] - Runtime values with type information
//! - [`encode_value`] / [`decode_value`] - Binary value codec
//! - [`Error`] - Error type shared by every module

pub mod encoding;
pub mod error;
pub mod types;
pub mod value;

pub use encoding::{decode_value, encode_value};
pub use error::{Error, Result};
pub use types::DataType;
pub use value::{parse_timestamp, Value};
