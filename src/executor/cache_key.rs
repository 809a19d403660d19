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

//! Result cache keys

use std::fmt;

use xxhash_rust::xxh3::xxh3_128;

/// 128-bit key identifying a scan's result for caching
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CacheKey(u128);

impl CacheKey {
    pub const fn new(raw: u128) -> Self {
        Self(raw)
    }

    /// Derive a key from arbitrary content (e.g. a serialized plan plus
    /// the table's identity)
    pub fn from_content(content: &[u8]) -> Self {
        Self(xxh3_128(content))
    }

    #[inline]
    pub fn as_u128(&self) -> u128 {
        self.0
    }

    pub fn to_bytes(&self) -> [u8; 16] {
        self.0.to_be_bytes()
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:032x}", self.0)
    }
}
