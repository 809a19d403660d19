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

//! Scan configuration
//!

/// Configuration options for opening and scanning column tables
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanConfig {
    /// Validate each column payload against its stored CRC32 when the
    /// column is opened
    /// Default: true
    pub verify_checksums: bool,

    /// Rows reconstructed between two cancellation checks
    /// Default: 1024
    pub cancellation_check_interval: usize,

    /// Initial capacity of the per-scan input row buffer
    /// Default: 16
    pub initial_row_capacity: usize,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            verify_checksums: true,
            cancellation_check_interval: 1024,
            initial_row_capacity: 16,
        }
    }
}

impl ScanConfig {
    /// Creates a new ScanConfig with default values
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_verify_checksums(mut self, verify: bool) -> Self {
        self.verify_checksums = verify;
        self
    }

    /// Check for cancellation every `interval` rows (0 is treated as 1)
    pub fn with_cancellation_check_interval(mut self, interval: usize) -> Self {
        self.cancellation_check_interval = interval.max(1);
        self
    }

    pub fn with_initial_row_capacity(mut self, capacity: usize) -> Self {
        self.initial_row_capacity = capacity;
        self
    }
}
