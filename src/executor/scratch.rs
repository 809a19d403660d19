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

//! Scratch arena for aggregate instance memory
//!
//! All slots of one scan live in a single growable buffer. Slots are never
//! freed individually; the arena is released as a whole when it is dropped.

/// Handle to one slot of a [`ScratchMemory`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InstanceSlot {
    offset: usize,
    size: usize,
}

impl InstanceSlot {
    #[inline]
    pub fn size(&self) -> usize {
        self.size
    }
}

/// Bump-allocated instance memory
#[derive(Debug, Default)]
pub struct ScratchMemory {
    buffer: Vec<u8>,
}

/// Slots start on 8-byte boundaries
const SLOT_ALIGN: usize = 8;

impl ScratchMemory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reserve `size` zeroed bytes
    pub fn alloc(&mut self, size: usize) -> InstanceSlot {
        let offset = self.buffer.len().next_multiple_of(SLOT_ALIGN);
        self.buffer.resize(offset + size, 0);
        InstanceSlot { offset, size }
    }

    #[inline]
    pub fn slot(&self, slot: &InstanceSlot) -> &[u8] {
        &self.buffer[slot.offset..slot.offset + slot.size]
    }

    #[inline]
    pub fn slot_mut(&mut self, slot: &InstanceSlot) -> &mut [u8] {
        &mut self.buffer[slot.offset..slot.offset + slot.size]
    }

    /// Total bytes in use, including alignment padding
    #[inline]
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slots_are_disjoint() {
        let mut scratch = ScratchMemory::new();
        let a = scratch.alloc(9);
        let b = scratch.alloc(16);
        assert_eq!(a.size(), 9);

        scratch.slot_mut(&a).fill(0xAA);
        scratch.slot_mut(&b).fill(0x55);
        assert!(scratch.slot(&a).iter().all(|&x| x == 0xAA));
        assert!(scratch.slot(&b).iter().all(|&x| x == 0x55));
        assert_eq!(scratch.len(), 32);
    }

    #[test]
    fn test_zero_sized_slot() {
        let mut scratch = ScratchMemory::new();
        let slot = scratch.alloc(0);
        assert!(scratch.slot(&slot).is_empty());
        assert!(scratch.is_empty());
    }
}
