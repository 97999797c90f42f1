// ABOUTME: Bitset tracking which descriptor elements a decode pass has visited.
// ABOUTME: Surfaces absent elements that must be read as implicit nulls exactly once.

use crate::descriptor::SerialDescriptor;

const WORD_BITS: usize = u64::BITS as usize;

/// Tracks visited element indices of one structure during decoding.
///
/// The low 64 indices live in a single word; larger descriptors spill into a
/// vector of words. Bits past `elements_count` in the last word are pre-marked
/// so scanning never reports them.
pub struct ElementMarker<F = fn(&SerialDescriptor, usize) -> bool> {
    descriptor: SerialDescriptor,
    read_if_absent: F,
    lower: u64,
    higher: Vec<u64>,
}

impl<F> ElementMarker<F>
where
    F: FnMut(&SerialDescriptor, usize) -> bool,
{
    /// `read_if_absent` decides whether an element missing from the input
    /// should still be handed to the caller (as an implicit null).
    pub fn new(descriptor: &SerialDescriptor, read_if_absent: F) -> Self {
        let count = descriptor.elements_count();
        let (lower, higher) = if count <= WORD_BITS {
            let lower = if count == WORD_BITS { 0 } else { u64::MAX << count };
            (lower, Vec::new())
        } else {
            (0, high_words(count))
        };
        Self {
            descriptor: descriptor.clone(),
            read_if_absent,
            lower,
            higher,
        }
    }

    pub fn mark(&mut self, index: usize) {
        if index < WORD_BITS {
            self.lower |= 1 << index;
        } else {
            let slot = index / WORD_BITS - 1;
            if let Some(word) = self.higher.get_mut(slot) {
                *word |= 1 << (index % WORD_BITS);
            }
        }
    }

    #[must_use]
    pub fn is_marked(&self, index: usize) -> bool {
        if index < WORD_BITS {
            self.lower & (1 << index) != 0
        } else {
            let slot = index / WORD_BITS - 1;
            self.higher
                .get(slot)
                .map_or(true, |word| word & (1 << (index % WORD_BITS)) != 0)
        }
    }

    /// Returns the next absent element the caller should read, or `None` once
    /// every element has been marked. Each index is marked before the predicate
    /// runs, so no index is reported or examined twice.
    pub fn next_unmarked_index(&mut self) -> Option<usize> {
        while self.lower != u64::MAX {
            let index = (!self.lower).trailing_zeros() as usize;
            self.lower |= 1 << index;
            if (self.read_if_absent)(&self.descriptor, index) {
                return Some(index);
            }
        }
        for slot in 0..self.higher.len() {
            let offset = (slot + 1) * WORD_BITS;
            while self.higher[slot] != u64::MAX {
                let bit = (!self.higher[slot]).trailing_zeros() as usize;
                self.higher[slot] |= 1 << bit;
                let index = offset + bit;
                if (self.read_if_absent)(&self.descriptor, index) {
                    return Some(index);
                }
            }
        }
        None
    }
}

fn high_words(count: usize) -> Vec<u64> {
    let slots = (count - 1) / WORD_BITS;
    let mut words = vec![0u64; slots];
    let in_last = count % WORD_BITS;
    if in_last != 0 {
        if let Some(last) = words.last_mut() {
            *last = u64::MAX << in_last;
        }
    }
    words
}
