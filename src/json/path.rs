// ABOUTME: Tracks the structural location of the streaming decoder for error messages.
// ABOUTME: Renders paths like `$.users[2].name` or `$.scores['alice']`.

use crate::descriptor::{SerialDescriptor, SerialKind};
use std::fmt::Write as _;

const NO_INDEX: isize = -1;
const MAP_KEY: isize = -2;

enum Segment {
    Descriptor(SerialDescriptor),
    MapKey(String),
    // A map key slot whose key is no longer live.
    Tombstone,
}

/// Stack of open structures with the element index inside each.
///
/// Map keys occupy their own slot above the map descriptor; the slot is
/// tombstoned when the next key starts so stale keys never show up in
/// diagnostics.
#[derive(Default)]
pub(crate) struct JsonPath {
    segments: Vec<Segment>,
    indices: Vec<isize>,
}

impl JsonPath {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn push_descriptor(&mut self, descriptor: &SerialDescriptor) {
        self.segments.push(Segment::Descriptor(descriptor.clone()));
        self.indices.push(NO_INDEX);
    }

    pub(crate) fn update_descriptor_index(&mut self, index: usize) {
        if let Some(slot) = self.indices.last_mut() {
            *slot = isize::try_from(index).unwrap_or(NO_INDEX);
        }
    }

    pub(crate) fn update_current_map_key(&mut self, key: String) {
        if self.indices.last() == Some(&MAP_KEY) {
            if let Some(segment) = self.segments.last_mut() {
                *segment = Segment::MapKey(key);
            }
        } else {
            self.segments.push(Segment::MapKey(key));
            self.indices.push(MAP_KEY);
        }
    }

    pub(crate) fn reset_current_map_key(&mut self) {
        if self.indices.last() == Some(&MAP_KEY) {
            if let Some(segment) = self.segments.last_mut() {
                *segment = Segment::Tombstone;
            }
        }
    }

    pub(crate) fn pop_descriptor(&mut self) {
        if self.indices.last() == Some(&MAP_KEY) {
            self.segments.pop();
            self.indices.pop();
        }
        self.segments.pop();
        self.indices.pop();
    }

    pub(crate) fn render(&self) -> String {
        let mut out = String::from("$");
        for (segment, &index) in self.segments.iter().zip(&self.indices) {
            match segment {
                Segment::Descriptor(descriptor) => {
                    if descriptor.kind() == SerialKind::LIST {
                        if index != NO_INDEX {
                            let _ = write!(out, "[{index}]");
                        }
                    } else if let Ok(index) = usize::try_from(index) {
                        if let Ok(name) = descriptor.try_element_name(index) {
                            let _ = write!(out, ".{name}");
                        }
                    }
                }
                Segment::MapKey(key) => {
                    let _ = write!(out, "['{key}']");
                }
                Segment::Tombstone => {}
            }
        }
        out
    }
}
