//! Per-state transition tables.
//!
//! Every table has a `default` destination, taken by a segment that matches
//! no literal, and an `exit` destination, taken by an empty segment. Literal
//! comparison ignores case, including non-ASCII letters.

use std::collections::HashMap;

use super::path::{eq_ignore_case, fold_case};

/// Largest literal count served by a linear scan.
pub const LINEAR_THRESHOLD: usize = 4;

#[derive(Debug, Clone)]
pub enum JumpTable {
    ZeroEntry {
        default: usize,
        exit: usize,
    },
    Linear {
        entries: Box<[(String, usize)]>,
        default: usize,
        exit: usize,
    },
    /// Keys are stored case-folded.
    Dictionary {
        map: HashMap<String, usize>,
        default: usize,
        exit: usize,
    },
}

impl JumpTable {
    #[must_use]
    pub fn destination(&self, segment: &str) -> usize {
        match self {
            Self::ZeroEntry { default, exit } => {
                if segment.is_empty() {
                    *exit
                } else {
                    *default
                }
            }
            Self::Linear {
                entries,
                default,
                exit,
            } => {
                if segment.is_empty() {
                    return *exit;
                }
                entries
                    .iter()
                    .find(|(text, _)| eq_ignore_case(text, segment))
                    .map_or(*default, |(_, dest)| *dest)
            }
            Self::Dictionary { map, default, exit } => {
                if segment.is_empty() {
                    return *exit;
                }
                map.get(&fold_case(segment))
                    .copied()
                    .unwrap_or(*default)
            }
        }
    }

    #[must_use]
    pub const fn default_destination(&self) -> usize {
        match self {
            Self::ZeroEntry { default, .. }
            | Self::Linear { default, .. }
            | Self::Dictionary { default, .. } => *default,
        }
    }

    #[must_use]
    pub const fn exit_destination(&self) -> usize {
        match self {
            Self::ZeroEntry { exit, .. }
            | Self::Linear { exit, .. }
            | Self::Dictionary { exit, .. } => *exit,
        }
    }
}

#[derive(Debug)]
pub struct JumpTableBuilder {
    entries: Vec<(String, usize)>,
    default: usize,
    exit: usize,
}

impl JumpTableBuilder {
    #[must_use]
    pub const fn new(default: usize, exit: usize) -> Self {
        Self {
            entries: Vec::new(),
            default,
            exit,
        }
    }

    /// Add a literal transition. Later entries for the same text (ignoring
    /// case) are ignored.
    pub fn add_entry(&mut self, text: &str, destination: usize) {
        if !self
            .entries
            .iter()
            .any(|(t, _)| eq_ignore_case(t, text))
        {
            self.entries.push((text.to_string(), destination));
        }
    }

    #[must_use]
    pub fn build(self) -> JumpTable {
        let Self {
            entries,
            default,
            exit,
        } = self;
        match entries.len() {
            0 => JumpTable::ZeroEntry { default, exit },
            n if n <= LINEAR_THRESHOLD => JumpTable::Linear {
                entries: entries.into_boxed_slice(),
                default,
                exit,
            },
            _ => JumpTable::Dictionary {
                map: entries
                    .into_iter()
                    .map(|(text, dest)| (fold_case(&text), dest))
                    .collect(),
                default,
                exit,
            },
        }
    }
}
