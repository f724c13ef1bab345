//! Host Pool
//!
//! Per-upload working set of candidate hosts. Built from a copy of the
//! caller's list, shuffled once, then drained from the front so each host is
//! tried at most once per file.

use std::collections::VecDeque;

use rand::seq::SliceRandom;
use rand::Rng;
use url::Url;

#[derive(Debug, Clone)]
pub struct HostPool {
    remaining: VecDeque<Url>,
}

impl HostPool {
    /// Uniformly shuffled copy of `hosts`
    pub fn shuffled<R: Rng + ?Sized>(hosts: &[Url], rng: &mut R) -> Self {
        let mut order = hosts.to_vec();
        order.shuffle(rng);
        Self {
            remaining: order.into(),
        }
    }

    /// Copy of `hosts` drawn in the given order
    pub fn in_order(hosts: &[Url]) -> Self {
        Self {
            remaining: hosts.iter().cloned().collect(),
        }
    }

    /// Draw the next untried host
    pub fn next_host(&mut self) -> Option<Url> {
        self.remaining.pop_front()
    }

    pub fn len(&self) -> usize {
        self.remaining.len()
    }

    pub fn is_empty(&self) -> bool {
        self.remaining.is_empty()
    }
}
