use std::collections::{BTreeMap, HashSet};

use crate::text::sort_key;

/// What happens once the cap is reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Truncation {
    /// Keep the first `cap` entries, refuse the rest.
    FirstN,
    /// Keep the `cap` highest-ranked entries; equal ranks keep the earlier one.
    TopK,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ordering {
    CountDesc,
    KeyAsc,
    Insertion,
}

/// The count an extraction result is ranked by.
pub trait Rank {
    fn rank(&self) -> u64;
}

impl Rank for u64 {
    fn rank(&self) -> u64 {
        *self
    }
}

impl Rank for usize {
    fn rank(&self) -> u64 {
        *self as u64
    }
}

impl<T> Rank for Vec<T> {
    fn rank(&self) -> u64 {
        self.len() as u64
    }
}

impl Rank for () {
    fn rank(&self) -> u64 {
        0
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Admission {
    Accepted,
    Duplicate,
    Rejected,
    Evicted(String),
}

#[derive(Debug, Clone)]
pub struct Entry<V> {
    pub key: String,
    pub value: V,
    pub rank: u64,
    seq: u64,
}

#[derive(Debug)]
pub struct Accumulator<V> {
    entries: Vec<Entry<V>>,
    seen: HashSet<String>,
    cap: usize,
    truncation: Truncation,
    next_seq: u64,
}

impl<V> Accumulator<V> {
    pub fn new(cap: usize, truncation: Truncation) -> Self {
        Accumulator {
            entries: Vec::new(),
            seen: HashSet::new(),
            cap,
            truncation,
            next_seq: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn sorted(&self, ordering: Ordering) -> Vec<&Entry<V>> {
        let mut out: Vec<&Entry<V>> = self.entries.iter().collect();
        match ordering {
            Ordering::CountDesc => out.sort_by(|a, b| b.rank.cmp(&a.rank).then(a.seq.cmp(&b.seq))),
            Ordering::KeyAsc => out.sort_by(|a, b| {
                sort_key(&a.key)
                    .cmp(&sort_key(&b.key))
                    .then_with(|| a.key.cmp(&b.key))
            }),
            Ordering::Insertion => out.sort_by_key(|e| e.seq),
        }
        out
    }
}

impl<V: Rank> Accumulator<V> {
    /// A key is taken at most once per run, even after it was evicted.
    pub fn insert(&mut self, key: impl Into<String>, value: V) -> Admission {
        let key = key.into();
        if !self.seen.insert(key.clone()) {
            return Admission::Duplicate;
        }
        let entry = Entry {
            rank: value.rank(),
            key,
            value,
            seq: self.next_seq,
        };
        self.next_seq += 1;

        if self.entries.len() < self.cap {
            self.entries.push(entry);
            return Admission::Accepted;
        }
        match self.truncation {
            Truncation::FirstN => Admission::Rejected,
            Truncation::TopK => {
                // weakest = lowest rank, latest arrival among equals
                let weakest = self
                    .entries
                    .iter()
                    .enumerate()
                    .min_by(|(_, a), (_, b)| a.rank.cmp(&b.rank).then(b.seq.cmp(&a.seq)))
                    .map(|(i, _)| i);
                match weakest {
                    Some(i) if entry.rank > self.entries[i].rank => {
                        let old = std::mem::replace(&mut self.entries[i], entry);
                        Admission::Evicted(old.key)
                    }
                    _ => Admission::Rejected,
                }
            }
        }
    }
}

/// One accumulator per bucket; each bucket becomes its own report page.
#[derive(Debug)]
pub struct Buckets<B: Ord, V> {
    buckets: BTreeMap<B, Accumulator<V>>,
    cap: usize,
    truncation: Truncation,
}

impl<B: Ord, V: Rank> Buckets<B, V> {
    pub fn new(cap: usize, truncation: Truncation) -> Self {
        Buckets {
            buckets: BTreeMap::new(),
            cap,
            truncation,
        }
    }

    pub fn insert(&mut self, bucket: B, key: impl Into<String>, value: V) -> Admission {
        let (cap, truncation) = (self.cap, self.truncation);
        self.buckets
            .entry(bucket)
            .or_insert_with(|| Accumulator::new(cap, truncation))
            .insert(key, value)
    }

    /// Makes sure `bucket` exists, even if nothing lands in it.
    pub fn ensure(&mut self, bucket: B) {
        let (cap, truncation) = (self.cap, self.truncation);
        self.buckets
            .entry(bucket)
            .or_insert_with(|| Accumulator::new(cap, truncation));
    }

    pub fn iter(&self) -> impl Iterator<Item = (&B, &Accumulator<V>)> {
        self.buckets.iter()
    }

    pub fn total(&self) -> usize {
        self.buckets.values().map(Accumulator::len).sum()
    }
}
