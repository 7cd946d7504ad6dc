//! Mailbox summaries returned by STAT and LIST.

/// Result of STAT: message count and total mailbox size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Stat {
    /// Number of messages in the maildrop.
    pub count: u32,
    /// Total size in octets.
    pub octets: u64,
}

/// Result of LIST: message sizes keyed by sequence number.
///
/// Entries keep the order the server listed them in. Sequence numbers are
/// unique; inserting an existing one replaces its size in place.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Listing {
    entries: Vec<(u32, u64)>,
}

impl Listing {
    /// Creates an empty listing.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Records a message size.
    pub fn insert(&mut self, seq: u32, size: u64) {
        if let Some(entry) = self.entries.iter_mut().find(|(s, _)| *s == seq) {
            entry.1 = size;
        } else {
            self.entries.push((seq, size));
        }
    }

    /// Number of listed messages.
    #[must_use]
    pub fn count(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if no messages were listed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Size of message `seq`, if listed.
    #[must_use]
    pub fn size_of(&self, seq: u32) -> Option<u64> {
        self.entries
            .iter()
            .find_map(|&(s, size)| (s == seq).then_some(size))
    }

    /// Sequence numbers in listing order.
    pub fn seqs(&self) -> impl Iterator<Item = u32> + '_ {
        self.entries.iter().map(|&(seq, _)| seq)
    }

    /// `(seq, size)` pairs in listing order.
    pub fn iter(&self) -> impl Iterator<Item = (u32, u64)> + '_ {
        self.entries.iter().copied()
    }

    /// Total size of all listed messages.
    #[must_use]
    pub fn total_octets(&self) -> u64 {
        self.entries.iter().map(|&(_, size)| size).sum()
    }
}

impl FromIterator<(u32, u64)> for Listing {
    fn from_iter<I: IntoIterator<Item = (u32, u64)>>(iter: I) -> Self {
        let mut listing = Self::new();
        for (seq, size) in iter {
            listing.insert(seq, size);
        }
        listing
    }
}
