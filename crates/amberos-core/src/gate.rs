// ── Fetch gate ──
//
// Maps the current subscriptions to the set of capability groups worth
// fetching this cycle.

use std::fmt;

use amberos_api::Capability;

use crate::subscription::SubscriptionTable;

/// A set of capability groups, stored as a bitmask.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct ActiveSet(u16);

impl ActiveSet {
    pub const fn empty() -> Self {
        Self(0)
    }

    pub fn all() -> Self {
        Capability::ALL.into_iter().collect()
    }

    /// Information and network only.
    pub fn always_on() -> Self {
        Capability::ALL
            .into_iter()
            .filter(|c| c.is_always_on())
            .collect()
    }

    pub(crate) const fn from_bits(bits: u16) -> Self {
        Self(bits)
    }

    pub(crate) const fn bits(self) -> u16 {
        self.0
    }

    pub fn contains(self, capability: Capability) -> bool {
        self.0 & capability.bit() != 0
    }

    pub fn insert(&mut self, capability: Capability) {
        self.0 |= capability.bit();
    }

    pub fn remove(&mut self, capability: Capability) {
        self.0 &= !capability.bit();
    }

    /// Members of `self` that are not in `other`.
    pub fn difference(self, other: Self) -> Self {
        Self(self.0 & !other.0)
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub fn len(self) -> usize {
        self.iter().count()
    }

    pub fn iter(self) -> impl Iterator<Item = Capability> {
        Capability::ALL.into_iter().filter(move |c| self.contains(*c))
    }
}

impl FromIterator<Capability> for ActiveSet {
    fn from_iter<I: IntoIterator<Item = Capability>>(iter: I) -> Self {
        let mut set = Self::empty();
        for cap in iter {
            set.insert(cap);
        }
        set
    }
}

impl fmt::Debug for ActiveSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}

/// Decide which groups to fetch given the current subscriptions.
///
/// Before any entity has ever subscribed every group is active, so the
/// first pass can seed the metadata entities are built from. After that,
/// information and network are always active and every other group is
/// active iff it has a subscriber.
pub fn evaluate(table: &SubscriptionTable) -> ActiveSet {
    if table.is_bootstrapping() {
        return ActiveSet::all();
    }

    let mut active = ActiveSet::always_on();
    for cap in Capability::ALL {
        if table.has_subscribers(cap) {
            active.insert(cap);
        }
    }
    active
}

/// Outcome of comparing two consecutive evaluations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub active: ActiveSet,
    pub activated: ActiveSet,
    pub deactivated: ActiveSet,
}

impl Transition {
    pub fn between(previous: ActiveSet, next: ActiveSet) -> Self {
        Self {
            active: next,
            activated: next.difference(previous),
            deactivated: previous.difference(next),
        }
    }
}
