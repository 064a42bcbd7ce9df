//! Title heuristics that pair accessibility windows with window-server entries.
//!
//! Both sides describe the same window but rarely agree exactly: browsers and
//! Electron apps append the active tab or document to the accessibility title
//! while the window server keeps a shorter name. Matching is best effort; with
//! several identically-titled windows the first unclaimed candidate in
//! enumeration order wins, which may pair them crosswise.

use crate::common::collections::HashSet;
use crate::model::WindowServerId;
use crate::switcher::sources::ServerWindow;

const SEGMENT_SEPARATOR: &str = " - ";

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum MatchStrategy {
    Exact,
    /// Accessibility title starts with the window-server title.
    Prefix,
    /// Accessibility title up to the first `" - "` equals the window-server title.
    LeadingSegment,
}

impl MatchStrategy {
    pub const ALL: [MatchStrategy; 3] =
        [MatchStrategy::Exact, MatchStrategy::Prefix, MatchStrategy::LeadingSegment];

    pub fn matches(self, ax_title: &str, server_title: &str) -> bool {
        if server_title.is_empty() {
            return false;
        }
        match self {
            MatchStrategy::Exact => ax_title == server_title,
            MatchStrategy::Prefix => ax_title.starts_with(server_title),
            MatchStrategy::LeadingSegment => ax_title
                .split(SEGMENT_SEPARATOR)
                .next()
                .is_some_and(|segment| segment == server_title),
        }
    }
}

/// Hands out window-server ids so that each one is used at most once per
/// enumeration.
#[derive(Debug)]
pub struct TitleMatcher<'a> {
    candidates: &'a [ServerWindow],
    claimed: HashSet<WindowServerId>,
}

impl<'a> TitleMatcher<'a> {
    pub fn new(candidates: &'a [ServerWindow]) -> Self {
        Self { candidates, claimed: HashSet::default() }
    }

    /// Marks an id resolved by other means so title matching skips it.
    pub fn claim(&mut self, id: WindowServerId) { self.claimed.insert(id); }

    /// Resolves `ax_title` against the candidates, trying each strategy in
    /// order of preference. Unmatched titles get the unresolved sentinel.
    pub fn resolve(&mut self, ax_title: &str) -> WindowServerId {
        for strategy in MatchStrategy::ALL {
            let found = self.candidates.iter().find(|candidate| {
                !self.claimed.contains(&candidate.id) && strategy.matches(ax_title, &candidate.title)
            });
            if let Some(candidate) = found {
                self.claimed.insert(candidate.id);
                return candidate.id;
            }
        }
        WindowServerId::UNRESOLVED
    }
}

/// Loose comparison used when re-locating a window at activation time.
pub fn title_contains_either(a: &str, b: &str) -> bool {
    !a.is_empty() && !b.is_empty() && (a.contains(b) || b.contains(a))
}
