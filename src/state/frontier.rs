//! The crawl frontier: every unit the crawl has admitted, keyed by canonical URL

use crate::state::{UnitOutcome, UnitState};
use crate::url::{Classification, UrlClassifier};
use crate::{Result, SnapError};
use std::collections::HashMap;

/// A URL admitted to the crawl
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrawlUnit {
    /// The URL exactly as discovered
    pub url: String,
    /// Canonical form, the frontier key
    pub canonical: String,
    /// Link hops from the base URL
    pub depth: u32,
    pub state: UnitState,
    /// Captured HTML, present only when `outcome` is `Captured`
    pub content: Option<String>,
    pub outcome: Option<UnitOutcome>,
    /// Position in discovery order
    pub order: usize,
}

impl CrawlUnit {
    pub fn is_captured(&self) -> bool {
        self.state == UnitState::Done && self.content.is_some()
    }
}

/// A unit ready to be dispatched
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dispatch {
    pub key: String,
    pub url: String,
    pub depth: u32,
}

/// Number of units per state
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrontierCounts {
    pub discovered: usize,
    pub in_flight: usize,
    pub done: usize,
    pub captured: usize,
}

/// Owns every crawl unit and enforces dedup, depth admission and the
/// forward-only unit lifecycle
///
/// Units are never removed. Depth is checked once, when a unit is admitted.
#[derive(Debug)]
pub struct Frontier {
    classifier: UrlClassifier,
    max_depth: u32,
    units: Vec<CrawlUnit>,
    index: HashMap<String, usize>,
    // Every unit before this position has left Discovered
    cursor: usize,
}

impl Frontier {
    pub fn new(classifier: UrlClassifier, max_depth: u32) -> Self {
        Self {
            classifier,
            max_depth,
            units: Vec::new(),
            index: HashMap::new(),
            cursor: 0,
        }
    }

    pub fn classifier(&self) -> &UrlClassifier {
        &self.classifier
    }

    pub fn max_depth(&self) -> u32 {
        self.max_depth
    }

    /// Seeds the frontier with the base URL at depth 0
    ///
    /// Returns false if the base URL is already tracked.
    pub fn admit_base(&mut self) -> bool {
        let canonical = self.classifier.base_canonical().to_string();
        if self.index.contains_key(&canonical) {
            return false;
        }

        let url = self.classifier.base_url().to_string();
        self.insert(url, canonical, 0);
        true
    }

    /// Classifies a link against the frontier without admitting it
    pub fn classify(&self, url: &str) -> Classification {
        self.classifier
            .classify(url, |canonical| self.index.contains_key(canonical))
    }

    /// Admits a discovered link at the given depth
    ///
    /// # Returns
    ///
    /// `true` if a new unit was created. Links beyond the maximum depth, links
    /// the classifier rejects and links already tracked return `false`.
    pub fn admit(&mut self, url: &str, depth: u32) -> bool {
        if depth > self.max_depth {
            return false;
        }

        match self.classify(url) {
            Classification::Admit { canonical } => {
                self.insert(url.to_string(), canonical, depth);
                true
            }
            Classification::Reject(reason) => {
                tracing::trace!("Rejected {} ({})", url, reason);
                false
            }
        }
    }

    fn insert(&mut self, url: String, canonical: String, depth: u32) {
        let order = self.units.len();
        self.index.insert(canonical.clone(), order);
        self.units.push(CrawlUnit {
            url,
            canonical,
            depth,
            state: UnitState::Discovered,
            content: None,
            outcome: None,
            order,
        });
    }

    /// Returns the earliest-discovered unit still waiting to be fetched
    pub fn next_discovered(&self) -> Option<Dispatch> {
        self.units[self.cursor..]
            .iter()
            .find(|unit| unit.state == UnitState::Discovered)
            .map(|unit| Dispatch {
                key: unit.canonical.clone(),
                url: unit.url.clone(),
                depth: unit.depth,
            })
    }

    /// Moves a unit from Discovered to InFlight
    pub fn mark_in_flight(&mut self, key: &str) -> Result<()> {
        self.transition(key, UnitState::InFlight)?;

        while self.cursor < self.units.len() && self.units[self.cursor].state != UnitState::Discovered {
            self.cursor += 1;
        }

        Ok(())
    }

    /// Moves a unit from InFlight to Done and records how it ended
    ///
    /// Content is kept only for `UnitOutcome::Captured`.
    pub fn mark_done(&mut self, key: &str, content: Option<String>, outcome: UnitOutcome) -> Result<()> {
        let position = self.transition(key, UnitState::Done)?;
        let unit = &mut self.units[position];

        unit.outcome = Some(outcome);
        if outcome.is_success() {
            unit.content = content;
        }

        Ok(())
    }

    fn transition(&mut self, key: &str, next: UnitState) -> Result<usize> {
        let position = *self
            .index
            .get(key)
            .ok_or_else(|| SnapError::UnknownUnit(key.to_string()))?;

        let unit = &mut self.units[position];
        if !unit.state.can_transition_to(next) {
            return Err(SnapError::InvalidTransition {
                url: unit.url.clone(),
                from: unit.state,
                to: next,
            });
        }

        unit.state = next;
        Ok(position)
    }

    /// True when no unit is waiting or in flight
    pub fn is_complete(&self) -> bool {
        self.units.iter().all(|unit| unit.state.is_terminal())
    }

    pub fn get(&self, key: &str) -> Option<&CrawlUnit> {
        self.index.get(key).map(|&position| &self.units[position])
    }

    /// All units in discovery order
    pub fn units(&self) -> &[CrawlUnit] {
        &self.units
    }

    pub fn len(&self) -> usize {
        self.units.len()
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    pub fn counts(&self) -> FrontierCounts {
        let mut counts = FrontierCounts::default();
        for unit in &self.units {
            match unit.state {
                UnitState::Discovered => counts.discovered += 1,
                UnitState::InFlight => counts.in_flight += 1,
                UnitState::Done => {
                    counts.done += 1;
                    if unit.is_captured() {
                        counts.captured += 1;
                    }
                }
            }
        }
        counts
    }
}
