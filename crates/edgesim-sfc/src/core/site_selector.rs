//! Selection of candidate sites by network delay.

use std::cell::RefCell;
use std::collections::BTreeSet;
use std::rc::Rc;

use edgesim_core::Id;

use crate::core::network_map::NetworkMap;

#[derive(Clone)]
struct SiteEntry {
    id: Id,
    user_hosting_only: bool,
}

/// Ranks candidate sites by network delay from a reference site.
///
/// Sites reserved for user hosting and sites listed as excluded are never
/// returned. The selector is pure with respect to resource state: capacity
/// is checked by the caller at admission time.
pub struct DatacenterSelector {
    sites: Vec<SiteEntry>,
    network: Rc<RefCell<NetworkMap>>,
}

impl DatacenterSelector {
    pub fn new(network: Rc<RefCell<NetworkMap>>) -> Self {
        Self {
            sites: Vec::new(),
            network,
        }
    }

    pub fn add_site(&mut self, id: Id, user_hosting_only: bool) {
        self.sites.push(SiteEntry { id, user_hosting_only });
    }

    /// Returns all known placement sites (user-hosting sites excluded) in
    /// first-seen order.
    pub fn placement_sites(&self) -> Vec<Id> {
        self.sites
            .iter()
            .filter(|s| !s.user_hosting_only)
            .map(|s| s.id)
            .collect()
    }

    /// Returns the untried site with minimum delay from `reference`.
    ///
    /// Ties are broken by first-seen site ordering. Returns `None` when no
    /// untried candidate remains.
    pub fn next_candidate(&self, reference: Id, excluded: &BTreeSet<Id>) -> Option<Id> {
        let network = self.network.borrow();
        let mut result = None;
        let mut best_delay = f64::MAX;
        for site in &self.sites {
            if site.user_hosting_only || excluded.contains(&site.id) {
                continue;
            }
            let delay = network.delay(reference, site.id);
            if delay < best_delay {
                best_delay = delay;
                result = Some(site.id);
            }
        }
        result
    }
}
