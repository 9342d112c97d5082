//! Viewer state: which center and radius are shown, and which fetch is current.
//!
//! Fetches are keyed by a generation number. Only the newest ticket may
//! replace the displayed features; anything older that comes back late is
//! dropped, so a slow answer for an old radius never overwrites a newer one.

use std::sync::Arc;
use std::thread;

use crossbeam::channel::{self, Receiver, Sender};

use crate::feature::Feature;
use crate::geo::Coordinate;
use crate::source::{fetch_or_empty, FeatureSource};

#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Query {
    pub center: Coordinate,
    pub radius_m: f64,
}

#[derive(Copy, Clone, Debug, PartialEq)]
pub struct FetchTicket {
    pub generation: u64,
    pub query: Query,
}

#[derive(Debug, PartialEq, Eq)]
pub enum Completion {
    Applied,
    Stale,
}

#[derive(Debug, Default)]
pub struct Session {
    center: Option<Coordinate>,
    radius_m: f64,
    requested: Option<Query>,
    generation: u64,
    in_flight: bool,
    features: Vec<Feature>,
}

impl Session {
    pub fn new(radius_m: f64) -> Self {
        Self {
            radius_m,
            ..Default::default()
        }
    }

    pub fn set_center(&mut self, center: Coordinate) {
        self.center = Some(center);
    }

    pub fn set_radius(&mut self, radius_m: f64) {
        self.radius_m = radius_m;
    }

    pub fn center(&self) -> Option<Coordinate> {
        self.center
    }

    pub fn radius(&self) -> f64 {
        self.radius_m
    }

    pub fn features(&self) -> &[Feature] {
        &self.features
    }

    /// True while the latest ticket has not come back.
    pub fn is_loading(&self) -> bool {
        self.in_flight
    }

    /// A ticket for the current center and radius, if they differ from the last request.
    pub fn request(&mut self) -> Option<FetchTicket> {
        let query = Query {
            center: self.center?,
            radius_m: self.radius_m,
        };
        if self.requested == Some(query) {
            return None;
        }
        self.requested = Some(query);
        self.generation += 1;
        self.in_flight = true;
        Some(FetchTicket {
            generation: self.generation,
            query,
        })
    }

    pub fn complete(&mut self, ticket: FetchTicket, features: Vec<Feature>) -> Completion {
        if ticket.generation != self.generation {
            log::debug!(
                "dropping stale response #{} (current #{})",
                ticket.generation,
                self.generation
            );
            return Completion::Stale;
        }
        self.features = features;
        self.in_flight = false;
        Completion::Applied
    }
}

/// Runs fetches on background threads and hands results back over a channel.
pub struct SessionWorker {
    source: Arc<dyn FeatureSource>,
    tx: Sender<(FetchTicket, Vec<Feature>)>,
    rx: Receiver<(FetchTicket, Vec<Feature>)>,
}

impl SessionWorker {
    pub fn new(source: Arc<dyn FeatureSource>) -> Self {
        let (tx, rx) = channel::unbounded();
        Self { source, tx, rx }
    }

    pub fn spawn(&self, ticket: FetchTicket) {
        let source = Arc::clone(&self.source);
        let tx = self.tx.clone();
        thread::spawn(move || {
            let features = fetch_or_empty(&*source, ticket.query.center, ticket.query.radius_m);
            let _ = tx.send((ticket, features));
        });
    }

    pub fn results(&self) -> &Receiver<(FetchTicket, Vec<Feature>)> {
        &self.rx
    }
}
