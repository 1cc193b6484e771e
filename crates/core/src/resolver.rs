// crates/core/src/resolver.rs
//! Turns a job plus the client directory into a map coordinate.
//!
//! Resolution order, first match wins:
//! 1. the job's embedded property snapshot, when it has both `lat` and `lng`
//! 2. the referenced client's property selected by snapshot `uid`, falling
//!    back to the client's first property
//! 3. unresolvable (`None`)

use std::collections::{BTreeMap, HashMap};

use crate::optimizer::RoutableJob;
use crate::types::{Client, Coordinate, Job};

/// Read access to clients by id.
///
/// Callers holding clients in some other shape build a [`ClientIndex`].
pub trait ClientDirectory {
    fn client(&self, id: &str) -> Option<&Client>;
}

impl ClientDirectory for HashMap<String, Client> {
    fn client(&self, id: &str) -> Option<&Client> {
        self.get(id)
    }
}

impl ClientDirectory for BTreeMap<String, Client> {
    fn client(&self, id: &str) -> Option<&Client> {
        self.get(id)
    }
}

impl<D: ClientDirectory + ?Sized> ClientDirectory for &D {
    fn client(&self, id: &str) -> Option<&Client> {
        (**self).client(id)
    }
}

/// Owned id → client index built from a client list.
#[derive(Debug, Clone, Default)]
pub struct ClientIndex {
    clients: HashMap<String, Client>,
}

impl ClientIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.clients.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
    }

    pub fn insert(&mut self, client: Client) {
        self.clients.insert(client.id.clone(), client);
    }
}

impl FromIterator<Client> for ClientIndex {
    fn from_iter<I: IntoIterator<Item = Client>>(iter: I) -> Self {
        Self {
            clients: iter.into_iter().map(|c| (c.id.clone(), c)).collect(),
        }
    }
}

impl ClientDirectory for ClientIndex {
    fn client(&self, id: &str) -> Option<&Client> {
        self.clients.get(id)
    }
}

/// Resolve the coordinate a job should be visited at. `None` means unresolvable.
pub fn resolve<D: ClientDirectory + ?Sized>(job: &Job, directory: &D) -> Option<Coordinate> {
    let snapshot = job.property.as_ref();

    if let Some(coord) = snapshot.and_then(|p| Coordinate::from_parts(p.lat, p.lng)) {
        return Some(coord);
    }

    let client = directory.client(job.client_id.as_deref()?)?;
    let wanted_uid = snapshot.and_then(|p| p.uid.as_deref());
    let property = wanted_uid
        .and_then(|uid| client.properties.iter().find(|p| p.uid == uid))
        .or_else(|| client.properties.first())?;

    property.coordinate()
}

/// Split jobs into routable ones (with their coordinate) and a count of the rest.
pub fn partition_routable<'a, D, I>(jobs: I, directory: &D) -> (Vec<RoutableJob>, usize)
where
    D: ClientDirectory + ?Sized,
    I: IntoIterator<Item = &'a Job>,
{
    let mut routable = Vec::new();
    let mut unroutable = 0;
    for job in jobs {
        match resolve(job, directory) {
            Some(coordinate) => routable.push(RoutableJob::new(job.clone(), coordinate)),
            None => {
                tracing::debug!(job_id = %job.id, "Job has no resolvable coordinate; excluded from route");
                unroutable += 1;
            }
        }
    }
    (routable, unroutable)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{JobStatus, Property, PropertySnapshot};
    use pretty_assertions::assert_eq;

    fn property(uid: &str, lat: Option<f64>, lng: Option<f64>) -> Property {
        Property {
            uid: uid.into(),
            lat,
            lng,
            label: None,
        }
    }

    fn directory() -> HashMap<String, Client> {
        let client = Client {
            id: "c-1".into(),
            name: "Acme".into(),
            properties: vec![
                property("p-1", Some(10.0), Some(20.0)),
                property("p-2", Some(11.0), Some(21.0)),
            ],
        };
        let bare = Client {
            id: "c-2".into(),
            name: "No coords".into(),
            properties: vec![property("p-9", None, None)],
        };
        HashMap::from([(client.id.clone(), client), (bare.id.clone(), bare)])
    }

    fn job() -> Job {
        Job::new("j-1", "Visit", JobStatus::Scheduled)
    }

    #[test]
    fn snapshot_coordinate_wins() {
        let job = job().with_client("c-1").with_property(PropertySnapshot {
            uid: Some("p-2".into()),
            lat: Some(1.0),
            lng: Some(2.0),
            label: None,
        });
        assert_eq!(resolve(&job, &directory()), Some(Coordinate { lat: 1.0, lng: 2.0 }));
    }

    #[test]
    fn snapshot_uid_selects_client_property() {
        let job = job().with_client("c-1").with_property(PropertySnapshot {
            uid: Some("p-2".into()),
            lat: Some(1.0),
            lng: None,
            label: None,
        });
        assert_eq!(resolve(&job, &directory()), Some(Coordinate { lat: 11.0, lng: 21.0 }));
    }

    #[test]
    fn no_snapshot_uses_first_property() {
        let job = job().with_client("c-1");
        assert_eq!(resolve(&job, &directory()), Some(Coordinate { lat: 10.0, lng: 20.0 }));
    }

    #[test]
    fn unknown_uid_falls_back_to_first_property() {
        let job = job().with_client("c-1").with_property(PropertySnapshot {
            uid: Some("gone".into()),
            ..Default::default()
        });
        assert_eq!(resolve(&job, &directory()), Some(Coordinate { lat: 10.0, lng: 20.0 }));
    }

    #[test]
    fn unresolvable_cases() {
        let dir = directory();
        assert_eq!(resolve(&job(), &dir), None, "no client, no snapshot");
        assert_eq!(resolve(&job().with_client("missing"), &dir), None);
        assert_eq!(resolve(&job().with_client("c-2"), &dir), None, "property without coords");

        let invalid = job().with_property(PropertySnapshot {
            lat: Some(123.0),
            lng: Some(0.0),
            ..Default::default()
        });
        assert_eq!(resolve(&invalid, &dir), None);
    }

    #[test]
    fn client_index_and_map_agree() {
        let map = directory();
        let index: ClientIndex = map.values().cloned().collect();
        let job = job().with_client("c-1");
        assert_eq!(resolve(&job, &index), resolve(&job, &map));
        assert_eq!(index.len(), 2);

        let btree: BTreeMap<String, Client> = map.clone().into_iter().collect();
        assert_eq!(resolve(&job, &btree), resolve(&job, &map));
    }

    #[test]
    fn partition_counts_unroutable() {
        let jobs = vec![
            job().with_client("c-1"),
            job().with_client("missing"),
            job().with_client("c-2"),
        ];
        let (routable, unroutable) = partition_routable(&jobs, &directory());
        assert_eq!(routable.len(), 1);
        assert_eq!(unroutable, 2);
    }
}
