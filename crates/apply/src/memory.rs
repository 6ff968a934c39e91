//! In-memory [`ResourceStore`] with real resource-version checks, a call log
//! and fault injection. Drives the reconciler and batch tests.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Mutex, MutexGuard, PoisonError};

use rgo_core::{Error, LiveObject, ResourceCoordinates, ResourceDocument, ResourceStore, Result};
use serde_json::Value as Json;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Verb {
    Get,
    Create,
    Update,
    Delete,
}

/// One recorded store call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreCall {
    pub verb: Verb,
    pub plural: String,
    pub name: String,
    /// Token carried by an update.
    pub resource_version: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fault {
    Conflict,
    Transport,
    /// Never returns.
    Hang,
    /// Answer a get, then bump the stored version as if someone else wrote in between.
    ConcurrentWrite,
}

type Key = (ResourceCoordinates, String);

#[derive(Debug)]
struct Stored {
    rv: u64,
    raw: Json,
}

#[derive(Debug, Default)]
struct Inner {
    objects: BTreeMap<Key, Stored>,
    last_rv: u64,
    calls: Vec<StoreCall>,
    faults: HashMap<(Verb, String), Fault>,
}

impl Inner {
    fn next_rv(&mut self) -> u64 {
        self.last_rv += 1;
        self.last_rv
    }
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

enum Step<T> {
    Done(Result<T>),
    Hang,
}

impl MemoryStore {
    pub fn new() -> Self { Self::default() }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Make the next and every later `verb` on `name` fail with `fault`.
    pub fn fail(&self, verb: Verb, name: &str, fault: Fault) {
        self.lock().faults.insert((verb, name.to_string()), fault);
    }

    /// Seed an object as if it already existed; returns its resource version.
    pub fn insert(&self, coords: &ResourceCoordinates, name: &str, raw: Json) -> String {
        let mut inner = self.lock();
        let rv = inner.next_rv();
        inner.objects.insert((coords.clone(), name.to_string()), Stored { rv, raw });
        rv.to_string()
    }

    pub fn object(&self, coords: &ResourceCoordinates, name: &str) -> Option<LiveObject> {
        self.lock()
            .objects
            .get(&(coords.clone(), name.to_string()))
            .map(|s| LiveObject { resource_version: Some(s.rv.to_string()), raw: s.raw.clone() })
    }

    pub fn len(&self) -> usize { self.lock().objects.len() }
    pub fn is_empty(&self) -> bool { self.len() == 0 }

    pub fn calls(&self) -> Vec<StoreCall> { self.lock().calls.clone() }

    pub fn count(&self, verb: Verb) -> usize {
        self.lock().calls.iter().filter(|c| c.verb == verb).count()
    }

    /// Creates + updates + deletes.
    pub fn writes(&self) -> usize {
        self.lock().calls.iter().filter(|c| c.verb != Verb::Get).count()
    }

    fn record(inner: &mut Inner, verb: Verb, coords: &ResourceCoordinates, name: &str, rv: Option<String>) -> Option<Fault> {
        inner.calls.push(StoreCall { verb, plural: coords.plural.clone(), name: name.to_string(), resource_version: rv });
        inner.faults.get(&(verb, name.to_string())).copied()
    }

    fn injected<T>(fault: Fault, what: &str) -> Step<T> {
        match fault {
            Fault::Conflict => Step::Done(Err(Error::Conflict(format!("{}: injected conflict", what)))),
            Fault::Transport => Step::Done(Err(Error::Transport(format!("{}: injected transport failure", what)))),
            Fault::Hang => Step::Hang,
            Fault::ConcurrentWrite => Step::Done(Err(Error::Transport(format!("{}: concurrent write only applies to get", what)))),
        }
    }

    fn stored_json(doc: &ResourceDocument, rv: u64) -> Result<Json> {
        let mut raw = doc.to_json().map_err(|e| Error::Transport(format!("encoding {}: {}", doc.name(), e)))?;
        if let Some(meta) = raw.get_mut("metadata").and_then(Json::as_object_mut) {
            meta.insert("resourceVersion".into(), Json::String(rv.to_string()));
        }
        Ok(raw)
    }

    async fn finish<T>(step: Step<T>) -> Result<T> {
        match step {
            Step::Done(r) => r,
            Step::Hang => std::future::pending().await,
        }
    }
}

#[async_trait::async_trait]
impl ResourceStore for MemoryStore {
    async fn get(&self, coords: &ResourceCoordinates, name: &str) -> Result<LiveObject> {
        let step = {
            let mut inner = self.lock();
            let fault = Self::record(&mut inner, Verb::Get, coords, name, None);
            let key = (coords.clone(), name.to_string());
            match fault {
                Some(Fault::ConcurrentWrite) => {
                    let found = inner.objects.get(&key).map(|s| LiveObject { resource_version: Some(s.rv.to_string()), raw: s.raw.clone() });
                    if found.is_some() {
                        let rv = inner.next_rv();
                        if let Some(s) = inner.objects.get_mut(&key) {
                            s.rv = rv;
                        }
                    }
                    Step::Done(found.ok_or_else(|| Error::NotFound(format!("{}/{}", coords.plural, name))))
                }
                Some(f) => Self::injected(f, name),
                None => Step::Done(
                    inner
                        .objects
                        .get(&key)
                        .map(|s| LiveObject { resource_version: Some(s.rv.to_string()), raw: s.raw.clone() })
                        .ok_or_else(|| Error::NotFound(format!("{}/{}", coords.plural, name))),
                ),
            }
        };
        Self::finish(step).await
    }

    async fn create(&self, coords: &ResourceCoordinates, doc: &ResourceDocument) -> Result<()> {
        let step = {
            let mut inner = self.lock();
            let name = doc.name();
            match Self::record(&mut inner, Verb::Create, coords, name, None) {
                Some(f) => Self::injected(f, name),
                None => {
                    let key = (coords.clone(), name.to_string());
                    if inner.objects.contains_key(&key) {
                        Step::Done(Err(Error::Conflict(format!("{}/{} already exists", coords.plural, name))))
                    } else {
                        let rv = inner.next_rv();
                        Step::Done(Self::stored_json(doc, rv).map(|raw| {
                            inner.objects.insert(key, Stored { rv, raw });
                        }))
                    }
                }
            }
        };
        Self::finish(step).await
    }

    async fn update(&self, coords: &ResourceCoordinates, doc: &ResourceDocument) -> Result<()> {
        let step = {
            let mut inner = self.lock();
            let name = doc.name();
            let token = doc.metadata.resource_version.clone();
            match Self::record(&mut inner, Verb::Update, coords, name, token.clone()) {
                Some(f) => Self::injected(f, name),
                None => {
                    let key = (coords.clone(), name.to_string());
                    match inner.objects.get(&key).map(|s| s.rv) {
                        None => Step::Done(Err(Error::NotFound(format!("{}/{}", coords.plural, name)))),
                        Some(current) if token.as_deref() != Some(current.to_string().as_str()) => Step::Done(Err(Error::Conflict(format!(
                            "{}/{}: resourceVersion {} is stale (current {})",
                            coords.plural,
                            name,
                            token.as_deref().unwrap_or("<none>"),
                            current
                        )))),
                        Some(_) => {
                            let rv = inner.next_rv();
                            Step::Done(Self::stored_json(doc, rv).map(|raw| {
                                inner.objects.insert(key, Stored { rv, raw });
                            }))
                        }
                    }
                }
            }
        };
        Self::finish(step).await
    }

    async fn delete(&self, coords: &ResourceCoordinates, name: &str) -> Result<()> {
        let step = {
            let mut inner = self.lock();
            match Self::record(&mut inner, Verb::Delete, coords, name, None) {
                Some(f) => Self::injected(f, name),
                None => match inner.objects.remove(&(coords.clone(), name.to_string())) {
                    Some(_) => Step::Done(Ok(())),
                    None => Step::Done(Err(Error::NotFound(format!("{}/{}", coords.plural, name)))),
                },
            }
        };
        Self::finish(step).await
    }
}
