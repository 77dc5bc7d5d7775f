use std::collections::BTreeMap;
use std::collections::VecDeque;
use std::ops::Bound;

use async_channel::Sender;
use async_channel::TrySendError;
use async_lock::RwLock;
use async_trait::async_trait;
use futures::future;
use futures::stream;
use futures::stream::StreamExt;
use serde_json::Value;
use tracing::debug;
use tracing::trace;
use tracing::warn;

use crate::backend::decode_continue;
use crate::backend::encode_continue;
use crate::key::set_object_revision;
use crate::ListResult;
use crate::SelectionPredicate;
use crate::StorageBackend;
use crate::StorageError;
use crate::WatchEvent;
use crate::WatchEventType;
use crate::WatchStream;

pub const DEFAULT_EVENT_WINDOW: usize = 1000;
pub const DEFAULT_WATCH_CAPACITY: usize = 100;

#[derive(Debug)]
struct Entry {
    revision: u64,
    object: Value,
}

#[derive(Debug)]
struct Watcher {
    prefix: String,
    sender: Sender<WatchEvent>,
}

#[derive(Debug, Default)]
struct State {
    items: BTreeMap<String, Entry>,
    revision: u64,
    history: VecDeque<WatchEvent>,
    watchers: Vec<Watcher>,
}

impl State {
    fn next_revision(&mut self) -> u64 {
        self.revision += 1;
        self.revision
    }

    fn publish(&mut self, event: WatchEvent, window: usize) {
        self.watchers.retain(|watcher| {
            if !event.key.starts_with(&watcher.prefix) {
                return !watcher.sender.is_closed();
            }
            match watcher.sender.try_send(event.clone()) {
                Ok(()) => true,
                Err(TrySendError::Full(_)) => {
                    warn!(
                        prefix = %watcher.prefix,
                        revision = event.revision,
                        "watcher fell behind, closing"
                    );
                    false
                }
                Err(TrySendError::Closed(_)) => {
                    trace!(prefix = %watcher.prefix, "dropping closed watcher");
                    false
                }
            }
        });

        if window == 0 {
            return;
        }
        if self.history.len() == window {
            self.history.pop_front();
        }
        self.history.push_back(event);
    }

    /// first revision that can still be replayed
    fn oldest_replayable(&self) -> u64 {
        self.history
            .front()
            .map(|event| event.revision)
            .unwrap_or(self.revision + 1)
    }
}

/// Non durable backend keeping all objects in a sorted map.
/// A bounded window of past events allows watches to resume from a recent revision.
/// Each watcher buffers at most `watch_capacity` live events; a watcher that
/// falls further behind is closed and its stream ends after the buffered events.
#[derive(Debug)]
pub struct InMemoryStorage {
    state: RwLock<State>,
    event_window: usize,
    watch_capacity: usize,
}

impl Default for InMemoryStorage {
    fn default() -> Self {
        Self::new(DEFAULT_EVENT_WINDOW)
    }
}

impl InMemoryStorage {
    pub fn new(event_window: usize) -> Self {
        Self {
            state: RwLock::new(State::default()),
            event_window,
            watch_capacity: DEFAULT_WATCH_CAPACITY,
        }
    }

    pub fn with_watch_capacity(mut self, capacity: usize) -> Self {
        self.watch_capacity = capacity.max(1);
        self
    }

    pub async fn watcher_count(&self) -> usize {
        self.state.read().await.watchers.len()
    }

    pub async fn len(&self) -> usize {
        self.state.read().await.items.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.state.read().await.items.is_empty()
    }
}

#[async_trait]
impl StorageBackend for InMemoryStorage {
    async fn create(&self, key: &str, mut obj: Value) -> Result<Value, StorageError> {
        let mut state = self.state.write().await;
        if state.items.contains_key(key) {
            return Err(StorageError::AlreadyExists {
                key: key.to_owned(),
            });
        }

        let revision = state.next_revision();
        set_object_revision(key, &mut obj, revision)?;
        debug!(key, revision, "create");
        state.items.insert(
            key.to_owned(),
            Entry {
                revision,
                object: obj.clone(),
            },
        );
        state.publish(
            WatchEvent {
                event_type: WatchEventType::Added,
                object: obj.clone(),
                prev_object: None,
                key: key.to_owned(),
                revision,
            },
            self.event_window,
        );
        Ok(obj)
    }

    async fn get(&self, key: &str) -> Result<Value, StorageError> {
        let state = self.state.read().await;
        state
            .items
            .get(key)
            .map(|entry| entry.object.clone())
            .ok_or_else(|| StorageError::NotFound {
                key: key.to_owned(),
            })
    }

    async fn update(
        &self,
        key: &str,
        mut obj: Value,
        expected_revision: Option<u64>,
    ) -> Result<Value, StorageError> {
        let mut state = self.state.write().await;
        let (actual, previous) = match state.items.get(key) {
            Some(entry) => (entry.revision, entry.object.clone()),
            None => {
                return Err(StorageError::NotFound {
                    key: key.to_owned(),
                })
            }
        };
        if let Some(expected) = expected_revision {
            if expected != actual {
                debug!(key, expected, actual, "update conflict");
                return Err(StorageError::Conflict {
                    key: key.to_owned(),
                    expected,
                    actual,
                });
            }
        }

        let revision = state.next_revision();
        set_object_revision(key, &mut obj, revision)?;
        debug!(key, revision, "update");
        state.items.insert(
            key.to_owned(),
            Entry {
                revision,
                object: obj.clone(),
            },
        );
        state.publish(
            WatchEvent {
                event_type: WatchEventType::Modified,
                object: obj.clone(),
                prev_object: Some(previous),
                key: key.to_owned(),
                revision,
            },
            self.event_window,
        );
        Ok(obj)
    }

    async fn delete(
        &self,
        key: &str,
        expected_revision: Option<u64>,
    ) -> Result<Value, StorageError> {
        let mut state = self.state.write().await;
        let actual = match state.items.get(key) {
            Some(entry) => entry.revision,
            None => {
                return Err(StorageError::NotFound {
                    key: key.to_owned(),
                })
            }
        };
        if let Some(expected) = expected_revision {
            if expected != actual {
                return Err(StorageError::Conflict {
                    key: key.to_owned(),
                    expected,
                    actual,
                });
            }
        }

        let removed = match state.items.remove(key) {
            Some(entry) => entry.object,
            None => {
                return Err(StorageError::NotFound {
                    key: key.to_owned(),
                })
            }
        };
        let revision = state.next_revision();
        debug!(key, revision, "delete");

        let mut last_state = removed.clone();
        set_object_revision(key, &mut last_state, revision)?;
        state.publish(
            WatchEvent {
                event_type: WatchEventType::Deleted,
                object: last_state,
                prev_object: None,
                key: key.to_owned(),
                revision,
            },
            self.event_window,
        );
        Ok(removed)
    }

    async fn list(
        &self,
        prefix: &str,
        predicate: &SelectionPredicate,
    ) -> Result<ListResult, StorageError> {
        let state = self.state.read().await;

        let start = match &predicate.continue_token {
            Some(token) => {
                let (_, start) = decode_continue(token)?;
                if !start.starts_with(prefix) {
                    return Err(StorageError::InvalidContinue(token.clone()));
                }
                Bound::Excluded(start)
            }
            None => Bound::Unbounded,
        };
        let lower = match &start {
            Bound::Excluded(key) => Bound::Excluded(key.as_str()),
            _ => Bound::Included(prefix),
        };
        let range = (lower, Bound::<&str>::Unbounded);

        let limit = predicate.limit.filter(|limit| *limit > 0).map(|l| l as usize);
        let mut items = vec![];
        let mut last_key: Option<&str> = None;
        let mut remaining: i64 = 0;

        for (key, entry) in state
            .items
            .range::<str, _>(range)
            .take_while(|(key, _)| key.starts_with(prefix))
        {
            if !predicate.matches(&entry.object)? {
                continue;
            }
            match limit {
                Some(limit) if items.len() >= limit => remaining += 1,
                _ => {
                    items.push(entry.object.clone());
                    last_key = Some(key.as_str());
                }
            }
        }

        let (continue_token, remaining_item_count) = match last_key {
            Some(last) if remaining > 0 => (
                Some(encode_continue(state.revision, last)?),
                Some(remaining),
            ),
            _ => (None, None),
        };
        trace!(prefix, count = items.len(), remaining, "list");

        Ok(ListResult {
            items,
            revision: state.revision,
            continue_token,
            remaining_item_count,
        })
    }

    async fn watch(
        &self,
        prefix: &str,
        since_revision: Option<u64>,
        predicate: SelectionPredicate,
    ) -> Result<WatchStream, StorageError> {
        let mut state = self.state.write().await;

        let replay: Vec<WatchEvent> = match since_revision {
            Some(since) if since < state.revision => {
                let oldest = state.oldest_replayable();
                if since + 1 < oldest {
                    return Err(StorageError::TooOldRevision {
                        requested: since,
                        oldest,
                    });
                }
                state
                    .history
                    .iter()
                    .filter(|event| event.revision > since && event.key.starts_with(prefix))
                    .cloned()
                    .collect()
            }
            _ => vec![],
        };

        state.watchers.retain(|watcher| !watcher.sender.is_closed());
        let (sender, receiver) = async_channel::bounded(self.watch_capacity);
        state.watchers.push(Watcher {
            prefix: prefix.to_owned(),
            sender,
        });
        debug!(prefix, ?since_revision, replay = replay.len(), "watch started");

        let events = stream::iter(replay)
            .chain(receiver)
            .filter_map(move |event| {
                let (key, revision) = (event.key.clone(), event.revision);
                let filtered = match event.filter(&predicate) {
                    Ok(filtered) => filtered,
                    Err(err) => {
                        warn!(%err, %key, "watch event cannot be filtered");
                        Some(WatchEvent::error(&key, revision, 500, err.to_string()))
                    }
                };
                future::ready(filtered)
            })
            .boxed();

        // an error event is the last one a watcher sees
        let events = stream::unfold(Some(events), |events| async move {
            let mut events = events?;
            let event = events.next().await?;
            let rest = if event.is_error() { None } else { Some(events) };
            Some((event, rest))
        });

        Ok(events.boxed())
    }

    async fn current_revision(&self) -> u64 {
        self.state.read().await.revision
    }
}
