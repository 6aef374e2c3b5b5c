//! Core aggregate and domain event traits.

use common::Version;
use serde::{Serialize, de::DeserializeOwned};
use uuid::Uuid;

/// Trait for domain events.
///
/// Domain events represent facts that have happened in the domain.
/// They are immutable and named in past tense.
pub trait DomainEvent: Serialize + DeserializeOwned + Send + Sync + Clone {
    /// Returns the event type name.
    ///
    /// This is used for outbox routing and consumer filtering.
    fn event_type(&self) -> &'static str;
}

/// Trait for aggregate roots.
///
/// An aggregate is a cluster of domain objects treated as a single unit;
/// the root ensures consistency of changes made within the aggregate.
///
/// Aggregates here are state-stored: operations mutate the aggregate
/// directly and append the corresponding events to a pending log. The
/// repositories drain that log into the outbox in the same transaction
/// that persists the new state, so events are notifications of what
/// happened rather than the source of truth.
pub trait AggregateRoot: Send + Sync + Sized {
    /// The type of events this aggregate records.
    type Event: DomainEvent;

    /// Returns the aggregate type name.
    ///
    /// Used for outbox organization and routing.
    fn aggregate_type() -> &'static str;

    /// Returns the aggregate's unique identifier as a raw UUID.
    ///
    /// Aggregates also expose their typed identifier through an inherent
    /// accessor; this method exists so generic code can address any
    /// aggregate uniformly.
    fn aggregate_id(&self) -> Uuid;

    /// Returns the current version of the aggregate.
    ///
    /// Version is 0 for an aggregate that has never been saved and is
    /// bumped by the repository on each successful save.
    fn version(&self) -> Version;

    /// Sets the aggregate version.
    ///
    /// Called by the repository after a successful save or load.
    fn set_version(&mut self, version: Version);

    /// Returns the events recorded since the last save.
    fn pending_events(&self) -> &[Self::Event];

    /// Drains and returns the pending events.
    ///
    /// Called by the repository when saving; afterwards the pending log
    /// is empty.
    fn take_events(&mut self) -> Vec<Self::Event>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Clone, Serialize, Deserialize)]
    enum TestEvent {
        Created { id: Uuid },
        Renamed { name: String },
    }

    impl DomainEvent for TestEvent {
        fn event_type(&self) -> &'static str {
            match self {
                TestEvent::Created { .. } => "TestCreated",
                TestEvent::Renamed { .. } => "TestRenamed",
            }
        }
    }

    struct TestAggregate {
        id: Uuid,
        name: String,
        version: Version,
        pending: Vec<TestEvent>,
    }

    impl TestAggregate {
        fn create() -> Self {
            let id = Uuid::new_v4();
            let mut aggregate = Self {
                id,
                name: String::new(),
                version: Version::initial(),
                pending: Vec::new(),
            };
            aggregate.pending.push(TestEvent::Created { id });
            aggregate
        }

        fn rename(&mut self, name: impl Into<String>) {
            self.name = name.into();
            self.pending.push(TestEvent::Renamed {
                name: self.name.clone(),
            });
        }
    }

    impl AggregateRoot for TestAggregate {
        type Event = TestEvent;

        fn aggregate_type() -> &'static str {
            "TestAggregate"
        }

        fn aggregate_id(&self) -> Uuid {
            self.id
        }

        fn version(&self) -> Version {
            self.version
        }

        fn set_version(&mut self, version: Version) {
            self.version = version;
        }

        fn pending_events(&self) -> &[TestEvent] {
            &self.pending
        }

        fn take_events(&mut self) -> Vec<TestEvent> {
            std::mem::take(&mut self.pending)
        }
    }

    #[test]
    fn test_pending_events_accumulate_and_drain() {
        let mut aggregate = TestAggregate::create();
        aggregate.rename("widgets");

        assert_eq!(aggregate.pending_events().len(), 2);
        assert_eq!(aggregate.pending_events()[1].event_type(), "TestRenamed");

        let drained = aggregate.take_events();
        assert_eq!(drained.len(), 2);
        assert!(aggregate.pending_events().is_empty());
    }

    #[test]
    fn test_version_bookkeeping() {
        let mut aggregate = TestAggregate::create();
        assert_eq!(aggregate.version(), Version::initial());

        aggregate.set_version(Version::first());
        assert_eq!(aggregate.version(), Version::first());
    }
}
