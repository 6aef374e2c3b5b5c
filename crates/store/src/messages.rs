//! Conversion of drained aggregate events into outbox messages.

use domain::{AggregateRoot, DomainEvent, RepositoryError};
use outbox::OutboxMessage;

/// Drains the aggregate's pending events and wraps each in an outbox
/// message. Repositories call this inside the save path so the messages
/// land in the same transaction as the state change.
pub(crate) fn drain_messages<A: AggregateRoot>(
    aggregate: &mut A,
) -> Result<Vec<OutboxMessage>, RepositoryError> {
    let events = aggregate.take_events();
    let mut messages = Vec::with_capacity(events.len());
    for event in events {
        let payload = serde_json::to_value(&event)?;
        messages.push(
            OutboxMessage::builder()
                .aggregate_type(A::aggregate_type())
                .aggregate_id(aggregate.aggregate_id())
                .event_type(event.event_type())
                .payload(payload)
                .build(),
        );
    }
    Ok(messages)
}
