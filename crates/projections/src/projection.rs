//! Core projection trait.

use event_store::EventEnvelope;

use crate::Result;

/// Turns stored events into a read model, one event at a time.
///
/// `apply` is pure: it receives the current model (if any) and returns the
/// next one. Re-applying an event the model already reflects must return
/// the model unchanged.
pub trait Projection: Send + Sync {
    /// The read model this projection maintains.
    type Model: Clone + Send + Sync;

    /// Returns the name of this projection.
    fn name(&self) -> &'static str;

    /// Folds one event into the model.
    fn apply(&self, event: &EventEnvelope, current: Option<Self::Model>) -> Result<Self::Model>;
}

/// Applies `events` left to right starting from `current`.
///
/// Returns `current` untouched when `events` is empty.
pub fn fold<P: Projection>(
    projection: &P,
    current: Option<P::Model>,
    events: &[EventEnvelope],
) -> Result<Option<P::Model>> {
    events.iter().try_fold(current, |model, event| {
        projection.apply(event, model).map(Some)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::AggregateId;
    use event_store::Version;

    /// Counts events, skipping versions it has already seen.
    struct Counting;

    impl Projection for Counting {
        type Model = (u32, Version);

        fn name(&self) -> &'static str {
            "Counting"
        }

        fn apply(&self, event: &EventEnvelope, current: Option<Self::Model>) -> Result<Self::Model> {
            match current {
                Some((count, version)) if version >= event.version => Ok((count, version)),
                Some((count, _)) => Ok((count + 1, event.version)),
                None => Ok((1, event.version)),
            }
        }
    }

    fn event(version: i64) -> EventEnvelope {
        EventEnvelope::builder()
            .aggregate_id(AggregateId::new())
            .aggregate_type("Test")
            .event_type("Ticked")
            .version(Version::new(version))
            .payload_raw(serde_json::json!({}))
            .build()
            .unwrap()
    }

    #[test]
    fn fold_of_nothing_keeps_current() {
        assert_eq!(fold(&Counting, None, &[]).unwrap(), None);
        let current = Some((3, Version::new(3)));
        assert_eq!(fold(&Counting, current, &[]).unwrap(), current);
    }

    #[test]
    fn fold_matches_one_at_a_time() {
        let events: Vec<_> = (1..=4).map(event).collect();

        let batch = fold(&Counting, None, &events).unwrap();
        let stepwise = events
            .iter()
            .fold(None, |model, e| Some(Counting.apply(e, model).unwrap()));

        assert_eq!(batch, stepwise);
        assert_eq!(batch, Some((4, Version::new(4))));
    }
}
