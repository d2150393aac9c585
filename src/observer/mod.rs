// Change notification: compare entity snapshots around a mutation and announce the result

pub mod error;
pub mod notifier;
pub mod sink;
pub mod snapshot;

pub use error::NotifierError;
pub use notifier::{diff, ChangeKind, ChangeNotifier, ChangeType, FieldChange, Notification};
pub use sink::{LogSink, MemorySink, NotificationSink};
pub use snapshot::Snapshot;
