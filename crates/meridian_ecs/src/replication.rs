//! # Replication Inbox
//!
//! Structural changes decided by a remote authority arrive on network
//! threads as bare ids. They are queued here and replayed on the simulation
//! thread through [`Coordinator::drain_inbox`](crate::Coordinator::drain_inbox),
//! so the world itself is only ever touched by its owning thread.
//!
//! ```text
//! net thread ──ReplicationSender──► [bounded queue] ──drain_inbox──► Coordinator
//! ```

use crossbeam_channel::{bounded, Receiver, SendError, Sender, TrySendError};

use crate::config::EcsConfig;
use crate::ecs::{ComponentTypeId, EntityId};

/// A structural change received from a remote authority.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ReplicationCommand {
    /// Spawn an entity on the authority's id.
    Spawn {
        /// Entity id chosen by the authority.
        id: EntityId,
        /// Debug name.
        name: String,
    },
    /// Kill the entity with this id. Unknown ids are ignored.
    Kill {
        /// Entity id.
        id: EntityId,
    },
    /// Detach a component identified only by its numeric type id.
    RemoveComponent {
        /// Entity id.
        id: EntityId,
        /// Wire component type id.
        type_id: ComponentTypeId,
    },
}

/// Outcome of one drain of the inbox.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ReplayStats {
    /// Commands applied.
    pub applied: usize,
    /// Commands rejected by the world (logged, then dropped).
    pub rejected: usize,
}

impl ReplayStats {
    /// Total commands taken off the queue.
    #[inline]
    #[must_use]
    pub const fn total(&self) -> usize {
        self.applied + self.rejected
    }
}

/// Producer half, handed to network threads. Cheap to clone.
#[derive(Clone, Debug)]
pub struct ReplicationSender {
    sender: Sender<ReplicationCommand>,
}

impl ReplicationSender {
    /// Queues `command`, blocking while the inbox is full.
    ///
    /// # Errors
    ///
    /// Returns the command back if the inbox was dropped.
    pub fn send(&self, command: ReplicationCommand) -> Result<(), SendError<ReplicationCommand>> {
        self.sender.send(command)
    }

    /// Queues `command` without blocking.
    ///
    /// # Errors
    ///
    /// Returns the command back if the inbox is full or was dropped.
    pub fn try_send(
        &self,
        command: ReplicationCommand,
    ) -> Result<(), TrySendError<ReplicationCommand>> {
        self.sender.try_send(command)
    }
}

/// Consumer half, owned by the simulation thread.
pub struct ReplicationInbox {
    sender: Sender<ReplicationCommand>,
    receiver: Receiver<ReplicationCommand>,
}

impl ReplicationInbox {
    /// Creates an inbox holding at most `capacity` pending commands.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (sender, receiver) = bounded(capacity);
        Self { sender, receiver }
    }

    /// Creates an inbox bounded by `config.inbox_capacity`.
    #[must_use]
    pub fn from_config(config: &EcsConfig) -> Self {
        tracing::debug!("replication inbox holds {} commands", config.inbox_capacity);
        Self::new(config.inbox_capacity)
    }

    /// Maximum number of pending commands.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.receiver.capacity().unwrap_or(usize::MAX)
    }

    /// A new producer handle for another thread.
    #[must_use]
    pub fn sender(&self) -> ReplicationSender {
        ReplicationSender {
            sender: self.sender.clone(),
        }
    }

    /// Number of pending commands.
    #[must_use]
    pub fn len(&self) -> usize {
        self.receiver.len()
    }

    /// True when nothing is pending.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.receiver.is_empty()
    }

    /// Takes the next pending command without blocking.
    pub(crate) fn try_next(&self) -> Option<ReplicationCommand> {
        self.receiver.try_recv().ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_commands_arrive_in_order() {
        let inbox = ReplicationInbox::new(8);
        let tx = inbox.sender();
        tx.send(ReplicationCommand::Kill { id: 1 }).unwrap();
        tx.send(ReplicationCommand::Kill { id: 2 }).unwrap();
        assert_eq!(inbox.len(), 2);

        assert_eq!(inbox.try_next(), Some(ReplicationCommand::Kill { id: 1 }));
        assert_eq!(inbox.try_next(), Some(ReplicationCommand::Kill { id: 2 }));
        assert_eq!(inbox.try_next(), None);
        assert!(inbox.is_empty());
    }

    #[test]
    fn test_bounded_try_send() {
        let inbox = ReplicationInbox::new(1);
        let tx = inbox.sender();
        tx.try_send(ReplicationCommand::Kill { id: 0 }).unwrap();
        assert!(matches!(
            tx.try_send(ReplicationCommand::Kill { id: 1 }),
            Err(TrySendError::Full(_))
        ));
    }

    #[test]
    fn test_capacity_comes_from_config() {
        let config = EcsConfig::from_toml_str("inbox_capacity = 2").unwrap();
        let inbox = ReplicationInbox::from_config(&config);
        assert_eq!(inbox.capacity(), 2);

        let tx = inbox.sender();
        tx.try_send(ReplicationCommand::Kill { id: 0 }).unwrap();
        tx.try_send(ReplicationCommand::Kill { id: 1 }).unwrap();
        assert!(matches!(
            tx.try_send(ReplicationCommand::Kill { id: 2 }),
            Err(TrySendError::Full(ReplicationCommand::Kill { id: 2 }))
        ));
        assert_eq!(inbox.len(), 2);
    }

    #[test]
    fn test_send_after_inbox_dropped() {
        let inbox = ReplicationInbox::new(4);
        let tx = inbox.sender();
        drop(inbox);
        assert!(tx.send(ReplicationCommand::Kill { id: 0 }).is_err());
    }

    #[test]
    fn test_senders_on_other_threads() {
        let inbox = ReplicationInbox::new(64);
        let handles: Vec<_> = (0..4)
            .map(|t| {
                let tx = inbox.sender();
                std::thread::spawn(move || {
                    for i in 0..8 {
                        tx.send(ReplicationCommand::Spawn {
                            id: t * 8 + i,
                            name: format!("remote-{t}-{i}"),
                        })
                        .unwrap();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(inbox.len(), 32);
    }

    #[test]
    fn test_replay_stats_total() {
        let stats = ReplayStats {
            applied: 3,
            rejected: 2,
        };
        assert_eq!(stats.total(), 5);
    }
}
