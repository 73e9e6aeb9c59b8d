use std::{
    collections::VecDeque,
    sync::{
        Arc, Mutex, PoisonError,
        atomic::{AtomicUsize, Ordering},
    },
};

use crate::{Payload, Port, Result, SimulationError};

/// FIFO of payloads shared between a machine's listener and its tick loop.
///
/// Cloning yields another handle onto the same queue.
#[derive(Clone, Debug)]
pub struct Inbox {
    owner: Port,
    queue: Arc<Mutex<VecDeque<Payload>>>,
    dropped: Arc<AtomicUsize>,
}

impl Inbox {
    pub fn new(owner: Port) -> Self {
        Self {
            owner,
            queue: Arc::new(Mutex::new(VecDeque::new())),
            dropped: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn push(&self, payload: Payload) -> Result<()> {
        self.queue
            .lock()
            .map_err(|_| SimulationError::PoisonedInbox(self.owner))?
            .push_back(payload);
        Ok(())
    }

    /// Pops the oldest payload together with the queue length left behind.
    pub fn pop(&self) -> Result<Option<(Payload, usize)>> {
        let mut queue = self
            .queue
            .lock()
            .map_err(|_| SimulationError::PoisonedInbox(self.owner))?;
        Ok(queue.pop_front().map(|payload| (payload, queue.len())))
    }

    /// Reads through a poisoned lock: the length is still meaningful even
    /// though [`Inbox::push`] and [`Inbox::pop`] refuse to proceed.
    pub fn len(&self) -> usize {
        self.queue
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Inbound connections that ended without enqueueing anything.
    pub fn dropped(&self) -> usize {
        self.dropped.load(Ordering::Relaxed)
    }

    pub(crate) fn record_dropped(&self) {
        self.dropped.fetch_add(1, Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pop_is_fifo() {
        let inbox = Inbox::new(7977);
        for payload in ["1", "2", "3"] {
            inbox.push(payload.to_string()).unwrap();
        }

        assert_eq!(inbox.pop().unwrap(), Some(("1".to_string(), 2)));
        assert_eq!(inbox.pop().unwrap(), Some(("2".to_string(), 1)));
        assert_eq!(inbox.pop().unwrap(), Some(("3".to_string(), 0)));
        assert_eq!(inbox.pop().unwrap(), None);
    }

    #[test]
    fn test_clones_share_the_queue() {
        let inbox = Inbox::new(7977);
        let listener_side = inbox.clone();
        listener_side.push("5".to_string()).unwrap();
        assert_eq!(inbox.len(), 1);
        assert!(!inbox.is_empty());
    }

    #[test]
    fn test_concurrent_pushes_are_not_lost() {
        let inbox = Inbox::new(7977);
        let writers: Vec<_> = (0..4)
            .map(|w| {
                let inbox = inbox.clone();
                std::thread::spawn(move || {
                    for i in 0..250 {
                        inbox.push(format!("{w}-{i}")).unwrap();
                    }
                })
            })
            .collect();
        for writer in writers {
            writer.join().unwrap();
        }
        assert_eq!(inbox.len(), 1000);
    }

    #[test]
    fn test_poisoned_queue_keeps_its_length() {
        let inbox = Inbox::new(7977);
        inbox.push("1".to_string()).unwrap();
        inbox.push("2".to_string()).unwrap();

        let holder = inbox.clone();
        let poisoner = std::thread::spawn(move || {
            let _guard = holder.queue.lock().unwrap();
            panic!("listener died holding the inbox");
        });
        assert!(poisoner.join().is_err());

        assert_eq!(inbox.len(), 2);
        assert!(!inbox.is_empty());
        assert!(matches!(
            inbox.pop(),
            Err(SimulationError::PoisonedInbox(7977))
        ));
    }

    #[test]
    fn test_dropped_counter_is_shared() {
        let inbox = Inbox::new(7977);
        inbox.clone().record_dropped();
        inbox.record_dropped();
        assert_eq!(inbox.dropped(), 2);
        assert!(inbox.is_empty());
    }
}
