use crossbeam::channel::{self, TrySendError};

/// A message executed by the sequencing thread of a coroutine worker.
pub enum WorkerMessage {
    /// Ask the coroutine manager to re-evaluate its scheduling decisions.
    Schedule,
    /// Run a closure on the sequencing thread.
    Callback(Box<dyn FnOnce() + Send>),
}

impl std::fmt::Debug for WorkerMessage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WorkerMessage::Schedule => write!(f, "Schedule"),
            WorkerMessage::Callback(_) => write!(f, "Callback"),
        }
    }
}

/// Why a message could not be posted.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum PostError {
    /// The mailbox is at capacity.  The message was dropped.
    Full,
    /// The worker has shut down.
    Disconnected,
}

impl std::fmt::Display for PostError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PostError::Full => write!(f, "the mailbox of the coroutine worker is full"),
            PostError::Disconnected => write!(f, "the coroutine worker has shut down"),
        }
    }
}

impl std::error::Error for PostError {}

/// The posting end of a mailbox.  Dropping every sender lets the receiver drain what is left and
/// then stop.
#[derive(Clone)]
pub(crate) struct Sender {
    tx: channel::Sender<WorkerMessage>,
}

impl Sender {
    /// Post without blocking.
    pub fn post(&self, message: WorkerMessage) -> Result<(), PostError> {
        self.tx.try_send(message).map_err(|e| match e {
            TrySendError::Full(_) => PostError::Full,
            TrySendError::Disconnected(_) => PostError::Disconnected,
        })
    }
}

/// The sequencing thread holds this.
pub(crate) struct Receiver {
    rx: channel::Receiver<WorkerMessage>,
}

impl Receiver {
    /// Block for the next message.  Returns `None` once all senders are gone and the mailbox is
    /// empty.
    pub fn next_message(&self) -> Option<WorkerMessage> {
        self.rx.recv().ok()
    }

    /// Take a message if one is ready.
    #[cfg(test)]
    pub fn try_next_message(&self) -> Option<WorkerMessage> {
        self.rx.try_recv().ok()
    }
}

/// Create a bounded mailbox.
pub(crate) fn make_mailbox(capacity: usize) -> (Sender, Receiver) {
    debug_assert!(capacity > 0);
    let (tx, rx) = channel::bounded(capacity);
    (Sender { tx }, Receiver { rx })
}
