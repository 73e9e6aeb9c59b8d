mod inbox;
mod wire;

pub use inbox::Inbox;
pub use wire::{READY_TOKEN, RECEIVE_BUFFER_SIZE, RECEIVE_TIMEOUT};

pub(crate) use wire::{connect_host, listen, send_message};

/// Machines share a host and are told apart by their listening port.
pub type Port = u16;

/// A message as it travels: the sender's logical clock in decimal text.
pub type Payload = String;
