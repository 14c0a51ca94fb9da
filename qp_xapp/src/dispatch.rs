//! Message routing by type.

use std::collections::HashMap;
use std::io::Write;
use std::sync::{Arc, Mutex, PoisonError};

use tracing::{debug, warn};

use crate::handler::{InboundMessage, OutboundMessage, Payload, PredictionHandler};

/// Handles one message type
pub trait MessageHandler: Send + Sync {
    /// Reply to `message`, if any
    fn on_message(&self, message: &InboundMessage) -> Option<OutboundMessage>;
}

impl MessageHandler for PredictionHandler {
    fn on_message(&self, message: &InboundMessage) -> Option<OutboundMessage> {
        Some(self.handle(&message.payload))
    }
}

/// Destination for outbound messages
pub trait MessageSink: Send + Sync {
    fn send(&self, message: &OutboundMessage) -> std::io::Result<()>;
}

/// Writes each outbound payload as one line
#[derive(Debug)]
pub struct LineSink<W: Write + Send> {
    writer: Mutex<W>,
}

impl<W: Write + Send> LineSink<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer: Mutex::new(writer),
        }
    }

    pub fn into_inner(self) -> W {
        self.writer.into_inner().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<W: Write + Send> MessageSink for LineSink<W> {
    fn send(&self, message: &OutboundMessage) -> std::io::Result<()> {
        let mut writer = self.writer.lock().unwrap_or_else(PoisonError::into_inner);
        writeln!(writer, "{}", message.payload)?;
        writer.flush()
    }
}

/// Routes inbound messages to the handler registered for their type
#[derive(Default)]
pub struct Dispatcher {
    handlers: HashMap<i32, Arc<dyn MessageHandler>>,
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut types: Vec<_> = self.handlers.keys().collect();
        types.sort();
        f.debug_struct("Dispatcher").field("types", &types).finish()
    }
}

impl Dispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, msg_type: i32, handler: Arc<dyn MessageHandler>) {
        self.handlers.insert(msg_type, handler);
    }

    pub fn handles(&self, msg_type: i32) -> bool {
        self.handlers.contains_key(&msg_type)
    }

    /// Route `message` and send any reply; returns whether a reply was sent
    pub fn dispatch(&self, message: &InboundMessage, sink: &dyn MessageSink) -> bool {
        let Some(handler) = self.handlers.get(&message.msg_type) else {
            default_handler(message);
            return false;
        };

        let Some(reply) = handler.on_message(message) else {
            return false;
        };
        match sink.send(&reply) {
            Ok(()) => true,
            Err(e) => {
                warn!(msg_type = reply.msg_type, error = %e, "failed to send reply");
                false
            }
        }
    }
}

fn default_handler(message: &InboundMessage) {
    let size = match &message.payload {
        Payload::Bytes(bytes) => bytes.len(),
        Payload::Text(text) => text.len(),
    };
    debug!(msg_type = message.msg_type, size, "no handler for message type, dropping");
}
