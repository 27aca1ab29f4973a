//! Click/input/scroll/keydown/change capture with throttling and
//! redaction, plus navigation capture (spec.md §4.5). Every captured
//! event also becomes an [`gasoline_repro::EnhancedAction`] for the
//! reproduction engine.

mod capture;
mod record;
mod ring_buffer;

pub use capture::ActionCapture;
pub use record::{ActionKind, ActionRecord};
pub use ring_buffer::RingBuffer;
