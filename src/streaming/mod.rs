//! Wire adapters between the agents and chat clients.

mod inbound;
mod parts;

pub use inbound::{normalize_messages, ChatRequest, LegacyToolInvocation, WireMessage};
pub use parts::{done_event, normalize_finish_reason, part_json, sse_event, StreamEncoder, StreamPart, DONE};
