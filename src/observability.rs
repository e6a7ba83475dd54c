use biometrics::{Collector, Counter, Moments};

pub(crate) static CLIENT_REQUESTS: Counter = Counter::new("colloquy.client.requests");
pub(crate) static CLIENT_REQUEST_ERRORS: Counter = Counter::new("colloquy.client.request_errors");
pub(crate) static CLIENT_REQUEST_DURATION: Moments =
    Moments::new("colloquy.client.request_duration_seconds");

pub(crate) static STREAM_FRAGMENTS: Counter = Counter::new("colloquy.stream.fragments");
pub(crate) static STREAM_ERRORS: Counter = Counter::new("colloquy.stream.errors");
pub(crate) static STREAM_BYTES: Counter = Counter::new("colloquy.stream.bytes");
pub(crate) static STREAM_TTFF: Moments = Moments::new("colloquy.stream.ttff_seconds");

pub(crate) static ATTACHMENTS_PROCESSED: Counter = Counter::new("colloquy.attachments.processed");
pub(crate) static ATTACHMENTS_SKIPPED: Counter = Counter::new("colloquy.attachments.skipped");

pub(crate) static CHAT_TURNS: Counter = Counter::new("colloquy.chat.turns");
pub(crate) static CHAT_TURN_ERRORS: Counter = Counter::new("colloquy.chat.turn_errors");

/// Register this crate's biometrics with the provided collector.
pub fn register_biometrics(collector: Collector) {
    collector.register_counter(&CLIENT_REQUESTS);
    collector.register_counter(&CLIENT_REQUEST_ERRORS);
    collector.register_moments(&CLIENT_REQUEST_DURATION);

    collector.register_counter(&STREAM_FRAGMENTS);
    collector.register_counter(&STREAM_ERRORS);
    collector.register_counter(&STREAM_BYTES);
    collector.register_moments(&STREAM_TTFF);

    collector.register_counter(&ATTACHMENTS_PROCESSED);
    collector.register_counter(&ATTACHMENTS_SKIPPED);

    collector.register_counter(&CHAT_TURNS);
    collector.register_counter(&CHAT_TURN_ERRORS);
}
