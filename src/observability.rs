use biometrics::{Collector, Counter, Moments};

pub(crate) static CLIENT_REQUESTS: Counter = Counter::new("gemi.client.requests");
pub(crate) static CLIENT_REQUEST_ERRORS: Counter = Counter::new("gemi.client.request_errors");
pub(crate) static CLIENT_REQUEST_DURATION: Moments =
    Moments::new("gemi.client.request_duration_seconds");
pub(crate) static CLIENT_MODEL_PAGES: Counter = Counter::new("gemi.client.model_pages");

pub(crate) static STREAM_EVENTS: Counter = Counter::new("gemi.stream.events");
pub(crate) static STREAM_ERRORS: Counter = Counter::new("gemi.stream.errors");
pub(crate) static STREAM_BYTES: Counter = Counter::new("gemi.stream.bytes");
pub(crate) static STREAM_TTFB: Moments = Moments::new("gemi.stream.ttfb_seconds");
pub(crate) static STREAM_DURATION: Moments = Moments::new("gemi.stream.duration_seconds");

pub(crate) static CHAT_PROMPTS: Counter = Counter::new("gemi.chat.prompts");
pub(crate) static CHAT_COMMANDS: Counter = Counter::new("gemi.chat.commands");
pub(crate) static CHAT_ERRORS: Counter = Counter::new("gemi.chat.errors");
pub(crate) static CHAT_BUSY_REJECTIONS: Counter = Counter::new("gemi.chat.busy_rejections");

pub(crate) static RENDER_REPAINTS: Counter = Counter::new("gemi.render.repaints");
pub(crate) static RENDER_FALLBACKS: Counter = Counter::new("gemi.render.fallbacks");

/// Register this crate's biometrics with the provided collector.
pub fn register_biometrics(collector: Collector) {
    collector.register_counter(&CLIENT_REQUESTS);
    collector.register_counter(&CLIENT_REQUEST_ERRORS);
    collector.register_moments(&CLIENT_REQUEST_DURATION);
    collector.register_counter(&CLIENT_MODEL_PAGES);

    collector.register_counter(&STREAM_EVENTS);
    collector.register_counter(&STREAM_ERRORS);
    collector.register_counter(&STREAM_BYTES);
    collector.register_moments(&STREAM_TTFB);
    collector.register_moments(&STREAM_DURATION);

    collector.register_counter(&CHAT_PROMPTS);
    collector.register_counter(&CHAT_COMMANDS);
    collector.register_counter(&CHAT_ERRORS);
    collector.register_counter(&CHAT_BUSY_REJECTIONS);

    collector.register_counter(&RENDER_REPAINTS);
    collector.register_counter(&RENDER_FALLBACKS);
}
