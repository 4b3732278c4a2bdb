// Subscriber fan-out: sessions, renderers and transports

mod engine;
mod registry;
mod render;
mod sink;

pub use engine::{BroadcastEngine, DeliveryMode, SessionEnd};
pub use registry::{SessionInfo, SessionRegistry};
pub use render::{HtmlRenderer, JsonRenderer, RenderError, RenderFormat, Renderer, FALLBACK_PAYLOAD};
pub use sink::{ChannelSink, PayloadSink};
