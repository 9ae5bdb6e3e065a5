pub mod http;

pub use http::{app, SegmentServer, ServerState, SESSION_HEADER};
