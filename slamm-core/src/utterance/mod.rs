pub mod buffer;
pub mod session;
pub mod state;

pub use buffer::{FlushedUtterance, UtteranceBuffer};
pub use session::{Session, SessionGuard, SessionRegistry};
pub use state::{transition, Event, Phase, Step};
