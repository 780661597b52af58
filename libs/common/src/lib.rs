pub mod event;
pub mod session;

pub use event::{EventFingerprint, EventMetadata};
pub use session::SessionKey;
