//! Services layer - client-side business logic
//!
//! Services coordinate the HTTP client and the durable store:
//! - session: token ownership, identity resolution, credential exchange
//! - flow: the multi-step login state machine driving the login UI
//! - dictionaries: the TTL cache over backend reference data

pub mod dictionaries;
pub mod flow;
pub mod session;

pub use dictionaries::DictionaryService;
pub use flow::{FlowError, LoginFlow, Phase};
pub use session::{Entrance, Secret, SecretKind, SessionError, SessionManager};
