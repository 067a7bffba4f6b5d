pub mod constants;
pub mod spatial;
pub mod store;
pub mod pool;
pub mod systems;
pub mod oracle;
pub mod gate;
pub mod population;
pub mod locks;
pub mod targeting;
pub mod frame;
pub mod session;

pub use session::{CrowdEvent, CrowdSession, SessionSummary};
