pub mod manager;
pub mod params;
pub mod protocol;
pub mod sink;
pub mod solver;

pub use manager::{RunConfig, RunError, RunInfo, RunManager, RunState, RunSummary};
pub use params::{Limits, Rejection, SimulationParameters, ValidationError, MAX_DAMPING};
pub use protocol::{encode, InitEvent, RunEvent, RunId, Sample, WireMessage};
pub use sink::{Broadcaster, DeliveryError, FnSink, Frame, Sink, Subscriber, SubscriberId};
pub use solver::{evaluate, DampingRegime, Trajectory};

// Test helpers module (public for integration tests)
// Always compiled - integration tests are separate crates and need access
pub mod tests;
