use serde::Serialize;

use crate::command::Origin;
use crate::supervisor::SupervisorState;

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", content = "payload")]
pub enum CoreEvent {
    StateChanged(StateChangedPayload),
    UnitStarted(UnitPayload),
    UnitStopped(UnitPayload),
    CommandDispatched(CommandDispatchedPayload),
}

#[derive(Debug, Clone, Serialize)]
pub struct StateChangedPayload {
    pub state: SupervisorState,
}

#[derive(Debug, Clone, Serialize)]
pub struct UnitPayload {
    pub name: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct CommandDispatchedPayload {
    pub origin: Origin,
    pub success: bool,
}
