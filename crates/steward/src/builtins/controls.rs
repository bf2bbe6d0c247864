//! Stop and restart, registered unconditionally so they can never be
//! shadowed by another binding's keyword score.

use std::sync::Arc;

use crate::capability::{boxed_reply_future, CapabilityRegistry, CapabilityResult, FnCapability};
use crate::error::CoreError;
use crate::supervisor::{ControlHandle, ControlSignal};

pub fn register(registry: &mut CapabilityRegistry, control: ControlHandle) {
    let stop_control = control.clone();
    registry.register(Arc::new(
        FnCapability::new(
            "stop",
            ["stop", "shut down", "shutdown", "goodbye"],
            Arc::new(move |_request, _args| {
                let control = stop_control.clone();
                boxed_reply_future(async move {
                    control
                        .send(ControlSignal::Stop)
                        .await
                        .map_err(|error| CoreError::Internal(error.to_string()))?;
                    Ok(CapabilityResult::ok("Shutting down. Goodbye!"))
                })
            }),
        )
        .mark_unconditional(),
    ));

    registry.register(Arc::new(
        FnCapability::new(
            "restart",
            ["restart", "reboot"],
            Arc::new(move |_request, _args| {
                let control = control.clone();
                boxed_reply_future(async move {
                    control
                        .send(ControlSignal::Restart)
                        .await
                        .map_err(|error| CoreError::Internal(error.to_string()))?;
                    Ok(CapabilityResult::ok("Restarting now."))
                })
            }),
        )
        .mark_unconditional(),
    ));
}
