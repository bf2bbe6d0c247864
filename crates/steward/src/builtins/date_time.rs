use std::sync::Arc;

use crate::capability::{boxed_reply_future, CapabilityRegistry, CapabilityResult, FnCapability};

pub const NAME: &str = "date_time";

pub fn register(registry: &mut CapabilityRegistry) {
    registry.register(Arc::new(FnCapability::new(
        NAME,
        ["time", "date", "today"],
        Arc::new(|request, _args| {
            boxed_reply_future(async move { Ok(CapabilityResult::ok(reply_for(&request.text))) })
        }),
    )));
}

fn reply_for(text: &str) -> String {
    let now = chrono::Local::now();
    let lower = text.to_lowercase();
    if lower.contains("date") || lower.contains("today") {
        format!("Today is {}.", now.format("%A, %B %d, %Y"))
    } else {
        format!("It's {}.", now.format("%I:%M %p"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn date_question_mentions_the_day() {
        let reply = reply_for("what's the date today");
        assert!(reply.starts_with("Today is"));
    }

    #[test]
    fn time_question_mentions_the_clock() {
        let reply = reply_for("what time is it");
        assert!(reply.starts_with("It's"));
        assert!(reply.contains('M'));
    }
}
