//! Output formatting for CLI client commands.
//!
//! One line per notification, `key=value` fields, so `watch` output can
//! be grepped or piped.

use crate::ipc::protocol::{Message, ObjectRef};

fn object(r: &ObjectRef) -> String {
    format!("{}#{}", r.client, r.id)
}

fn optional(r: &Option<ObjectRef>) -> String {
    r.as_ref().map(object).unwrap_or_else(|| "none".into())
}

/// Render an observer notification. Other messages yield `None`.
pub fn format_notification(msg: &Message) -> Option<String> {
    match msg {
        Message::SelectionChanged { source, .. } => {
            Some(format!("selection_changed source={}", optional(source)))
        }
        Message::DragIcon { surface, .. } => Some(format!("drag_icon surface={}", object(surface))),
        Message::Attach {
            surface,
            buffer,
            x,
            y,
            ..
        } => Some(format!(
            "attach surface={} buffer={} x={x} y={y}",
            object(surface),
            optional(buffer)
        )),
        _ => None,
    }
}

pub fn print_notification(msg: &Message) {
    match format_notification(msg) {
        Some(line) => println!("{line}"),
        None => tracing::debug!(?msg, "ignoring non-notification message"),
    }
}

pub fn print_serial(what: &str, serial: u32) {
    println!("{what} serial={serial}");
}
