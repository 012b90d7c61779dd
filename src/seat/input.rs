//! Pointer and keyboard state fed in by the seat's input source.

use serde::{Deserialize, Serialize};

use super::signal::Link;
use super::{EventSink, Listener, ObjectId, Seat};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ButtonState {
    Released,
    Pressed,
}

#[derive(Debug, Default)]
pub(super) struct PointerState {
    /// Surface under the pointer.
    pub(super) focus: Option<ObjectId>,
    pub(super) x: f64,
    pub(super) y: f64,
    pub(super) button_count: u32,
    /// First button of the current press sequence.
    pub(super) grab_button: u32,
}

#[derive(Debug, Default)]
pub(super) struct KeyboardState {
    pub(super) focus: Option<Link<ObjectId>>,
}

impl Seat {
    /// Pointer moved to `(x, y)` over `surface`.
    ///
    /// Ids that do not name a live surface count as "over nothing".
    pub fn pointer_motion(
        &mut self,
        time: u32,
        surface: Option<ObjectId>,
        x: f64,
        y: f64,
        sink: &mut dyn EventSink,
    ) {
        let surface = surface.filter(|s| self.is_surface(*s));
        self.pointer.focus = surface;
        self.pointer.x = x;
        self.pointer.y = y;
        if self.drag.is_some() {
            self.drag_motion(time, surface, x, y, sink);
        }
    }

    /// Pointer button press or release. Returns the serial of the event.
    pub fn pointer_button(
        &mut self,
        time: u32,
        button: u32,
        state: ButtonState,
        sink: &mut dyn EventSink,
    ) -> u32 {
        match state {
            ButtonState::Pressed => {
                if self.pointer.button_count == 0 {
                    self.pointer.grab_button = button;
                }
                self.pointer.button_count = self.pointer.button_count.saturating_add(1);
            }
            ButtonState::Released => {
                self.pointer.button_count = self.pointer.button_count.saturating_sub(1);
            }
        }
        let serial = self.next_serial();
        tracing::trace!(time, button, ?state, count = self.pointer.button_count, serial, "button");

        if self.drag.is_some() {
            self.drag_button(button, state, sink);
        }
        serial
    }

    /// Move keyboard focus. Returns the serial of the focus change.
    ///
    /// When focus lands on a different connection, that connection is
    /// told about the current selection.
    pub fn set_keyboard_focus(&mut self, surface: Option<ObjectId>, sink: &mut dyn EventSink) -> u32 {
        let surface = surface.filter(|s| self.is_surface(*s));
        let previous = self.keyboard.focus.take();
        if let Some(link) = previous {
            self.unlink(link);
        }
        self.keyboard.focus = surface.and_then(|s| self.link(s, Listener::KeyboardFocus));
        let serial = self.next_serial();
        tracing::debug!(surface = ?surface.map(|s| s.to_string()), serial, "keyboard focus");

        let previous_client = previous.map(|l| l.target().client);
        if let Some(surface) = surface {
            if previous_client != Some(surface.client) {
                self.refresh_selection_for_focus(sink);
            }
        }
        serial
    }
}
