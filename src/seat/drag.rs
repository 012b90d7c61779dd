//! Drag grab. Pointer input belongs to the drag while it lasts.
//!
//! `Seat::drag` is `None` while idle and `Some` while dragging. Teardown
//! takes the session out of the seat first, so a teardown that runs
//! again (source destroyed while the grab is being released, a second
//! button release) finds nothing to do.

use super::signal::Link;
use super::{ButtonState, Event, EventSink, Kind, Listener, ObjectId, RequestError, Seat};

#[derive(Debug)]
pub struct DragSession {
    pub(super) source: Option<Link<ObjectId>>,
    pub(super) icon: Option<Link<ObjectId>>,
    /// Surface the grab last focused, with or without a device behind it.
    pub(super) focus_surface: Option<ObjectId>,
    /// Device receiving enter/motion/drop.
    pub(super) focus: Option<Link<ObjectId>>,
    /// Releasing this button drops.
    pub(super) grab_button: u32,
}

impl Seat {
    /// `start_drag` request from `device`.
    ///
    /// A drag without a source, or while another drag is running, is
    /// ignored. The origin must be a surface of the requesting
    /// connection.
    pub fn start_drag(
        &mut self,
        device: ObjectId,
        source: Option<ObjectId>,
        origin: ObjectId,
        icon: Option<ObjectId>,
        serial: u32,
        sink: &mut dyn EventSink,
    ) -> Result<(), RequestError> {
        self.require(device, Kind::DataDevice)?;
        self.require(origin, Kind::Surface)?;
        if origin.client != device.client {
            return Err(RequestError::ForeignObject(origin));
        }
        if let Some(icon) = icon {
            self.require(icon, Kind::Surface)?;
        }
        let Some(source) = source else {
            tracing::debug!(%device, serial, "start_drag without source ignored");
            return Ok(());
        };
        self.require(source, Kind::DataSource)?;
        if self.drag.is_some() {
            tracing::debug!(%device, serial, "drag already in progress");
            return Ok(());
        }

        let source_link = self.link(source, Listener::DragSource);
        let icon_link = icon.and_then(|icon| self.link(icon, Listener::DragIcon));
        if let Some(icon) = icon {
            sink.drag_icon(icon);
        }

        let mut drag = DragSession {
            source: source_link,
            icon: icon_link,
            focus_surface: None,
            focus: None,
            grab_button: self.pointer.grab_button,
        };
        tracing::debug!(%source, %origin, serial, button = drag.grab_button, "drag started");

        // The grab starts out focused wherever the pointer already is.
        let (current, x, y) = (self.pointer.focus, self.pointer.x, self.pointer.y);
        if current.is_some() {
            self.drag_focus(&mut drag, current, x, y, sink);
        }
        self.drag = Some(drag);
        Ok(())
    }

    /// Pointer moved over `surface` while dragging.
    pub(super) fn drag_motion(
        &mut self,
        time: u32,
        surface: Option<ObjectId>,
        x: f64,
        y: f64,
        sink: &mut dyn EventSink,
    ) {
        let Some(mut drag) = self.drag.take() else {
            return;
        };
        if drag.focus_surface != surface {
            self.drag_focus(&mut drag, surface, x, y, sink);
        } else if let Some(focus) = drag.focus {
            sink.send(focus.target(), Event::Motion { time, x, y });
        }
        self.drag = Some(drag);
    }

    /// Pointer button changed while dragging. The seat has already
    /// updated its pressed-button count.
    pub(super) fn drag_button(&mut self, button: u32, state: ButtonState, sink: &mut dyn EventSink) {
        let Some(drag) = self.drag.as_ref() else {
            return;
        };
        if state == ButtonState::Released && button == drag.grab_button {
            if let Some(focus) = drag.focus {
                tracing::debug!(device = %focus.target(), "drop");
                sink.send(focus.target(), Event::Drop);
            }
        }
        if state == ButtonState::Released && self.pointer.button_count == 0 {
            self.end_drag(sink);
        }
    }

    /// Move drag focus to `surface` (or nowhere).
    fn drag_focus(
        &mut self,
        drag: &mut DragSession,
        surface: Option<ObjectId>,
        x: f64,
        y: f64,
        sink: &mut dyn EventSink,
    ) {
        if let Some(focus) = drag.focus.take() {
            sink.send(focus.target(), Event::Leave);
            self.unlink(focus);
        }
        drag.focus_surface = surface;

        let Some(surface) = surface else {
            return;
        };
        let Some(device) = self.devices.find(surface.client) else {
            tracing::trace!(%surface, "drag over client without data device");
            return;
        };

        let serial = self.next_serial();
        let offer = drag
            .source
            .and_then(|source| self.make_offer_for(source.target(), device, sink));
        sink.send(
            device,
            Event::Enter {
                serial,
                surface,
                x,
                y,
                offer,
            },
        );
        drag.focus = self.link(device, Listener::DragFocus);
    }

    /// A surface went away. If the grab was over it, leave as if the
    /// pointer had moved off; a surface later created under the same id
    /// gets a fresh enter.
    pub(super) fn drag_surface_destroyed(&mut self, surface: ObjectId, sink: &mut dyn EventSink) {
        let Some(mut drag) = self.drag.take() else {
            return;
        };
        if drag.focus_surface == Some(surface) {
            tracing::debug!(%surface, "drag focus surface destroyed");
            self.drag_focus(&mut drag, None, 0.0, 0.0, sink);
        }
        self.drag = Some(drag);
    }

    /// End the drag: detach the icon, leave the focus, release the grab.
    pub(super) fn end_drag(&mut self, sink: &mut dyn EventSink) {
        let Some(mut drag) = self.drag.take() else {
            return;
        };
        if let Some(icon) = drag.icon.take() {
            sink.attach(icon.target(), None, 0, 0);
            self.unlink(icon);
        }
        self.drag_focus(&mut drag, None, 0.0, 0.0, sink);
        if let Some(source) = drag.source.take() {
            self.unlink(source);
        }
        tracing::debug!("drag ended");
    }
}
