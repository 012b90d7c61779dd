//! Selection ownership and the serial race rule.

use super::signal::Link;
use super::{Event, EventSink, Kind, Listener, ObjectId, RequestError, Seat};

/// The active selection, if any.
#[derive(Debug, Default)]
pub struct SelectionState {
    pub(super) source: Option<Link<ObjectId>>,
    /// Serial of the request that installed `source`.
    serial: u32,
}

/// Whether a `set_selection` carrying `serial` loses to the selection
/// installed at `current`.
///
/// Serials wrap, so "older" means "at most half the serial space
/// behind". A request carrying the same serial as the active selection
/// is stale too.
pub fn serial_is_stale(current: u32, serial: u32) -> bool {
    current.wrapping_sub(serial) < 1 << 31
}

impl Seat {
    /// `set_selection` request from `device`.
    ///
    /// Stale requests are dropped without telling anyone. A request
    /// without a source is ignored; clearing the selection happens only
    /// when its source is destroyed.
    pub fn set_selection(
        &mut self,
        device: ObjectId,
        source: Option<ObjectId>,
        serial: u32,
        sink: &mut dyn EventSink,
    ) -> Result<(), RequestError> {
        self.require(device, Kind::DataDevice)?;
        let Some(source) = source else {
            tracing::debug!(%device, serial, "set_selection without source ignored");
            return Ok(());
        };
        self.require(source, Kind::DataSource)?;
        if source.client != device.client {
            return Err(RequestError::ForeignObject(source));
        }

        if self.selection.source.is_some() && serial_is_stale(self.selection.serial, serial) {
            tracing::debug!(
                %source,
                serial,
                current = self.selection.serial,
                "stale set_selection dropped"
            );
            return Ok(());
        }

        if let Some(previous) = self.selection.source.take() {
            self.cancel_source(previous.target(), sink);
            self.unlink(previous);
        }
        self.selection.serial = serial;
        tracing::info!(%source, serial, "selection set");

        if let Some(focus) = self.keyboard_focus_device() {
            let offer = self.make_offer_for(source, focus, sink);
            sink.send(focus, Event::Selection { offer });
        }
        sink.selection_changed(Some(source));
        self.selection.source = self.link(source, Listener::SelectionSource);
        Ok(())
    }

    /// Announce the current selection to a newly focused connection.
    pub(super) fn refresh_selection_for_focus(&mut self, sink: &mut dyn EventSink) {
        let Some(source) = self.selection.source.map(|l| l.target()) else {
            return;
        };
        let Some(focus) = self.keyboard_focus_device() else {
            return;
        };
        let offer = self.make_offer_for(source, focus, sink);
        sink.send(focus, Event::Selection { offer });
    }

    pub(super) fn selection_source_destroyed(&mut self, sink: &mut dyn EventSink) {
        self.selection.source = None;
        tracing::info!("selection cleared, source destroyed");
        if let Some(focus) = self.keyboard_focus_device() {
            sink.send(focus, Event::Selection { offer: None });
        }
        sink.selection_changed(None);
    }

    /// Data device of the connection holding keyboard focus.
    fn keyboard_focus_device(&self) -> Option<ObjectId> {
        let surface = self.keyboard.focus?.target();
        self.devices.find(surface.client)
    }
}
