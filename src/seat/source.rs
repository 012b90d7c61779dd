//! Data sources and the offers they manufacture.

use super::offer::DataOffer;
use super::signal::Signal;
use super::{Event, EventSink, Kind, Listener, Object, ObjectId, ObjectKind, RequestError, Seat};

/// An advertised payload: the MIME types its owner can produce.
#[derive(Debug, Default)]
pub struct DataSource {
    /// Advertisement order. Duplicates are kept.
    pub(super) mime_types: Vec<String>,
}

impl Seat {
    pub fn create_data_source(&mut self, id: ObjectId) -> Result<(), RequestError> {
        self.insert_object(id, ObjectKind::DataSource(DataSource::default()))?;
        tracing::debug!(source = %id, "data source created");
        Ok(())
    }

    /// Append a MIME type to a source's advertisement.
    ///
    /// Exhaustion is reported to the source's owner as `no_memory`; the
    /// source keeps the types it already had.
    pub fn source_offer(
        &mut self,
        source: ObjectId,
        mime_type: String,
        sink: &mut dyn EventSink,
    ) -> Result<(), RequestError> {
        let max = self.config.max_mime_types;
        let data = self.data_source_mut(source)?;

        if data.mime_types.len() >= max || data.mime_types.try_reserve(1).is_err() {
            tracing::warn!(%source, count = data.mime_types.len(), "mime type rejected");
            sink.post_no_memory(source);
            return Ok(());
        }
        tracing::debug!(%source, %mime_type, "source offers mime type");
        data.mime_types.push(mime_type);
        Ok(())
    }

    /// Destroy a source. Destroying one that is already gone is a no-op.
    pub fn source_destroy(
        &mut self,
        source: ObjectId,
        sink: &mut dyn EventSink,
    ) -> Result<(), RequestError> {
        match self.require(source, Kind::DataSource) {
            Ok(()) => {
                self.destroy_object(source, sink);
                Ok(())
            }
            Err(RequestError::NoSuchObject(_)) => {
                tracing::trace!(%source, "source already destroyed");
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    /// Mime types `source` advertises, in order.
    pub fn mime_types(&self, source: ObjectId) -> Option<&[String]> {
        match self.objects.get(&source) {
            Some(Object {
                kind: ObjectKind::DataSource(data),
                ..
            }) => Some(&data.mime_types),
            _ => None,
        }
    }

    /// Tell a source it no longer owns the selection.
    pub(super) fn cancel_source(&mut self, source: ObjectId, sink: &mut dyn EventSink) {
        tracing::debug!(%source, "source cancelled");
        sink.send(source, Event::Cancelled);
    }

    /// Manufacture a new offer of `source` for the connection behind `device`.
    ///
    /// Emits `data_offer` to the device and one `offer` per MIME type to
    /// the new offer. Returns `None` (after posting `no_memory` on the
    /// device) if the target connection has no server ids left, or if
    /// either object is gone.
    pub(super) fn make_offer_for(
        &mut self,
        source: ObjectId,
        device: ObjectId,
        sink: &mut dyn EventSink,
    ) -> Option<ObjectId> {
        let mime_types = self.mime_types(source)?.to_vec();
        if !self.objects.contains_key(&device) {
            return None;
        }
        let Some(offer) = self.allocate_server_id(device.client) else {
            tracing::warn!(%device, "server id range exhausted, no offer");
            sink.post_no_memory(device);
            return None;
        };

        let source_link = self.link(source, Listener::OfferSource(offer))?;
        let target_link = self.link(device, Listener::OfferTarget(offer))?;
        self.objects.insert(
            offer,
            Object {
                kind: ObjectKind::DataOffer(DataOffer {
                    source: Some(source_link),
                    target: target_link,
                }),
                destroy_signal: Signal::new(),
            },
        );
        tracing::debug!(%offer, %source, %device, "offer created");

        sink.send(device, Event::DataOffer { offer });
        for mime_type in mime_types {
            sink.send(offer, Event::Offer { mime_type });
        }
        Some(offer)
    }

    fn data_source_mut(&mut self, id: ObjectId) -> Result<&mut DataSource, RequestError> {
        match self.objects.get_mut(&id) {
            Some(Object {
                kind: ObjectKind::DataSource(data),
                ..
            }) => Ok(data),
            Some(_) => Err(RequestError::WrongKind {
                id,
                expected: Kind::DataSource.name(),
            }),
            None => Err(RequestError::NoSuchObject(id)),
        }
    }
}
