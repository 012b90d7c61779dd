//! Data offers: one connection's view of someone else's source.

use super::signal::Link;
use super::{Destination, Event, EventSink, Object, ObjectId, ObjectKind, RequestError, Seat};

#[derive(Debug)]
pub struct DataOffer {
    /// Cleared when the source is destroyed; the offer then stays
    /// around, inert, until its owner destroys it.
    pub(super) source: Option<Link<ObjectId>>,
    /// The device this offer was delivered through. Destroying the
    /// device destroys the offer.
    pub(super) target: Link<ObjectId>,
}

/// Outcome of looking an offer up for a request.
enum Lookup {
    Live(ObjectId),
    Sourceless,
    Gone,
}

impl Seat {
    /// The receiver would take `mime_type` (or nothing, if `None`).
    ///
    /// Forwarded to the source as `target`. The requesting connection is
    /// not checked against the current drag or selection target.
    pub fn offer_accept(
        &mut self,
        offer: ObjectId,
        serial: u32,
        mime_type: Option<String>,
        sink: &mut dyn EventSink,
    ) -> Result<(), RequestError> {
        match self.offer_source(offer)? {
            Lookup::Live(source) => {
                tracing::debug!(%offer, %source, serial, ?mime_type, "offer accepted");
                sink.send(source, Event::Target { mime_type });
            }
            Lookup::Sourceless => tracing::trace!(%offer, "accept on sourceless offer"),
            Lookup::Gone => tracing::trace!(%offer, "accept on destroyed offer"),
        }
        Ok(())
    }

    /// Ask the source to write `mime_type` into `destination`.
    ///
    /// The destination is consumed either way: handed to the source's
    /// connection, or dropped here.
    pub fn offer_receive(
        &mut self,
        offer: ObjectId,
        mime_type: String,
        destination: Destination,
        sink: &mut dyn EventSink,
    ) -> Result<(), RequestError> {
        match self.offer_source(offer)? {
            Lookup::Live(source) => {
                tracing::debug!(%offer, %source, %mime_type, "offer receive forwarded");
                sink.send(
                    source,
                    Event::Send {
                        mime_type,
                        destination,
                    },
                );
            }
            Lookup::Sourceless | Lookup::Gone => {
                tracing::trace!(%offer, "receive on dead offer, closing destination");
                drop(destination);
            }
        }
        Ok(())
    }

    /// Destroy an offer. Idempotent with destruction through its device.
    pub fn offer_destroy(
        &mut self,
        offer: ObjectId,
        sink: &mut dyn EventSink,
    ) -> Result<(), RequestError> {
        if let Lookup::Gone = self.offer_source(offer)? {
            return Ok(());
        }
        self.destroy_object(offer, sink);
        Ok(())
    }

    fn offer_source(&self, offer: ObjectId) -> Result<Lookup, RequestError> {
        match self.objects.get(&offer) {
            Some(Object {
                kind: ObjectKind::DataOffer(data),
                ..
            }) => Ok(match data.source {
                Some(link) => Lookup::Live(link.target()),
                None => Lookup::Sourceless,
            }),
            Some(_) => Err(RequestError::WrongKind {
                id: offer,
                expected: super::Kind::DataOffer.name(),
            }),
            None => Ok(Lookup::Gone),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io::Read;

    use super::super::testing::*;
    use super::super::ClientId;
    use super::*;

    struct Fixture {
        seat: Seat,
        sink: RecordingSink,
        source: ObjectId,
        target: App,
        offer: ObjectId,
    }

    fn fixture() -> Fixture {
        let mut seat = seat();
        let mut sink = RecordingSink::default();
        let target = app_with_device(&mut seat);
        let source = source_with(&mut seat, ClientId::new(), &["text/plain"], &mut sink);
        let offer = seat
            .make_offer_for(source, target.device(), &mut sink)
            .unwrap();
        sink.clear();
        Fixture {
            seat,
            sink,
            source,
            target,
            offer,
        }
    }

    #[test]
    fn accept_forwards_target() {
        let mut f = fixture();
        f.seat
            .offer_accept(f.offer, 5, Some("text/plain".into()), &mut f.sink)
            .unwrap();
        match f.sink.events_for(f.source).as_slice() {
            [Event::Target { mime_type }] => assert_eq!(mime_type.as_deref(), Some("text/plain")),
            other => panic!("expected target, got {other:?}"),
        }
    }

    #[test]
    fn accept_none_forwards_none() {
        let mut f = fixture();
        f.seat.offer_accept(f.offer, 5, None, &mut f.sink).unwrap();
        assert!(matches!(
            f.sink.events_for(f.source).as_slice(),
            [Event::Target { mime_type: None }]
        ));
    }

    #[test]
    fn receive_forwards_send_with_destination() {
        let mut f = fixture();
        f.seat
            .offer_receive(
                f.offer,
                "text/plain".into(),
                Destination::Path("/tmp/fifo".into()),
                &mut f.sink,
            )
            .unwrap();
        match f.sink.events_for(f.source).as_slice() {
            [Event::Send {
                mime_type,
                destination: Destination::Path(p),
            }] => {
                assert_eq!(mime_type, "text/plain");
                assert_eq!(p.to_str(), Some("/tmp/fifo"));
            }
            other => panic!("expected send, got {other:?}"),
        }
    }

    #[test]
    fn sourceless_offer_emits_nothing() {
        let mut f = fixture();
        f.seat.source_destroy(f.source, &mut f.sink).unwrap();
        f.sink.clear();

        f.seat
            .offer_accept(f.offer, 1, Some("text/plain".into()), &mut f.sink)
            .unwrap();
        f.seat
            .offer_receive(
                f.offer,
                "text/plain".into(),
                Destination::Path("/tmp/x".into()),
                &mut f.sink,
            )
            .unwrap();

        assert!(f.sink.log.is_empty());
        assert!(f.seat.contains(f.offer), "offer survives its source");
    }

    #[test]
    fn receive_on_sourceless_offer_closes_descriptor() {
        let mut f = fixture();
        f.seat.source_destroy(f.source, &mut f.sink).unwrap();

        let (read_end, write_end) = nix::unistd::pipe().unwrap();
        f.seat
            .offer_receive(
                f.offer,
                "text/plain".into(),
                Destination::Fd(write_end),
                &mut f.sink,
            )
            .unwrap();

        // Only a closed write end lets the read reach EOF.
        let mut buf = Vec::new();
        let n = std::fs::File::from(read_end).read_to_end(&mut buf).unwrap();
        assert_eq!(n, 0);
    }

    #[test]
    fn destroy_is_idempotent_with_device_release() {
        let mut f = fixture();
        f.seat.release_device(f.target.device(), &mut f.sink).unwrap();
        assert!(!f.seat.contains(f.offer), "offer dies with its device");

        f.seat.offer_destroy(f.offer, &mut f.sink).unwrap();
        f.seat.offer_destroy(f.offer, &mut f.sink).unwrap();
        assert!(f.sink.log.is_empty());
    }

    #[test]
    fn destroy_releases_source_listener() {
        let mut f = fixture();
        f.seat.offer_destroy(f.offer, &mut f.sink).unwrap();
        assert!(!f.seat.contains(f.offer));

        let Some(Object { destroy_signal, .. }) = f.seat.objects.get(&f.source) else {
            panic!("source should still exist");
        };
        assert!(destroy_signal.is_empty());
    }

    #[test]
    fn requests_on_destroyed_offer_are_absorbed() {
        let mut f = fixture();
        f.seat.offer_destroy(f.offer, &mut f.sink).unwrap();
        f.seat
            .offer_accept(f.offer, 1, Some("text/plain".into()), &mut f.sink)
            .unwrap();
        assert!(f.sink.events_for(f.source).is_empty());
    }

    #[test]
    fn offer_request_on_wrong_kind_fails() {
        let mut f = fixture();
        let err = f
            .seat
            .offer_accept(f.source, 1, None, &mut f.sink)
            .unwrap_err();
        assert_eq!(err.reason(), "invalid_object");
    }
}
