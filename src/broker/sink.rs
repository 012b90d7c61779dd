//! Translates seat events into wire messages.
//!
//! [`BrokerSink`] is the broker's [`EventSink`]. It never touches a
//! socket: each seat event becomes a [`Delivery`] that the broker loop
//! routes once the handler returns.

use crate::ipc::protocol::{Message, ObjectRef};
use crate::seat::{ClientId, Destination, Event, EventSink, ObjectId};

/// An outgoing unsolicited message and who gets it.
#[derive(Debug, Clone, PartialEq)]
pub enum Delivery {
    /// Event for one connection.
    Client { target: ClientId, message: Message },
    /// Notification for every seat-role connection.
    Observers(Message),
}

#[derive(Debug, Default)]
pub struct BrokerSink {
    deliveries: Vec<Delivery>,
}

impl BrokerSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn into_deliveries(self) -> Vec<Delivery> {
        self.deliveries
    }

    fn to_client(&mut self, target: ClientId, message: Message) {
        self.deliveries.push(Delivery::Client { target, message });
    }
}

impl EventSink for BrokerSink {
    fn send(&mut self, resource: ObjectId, event: Event) {
        let object = resource.id;
        let message = match event {
            Event::DataOffer { offer } => Message::DataOffer {
                id: 0,
                device: object,
                offer: offer.id,
            },
            Event::Enter {
                serial,
                surface,
                x,
                y,
                offer,
            } => Message::Enter {
                id: 0,
                device: object,
                serial,
                surface: surface.id,
                x,
                y,
                offer: offer.map(|o| o.id),
            },
            Event::Leave => Message::Leave {
                id: 0,
                device: object,
            },
            Event::Motion { time, x, y } => Message::Motion {
                id: 0,
                device: object,
                time,
                x,
                y,
            },
            Event::Drop => Message::Drop {
                id: 0,
                device: object,
            },
            Event::Selection { offer } => Message::Selection {
                id: 0,
                device: object,
                offer: offer.map(|o| o.id),
            },
            Event::Offer { mime_type } => Message::OfferMime {
                id: 0,
                offer: object,
                mime_type,
            },
            Event::Target { mime_type } => Message::Target {
                id: 0,
                source: object,
                mime_type,
            },
            Event::Send {
                mime_type,
                destination,
            } => match destination {
                Destination::Path(path) => Message::Send {
                    id: 0,
                    source: object,
                    mime_type,
                    destination: path.to_string_lossy().into_owned(),
                },
                Destination::Fd(_) => {
                    // Descriptors cannot cross this transport; dropping closes it.
                    tracing::warn!(source = %resource, "descriptor destination dropped");
                    return;
                }
            },
            Event::Cancelled => Message::Cancelled {
                id: 0,
                source: object,
            },
        };
        self.to_client(resource.client, message);
    }

    fn post_no_memory(&mut self, resource: ObjectId) {
        tracing::warn!(object = %resource, "no_memory posted");
        self.to_client(
            resource.client,
            Message::Error {
                id: 0,
                object: resource.id,
                code: "no_memory".into(),
            },
        );
    }

    fn attach(&mut self, surface: ObjectId, buffer: Option<ObjectId>, x: i32, y: i32) {
        self.deliveries.push(Delivery::Observers(Message::Attach {
            id: 0,
            surface: surface.into(),
            buffer: buffer.map(ObjectRef::from),
            x,
            y,
        }));
    }

    fn selection_changed(&mut self, source: Option<ObjectId>) {
        self.deliveries
            .push(Delivery::Observers(Message::SelectionChanged {
                id: 0,
                source: source.map(ObjectRef::from),
            }));
    }

    fn drag_icon(&mut self, surface: ObjectId) {
        self.deliveries.push(Delivery::Observers(Message::DragIcon {
            id: 0,
            surface: surface.into(),
        }));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn events_address_the_owning_connection() {
        let c = ClientId::new();
        let device = ObjectId::new(c, 2);
        let mut sink = BrokerSink::new();

        sink.send(
            device,
            Event::Enter {
                serial: 9,
                surface: ObjectId::new(c, 1),
                x: 1.5,
                y: 2.5,
                offer: Some(ObjectId::new(c, 0xff00_0000)),
            },
        );

        assert_eq!(
            sink.into_deliveries(),
            vec![Delivery::Client {
                target: c,
                message: Message::Enter {
                    id: 0,
                    device: 2,
                    serial: 9,
                    surface: 1,
                    x: 1.5,
                    y: 2.5,
                    offer: Some(0xff00_0000),
                },
            }]
        );
    }

    #[test]
    fn send_carries_destination_path() {
        let c = ClientId::new();
        let mut sink = BrokerSink::new();
        sink.send(
            ObjectId::new(c, 10),
            Event::Send {
                mime_type: "text/plain".into(),
                destination: Destination::Path("/run/user/1000/fifo".into()),
            },
        );
        match sink.into_deliveries().as_slice() {
            [Delivery::Client {
                message: Message::Send { destination, .. },
                ..
            }] => assert_eq!(destination, "/run/user/1000/fifo"),
            other => panic!("unexpected deliveries: {other:?}"),
        }
    }

    #[test]
    fn descriptor_destination_is_not_forwarded() {
        let (_read, write) = nix::unistd::pipe().unwrap();
        let mut sink = BrokerSink::new();
        sink.send(
            ObjectId::new(ClientId::new(), 10),
            Event::Send {
                mime_type: "text/plain".into(),
                destination: Destination::Fd(write),
            },
        );
        assert!(sink.into_deliveries().is_empty());
    }

    #[test]
    fn no_memory_becomes_error_event() {
        let c = ClientId::new();
        let mut sink = BrokerSink::new();
        sink.post_no_memory(ObjectId::new(c, 10));
        assert_eq!(
            sink.into_deliveries(),
            vec![Delivery::Client {
                target: c,
                message: Message::Error {
                    id: 0,
                    object: 10,
                    code: "no_memory".into(),
                },
            }]
        );
    }

    #[test]
    fn collaborator_calls_go_to_observers() {
        let c = ClientId::new();
        let icon = ObjectId::new(c, 5);
        let mut sink = BrokerSink::new();
        sink.drag_icon(icon);
        sink.attach(icon, None, 0, 0);
        sink.selection_changed(None);

        let deliveries = sink.into_deliveries();
        assert_eq!(deliveries.len(), 3);
        assert!(
            deliveries
                .iter()
                .all(|d| matches!(d, Delivery::Observers(_)))
        );
        assert_eq!(
            deliveries[1],
            Delivery::Observers(Message::Attach {
                id: 0,
                surface: icon.into(),
                buffer: None,
                x: 0,
                y: 0,
            })
        );
    }
}
