//! Test fixtures shared by the seat's unit tests.

use super::{ClientId, Event, EventSink, ObjectId, Seat, SeatConfig};

/// Everything a seat pushed through its sink, in order.
#[derive(Debug)]
pub enum Recorded {
    Event(ObjectId, Event),
    NoMemory(ObjectId),
    Attach {
        surface: ObjectId,
        buffer: Option<ObjectId>,
    },
    SelectionChanged(Option<ObjectId>),
    DragIcon(ObjectId),
}

#[derive(Debug, Default)]
pub struct RecordingSink {
    pub log: Vec<Recorded>,
}

impl RecordingSink {
    /// Events addressed to `resource`, in emission order.
    pub fn events_for(&self, resource: ObjectId) -> Vec<&Event> {
        self.log
            .iter()
            .filter_map(|r| match r {
                Recorded::Event(target, event) if *target == resource => Some(event),
                _ => None,
            })
            .collect()
    }

    /// Events addressed to any object of `client`.
    pub fn events_for_client(&self, client: ClientId) -> Vec<(ObjectId, &Event)> {
        self.log
            .iter()
            .filter_map(|r| match r {
                Recorded::Event(target, event) if target.client == client => {
                    Some((*target, event))
                }
                _ => None,
            })
            .collect()
    }

    pub fn clear(&mut self) {
        self.log.clear();
    }
}

impl EventSink for RecordingSink {
    fn send(&mut self, resource: ObjectId, event: Event) {
        self.log.push(Recorded::Event(resource, event));
    }

    fn post_no_memory(&mut self, resource: ObjectId) {
        self.log.push(Recorded::NoMemory(resource));
    }

    fn attach(&mut self, surface: ObjectId, buffer: Option<ObjectId>, _x: i32, _y: i32) {
        self.log.push(Recorded::Attach { surface, buffer });
    }

    fn selection_changed(&mut self, source: Option<ObjectId>) {
        self.log.push(Recorded::SelectionChanged(source));
    }

    fn drag_icon(&mut self, surface: ObjectId) {
        self.log.push(Recorded::DragIcon(surface));
    }
}

/// A connection with one surface (id 1) and, optionally, a data device (id 2).
#[derive(Debug, Clone, Copy)]
pub struct App {
    pub client: ClientId,
    pub surface: ObjectId,
    device: Option<ObjectId>,
}

impl App {
    pub fn device(&self) -> ObjectId {
        self.device.expect("app was created without a data device")
    }
}

pub fn seat() -> Seat {
    Seat::new(SeatConfig::default())
}

pub fn app_with_device(seat: &mut Seat) -> App {
    let mut app = app_without_device(seat);
    let device = ObjectId::new(app.client, 2);
    seat.get_data_device(device).unwrap();
    app.device = Some(device);
    app
}

pub fn app_without_device(seat: &mut Seat) -> App {
    let client = ClientId::new();
    let surface = ObjectId::new(client, 1);
    seat.create_surface(surface).unwrap();
    App {
        client,
        surface,
        device: None,
    }
}

/// Create a data source owned by `client` advertising `mime_types`.
pub fn source_with(
    seat: &mut Seat,
    client: ClientId,
    mime_types: &[&str],
    sink: &mut dyn EventSink,
) -> ObjectId {
    let id = (10..)
        .map(|n| ObjectId::new(client, n))
        .find(|id| !seat.contains(*id))
        .unwrap();
    seat.create_data_source(id).unwrap();
    for mime in mime_types {
        seat.source_offer(id, (*mime).to_string(), sink).unwrap();
    }
    id
}

/// Mime types announced on `offer`, in order.
pub fn announced_mime_types(sink: &RecordingSink, offer: ObjectId) -> Vec<String> {
    sink.events_for(offer)
        .into_iter()
        .filter_map(|e| match e {
            Event::Offer { mime_type } => Some(mime_type.clone()),
            _ => None,
        })
        .collect()
}
