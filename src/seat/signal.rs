//! Destruction signals and the weak references built on them.
//!
//! Every object owned by the seat carries a [`Signal`]. Anything that
//! refers to an object from elsewhere holds a [`Link`]: the referent's
//! id plus the token of the listener it registered on the referent's
//! signal. When the referent is destroyed its listeners are handed back
//! exactly once and each holder clears its link. A holder that goes
//! away first removes its listener by token.

/// Handle for one listener attached to a [`Signal`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerToken(u64);

/// One-to-many destruction notification.
///
/// Listeners are plain values; the owner of the signal decides what a
/// listener means when it fires. No ordering between listeners is
/// promised.
#[derive(Debug)]
pub struct Signal<L> {
    next_token: u64,
    listeners: Vec<(ListenerToken, L)>,
}

impl<L> Default for Signal<L> {
    fn default() -> Self {
        Self {
            next_token: 0,
            listeners: Vec::new(),
        }
    }
}

impl<L> Signal<L> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach a listener. The returned token detaches it again.
    pub fn add(&mut self, listener: L) -> ListenerToken {
        let token = ListenerToken(self.next_token);
        self.next_token += 1;
        self.listeners.push((token, listener));
        token
    }

    /// Detach a listener before the signal fires.
    ///
    /// Returns the listener, or `None` if the token was already removed.
    pub fn remove(&mut self, token: ListenerToken) -> Option<L> {
        let index = self.listeners.iter().position(|(t, _)| *t == token)?;
        Some(self.listeners.remove(index).1)
    }

    /// Fire the signal. Consumes it, so each listener is delivered once.
    pub fn emit(self) -> Vec<L> {
        self.listeners.into_iter().map(|(_, l)| l).collect()
    }

    pub fn len(&self) -> usize {
        self.listeners.len()
    }

    #[allow(dead_code)]
    pub fn is_empty(&self) -> bool {
        self.listeners.is_empty()
    }
}

/// Weak reference to the object stored under key `K`.
///
/// Dereferencing goes through the owning table: a link only proves that
/// a listener was registered, and the holder must drop the link when
/// that listener fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Link<K> {
    target: K,
    token: ListenerToken,
}

impl<K: Copy> Link<K> {
    pub fn new(target: K, token: ListenerToken) -> Self {
        Self { target, token }
    }

    pub fn target(&self) -> K {
        self.target
    }

    pub fn token(&self) -> ListenerToken {
        self.token
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn emit_returns_every_listener_once() {
        let mut signal = Signal::new();
        signal.add("offer");
        signal.add("selection");
        signal.add("drag");

        let mut fired = signal.emit();
        fired.sort();
        assert_eq!(fired, vec!["drag", "offer", "selection"]);
    }

    #[test]
    fn removed_listener_does_not_fire() {
        let mut signal = Signal::new();
        let a = signal.add(1);
        signal.add(2);

        assert_eq!(signal.remove(a), Some(1));
        assert_eq!(signal.emit(), vec![2]);
    }

    #[test]
    fn remove_twice_is_none() {
        let mut signal = Signal::new();
        let a = signal.add(1);
        assert_eq!(signal.remove(a), Some(1));
        assert_eq!(signal.remove(a), None);
        assert!(signal.is_empty());
    }

    #[test]
    fn tokens_are_unique_after_removal() {
        let mut signal = Signal::new();
        let a = signal.add('a');
        signal.remove(a);
        let b = signal.add('b');
        assert_ne!(a, b);
        assert_eq!(signal.len(), 1);
    }

    #[test]
    fn link_carries_target_and_token() {
        let mut signal = Signal::new();
        let token = signal.add(());
        let link = Link::new(42u32, token);
        assert_eq!(link.target(), 42);
        assert_eq!(link.token(), token);
    }
}
