//! Minimal observable state container.

use crate::action::Action;
use crate::state::ListState;

pub type Reducer<S, A> = fn(&S, &A) -> S;
type Listener<S> = Box<dyn FnMut(&S, &S)>;

/// Handle returned by [`Store::subscribe`].
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct Subscription(u64);

pub struct Store<S, A> {
    state: S,
    reducer: Reducer<S, A>,
    listeners: Vec<(Subscription, Listener<S>)>,
    next_id: u64,
}

pub type ListStore = Store<ListState, Action>;

impl<S, A> Store<S, A> {
    pub fn new(initial: S, reducer: Reducer<S, A>) -> Self {
        Self {
            state: initial,
            reducer,
            listeners: Vec::new(),
            next_id: 0,
        }
    }

    pub fn state(&self) -> &S {
        &self.state
    }

    /// Reduce, then notify every listener in subscription order with
    /// `(state, old_state)`.
    pub fn dispatch(&mut self, action: &A) -> &S {
        let next = (self.reducer)(&self.state, action);
        let old = std::mem::replace(&mut self.state, next);
        for (_, listener) in self.listeners.iter_mut() {
            listener(&self.state, &old);
        }
        &self.state
    }

    pub fn subscribe(&mut self, listener: impl FnMut(&S, &S) + 'static) -> Subscription {
        let id = Subscription(self.next_id);
        self.next_id += 1;
        self.listeners.push((id, Box::new(listener)));
        id
    }

    /// Returns false when the subscription was already gone.
    pub fn unsubscribe(&mut self, subscription: Subscription) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(id, _)| *id != subscription);
        self.listeners.len() != before
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }
}

impl ListStore {
    pub fn for_list(initial: ListState) -> Self {
        Store::new(initial, crate::reducer::reduce)
    }
}
