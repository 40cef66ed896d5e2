use std::{ops::Deref, sync::Arc};

/// Shared application state registered on the [`Router`](crate::router::Router)
/// and injected into every request's extensions.
#[derive(Debug)]
pub struct State<T>(pub Arc<T>);

impl<T> State<T> {
    pub fn new(value: T) -> Self {
        Self(Arc::new(value))
    }
}

impl<T> Clone for State<T> {
    fn clone(&self) -> Self {
        Self(Arc::clone(&self.0))
    }
}

impl<T> Deref for State<T> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}
