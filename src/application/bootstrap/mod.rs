mod persistence;

pub use persistence::{PersistenceBootstrap, PersistenceHandle};
