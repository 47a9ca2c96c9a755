// Concrete implementations of the domain ports: file storage, the model client and question stores.

pub mod openai;
pub mod storage;
pub mod store;

#[cfg(feature = "mongo")]
pub mod mongo;
