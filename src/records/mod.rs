// Public API - what other modules can use
pub use repository::{
    GameRecordRepository, InMemoryGameRecordRepository, PostgresGameRecordRepository, RecordError,
};
pub use subscriber::RecordSubscriber;

// Internal modules
mod repository;
mod subscriber;
