/// Movie catalog used to draw the movies of a new room.
pub mod catalog;
/// Database model definitions.
pub mod models;
/// Room snapshot storage backends.
pub mod room_store;
/// Storage abstraction layer for database operations.
pub mod storage;
