pub mod commit;
pub mod identity;
pub mod message;
pub mod timestamp;
