pub mod room;
pub mod slot;
pub mod slot_participant;
