pub mod scoring;
pub mod selection;
pub mod sequencer;
