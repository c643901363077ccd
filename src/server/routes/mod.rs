pub mod auth;
pub mod galleries;
pub mod lightroom;
pub mod sync;
