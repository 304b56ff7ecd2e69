//! Integration tests for Layer 1: Storage
//!
//! Tests for slot allocation, handles, iteration, maintenance, and
//! change tracking.

mod common;
mod handles;
mod slots;
mod tracking;
