// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Durable storage.

pub mod store;

pub use store::{classify_deletion, StoreData, WorkoutStore};
