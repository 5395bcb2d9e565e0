//! Repository search: typed endpoint client and the pagination cursor loop.
//!
//! This crate turns a paginated, rate-limited, eventually-consistent search
//! endpoint into a lazy, de-duplicated, effectively unbounded stream of
//! repository identifiers. The cursor only moves backward through time when
//! the provider confirms a page was a complete slice of the window; sampled
//! ("incomplete") pages are consumed without advancing it.

mod client;
mod paginator;
mod schema;

pub use client::{PageFetch, SearchClient, SearchOptions};
pub use paginator::{Cursor, spawn_paginator};
pub use schema::{SearchItem, SearchPage};
