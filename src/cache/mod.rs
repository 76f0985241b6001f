/// Disk-backed result cache and its retention policy
///
/// The worker keeps intermediate artifacts (normalized audio, raw and
/// corrected subtitles, extracted context) under one directory per input:
///
/// ```text
/// <cache root>/
///   ep01/          <- key derived from ep01.mkv
///     context.json
///     raw.srt
///   ep02/
/// ```
///
/// [`CacheStore`] inspects and deletes those directories. [`CachePolicy`]
/// decides which ones to delete, based on the configured
/// [`CacheStrategy`](crate::settings::CacheStrategy).
///
/// The worker writes to the root outside of any lock held here. Time-based
/// sweeps only touch entries old enough to be stable, which narrows that race
/// without closing it.
pub mod error;
pub mod keys;
pub mod policy;
pub mod store;

pub use error::{CacheError, Result};
pub use keys::key_for;
pub use policy::{CachePolicy, SweepStats};
pub use store::{CacheEntry, CacheInfo, CacheStore, EntryStamp};
