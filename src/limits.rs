//! Hard ceilings enforced at mutation entry.

/// Longest accepted stay, in nights.
pub const MAX_STAY_NIGHTS: u32 = 365;

/// Longest accepted guest/property name.
pub const MAX_NAME_LEN: usize = 200;

/// Longest accepted free-text notes field.
pub const MAX_NOTES_LEN: usize = 2_000;

/// Feeds accepted in a single sync batch.
pub const MAX_FEEDS_PER_SYNC: usize = 50;

/// Largest iCal document read from a feed, in bytes.
pub const MAX_FEED_BODY_BYTES: usize = 1_048_576;
