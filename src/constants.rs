// src/constants.rs
//! Domain constants that define the operational boundaries of the system.
//!
//! Each constant is named for the domain concept it constrains, not its
//! technical role. Reading these constants should tell you how an extraction
//! run behaves: how much it asks for per page, how it paces secondary
//! lookups, how long a consumer waits for it to finish.

// ---------------------------------------------------------------------------
// Upstream API boundaries
// ---------------------------------------------------------------------------

/// How many primary records are requested per page (`$first`).
///
/// GraphQL admin APIs commonly cap connections at 250 nodes per page; 100
/// keeps query cost comfortably below the per-request budget.
pub const UPSTREAM_PAGE_SIZE: u32 = 100;

/// Hard ceiling on pages fetched in one run.
///
/// A misbehaving upstream that always reports `hasNextPage: true` with a
/// fresh cursor would otherwise loop forever.
pub const UPSTREAM_MAX_PAGES: u32 = 10_000;

/// API version used when the source configuration does not name one.
pub const DEFAULT_API_VERSION: &str = "2024-10";

/// Header carrying the app access token for header-style authentication.
pub const ACCESS_TOKEN_HEADER: &str = "X-Shopify-Access-Token";

/// Seconds to wait for a TCP connection to the upstream host.
pub const UPSTREAM_CONNECT_TIMEOUT_SECS: u64 = 10;

/// Seconds to wait for a full upstream response.
pub const UPSTREAM_REQUEST_TIMEOUT_SECS: u64 = 60;

// ---------------------------------------------------------------------------
// Secondary enrichment
// ---------------------------------------------------------------------------

/// Number of ids substituted into one enrichment query.
pub const ENRICHMENT_BATCH_SIZE: usize = 50;

/// Pause between consecutive enrichment batches, in milliseconds.
///
/// Batches run strictly one after another; this delay is the whole
/// rate-limit strategy for the secondary lookups.
pub const ENRICHMENT_THROTTLE_MS: u64 = 500;

/// Field under which matched secondary nodes are attached to a primary record.
pub const DEFAULT_MERGE_FIELD: &str = "enrichment";

// ---------------------------------------------------------------------------
// Polling consumer
// ---------------------------------------------------------------------------

/// Maximum status reads before a consumer reports a timeout.
pub const MAX_POLL_COUNT: u32 = 60;

/// Milliseconds between status reads.
pub const POLL_INTERVAL_MS: u64 = 2_000;

/// Consecutive failed status reads tolerated before the consumer gives up.
pub const MAX_CONSECUTIVE_POLL_ERRORS: u32 = 3;

/// Progress shown while a run is still in flight is capped at this value.
pub const PROGRESS_CEILING_WHILE_RUNNING: u8 = 99;

// ---------------------------------------------------------------------------
// Error display
// ---------------------------------------------------------------------------

/// Maximum characters kept from an upstream response body in error values.
pub const ERROR_BODY_PREVIEW_LENGTH: usize = 200;
