//! Speech translation pipeline.
//!
//! Raw audio goes through multi-candidate language detection, is translated
//! into every requested language in parallel, and optionally synthesized back
//! to speech.  Every engine call runs as a job on a bounded queue with a
//! per-attempt timeout, retry with exponential backoff, and dead-lettering.
//!
//! | Module          | Role                                                 |
//! |-----------------|------------------------------------------------------|
//! | [`language`]    | static language table, validated `Language` handle   |
//! | [`ports`]       | engine traits (transcription, translation, synthesis)|
//! | [`engines`]     | HTTP implementations of the ports                    |
//! | [`queue`]       | job queue, retry policy, cancellation                |
//! | [`pipeline`]    | detector, fan-out, synthesis stage, orchestrator     |
//! | [`preferences`] | read-only per-user language preferences              |
//! | [`config`]      | TOML settings, paths and validation                  |

pub mod config;
pub mod engines;
pub mod language;
pub mod pipeline;
pub mod ports;
pub mod preferences;
pub mod queue;
