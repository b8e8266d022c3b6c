//! Matchmaking for Terrabound.
//!
//! The [`Allocator`] answers "which session should this player join?".
//! It reads the player's skill rating, scans the shared session registry
//! for an open session whose skill band is centred closest to that
//! rating, and claims a seat in it with a compare-and-swap write. When
//! nothing fits it spawns a new session and registers it.
//!
//! Every external dependency is a trait with an in-memory adapter:
//!
//! | Trait | In-memory adapter |
//! |---|---|
//! | [`SessionRegistry`] | [`InMemoryRegistry`] |
//! | [`AccountStore`] | [`InMemoryAccountStore`] |
//! | [`SessionSpawner`] | provided by the server crate |
//! | [`Clock`] | [`SystemClock`], [`FixedClock`] |

mod account;
mod allocator;
mod clock;
mod error;
mod memory;
mod registry;
mod spawner;

pub use account::{AccountStore, parse_skill_rating};
pub use allocator::{Allocator, AllocatorConfig, RatingSource, select_candidate};
pub use clock::{Clock, FixedClock, SystemClock};
pub use error::{AccountError, MatchmakerError, RegistryError, SpawnError};
pub use memory::{InMemoryAccountStore, InMemoryRegistry};
pub use registry::{RegistryEntry, SessionRegistry, Version, Versioned};
pub use spawner::SessionSpawner;
