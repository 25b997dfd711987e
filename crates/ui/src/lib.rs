//! `sitekit-ui` — presentation state that follows the session.
//!
//! - [`CardMachine`]: the auth popup's card state machine
//! - [`CardStage`]: the seam to whatever actually renders the cards
//! - [`CardDriver`]: runs transitions requested by session observers
//! - [`VisibilityController`]: shows/hides rule-tagged elements

pub mod card;
pub mod driver;
pub mod stage;
pub mod visibility;

pub use card::{CardMachine, CardState, Direction, Transition, TransitionRejected};
pub use driver::{CardDriver, CardObserver, observe_session};
pub use stage::{AnimatedProperty, Animation, CardStage, HeadlessStage, StageError, StageStep};
pub use visibility::{AUTH_ATTRIBUTE, ElementStore, VisibilityController, VisibilityRule};
