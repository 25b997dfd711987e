//! Auth popup card state machine.
//!
//! Exactly one card is current. A transition is requested synchronously
//! ([`CardMachine::request`]) and then played out asynchronously
//! ([`CardMachine::run`]); between the two the machine is busy and every
//! other request is rejected. Nothing is queued and nothing is interrupted.
//!
//! ```text
//!            Forward                Forward
//!   Login ─────────────▶ LoggedIn    Login ─────────────▶ ForgotPassword
//!   Login ◀───────────── LoggedIn    Login ◀───────────── ForgotPassword
//!            Backward               Backward
//!
//!   ForgotPassword ──Forward──▶ ResetPassword ──Backward──▶ Login
//! ```

use std::sync::{Mutex, MutexGuard, PoisonError};

use sitekit_auth::SessionState;
use sitekit_core::AnimationConfig;
use thiserror::Error;

use crate::stage::{CardStage, entry_animations, entry_offset, exit_animations};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CardState {
    Login,
    LoggedIn,
    ForgotPassword,
    ResetPassword,
}

impl CardState {
    pub fn as_str(&self) -> &'static str {
        match self {
            CardState::Login => "login",
            CardState::LoggedIn => "logged-in",
            CardState::ForgotPassword => "forgot-password",
            CardState::ResetPassword => "reset-password",
        }
    }

    /// Card to show on page load.
    pub fn from_session(state: &SessionState) -> Self {
        if state.is_authenticated() {
            CardState::LoggedIn
        } else {
            CardState::Login
        }
    }
}

impl core::fmt::Display for CardState {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Visual direction of a transition. Only selects slide offsets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Forward,
    Backward,
}

const TRANSITIONS: &[(CardState, CardState, Direction)] = &[
    (CardState::Login, CardState::LoggedIn, Direction::Forward),
    (CardState::LoggedIn, CardState::Login, Direction::Backward),
    (CardState::Login, CardState::ForgotPassword, Direction::Forward),
    (CardState::ForgotPassword, CardState::Login, Direction::Backward),
    (CardState::ForgotPassword, CardState::ResetPassword, Direction::Forward),
    (CardState::ResetPassword, CardState::Login, Direction::Backward),
];

/// Direction of `from → to`, or `None` if that move is not allowed.
pub fn direction_of(from: CardState, to: CardState) -> Option<Direction> {
    TRANSITIONS
        .iter()
        .find(|(f, t, _)| *f == from && *t == to)
        .map(|(_, _, d)| *d)
}

/// An accepted transition. Only [`CardMachine::request`] creates these, and
/// running or abandoning one consumes it.
#[derive(Debug, PartialEq, Eq)]
pub struct Transition {
    from: CardState,
    to: CardState,
    direction: Direction,
}

impl Transition {
    pub fn from(&self) -> CardState {
        self.from
    }

    pub fn to(&self) -> CardState {
        self.to
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }
}

#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
pub enum TransitionRejected {
    #[error("a card transition is already in progress")]
    Busy,

    #[error("already showing the {0} card")]
    AlreadyCurrent(CardState),

    #[error("cannot move from the {from} card to the {to} card")]
    NotAllowed { from: CardState, to: CardState },
}

#[derive(Debug)]
struct Inner {
    current: CardState,
    busy: bool,
}

#[derive(Debug)]
pub struct CardMachine {
    inner: Mutex<Inner>,
    animation: AnimationConfig,
}

impl CardMachine {
    pub fn new(initial: CardState, animation: AnimationConfig) -> Self {
        Self {
            inner: Mutex::new(Inner {
                current: initial,
                busy: false,
            }),
            animation,
        }
    }

    pub fn for_session(state: &SessionState, animation: AnimationConfig) -> Self {
        Self::new(CardState::from_session(state), animation)
    }

    /// The committed card. Mid-transition this is still the outgoing one.
    pub fn current(&self) -> CardState {
        self.lock().current
    }

    pub fn is_busy(&self) -> bool {
        self.lock().busy
    }

    /// Validate a move to `target` and, if accepted, mark the machine busy.
    ///
    /// The caller must follow up with [`run`](Self::run).
    pub fn request(&self, target: CardState) -> Result<Transition, TransitionRejected> {
        let mut inner = self.lock();
        if inner.busy {
            return Err(TransitionRejected::Busy);
        }
        let from = inner.current;
        if from == target {
            return Err(TransitionRejected::AlreadyCurrent(target));
        }
        let direction = direction_of(from, target)
            .ok_or(TransitionRejected::NotAllowed { from, to: target })?;

        inner.busy = true;
        Ok(Transition {
            from,
            to: target,
            direction,
        })
    }

    /// Play out an accepted transition: exit, swap, entry, commit.
    ///
    /// Each step waits for the previous one. A failed animation is logged
    /// and the sequence continues, so the machine always ends on `to` and
    /// not busy. Dropping the future part-way has the same end state: if
    /// the cards were not swapped yet, the swap happens without animation.
    ///
    /// A transition that no longer matches the machine (not busy, or busy
    /// from another card) is ignored.
    pub fn run<'a, S>(
        &'a self,
        transition: Transition,
        stage: &'a S,
    ) -> impl Future<Output = ()> + Send + 'a
    where
        S: CardStage + ?Sized,
    {
        let swap = self.claim(transition, stage);
        async move {
            if let Some(swap) = swap {
                swap.play().await;
            }
        }
    }

    /// Release an accepted transition that will never be run. The current
    /// card is unchanged.
    pub fn abandon(&self, transition: Transition) {
        let mut inner = self.lock();
        if inner.busy && inner.current == transition.from {
            inner.busy = false;
        }
    }

    /// [`request`](Self::request) then [`run`](Self::run). Returns the card
    /// now showing.
    pub async fn transition_to<S>(
        &self,
        target: CardState,
        stage: &S,
    ) -> Result<CardState, TransitionRejected>
    where
        S: CardStage + ?Sized,
    {
        let transition = self.request(target)?;
        self.run(transition, stage).await;
        Ok(target)
    }

    fn claim<'a, S>(&'a self, transition: Transition, stage: &'a S) -> Option<Swap<'a, S>>
    where
        S: CardStage + ?Sized,
    {
        let inner = self.lock();
        if !inner.busy || inner.current != transition.from {
            tracing::warn!(
                from = %transition.from,
                to = %transition.to,
                current = %inner.current,
                busy = inner.busy,
                "stale card transition ignored"
            );
            return None;
        }
        Some(Swap {
            machine: self,
            stage,
            transition,
            swapped: false,
        })
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// A claimed transition. Commits the target card and clears `busy` when
/// dropped, swapping the cards first if that step was never reached.
struct Swap<'a, S>
where
    S: CardStage + ?Sized,
{
    machine: &'a CardMachine,
    stage: &'a S,
    transition: Transition,
    swapped: bool,
}

impl<S> Swap<'_, S>
where
    S: CardStage + ?Sized,
{
    async fn play(mut self) {
        let (from, to, direction) = (
            self.transition.from,
            self.transition.to,
            self.transition.direction,
        );
        let machine = self.machine;
        let animation = &machine.animation;

        tracing::debug!(%from, %to, "card transition started");

        if let Err(err) = self
            .stage
            .animate(from, &exit_animations(direction, animation))
            .await
        {
            tracing::warn!(%from, %to, error = %err, "exit animation failed");
        }

        self.swap(entry_offset(direction, animation));

        if let Err(err) = self
            .stage
            .animate(to, &entry_animations(direction, animation))
            .await
        {
            tracing::warn!(%from, %to, error = %err, "entry animation failed");
        }

        tracing::debug!(%from, %to, "card transition finished");
    }

    fn swap(&mut self, offset_px: f64) {
        if self.swapped {
            return;
        }
        self.stage.hide(self.transition.from);
        self.stage.show_at(self.transition.to, offset_px);
        self.swapped = true;
    }
}

impl<S> Drop for Swap<'_, S>
where
    S: CardStage + ?Sized,
{
    fn drop(&mut self) {
        if !self.swapped {
            tracing::debug!(from = %self.transition.from, to = %self.transition.to, "card transition cut short");
            self.swap(0.0);
        }
        let mut inner = self.machine.lock();
        inner.current = self.transition.to;
        inner.busy = false;
    }
}
