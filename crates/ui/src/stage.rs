//! Rendering seam for card transitions.
//!
//! The machine decides *what* moves and in which order; a [`CardStage`]
//! decides how. Animations are plain data so a stage can map them onto CSS
//! transitions, a terminal redraw, or nothing at all.

use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use sitekit_core::AnimationConfig;
use thiserror::Error;

use crate::card::{CardState, Direction};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AnimatedProperty {
    Opacity,
    /// Horizontal offset in pixels.
    TranslateX,
}

impl AnimatedProperty {
    pub fn as_str(&self) -> &'static str {
        match self {
            AnimatedProperty::Opacity => "opacity",
            AnimatedProperty::TranslateX => "translate-x",
        }
    }
}

/// One property tween. All animations in a batch run together.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Animation {
    pub property: AnimatedProperty,
    pub from: f64,
    pub to: f64,
    pub duration: Duration,
}

impl Animation {
    pub fn new(property: AnimatedProperty, from: f64, to: f64, duration: Duration) -> Self {
        Self {
            property,
            from,
            to,
            duration,
        }
    }
}

/// Where the outgoing card slides to: left when moving forward, right when
/// moving back.
pub fn exit_offset(direction: Direction, config: &AnimationConfig) -> f64 {
    match direction {
        Direction::Forward => -config.offset_px,
        Direction::Backward => config.offset_px,
    }
}

/// Where the incoming card waits before its entry animation.
pub fn entry_offset(direction: Direction, config: &AnimationConfig) -> f64 {
    -exit_offset(direction, config)
}

pub fn exit_animations(direction: Direction, config: &AnimationConfig) -> [Animation; 2] {
    [
        Animation::new(
            AnimatedProperty::TranslateX,
            0.0,
            exit_offset(direction, config),
            config.duration,
        ),
        Animation::new(AnimatedProperty::Opacity, 1.0, 0.0, config.duration),
    ]
}

pub fn entry_animations(direction: Direction, config: &AnimationConfig) -> [Animation; 2] {
    [
        Animation::new(
            AnimatedProperty::TranslateX,
            entry_offset(direction, config),
            0.0,
            config.duration,
        ),
        Animation::new(AnimatedProperty::Opacity, 0.0, 1.0, config.duration),
    ]
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("card animation failed: {0}")]
pub struct StageError(pub String);

/// Renders cards for a [`CardMachine`](crate::CardMachine).
///
/// `animate` resolves when the batch has finished. `hide` and `show_at` are
/// immediate.
#[async_trait]
pub trait CardStage: Send + Sync {
    async fn animate(&self, card: CardState, animations: &[Animation]) -> Result<(), StageError>;

    fn hide(&self, card: CardState);

    /// Make `card` visible, displaced horizontally by `offset_px`.
    fn show_at(&self, card: CardState, offset_px: f64);
}

/// What a [`HeadlessStage`] was asked to do, in order.
#[derive(Debug, Clone, PartialEq)]
pub enum StageStep {
    Animate(CardState, Vec<Animation>),
    Hide(CardState),
    ShowAt(CardState, f64),
}

/// Stage with no rendering: waits out each animation's duration and keeps a
/// log of steps plus the set of visible cards.
#[derive(Debug, Default)]
pub struct HeadlessStage {
    steps: Mutex<Vec<StageStep>>,
    visible: Mutex<Vec<CardState>>,
}

impl HeadlessStage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stage that starts with `card` on screen.
    pub fn showing(card: CardState) -> Self {
        let stage = Self::default();
        stage.set_visible(card, true);
        stage
    }

    pub fn steps(&self) -> Vec<StageStep> {
        self.steps
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn visible(&self) -> Vec<CardState> {
        self.visible
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn log(&self, step: StageStep) {
        self.steps
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(step);
    }

    fn set_visible(&self, card: CardState, visible: bool) {
        let mut cards = self.visible.lock().unwrap_or_else(PoisonError::into_inner);
        cards.retain(|c| *c != card);
        if visible {
            cards.push(card);
        }
    }
}

#[async_trait]
impl CardStage for HeadlessStage {
    async fn animate(&self, card: CardState, animations: &[Animation]) -> Result<(), StageError> {
        self.log(StageStep::Animate(card, animations.to_vec()));
        let longest = animations
            .iter()
            .map(|a| a.duration)
            .max()
            .unwrap_or_default();
        if !longest.is_zero() {
            tokio::time::sleep(longest).await;
        }
        Ok(())
    }

    fn hide(&self, card: CardState) {
        self.log(StageStep::Hide(card));
        self.set_visible(card, false);
    }

    fn show_at(&self, card: CardState, offset_px: f64) {
        self.log(StageStep::ShowAt(card, offset_px));
        self.set_visible(card, true);
    }
}
