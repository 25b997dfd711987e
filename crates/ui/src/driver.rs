//! Session-driven card transitions.
//!
//! Session handlers run synchronously inside `publish`, so they only
//! *request* a transition. Accepted transitions go over a channel to a
//! [`CardDriver`], which plays them out on the async side.

use std::sync::Arc;

use sitekit_auth::SessionManager;
use sitekit_auth::session::{LOGGED_IN, LOGGED_OUT};
use sitekit_events::Subscription;
use tokio::sync::mpsc;

use crate::card::{CardMachine, CardState, Transition};
use crate::stage::CardStage;

/// Handle for the session subscriptions installed by [`observe_session`].
#[derive(Debug)]
pub struct CardObserver {
    subscriptions: Vec<Subscription>,
}

impl CardObserver {
    /// Stop following the session. Transitions already sent still run.
    pub fn detach(self) {
        for subscription in self.subscriptions {
            subscription.unsubscribe();
        }
    }
}

/// Receives accepted transitions and runs them one at a time.
#[derive(Debug)]
pub struct CardDriver {
    machine: Arc<CardMachine>,
    transitions: mpsc::UnboundedReceiver<Transition>,
}

impl CardDriver {
    pub fn machine(&self) -> &Arc<CardMachine> {
        &self.machine
    }

    /// Run the next transition and return the card it moved to. `None`
    /// once every sender is gone.
    pub async fn step<S>(&mut self, stage: &S) -> Option<CardState>
    where
        S: CardStage + ?Sized,
    {
        let transition = self.transitions.recv().await?;
        let to = transition.to();
        self.machine.run(transition, stage).await;
        Some(to)
    }

    /// Run transitions until the observer side is dropped.
    pub async fn run<S>(mut self, stage: &S)
    where
        S: CardStage + ?Sized,
    {
        while self.step(stage).await.is_some() {}
        tracing::debug!("card driver stopped");
    }
}

/// Drive `machine` from the session: `logged-in` requests the logged-in
/// card, `logged-out` the login card.
///
/// Requests go through the normal transition rules, so one that arrives
/// while a transition is running, or from a card with no such edge, is
/// dropped.
pub fn observe_session(
    machine: Arc<CardMachine>,
    session: &SessionManager,
) -> (CardObserver, CardDriver) {
    let (sender, transitions) = mpsc::unbounded_channel();

    let subscriptions = [(LOGGED_IN, CardState::LoggedIn), (LOGGED_OUT, CardState::Login)]
        .into_iter()
        .map(|(event_type, target)| {
            let machine = Arc::clone(&machine);
            let sender = sender.clone();
            session.subscribe(event_type, move |_event| {
                match machine.request(target) {
                    Ok(transition) => {
                        if let Err(mpsc::error::SendError(transition)) = sender.send(transition) {
                            // Driver gone; release the machine instead of
                            // leaving it busy.
                            tracing::warn!(%target, "card driver stopped; transition dropped");
                            machine.abandon(transition);
                        }
                    }
                    Err(rejected) => {
                        tracing::debug!(event_type, %target, reason = %rejected, "card transition ignored");
                    }
                }
            })
        })
        .collect();

    (
        CardObserver { subscriptions },
        CardDriver {
            machine,
            transitions,
        },
    )
}
