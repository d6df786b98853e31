//! Review actor for CQRS command handling.
//!
//! One actor owns one review session. Its mailbox is the serialization point:
//! mutations are processed strictly one at a time, in arrival order, so a
//! second `complete_step` sent while the first is still persisting waits its
//! turn instead of interleaving.

use crate::domain::cqrs::{ReviewAggregate, ReviewCommand, ReviewEventEnvelope, ReviewQuery};
use crate::domain::errors::ReviewError;
use crate::domain::services::ReviewServices;
use crate::domain::session::ReviewSession;
use crate::domain::step_data::StepPayload;
use crate::domain::types::{ReviewId, StepId};
use crate::event_store::FileEventStore;
use crate::structured_logger::StructuredLogger;
use async_trait::async_trait;
use cqrs_es::CqrsFramework;
use ractor::concurrency::JoinHandle;
use ractor::{Actor, ActorProcessingErr, ActorRef};
use std::fmt;
use std::sync::Arc;
use tokio::sync::{broadcast, oneshot, watch, Mutex};
use tracing::{debug, warn};

pub type SessionReply = oneshot::Sender<Result<ReviewSession, ReviewError>>;

/// Messages that can be sent to the review actor.
pub enum ReviewMessage {
    /// Execute a command and return the re-read session (or error).
    Execute(Box<ReviewCommand>, SessionReply),
    /// Re-read the authoritative session from the store.
    Reload(SessionReply),
    /// Get the last session this actor observed. Also used as a barrier.
    GetSession(oneshot::Sender<ReviewSession>),
}

/// Arguments for spawning a review actor.
pub struct ReviewActorArgs {
    pub review_id: ReviewId,
    pub store: FileEventStore,
    pub services: ReviewServices,
    /// Authoritative session as loaded by the caller.
    pub session: ReviewSession,
    pub session_tx: watch::Sender<ReviewSession>,
    pub event_tx: broadcast::Sender<ReviewEventEnvelope>,
    pub audit: Option<Arc<StructuredLogger>>,
}

/// State maintained by the review actor.
pub struct ReviewActorState {
    cqrs: CqrsFramework<ReviewAggregate, FileEventStore>,
    store: FileEventStore,
    review_id: ReviewId,
    /// Last session this actor read from the store.
    session: ReviewSession,
    session_tx: watch::Sender<ReviewSession>,
    audit: Option<Arc<StructuredLogger>>,
}

/// The review actor.
pub struct ReviewActor;

impl ReviewActor {
    /// Builds the CQRS framework from actor arguments.
    pub fn build_cqrs(args: &ReviewActorArgs) -> CqrsFramework<ReviewAggregate, FileEventStore> {
        review_framework(
            &args.store,
            &args.services,
            args.event_tx.clone(),
            args.audit.clone(),
        )
    }
}

/// CQRS framework over the file store, fanning committed events out to
/// `event_tx` and the audit log.
pub(crate) fn review_framework(
    store: &FileEventStore,
    services: &ReviewServices,
    event_tx: broadcast::Sender<ReviewEventEnvelope>,
    audit: Option<Arc<StructuredLogger>>,
) -> CqrsFramework<ReviewAggregate, FileEventStore> {
    let query = ReviewQuery::new(event_tx, audit);
    CqrsFramework::new(store.clone(), vec![Box::new(query)], services.clone())
}

impl ReviewActorState {
    async fn load(&self) -> Result<ReviewSession, ReviewError> {
        self.store
            .load_session(&self.review_id)
            .await?
            .ok_or_else(|| ReviewError::not_found(format!("review {}", self.review_id)))
    }

    fn adopt(&mut self, session: ReviewSession) {
        self.session = session.clone();
        self.session_tx.send_replace(session);
    }

    fn reject(&self, command: &str, error: ReviewError) -> ReviewError {
        if let Some(audit) = &self.audit {
            audit.log_review_rejected(&self.review_id, command, &error);
        }
        debug!(review_id = %self.review_id, command, "review command rejected: {}", error);
        error
    }

    async fn reload(&mut self) -> Result<ReviewSession, ReviewError> {
        let fresh = self.load().await?;
        self.adopt(fresh.clone());
        Ok(fresh)
    }

    async fn execute(&mut self, command: ReviewCommand) -> Result<ReviewSession, ReviewError> {
        let name = command.name();

        // Never trust the cached copy: another handle or process may have
        // written since this actor last looked.
        let fresh = self.load().await.map_err(|e| self.reject(name, e))?;
        if fresh.version() != self.session.version() {
            let error = ReviewError::conflict(format!(
                "review {} changed from version {} to {}; reload before retrying",
                self.review_id,
                self.session.version(),
                fresh.version()
            ));
            self.adopt(fresh);
            return Err(self.reject(name, error));
        }

        fresh.check(&command).map_err(|e| self.reject(name, e))?;

        if let Some(audit) = &self.audit {
            audit.log_review_command(&self.review_id, &command);
        }

        if let Err(err) = self.cqrs.execute(&self.review_id.to_string(), command).await {
            let error = ReviewError::from(err);
            if error.requires_reload() {
                if let Ok(latest) = self.load().await {
                    self.adopt(latest);
                }
            }
            return Err(self.reject(name, error));
        }

        self.reload().await
    }
}

#[async_trait]
impl Actor for ReviewActor {
    type Msg = ReviewMessage;
    type State = ReviewActorState;
    type Arguments = ReviewActorArgs;

    async fn pre_start(
        &self,
        _myself: ActorRef<Self::Msg>,
        args: Self::Arguments,
    ) -> Result<Self::State, ActorProcessingErr> {
        let cqrs = ReviewActor::build_cqrs(&args);

        Ok(ReviewActorState {
            cqrs,
            store: args.store,
            review_id: args.review_id,
            session: args.session,
            session_tx: args.session_tx,
            audit: args.audit,
        })
    }

    async fn handle(
        &self,
        _myself: ActorRef<Self::Msg>,
        message: Self::Msg,
        state: &mut Self::State,
    ) -> Result<(), ActorProcessingErr> {
        match message {
            ReviewMessage::Execute(boxed_cmd, reply) => {
                let result = state.execute(*boxed_cmd).await;
                if let Err(e) = &result {
                    if !matches!(e, ReviewError::Validation { .. }) {
                        warn!(review_id = %state.review_id, "review command failed: {}", e);
                    }
                }
                if reply.send(result).is_err() {
                    debug!("Command reply channel closed");
                }
            }
            ReviewMessage::Reload(reply) => {
                let result = state.reload().await;
                if reply.send(result).is_err() {
                    debug!("Reload reply channel closed");
                }
            }
            ReviewMessage::GetSession(reply) => {
                if reply.send(state.session.clone()).is_err() {
                    debug!("Session reply channel closed");
                }
            }
        }

        Ok(())
    }
}

/// Handle to one open review session.
///
/// Clones share the same actor, so every clone sees the same mailbox order.
#[derive(Clone)]
pub struct ReviewHandle {
    id: ReviewId,
    actor: ActorRef<ReviewMessage>,
    join: Arc<Mutex<Option<JoinHandle<()>>>>,
    session_rx: watch::Receiver<ReviewSession>,
    event_tx: broadcast::Sender<ReviewEventEnvelope>,
}

impl fmt::Debug for ReviewHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReviewHandle")
            .field("id", &self.id)
            .finish_non_exhaustive()
    }
}

impl ReviewHandle {
    /// Spawns the actor for an already persisted session.
    pub async fn spawn(
        store: FileEventStore,
        services: ReviewServices,
        session: ReviewSession,
        event_tx: broadcast::Sender<ReviewEventEnvelope>,
        audit: Option<Arc<StructuredLogger>>,
    ) -> Result<Self, ReviewError> {
        let id = session.id().clone();
        let (session_tx, session_rx) = watch::channel(session.clone());
        let args = ReviewActorArgs {
            review_id: id.clone(),
            store,
            services,
            session,
            session_tx,
            event_tx: event_tx.clone(),
            audit,
        };

        let (actor, join) = ReviewActor::spawn(None, ReviewActor, args)
            .await
            .map_err(|e| ReviewError::repository(format!("failed to spawn review actor: {}", e)))?;
        debug!(review_id = %id, "review actor started");

        Ok(Self {
            id,
            actor,
            join: Arc::new(Mutex::new(Some(join))),
            session_rx,
            event_tx,
        })
    }

    pub fn id(&self) -> &ReviewId {
        &self.id
    }

    /// Latest session this handle has published. Use [`reload`](Self::reload)
    /// for the authoritative copy.
    pub fn session(&self) -> ReviewSession {
        self.session_rx.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<ReviewSession> {
        self.session_rx.clone()
    }

    pub fn events(&self) -> broadcast::Receiver<ReviewEventEnvelope> {
        self.event_tx.subscribe()
    }

    pub async fn reload(&self) -> Result<ReviewSession, ReviewError> {
        self.call(ReviewMessage::Reload).await
    }

    pub async fn complete_step(
        &self,
        step_id: impl Into<StepId>,
        data: StepPayload,
    ) -> Result<ReviewSession, ReviewError> {
        self.execute(ReviewCommand::CompleteStep {
            step_id: step_id.into(),
            data,
        })
        .await
    }

    pub async fn previous_step(&self) -> Result<ReviewSession, ReviewError> {
        self.execute(ReviewCommand::PreviousStep).await
    }

    pub async fn pause(&self) -> Result<ReviewSession, ReviewError> {
        self.execute(ReviewCommand::Pause).await
    }

    pub async fn resume(&self) -> Result<ReviewSession, ReviewError> {
        self.execute(ReviewCommand::Resume).await
    }

    pub async fn abandon(&self, reason: Option<String>) -> Result<ReviewSession, ReviewError> {
        self.execute(ReviewCommand::Abandon { reason }).await
    }

    pub async fn complete(&self, notes: Option<String>) -> Result<ReviewSession, ReviewError> {
        self.execute(ReviewCommand::Complete { notes }).await
    }

    async fn execute(&self, command: ReviewCommand) -> Result<ReviewSession, ReviewError> {
        self.call(|reply| ReviewMessage::Execute(Box::new(command), reply))
            .await
    }

    async fn call(
        &self,
        message: impl FnOnce(SessionReply) -> ReviewMessage,
    ) -> Result<ReviewSession, ReviewError> {
        let (tx, rx) = oneshot::channel();
        self.actor
            .send_message(message(tx))
            .map_err(|_| ReviewError::repository(format!("review {} is closed", self.id)))?;
        rx.await
            .map_err(|_| ReviewError::repository(format!("review {} stopped mid-call", self.id)))?
    }

    /// Waits for every queued message, then stops the actor.
    pub async fn close(self) {
        let (tx, rx) = oneshot::channel();
        if self.actor.send_message(ReviewMessage::GetSession(tx)).is_ok() {
            // The mailbox is FIFO, so this reply means everything sent
            // before it has been handled.
            let _ = rx.await;
        }
        self.actor.stop(None);

        if let Some(join) = self.join.lock().await.take() {
            if let Err(e) = join.await {
                warn!(review_id = %self.id, "review actor exited abnormally: {}", e);
            }
        }
        debug!(review_id = %self.id, "review actor stopped");
    }
}

#[cfg(test)]
#[path = "tests/actor_tests.rs"]
mod tests;
