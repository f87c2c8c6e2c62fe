use model::{vehicle::VehicleId, view::DashboardView};
use tokio::sync::{mpsc, oneshot, watch};
use tokio_util::sync::CancellationToken;

use crate::{CommandError, FollowError, InitError};

pub type CommandResult<O> = Result<O, CommandError>;

#[derive(Debug)]
pub enum Command {
    Follow {
        id: VehicleId,
        responder: oneshot::Sender<Result<(), FollowError>>,
    },
    StopFollowing {
        responder: oneshot::Sender<bool>,
    },
    SelectMarker {
        id: VehicleId,
        responder: oneshot::Sender<bool>,
    },
    FitAll {
        responder: oneshot::Sender<()>,
    },
    CloseDetails {
        responder: oneshot::Sender<()>,
    },
    RetryInteractive {
        responder: oneshot::Sender<Result<(), InitError>>,
    },
    Refresh {
        responder: oneshot::Sender<bool>,
    },
}

/// Cheap to clone access to a running tracking engine.
#[derive(Debug, Clone)]
pub struct TrackerHandle {
    commands: mpsc::Sender<Command>,
    dashboard: watch::Receiver<DashboardView>,
    cancel: CancellationToken,
}

impl TrackerHandle {
    pub(crate) fn new(
        commands: mpsc::Sender<Command>,
        dashboard: watch::Receiver<DashboardView>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            commands,
            dashboard,
            cancel,
        }
    }

    async fn request<O, F>(&self, command: F) -> CommandResult<O>
    where
        F: FnOnce(oneshot::Sender<O>) -> Command,
    {
        let (responder, response) = oneshot::channel();
        self.commands.send(command(responder)).await?;
        Ok(response.await?)
    }

    /// The latest published dashboard.
    pub fn dashboard(&self) -> DashboardView {
        self.dashboard.borrow().clone()
    }

    /// Receives every dashboard published from now on.
    pub fn subscribe(&self) -> watch::Receiver<DashboardView> {
        self.dashboard.clone()
    }

    pub async fn follow(&self, id: VehicleId) -> CommandResult<()> {
        Ok(self
            .request(|responder| Command::Follow { id, responder })
            .await??)
    }

    /// Returns true if a vehicle was followed.
    pub async fn stop_following(&self) -> CommandResult<bool> {
        self.request(|responder| Command::StopFollowing { responder })
            .await
    }

    /// Acts as if the user clicked the marker (or list row) of `id`. Returns
    /// false if nothing is shown for `id`.
    pub async fn select_marker(&self, id: VehicleId) -> CommandResult<bool> {
        self.request(|responder| Command::SelectMarker { id, responder })
            .await
    }

    pub async fn fit_all(&self) -> CommandResult<()> {
        self.request(|responder| Command::FitAll { responder }).await
    }

    pub async fn close_details(&self) -> CommandResult<()> {
        self.request(|responder| Command::CloseDetails { responder })
            .await
    }

    /// Tries to bring the interactive map back after it failed.
    pub async fn retry_interactive(&self) -> CommandResult<()> {
        Ok(self
            .request(|responder| Command::RetryInteractive { responder })
            .await??)
    }

    /// Starts a cycle right away. Returns false if one is already in flight.
    pub async fn refresh(&self) -> CommandResult<bool> {
        self.request(|responder| Command::Refresh { responder })
            .await
    }

    /// Stops the engine. A fetch in flight is abandoned.
    pub fn shutdown(&self) {
        self.cancel.cancel();
    }

    pub fn is_running(&self) -> bool {
        !self.cancel.is_cancelled() && !self.commands.is_closed()
    }
}
