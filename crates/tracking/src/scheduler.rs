use std::{sync::Arc, time::Duration};

use futures::{
    future::{BoxFuture, Fuse, FusedFuture},
    FutureExt,
};
use model::snapshot::Snapshot;
use tokio::{
    sync::mpsc,
    task::JoinHandle,
    time::{self, Instant, MissedTickBehavior},
};
use tokio_util::sync::CancellationToken;

use crate::{
    backend::{MapBackend, MapEventReceiver},
    config::TrackerConfig,
    engine::Tracker,
    fetcher::FallbackFetcher,
    handle::{Command, TrackerHandle},
    transport::Transport,
    FetchError,
};

const COMMAND_BUFFER: usize = 32;

type PendingFetch = Fuse<BoxFuture<'static, Result<Snapshot, FetchError>>>;

/// Drives fetch, reconcile and render on a fixed period, with at most one
/// fetch in flight.
pub struct PollScheduler<T: Transport + 'static> {
    fetcher: Arc<FallbackFetcher<T>>,
    period: Duration,
    tracker: Tracker,
    commands: mpsc::Receiver<Command>,
    events: MapEventReceiver,
    cancel: CancellationToken,
}

/// Starts the engine on the current runtime.
pub fn spawn<T: Transport + 'static>(
    config: &TrackerConfig,
    fetcher: FallbackFetcher<T>,
    interactive: Box<dyn MapBackend>,
) -> (TrackerHandle, JoinHandle<()>) {
    let (command_sender, commands) = mpsc::channel(COMMAND_BUFFER);
    let (event_sender, events) = mpsc::unbounded_channel();
    let (tracker, dashboard) = Tracker::new(config.into(), interactive, event_sender);
    let cancel = CancellationToken::new();

    let scheduler = PollScheduler {
        fetcher: Arc::new(fetcher),
        period: config.poll_interval(),
        tracker,
        commands,
        events,
        cancel: cancel.clone(),
    };
    let handle = TrackerHandle::new(command_sender, dashboard, cancel);
    (handle, tokio::spawn(scheduler.run()))
}

impl<T: Transport + 'static> PollScheduler<T> {
    fn start_fetch(&self) -> PendingFetch {
        let fetcher = self.fetcher.clone();
        async move { fetcher.fetch().await }.boxed().fuse()
    }

    pub async fn run(mut self) {
        log::info!(
            "Tracking engine started, polling every {}s.",
            self.period.as_secs()
        );
        let mut interval = time::interval(self.period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut in_flight: PendingFetch = Fuse::terminated();

        loop {
            let movement_deadline = self.tracker.movement_deadline();
            tokio::select! {
                biased;

                _ = self.cancel.cancelled() => {
                    if !in_flight.is_terminated() {
                        log::info!("Abandoning the fetch in flight.");
                    }
                    break;
                }
                result = &mut in_flight, if !in_flight.is_terminated() => {
                    self.settle(result);
                }
                Some(command) = self.commands.recv() => {
                    self.handle_command(command, &mut in_flight);
                }
                Some(event) = self.events.recv() => {
                    self.tracker.handle_event(event, Instant::now());
                }
                _ = time::sleep_until(movement_deadline.unwrap_or_else(Instant::now)),
                    if movement_deadline.is_some() => {
                    self.tracker.expire_movement(Instant::now());
                }
                _ = interval.tick() => {
                    if in_flight.is_terminated() {
                        in_flight = self.start_fetch();
                    } else {
                        log::debug!("Previous fetch still in flight, skipping this tick.");
                    }
                }
            }
        }
        log::info!("Tracking engine stopped.");
    }

    fn settle(&mut self, result: Result<Snapshot, FetchError>) {
        match result {
            Ok(snapshot) => {
                self.tracker.apply_snapshot(snapshot, Instant::now());
            }
            Err(why) => {
                log::warn!("Positions could not be fetched: {}", why);
                self.tracker.record_failure(&why, Instant::now());
            }
        }
    }

    fn handle_command(&mut self, command: Command, in_flight: &mut PendingFetch) {
        let now = Instant::now();
        let delivered = match command {
            Command::Follow { id, responder } => {
                responder.send(self.tracker.follow(&id, now)).is_ok()
            }
            Command::StopFollowing { responder } => {
                responder.send(self.tracker.stop_following(now)).is_ok()
            }
            Command::SelectMarker { id, responder } => {
                responder.send(self.tracker.select_marker(&id)).is_ok()
            }
            Command::FitAll { responder } => {
                self.tracker.fit_all(now);
                responder.send(()).is_ok()
            }
            Command::CloseDetails { responder } => {
                self.tracker.close_details(now);
                responder.send(()).is_ok()
            }
            Command::RetryInteractive { responder } => {
                responder.send(self.tracker.retry_interactive(now)).is_ok()
            }
            Command::Refresh { responder } => {
                let started = in_flight.is_terminated();
                if started {
                    *in_flight = self.start_fetch();
                }
                responder.send(started).is_ok()
            }
        };
        if !delivered {
            log::error!("Requester went away before the engine answered.");
        }
    }
}

#[cfg(test)]
mod tests {
    use model::{status::FetchStatus, vehicle::VehicleId};

    use super::*;
    use crate::{
        backend::InteractiveBackend,
        config::InteractiveConfig,
        fetcher::tests::{endpoint, envelope},
        transport::tests::{Reply, ScriptedTransport},
        CommandError, FollowError,
    };

    const PRIMARY: &str = "http://primary.test/ubicaciones";

    fn start(transport: &ScriptedTransport) -> (TrackerHandle, JoinHandle<()>) {
        let config = TrackerConfig::default();
        let fetcher = FallbackFetcher::new(transport.clone(), vec![endpoint("primary")]);
        spawn(
            &config,
            fetcher,
            Box::new(InteractiveBackend::in_memory(InteractiveConfig::default())),
        )
    }

    #[tokio::test(start_paused = true)]
    async fn teardown_abandons_the_fetch_in_flight() {
        let transport = ScriptedTransport::default();
        transport.script(
            PRIMARY,
            vec![Reply::Delayed(
                Duration::from_secs(5),
                envelope(&[("1", -0.2295, -78.5249)]),
            )],
        );
        let (handle, task) = start(&transport);

        time::sleep(Duration::from_secs(1)).await;
        handle.shutdown();
        task.await.unwrap();
        time::sleep(Duration::from_secs(10)).await;

        assert_eq!(transport.calls().len(), 1);
        let dashboard = handle.dashboard();
        assert!(dashboard.vehicles.is_empty());
        assert_eq!(dashboard.status.fetch, FetchStatus::Pending);
        assert!(!handle.is_running());
        assert_eq!(handle.fit_all().await, Err(CommandError::EngineStopped));
    }

    #[tokio::test(start_paused = true)]
    async fn slow_fetches_never_overlap() {
        let transport = ScriptedTransport::default();
        transport.script(
            PRIMARY,
            vec![Reply::Delayed(
                Duration::from_secs(25),
                envelope(&[("1", -0.2295, -78.5249)]),
            )],
        );
        let (handle, _task) = start(&transport);

        // ticks at 10s and 20s fire while the first fetch is still running
        time::sleep(Duration::from_secs(26)).await;
        assert_eq!(transport.calls().len(), 1);
        assert!(matches!(
            handle.dashboard().status.fetch,
            FetchStatus::Ok { .. }
        ));

        time::sleep(Duration::from_secs(5)).await;
        assert_eq!(transport.calls().len(), 2);
        assert!(!handle.refresh().await.unwrap());
        handle.shutdown();
    }

    #[tokio::test(start_paused = true)]
    async fn failed_cycles_leave_the_fleet_untouched() {
        let transport = ScriptedTransport::default();
        transport.script(
            PRIMARY,
            vec![
                Reply::Body(envelope(&[("1", -0.2295, -78.5249), ("2", -0.18, -78.49)])),
                Reply::Status(502),
            ],
        );
        let (handle, _task) = start(&transport);

        time::sleep(Duration::from_secs(1)).await;
        let applied = handle.dashboard();
        assert_eq!(applied.vehicles.len(), 2);

        time::sleep(Duration::from_secs(10)).await;
        let failed = handle.dashboard();
        assert_eq!(failed.view, applied.view);
        assert_eq!(failed.vehicles.len(), 2);
        assert!(matches!(
            failed.status.fetch,
            FetchStatus::Failing {
                consecutive_failures: 1,
                last_success: Some(_),
                ..
            }
        ));
        handle.shutdown();
    }

    #[tokio::test(start_paused = true)]
    async fn commands_reach_the_engine() {
        let transport = ScriptedTransport::default();
        transport.script(
            PRIMARY,
            vec![Reply::Body(envelope(&[
                ("1", -0.2295, -78.5249),
                ("2", -0.18, -78.49),
            ]))],
        );
        let (handle, _task) = start(&transport);
        time::sleep(Duration::from_secs(1)).await;

        handle.follow(VehicleId::from("2")).await.unwrap();
        assert!(handle.dashboard().status.follow.is_following(&VehicleId::from("2")));
        assert_eq!(
            handle.follow(VehicleId::from("9")).await,
            Err(CommandError::Follow(FollowError::UnknownVehicle(
                VehicleId::from("9")
            )))
        );

        assert!(handle.select_marker(VehicleId::from("1")).await.unwrap());
        time::sleep(Duration::from_millis(10)).await;
        assert!(handle.dashboard().status.follow.is_following(&VehicleId::from("1")));

        assert!(handle.stop_following().await.unwrap());
        assert!(handle.refresh().await.unwrap());
        time::sleep(Duration::from_millis(10)).await;
        assert_eq!(transport.calls().len(), 2);
        handle.shutdown();
    }
}
