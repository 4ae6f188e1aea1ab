mod config;
mod logging;

use std::{
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    time::Duration,
};

use config::SmokeConfig;
use tokio::{runtime::Handle, time::timeout};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use transition_core::{
    FailureClass, HistoryView, LifecycleChannel, LifecycleEvent, SerialDispatcher, TransitionError,
    TransitionErrorCategory, TransitionQueue,
};
use transition_platform::{ConnectingApiStatus, HandoffContainer, TrackedApiStatus, track_call};

const DRAIN_TIMEOUT: Duration = Duration::from_secs(10);
const SIMULATED_CALL: Duration = Duration::from_millis(5);

/// Simulated foreground surface; `generation` bumps whenever the window is
/// created again.
#[derive(Debug, Clone, PartialEq, Eq)]
struct DemoSurface {
    name: String,
    generation: u32,
}

/// Arguments parked for the screen a transition opens.
#[derive(Debug)]
struct ScreenArgs {
    index: usize,
}

#[tokio::main]
async fn main() {
    logging::init();

    let config = match SmokeConfig::from_env() {
        Ok(config) => config,
        Err(err) => {
            eprintln!("Invalid configuration: {err}");
            std::process::exit(2);
        }
    };
    info!(
        actions = config.actions,
        submitters = config.submitters,
        history_capacity = config.history_capacity,
        "starting transition smoke run"
    );

    let (dispatcher, dispatcher_task) = SerialDispatcher::spawn(&Handle::current());
    let queue = TransitionQueue::<DemoSurface>::with_classifier(
        config.queue_config(),
        dispatcher,
        |err: &TransitionError| match err.category {
            TransitionErrorCategory::SurfaceDetached => FailureClass::Suspending,
            _ => FailureClass::Terminal,
        },
    );
    let (lifecycle, events) = LifecycleChannel::new(16);
    let cancel = CancellationToken::new();
    let listener = queue.attach_lifecycle(events, cancel.clone());

    let api_status = TrackedApiStatus::default();
    let handoff = HandoffContainer::default();

    let submitters = (0..config.submitters)
        .map(|submitter| {
            let queue = queue.clone();
            let api_status = api_status.clone();
            let handoff = handoff.clone();
            let total = config.actions;
            let stride = config.submitters;
            tokio::spawn(async move {
                for index in (submitter..total).step_by(stride) {
                    let label = format!("open_screen_{index}");
                    track_call(&api_status, &label, tokio::time::sleep(SIMULATED_CALL)).await;

                    let consumed = Arc::new(AtomicBool::new(false));
                    let expiry = Arc::clone(&consumed);
                    if let Err(err) = handoff.insert(
                        move || expiry.load(Ordering::SeqCst),
                        ScreenArgs { index },
                    ) {
                        warn!(%label, error = %err, "failed parking screen arguments");
                    }

                    // The first screen's window gets recreated under it, which
                    // exercises the suspend-and-retry path.
                    let recreates = (index == 0).then(|| queue.clone());
                    let mut recreated = false;
                    queue.submit_with_history(
                        label,
                        move |surface: &DemoSurface, history: &HistoryView| {
                            if let Some(queue) = recreates.as_ref()
                                && !recreated
                            {
                                recreated = true;
                                info!(index, generation = surface.generation, "recreating window mid-transition");
                                queue.on_surface_unavailable();
                                queue.on_surface_available(DemoSurface {
                                    name: surface.name.clone(),
                                    generation: surface.generation + 1,
                                });
                                return Err(TransitionError::surface_detached(
                                    "window recreated before the screen opened",
                                ));
                            }
                            debug!(
                                index,
                                surface = %surface.name,
                                generation = surface.generation,
                                recent = history.labels().len(),
                                "opening screen"
                            );
                            consumed.store(true, Ordering::SeqCst);
                            Ok(())
                        },
                    );
                }
            })
        })
        .collect::<Vec<_>>();

    run_lifecycle(&lifecycle, &config).await;

    for submitter in submitters {
        if let Err(err) = submitter.await {
            error!(error = %err, "submitter task failed");
        }
    }

    let drained = timeout(DRAIN_TIMEOUT, async {
        loop {
            let status = queue.status();
            if status.pending == 0 && !status.draining {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await;
    if drained.is_err() {
        error!(status = ?queue.status(), "transitions did not drain in time");
    }

    match handoff.search::<ScreenArgs>() {
        Ok(leftover) => info!(
            leftover = leftover.len(),
            first = ?leftover.first().map(|args| args.index),
            "unconsumed screen arguments"
        ),
        Err(err) => warn!(error = %err, "failed inspecting handoff container"),
    }
    let connecting = *api_status.connecting_count().borrow();
    info!(connecting, "api calls still in flight");

    match serde_json::to_string_pretty(&queue.history()) {
        Ok(encoded) => println!("{encoded}"),
        Err(err) => error!(error = %err, "failed encoding transition history"),
    }

    cancel.cancel();
    if let Err(err) = listener.await {
        error!(error = %err, "lifecycle listener failed");
    }
    drop(queue);
    if timeout(Duration::from_secs(2), dispatcher_task).await.is_err() {
        warn!("dispatcher did not shut down in time");
    }

    if drained.is_err() {
        std::process::exit(1);
    }
}

/// Bring a surface up, drop it mid-run, then bring a fresh one back.
async fn run_lifecycle(lifecycle: &LifecycleChannel<DemoSurface>, config: &SmokeConfig) {
    let surface = |generation| DemoSurface {
        name: config.surface_name.clone(),
        generation,
    };
    let script = [
        LifecycleEvent::Created,
        LifecycleEvent::Started,
        LifecycleEvent::Resumed(surface(1)),
        LifecycleEvent::Paused,
        LifecycleEvent::Stopped,
        LifecycleEvent::Started,
        LifecycleEvent::Resumed(surface(2)),
    ];

    tokio::time::sleep(config.surface_delay()).await;
    for event in script {
        let pause = matches!(event, LifecycleEvent::Resumed(_));
        debug!(event = event.kind(), "emitting lifecycle event");
        if let Err(err) = lifecycle.emit(event).await {
            warn!(error = %err, "lifecycle channel closed early");
            return;
        }
        if pause {
            tokio::time::sleep(config.surface_delay() / 2).await;
        }
    }
}
