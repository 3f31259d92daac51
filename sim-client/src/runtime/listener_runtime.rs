/********************************************************************************
 * Copyright (c) 2026 Contributors to the Eclipse Foundation
 *
 * See the NOTICE file(s) distributed with this work for additional
 * information regarding copyright ownership.
 *
 * This program and the accompanying materials are made available under the
 * terms of the Apache License Version 2.0 which is available at
 * https://www.apache.org/licenses/LICENSE-2.0
 *
 * SPDX-License-Identifier: Apache-2.0
 ********************************************************************************/

//! Runtime helper for spawning topic listener loops on dedicated threads.

use crate::observability::events;
use std::future::Future;
use std::io;
use std::thread;
use std::time::Duration;
use tokio::runtime::Builder;
use tokio::sync::oneshot;
use tracing::{debug, warn};

pub(crate) const DEFAULT_LISTENER_RUNTIME_THREAD_NAME: &str = "sim-topic-listener";

const COMPONENT: &str = "listener_runtime";

/// Result of waiting on a listener thread.
#[derive(Debug)]
pub(crate) enum ListenerJoin<T> {
    /// The loop returned and handed back its value.
    Finished(T),
    /// The loop did not return within the wait bound.
    TimedOut,
    /// The thread went away without handing back a value.
    Lost,
}

/// Handle to one listener thread and the value its loop hands back on exit.
pub(crate) struct ListenerLoopHandle<T> {
    thread_name: String,
    thread: thread::JoinHandle<()>,
    finished: oneshot::Receiver<T>,
}

impl<T> ListenerLoopHandle<T> {
    pub(crate) fn thread_name(&self) -> &str {
        &self.thread_name
    }

    /// Waits up to `timeout` for the loop to return.
    ///
    /// A thread that misses the bound is detached, not killed.
    pub(crate) async fn join(self, timeout: Duration) -> ListenerJoin<T> {
        let Self {
            thread_name,
            thread,
            finished,
        } = self;

        match tokio::time::timeout(timeout, finished).await {
            Ok(Ok(value)) => {
                if thread.is_finished() && thread.join().is_err() {
                    warn!(
                        event = events::LISTENER_JOIN_LOST,
                        component = COMPONENT,
                        listener_thread = thread_name.as_str(),
                        "listener thread panicked after handing back its channel"
                    );
                }
                ListenerJoin::Finished(value)
            }
            Ok(Err(_)) => ListenerJoin::Lost,
            Err(_) => ListenerJoin::TimedOut,
        }
    }
}

/// Spawns `run_loop` on a new named thread driving its own current-thread runtime.
///
/// The runtime is built before the thread starts so a build failure is
/// reported to the caller instead of killing the thread silently.
pub(crate) fn spawn_listener_loop<F, Fut, T>(
    thread_name: String,
    run_loop: F,
) -> io::Result<ListenerLoopHandle<T>>
where
    F: FnOnce() -> Fut + Send + 'static,
    Fut: Future<Output = T>,
    T: Send + 'static,
{
    let runtime = Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|err| {
            warn!(
                event = events::RUNTIME_BUILD_FAILED,
                component = COMPONENT,
                listener_thread = thread_name.as_str(),
                err = %err,
                "unable to build listener runtime"
            );
            err
        })?;

    let (finished_tx, finished_rx) = oneshot::channel();

    let thread = thread::Builder::new()
        .name(thread_name.clone())
        .spawn(move || {
            let value = runtime.block_on(run_loop());
            let _ = finished_tx.send(value);
        })
        .map_err(|err| {
            warn!(
                event = events::RUNTIME_SPAWN_FAILED,
                component = COMPONENT,
                listener_thread = thread_name.as_str(),
                err = %err,
                "unable to spawn listener thread"
            );
            err
        })?;

    debug!(
        event = events::RUNTIME_SPAWN_OK,
        component = COMPONENT,
        listener_thread = thread_name.as_str(),
        "spawned listener thread"
    );

    Ok(ListenerLoopHandle {
        thread_name,
        thread,
        finished: finished_rx,
    })
}

#[cfg(test)]
mod tests {
    use super::{spawn_listener_loop, ListenerJoin};
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    #[tokio::test]
    async fn join_returns_value_handed_back_by_loop() {
        let handle = spawn_listener_loop("sim-topic-test".to_string(), || async {
            tokio::time::sleep(Duration::from_millis(10)).await;
            std::thread::current().name().map(str::to_string)
        })
        .expect("listener thread should spawn");

        assert_eq!(handle.thread_name(), "sim-topic-test");
        match handle.join(Duration::from_secs(2)).await {
            ListenerJoin::Finished(name) => assert_eq!(name.as_deref(), Some("sim-topic-test")),
            other => panic!("unexpected join outcome: {other:?}"),
        }
    }

    #[tokio::test]
    async fn join_times_out_on_slow_loop() {
        let release = Arc::new(AtomicBool::new(false));
        let release_in_loop = release.clone();
        let handle = spawn_listener_loop("sim-topic-slow".to_string(), move || async move {
            while !release_in_loop.load(Ordering::Acquire) {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .expect("listener thread should spawn");

        let outcome = handle.join(Duration::from_millis(50)).await;
        release.store(true, Ordering::Release);

        assert!(matches!(outcome, ListenerJoin::TimedOut));
    }

    #[tokio::test]
    async fn join_reports_lost_when_loop_panics() {
        let handle = spawn_listener_loop("sim-topic-panic".to_string(), || async {
            panic!("listener loop failure");
        })
        .expect("listener thread should spawn");

        let outcome: ListenerJoin<()> = handle.join(Duration::from_secs(2)).await;

        assert!(matches!(outcome, ListenerJoin::Lost));
    }
}
