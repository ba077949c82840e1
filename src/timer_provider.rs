use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use futures::stream::FuturesUnordered;
use futures::StreamExt;
use log::{debug, error};
use tokio::select;
use tokio::sync::mpsc;
use tokio::time::sleep;

use crate::ProviderEvent;

/// A one-shot alarm scheduled by the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AlarmEvent {
    pub delay_duration: Duration,
}

/// Engine-side handle for scheduling alarms without blocking the event loop.
#[derive(Clone)]
pub struct TimerHandle {
    alarm_tx: mpsc::Sender<AlarmEvent>,
}

impl TimerHandle {
    pub(crate) fn new(alarm_tx: mpsc::Sender<AlarmEvent>) -> Self {
        Self { alarm_tx }
    }

    pub fn schedule(&self, alarm: AlarmEvent) {
        if let Err(e) = self.alarm_tx.try_send(alarm) {
            error!("Failed to schedule an alarm: {}", e);
        } else {
            debug!("Scheduled an alarm in {:?}.", alarm.delay_duration);
        }
    }
}

/// Runs pending alarms and reports expiries back into the engine's
/// serialization point. Drive `run` on a runtime with timers enabled;
/// it returns once every `TimerHandle` is gone.
pub struct TimerProvider {
    controller_rx: mpsc::Receiver<AlarmEvent>,
    provider_tx: mpsc::Sender<ProviderEvent>,
    timers: FuturesUnordered<Pin<Box<dyn Future<Output = AlarmEvent> + Send>>>,
}

impl TimerProvider {
    pub(crate) fn new(
        provider_tx: mpsc::Sender<ProviderEvent>,
        controller_rx: mpsc::Receiver<AlarmEvent>,
    ) -> Self {
        Self {
            controller_rx,
            provider_tx,
            timers: FuturesUnordered::new(),
        }
    }

    pub async fn run(&mut self) {
        loop {
            select! {
                alarm = self.controller_rx.recv() => {
                    match alarm {
                        Some(alarm) => self.add_timer(alarm),
                        None => {
                            debug!("Timer provider controller channel closed.");
                            return;
                        }
                    }
                }
                Some(expired) = self.timers.next() => {
                    if let Err(e) = self.provider_tx.send(ProviderEvent::Alarm(expired)).await {
                        error!("Timer failed to deliver an alarm: {}", e);
                        return;
                    }
                }
            }
        }
    }

    fn add_timer(&mut self, alarm: AlarmEvent) {
        self.timers.push(Box::pin(async move {
            sleep(alarm.delay_duration).await;
            alarm
        }));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_scheduled_alarm_fires() {
        let (provider_tx, mut provider_rx) = mpsc::channel::<ProviderEvent>(4);
        let (alarm_tx, alarm_rx) = mpsc::channel::<AlarmEvent>(4);
        let handle = TimerHandle::new(alarm_tx);
        let mut provider = TimerProvider::new(provider_tx, alarm_rx);
        tokio::spawn(async move { provider.run().await });

        handle.schedule(AlarmEvent {
            delay_duration: Duration::from_millis(10),
        });

        let event = provider_rx.recv().await;
        assert!(matches!(event, Some(ProviderEvent::Alarm(_))));
    }
}
