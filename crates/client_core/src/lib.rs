use std::sync::atomic::{AtomicBool, Ordering};

use chrono::{DateTime, Utc};
use shared::{
    domain::{FormSchema, FormVariant},
    error::FormError,
    protocol::{FormState, ReportNode},
};
use tokio::sync::{broadcast, Mutex};
use tracing::{debug, info, warn};

pub mod error;
pub mod render;
pub mod transport;

pub use error::{SubmitError, TransportConfigError};
pub use render::{DisplayFragment, ReportRenderer, Subsection};
pub use transport::{HttpTransport, ReportTransport};

const EVENT_CHANNEL_CAPACITY: usize = 64;

#[derive(Debug, Clone, Copy, Default)]
pub struct ControllerOptions {
    pub variant: FormVariant,
    /// Drop the previously shown report when a later submission fails.
    pub clear_report_on_error: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ControllerEvent {
    LoadingChanged(bool),
    ReportReady,
    /// Bring the freshly stored report into view.
    RevealReport,
    ErrorRaised(String),
    Cleared,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportView {
    pub report: ReportNode,
    pub received_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct ControllerSnapshot {
    pub form: FormState,
    pub error: Option<String>,
    pub loading: bool,
    pub report: Option<ReportView>,
}

struct ControllerState {
    form: FormState,
    error: Option<String>,
    report: Option<ReportView>,
    /// Bumped by `clear()`; a response for an older generation is discarded.
    generation: u64,
}

/// Marks a submission as running. Cleared on drop, so an early return or a
/// cancelled future cannot leave the controller stuck in the loading state.
struct InFlightGuard<'a> {
    flag: &'a AtomicBool,
    events: &'a broadcast::Sender<ControllerEvent>,
}

impl<'a> InFlightGuard<'a> {
    fn acquire(
        flag: &'a AtomicBool,
        events: &'a broadcast::Sender<ControllerEvent>,
    ) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()?;
        let _ = events.send(ControllerEvent::LoadingChanged(true));
        Some(Self { flag, events })
    }
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
        let _ = self.events.send(ControllerEvent::LoadingChanged(false));
    }
}

/// Owns the form, the error slot and the last report, and runs one
/// submit/response cycle at a time against a [`ReportTransport`].
pub struct FormController<T: ReportTransport> {
    transport: T,
    options: ControllerOptions,
    state: Mutex<ControllerState>,
    in_flight: AtomicBool,
    events: broadcast::Sender<ControllerEvent>,
}

impl FormController<HttpTransport> {
    pub fn connect(base_url: &str, options: ControllerOptions) -> Result<Self, TransportConfigError> {
        Ok(Self::new(HttpTransport::new(base_url)?, options))
    }
}

impl<T: ReportTransport> FormController<T> {
    pub fn new(transport: T, options: ControllerOptions) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            transport,
            options,
            state: Mutex::new(ControllerState {
                form: FormState::new(options.variant),
                error: None,
                report: None,
                generation: 0,
            }),
            in_flight: AtomicBool::new(false),
            events,
        }
    }

    pub fn schema(&self) -> &'static FormSchema {
        FormSchema::for_variant(self.options.variant)
    }

    pub fn options(&self) -> ControllerOptions {
        self.options
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Renderer configured with this variant's label style.
    pub fn renderer(&self) -> ReportRenderer {
        ReportRenderer::new(self.schema().label_style)
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<ControllerEvent> {
        self.events.subscribe()
    }

    pub async fn set_field(&self, name: &str, value: impl Into<String>) -> Result<(), FormError> {
        self.state.lock().await.form.set(name, value)
    }

    pub async fn form(&self) -> FormState {
        self.state.lock().await.form.clone()
    }

    pub async fn error(&self) -> Option<String> {
        self.state.lock().await.error.clone()
    }

    pub async fn report(&self) -> Option<ReportView> {
        self.state.lock().await.report.clone()
    }

    pub fn is_loading(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    pub async fn snapshot(&self) -> ControllerSnapshot {
        let state = self.state.lock().await;
        ControllerSnapshot {
            form: state.form.clone(),
            error: state.error.clone(),
            loading: self.is_loading(),
            report: state.report.clone(),
        }
    }

    /// Sends the current form to the report service once.
    ///
    /// A call made while another submission is running is rejected with
    /// [`SubmitError::AlreadyInFlight`] and leaves all state untouched. Every
    /// other failure is also written to the error slot as a user-facing line.
    /// If the form is cleared while the request is out, the response is still
    /// returned to the caller but is not stored.
    pub async fn submit(&self) -> Result<ReportView, SubmitError> {
        let Some(_guard) = InFlightGuard::acquire(&self.in_flight, &self.events) else {
            warn!("submit ignored: a report request is already in flight");
            return Err(SubmitError::AlreadyInFlight);
        };

        let (payload, generation) = {
            let mut state = self.state.lock().await;
            state.error = None;
            let missing = state.form.missing_required();
            if !missing.is_empty() {
                debug!(?missing, "submitting with blank required fields");
            }
            (state.form.to_payload(), state.generation)
        };

        info!(variant = %self.options.variant, "submitting report request");
        let result = self.transport.generate_report(&payload).await;

        let mut state = self.state.lock().await;
        if state.generation != generation {
            drop(state);
            debug!("form was cleared during submission; discarding the response");
            return result.map(|report| ReportView {
                report,
                received_at: Utc::now(),
            });
        }
        match result {
            Ok(report) => {
                let view = ReportView {
                    report,
                    received_at: Utc::now(),
                };
                state.report = Some(view.clone());
                drop(state);

                let _ = self.events.send(ControllerEvent::ReportReady);
                if self.schema().reveal_on_success {
                    let _ = self.events.send(ControllerEvent::RevealReport);
                }
                Ok(view)
            }
            Err(err) => {
                let message = err.user_message();
                warn!(error = %err, %message, "report submission failed");
                state.error = Some(message.clone());
                if self.options.clear_report_on_error {
                    state.report = None;
                }
                drop(state);

                let _ = self.events.send(ControllerEvent::ErrorRaised(message));
                Err(err)
            }
        }
    }

    /// Empties the form and forgets the report and error. Only available on
    /// variants that offer a clear action.
    pub async fn clear(&self) -> Result<(), FormError> {
        let schema = self.schema();
        if !schema.allows_clear {
            return Err(FormError::ClearUnavailable(schema.variant));
        }

        {
            let mut state = self.state.lock().await;
            state.form.reset();
            state.report = None;
            state.error = None;
            state.generation += 1;
        }
        debug!(variant = %schema.variant, "form cleared");
        let _ = self.events.send(ControllerEvent::Cleared);
        Ok(())
    }

    pub async fn check_health(&self) -> Result<String, SubmitError> {
        self.transport.check_health().await
    }
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
