use std::sync::Arc;

use anyhow::Result;
use tokio::select;
use tokio::sync::mpsc::{Receiver, Sender};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::compositor::{Compositor, RenderedStrip};
use crate::error::RenderError;
use crate::events::{PreviewEvent, RenderRequest};
use crate::tasks::loader::ImageLoader;

/// Generation a render was started under.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderTicket(u64);

impl RenderTicket {
    pub fn generation(self) -> u64 {
        self.0
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommitOutcome {
    Applied,
    Failed(String),
    /// A newer render was started; the result was dropped.
    Stale,
}

/// Last good preview plus the generation counter guarding it.
#[derive(Debug, Default)]
pub struct PreviewSlot {
    current: u64,
    preview: Option<Arc<RenderedStrip>>,
    error: Option<String>,
}

impl PreviewSlot {
    /// Starts a new generation; every older ticket becomes stale.
    pub fn begin(&mut self) -> RenderTicket {
        self.current += 1;
        RenderTicket(self.current)
    }

    pub fn is_current(&self, ticket: RenderTicket) -> bool {
        ticket.0 == self.current
    }

    /// Applies a finished render if its ticket is still current.
    ///
    /// A failure keeps the previous preview and records the message.
    pub fn commit(
        &mut self,
        ticket: RenderTicket,
        result: Result<RenderedStrip, RenderError>,
    ) -> CommitOutcome {
        if !self.is_current(ticket) {
            return CommitOutcome::Stale;
        }
        match result {
            Ok(strip) => {
                self.preview = Some(Arc::new(strip));
                self.error = None;
                CommitOutcome::Applied
            }
            Err(err) => {
                let message = error_chain(&err);
                self.error = Some(message.clone());
                CommitOutcome::Failed(message)
            }
        }
    }

    pub fn preview(&self) -> Option<&Arc<RenderedStrip>> {
        self.preview.as_ref()
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }
}

fn error_chain(err: &RenderError) -> String {
    let mut message = err.to_string();
    let mut source = std::error::Error::source(err);
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}

/// Renders every request and publishes results that are still current.
///
/// Renders overlap freely; only the latest generation reaches `to_ui`.
/// Exits on cancel, or once the request channel is closed and in-flight renders settle.
pub async fn run<L: ImageLoader>(
    mut requests: Receiver<RenderRequest>,
    to_ui: Sender<PreviewEvent>,
    cancel: CancellationToken,
    compositor: Compositor<L>,
) -> Result<()> {
    let compositor = Arc::new(compositor);
    let mut slot = PreviewSlot::default();
    let mut tasks: JoinSet<(RenderTicket, Result<RenderedStrip, RenderError>)> = JoinSet::new();
    let mut accepting = true;

    loop {
        select! {
            _ = cancel.cancelled() => break,

            maybe_req = requests.recv(), if accepting => {
                match maybe_req {
                    Some(RenderRequest { images, background }) => {
                        let ticket = slot.begin();
                        debug!(generation = ticket.generation(), images = images.len(), "render requested");
                        let compositor = Arc::clone(&compositor);
                        tasks.spawn(async move {
                            let result = compositor.render(&images, background.as_ref()).await;
                            (ticket, result)
                        });
                    }
                    None => {
                        accepting = false;
                        if tasks.is_empty() {
                            break;
                        }
                    }
                }
            }

            Some(joined) = tasks.join_next() => {
                match joined {
                    Ok((ticket, result)) => {
                        let generation = ticket.generation();
                        let event = match slot.commit(ticket, result) {
                            CommitOutcome::Applied => slot
                                .preview()
                                .map(|strip| PreviewEvent::Updated { generation, strip: Arc::clone(strip) }),
                            CommitOutcome::Failed(message) => {
                                warn!(generation, "render failed: {message}");
                                Some(PreviewEvent::Failed { generation, message })
                            }
                            CommitOutcome::Stale => {
                                debug!(generation, "dropping superseded render");
                                None
                            }
                        };
                        if let Some(event) = event {
                            if to_ui.send(event).await.is_err() {
                                break;
                            }
                        }
                    }
                    Err(err) => warn!("render task failed: {err}"),
                }
                if !accepting && tasks.is_empty() {
                    break;
                }
            }
        }
    }

    Ok(())
}
