//! Print affordance.
//!
//! Printing hands the original file bytes to the host environment, which
//! opens them in a separate viewing context and runs its own print dialog.
//! The crate only sequences the steps; it never prints anything itself.

use serde::Serialize;
use std::future::Future;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PrintError {
    #[error("Printing is unavailable until a document is loaded")]
    Disabled,

    #[error("The print window could not be opened")]
    Blocked,

    #[error("Print host error: {0}")]
    Host(String),
}

impl Serialize for PrintError {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

/// Handle to the bytes of the currently loaded file. One exists per
/// successful load; the session drops the previous one on replacement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrintResource {
    id: String,
    file_name: String,
    bytes: Arc<[u8]>,
}

impl PrintResource {
    pub fn new(id: impl Into<String>, file_name: impl Into<String>, bytes: Arc<[u8]>) -> Self {
        Self { id: id.into(), file_name: file_name.into(), bytes }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }
}

/// A viewing context opened on a [`PrintResource`].
pub trait PrintContext: Send {
    /// Resolves once the context has finished loading the resource.
    fn loaded(&mut self) -> impl Future<Output = Result<(), PrintError>> + Send;

    fn focus(&mut self);

    /// Invoke the host's print dialog.
    fn print(&mut self) -> Result<(), PrintError>;
}

/// Something that can open a new viewing context, such as a browser window
/// or an OS document viewer.
pub trait PrintHost: Sync {
    type Context: PrintContext;

    fn open(
        &self,
        resource: &PrintResource,
    ) -> impl Future<Output = Result<Self::Context, PrintError>> + Send;
}

/// Open `resource`, wait for it to load, focus it and print.
pub async fn print_resource<H: PrintHost>(
    host: &H,
    resource: &PrintResource,
) -> Result<(), PrintError> {
    debug!(id = resource.id(), file = resource.file_name(), "opening print context");
    let mut context = host.open(resource).await?;
    context.loaded().await?;
    context.focus();
    context.print()?;
    info!(id = resource.id(), "print dialog invoked");
    Ok(())
}

#[cfg(test)]
pub(crate) mod fake {
    use super::*;
    use std::sync::Mutex;

    /// Records every step the print flow takes.
    #[derive(Debug, Default)]
    pub(crate) struct RecordingHost {
        pub(crate) steps: Arc<Mutex<Vec<String>>>,
        pub(crate) block: bool,
    }

    pub(crate) struct RecordingContext {
        steps: Arc<Mutex<Vec<String>>>,
    }

    impl RecordingContext {
        fn record(&self, step: String) {
            self.steps.lock().unwrap().push(step);
        }
    }

    impl PrintContext for RecordingContext {
        fn loaded(&mut self) -> impl Future<Output = Result<(), PrintError>> + Send {
            self.record("loaded".to_string());
            async { Ok(()) }
        }

        fn focus(&mut self) {
            self.record("focus".to_string());
        }

        fn print(&mut self) -> Result<(), PrintError> {
            self.record("print".to_string());
            Ok(())
        }
    }

    impl RecordingHost {
        pub(crate) fn steps(&self) -> Vec<String> {
            self.steps.lock().unwrap().clone()
        }
    }

    impl PrintHost for RecordingHost {
        type Context = RecordingContext;

        fn open(
            &self,
            resource: &PrintResource,
        ) -> impl Future<Output = Result<Self::Context, PrintError>> + Send {
            let steps = Arc::clone(&self.steps);
            let opened = format!("open {} ({} bytes)", resource.id(), resource.bytes().len());
            let block = self.block;
            async move {
                if block {
                    return Err(PrintError::Blocked);
                }
                steps.lock().unwrap().push(opened);
                Ok(RecordingContext { steps })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::fake::RecordingHost;
    use super::*;

    fn resource() -> PrintResource {
        PrintResource::new("doc_1", "report.pdf", Arc::from(&b"%PDF-1.5"[..]))
    }

    #[tokio::test]
    async fn steps_run_in_order() {
        let host = RecordingHost::default();
        print_resource(&host, &resource()).await.unwrap();

        assert_eq!(host.steps(), vec!["open doc_1 (8 bytes)", "loaded", "focus", "print"]);
    }

    #[tokio::test]
    async fn blocked_window_stops_before_printing() {
        let host = RecordingHost { block: true, ..Default::default() };
        let err = print_resource(&host, &resource()).await.unwrap_err();

        assert_eq!(err, PrintError::Blocked);
        assert!(host.steps().is_empty());
    }

    #[test]
    fn errors_serialize_as_messages() {
        let json = serde_json::to_string(&PrintError::Disabled).unwrap();
        assert_eq!(json, "\"Printing is unavailable until a document is loaded\"");
    }
}
