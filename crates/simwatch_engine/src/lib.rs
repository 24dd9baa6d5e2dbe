//! Simwatch engine: status streaming, cancellation, timing ticks and
//! artifact download.
mod download;
mod engine;
mod frame;
mod interpret;
mod persist;
mod settings;
mod stream;
mod ticker;
mod types;

pub use download::{DownloadError, Downloader, ReqwestDownloader};
pub use engine::EngineHandle;
pub use frame::{Frame, FrameDecoder};
pub use interpret::{extract_artifact, interpret_frame, is_artifact_name, StatusUpdate};
pub use persist::{ensure_output_dir, AtomicFileWriter, PendingFile, PersistError};
pub use settings::EngineSettings;
pub use stream::{EventSink, ReqwestStatusSource, StatusSource};
pub use ticker::{run_ticker, TICK_PERIOD};
pub use types::{EngineEvent, FailureKind, RunId, StreamEnd, TransportError};
