//! Corpus engine: fetch documentation pages, normalize them and record provenance.
mod config;
mod convert;
mod decode;
mod dispatch;
mod extract;
mod fallback;
mod fetch;
mod metadata;
mod naming;
mod persist;
mod pipeline;
mod readable;
mod render;
mod types;

pub use config::{ConfigError, PipelineConfig};
pub use convert::{atx_headings, Converter, Html2MdConverter};
pub use decode::{charset_from_content_type, decode_text, resolve_encoding, DecodedText};
pub use dispatch::{
    classify, utc_timestamp, Clock, ContentKind, Dispatched, Dispatcher, OutputLayout,
};
pub use extract::{extract_title, ContentIsolator, DensityIsolator};
pub use fallback::{default_rules, FallbackResolver, FallbackRule};
pub use fetch::{
    FetchSettings, Fetcher, ReqwestFetcher, RetryPolicy, RetryingFetcher, DEFAULT_USER_AGENT,
};
pub use metadata::{read_metadata_log, JsonlMetadataLog, MetadataError, PersistedRecord, RecordSink};
pub use naming::{derive_base_name, sha256_hex, slugify, title_from_base_name, MAX_BASE_NAME_LEN};
pub use persist::{ensure_output_dir, AtomicFileWriter, PersistError};
pub use pipeline::{ItemError, Pipeline, PipelineBuilder, PipelineError};
pub use readable::{ReadableText, ReadableTextExtractor, Tier};
pub use render::{find_chrome_binary, ChromeRenderer, PdfRenderer, RenderError, CHROME_PATH_ENV};
pub use types::{
    FailureKind, FetchError, FetchExhausted, FetchResult, NullProgressSink, PipelineEvent,
    ProgressSink, RunSummary, SourceItem,
};

pub use tokio_util::sync::CancellationToken;
