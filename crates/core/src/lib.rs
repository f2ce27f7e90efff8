pub mod article;
pub mod cache;
pub mod decode;
pub mod detect;
pub mod document;
pub mod error;
pub mod fetch;
pub mod formatters;
pub mod media;
pub mod pacing;
pub mod parse;
pub mod pipeline;
pub mod render;
pub mod renderer;
pub mod sanitize;
pub mod sources;

pub use article::{ArticleSummary, BodyOrigin, DetailOverrides, NormalizedArticle};
pub use cache::{ContentCache, MemoryCache};
pub use decode::{AssignmentPattern, LiteralStrategy, decode};
pub use detect::{EncodingShape, RawContentFragment, SourceHints, detect};
pub use document::{AstNode, DecodedDocument};
pub use error::{DecodeError, Result, SyndicError};
#[cfg(feature = "fetch")]
pub use fetch::ReqwestGateway;
pub use fetch::{FetchConfig, FetchGateway, FetchOptions};
pub use fetch::{fetch_file, fetch_stdin, parse_url};
pub use formatters::{Feed, JsonConfig, JsonFormatter, OutputFormat, RssConfig, RssFormatter};
pub use formatters::{convert_to_json, convert_to_rss, format_feed};
pub use media::MediaProxy;
pub use pacing::JitterRange;
pub use parse::Document;
pub use pipeline::{Orchestrator, PipelineConfig, PipelineConfigBuilder, RunReport};
pub use render::{RenderContext, render};
#[doc(hidden)]
pub use renderer::{PageLease, RenderedPage, RendererSession};
pub use renderer::{RendererPool, ResourceFilter, WaitUntil};
pub use sanitize::{SanitizeConfig, sanitize_html};
pub use sources::{ArticleSource, DetailRequest, FeedInfo, Listing};
