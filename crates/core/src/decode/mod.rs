//! Decoders, one per encoding shape.
//!
//! [`decode`] dispatches on the [`EncodingShape`] reported by the detector.
//! Inline HTML passes through untouched; assigned literals are unescaped;
//! JSON trees are parsed into an [`AstNode`](crate::document::AstNode).
//! External references and unknown shapes produce `None`, leaving the caller
//! to fetch again or keep the teaser.

pub mod entities;
pub mod json_ast;
pub mod literal;

pub use entities::{decode_entities, encode_entities};
pub use json_ast::{parse_document, parse_document_str};
pub use literal::{Assignment, AssignmentPattern, LiteralStrategy, decode_literal, find_assignment};

use crate::detect::EncodingShape;
use crate::document::DecodedDocument;
use crate::error::DecodeError;

/// Decodes a detected payload.
///
/// # Errors
///
/// Returns a [`DecodeError`] when the payload is malformed. The raw payload is
/// logged at error level before returning so failures can be diagnosed.
pub fn decode(shape: &EncodingShape, strategy: LiteralStrategy) -> Result<Option<DecodedDocument>, DecodeError> {
    let result = match shape {
        EncodingShape::InlineHtml(html) => Ok(Some(DecodedDocument::Html(html.clone()))),
        EncodingShape::AssignedLiteral(assignment) => decode_literal(&assignment.payload, strategy)
            .map(|html| Some(DecodedDocument::Html(html)))
            .inspect_err(|e| {
                tracing::error!(
                    object = %assignment.object,
                    field = %assignment.field,
                    error = %e,
                    payload = %assignment.payload,
                    "failed to decode assigned literal"
                )
            }),
        EncodingShape::JsonAst(value) => parse_document(value).map(|tree| Some(DecodedDocument::Tree(tree))).inspect_err(
            |e| tracing::error!(error = %e, payload = %value, "failed to decode document tree"),
        ),
        EncodingShape::ExternalRef(_) | EncodingShape::Unknown => Ok(None),
    };

    if let Ok(Some(doc)) = &result {
        tracing::debug!(shape = shape.tag(), kind = doc.kind(), "decoded payload");
    }
    result
}
