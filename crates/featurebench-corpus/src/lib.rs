//! Request-corpus builder.
//!
//! Materializes the ordered request sequence driving a run from two inputs:
//! a request-template document and an entity corpus (a textual listing or a
//! warehouse query). `${ENTITY_ID}` placeholders in the template expand
//! against the entity corpus per `(featurestore, entity type)` pair.

mod builder;
mod entities;
mod template;

pub use builder::{CorpusBuilder, EntitySource};
pub use entities::{EntityMap, ENTITY_ID_PLACEHOLDER};
pub use template::{
    parse_template, FeaturestoreGroup, ReadTemplate, RequestTemplate, StreamingReadTemplate,
    TemplateRequest,
};
