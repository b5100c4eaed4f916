use blockdoc::{BlockNode, Content, Document, DocumentMeta, OutputMode, Schema, normalize};

use crate::attachments::{Attachment, AttachmentPolicy, extract_attachments};
use crate::error::CompileError;
use crate::ids::assign_ids;

/// Output of a successful compile.
#[derive(Debug, Clone, PartialEq)]
pub struct Compiled {
    /// Canonical tree after identifier assignment and extraction.
    pub tree: BlockNode,
    /// Serialized document, already validated against the schema.
    pub document: Document,
    /// Externalized payloads in pre-order. Always empty in embedded mode.
    pub attachments: Vec<Attachment>,
}

/// Runs authored content through the pipeline:
/// normalize, assign identifiers, extract attachments, serialize, validate.
///
/// A compiler holds no per-compile state and can be shared between threads.
#[derive(Debug, Clone, Default)]
pub struct Compiler {
    schema: Schema,
    policy: AttachmentPolicy,
}

impl Compiler {
    pub fn new(schema: Schema, policy: AttachmentPolicy) -> Self {
        Compiler { schema, policy }
    }

    pub fn with_policy(policy: AttachmentPolicy) -> Self {
        Compiler {
            schema: Schema::builtin(),
            policy,
        }
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn policy(&self) -> &AttachmentPolicy {
        &self.policy
    }

    #[tracing::instrument(skip_all, fields(mode = meta.mode.as_str()))]
    pub fn compile<I, C>(&self, blocks: I, meta: &DocumentMeta) -> Result<Compiled, CompileError>
    where
        I: IntoIterator<Item = C>,
        C: Into<Content>,
    {
        let draft = normalize(blocks)?;
        tracing::debug!(nodes = draft.node_count(), "normalized");

        let tree = assign_ids(draft)?;

        let (tree, attachments) = match meta.mode {
            OutputMode::Attached => extract_attachments(tree, &self.policy),
            OutputMode::Embedded => (tree, Vec::new()),
        };
        tracing::debug!(attachments = attachments.len(), "payloads placed");

        let document = blockdoc::document::serialize(&tree, meta)?;

        if let Err(violation) = self.schema.validate(document.as_str()) {
            tracing::debug!(%violation, "compiled document rejected by schema");
            return Err(CompileError::SchemaValidation {
                violation,
                document: document.into_string(),
            });
        }
        tracing::debug!(bytes = document.len(), "document validated");

        Ok(Compiled {
            tree,
            document,
            attachments,
        })
    }
}

// ---------------------------------------------------------------------------
// Convenience entry point
// ---------------------------------------------------------------------------

/// Compile with the builtin schema and the default attachment policy.
pub fn compile<I, C>(blocks: I, meta: &DocumentMeta) -> Result<Compiled, CompileError>
where
    I: IntoIterator<Item = C>,
    C: Into<Content>,
{
    Compiler::default().compile(blocks, meta)
}
